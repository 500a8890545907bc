//! Dashboard statistics and chart series.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::store::RemoteStore;
use crate::types::{EntityType, Record};

/// Roles shown in the user distribution chart, in display order
pub const CHART_ROLES: [&str; 4] = ["CUSTOMER", "SAFARI_GUIDE", "STAFF", "ADMIN"];

const TREND_DAYS: i64 = 30;
const REVENUE_MONTHS: u32 = 6;
const TOP_ROUTES: usize = 5;
const UNKNOWN_ROUTE: &str = "Unknown Route";

/// Headline counts of the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub users: usize,
    pub trips: usize,
    pub bookings: usize,
    pub staff: usize,
    pub boats: usize,
    pub total_revenue: f64,
}

impl DashboardStats {
    /// Compute from already-fetched lists
    pub fn from_lists(
        users: &[Record],
        trips: &[Record],
        bookings: &[Record],
        staff: &[Record],
        boats: &[Record],
    ) -> Self {
        Self {
            users: users.len(),
            trips: trips.len(),
            bookings: bookings.len(),
            staff: staff.len(),
            boats: boats.len(),
            total_revenue: total_revenue(bookings),
        }
    }
}

/// Fetch the five dashboard lists concurrently.
///
/// A list that fails to load counts as empty and keeps its previous cache
/// contents; lists that load replace their cache slot.
pub async fn load_dashboard_stats(store: &dyn RemoteStore, cache: &SharedCache) -> DashboardStats {
    let (users, trips, bookings, staff, boats) = futures::join!(
        store.list(EntityType::Users),
        store.list(EntityType::Trips),
        store.list(EntityType::Bookings),
        store.list(EntityType::Staff),
        store.list(EntityType::Boats),
    );

    let mut loaded = Vec::with_capacity(5);
    let mut settle = |entity: EntityType, result: crate::error::Result<Vec<Record>>| match result {
        Ok(records) => {
            loaded.push((entity, records.clone()));
            records
        }
        Err(failure) => {
            warn!(entity = %entity, "stats list failed, counting as zero: {}", failure);
            Vec::new()
        }
    };

    let users = settle(EntityType::Users, users);
    let trips = settle(EntityType::Trips, trips);
    let bookings = settle(EntityType::Bookings, bookings);
    let staff = settle(EntityType::Staff, staff);
    let boats = settle(EntityType::Boats, boats);

    let stats = DashboardStats::from_lists(&users, &trips, &bookings, &staff, &boats);

    let mut cache = cache.write().await;
    for (entity, records) in loaded {
        cache.replace_all(entity, records);
    }
    debug!(?stats, "dashboard stats loaded");
    stats
}

/// Sum of `totalCost` over all bookings
pub fn total_revenue(bookings: &[Record]) -> f64 {
    bookings.iter().filter_map(booking_amount).sum()
}

fn booking_amount(booking: &Record) -> Option<f64> {
    booking.f64("totalCost")
}

/// Date a booking was placed, from `holdTimer` (ISO date-time)
fn booking_day(booking: &Record) -> Option<NaiveDate> {
    booking
        .text("holdTimer")?
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

/// Labelled values for one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<(String, f64)>,
}

impl ChartSeries {
    fn new(label: &str, points: Vec<(String, f64)>) -> Self {
        Self {
            label: label.to_string(),
            points,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|(label, _)| label.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, value)| *value)
    }
}

/// Bookings per day over the 30 days ending `today`, labelled `M/D`
pub fn booking_trend(bookings: &[Record], today: NaiveDate) -> ChartSeries {
    let days: Vec<NaiveDate> = (0..TREND_DAYS)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect();
    let placed: Vec<NaiveDate> = bookings.iter().filter_map(booking_day).collect();

    let points = days
        .into_iter()
        .map(|day| {
            let count = placed.iter().filter(|d| **d == day).count();
            (format!("{}/{}", day.month(), day.day()), count as f64)
        })
        .collect();
    ChartSeries::new("Bookings", points)
}

/// User count per chart role; other roles are not shown
pub fn user_distribution(users: &[Record]) -> ChartSeries {
    let points = CHART_ROLES
        .iter()
        .map(|role| {
            let count = users
                .iter()
                .filter(|u| u.role().as_deref() == Some(*role))
                .count();
            (role.to_string(), count as f64)
        })
        .collect();
    ChartSeries::new("Users", points)
}

/// Revenue per calendar month over the six months ending with `today`'s
pub fn monthly_revenue(bookings: &[Record], today: NaiveDate) -> ChartSeries {
    let this_month = today.with_day(1).unwrap_or(today);
    let months: Vec<NaiveDate> = (0..REVENUE_MONTHS)
        .rev()
        .filter_map(|back| this_month.checked_sub_months(Months::new(back)))
        .collect();

    let points = months
        .into_iter()
        .map(|month| {
            let revenue: f64 = bookings
                .iter()
                .filter(|b| {
                    booking_day(b)
                        .is_some_and(|d| d.year() == month.year() && d.month() == month.month())
                })
                .filter_map(booking_amount)
                .sum();
            (month.format("%b").to_string(), revenue)
        })
        .collect();
    ChartSeries::new("Revenue", points)
}

/// Average-capacity score for the first five routes in encounter order
pub fn trip_performance(trips: &[Record]) -> ChartSeries {
    let mut routes: Vec<(String, f64, usize)> = Vec::new();
    for trip in trips {
        let route = trip
            .text("route")
            .filter(|r| !r.trim().is_empty())
            .map(|r| r.into_owned())
            .unwrap_or_else(|| UNKNOWN_ROUTE.to_string());
        let capacity = trip.f64("capacity").unwrap_or(0.0);
        match routes.iter_mut().find(|(name, _, _)| *name == route) {
            Some((_, total, count)) => {
                *total += capacity;
                *count += 1;
            }
            None => routes.push((route, capacity, 1)),
        }
    }

    let points = routes
        .into_iter()
        .take(TOP_ROUTES)
        .map(|(route, total, count)| {
            let average = total / count as f64;
            (route, (average * 100.0 / 50.0).round())
        })
        .collect();
    ChartSeries::new("Performance", points)
}
