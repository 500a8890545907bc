//! Table presentation model for filtered entity lists.

use serde::Serialize;
use serde_json::Value;

use crate::filter::FilteredView;
use crate::sync::intent::singular;
use crate::types::{EntityType, Record, RecordId};
use Source::{Assigned, Date, Field, Name, Status};

const MISSING: &str = "N/A";
const UNASSIGNED: &str = "Unassigned";

/// How a column derives its text from a record
#[derive(Debug, Clone, Copy)]
enum Source {
    /// First non-empty of several dotted field paths
    Field(&'static [&'static str]),
    /// `firstName secondName` under an optional prefix such as `guide.`
    Name(&'static str),
    /// Date part of an ISO date or date-time
    Date(&'static str),
    /// Upper snake status shown in title case
    Status(&'static str),
    /// Like `Field` but shown as "Unassigned" when empty
    Assigned(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
struct Column {
    header: &'static str,
    source: Source,
}

const fn col(header: &'static str, source: Source) -> Column {
    Column { header, source }
}

const USER_COLUMNS: &[Column] = &[
    col("ID", Field(&["userId"])),
    col("Name", Name("")),
    col("Email", Field(&["email"])),
    col("Role", Field(&["role"])),
    col("Status", Status("status")),
    col("Created", Date("createdDate")),
];

const TRIP_COLUMNS: &[Column] = &[
    col("ID", Field(&["tripId"])),
    col("Name", Field(&["name"])),
    col("Date", Date("date")),
    col("Start", Field(&["startTime"])),
    col("End", Field(&["endTime"])),
    col("Route", Field(&["route"])),
    col("Capacity", Field(&["capacity"])),
    col("Boat", Assigned(&["boat.name", "boat.boatName"])),
    col("Guide", Assigned(&["guide.firstName"])),
];

const BOOKING_COLUMNS: &[Column] = &[
    col("ID", Field(&["bookingId"])),
    col("Customer", Field(&["name", "customer.firstName"])),
    col("Trip", Field(&["trip.route", "trip.name"])),
    col("Trip Date", Date("trip.date")),
    col("Passengers", Field(&["passengers"])),
    col("Total", Field(&["totalCost"])),
    col("Status", Status("status")),
    col("Booked", Date("holdTimer")),
];

const STAFF_COLUMNS: &[Column] = &[
    col("ID", Field(&["userId"])),
    col("Name", Name("")),
    col("Email", Field(&["email"])),
    col("Role", Field(&["role"])),
    col("Phone", Field(&["phone", "contactNo"])),
    col("Status", Status("status")),
    col("Hired", Date("hireDate")),
];

const BOAT_COLUMNS: &[Column] = &[
    col("ID", Field(&["boatId"])),
    col("Name", Field(&["boatName"])),
    col("Model", Field(&["model"])),
    col("Type", Field(&["type"])),
    col("Capacity", Field(&["capacity"])),
    col("Registration", Field(&["registrationNumber"])),
    col("Status", Status("status")),
];

const GUIDE_COLUMNS: &[Column] = &[
    col("ID", Field(&["userId"])),
    col("Name", Name("")),
    col("Email", Field(&["email"])),
    col("Status", Status("status")),
];

const ASSIGNMENT_COLUMNS: &[Column] = &[
    col("Trip", Field(&["tripName"])),
    col("Date", Date("date")),
    col("Boat", Assigned(&["boatName"])),
    col("Guide", Assigned(&["guideName"])),
];

fn columns(entity: EntityType) -> &'static [Column] {
    match entity {
        EntityType::Users => USER_COLUMNS,
        EntityType::Trips => TRIP_COLUMNS,
        EntityType::Bookings => BOOKING_COLUMNS,
        EntityType::Staff => STAFF_COLUMNS,
        EntityType::Boats => BOAT_COLUMNS,
        EntityType::Guides => GUIDE_COLUMNS,
        EntityType::Assignments => ASSIGNMENT_COLUMNS,
    }
}

fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut value = record.get(parts.next()?)?;
    for part in parts {
        value = value.get(part)?;
    }
    (!value.is_null()).then_some(value)
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn first_text(record: &Record, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|p| lookup(record, p))
        .find_map(scalar_text)
}

/// "OUT_OF_SERVICE" -> "Out of Service"
pub fn format_status(status: &str) -> String {
    status
        .split('_')
        .filter(|w| !w.is_empty())
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i > 0 && matches!(lower.as_str(), "of" | "in" | "on" | "for" | "and") {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn cell(record: &Record, source: Source) -> String {
    match source {
        Source::Field(paths) => first_text(record, paths).unwrap_or_else(|| MISSING.to_string()),
        Source::Assigned(paths) => {
            first_text(record, paths).unwrap_or_else(|| UNASSIGNED.to_string())
        }
        Source::Name(prefix) => {
            let first = first_text(record, &[format!("{}firstName", prefix).as_str()]);
            let second = first_text(record, &[format!("{}secondName", prefix).as_str()]);
            match (first, second) {
                (None, None) => MISSING.to_string(),
                (first, second) => [first, second].into_iter().flatten().collect::<Vec<_>>().join(" "),
            }
        }
        Source::Date(path) => first_text(record, &[path])
            .map(|d| d.get(..10).map(str::to_string).unwrap_or(d))
            .unwrap_or_else(|| MISSING.to_string()),
        Source::Status(path) => first_text(record, &[path])
            .map(|s| format_status(&s))
            .unwrap_or_else(|| MISSING.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub id: RecordId,
    pub cells: Vec<String>,
}

/// A rendered entity table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    /// Shown instead of rows: "Loading..." or "No users found"
    pub placeholder: Option<String>,
    /// "Showing N of M users" when a filter hides records
    pub summary: Option<String>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn empty_message(entity: EntityType) -> String {
    match entity {
        EntityType::Staff => "No staff members found".to_string(),
        other => format!("No {} found", other),
    }
}

/// Map a filtered view to rows of display text
pub fn table(entity: EntityType, view: &FilteredView) -> Table {
    let columns = columns(entity);
    let rows: Vec<TableRow> = view
        .matched
        .iter()
        .map(|record| TableRow {
            id: record.id(),
            cells: columns.iter().map(|c| cell(record, c.source)).collect(),
        })
        .collect();

    let placeholder = if view.is_loading() {
        Some(format!("Loading {}...", entity))
    } else if rows.is_empty() {
        Some(empty_message(entity))
    } else {
        None
    };

    Table {
        headers: columns.iter().map(|c| c.header.to_string()).collect(),
        rows,
        placeholder,
        summary: view.summary(entity),
    }
}

/// One-line description of a record for confirmations: "boat 3 (Orca)"
pub fn describe(entity: EntityType, record: &Record) -> String {
    let label = first_text(record, &["name", "boatName", "tripName", "email"]);
    match label {
        Some(label) => format!("{} {} ({})", singular(entity), record.id(), label),
        None => format!("{} {}", singular(entity), record.id()),
    }
}
