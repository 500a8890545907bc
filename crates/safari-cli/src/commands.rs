use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use safari_config::AppConfig;
use safari_core::render::{self, Table};
use safari_core::stats;
use safari_core::{
    create_payload, export, AssignmentRequest, EntityType, ExportFormat, FilterEngine, FilterSpec,
    MutationOutcome, Notification, SyncCoordinator, UserEdit, UserFields,
};
use serde_json::Value;
use tracing::info;

/// Profile edits from the command line; unset fields keep the cached value
#[derive(Debug, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub email: Option<String>,
    pub contact_no: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

impl UserChanges {
    fn apply_to(self, mut fields: UserFields) -> UserEdit {
        if let Some(v) = self.first_name {
            fields.first_name = v;
        }
        if let Some(v) = self.second_name {
            fields.second_name = v;
        }
        if let Some(v) = self.email {
            fields.email = v;
        }
        if let Some(v) = self.contact_no {
            fields.contact_no = v;
        }
        UserEdit {
            fields,
            role: self.role,
            password: self.password,
        }
    }
}

/// Options of the `list` command
#[derive(Debug, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
    pub json: bool,
    pub available: bool,
}

pub struct App<'a> {
    pub config: &'a AppConfig,
    pub coordinator: &'a SyncCoordinator,
}

fn entity(name: &str) -> Result<EntityType> {
    name.parse::<EntityType>().map_err(|e| anyhow!(e.message))
}

fn parse_payload(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--data must be a JSON object")?;
    if !value.is_object() {
        bail!("--data must be a JSON object");
    }
    Ok(value)
}

/// Parse `--data` for a create and check it against the entity's draft shape
fn new_record(entity: EntityType, raw: &str) -> Result<Value> {
    create_payload(entity, parse_payload(raw)?).map_err(|f| anyhow!(f.message))
}

fn print_table(table: &Table) {
    if let Some(summary) = &table.summary {
        println!("{}", summary);
    }
    if let Some(placeholder) = &table.placeholder {
        println!("{}", placeholder);
        return;
    }

    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(&table.headers));
    for row in &table.rows {
        println!("{}", line(&row.cells));
    }
}

/// Print the outcome; a failed intent becomes the process error
fn report(outcome: MutationOutcome) -> Result<()> {
    let note = Notification::from(&outcome);
    println!("{}", note);
    if outcome.requires_login() {
        eprintln!("Log in again and update the configured token.");
    }
    if outcome.is_failed() {
        bail!(outcome.message);
    }
    Ok(())
}

impl App<'_> {
    async fn load(&self, entity: EntityType) -> Result<()> {
        self.coordinator
            .refresh(entity)
            .await
            .map_err(|f| anyhow!(Notification::from(&f).message))
            .with_context(|| format!("Failed to load {}", entity))?;
        Ok(())
    }

    pub async fn list(&self, name: &str, query: ListQuery) -> Result<()> {
        let entity = entity(name)?;

        let mut spec = FilterSpec::new();
        if let Some(term) = query.search {
            spec.set(safari_core::filter::SEARCH, term);
        }
        for (name, value) in query.filters {
            spec.set(name, value);
        }
        let engine = FilterEngine::from_config(self.config);

        let view = if query.available {
            // Selection lists are not cached
            let records = self
                .coordinator
                .store()
                .list_available(entity)
                .await
                .map_err(|f| anyhow!(Notification::from(&f).message))
                .with_context(|| format!("Failed to load available {}", entity))?;
            engine.apply(entity, &records, &spec)
        } else {
            self.load(entity).await?;
            let cache = self.coordinator.cache().read().await;
            engine.apply_cached(entity, &cache, &spec)
        };

        if query.json {
            println!("{}", serde_json::to_string_pretty(&view.matched)?);
        } else {
            print_table(&render::table(entity, &view));
        }
        Ok(())
    }

    pub async fn stats(&self, charts: bool) -> Result<()> {
        let totals = self.coordinator.load_stats().await;
        println!("Users:    {}", totals.users);
        println!("Trips:    {}", totals.trips);
        println!("Bookings: {}", totals.bookings);
        println!("Staff:    {}", totals.staff);
        println!("Boats:    {}", totals.boats);
        println!("Revenue:  {:.2}", totals.total_revenue);

        if charts {
            let today = chrono::Local::now().date_naive();
            let cache = self.coordinator.cache().read().await;
            let series = [
                stats::booking_trend(cache.get(EntityType::Bookings), today),
                stats::user_distribution(cache.get(EntityType::Users)),
                stats::monthly_revenue(cache.get(EntityType::Bookings), today),
                stats::trip_performance(cache.get(EntityType::Trips)),
            ];
            for chart in &series {
                println!();
                println!("{}", chart.label);
                for (label, value) in &chart.points {
                    println!("  {:<16} {}", label, value);
                }
            }
        }
        Ok(())
    }

    pub async fn export(&self, name: &str, format: ExportFormat, out: &Path) -> Result<()> {
        let entity = entity(name)?;
        self.load(entity).await?;

        let bytes = {
            let cache = self.coordinator.cache().read().await;
            export::export(cache.get(entity), format)?
        };
        std::fs::create_dir_all(out)
            .with_context(|| format!("Failed to create '{}'", out.display()))?;
        let path = out.join(export::file_name(entity, format));
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        info!(path = %path.display(), "export written");
        println!("{}", Notification::info(format!("Exported {} to {}", entity, path.display())));
        Ok(())
    }

    pub async fn create(&self, name: &str, data: &str) -> Result<()> {
        let entity = entity(name)?;
        let payload = new_record(entity, data)?;
        report(self.coordinator.create(entity, payload).await)
    }

    pub async fn update(&self, name: &str, id: i64, data: &str, staff: bool) -> Result<()> {
        let entity = entity(name)?;
        let payload = parse_payload(data)?;
        let outcome = match (entity, staff) {
            (EntityType::Trips, true) => self.coordinator.update_trip_as_staff(id, payload).await,
            (_, true) => bail!("--staff only applies to trips"),
            _ => self.coordinator.update(entity, id, payload).await,
        };
        report(outcome)
    }

    pub async fn delete(&self, name: &str, id: i64) -> Result<()> {
        let entity = entity(name)?;
        report(self.coordinator.delete(entity, id).await)
    }

    pub async fn edit_user(&self, id: i64, changes: UserChanges) -> Result<()> {
        self.load(EntityType::Users).await?;
        let current = {
            let cache = self.coordinator.cache().read().await;
            let record = cache
                .find_by_id(EntityType::Users, id)
                .ok_or_else(|| anyhow!("User {} not found", id))?;
            UserFields::from_record(record)
        };
        report(self.coordinator.update_user(id, changes.apply_to(current)).await)
    }

    pub async fn cancel_booking(&self, id: i64) -> Result<()> {
        report(self.coordinator.cancel_booking(id).await)
    }

    pub async fn boat_status(&self, id: i64, status: &str) -> Result<()> {
        let status = status.trim().to_uppercase().replace([' ', '-'], "_");
        report(self.coordinator.set_boat_status(id, status).await)
    }

    pub async fn assign(&self, trip: i64, boat: Option<i64>, guide: Option<i64>) -> Result<()> {
        if boat.is_none() && guide.is_none() {
            bail!("Select a boat or a guide to assign");
        }
        let request = AssignmentRequest {
            trip_id: trip,
            boat_id: boat,
            guide_id: guide,
        };
        report(self.coordinator.assign_resources(request).await)
    }

    pub async fn unassign(&self, trip: i64, remove: bool) -> Result<()> {
        let outcome = if remove {
            self.coordinator.remove_assignment(trip).await
        } else {
            self.coordinator.clear_assignment(trip).await
        };
        report(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_changes_keep_current_fields() {
        let current = UserFields {
            first_name: "Jo".into(),
            second_name: "Doe".into(),
            email: "jo@safari.io".into(),
            contact_no: "555".into(),
        };
        let changes = UserChanges {
            email: Some("new@safari.io".into()),
            role: Some("STAFF".into()),
            ..UserChanges::default()
        };
        let edit = changes.apply_to(current);
        assert_eq!(edit.fields.first_name, "Jo");
        assert_eq!(edit.fields.email, "new@safari.io");
        assert_eq!(edit.role.as_deref(), Some("STAFF"));
        assert!(edit.new_password().is_none());
    }

    #[test]
    fn payload_must_be_an_object() {
        assert!(parse_payload(r#"{"name": "Dawn"}"#).is_ok());
        assert!(parse_payload("[1]").is_err());
        assert!(parse_payload("nope").is_err());
    }

    #[test]
    fn new_records_are_checked_before_sending() {
        let user = r#"{"firstName":"Jo","secondName":"Doe","email":"jo@safari.io","contactNo":"555","role":"STAFF"}"#;
        let err = new_record(EntityType::Users, user).unwrap_err();
        assert!(err.to_string().contains("password"));

        let boat = r#"{"boatName":"Orca","model":"Cat","registrationNumber":"R1","capacity":8,"type":"CAT","status":"AVAILABLE"}"#;
        let body = new_record(EntityType::Boats, boat).unwrap();
        assert_eq!(body["capacity"], 8);

        let staff = r#"{"firstName":"Al","salary":0}"#;
        assert!(new_record(EntityType::Staff, staff).is_ok());
    }

    #[test]
    fn entity_names_are_checked() {
        assert_eq!(entity("boats").unwrap(), EntityType::Boats);
        assert!(entity("crew").is_err());
    }
}
