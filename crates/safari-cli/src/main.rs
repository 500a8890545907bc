mod commands;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use safari_config::{AppConfig, Session};
use safari_core::{EntityCache, HttpStore, SyncCoordinator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "safari")]
#[command(about = "Admin and staff dashboard client for the Boat Safari backend")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $SAFARI_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bearer token; overrides the configured session
    #[arg(long, global = true, env = "SAFARI_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
    Xlsx,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a list and show it, optionally filtered
    List {
        entity: String,
        #[arg(long)]
        search: Option<String>,
        /// Exact-match selector, `name=value`; repeatable
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
        /// Print matched records as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Read the public selection list instead (boats only)
        #[arg(long)]
        available: bool,
    },
    /// Dashboard counts and chart series
    Stats {
        #[arg(long)]
        charts: bool,
    },
    /// Write a list to `<entity>_export.<ext>`
    Export {
        entity: String,
        #[arg(long, value_enum, default_value = "csv")]
        format: Format,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Create a record from a JSON payload
    Create {
        entity: String,
        #[arg(long)]
        data: String,
    },
    /// Update a record from a JSON payload
    Update {
        entity: String,
        id: i64,
        #[arg(long)]
        data: String,
        /// Send trip updates through the staff endpoint
        #[arg(long)]
        staff: bool,
    },
    Delete {
        entity: String,
        id: i64,
    },
    /// Edit a user: role change, password reset and profile fields
    EditUser {
        id: i64,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        second_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        contact_no: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    CancelBooking {
        id: i64,
    },
    BoatStatus {
        id: i64,
        status: String,
    },
    /// Assign a boat and/or guide to a trip
    Assign {
        trip: i64,
        #[arg(long)]
        boat: Option<i64>,
        #[arg(long)]
        guide: Option<i64>,
    },
    /// Clear a trip's boat and guide, or delete the assignment with --remove
    Unassign {
        trip: i64,
        #[arg(long)]
        remove: bool,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("filter name is empty in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("safari=info,safari_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    let session = match cli.token {
        Some(token) => Session::with_token(token),
        None => Session::from_config(&config.session).context("Failed to load session token")?,
    };
    if !session.is_authenticated() {
        tracing::warn!("no session token configured; backend calls will be refused");
    }

    let store = HttpStore::new(&config, session).context("Failed to build HTTP client")?;
    let coordinator = SyncCoordinator::new(std::sync::Arc::new(store), EntityCache::shared());
    let app = commands::App {
        config: &config,
        coordinator: &coordinator,
    };

    match cli.command {
        Command::List {
            entity,
            search,
            filters,
            json,
            available,
        } => {
            let query = commands::ListQuery {
                search,
                filters,
                json,
                available,
            };
            app.list(&entity, query).await
        }
        Command::Stats { charts } => app.stats(charts).await,
        Command::Export {
            entity,
            format,
            out,
        } => app.export(&entity, format.into(), &out).await,
        Command::Create { entity, data } => app.create(&entity, &data).await,
        Command::Update {
            entity,
            id,
            data,
            staff,
        } => app.update(&entity, id, &data, staff).await,
        Command::Delete { entity, id } => app.delete(&entity, id).await,
        Command::EditUser {
            id,
            first_name,
            second_name,
            email,
            contact_no,
            role,
            password,
        } => {
            let changes = commands::UserChanges {
                first_name,
                second_name,
                email,
                contact_no,
                role,
                password,
            };
            app.edit_user(id, changes).await
        }
        Command::CancelBooking { id } => app.cancel_booking(id).await,
        Command::BoatStatus { id, status } => app.boat_status(id, &status).await,
        Command::Assign { trip, boat, guide } => app.assign(trip, boat, guide).await,
        Command::Unassign { trip, remove } => app.unassign(trip, remove).await,
    }
}

impl From<Format> for safari_core::ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => safari_core::ExportFormat::Csv,
            Format::Json => safari_core::ExportFormat::Json,
            Format::Xlsx => safari_core::ExportFormat::Xlsx,
        }
    }
}
