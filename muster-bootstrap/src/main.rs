use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use muster_application::commands::{
    attendance_commands, check_in_commands, event_commands, sync_commands,
};
use muster_application::queries::{event_queries, penalty_queries};
use muster_bootstrap::{init_tracing, run_daemon, AppContext, ContextOptions};
use muster_domain::{Coordinate, EventUpdate, NewEvent, WindowOffsets};
use muster_infrastructure::{check_health, issue_pass, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "muster")]
#[command(about = "Geofenced attendance engine", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Keep local state in memory for this run
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Event administration
    #[command(subcommand)]
    Event(EventCommand),
    /// Mark arrival at an event
    Mark(MarkArgs),
    /// Mark departure from an event
    Depart(MarkArgs),
    /// Verify a day pass, then mark arrival
    CheckIn {
        #[command(flatten)]
        mark: MarkArgs,
        #[arg(long)]
        pass: String,
    },
    /// Excuse a member from an event
    Excuse {
        #[arg(long)]
        member: String,
        #[arg(long)]
        event: String,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Penalty analysis for a member
    Analysis {
        #[arg(long)]
        member: String,
    },
    /// Issue a day pass for a member
    IssuePass {
        #[arg(long)]
        member: String,
        /// Day as YYYY-MM-DD, today (UTC) when omitted
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Reconcile with the remote store
    Sync {
        #[arg(value_enum, default_value_t = SyncMode::All)]
        mode: SyncMode,
    },
    /// Run periodic sync until interrupted
    Daemon,
    /// Check store connectivity
    Health,
    /// Print counters in Prometheus text format
    Metrics,
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    Create(CreateEventArgs),
    Update(UpdateEventArgs),
    Activate { id: String },
    Deactivate { id: String },
    Show { id: String },
}

#[derive(ClapArgs, Debug)]
struct CreateEventArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    /// RFC 3339 start instant
    #[arg(long)]
    starts_at: DateTime<Utc>,
    /// RFC 3339 end instant
    #[arg(long)]
    ends_at: DateTime<Utc>,
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    #[arg(long)]
    radius: f64,
    #[arg(long, default_value_t = 15)]
    sign_in_start: i64,
    #[arg(long, default_value_t = 30)]
    sign_in_end: i64,
    #[arg(long, default_value_t = 15)]
    sign_out_start: i64,
    #[arg(long, default_value_t = 30)]
    sign_out_end: i64,
}

#[derive(ClapArgs, Debug)]
struct UpdateEventArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    starts_at: Option<DateTime<Utc>>,
    #[arg(long)]
    ends_at: Option<DateTime<Utc>>,
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,
    #[arg(long)]
    radius: Option<f64>,
}

#[derive(ClapArgs, Debug)]
struct MarkArgs {
    #[arg(long)]
    member: String,
    #[arg(long)]
    event: String,
    /// Current latitude; omit when no fix is available
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,
    /// Fix accuracy in meters
    #[arg(long)]
    accuracy: Option<f64>,
}

impl MarkArgs {
    fn position(&self) -> Result<Option<Coordinate>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(Coordinate::new(lat, lon)?)),
            _ => Ok(None),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SyncMode {
    Push,
    Pull,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(config) = &args.config {
        std::env::set_var("MUSTER_CONFIG", config);
    }
    let config = AppConfig::load().await?;
    let _log_guard = init_tracing(&config)?;

    let mut options = ContextOptions {
        memory: args.memory,
        ..ContextOptions::default()
    };
    match &args.command {
        Command::Mark(mark) | Command::Depart(mark) => {
            options.position = mark.position()?;
            options.accuracy_m = mark.accuracy;
        }
        Command::CheckIn { mark, pass } => {
            options.position = mark.position()?;
            options.accuracy_m = mark.accuracy;
            options.pass = Some(pass.clone());
        }
        _ => {}
    }

    let context = AppContext::from_config(config, options)?;
    let outcome = execute(&context, args.command).await;
    if let Err(err) = context.shutdown().await {
        tracing::warn!(error = %err, "failed to close local store");
    }
    outcome
}

async fn execute(context: &AppContext, command: Command) -> Result<()> {
    let state = &context.state;
    match command {
        Command::Event(event) => execute_event(context, event).await,
        Command::Mark(mark) => {
            let record =
                attendance_commands::mark_attendance(state, &mark.member, &mark.event).await?;
            print_json(&record)
        }
        Command::Depart(mark) => {
            let record =
                attendance_commands::mark_departure(state, &mark.member, &mark.event).await?;
            print_json(&record)
        }
        Command::CheckIn { mark, .. } => {
            let record = check_in_commands::check_in(state, &mark.member, &mark.event).await?;
            print_json(&record)
        }
        Command::Excuse {
            member,
            event,
            note,
        } => print_json(&attendance_commands::excuse(state, &member, &event, &note).await?),
        Command::Analysis { member } => {
            print_json(&penalty_queries::analyze_member(state, &member).await?)
        }
        Command::IssuePass { member, day } => {
            let secret = context
                .config
                .pass_secret
                .as_deref()
                .ok_or_else(|| anyhow!("pass_secret is not configured"))?;
            let day = day.unwrap_or_else(|| Utc::now().date_naive());
            println!("{}", issue_pass(secret, member.trim(), day)?);
            Ok(())
        }
        Command::Sync { mode } => match mode {
            SyncMode::Push => print_json(&sync_commands::push(state).await),
            SyncMode::Pull => print_json(&sync_commands::pull(state).await),
            SyncMode::All => print_json(&sync_commands::sync_all(state).await),
        },
        Command::Daemon => run_daemon(context).await,
        Command::Health => {
            let report = check_health(state).await;
            print_json(&report)?;
            if !report.is_healthy() {
                return Err(anyhow!("local store unavailable"));
            }
            Ok(())
        }
        Command::Metrics => {
            print!("{}", state.metrics.render_prometheus());
            Ok(())
        }
    }
}

async fn execute_event(context: &AppContext, command: EventCommand) -> Result<()> {
    let state = &context.state;
    match command {
        EventCommand::Create(args) => {
            let payload = NewEvent {
                id: args.id,
                name: args.name,
                starts_at: args.starts_at,
                ends_at: args.ends_at,
                center: Coordinate {
                    latitude: args.lat,
                    longitude: args.lon,
                },
                radius_m: args.radius,
                offsets: WindowOffsets {
                    sign_in_start: args.sign_in_start,
                    sign_in_end: args.sign_in_end,
                    sign_out_start: args.sign_out_start,
                    sign_out_end: args.sign_out_end,
                },
            };
            print_json(&event_commands::create_event(state, payload).await?)
        }
        EventCommand::Update(args) => {
            let center = match (args.lat, args.lon) {
                (Some(latitude), Some(longitude)) => Some(Coordinate {
                    latitude,
                    longitude,
                }),
                _ => None,
            };
            let update = EventUpdate {
                starts_at: args.starts_at,
                ends_at: args.ends_at,
                center,
                radius_m: args.radius,
                active: None,
            };
            print_json(&event_commands::update_event(state, &args.id, update).await?)
        }
        EventCommand::Activate { id } => {
            print_json(&event_commands::set_event_active(state, &id, true).await?)
        }
        EventCommand::Deactivate { id } => {
            print_json(&event_commands::set_event_active(state, &id, false).await?)
        }
        EventCommand::Show { id } => match event_queries::get_event(state, &id).await? {
            Some(event) => print_json(&event),
            None => Err(anyhow!("event '{}' not found", id)),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
