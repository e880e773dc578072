use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::rolling;

use attendance_sync::config::Config;
use attendance_sync::model::attendance::RecordKind;
use attendance_sync::model::employee::EmployeeDraft;
use attendance_sync::sync::{
    OutboxCollector, PushOutcome, ReplayStatus, Scheduler, SchedulerConfig, SyncCoordinator,
};
use attendance_sync::{ConnectivityMonitor, HttpGateway, LocalStore};

/// Offline-first time-and-attendance client
#[derive(Parser, Debug)]
#[command(name = "attendance-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a check-in
    CheckIn { employee_id: i64 },

    /// Record a check-out
    CheckOut { employee_id: i64 },

    /// Employee management
    #[command(subcommand)]
    Employee(EmployeeCommands),

    /// List employees (server roster when reachable)
    #[command(alias = "ls")]
    Employees,

    /// Show the most recent attendance record of an employee
    LastRecord { employee_id: i64 },

    /// Show what still has to reach the server
    Pending,

    /// Run one replay pass now
    Sync,

    /// Prune synced outbox entries past the retention window
    Gc,

    /// Keep running: probe the server, replay on reconnect, collect the outbox
    Run,
}

#[derive(Subcommand, Debug)]
enum EmployeeCommands {
    /// Create an employee
    Add {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        position: String,
        #[arg(long)]
        inactive: bool,
    },

    /// Update an employee; omitted fields keep their value
    Update {
        id: i64,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },

    /// Set the avatar of an employee (data url or image reference)
    Avatar { id: i64, avatar: String },

    /// Remove an employee
    Remove { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance-sync.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    let store = LocalStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening local store at {}", config.database_url))?;

    let gateway = HttpGateway::new(
        &config.api_base_url,
        &config.probe_url(),
        config.request_timeout,
    )
    .context("building http client")?;

    // no platform network signal here: the first probe seeds reachability
    let connectivity = ConnectivityMonitor::new(false);
    let coordinator = Arc::new(
        SyncCoordinator::new(store.clone(), Arc::new(gateway), connectivity)
            .with_request_timeout(config.request_timeout),
    );
    let reachable = coordinator.probe_remote().await;
    coordinator.connectivity().set_reachable(reachable);

    let collector = OutboxCollector::new(
        store,
        chrono::Duration::days(config.outbox_retention_days),
    );

    match cli.command {
        Commands::CheckIn { employee_id } => {
            let outcome = coordinator
                .record_attendance(employee_id, RecordKind::CheckIn)
                .await?;
            report_push("Check-in recorded", &outcome.push);
        }
        Commands::CheckOut { employee_id } => {
            let outcome = coordinator
                .record_attendance(employee_id, RecordKind::CheckOut)
                .await?;
            report_push("Check-out recorded", &outcome.push);
        }
        Commands::Employee(command) => employee_command(&coordinator, command).await?,
        Commands::Employees => {
            for employee in coordinator.roster().refresh_employees().await? {
                println!(
                    "{}\t{}\t{}\t{}{}",
                    employee.id,
                    employee.business_code,
                    employee.name,
                    employee.position,
                    if employee.is_active { "" } else { "\t(inactive)" }
                );
            }
        }
        Commands::LastRecord { employee_id } => {
            match coordinator.roster().last_record(employee_id).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("No record found for employee {employee_id}"),
            }
        }
        Commands::Pending => {
            let (records, operations) = coordinator.pending().await?;
            println!("Unsynced attendance records: {records}");
            println!("Unsynced employee operations: {operations}");
        }
        Commands::Sync => match coordinator.replay().await? {
            ReplayStatus::Completed(report) => println!(
                "Synced {} entries ({} still pending)",
                report.synced_count(),
                report.failed_count()
            ),
            ReplayStatus::AlreadyRunning => println!("A sync is already running"),
            ReplayStatus::Offline => println!("Offline, nothing was sent"),
            ReplayStatus::RemoteUnavailable => println!("Server is not answering, try again later"),
        },
        Commands::Gc => {
            let removed = collector.collect().await?;
            println!("Removed {removed} synced outbox entries");
        }
        Commands::Run => {
            info!("Sync service starting...");
            let scheduler = Scheduler::spawn(
                Arc::clone(&coordinator),
                collector,
                SchedulerConfig {
                    probe_interval: config.probe_interval,
                    sync_interval: config.sync_interval,
                    gc_interval: config.gc_interval,
                },
            );

            if reachable {
                coordinator.replay().await?;
            }

            tokio::signal::ctrl_c()
                .await
                .context("waiting for shutdown signal")?;
            warn!("Shutdown requested");
            scheduler.shutdown().await;
        }
    }

    Ok(())
}

async fn employee_command(coordinator: &SyncCoordinator, command: EmployeeCommands) -> Result<()> {
    let (action, outcome) = match command {
        EmployeeCommands::Add {
            code,
            name,
            position,
            inactive,
        } => {
            let outcome = coordinator
                .create_employee(EmployeeDraft {
                    business_code: code,
                    name,
                    position,
                    is_active: !inactive,
                    avatar: None,
                })
                .await?;
            ("created", outcome)
        }
        EmployeeCommands::Update {
            id,
            code,
            name,
            position,
            active,
        } => {
            let Some(mut employee) = coordinator.store().employee(id).await? else {
                bail!("employee {id} is not in the local store");
            };
            if let Some(code) = code {
                employee.business_code = code;
            }
            if let Some(name) = name {
                employee.name = name;
            }
            if let Some(position) = position {
                employee.position = position;
            }
            if let Some(active) = active {
                employee.is_active = active;
            }
            ("updated", coordinator.update_employee(employee).await?)
        }
        EmployeeCommands::Avatar { id, avatar } => {
            ("updated", coordinator.set_avatar(id, Some(avatar)).await?)
        }
        EmployeeCommands::Remove { id } => ("removed", coordinator.delete_employee(id).await?),
    };

    report_push(
        &format!("Employee {} {action}", outcome.employee.id),
        &outcome.push,
    );
    Ok(())
}

fn report_push(action: &str, push: &PushOutcome) {
    match push {
        PushOutcome::Synced => println!("{action}."),
        PushOutcome::Offline => println!("{action} (offline, will sync on reconnect)."),
        PushOutcome::Deferred { reason } => {
            println!("{action}, but the server did not accept it yet: {reason}")
        }
    }
}
