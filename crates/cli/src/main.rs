//! Staffline CLI - automatic project staffing over a JSON record file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use staffline_core::{Priority, ProjectId, Role, Slot};
use staffline_execution::{
    CycleResult, DeadlinePlanner, EngineConfig, LogEmitter, NotificationEmitter, Outcome, Scheduler,
    WebhookEmitter,
};
use staffline_storage::{JsonStore, RecordAdapter, RecordSet};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "staffline")]
#[command(about = "Assign writers, designers and controllers to projects", long_about = None)]
struct Cli {
    /// JSON record file holding projects, resources and assignments
    #[arg(long, global = true, default_value = "staffline.json")]
    records: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an empty record file
    Init,
    /// Run cycles periodically until Ctrl-C
    Run,
    /// Run one assignment cycle
    Cycle {
        /// Print the cycle result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Staff one project now, ignoring its ready flag
    Assign {
        /// Project ID
        project: String,
    },
    /// Show the best candidates for a project without assigning
    Recommend {
        /// Project ID
        project: String,
        /// Candidates per role
        #[arg(long, default_value = "3")]
        top: usize,
    },
    /// Show projects and resource workloads
    Status,
    /// Close an assignment, freeing the resource's workload slot
    Close {
        /// Project ID
        project: String,
        /// Slot (writer, designer, writer_review, design_review)
        slot: String,
    },
    /// Plan phase deadlines back from a due date
    Deadlines {
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: String,
        /// Project priority
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Project has no writing phase
        #[arg(long)]
        no_writer: bool,
        /// Project has no design phase
        #[arg(long)]
        no_designer: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Init => {
            if cli.records.exists() {
                anyhow::bail!("{} already exists", cli.records.display());
            }
            JsonStore::create(&cli.records, &RecordSet::default()).await?;
            println!("Created {}", cli.records.display());
        }
        Commands::Deadlines { due, priority, no_writer, no_designer } => {
            let due = NaiveDate::parse_from_str(&due, "%Y-%m-%d")
                .with_context(|| format!("Invalid due date: {due}"))?
                .and_hms_opt(0, 0, 0)
                .context("Invalid due date")?
                .and_utc();
            let plan = DeadlinePlanner::default().plan(
                due,
                Priority::parse(&priority),
                !no_writer,
                !no_designer,
                chrono::Utc::now(),
            );

            println!("Deadlines ({} days of work)", plan.total_days);
            if !no_writer {
                println!("  Writing:    {} ({} days)", plan.writing.date_naive(), plan.writing_days);
                println!("  Writing QC: {} ({} days)", plan.writing_qc.date_naive(), plan.writing_qc_days);
            }
            if !no_designer {
                println!("  Design:     {} ({} days)", plan.design.date_naive(), plan.design_days);
                println!("  Design QC:  {} ({} days)", plan.design_qc.date_naive(), plan.design_qc_days);
            }
            println!("  Due:        {}", plan.due.date_naive());
        }
        command => {
            let store = Arc::new(
                JsonStore::open(&cli.records)
                    .await
                    .with_context(|| format!("Failed to open {}", cli.records.display()))?,
            );
            run_command(command, store, config).await?;
        }
    }

    Ok(())
}

async fn run_command(command: Commands, store: Arc<JsonStore>, config: EngineConfig) -> Result<()> {
    let emitter: Arc<dyn NotificationEmitter> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookEmitter::new(url.clone(), config.adapter_timeout())),
        None => Arc::new(LogEmitter),
    };
    let scheduler = Arc::new(Scheduler::new(store.clone(), config)?.with_emitter(emitter));

    match command {
        Commands::Run => {
            let handle = scheduler.spawn();
            tokio::signal::ctrl_c().await?;
            info!("Shutting down; letting in-flight projects finish");
            handle.shutdown().await?;

            let stats = scheduler.stats();
            println!(
                "Ran {} cycle(s): {} assigned, {} failed, {} aborted",
                stats.total_runs, stats.assignments_made, stats.failures, stats.aborted_runs
            );
        }
        Commands::Cycle { json } => {
            let result = scheduler.run_cycle().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_cycle(&result);
            }
        }
        Commands::Assign { project } => {
            let id = parse_project(&project)?;
            let report = scheduler.assign_project(&id).await;
            println!("{}: {}", report.project_id, report.outcome);
            for (slot, resource) in &report.roles {
                println!("  {slot}: {resource}");
            }
            if let Some(reason) = &report.reason {
                println!("  ({reason})");
            }
        }
        Commands::Recommend { project, top } => {
            let id = parse_project(&project)?;
            let recs = scheduler.recommend(&id, top).await?;
            println!("Recommendations for {id}");
            for (slot, candidates) in recs {
                println!("  {slot}:");
                if candidates.is_empty() {
                    println!("    (no eligible candidate)");
                }
                for c in candidates {
                    println!("    {:<20} score {:>7.2}  headroom {}", c.resource_id, c.score, c.headroom);
                }
            }
        }
        Commands::Status => {
            let projects = store.list_projects().await?;
            let connected = projects.iter().filter(|p| p.connected).count();
            println!("Projects ({}, {} connected)", projects.len(), connected);
            for p in &projects {
                let state = if p.connected {
                    "CONNECTED"
                } else if p.ready_to_assign {
                    "READY"
                } else {
                    "WAITING"
                };
                println!("  {} | {:<9} | {:<6} | {}", p.id, state, p.priority, p.topic);
            }

            for role in [Role::Writer, Role::Designer, Role::Controller] {
                let resources = store.list_resources(role).await?;
                println!("{role}s ({})", resources.len());
                for r in resources {
                    let flag = if r.available { "" } else { " (unavailable)" };
                    println!("  {:<20} {}/{}  kpi {:.1}{}", r.id, r.workload, r.max_workload, r.kpi, flag);
                }
            }
        }
        Commands::Close { project, slot } => {
            let id = parse_project(&project)?;
            let slot = Slot::parse(&slot).with_context(|| format!("Unknown slot: {slot}"))?;
            let closed = store.close_assignment(&id, slot).await?;
            println!("Closed {} {} ({})", closed.project_id, closed.slot, closed.resource_id);
        }
        Commands::Init | Commands::Deadlines { .. } => unreachable!("handled before opening the store"),
    }

    Ok(())
}

fn parse_project(raw: &str) -> Result<ProjectId> {
    ProjectId::parse(raw).with_context(|| format!("Invalid project ID: {raw}"))
}

fn print_cycle(result: &CycleResult) {
    println!(
        "Cycle {}: {} attempted, {} assigned, {} skipped, {} failed{}",
        result.cycle_id,
        result.attempted,
        result.succeeded,
        result.skipped,
        result.failed,
        if result.cancelled { " (cancelled)" } else { "" }
    );
    for report in &result.reports {
        match report.outcome {
            Outcome::Assigned => {
                let roles: Vec<String> = report.roles.iter().map(|(s, r)| format!("{s}={r}")).collect();
                println!("  {} assigned: {}", report.project_id, roles.join(", "));
            }
            _ => println!(
                "  {} {}: {}",
                report.project_id,
                report.outcome,
                report.reason.as_deref().unwrap_or("")
            ),
        }
    }
}
