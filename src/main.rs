use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use common::config::Configuration;
use common::dataset::parse_datasets;
use common::{DatasetMetadata, StorageCatalog};
use migrator::{
    JobRecord, JobState, MigrationJob, MigrationOrchestrator, MigrationPlanner, ReconcileOutcome,
};
use placement::{PlacementReport, RecommendationEngine};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tierflow")]
#[command(about = "Tierflow - storage tier placement and migration")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: TierflowCommands,
}

#[derive(Subcommand)]
enum TierflowCommands {
    /// Recommend a placement for every dataset in a JSON file
    Recommend {
        /// JSON array or name-keyed map of dataset metadata
        datasets: PathBuf,
        #[arg(long, help = "Print reports as JSON")]
        json: bool,
    },
    /// Migrate one dataset and wait for the job to finish
    Migrate {
        datasets: PathBuf,
        /// Dataset name
        name: String,
        #[arg(long, help = "Destination storage option (defaults to the recommendation)")]
        to: Option<String>,
    },
    /// Migrate every dataset that is not at its recommended location
    Reconcile { datasets: PathBuf },
    /// Inspect the migration job history
    #[command(subcommand)]
    Jobs(JobsCommands),
    #[command(flatten)]
    Common(CommonCommands),
}

#[derive(Subcommand)]
enum JobsCommands {
    /// List all migration jobs
    List {
        #[arg(long, help = "Print jobs as JSON")]
        json: bool,
    },
    /// Show a single migration job
    Get { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on CLI arguments
    utils::init_logging(&cli.common);

    let config = utils::load_config(cli.common.config.as_ref())?;

    match cli.command {
        TierflowCommands::Common(command) => utils::handle_common_command(&command, &config),
        TierflowCommands::Recommend { datasets, json } => recommend(&config, &datasets, json),
        TierflowCommands::Migrate { datasets, name, to } => {
            migrate(&config, &datasets, &name, to.as_deref()).await
        }
        TierflowCommands::Reconcile { datasets } => reconcile(&config, &datasets).await,
        TierflowCommands::Jobs(command) => jobs(&config, command).await,
    }
}

fn load_catalog(config: &Configuration) -> Result<Arc<StorageCatalog>> {
    let catalog = config.catalog().context("Invalid storage catalog")?;
    Ok(Arc::new(catalog))
}

fn load_datasets(path: &Path) -> Result<Vec<DatasetMetadata>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read datasets from {}", path.display()))?;
    parse_datasets(&raw).with_context(|| format!("Failed to parse datasets in {}", path.display()))
}

fn recommend(config: &Configuration, path: &Path, json: bool) -> Result<()> {
    let engine = RecommendationEngine::from_config(load_catalog(config)?, &config.placement);
    let datasets = load_datasets(path)?;

    let mut reports = Vec::with_capacity(datasets.len());
    let mut failures = 0;
    for dataset in &datasets {
        match engine.evaluate(dataset) {
            Ok(report) => reports.push(report),
            Err(e) => {
                log::error!("Cannot place dataset {}: {}", dataset.name, e);
                failures += 1;
            }
        }
    }

    if json {
        let json =
            serde_json::to_string_pretty(&reports).context("Failed to serialize reports to JSON")?;
        println!("{json}");
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    if failures > 0 {
        bail!("{failures} of {} datasets could not be placed", datasets.len());
    }
    Ok(())
}

fn print_report(report: &PlacementReport) {
    let rec = &report.recommendation;
    println!(
        "{:<28} {:<5} score={:<6.1} -> {:<16} cost={:.2}/month",
        report.dataset_name,
        rec.tier.to_string(),
        report.score.total(),
        rec.recommended_location,
        rec.estimated_monthly_cost
    );
    if let (Some(current), Some(savings)) = (&report.current_location, report.monthly_savings) {
        let action = if report.needs_migration() {
            "migrate"
        } else {
            "keep"
        };
        println!("    currently on {current}, savings {savings:.2}/month ({action})");
    }
    if report.fell_back {
        println!("    no option met the latency ceiling, whole catalog considered");
    }
}

async fn migrate(
    config: &Configuration,
    path: &Path,
    name: &str,
    to: Option<&str>,
) -> Result<()> {
    let catalog = load_catalog(config)?;
    let datasets = load_datasets(path)?;
    let dataset = datasets
        .iter()
        .find(|dataset| dataset.name == name)
        .with_context(|| format!("Dataset {name} not found in {}", path.display()))?;

    let Some(source) = dataset.current_location.as_deref() else {
        bail!("Dataset {name} has no current location to migrate from");
    };

    let destination = match to {
        Some(to) => to.to_string(),
        None => {
            let engine = RecommendationEngine::from_config(catalog.clone(), &config.placement);
            engine.recommend(dataset)?.recommended_location
        }
    };
    if destination == source {
        println!("Dataset {name} is already on {source}");
        return Ok(());
    }

    let orchestrator = MigrationOrchestrator::from_config(catalog, config).await?;
    let job = orchestrator
        .run_migration(dataset, source, &destination)
        .await?;
    print_job(&job);

    if let Some(error) = job.last_error() {
        bail!("Migration {} failed: {}", job.id, error);
    }
    Ok(())
}

async fn reconcile(config: &Configuration, path: &Path) -> Result<()> {
    let catalog = load_catalog(config)?;
    let engine = RecommendationEngine::from_config(catalog.clone(), &config.placement);
    let orchestrator = MigrationOrchestrator::from_config(catalog, config).await?;
    let planner = MigrationPlanner::new(engine, orchestrator);

    let mut handles = Vec::new();
    let mut failures = 0;
    for dataset in load_datasets(path)? {
        match planner.reconcile(&dataset).await {
            Ok(ReconcileOutcome::Migrating {
                recommendation,
                from,
                handle,
            }) => {
                println!(
                    "{}: {} -> {} (job {})",
                    dataset.name,
                    from,
                    recommendation.recommended_location,
                    handle.id()
                );
                handles.push(handle);
            }
            Ok(ReconcileOutcome::InPlace(recommendation)) => {
                println!(
                    "{}: already on {}",
                    dataset.name, recommendation.recommended_location
                );
            }
            Ok(ReconcileOutcome::Unplaced(recommendation)) => {
                println!(
                    "{}: not stored yet, recommended {}",
                    dataset.name, recommendation.recommended_location
                );
            }
            Err(e) => {
                log::error!("Cannot reconcile dataset {}: {}", dataset.name, e);
                failures += 1;
            }
        }
    }

    for handle in handles {
        let job = handle.wait().await?;
        print_job(&job);
        if job.last_error().is_some() {
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} datasets could not be reconciled");
    }
    Ok(())
}

async fn jobs(config: &Configuration, command: JobsCommands) -> Result<()> {
    let orchestrator = MigrationOrchestrator::from_config(load_catalog(config)?, config).await?;

    match command {
        JobsCommands::List { json } => {
            let jobs = orchestrator.list_jobs().await?;
            if json {
                let records: Vec<JobRecord> = jobs.into_iter().map(JobRecord::from).collect();
                let json = serde_json::to_string_pretty(&records)
                    .context("Failed to serialize jobs to JSON")?;
                println!("{json}");
            } else if jobs.is_empty() {
                println!("No migration jobs");
            } else {
                for job in &jobs {
                    print_job(job);
                }
            }
        }
        JobsCommands::Get { id } => match orchestrator.get_job(id).await? {
            Some(job) => {
                let json = serde_json::to_string_pretty(&JobRecord::from(job))
                    .context("Failed to serialize job to JSON")?;
                println!("{json}");
            }
            None => bail!("Migration job {id} not found"),
        },
    }
    Ok(())
}

fn print_job(job: &MigrationJob) {
    println!(
        "{} {:<28} {} -> {} {:<9} {:>3}%",
        job.id,
        job.dataset_name,
        job.source,
        job.destination,
        job.status().to_string(),
        job.progress()
    );
    match &job.state {
        JobState::Completed {
            throughput_mbps,
            throughput_network_mbps,
            ..
        } => println!(
            "    {} bytes, {throughput_mbps} MiB/s observed, {throughput_network_mbps} MiB/s network",
            job.total_bytes
        ),
        JobState::Failed { last_error, .. } => println!("    error: {last_error}"),
        JobState::Running { .. } => {}
    }
}
