// Engine main entry point
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use engine::config::EngineSettings;
use engine::data::store;
use engine::services::EmissionsService;
use shared::{format_with, parse_date_range};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command, RangeCheck, SummaryArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = EngineSettings::load(cli.config.as_deref())?;

    // RUST_LOG wins over the configured filter.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Format { value } => {
            println!("{}", format_with(value, &settings.number_format)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckRange { start, end } => {
            let check = RangeCheck::run(&start, &end);
            println!("{}", check.message);
            Ok(check.exit_code())
        }
        command => {
            let backend = store::open_store(&settings.storage).context("Failed to open emissions store")?;
            info!(kind = ?settings.storage.kind, records = backend.len(), "Emissions store ready");
            let service = EmissionsService::new(store::into_shared(backend), &settings)?;
            run_with_store(command, &service).await
        }
    }
}

async fn run_with_store(command: Command, service: &EmissionsService) -> Result<ExitCode> {
    match command {
        Command::Import { files } => {
            let mut any_rejected = false;
            for path in files {
                let summary = service
                    .import_csv(&path)
                    .await
                    .with_context(|| format!("Failed to import '{}'", path.display()))?;
                println!(
                    "{}: imported {}, rejected {}",
                    path.display(),
                    summary.imported(),
                    summary.rejections.len()
                );
                for rejection in &summary.rejections {
                    println!("  line {}: {}", rejection.line, rejection.reason);
                }
                any_rejected |= !summary.rejections.is_empty();
            }
            Ok(if any_rejected { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Command::Submit(args) => {
            let result = service.submit(args.into_submission()?).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Summary(SummaryArgs {
            organization_id,
            start,
            end,
        }) => {
            let period = match (start, end) {
                (Some(start), Some(end)) => Some(parse_date_range(&start, &end)?),
                _ => None,
            };
            let summary = service.summarize(&organization_id, period).await?;
            if summary.is_empty() {
                println!("No emissions records for {}", organization_id);
                return Ok(ExitCode::SUCCESS);
            }
            println!("Emissions for {}", organization_id);
            if let Some(period) = &summary.period {
                println!("Period: {} .. {}", period.start().to_rfc3339(), period.end().to_rfc3339());
            }
            for line in &summary.by_scope {
                println!(
                    "  {:<8} {:>24} {:<8} ({} records)",
                    line.scope.as_str(),
                    line.formatted,
                    line.unit,
                    line.records
                );
            }
            for total in &summary.totals {
                println!("  {:<8} {:>24} {}", "total", total.formatted, total.unit);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { id } => {
            let record = service.record(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(ExitCode::SUCCESS)
        }
        // Answered in main without opening the store.
        Command::Format { .. } | Command::CheckRange { .. } => Ok(ExitCode::SUCCESS),
    }
}
