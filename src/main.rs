use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use iamref::config::{Config, SourceMode};
use iamref::output;
use iamref::pipeline::{self, RunReport};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Number of slowest services listed in the summary
const SLOWEST_SHOWN: usize = 5;

/// Build a consolidated AWS IAM authorization dataset
#[derive(Parser, Debug)]
#[command(name = "iamref", version, about, long_about = None)]
struct Args {
    /// Config file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where service records come from
    #[arg(short, long, value_enum)]
    source: Option<SourceMode>,

    /// Output file for the consolidated dataset
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of services fetched concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Delay in milliseconds before each documentation request
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Service reference directory URL
    #[arg(long)]
    directory_url: Option<String>,

    /// Documentation base URL
    #[arg(long)]
    docs_base_url: Option<String>,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Command-line values win over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(pacing) = self.pacing_ms {
            config.pacing_delay_ms = pacing;
        }
        if let Some(url) = &self.directory_url {
            config.directory_url = url.clone();
        }
        if let Some(url) = &self.docs_base_url {
            config.docs.base_url = url.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn setup_logging(level: LogLevel, log_file: Option<&Path>) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let (writer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(false)
        .init();

    tracing::debug!("iamref started with log level: {:?}", level);

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_deref())?;

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    let report = pipeline::run(&config).await?;

    output::write_dataset(&config.output_path, &report.dataset)?;
    print_summary(&report, &config.output_path);

    Ok(())
}

fn print_summary(report: &RunReport, output_path: &Path) {
    let dataset = &report.dataset;
    let stats = &report.stats;

    println!();
    println!("✓ Collected {} services into {}", dataset.total_services, output_path.display());

    if !report.failures.is_empty() {
        println!("✗ Failed to collect {} services:", report.failures.len());
        for failed in &report.failures {
            println!("  - {} [{}] {}", failed.service_id, failed.failure.kind(), failed.failure);
        }
    }

    if !report.empty_services.is_empty() {
        println!(
            "○ {} services had no operations: {}",
            report.empty_services.len(),
            report.empty_services.join(", ")
        );
    }

    println!();
    println!("Statistics:");
    println!("  - Total operations: {}", stats.total_operations);
    println!("  - Operations with descriptions: {}", stats.operations_with_description);
    println!("  - Operations with dependent actions: {}", stats.operations_with_dependencies);
    println!("  - Total dependent action relationships: {}", stats.dependency_edges);
    println!("  - Total resource types: {}", stats.resource_types);
    println!("  - Total condition keys: {}", stats.condition_keys);

    if !report.timings.is_empty() {
        println!();
        println!("Slowest services:");
        for timing in report.timings.iter().take(SLOWEST_SHOWN) {
            println!("  - {} ({:.2}s)", timing.service_id, timing.elapsed.as_secs_f64());
        }
    }
}
