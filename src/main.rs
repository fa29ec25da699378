//! # PQ Report CLI
//!
//! Usage:
//!   pq-report extract dashboard.html > snapshot.json
//!   pq-report pdf dashboard.html --capture dashboard.png -o reports/
//!   pq-report xlsx snapshot.json -o reports/

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pq_report::{
    CaptureFileRasterizer, ExportConfig, NoCapture, Rasterizer, ReportArtifact, ReportError,
    ReportSnapshot,
};

/// Export the PQ Dashboard report as PDF or XLSX.
#[derive(Parser)]
#[command(name = "pq-report")]
#[command(about = "Export the PQ Dashboard report as PDF or XLSX")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print the snapshot extracted from a rendered page as JSON.
    Extract {
        #[command(flatten)]
        input: InputArgs,

        /// Write the JSON here instead of stdout.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Export a PDF report.
    Pdf {
        #[command(flatten)]
        input: InputArgs,

        /// Capture of the rendered page: a PNG/JPEG path or data URI.
        /// Without it the PDF has no chart pages.
        #[arg(long, value_name = "SRC")]
        capture: Option<String>,

        /// Directory to write the report into.
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
    /// Export an XLSX workbook.
    Xlsx {
        #[command(flatten)]
        input: InputArgs,

        /// Directory to write the workbook into.
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Rendered dashboard HTML, or a snapshot `.json` file.
    input: PathBuf,

    /// Element id of the report root.
    #[arg(long)]
    root: Option<String>,

    /// Export configuration file (JSON).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// What the input file turned out to be.
enum Source {
    Html(String),
    Snapshot(ReportSnapshot),
}

impl InputArgs {
    fn load_config(&self) -> Result<ExportConfig, ReportError> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::from_file(path)?,
            None => ExportConfig::default(),
        };
        if let Some(root) = &self.root {
            config.root_id = root.clone();
        }
        Ok(config)
    }

    fn load_source(&self) -> Result<Source, ReportError> {
        let text = std::fs::read_to_string(&self.input)?;
        if is_json(&self.input) {
            Ok(Source::Snapshot(pq_report::snapshot_from_json(&text)?))
        } else {
            Ok(Source::Html(text))
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), ReportError> {
    match command {
        Command::Extract { input, output } => {
            let config = input.load_config()?;
            let snapshot = match input.load_source()? {
                Source::Html(html) => pq_report::snapshot_from_html(&html, &config),
                Source::Snapshot(snapshot) => snapshot,
            };
            let json = serde_json::to_string_pretty(&snapshot)
                .map_err(|e| ReportError::Config(e.to_string()))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!(path = %path.display(), metrics = snapshot.metrics.len(), tables = snapshot.tables.len(), "snapshot written");
                }
                None => println!("{}", json),
            }
        }
        Command::Pdf {
            input,
            capture,
            output,
        } => {
            let config = input.load_config()?;
            let rasterizer: Box<dyn Rasterizer> = match capture {
                Some(src) => Box::new(CaptureFileRasterizer::new(src)),
                None => Box::new(NoCapture),
            };
            let artifact = match input.load_source()? {
                Source::Html(html) => pq_report::export_pdf(&html, rasterizer.as_ref(), &config),
                Source::Snapshot(snapshot) => {
                    pq_report::export_pdf_snapshot(&snapshot, rasterizer.as_ref(), &config)
                }
            };
            save(&artifact, &output)?;
        }
        Command::Xlsx { input, output } => {
            let config = input.load_config()?;
            let artifact = match input.load_source()? {
                Source::Html(html) => pq_report::export_xlsx(&html, &config)?,
                Source::Snapshot(snapshot) => pq_report::export_xlsx_snapshot(&snapshot, &config)?,
            };
            save(&artifact, &output)?;
        }
    }
    Ok(())
}

fn save(artifact: &ReportArtifact, dir: &Path) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir)?;
    let path = artifact.save_to(dir)?;
    info!(path = %path.display(), bytes = artifact.bytes.len(), "report written");
    Ok(())
}
