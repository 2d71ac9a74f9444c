//! # Cartel CLI
//!
//! Command-line interface for rendering listing cards.
//!
//! ## Usage
//!
//! ```bash
//! # Render one listing
//! cartel render --template card.json --record listing.json --output out/card.png
//!
//! # Render every listing in a JSON array, four at a time
//! cartel batch --template card.json --records listings.json --out-dir out --jobs 4
//!
//! # Show what text variables resolve to
//! cartel field --record listing.json price title organization.registeredName
//!
//! # Canvas size of a design size
//! cartel dimensions 4:5
//! ```
//!
//! Set `RUST_LOG=cartel=debug` for per-layer logging.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cartel::{
    CartelError, RenderConfig,
    assets::new_image_cache,
    record::{FieldFormat, FieldResolver, Record},
    render::{BatchJob, RenderOutcome, RenderReport, Renderer, render_batch},
    template::{Template, resolve_dimensions},
};

/// Cartel - Listing card renderer
#[derive(Parser, Debug)]
#[command(name = "cartel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Render configuration (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template against one record
    Render {
        /// Template JSON
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Record JSON
        #[arg(long, value_name = "FILE")]
        record: PathBuf,

        /// Output PNG path
        #[arg(long, short, value_name = "FILE")]
        output: PathBuf,
    },

    /// Render a template against every record in a JSON array
    Batch {
        /// Template JSON
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// JSON array of records
        #[arg(long, value_name = "FILE")]
        records: PathBuf,

        /// Output directory
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        /// Renders in flight
        #[arg(long, short, default_value = "4")]
        jobs: usize,
    },

    /// Print resolved text variables for a record
    Field {
        /// Record JSON
        #[arg(long, value_name = "FILE")]
        record: PathBuf,

        /// Variable names or dotted paths
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print the canvas size of a design size tag
    Dimensions {
        /// Design size tag (1:1, 4:5, 9:16, 16:9)
        tag: String,

        /// Canvas base width (defaults to the configured one)
        #[arg(long)]
        base_width: Option<u32>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cartel=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CartelError> {
    let cli = Cli::parse();
    let config = RenderConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            template,
            record,
            output,
        } => {
            let template = Template::load(&template)?;
            let record = Record::load(&record)?;
            let renderer = Renderer::new(config)?;
            let report = renderer.render(&template, &record, &output).await;
            print_report(&report);
            if !report.success() {
                return Err(CartelError::Render(output.display().to_string()));
            }
        }

        Commands::Batch {
            template,
            records,
            out_dir,
            jobs,
        } => {
            let template = Arc::new(Template::load(&template)?);
            let records = load_records(&records)?;
            let renderer = Arc::new(Renderer::with_image_cache(config, new_image_cache())?);

            let batch: Vec<BatchJob> = records
                .into_iter()
                .enumerate()
                .map(|(i, record)| BatchJob::in_dir(record, i, &out_dir))
                .collect();
            let reports = render_batch(renderer, template, batch, jobs).await;

            for report in &reports {
                print_report(report);
            }
            let failed = reports.iter().filter(|r| !r.success()).count();
            println!("{} of {} written", reports.len() - failed, reports.len());
            if failed > 0 {
                return Err(CartelError::Render(format!("{} renders not written", failed)));
            }
        }

        Commands::Field { record, names } => {
            let record = Record::load(&record)?;
            let resolver = FieldResolver::new(FieldFormat::from_config(&config));
            for name in names {
                match resolver.resolve(&record, &name) {
                    Some(value) => println!("{}: {}", name, value),
                    None => println!("{}: (none)", name),
                }
            }
        }

        Commands::Dimensions { tag, base_width } => {
            let base = base_width.unwrap_or(config.base_width);
            let (width, height) = resolve_dimensions(Some(tag.as_str()), base);
            println!("{}x{}", width, height);
        }
    }

    Ok(())
}

fn load_records(path: &Path) -> Result<Vec<Record>, CartelError> {
    let text = std::fs::read_to_string(path)?;
    let records: Vec<Record> = serde_json::from_str(&text)?;
    Ok(records)
}

fn print_report(report: &RenderReport) {
    match &report.outcome {
        RenderOutcome::Rendered => println!("✓ {}", report.output.display()),
        RenderOutcome::Fallback { error } => {
            println!("! {} (fallback image: {})", report.output.display(), error)
        }
        RenderOutcome::Failed { error } => println!("✗ {}: {}", report.output.display(), error),
    }
    for diagnostic in &report.diagnostics {
        println!("    {}", diagnostic);
    }
}
