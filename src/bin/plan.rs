//! Transformation Planner CLI
//!
//! Loads a source schema (or sample data), a source annotation and a target
//! annotation, and prints the resulting transformation plan as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use sda_mapping::{Integration, MappingConfig, SourceFile};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sda-plan")]
#[command(about = "Derive nesting transformations from annotated schemas")]
struct Cli {
    /// Field-schema JSON of the source
    #[arg(long, conflicts_with = "data")]
    schema: Option<PathBuf>,

    /// Sample records to infer the source schema from
    #[arg(long)]
    data: Option<PathBuf>,

    /// Annotation of the source fields
    #[arg(long)]
    source_annotation: PathBuf,

    /// Annotation describing the target nesting
    #[arg(long)]
    target_annotation: PathBuf,

    /// Config file (defaults to sda.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the plan here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = MappingConfig::load_from(config_path.as_deref()).context("Failed to load configuration")?;

    let source = match (cli.schema, cli.data) {
        (Some(path), None) => SourceFile::Schema(path),
        (None, Some(path)) => SourceFile::Data(path),
        _ => bail!("exactly one of --schema or --data is required"),
    };

    let mut integration = Integration::new(config);
    integration
        .load_source_files(&source, &cli.source_annotation)
        .with_context(|| format!("Failed to load source {:?}", source))?;
    integration
        .load_target_file(&cli.target_annotation)
        .with_context(|| format!("Failed to load {}", cli.target_annotation.display()))?;

    let plan = integration.do_transformation().context("Transformation failed")?;
    let rendered = integration.config().render(&plan)?;

    match cli.output {
        Some(path) => {
            std::fs::write(&path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote plan to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
