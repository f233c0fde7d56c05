use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use paw_compiler::{CompilerConfig, OutputFormat};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "paw-data-compiler",
    about = "Partition a typed scene graph into streaming units"
)]
struct Args {
    /// Schema file or directory of .paw files (repeatable)
    #[arg(short, long = "schema")]
    schema: Vec<PathBuf>,

    /// Scene document (JSON)
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Root object key, replacing the document's root set (repeatable)
    #[arg(short, long = "root")]
    root: Vec<String>,

    /// Manifest output path; stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Manifest encoding
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Compile the built-in demo world
    #[arg(long)]
    demo: bool,

    /// Number of streaming tiles in the demo world
    #[arg(long, default_value_t = 1)]
    demo_tiles: usize,

    /// Print the resolved type registry as JSON and exit
    #[arg(long)]
    dump_schema: bool,
}

impl Args {
    fn config(&self) -> CompilerConfig {
        CompilerConfig {
            schema_paths: self.schema.clone(),
            scene: self.scene.clone(),
            roots: self.root.clone(),
            output: self.out.clone(),
            format: self.format,
            demo: self.demo,
            demo_tiles: self.demo_tiles,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();

    if args.dump_schema {
        let registry = paw_compiler::load_registry(&config)?;
        println!("{}", serde_json::to_string_pretty(&registry.to_json())?);
        return Ok(());
    }

    let summary = paw_compiler::run(&config).context("compilation failed")?;
    info!(
        units = summary.manifest.units.len(),
        objects = summary.manifest.object_count(),
        dependencies = summary.manifest.dependency_count(),
        stages = summary.manifest.stages.len(),
        "compilation complete"
    );

    if summary.output.is_none() {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&summary.bytes)?;
        stdout.flush()?;
    }

    Ok(())
}
