use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledgerlens::{
    config, logging,
    processing::{AnalysisQuery, AnalysisService, load_document_text},
};

#[derive(Parser)]
#[command(
    name = "ledgerlens-cli",
    about = "Analyze a local financial document without running the HTTP server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full role sequence against a local PDF.
    Analyze {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        query: Option<String>,
        /// Print every role's output, not only the final analysis.
        #[arg(long)]
        stages: bool,
    },
    /// Print the normalized text extracted from a local PDF.
    Extract {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze {
            file,
            query,
            stages,
        } => analyze(file, query, stages).await,
        Command::Extract { file } => extract(file).await,
    }
}

async fn analyze(file: PathBuf, query: Option<String>, stages: bool) -> Result<()> {
    let config = config::init_config().context("Failed to load configuration")?;
    let service =
        AnalysisService::from_config(config).context("Failed to build analysis pipeline")?;
    let filename = display_name(&file);
    let query = AnalysisQuery::from_input(query);

    let result = service
        .analyze_file(&file, &filename, &query)
        .await
        .with_context(|| format!("Analysis of {} failed", file.display()))?;

    if stages {
        for stage in &result.stages {
            println!("=== {} ===\n{}\n", stage.role, stage.output);
        }
    } else {
        println!("{}", result.analysis);
    }
    Ok(())
}

async fn extract(file: PathBuf) -> Result<()> {
    let filename = display_name(&file);
    let text = load_document_text(&file, &filename)
        .await
        .with_context(|| format!("Failed to extract text from {}", file.display()))?;
    println!("{text}");
    Ok(())
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
