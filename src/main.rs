use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use wxr_core::{AppConfig, ResponseRecord, Route};
use wxr_rag::{CollectionStatus, IngestReport, Reconciliation};
use wxr_router::{AppContext, Router};

#[derive(Parser)]
#[command(name = "wxr")]
#[command(about = "Answers weather questions live and everything else from your documents", long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question
    Ask {
        question: String,
    },
    /// Load a PDF, Markdown, HTML or text file into a collection
    Ingest {
        path: PathBuf,
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Show the state of a collection
    Status {
        #[arg(short, long)]
        collection: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    debug!(config = %serde_json::to_string(&config)?, "configuration loaded");

    let context = Arc::new(AppContext::from_config(config)?);
    let router = Router::new(context.clone());

    match cli.command {
        Some(Command::Ask { question }) => {
            let record = router.dispatch(question).await;
            print_record(&record, cli.json)?;
        }
        Some(Command::Ingest { path, collection }) => {
            let report = context.ingest(&path, collection.as_deref()).await?;
            print_report(&report, cli.json)?;
        }
        Some(Command::Status { collection }) => {
            let status = context.status(collection.as_deref()).await?;
            print_status(&status, cli.json)?;
        }
        None => interactive(&router, cli.json).await?,
    }

    Ok(())
}

async fn interactive(router: &Router, json: bool) -> Result<()> {
    display_banner();

    loop {
        print!("{} ", "wxr>".cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("{}", "👋 Goodbye!".green());
                break;
            }
            "help" => {
                print_help();
                continue;
            }
            "reset" => {
                router.context().reset_embeddings().await;
                println!("{} Embedding backend will be selected again on the next question", "🔄".cyan());
                continue;
            }
            "status" => {
                match router.context().status(None).await {
                    Ok(status) => print_status(&status, json)?,
                    Err(e) => println!("{} {}", "❌".red(), e),
                }
                continue;
            }
            _ => {}
        }

        if let Some(path) = input.strip_prefix("ingest ") {
            match router.context().ingest(Path::new(path.trim()), None).await {
                Ok(report) => print_report(&report, json)?,
                Err(e) => println!("{} {}", "❌".red(), e),
            }
            continue;
        }

        let record = router.dispatch(input).await;
        print_record(&record, json)?;
    }

    Ok(())
}

fn display_banner() {
    println!("{}", "WXR: weather and document questions".bold());
    println!("Type a question, or {} for commands.\n", "help".green());
}

fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask about the weather or your documents", "<question>".green());
    println!("  {} - Add a file to the default collection", "ingest <path>".green());
    println!("  {} - Show the default collection", "status".green());
    println!("  {} - Select the embedding backend again", "reset".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
}

fn print_record(record: &ResponseRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    let label = match record.route {
        Route::Weather => "🌤  weather".yellow(),
        Route::Rag => "📄 rag".blue(),
    };
    println!("{}", label);
    println!("{}", record.answer);

    if !record.sources.is_empty() {
        println!("\n{}", "Sources:".bold());
        for (i, source) in record.sources.iter().enumerate() {
            let name = source.get("source").and_then(|v| v.as_str()).unwrap_or("unknown");
            match source.get("page") {
                Some(page) => println!("  {}. {} (page {})", i + 1, name, page),
                None => println!("  {}. {}", i + 1, name),
            }
        }
    }
    Ok(())
}

fn print_report(report: &IngestReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "{} Ingested {} chunks into '{}'",
        "✅".green(),
        report.chunk_count,
        report.collection.bold()
    );
    match report.reconciliation {
        Reconciliation::Created { dimension } => {
            println!("  created collection with dimension {}", dimension)
        }
        Reconciliation::Recreated { previous, dimension } if previous == dimension => println!(
            "  {} collection recreated for a new embedding model; previous contents were deleted",
            "⚠️".yellow()
        ),
        Reconciliation::Recreated { previous, dimension } => println!(
            "  {} collection recreated ({} -> {}); previous contents were deleted",
            "⚠️".yellow(),
            previous,
            dimension
        ),
        Reconciliation::Unchanged { .. } => {}
    }
    Ok(())
}

fn print_status(status: &CollectionStatus, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }

    println!("{} {} @ {}", "Collection".bold(), status.collection, status.endpoint);
    if !status.exists {
        println!("  {}", "not created yet".yellow());
        return Ok(());
    }
    if let Some(dimension) = status.dimension {
        println!("  dimension: {}", dimension);
    }
    if let Some(points) = status.points {
        println!("  points: {}", points);
    }
    println!("  auto-recreate: {}", status.auto_recreate);
    Ok(())
}
