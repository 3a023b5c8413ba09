//! ragkit command line
//!
//! ```text
//! ragkit build --source corpus.csv --output vector_store.bin
//! ragkit query "What does Article 14 say?" --top-n 3
//! ragkit ask "What does Article 14 say?"
//! ragkit chat
//! ```

use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use ragkit_core::builder::{BuildOptions, BuildReport, StoreBuilder};
use ragkit_core::config::RagConfig;
use ragkit_core::error::Error;
use ragkit_core::ingest::CorpusIngestor;
use ragkit_core::logging::{init_console_logging, init_logging};
use ragkit_core::pipeline::RagPipeline;
use ragkit_core::retriever::Retriever;
use ragkit_providers::services_from_config;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

const DEFAULT_CONFIG_FILE: &str = "ragkit.yaml";
const RULE: &str = "--------------------------------------------------";

#[derive(Parser)]
#[command(name = "ragkit", version, about = "Retrieval-augmented answers over a CSV corpus")]
struct Cli {
    /// Path to a YAML config file (defaults to ./ragkit.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Also write daily rotated log files into this directory
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed a CSV column into a vector store
    Build {
        /// CSV file holding the corpus
        #[arg(long)]
        source: Option<PathBuf>,
        /// Zero-based column holding the passage text
        #[arg(long)]
        column: Option<usize>,
        /// Embedding model
        #[arg(long)]
        model: Option<String>,
        /// Where to write the store
        #[arg(long)]
        output: Option<PathBuf>,
        /// Embedding requests in flight at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Print the passages most similar to a question
    Query {
        /// The question
        question: String,
        /// Vector store to search
        #[arg(long)]
        store: Option<PathBuf>,
        /// Embedding model (must match the one the store was built with)
        #[arg(long)]
        model: Option<String>,
        /// Number of passages to return
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Answer one question from retrieved context
    Ask {
        /// The question
        question: String,
    },
    /// Interactive question loop, building the store first if needed
    Chat,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        report_error(&e);
        process::exit(1);
    }
}

fn report_error(e: &anyhow::Error) {
    match e.downcast_ref::<Error>() {
        Some(inner) => eprintln!("Error [{}]: {:#}", inner.stage(), e),
        None => eprintln!("Error: {:#}", e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.log_dir {
        Some(dir) => init_logging(dir, "ragkit.log", &cli.log_level)?,
        None => init_console_logging(&cli.log_level)?,
    }

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Build {
            source,
            column,
            model,
            output,
            concurrency,
        } => {
            if let Some(source) = source {
                config.source_path = source;
            }
            if let Some(column) = column {
                config.text_column = column;
            }
            if let Some(model) = model {
                config.embedding_model = model;
            }
            if let Some(output) = output {
                config.store_path = output;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            config.validate()?;
            build(&config).await
        }
        Command::Query {
            question,
            store,
            model,
            top_n,
        } => {
            if let Some(store) = store {
                config.store_path = store;
            }
            if let Some(model) = model {
                config.embedding_model = model;
            }
            if let Some(top_n) = top_n {
                config.top_n = top_n;
            }
            config.validate()?;
            query(&config, &question).await
        }
        Command::Ask { question } => {
            let pipeline = pipeline(config)?;
            answer(&pipeline, &question).await
        }
        Command::Chat => chat(pipeline(config)?).await,
    }
}

/// Config file (explicit, or ./ragkit.yaml if present), then env overrides
fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    let config = match path {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            RagConfig::from_file(DEFAULT_CONFIG_FILE)?
        }
        None => RagConfig::default(),
    };
    let config = config.apply_env()?;
    debug!(provider = ?config.provider, model = %config.embedding_model, "Configuration loaded");
    Ok(config)
}

fn pipeline(config: RagConfig) -> Result<RagPipeline> {
    let services = services_from_config(&config)?;
    Ok(RagPipeline::new(config, services.embedder, services.provider)?)
}

async fn build(config: &RagConfig) -> Result<()> {
    println!(
        "Loading data from '{}' (column {})...",
        config.source_path.display(),
        config.text_column
    );
    let ingestor = CorpusIngestor::new(config.text_column);
    let records = ingestor.read_path(&config.source_path)?;
    println!("Found {} text chunks to process.", records.len());

    let services = services_from_config(config)?;
    let builder = StoreBuilder::new(services.embedder, BuildOptions::from(config));
    let report = builder.build_and_save(records, &config.store_path).await?;

    print_report(&report);
    println!(
        "Vector database created and saved to '{}'",
        config.store_path.display()
    );
    Ok(())
}

fn print_report(report: &BuildReport) {
    println!(
        "Embedded {}/{} chunks ({} skipped).",
        report.store.len(),
        report.attempted,
        report.failures.len()
    );
    for failure in &report.failures {
        println!(
            "  skipped #{}: '{}' ({})",
            failure.index, failure.preview, failure.error
        );
    }
}

async fn query(config: &RagConfig, question: &str) -> Result<()> {
    let services = services_from_config(config)?;
    let retriever = Retriever::new(services.embedder, config.embedding_model.clone());
    let passages = retriever
        .retrieve_from_path(question, &config.store_path, config.top_n)
        .await?;

    if passages.is_empty() {
        println!("No passages found.");
        return Ok(());
    }
    for (rank, passage) in passages.iter().enumerate() {
        println!("{}. [{:.4}] {}", rank + 1, passage.score, passage.text);
    }
    Ok(())
}

/// Retrieve, then stream the generated answer to stdout
async fn answer(pipeline: &RagPipeline, question: &str) -> Result<()> {
    if let Some(report) = pipeline.ensure_store().await? {
        print_report(&report);
    }

    let answer = pipeline.ask(question).await?;
    println!("Found relevant context. Generating answer...");
    println!("{}", RULE);

    let mut fragments = Box::pin(answer.stream.fragments());
    while let Some(fragment) = fragments.next().await {
        print!("{}", fragment?);
        io::stdout().flush()?;
    }
    println!();
    Ok(())
}

async fn chat(pipeline: RagPipeline) -> Result<()> {
    let config = pipeline.config();

    if config.store_path.exists() {
        println!("Vector database found: '{}'", config.store_path.display());
    } else {
        println!(
            "Vector database ('{}') not found.",
            config.store_path.display()
        );
        println!("Building the database... (This may take a few minutes)");
        if let Some(report) = pipeline.ensure_store().await? {
            print_report(&report);
        }
        println!("Database built successfully!");
    }

    println!("\nAsk a question. Type 'exit' or press Ctrl+C to quit.");
    println!("{}", RULE);

    let lines = BufReader::new(tokio::io::stdin()).lines();
    match chat_loop(&pipeline, lines, tokio::signal::ctrl_c()).await? {
        ChatEnd::Exit => println!("Goodbye!"),
        ChatEnd::Interrupted => println!("\n\nExiting chatbot. Goodbye!"),
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ChatEnd {
    /// `exit` typed or input closed
    Exit,
    /// Ctrl+C while waiting for input or streaming an answer
    Interrupted,
}

async fn chat_loop<R, I>(
    pipeline: &RagPipeline,
    mut lines: Lines<R>,
    interrupt: I,
) -> Result<ChatEnd>
where
    R: AsyncBufRead + Unpin,
    I: Future,
{
    tokio::pin!(interrupt);
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let line = tokio::select! {
            biased;
            _ = &mut interrupt => return Ok(ChatEnd::Interrupted),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(ChatEnd::Exit);
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            return Ok(ChatEnd::Exit);
        }
        if question.is_empty() {
            continue;
        }

        println!("\nSearching for relevant passages...");
        let outcome = tokio::select! {
            biased;
            _ = &mut interrupt => return Ok(ChatEnd::Interrupted),
            outcome = answer(pipeline, question) => outcome,
        };
        match outcome {
            Ok(()) => {}
            Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::NoContext)) => {
                println!("Could not find relevant information. Please try rephrasing your question.");
            }
            Err(e) => report_error(&e),
        }
        println!("{}", RULE);
    }
}
