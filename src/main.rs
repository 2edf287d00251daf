//! GlowSnap - styled snapshot composer
//!
//! Drives the settings session from query strings, image messages and an
//! interactive console, and writes exported snapshots to disk.

mod bridge;
mod clipboard;
mod command;
mod config;
mod console;
mod export;
mod history;
mod markdown;
mod query;
mod session;
mod settings;
mod storage;
mod surface;
mod theme_store;
mod upload;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use console::{Console, Feedback};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::KeyValueStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(ClapParser)]
#[command(name = "glowsnap")]
#[command(about = "Compose styled snapshots of markdown or images", long_about = None)]
struct Cli {
    /// Query string or URL with settings to apply at startup
    #[arg(short, long, value_name = "QS|URL")]
    query: Option<String>,

    /// Image to post as a cross-context message (switches to image mode and exports)
    #[arg(long, value_name = "FILE")]
    post_image: Option<PathBuf>,

    /// Custom data directory (default: ~/.glowsnap)
    /// Can also be set via GLOWSNAP_DIR environment variable
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Directory for exported snapshots (overrides config)
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Exit once startup work and pending exports are done instead of opening the console
    #[arg(long)]
    batch: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage an image for the next `_cli=1` query
    StageImage {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn init_logging(data_dir: &Path, level: &str) -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config::Config::log_path(data_dir))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false) // No color codes in log file
        .init();
    Ok(())
}

fn print_feedback(feedback: &Feedback) {
    match feedback {
        Feedback::None => {}
        Feedback::Success(msg) | Feedback::Info(msg) => println!("{}", msg),
        Feedback::Error(msg) => eprintln!("{}", msg),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => config::Config::base_dir()?,
    };
    let config = match &cli.config {
        Some(path) => {
            std::fs::create_dir_all(&data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
            config::Config::load_from_file(path)?
        }
        None => config::Config::load(&data_dir)?,
    };

    init_logging(&data_dir, &config.logging.level)?;
    tracing::info!("GlowSnap starting (data dir {:?})", data_dir);

    let store: Arc<dyn KeyValueStore> =
        Arc::new(storage::FileStore::open(config::Config::store_dir(&data_dir))?);

    if let Some(Commands::StageImage { file }) = cli.command {
        let data = upload::image_data_uri(&file)?;
        store.set(storage::CLI_IMAGE_KEY, &data)?;
        println!("Staged {} ({} bytes); run with --query _cli=1 to use it", file.display(), data.len());
        return Ok(());
    }

    let export_dir = cli
        .export_dir
        .clone()
        .unwrap_or_else(|| config.export_dir(&data_dir));
    let sink = export::DirectorySink::new(export_dir.clone());
    tracing::info!("Exports go to {:?}", sink.dir());

    let session = session::Session::new(
        store.clone(),
        Arc::new(export::SurfaceDump),
        Arc::new(sink),
        config.timing(),
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let listener = session.listen(rx);

    if let Some(query) = &cli.query {
        let outcome = session.apply_query(query);
        tracing::debug!("Query applied (export: {})", outcome.export);
    }

    if let Some(path) = &cli.post_image {
        let data = upload::image_data_uri(path)?;
        tx.send(bridge::image_message(&data))
            .context("Message listener stopped")?;
    }

    if cli.batch {
        drop(tx);
        listener.await.context("Message listener failed")?;
        session.wait_idle().await;
        tracing::info!("Batch run finished");
        return Ok(());
    }

    let history = history::CommandHistory::load(store);
    let mut console = Console::new(session, history, export_dir);
    println!("Type 'help' for commands or '.help' for controls.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while console.is_running() {
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        print_feedback(&console.submit(&line));
    }

    drop(tx);
    if console.session().is_exporting() {
        println!("Waiting for pending exports...");
    }
    console.session().wait_idle().await;
    tracing::info!("GlowSnap exiting");
    Ok(())
}
