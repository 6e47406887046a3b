use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use easyleet_core::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const DEFAULT_LOG_FILTER: &str = "easyleet_core=info,easy_leet=info";

#[derive(Parser, Debug)]
#[command(name = "easy-leet", author, version, about = "Terminal chat client for a problem-solving service")]
struct Cli {
    /// Solver endpoint URL
    #[arg(short, long, env = "EASY_LEET_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long, env = "EASY_LEET_TIMEOUT")]
    timeout: Option<u64>,

    /// Largest file accepted for upload, in bytes
    #[arg(long)]
    max_upload_bytes: Option<u64>,

    /// Where to write logs (the terminal belongs to the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Persist the given settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("easy-leet").join("easy-leet.log"))
}

fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path.or_else(default_log_file) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {:?}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?.merged(&cli.overrides());
    if cli.save_config {
        let path = config.save()?;
        println!("Saved settings to {}", path.display());
        return Ok(());
    }
    let settings = config.settings()?;

    init_logging(cli.log_file.clone())?;
    info!(endpoint = %settings.endpoint, timeout = ?settings.timeout, "starting");

    let mut app = App::new(&settings)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
        app.poll_request().await;
    }

    Ok(())
}
