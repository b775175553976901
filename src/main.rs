use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

mod api;
mod app;
mod config;
mod error;
mod handler;
mod lifecycle;
mod markdown;
mod messages;
mod reminders;
mod session;
mod tui;
mod ui;

#[cfg(test)]
mod test_support;

use api::{HealthApi, HttpApi};
use app::App;
use config::Config;
use session::SessionContext;

#[derive(Parser)]
#[command(name = "healthdesk")]
#[command(about = "Terminal dashboard for the healthcare assistant: chat, report analysis and medication reminders")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides config.json)
    #[arg(long, env = "HEALTHDESK_API", global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session for the dashboard
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Check that the backend is reachable
    Health,
    /// Show saved settings, saving any given with --api or --timeout
    Config {
        /// Per-request timeout in seconds, 0 to clear
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    let api_override = cli.api.is_some();
    if let Some(api) = cli.api {
        config.api_base = api;
    }

    init_file_logging(&Config::data_dir()?)?;
    tracing::info!(api_base = %config.api_base, "healthdesk starting");

    match cli.command {
        None => run_dashboard(&config).await,
        Some(Commands::Login { username, password }) => login(&config, &username, password).await,
        Some(Commands::Logout) => logout(),
        Some(Commands::Health) => health(&config).await,
        Some(Commands::Config { timeout }) => update_config(config, api_override, timeout),
    }
}

fn init_file_logging(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let log_path = data_dir.join("healthdesk.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}

async fn run_dashboard(config: &Config) -> Result<()> {
    let Some(session) = SessionContext::load_from(&SessionContext::default_path()?)? else {
        bail!("Not logged in. Run `healthdesk login <username>` first");
    };
    let api: Arc<dyn HealthApi> = Arc::new(HttpApi::new(config)?);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let mut app = App::new(api, session, events.sender());
    app.reload_reminders();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event).await?;
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!("healthdesk exiting");
    result
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn login(config: &Config, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let api = HttpApi::new(config)?;
    let session = api
        .login(username, &password)
        .await
        .with_context(|| format!("could not sign in to {}", api.base_url()))?;

    session.save_to(&SessionContext::default_path()?)?;
    tracing::info!(user_id = session.user_id, "signed in");
    println!("Signed in as {} (user {})", session.username, session.user_id);
    Ok(())
}

fn logout() -> Result<()> {
    if SessionContext::clear_at(&SessionContext::default_path()?)? {
        println!("Signed out");
    } else {
        println!("No saved session");
    }
    Ok(())
}

async fn health(config: &Config) -> Result<()> {
    let api = HttpApi::new(config)?;
    let status = api
        .health()
        .await
        .with_context(|| format!("{} is not reachable", api.base_url()))?;
    println!("{} {}", api.base_url(), status);
    Ok(())
}

fn update_config(mut config: Config, api_override: bool, timeout: Option<u64>) -> Result<()> {
    if let Some(secs) = timeout {
        config.request_timeout_secs = (secs > 0).then_some(secs);
    }
    if api_override || timeout.is_some() {
        config.save()?;
        tracing::info!(api_base = %config.api_base, "settings saved");
    }

    println!("api_base: {}", config.api_base);
    match config.request_timeout_secs {
        Some(secs) => println!("request_timeout_secs: {}", secs),
        None => println!("request_timeout_secs: (none)"),
    }
    Ok(())
}
