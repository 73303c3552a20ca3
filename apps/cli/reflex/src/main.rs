use reflex::cli::{Cli, Command, page_url};
use reflex::error::ReflexError;
use reflex::input::parse_line;
use reflex::logger::initialize as LoggerInitialize;
use reflex::page::TerminalPage;

use reflex_client::NORMAL_CLOSE_CODE;
use reflex_client::config::{CONFIG_FILE_NAME, ClientConfig};
use reflex_client::connection::ConnectionState;
use reflex_client::event::MouseEvent;
use reflex_client::session::Session;

use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tokio::signal::ctrl_c;
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};

/// Upper bound on waiting for the close handshake before exiting.
const CLOSE_GRACE: Duration = Duration::from_secs(1);
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(10);
const EXIT_REASON: &str = "client exiting";

#[tokio::main]
async fn main() -> Result<(), ReflexError> {
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();

    // Initialize logger FIRST
    let log_dir = cli.log_dir()?;
    LoggerInitialize(&log_dir)?;

    info!("reflex starting");
    info!("Log directory: {}", log_dir.display());

    let config_dir = cli.config_dir()?;

    if cli.command == Some(Command::InitConfig) {
        ClientConfig::default().save(&config_dir)?;
        println!("{}", config_dir.join(CONFIG_FILE_NAME).display());
        return Ok(());
    }

    let config = cli.apply(ClientConfig::load(&config_dir)?)?;
    run(&config).await
}

async fn run(config: &ClientConfig) -> Result<(), ReflexError> {
    let page_url = page_url(config)?;
    let session = Session::new(page_url, config, TerminalPage::stdout())?;

    info!(
        "Attaching to {page_url} via {} (retry delay {:?})",
        session.connection().address(),
        config.retry_delay()
    );

    // A server that is not up yet is not fatal: the next event connects again.
    if let Err(e) = session.connect().await {
        warn!("Initial connect failed: {e}");
    }

    let mut lines = BufReader::new(stdin()).lines();
    let interrupted = ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = &mut interrupted => {
                info!("Interrupted, closing");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => send_line(&session, &line).await,
                Ok(None) => {
                    info!("Input closed, closing");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {e}");
                    break;
                }
            },
        }
    }

    session.close(Some(NORMAL_CLOSE_CODE), Some(EXIT_REASON));

    let _ = TokioTimeout(CLOSE_GRACE, async {
        while session.connection().state() == ConnectionState::Closing {
            TokioSleep(CLOSE_POLL_INTERVAL).await;
        }
    })
    .await;

    info!("reflex stopped");
    Ok(())
}

async fn send_line(session: &Session<TerminalPage>, line: &str) {
    let command = match parse_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(e) => {
            warn!("Skipping input line: {e}");
            return;
        }
    };

    if let Err(e) = session
        .event(&MouseEvent::click(), &command.name, command.args)
        .await
    {
        error!("Failed to send event '{}': {e}", command.name);
    }
}
