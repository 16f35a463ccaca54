use chatsync_client::{ChatBackend, InMemoryBackend, RestBackend};
use chatsync_store::SessionState;
use chatsync_sync::SyncDriver;
use chatsync_types::{AuthNotification, SyncConfig, SyncEvent, DEMO_OWNER_ID};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod credentials;
mod repl;

use crate::config::{BackendKind, Config};
use crate::credentials::SessionCredentials;
use crate::repl::{Command, Flow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);
    tracing::info!(backend = ?config.backend.kind, "Starting chatsync");

    let session = Arc::new(SessionState::new());
    let backend = build_backend(&config, Arc::clone(&session))?;
    let driver = SyncDriver::builder()
        .backend(backend)
        .session(session)
        .config(SyncConfig::from(&config.sync))
        .build()?;

    let printer = tokio::spawn(print_events(driver.clone()));

    if let Some(identity) = &config.identity {
        driver
            .handle_session(AuthNotification::SignedIn(identity.to_identity()))
            .await;
    }

    println!("{}", repl::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };
        if repl::execute(&driver, command).await == Flow::Quit {
            break;
        }
    }

    driver.shutdown();
    printer.abort();
    tracing::info!("Bye");
    Ok(())
}

fn build_backend(config: &Config, session: Arc<SessionState>) -> anyhow::Result<Arc<dyn ChatBackend>> {
    let backend: Arc<dyn ChatBackend> = match config.backend.kind {
        BackendKind::Rest => {
            let credentials = SessionCredentials::new(session, config.token.clone());
            let backend = RestBackend::builder()
                .base_url(&config.backend.base_url)
                .timeout(Duration::from_secs(config.backend.timeout_secs))
                .credentials(Arc::new(credentials))
                .build()?;
            tracing::info!(base_url = backend.base_url(), "Using REST backend");
            Arc::new(backend)
        }
        BackendKind::Memory => {
            let owner = config
                .identity
                .as_ref()
                .map(|identity| identity.uid.clone())
                .unwrap_or_else(|| DEMO_OWNER_ID.to_string());
            tracing::info!("Using in-memory backend");
            Arc::new(InMemoryBackend::new(owner))
        }
    };
    Ok(backend)
}

/// Print notices, and messages that arrive in the open chat
async fn print_events(driver: SyncDriver) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut events = Box::pin(driver.event_stream());

    while let Some(event) = events.next().await {
        match event {
            SyncEvent::Notice(notice) => println!("{}", repl::render_notice(&notice)),
            SyncEvent::MessagesChanged { thread_id, count } => {
                let before = seen.insert(thread_id.clone(), count).unwrap_or(0);
                let open = driver.selected_thread().await.is_some_and(|thread| thread.id == thread_id);
                if open && count > before {
                    for message in driver.messages().await.iter().skip(before) {
                        println!("{}", repl::render_message(message));
                    }
                }
            }
            SyncEvent::SessionChanged { uid: None } => seen.clear(),
            _ => {}
        }
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so they do not interleave with the chat on stdout
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
