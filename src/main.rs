//! # Main Entry Point
//!
//! Initializes the application using the layered architecture:
//! - Domain: Configuration, Types and Traits
//! - Infrastructure: Telegram Bot API, SQLite storage
//! - Application: Link parsing, Decoder, Extractor, Router, State
//! - Interface: Command Handlers, HTTP server
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing_appender::non_blocking::WorkerGuard;

use crate::application::decoder::decode_quiz_param;
use crate::application::extractor::{QuizExtractor, render_payload};
use crate::application::link::resolve_reference;
use crate::application::parsing::parse_payload;
use crate::application::router::CommandRouter;
use crate::application::state::BotState;
use crate::domain::config::AppConfig;
use crate::domain::traits::QuizSource;
use crate::infrastructure::storage::QuizStore;
use crate::infrastructure::telegram::{BotApi, TelegramChat};
use crate::interface::http::{self, WebContext};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);
/// How long in-flight messages may finish after an interrupt.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "quiz-extractor", version, about = "Extracts questions and answers from QuizBot links")]
struct Cli {
    /// Path to the YAML configuration file (optional; environment variables override it)
    #[arg(short, long, global = true, default_value = "data/config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server and the Telegram bot (default)
    Serve,
    /// Decode a QuizBot link locally and print the result
    Decode { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Decode { url } => {
            let _guard = init_logging(&config, false)?;
            run_decode(&config, &url)
        }
        Command::Serve => {
            let _guard = init_logging(&config, true)?;
            run_server(config).await
        }
    }
}

/// Console + file logging. The returned guard flushes the file writer on drop.
fn init_logging(config: &AppConfig, console: bool) -> Result<WorkerGuard> {
    let data_dir = Path::new(&config.system.data_dir);
    if !data_dir.exists() {
        fs::create_dir_all(data_dir).context("Failed to create data directory")?;
    }

    // Clear previous session log
    let log_path = data_dir.join(&config.system.log_file);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(data_dir, &config.system.log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,sqlx=warn,hyper=warn,reqwest=warn")
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let console_layer = console.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stdout));

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}

fn run_decode(config: &AppConfig, url: &str) -> Result<()> {
    let param = resolve_reference(url, &config.telegram.quiz_bot).context("Invalid QuizBot link")?;
    let decoded = decode_quiz_param(&param).context("Could not decode the start parameter")?;
    let payload = parse_payload(&decoded.text);

    println!("Start parameter: {param}");
    println!("Method: {} ({:?})", decoded.method.as_str(), decoded.encoding);
    println!("Decoded: {}", decoded.text);
    println!();
    print!("{}", render_payload(&payload));
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Starting Quiz Extractor...");

    // 2. Initialize Infrastructure
    let store = QuizStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to open the quiz database")?;

    // 3. Initialize Application Components
    let extractor = Arc::new(QuizExtractor::new(
        store,
        live_source(&config),
        config.telegram.quiz_bot.clone(),
        &config.extraction,
    ));
    let state_path = config.system.state_path();
    let state = Arc::new(Mutex::new(BotState::load(&state_path)));
    // Owned here so in-flight messages outlive the polling loop on shutdown.
    let mut tasks = JoinSet::new();

    // 4. Web server
    let web = async {
        if !config.web.enabled {
            tracing::info!("Web server disabled");
            return std::future::pending::<Result<()>>().await;
        }
        let app = http::create_app(WebContext {
            extractor: extractor.clone(),
            secret_key: config.web.secret_key.clone(),
        });
        http::serve(&config.web_addr(), app).await
    };

    // 5. Telegram bot
    let bot = async {
        let Some(token) = config.telegram.bot_token.as_deref() else {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set; the chat bot is disabled");
            return std::future::pending::<Result<()>>().await;
        };
        let api = BotApi::new(&config.telegram.api_base, token)?;
        let router = Arc::new(CommandRouter::new(
            extractor.clone(),
            state.clone(),
            state_path.clone(),
        ));
        let poll_timeout = config.telegram.poll_timeout;
        run_bot(api, router, state.clone(), &state_path, poll_timeout, &mut tasks).await
    };

    // 6. Run until one side fails or we are interrupted
    tokio::select! {
        res = web => res?,
        res = bot => res?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
    }

    drain_tasks(&mut tasks, SHUTDOWN_GRACE).await;
    state.lock().await.save(&state_path).await;
    Ok(())
}

/// Lets spawned message handlers finish, up to `grace`. Returns how many were abandoned.
async fn drain_tasks(tasks: &mut JoinSet<()>, grace: Duration) -> usize {
    if tasks.is_empty() {
        return 0;
    }
    tracing::info!("Waiting for {} in-flight messages...", tasks.len());
    let drained = tokio::time::timeout(grace, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Abandoning {} messages still in flight", tasks.len());
    }
    tasks.len()
}

/// Live scraping needs an MTProto user session, which this build has no client for.
fn live_source(config: &AppConfig) -> Option<Arc<dyn QuizSource>> {
    if config.userbot.is_complete() {
        tracing::warn!(
            "Userbot credentials found, but no MTProto client is available; \
             serving quizzes from the database and local decoding only"
        );
    } else {
        tracing::info!("Telegram API credentials not provided; live extraction disabled");
    }
    None
}

async fn run_bot(
    api: BotApi,
    router: Arc<CommandRouter>,
    state: Arc<Mutex<BotState>>,
    state_path: &Path,
    poll_timeout: u64,
    tasks: &mut JoinSet<()>,
) -> Result<()> {
    let me = api
        .get_me()
        .await
        .context("Failed to authenticate with the Telegram Bot API")?;
    tracing::info!("Logged in as {}", me.display());

    loop {
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                tracing::error!("Message task failed: {}", e);
            }
        }

        let offset = state.lock().await.update_offset;
        let updates = match api.get_updates(offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("Polling for updates failed: {}", e);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };
        if updates.is_empty() {
            continue;
        }

        {
            let mut guard = state.lock().await;
            for update in &updates {
                guard.update_offset(update.update_id);
            }
            guard.save(state_path).await;
        }

        for update in updates {
            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text else {
                continue;
            };
            if message.from.as_ref().is_some_and(|u| u.is_bot) {
                continue;
            }

            let sender = message
                .from
                .as_ref()
                .map(|u| u.display())
                .unwrap_or_default();
            tracing::info!("Received message from {}: \n{}", sender, text);

            let chat = TelegramChat::new(api.clone(), message.chat.id);
            let router = router.clone();
            tasks.spawn(async move {
                if let Err(e) = router.route(&chat, &text, &sender).await {
                    tracing::error!("Failed to route message: {:#}", e);
                }
            });
        }
    }
}
