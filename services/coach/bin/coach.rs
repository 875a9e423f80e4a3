//! Main Entrypoint for the Englishly Coach
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building the collaborators (chat model, report store, room).
//! 4. Running one coaching session against the terminal.
//! 5. Logging the session's usage summary on shutdown.

use anyhow::Context;
use clap::Parser;
use englishly_coach::{
    config::Config, console::ConsoleDialogue, room::LocalRoom, runner::run_console_session,
};
use englishly_core::{
    CoachSession, SessionDeps,
    llm_client::{LLMClient, OpenAICompatibleClient},
};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{Instrument, error, info};

/// Run a voice-free English coaching session in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Name of the room the session runs in; the report key is derived from it.
    #[arg(long)]
    room: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!("Configuration loaded. Initializing session...");

    // --- 3. Initialize Collaborators ---
    let settings = config.session_settings()?;
    let llm: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        config.openai_config(),
        config.chat_model.clone(),
    ));
    let dialogue = Arc::new(ConsoleDialogue::new(llm, Box::new(tokio::io::stdout())));
    let room_name = args
        .room
        .unwrap_or_else(|| format!("room-{}", rand::random::<u32>()));

    let mut session = CoachSession::new(
        SessionDeps {
            dialogue: dialogue.clone(),
            store: config.report_store(),
            room: Arc::new(LocalRoom::new(room_name.clone())),
        },
        settings,
    );
    dialogue.attach_metrics(session.metrics_sink());

    // --- 4. Run the Session ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        store = ?config.report_store,
        room = %room_name,
        "Session configured. Type your answers; press Ctrl+D to leave."
    );
    let session_span = tracing::info_span!("coach_session", room = %room_name);
    let result = run_console_session(
        &mut session,
        &dialogue,
        BufReader::new(tokio::io::stdin()),
    )
    .instrument(session_span)
    .await;
    if let Err(e) = &result {
        error!(error = ?e, "Coaching session terminated with error.");
    }

    // --- 5. Shutdown ---
    session.shutdown().await;
    result
}
