//! Transcript Assistant
//!
//! `serve` runs the HTTP API; `chat` and `transcripts` talk to a running
//! server from the terminal.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_assistant::client::{AssistantClient, TranscriptListing};
use transcript_assistant::config::Config;
use transcript_assistant::conversation::{
    ChatSession, ConversationState, Sender, WELCOME_MESSAGE,
};
use transcript_assistant::{app, AppState};

#[derive(Parser)]
#[command(name = "transcript-assistant")]
#[command(about = "Personal AI assistant over your transcripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Interactive chat against a running server
    Chat {
        #[command(flatten)]
        remote: Remote,
    },
    /// Manage the transcript vector store through a running server
    Transcripts {
        #[command(flatten)]
        remote: Remote,

        #[command(subcommand)]
        action: TranscriptAction,
    },
}

#[derive(clap::Args)]
struct Remote {
    #[arg(long, env = "ASSISTANT_SERVER_URL", default_value = "http://localhost:3000")]
    server_url: String,

    /// Access password, prompted for when the server requires one
    #[arg(long, env = "ASSISTANT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum TranscriptAction {
    /// List every transcript in the vector store
    List {
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Upload a plain-text transcript
    Upload { path: PathBuf },
    /// Delete a transcript by file id
    Delete { file_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcript_assistant=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Chat { remote } => run_chat(remote).await,
        Commands::Transcripts { remote, action } => run_transcripts(remote, action).await,
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::debug!(?config, "configuration loaded");

    let state = AppState::from_config(config)?;
    tracing::info!(
        backend = %state.backend.kind(),
        access_gate = state.gate.is_enabled(),
        "chat backend ready"
    );

    let app = app(state);

    tracing::info!("Transcript assistant running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect and log in when the server's access gate is on
async fn connect(remote: Remote) -> anyhow::Result<AssistantClient> {
    let mut client = AssistantClient::new(remote.server_url.as_str())?;

    let health = client
        .health()
        .await
        .with_context(|| format!("server not reachable at {}", remote.server_url))?;

    if health.access_gate {
        let password = match remote.password {
            Some(password) => password,
            None => prompt("Password: ")?,
        };
        client.login(&password).await?;
    }

    Ok(client)
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

async fn run_chat(remote: Remote) -> anyhow::Result<()> {
    let client = connect(remote).await?;
    let state = ConversationState::new().with_welcome(WELCOME_MESSAGE);
    let mut session = ChatSession::with_state(client, state);

    for turn in session.state().turns() {
        println!("AI: {}\n", turn.content);
    }
    println!("Type 'exit' or 'quit' to leave\n");

    loop {
        let input = prompt("You: ")?;

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        if let Some(turn) = session.send(&input).await {
            let label = match turn.sender {
                Sender::Ai => "AI",
                Sender::User => "You",
            };
            println!("{}: {}\n", label, turn.content);
        }
    }

    let mut client = session.into_transport();
    if let Err(e) = client.logout().await {
        tracing::debug!("logout failed: {}", e);
    }
    println!("Goodbye!");

    Ok(())
}

async fn run_transcripts(remote: Remote, action: TranscriptAction) -> anyhow::Result<()> {
    let client = connect(remote).await?;

    match action {
        TranscriptAction::List { limit } => {
            let mut listing = TranscriptListing::new();
            let mut cursor: Option<String> = None;

            loop {
                let page = client.list_transcripts(Some(limit), cursor.as_deref()).await?;
                listing.apply_page(page);
                match listing.next_cursor() {
                    Some(next) => cursor = Some(next.to_string()),
                    None => break,
                }
            }

            if listing.files().is_empty() {
                println!("No transcripts uploaded yet");
            }
            for file in listing.files() {
                let created = chrono::DateTime::from_timestamp(file.created_at, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {:<40} {:>10} B  {:<12} {}",
                    file.id, file.filename, file.bytes, file.status, created
                );
            }
        }
        TranscriptAction::Upload { path } => {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("upload path has no file name")?
                .to_string();
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;

            let receipt = client.upload_transcript(&filename, bytes).await?;
            println!("{} ({})", receipt.message, receipt.file_id);
        }
        TranscriptAction::Delete { file_id } => {
            let message = client.delete_transcript(&file_id).await?;
            println!("{}", message);
        }
    }

    Ok(())
}
