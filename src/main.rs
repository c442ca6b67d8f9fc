use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use banter::conversation::TurnStatus;
use banter::{App, ChatSession, Config, TurnController};

/// Banter - chat with an AI assistant and hear its replies
#[derive(Parser)]
#[command(name = "banter", version, about)]
struct Cli {
    /// Chat model to request (overrides config file and `BANTER_MODEL`)
    #[arg(short, long)]
    model: Option<String>,

    /// Write speech to a file instead of playing it
    #[arg(long)]
    no_audio: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive conversation (default)
    Chat,
    /// Edit the stored voice and API key
    Settings,
    /// Send a single message and print the reply
    Ask {
        /// Message text
        text: String,
    },
    /// Speak text with the stored voice
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,banter=info",
        1 => "info,banter=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if cli.no_audio {
        config.voice.audio_enabled = false;
    }
    tracing::debug!(?config, "loaded configuration");

    let mut app = App::load(config)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(app).await,
        Command::Settings => banter::setup::run_settings(&mut app),
        Command::Ask { text } => ask(&app, &text).await,
        Command::Say { text } => say(&app, &text).await,
    }
}

/// Interactive session on stdin/stdout
async fn chat(app: App) -> anyhow::Result<()> {
    tracing::info!(model = %app.config().model, voice = %app.voice(), "starting chat session");

    let provider = app.completion();
    let speech = match app.speech() {
        Ok(speech) => Some(speech),
        Err(e) => {
            tracing::debug!(error = %e, "speech disabled");
            None
        }
    };

    let mut session = ChatSession::new(app, provider, speech, std::io::stdout());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session.run(stdin).await?;

    Ok(())
}

/// One round trip, printing the reply
async fn ask(app: &App, text: &str) -> anyhow::Result<()> {
    let (mut controller, mut completions) =
        TurnController::new(app.completion(), app.config().system_prompt.clone());

    let pending = controller
        .send_turn(text)
        .context("message must not be empty")?;

    let completion = completions
        .recv()
        .await
        .context("completion task ended without a result")?;
    controller.apply(completion);

    let reply = controller
        .conversation()
        .get(pending)
        .context("reply missing from conversation")?;

    match &reply.status {
        TurnStatus::Complete => {
            println!("{}", reply.text);
            Ok(())
        }
        TurnStatus::Failed { error } => anyhow::bail!("no reply: {error}"),
        TurnStatus::Pending => anyhow::bail!("reply still pending"),
    }
}

/// Speak and wait for playback to finish
async fn say(app: &App, text: &str) -> anyhow::Result<()> {
    let speech = app.speech().context("speech needs an API key; run `banter settings`")?;
    println!("Speaking with voice {}...", app.voice());
    speech.speak(text, app.voice()).await?;
    Ok(())
}
