use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;
use voxrag_client::config::Config;
use voxrag_client::{AudioClip, AudioSink, ChatbotClient, CommandSink, DirectorySink, run_player};
use voxrag_types::{WireEvent, audio};

const STREAM_ERROR_MESSAGE: &str = "Sorry, there was an error processing your request.";

#[derive(Parser)]
#[command(version, about = "Ask the chat server and listen to the answer")]
struct Cli {
    /// Question to ask; without one, questions are read from stdin line by line
    message: Option<String>,

    /// Chat server base URL, overrides CHATBOT_URL
    #[arg(long)]
    url: Option<String>,

    /// Request spoken audio alongside the text
    #[arg(long)]
    voice: bool,

    /// Player command for each clip, overrides AUDIO_PLAYER
    #[arg(long)]
    player: Option<String>,

    /// Write audio segments into this directory instead of playing them
    #[arg(long, value_name = "DIR")]
    save_audio: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load client configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let server_url = cli.url.clone().unwrap_or(config.server_url.clone());
    let client = ChatbotClient::new(&server_url);
    let sink = if cli.voice {
        Some(audio_sink(&cli, &config)?)
    } else {
        None
    };
    tracing::info!("Using chat server at {}", server_url);

    if let Some(message) = cli.message.as_deref() {
        return ask(&client, message, sink).await;
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            prompt()?;
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }
        ask(&client, message, sink.clone()).await?;
        prompt()?;
    }
    Ok(())
}

fn audio_sink(cli: &Cli, config: &Config) -> Result<Arc<dyn AudioSink>> {
    if let Some(dir) = &cli.save_audio {
        return Ok(Arc::new(DirectorySink::new(dir.clone())));
    }
    let command = cli
        .player
        .clone()
        .or(config.player.clone())
        .context("--voice needs --player, AUDIO_PLAYER or --save-audio")?;
    Ok(Arc::new(CommandSink::parse(&command)?))
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

/// Streams one answer: text goes to stdout as it arrives, audio to the player.
/// Waits for playback of the last clip before returning.
async fn ask(client: &ChatbotClient, message: &str, sink: Option<Arc<dyn AudioSink>>) -> Result<()> {
    let voice = sink.is_some();
    let (clips, player) = match sink {
        Some(sink) => {
            let (tx, rx) = mpsc::channel::<AudioClip>(64);
            (Some(tx), Some(tokio::spawn(run_player(sink, rx))))
        }
        None => (None, None),
    };

    let mut stdout = std::io::stdout();
    match client.stream_chat(message, voice).await {
        Ok(mut records) => {
            let mut sequence = 0;
            while let Some(record) = records.next().await {
                match record {
                    Ok(WireEvent::Text { content }) => {
                        write!(stdout, "{}", content)?;
                        stdout.flush()?;
                    }
                    Ok(WireEvent::Audio { content, is_final }) => {
                        let Some(clips) = &clips else {
                            tracing::debug!("Ignoring audio record, voice is off");
                            continue;
                        };
                        match audio::decode(&content) {
                            Ok(payload) => {
                                let clip = AudioClip {
                                    sequence,
                                    payload: payload.into(),
                                    is_final,
                                };
                                sequence += 1;
                                if clips.send(clip).await.is_err() {
                                    tracing::warn!("Audio player stopped early");
                                }
                            }
                            Err(e) => tracing::warn!("Skipping undecodable audio record: {}", e),
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Answer stream broke: {:#}", e);
                        write!(stdout, "\n{}", STREAM_ERROR_MESSAGE)?;
                        break;
                    }
                }
            }
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            write!(stdout, "{}", STREAM_ERROR_MESSAGE)?;
        }
    }
    writeln!(stdout)?;

    drop(clips);
    if let Some(player) = player {
        let played = player.await.context("Audio player task failed")?;
        tracing::info!("Played {} audio segments", played);
    }
    Ok(())
}
