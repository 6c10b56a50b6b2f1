//! Gapless, strictly ordered playback of audio segments.
//!
//! [`PlaybackQueue`] is the pure state machine; [`run_player`] drives it with an
//! [`AudioSink`], feeding completions back in as they happen.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState<H> {
    Idle,
    Playing(H),
}

/// FIFO of pending audio handles with at most one handle playing.
///
/// `enqueue` and `on_playback_complete` are the only mutators. Each returns the
/// handle the caller must start now, if any, so exactly one completion is
/// outstanding at a time.
#[derive(Debug)]
pub struct PlaybackQueue<H> {
    state: PlaybackState<H>,
    pending: VecDeque<H>,
}

impl<H: Clone> PlaybackQueue<H> {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &PlaybackState<H> {
        &self.state
    }

    /// Handles waiting behind the active one.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Starts `handle` immediately when idle, otherwise queues it.
    pub fn enqueue(&mut self, handle: H) -> Option<H> {
        match self.state {
            PlaybackState::Idle => {
                self.state = PlaybackState::Playing(handle.clone());
                Some(handle)
            }
            PlaybackState::Playing(_) => {
                self.pending.push_back(handle);
                None
            }
        }
    }

    /// Retires the active handle and activates the next one, if any.
    pub fn on_playback_complete(&mut self) -> Option<H> {
        if matches!(self.state, PlaybackState::Idle) {
            tracing::warn!("Playback completion received while idle");
            return None;
        }
        match self.pending.pop_front() {
            Some(next) => {
                self.state = PlaybackState::Playing(next.clone());
                Some(next)
            }
            None => {
                self.state = PlaybackState::Idle;
                None
            }
        }
    }
}

impl<H: Clone> Default for PlaybackQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// One decoded audio segment, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub sequence: usize,
    pub payload: Bytes,
    pub is_final: bool,
}

/// Somewhere clips are played. `play` resolves when playback has finished.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, clip: AudioClip) -> Result<()>;
}

/// Plays each clip through an external player process, e.g. `mpv --really-quiet`.
/// The clip is written to a temporary file whose path is the last argument.
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn parse(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("Player command is empty");
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl AudioSink for CommandSink {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix("voxrag-")
            .suffix(".mp3")
            .tempfile()
            .context("Failed to create temporary audio file")?;
        file.write_all(&clip.payload)
            .context("Failed to write temporary audio file")?;

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .status()
            .await
            .with_context(|| format!("Failed to start player {}", self.program))?;
        if !status.success() {
            bail!("Player {} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// Writes clips as numbered MP3 files instead of playing them.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, sequence: usize) -> PathBuf {
        self.dir.join(format!("segment-{sequence:04}.mp3"))
    }
}

#[async_trait]
impl AudioSink for DirectorySink {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(clip.sequence);
        tokio::fs::write(&path, &clip.payload)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Saved {}", path.display());
        Ok(())
    }
}

/// Plays clips from `clips` one at a time, in arrival order, until the channel
/// closes and the queue drains. Returns the number of clips played successfully.
pub async fn run_player(sink: Arc<dyn AudioSink>, mut clips: mpsc::Receiver<AudioClip>) -> usize {
    let mut queue = PlaybackQueue::new();
    let mut current: Option<JoinHandle<Result<()>>> = None;
    let mut accepting = true;
    let mut played = 0;

    loop {
        tokio::select! {
            clip = clips.recv(), if accepting => match clip {
                Some(clip) => {
                    if let Some(next) = queue.enqueue(clip) {
                        current = Some(start(&sink, next));
                    }
                }
                None => accepting = false,
            },
            finished = wait(&mut current), if current.is_some() => {
                match finished {
                    Ok(Ok(())) => played += 1,
                    Ok(Err(e)) => tracing::warn!("Audio playback failed: {:#}", e),
                    Err(e) => tracing::error!("Playback task failed: {}", e),
                }
                current = queue.on_playback_complete().map(|next| start(&sink, next));
            },
            else => break,
        }
    }
    played
}

fn start(sink: &Arc<dyn AudioSink>, clip: AudioClip) -> JoinHandle<Result<()>> {
    let sink = sink.clone();
    tokio::spawn(async move { sink.play(clip).await })
}

async fn wait(
    current: &mut Option<JoinHandle<Result<()>>>,
) -> Result<Result<()>, tokio::task::JoinError> {
    match current {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
