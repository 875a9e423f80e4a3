//! Usage Metrics
//!
//! Metrics travel on a side channel that never blocks the conversation. The
//! dialogue layer records events through a [`MetricsSink`]; a background task
//! owned by the [`UsageRecorder`] logs and accumulates them until the session
//! shuts down.

use serde::Serialize;
use std::fmt;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

/// One usage event reported by the dialogue layer.
///
/// `Stt` and `Tts` come from speech-capable dialogue layers that run
/// recognition and synthesis. A text-only layer reports `Llm` alone.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsEvent {
    Llm {
        prompt_tokens: u64,
        completion_tokens: u64,
    },
    Stt {
        audio_seconds: f64,
    },
    Tts {
        characters: u64,
        audio_seconds: f64,
    },
}

/// Accumulated usage for a whole session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub llm_prompt_tokens: u64,
    pub llm_completion_tokens: u64,
    pub stt_audio_seconds: f64,
    pub tts_characters: u64,
    pub tts_audio_seconds: f64,
}

impl UsageSummary {
    pub fn collect(&mut self, event: &MetricsEvent) {
        match event {
            MetricsEvent::Llm {
                prompt_tokens,
                completion_tokens,
            } => {
                self.llm_prompt_tokens += prompt_tokens;
                self.llm_completion_tokens += completion_tokens;
            }
            MetricsEvent::Stt { audio_seconds } => self.stt_audio_seconds += audio_seconds,
            MetricsEvent::Tts {
                characters,
                audio_seconds,
            } => {
                self.tts_characters += characters;
                self.tts_audio_seconds += audio_seconds;
            }
        }
    }
}

impl fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "llm_prompt_tokens={} llm_completion_tokens={} stt_audio_seconds={:.1} tts_characters={} tts_audio_seconds={:.1}",
            self.llm_prompt_tokens,
            self.llm_completion_tokens,
            self.stt_audio_seconds,
            self.tts_characters,
            self.tts_audio_seconds
        )
    }
}

/// A cloneable handle for reporting usage events.
#[derive(Clone, Debug)]
pub struct MetricsSink {
    tx: mpsc::UnboundedSender<MetricsEvent>,
}

impl MetricsSink {
    /// Records an event without waiting. Events sent after shutdown are dropped.
    pub fn record(&self, event: MetricsEvent) {
        if self.tx.send(event).is_err() {
            debug!("Dropped metrics event: usage recorder has shut down.");
        }
    }
}

/// Owns the background task that accumulates a session's usage.
pub struct UsageRecorder {
    tx: mpsc::UnboundedSender<MetricsEvent>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<UsageSummary>,
}

impl UsageRecorder {
    /// Spawns the collecting task on the current tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<MetricsEvent>();
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut summary = UsageSummary::default();
            loop {
                tokio::select! {
                    event = rx.recv() => match event {
                        Some(event) => collect_logged(&mut summary, &event),
                        None => break,
                    },
                    _ = &mut stop_rx => {
                        // Drain whatever was recorded before shutdown.
                        rx.close();
                        while let Some(event) = rx.recv().await {
                            collect_logged(&mut summary, &event);
                        }
                        break;
                    }
                }
            }
            summary
        });
        Self { tx, stop, handle }
    }

    pub fn sink(&self) -> MetricsSink {
        MetricsSink {
            tx: self.tx.clone(),
        }
    }

    /// Stops accepting events and returns the accumulated summary.
    pub async fn finish(self) -> UsageSummary {
        let _ = self.stop.send(());
        match self.handle.await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = ?e, "Usage recorder task failed");
                UsageSummary::default()
            }
        }
    }
}

fn collect_logged(summary: &mut UsageSummary, event: &MetricsEvent) {
    debug!(?event, "Metrics collected");
    summary.collect(event);
}
