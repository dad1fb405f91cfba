//! Background dispatcher for platform sync messages.
//!
//! Connectivity callbacks and background-sync wakeups arrive on arbitrary
//! threads. They are queued here and handed to the orchestrator one at a
//! time, so a burst of wakeups turns into at most one extra replay.

use crate::orchestrator::SyncOrchestrator;
use noteline_engine::{Envelope, SyncMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Queued messages before `send` starts dropping.
pub const QUEUE_CAPACITY: usize = 64;

/// Handle to the background dispatcher task.
///
/// Dropping every handle closes the queue and ends the task.
pub struct SyncWorker {
    sender: mpsc::Sender<SyncMessage>,
    handle: JoinHandle<()>,
}

impl SyncWorker {
    /// Spawn the dispatcher on the current tokio runtime.
    pub fn spawn(orchestrator: Arc<SyncOrchestrator>) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(Self::run_loop(orchestrator, receiver));
        Self { sender, handle }
    }

    /// Queue a message. Non-blocking; returns false if the queue is full or
    /// the task has stopped.
    pub fn send(&self, message: SyncMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Sync worker queue rejected message");
                false
            }
        }
    }

    /// Queue an envelope received from a platform channel.
    ///
    /// Envelopes with an unknown schema version are dropped.
    pub fn send_envelope(&self, envelope: Envelope) -> bool {
        if !envelope.is_supported() {
            tracing::warn!(version = envelope.version, "Dropping envelope with unsupported version");
            return false;
        }
        self.send(envelope.message)
    }

    pub fn online(&self) -> bool {
        self.send(SyncMessage::ConnectionOnline)
    }

    pub fn offline(&self) -> bool {
        self.send(SyncMessage::ConnectionOffline)
    }

    pub fn trigger(&self) -> bool {
        self.send(SyncMessage::TriggerSync)
    }

    /// Close the queue, let queued messages finish and wait for the task.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Sync worker task failed");
        }
    }

    async fn run_loop(orchestrator: Arc<SyncOrchestrator>, mut receiver: mpsc::Receiver<SyncMessage>) {
        tracing::debug!("Sync worker started");
        let mut held: Option<SyncMessage> = None;

        loop {
            let message = match held.take() {
                Some(message) => message,
                None => match receiver.recv().await {
                    Some(message) => message,
                    None => break,
                },
            };
            if message == SyncMessage::TriggerSync {
                held = Self::coalesce_triggers(&mut receiver);
            }
            let kind = message.kind();

            match orchestrator.dispatch(message).await {
                Ok(Some(outcome)) => {
                    tracing::debug!(
                        kind,
                        delivered = outcome.replay.delivered().len(),
                        merged = outcome.summary.is_some(),
                        "Sync worker ran follow-up"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(kind, error = %e, "Sync worker dispatch failed");
                }
            }
        }

        tracing::debug!("Sync worker stopped");
    }

    /// Swallow `trigger-sync` messages already queued behind the current one.
    ///
    /// Returns the first other message found, to be handled next.
    fn coalesce_triggers(receiver: &mut mpsc::Receiver<SyncMessage>) -> Option<SyncMessage> {
        let mut dropped = 0usize;
        let next = loop {
            match receiver.try_recv() {
                Ok(SyncMessage::TriggerSync) => dropped += 1,
                Ok(other) => break Some(other),
                Err(_) => break None,
            }
        };
        if dropped > 0 {
            tracing::debug!(dropped, "Coalesced queued sync triggers");
        }
        next
    }
}
