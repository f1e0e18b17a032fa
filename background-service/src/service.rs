use crate::orchestrator::{InvocationReport, Orchestrator};
use helper_core::{HelperError, Message};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The background context: receives runtime messages and runs one analysis
/// task per accepted RUN_ANALYSIS.
pub struct BackgroundService {
    inbox: mpsc::UnboundedSender<Message>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Runtime messaging entry point of the background context.
#[derive(Debug, Clone)]
pub struct BackgroundHandle {
    inbox: mpsc::UnboundedSender<Message>,
}

impl BackgroundService {
    /// Spawns the background loop. Every finished invocation is published on
    /// the returned receiver.
    pub fn start(
        orchestrator: Arc<Orchestrator>,
    ) -> (Self, mpsc::UnboundedReceiver<InvocationReport>) {
        let (inbox, messages) = mpsc::unbounded_channel();
        let (shutdown, stop) = oneshot::channel();
        let (reports, report_receiver) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_loop(orchestrator, messages, stop, reports));
        info!("Background service started");

        (
            Self {
                inbox,
                shutdown,
                task,
            },
            report_receiver,
        )
    }

    pub fn handle(&self) -> BackgroundHandle {
        BackgroundHandle {
            inbox: self.inbox.clone(),
        }
    }

    /// Stops accepting messages and waits for the loop to exit. Invocations
    /// already running are not cancelled.
    pub async fn stop(self) -> Result<(), HelperError> {
        let _ = self.shutdown.send(());
        self.task.await.map_err(|e| {
            error!("Background loop ended abnormally: {}", e);
            HelperError::BackgroundUnavailable
        })?;
        info!("Background service stopped");
        Ok(())
    }
}

impl BackgroundHandle {
    pub fn send_message(&self, message: Message) -> Result<(), HelperError> {
        self.inbox
            .send(message)
            .map_err(|_| HelperError::BackgroundUnavailable)
    }
}

async fn run_loop(
    orchestrator: Arc<Orchestrator>,
    mut messages: mpsc::UnboundedReceiver<Message>,
    mut stop: oneshot::Receiver<()>,
    reports: mpsc::UnboundedSender<InvocationReport>,
) {
    loop {
        tokio::select! {
            biased;

            _ = &mut stop => break,

            message = messages.recv() => match message {
                Some(Message::RunAnalysis { tab_id }) => {
                    info!(%tab_id, "RUN_ANALYSIS received");
                    let orchestrator = Arc::clone(&orchestrator);
                    let reports = reports.clone();
                    tokio::spawn(async move {
                        let report = orchestrator.run_analysis(tab_id).await;
                        if reports.send(report).is_err() {
                            debug!(%tab_id, "Nobody is listening for invocation reports");
                        }
                    });
                }
                Some(other) => {
                    warn!(action = other.action(), "Background context ignores message");
                }
                None => break,
            },
        }
    }
}
