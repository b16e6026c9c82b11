//! Per-task watch session: one channel, one policy, one snapshot.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use browserdeck_core::{PatchOutcome, StatusPatch, TaskId, TaskSnapshot};

use crate::channel::{Channel, ChannelEvent};
use crate::config::ClientConfig;
use crate::http::StatusSource;
use crate::poll::StatusPoller;
use crate::reconnect::{ReconnectPolicy, RetryDecision};
use crate::router::{MessageRouter, WILDCARD_KIND};

/// How the session is currently receiving updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No live channel and no fallback engaged.
    #[default]
    Disconnected,
    /// A channel open attempt is in flight.
    Connecting,
    /// Updates arrive over the live channel.
    Connected,
    /// Degraded mode: updates arrive from periodic fetches.
    Polling,
}

/// Events emitted to the session's observer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The delivery mode changed.
    Connection(ConnectionState),
    /// A patch was merged; carries the full post-merge snapshot.
    Snapshot {
        snapshot: TaskSnapshot,
        outcome: PatchOutcome,
    },
    /// A recoverable problem the observer should surface, not fatal.
    Warning(String),
}

/// Commands accepted by a running session.
#[derive(Debug)]
enum SessionCommand {
    Reconnect,
    Stop,
}

/// A live synchronization session for one task id.
///
/// Owns the channel, the reconnection policy, and the snapshot; observers
/// consume [`SessionEvent`]s from the receiver returned by [`spawn`]. The
/// session never terminates on its own failures; only [`stop`] (or drop)
/// ends it, tearing down any pending timer and the transport.
///
/// [`spawn`]: WatchSession::spawn
/// [`stop`]: WatchSession::stop
pub struct WatchSession {
    cmd_tx: mpsc::Sender<SessionCommand>,
    handle: JoinHandle<()>,
}

impl WatchSession {
    /// Start watching a task. Returns the session handle and the event
    /// stream for the observer.
    pub fn spawn<S>(
        source: Arc<S>,
        config: ClientConfig,
        task_id: TaskId,
    ) -> (Self, mpsc::Receiver<SessionEvent>)
    where
        S: StatusSource + ?Sized + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let handle = tokio::spawn(run_session(source, config, task_id, event_tx, cmd_rx));
        (Self { cmd_tx, handle }, event_rx)
    }

    /// Request a manual reconnect: resets the attempt counter and re-enters
    /// channel mode immediately, from any state including exhausted.
    pub async fn reconnect(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Reconnect).await;
    }

    /// Stop watching and tear the session down.
    pub async fn stop(mut self) {
        let _ = self.cmd_tx.send(SessionCommand::Stop).await;
        let _ = (&mut self.handle).await;
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Outcome of waiting out the reconnect delay.
enum Waited {
    Elapsed,
    Reconnect,
    Stop,
}

/// Sleep for the retry delay, but react to commands immediately.
async fn wait_for_commands(
    cmd_rx: &mut mpsc::Receiver<SessionCommand>,
    delay: Duration,
) -> Waited {
    tokio::select! {
        _ = tokio::time::sleep(delay) => Waited::Elapsed,
        cmd = cmd_rx.recv() => match cmd {
            Some(SessionCommand::Reconnect) => Waited::Reconnect,
            Some(SessionCommand::Stop) | None => Waited::Stop,
        },
    }
}

/// Decode a router payload into a patch and hand it to the session loop.
fn patch_sink(tx: mpsc::UnboundedSender<StatusPatch>) -> impl Fn(&Value) + Send + Sync {
    move |data| match serde_json::from_value::<StatusPatch>(data.clone()) {
        Ok(patch) => {
            let _ = tx.send(patch);
        }
        Err(e) => warn!(error = %e, "Ignoring undecodable status payload"),
    }
}

async fn merge_and_emit(
    snapshot: &mut TaskSnapshot,
    patch: StatusPatch,
    event_tx: &mpsc::Sender<SessionEvent>,
) {
    let outcome = snapshot.apply(patch);
    let _ = event_tx
        .send(SessionEvent::Snapshot {
            snapshot: snapshot.clone(),
            outcome,
        })
        .await;
}

async fn run_session<S>(
    source: Arc<S>,
    config: ClientConfig,
    task_id: TaskId,
    event_tx: mpsc::Sender<SessionEvent>,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
) where
    S: StatusSource + ?Sized,
{
    let mut snapshot = TaskSnapshot::default();
    let mut policy = ReconnectPolicy::new();
    let mut channel = Channel::new(config.clone());

    let router = MessageRouter::new();
    let (patch_tx, mut patch_rx) = mpsc::unbounded_channel::<StatusPatch>();
    let (warn_tx, mut warn_rx) = mpsc::unbounded_channel::<String>();

    // The backend pushes a full "status" envelope on connect, then
    // incremental "update" patches; both feed the same merge. Server
    // "error" envelopes become observer warnings.
    let subs = vec![
        router.subscribe("status", patch_sink(patch_tx.clone())),
        router.subscribe("update", patch_sink(patch_tx)),
        router.subscribe(WILDCARD_KIND, move |envelope| {
            if envelope.get("type").and_then(Value::as_str) == Some("error") {
                let message = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown backend error");
                let _ = warn_tx.send(message.to_owned());
            }
        }),
    ];

    // One point-in-time fetch before the channel opens. A failure here is
    // surfaced and the session carries on.
    match source.fetch_status(&task_id).await {
        Ok(patch) => merge_and_emit(&mut snapshot, patch, &event_tx).await,
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "Initial status fetch failed");
            let _ = event_tx
                .send(SessionEvent::Warning(format!(
                    "Failed to fetch task status: {e}"
                )))
                .await;
        }
    }

    'connect: loop {
        let _ = event_tx
            .send(SessionEvent::Connection(ConnectionState::Connecting))
            .await;

        match channel.open(&task_id).await {
            Ok(()) => {
                policy.connected();
                info!(task_id = %task_id, "Status channel connected");
                let _ = event_tx
                    .send(SessionEvent::Connection(ConnectionState::Connected))
                    .await;

                loop {
                    tokio::select! {
                        ev = channel.next() => match ev {
                            ChannelEvent::Frame(text) => {
                                router.dispatch(&text);
                                while let Ok(patch) = patch_rx.try_recv() {
                                    merge_and_emit(&mut snapshot, patch, &event_tx).await;
                                }
                                while let Ok(message) = warn_rx.try_recv() {
                                    let _ = event_tx.send(SessionEvent::Warning(message)).await;
                                }
                            }
                            ChannelEvent::Closed | ChannelEvent::Errored => {
                                warn!(task_id = %task_id, "Status channel lost");
                                let _ = event_tx
                                    .send(SessionEvent::Connection(ConnectionState::Disconnected))
                                    .await;
                                break;
                            }
                        },
                        cmd = cmd_rx.recv() => match cmd {
                            Some(SessionCommand::Reconnect) => {
                                channel.close().await;
                                policy.reset();
                                continue 'connect;
                            }
                            Some(SessionCommand::Stop) | None => break 'connect,
                        },
                    }
                }
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Failed to open status channel");
                let _ = event_tx
                    .send(SessionEvent::Connection(ConnectionState::Disconnected))
                    .await;
            }
        }

        // An open failure counts exactly like a post-open loss.
        match policy.on_loss() {
            RetryDecision::Retry => {
                debug!(
                    task_id = %task_id,
                    attempt = policy.attempts(),
                    "Retrying channel in {:?}", config.reconnect_delay
                );
                match wait_for_commands(&mut cmd_rx, config.reconnect_delay).await {
                    Waited::Elapsed => {}
                    Waited::Reconnect => policy.reset(),
                    Waited::Stop => break 'connect,
                }
            }
            RetryDecision::GiveUp => {
                info!(task_id = %task_id, "Reconnect attempts exhausted, falling back to polling");
                let _ = event_tx
                    .send(SessionEvent::Warning(
                        "Could not establish real-time connection. \
                         Falling back to periodic updates."
                            .to_owned(),
                    ))
                    .await;
                let _ = event_tx
                    .send(SessionEvent::Connection(ConnectionState::Polling))
                    .await;

                let mut poller =
                    StatusPoller::new(source.clone(), task_id.clone(), config.poll_interval);
                loop {
                    tokio::select! {
                        result = poller.next_patch() => match result {
                            Ok(patch) => merge_and_emit(&mut snapshot, patch, &event_tx).await,
                            Err(e) => {
                                warn!(task_id = %task_id, error = %e, "Status poll failed");
                                let _ = event_tx
                                    .send(SessionEvent::Warning(format!(
                                        "Failed to fetch task status: {e}"
                                    )))
                                    .await;
                            }
                        },
                        cmd = cmd_rx.recv() => match cmd {
                            Some(SessionCommand::Reconnect) => {
                                policy.reset();
                                continue 'connect;
                            }
                            Some(SessionCommand::Stop) | None => break 'connect,
                        },
                    }
                }
            }
        }
    }

    // Teardown order: any pending retry sleep and the poll interval died
    // with their loop scopes above; the transport goes last.
    channel.close().await;
    for sub in &subs {
        sub.cancel();
    }
    debug!(task_id = %task_id, "Watch session closed");
}
