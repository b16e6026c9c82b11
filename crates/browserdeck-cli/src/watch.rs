//! Live watch loop for a running task.

use std::error::Error;
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use tokio::io::{AsyncBufReadExt, BufReader};

use browserdeck_client::{ApiClient, ClientConfig, ConnectionState, SessionEvent, WatchSession};
use browserdeck_core::{PatchOutcome, TaskId, TaskSnapshot};

/// Watch a task until it finishes or the user quits.
///
/// Keys (each followed by Enter): `r` reconnect, `s` stop the task, `q` quit
/// watching. Ctrl-C also quits. Quitting the watch never stops the task.
pub async fn watch_task(
    config: ClientConfig,
    api: Arc<ApiClient>,
    task_id: TaskId,
) -> Result<(), Box<dyn Error>> {
    println!("Watching task {task_id} (r=reconnect, s=stop task, q=quit)");

    let (session, mut events) = WatchSession::spawn(api.clone(), config, task_id.clone());
    let mut view = WatchView::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if view.handle(event) {
                        break;
                    }
                }
                None => break,
            },

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(input)) => match input.trim() {
                    "r" => {
                        println!("reconnecting...");
                        session.reconnect().await;
                    }
                    "s" => match api.stop_task(&task_id).await {
                        Ok(()) => println!("stop requested"),
                        Err(e) => println!("[warn] failed to stop task: {e}"),
                    },
                    "q" => break,
                    _ => {}
                },
                // Stdin closed (piped input); keep watching events only.
                _ => stdin_open = false,
            },

            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.stop().await;
    Ok(())
}

/// Render state for the watch loop.
#[derive(Default)]
struct WatchView {
    /// Set when the latest screenshot payload could not be decoded; cleared
    /// as soon as a patch carries a fresh non-empty screenshot.
    screenshot_error: Option<String>,
    terminal: bool,
    last_status_line: Option<String>,
    thoughts: String,
    actions: String,
}

impl WatchView {
    /// Returns true once the task reached a terminal state.
    fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Connection(state) => {
                self.on_connection(state);
                false
            }
            SessionEvent::Warning(message) => {
                println!("[warn] {message}");
                false
            }
            SessionEvent::Snapshot { snapshot, outcome } => self.on_snapshot(&snapshot, outcome),
        }
    }

    fn on_connection(&mut self, state: ConnectionState) {
        match state {
            ConnectionState::Connected => println!("connected to live updates"),
            ConnectionState::Polling => println!("receiving periodic updates"),
            ConnectionState::Disconnected if !self.terminal => {
                println!("not connected to live updates; press r+Enter to reconnect");
            }
            _ => {}
        }
    }

    fn on_snapshot(&mut self, snapshot: &TaskSnapshot, outcome: PatchOutcome) -> bool {
        if outcome.screenshot_refreshed {
            self.screenshot_error = None;
            if let Some(data) = snapshot.screenshot.as_deref() {
                match screenshot_bytes(data) {
                    Ok(bytes) => println!("[screenshot] {} bytes", bytes.len()),
                    Err(e) => {
                        let message = format!("could not decode screenshot: {e}");
                        println!("[warn] {message}");
                        self.screenshot_error = Some(message);
                    }
                }
            }
        }

        let line = format!(
            "{} {:.0}%",
            snapshot.status,
            snapshot.progress * 100.0
        );
        if self.last_status_line.as_deref() != Some(line.as_str()) {
            println!("[status] {line}");
            self.last_status_line = Some(line);
        }

        print_appended("thought", &mut self.thoughts, snapshot.model_thoughts.as_deref());
        print_appended("action", &mut self.actions, snapshot.model_actions.as_deref());

        if snapshot.is_terminal() {
            self.terminal = true;
            print_final(snapshot);
            return true;
        }
        false
    }
}

/// Print only the lines appended since the last snapshot.
fn print_appended(label: &str, seen: &mut String, current: Option<&str>) {
    let Some(current) = current else { return };
    if current == seen {
        return;
    }
    let fresh = current.strip_prefix(seen.as_str()).unwrap_or(current);
    for line in fresh.lines().filter(|line| !line.trim().is_empty()) {
        println!("[{label}] {line}");
    }
    *seen = current.to_owned();
}

fn print_final(snapshot: &TaskSnapshot) {
    println!();
    println!("Task {}", snapshot.status);
    if let Some(errors) = &snapshot.errors {
        println!("errors:");
        println!("{errors}");
    }
    if let Some(result) = &snapshot.final_result {
        println!("{result}");
    }
    if let Some(path) = &snapshot.recording_path {
        println!("recording: {path}");
    }
}

/// Decode a screenshot payload, accepting both raw base64 and data URIs.
fn screenshot_bytes(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match data.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:image") => rest,
        _ => data,
    };
    BASE64_STANDARD.decode(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use browserdeck_core::StatusPatch;

    fn snapshot_with_screenshot(data: &str) -> (TaskSnapshot, PatchOutcome) {
        let mut snapshot = TaskSnapshot::default();
        let outcome = snapshot.apply(StatusPatch {
            screenshot: Some(data.to_owned()),
            ..StatusPatch::default()
        });
        (snapshot, outcome)
    }

    #[test]
    fn test_fresh_screenshot_clears_display_error() {
        let mut view = WatchView {
            screenshot_error: Some("could not decode screenshot".to_owned()),
            ..WatchView::default()
        };

        let (snapshot, outcome) = snapshot_with_screenshot("aGVsbG8=");
        view.on_snapshot(&snapshot, outcome);
        assert!(view.screenshot_error.is_none());
    }

    #[test]
    fn test_invalid_screenshot_sets_flag_until_replaced() {
        let mut view = WatchView::default();

        let (snapshot, outcome) = snapshot_with_screenshot("%%%not-base64%%%");
        view.on_snapshot(&snapshot, outcome);
        assert!(view.screenshot_error.is_some());

        // A patch without a screenshot leaves the flag in place.
        let mut snapshot = snapshot.clone();
        let outcome = snapshot.apply(StatusPatch {
            progress: Some(0.5),
            ..StatusPatch::default()
        });
        view.on_snapshot(&snapshot, outcome);
        assert!(view.screenshot_error.is_some());

        // The next decodable screenshot clears it.
        let (snapshot, outcome) = snapshot_with_screenshot("aGVsbG8=");
        view.on_snapshot(&snapshot, outcome);
        assert!(view.screenshot_error.is_none());
    }

    #[test]
    fn test_screenshot_bytes_accepts_data_uri() {
        let bytes = screenshot_bytes("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        let bytes = screenshot_bytes("aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_terminal_snapshot_ends_the_watch() {
        let mut view = WatchView::default();
        let mut snapshot = TaskSnapshot::default();
        let outcome = snapshot.apply(StatusPatch {
            status: Some("completed".to_owned().into()),
            final_result: Some("done".to_owned()),
            ..StatusPatch::default()
        });
        assert!(view.on_snapshot(&snapshot, outcome));
    }
}
