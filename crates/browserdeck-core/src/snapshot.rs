//! Task status snapshot and the partial-patch merge applied to it.

use crate::TaskState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The current known status of a task, merged from incremental updates.
///
/// One snapshot exists per watched task. The synchronization session is the
/// only writer; observers read whatever the latest merge produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Lifecycle state of the task.
    pub status: TaskState,

    /// Progress fraction in [0.0, 1.0].
    pub progress: f64,

    /// Latest browser screenshot, base64-encoded.
    pub screenshot: Option<String>,

    /// Actions taken by the model, newline-delimited.
    pub model_actions: Option<String>,

    /// Reasoning emitted by the model, newline-delimited.
    pub model_thoughts: Option<String>,

    /// Final result text once the task completes.
    pub final_result: Option<String>,

    /// Errors reported by the agent, newline-delimited.
    pub errors: Option<String>,

    /// Path to the stored recording, if recording was enabled.
    pub recording_path: Option<String>,

    /// Path to the browser trace file.
    pub trace_path: Option<String>,

    /// Path to the agent history file.
    pub history_path: Option<String>,

    /// When this snapshot last absorbed a patch. Local bookkeeping only;
    /// the wire protocol carries no ordering metadata.
    #[serde(skip)]
    pub last_update: Option<DateTime<Utc>>,
}

/// A partial status update: only the fields present in the incoming fragment.
///
/// Fields absent from a patch leave the held value unchanged. Unknown fields
/// on the wire are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_actions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_thoughts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_path: Option<String>,
}

impl StatusPatch {
    /// True when the patch carries a non-empty screenshot.
    pub fn has_screenshot(&self) -> bool {
        self.screenshot.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// What a merge changed, for observers that react to specific fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    /// The patch carried a non-empty screenshot. The presentation layer
    /// clears any screenshot-display-error flag it holds when this is set.
    pub screenshot_refreshed: bool,
}

impl TaskSnapshot {
    /// Merge a partial patch into this snapshot, field-level last-write-wins.
    ///
    /// Never fails: every patch produces a coherent snapshot. Both the
    /// channel and the polling fallback feed through here, so a momentary
    /// overlap of the two producers is safe.
    pub fn apply(&mut self, patch: StatusPatch) -> PatchOutcome {
        let outcome = PatchOutcome {
            screenshot_refreshed: patch.has_screenshot(),
        };

        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(screenshot) = patch.screenshot {
            self.screenshot = Some(screenshot);
        }
        if let Some(actions) = patch.model_actions {
            self.model_actions = Some(actions);
        }
        if let Some(thoughts) = patch.model_thoughts {
            self.model_thoughts = Some(thoughts);
        }
        if let Some(result) = patch.final_result {
            self.final_result = Some(result);
        }
        if let Some(errors) = patch.errors {
            self.errors = Some(errors);
        }
        if let Some(path) = patch.recording_path {
            self.recording_path = Some(path);
        }
        if let Some(path) = patch.trace_path {
            self.trace_path = Some(path);
        }
        if let Some(path) = patch.history_path {
            self.history_path = Some(path);
        }
        self.last_update = Some(Utc::now());

        outcome
    }

    /// Returns true if the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
