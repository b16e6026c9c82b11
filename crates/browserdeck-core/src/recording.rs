//! Recording listings returned by the backend.

use serde::{Deserialize, Serialize};

/// A stored browser-session recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    /// Name of the recording file.
    pub filename: String,

    /// URL to fetch the recording from.
    pub url: String,

    /// Size in bytes.
    pub size: u64,

    /// Creation time as reported by the backend.
    pub created_at: String,
}
