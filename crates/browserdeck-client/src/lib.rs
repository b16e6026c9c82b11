//! Browserdeck synchronization client.
//!
//! Everything needed to submit work to a browser-automation agent backend
//! and observe a running task live:
//!
//! - [`ApiClient`]: the HTTP surface (submit, status, stop, recordings).
//! - [`Channel`]: one persistent WebSocket per watched task.
//! - [`MessageRouter`]: envelope decoding and subscriber fan-out.
//! - [`ReconnectPolicy`]: bounded fixed-delay retry after connection loss.
//! - [`StatusPoller`]: periodic point-in-time fetches once retries exhaust.
//! - [`WatchSession`]: the per-task composition of all of the above,
//!   feeding one [`browserdeck_core::TaskSnapshot`].

pub mod channel;
pub mod config;
pub mod error;
pub mod http;
pub mod poll;
pub mod reconnect;
pub mod router;
pub mod session;

pub use channel::{Channel, ChannelEvent};
pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{ApiClient, StatusSource, SubmitResponse};
pub use poll::StatusPoller;
pub use reconnect::{ReconnectPolicy, RetryDecision, RetryState};
pub use router::{MessageRouter, Subscription};
pub use session::{ConnectionState, SessionEvent, WatchSession};
