//! # Tradewire Client
//!
//! Async IO layer for the Tradewire feed: data providers, streaming
//! transports, the connection lifecycle, and the [`FeedSession`] that
//! ties them to the engine's reducer.
//!
//! ## Architecture
//!
//! ```text
//!  SSE / WebSocket ──► ConnectionManager ──► StreamEvent ─┐
//!                                                         ▼
//!  REST / fixture  ──► Backend ──────────────────► FeedSession ──► FeedState
//! ```
//!
//! All state logic is deterministic and lives in `tradewire-engine`;
//! this crate only decides *when* actions are dispatched.

pub mod analytics;
pub mod backend;
pub mod config;
pub mod connection;
pub mod error;
pub mod session;
pub mod transport;

pub use analytics::{AnalyticsSink, NoopSink, RecordingSink, TracingSink};
pub use backend::{Backend, LiveBackend, OfflineBackend, Page};
pub use config::{EngineConfig, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT};
pub use connection::{ConnectionManager, StreamEvent};
pub use error::{ClientError, Result};
pub use session::{FeedSession, PublishOutcome};
pub use transport::{FeedTransport, RawEvent, SseParser};

// The engine is part of the public API surface.
pub use tradewire_engine as engine;
