//! repotally: asynchronous HTTP service that clones a hosted repository
//! and tallies total/blank/comment lines per language.
//!
//! Clients submit an {owner, name} pair, poll the task until it is done,
//! then retrieve the aggregated report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              HTTP layer (axum)              │
//! │     submit task · poll status · result      │
//! └───────┬─────────────────────────┬───────────┘
//!         │                         │
//! ┌───────▼────────┐       ┌────────▼───────────┐
//! │  GitHub probe  │       │     Task queue      │
//! │ exists + size  │       │ FIFO · disk quota   │
//! └────────────────┘       │ · TTL task cache    │
//!                          └────────┬───────────┘
//!                                   │ one processor
//!                  ┌────────────────▼────────────────┐
//!                  │ clone (gix, depth 1) → analyze  │
//!                  └────────────────┬────────────────┘
//!                                   │
//!                  ┌────────────────▼────────────────┐
//!                  │          Repo analyzer           │
//!                  │ walk → exclude → count per file  │
//!                  │ small: inline · large: pool      │
//!                  └────────────────┬────────────────┘
//!                                   │
//!                  ┌────────────────▼────────────────┐
//!                  │  Language registry (JSON asset)  │
//!                  │  extension / shebang → markers   │
//!                  └─────────────────────────────────┘
//! ```

pub mod clone;
pub mod config;
pub mod error;
pub mod github;
pub mod queue;
pub mod registry;
pub mod server;
pub mod services;
pub mod types;

pub use error::{Result, ServiceError};
pub use registry::LanguageRegistry;
pub use types::{TaskId, TaskStatus};
