//! Per-session resource orchestration.
//!
//! A build session owns one working volume plus one container per pinned
//! processor and plugin and one merger container, all named with the
//! session id. This module provides the three session operations:
//!
//! - **Warm**: pull missing images, create the session volume
//! - **Start**: launch and probe every worker container
//! - **Clean**: remove the session's containers, then its volumes
//!
//! # Example
//!
//! ```ignore
//! use cyanprint_coordinator::session::{SessionOrchestrator, StartPlan};
//!
//! let sessions = SessionOrchestrator::new(lifecycle, workers);
//! let (volume, warmed) = sessions.warm("s1", &template).await;
//! warmed?;
//! sessions.start(&StartPlan::for_template("s1", template.clone(), merger_id)).await?;
//! // ... build ...
//! sessions.clean("s1").await?;
//! ```

mod orchestrator;

pub use orchestrator::{missing_images, SessionOrchestrator, StartPlan};
