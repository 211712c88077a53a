//! Bounded fan-out for batch operations.
//!
//! Every batch the coordinator runs (pulling images, starting containers,
//! removing resources, calling workers) goes through [`BoundedTaskPool`]:
//! all items run, at most `limit` at a time, and every item's outcome is
//! reported in input order. A failing item never cancels its siblings.
//!
//! # Example
//!
//! ```rust,ignore
//! use cyanprint_coordinator::scheduler::BoundedTaskPool;
//!
//! let pool = BoundedTaskPool::new(4);
//! let results = pool.run(images, |image| async move { runtime.pull_image(&image).await }).await;
//! let pulled = cyanprint_coordinator::scheduler::collect_batch(results)?;
//! ```

mod task_pool;

pub use task_pool::{collect_batch, BoundedTaskPool};
