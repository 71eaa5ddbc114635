//! # Event System
//!
//! Publish/subscribe foundation for run lifecycle events. The fixed event
//! names live in [`crate::constants::events`]; payloads are JSON snapshots
//! of current progress.

pub mod publisher;

pub use publisher::{EventPublisher, PublishedEvent};
