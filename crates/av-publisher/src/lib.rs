//! Vehicle telemetry publisher: library crate.
//!
//! Exposes the connection factory, record publisher and field encoders
//! so the binary and `av-e2e-tests` share one implementation.

pub mod config;
pub mod encode;
pub mod error;
pub mod factory;
pub mod input;
pub mod publisher;

pub use config::PublisherConfig;
pub use error::{PublisherError, PublisherResult};
pub use factory::ConnectionFactory;
pub use publisher::{DropReason, PublishOutcome, PublisherState, RecordPublisher, RecordReceipt};
