//! In-process publish/subscribe bus for finding change events.
//!
//! Publishers are addressed by name; this crate's table subscribes to
//! exactly one of them, [`FINDINGS_PUBLISHER`], and reacts to the four
//! finding event kinds by invalidating cached rows.

pub mod consumer;
pub mod event;
pub mod registry;

pub use consumer::AlertEventConsumer;
pub use event::{AlertEvent, AlertEventKind};
pub use registry::{AlertBus, BusConsumer, SubscriptionGuard};

/// Name of the publisher emitting finding change events.
pub const FINDINGS_PUBLISHER: &str = "findings";
