use chrono::{DateTime, Utc};

/// A domain event.
///
/// Events are immutable facts about a state transition that already happened,
/// versioned so their payload shape can evolve.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "approvals.request.approved").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
