//! Domain events and the fire-and-forget notification sink.
//!
//! The engine emits `RequestSubmitted`, `RequestApproved`, `RequestRejected`,
//! `TransferSubmitted`, `TransferCompleted` and `TransferRejected` facts through an
//! [`EventBus`]. Delivery is never part of the engine's own correctness.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription, publish_best_effort};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
