//! Log setup for processes embedding the wareflow engine.
//!
//! Engine operations open one span each (`submit_transfer`, `approve_change_request`,
//! ...) carrying the ids they act on; the subscriber installed here prints those
//! spans with every event so a rejected transfer can be traced back to its zones.

pub mod tracing;

pub use self::tracing::{DEFAULT_FILTER, LOG_FORMAT_ENV, LogFormat};

/// Install the process-wide subscriber. Later calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Like [`init`], with `filter` used when `RUST_LOG` is unset or invalid.
pub fn init_with_default(filter: &str) {
    tracing::init_with(filter, LogFormat::from_env());
}
