//! Producer and consumer clients for the nimbus telemetry fabric.
//!
//! Both clients speak the aggregator's restricted dialect, carry a
//! local Lamport clock through `X-Lamport-Clock`, and share the same
//! bounded retry wrapper.

pub mod consumer;
pub mod producer;
pub mod retry;
pub mod url;

mod clock;
