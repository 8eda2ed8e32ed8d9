//! Response-clock handling shared by the producer and consumer.

use nimbus_core::{LamportClock, LAMPORT_CLOCK_HEADER};

/// Merges the server's response clock into the local one. A malformed
/// value is a warning and leaves the clock unchanged.
pub(crate) fn merge_response_clock(response: &reqwest::Response, clock: &LamportClock) {
    if let Some(raw) = response.headers().get(LAMPORT_CLOCK_HEADER) {
        match raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
        {
            Some(peer) => {
                clock.merge(peer);
            }
            None => {
                tracing::warn!("invalid Lamport clock header from server: {:?}", raw);
            }
        }
    }
}
