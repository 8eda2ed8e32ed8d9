//! Shared domain types for the nimbus weather telemetry fabric: the
//! wire codec, the bounded station store, the Lamport clock, and the
//! crash-safe data file.

pub mod codec;
pub mod error;
pub mod lamport;
pub mod persistence;
pub mod record;
pub mod store;

pub use error::{NimbusError, Result};
pub use lamport::{LamportClock, LAMPORT_CLOCK_HEADER};
pub use persistence::{DataFile, DATA_FILE};
pub use record::{Record, ID_FIELD, LAMPORT_FIELD};
pub use store::{now_millis, PutOutcome, WeatherStore, EXPIRY_MS, MAX_STATIONS};
