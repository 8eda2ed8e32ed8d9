//! Bounded, insertion-ordered station store.
//!
//! Iteration order is update order: a put re-inserts its id at the
//! tail, so the head is always the stalest insertion and is the one
//! evicted at capacity. The backing pair list keeps that order
//! explicit instead of leaning on map iteration behavior.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{NimbusError, Result};
use crate::lamport::LamportClock;
use crate::record::{Record, LAMPORT_FIELD};

/// Capacity bound; the earliest-inserted station is evicted beyond it.
pub const MAX_STATIONS: usize = 20;

/// Age in milliseconds past which an entry is dropped by the sweep.
pub const EXPIRY_MS: u64 = 30_000;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
struct StoreEntry {
    record: Record,
    ingested_at_ms: u64,
}

#[derive(Debug, Default)]
pub struct WeatherStore {
    entries: Vec<(String, StoreEntry)>,
}

impl WeatherStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upserts a record, stamping it with the given Lamport value. An
    /// existing id is moved to the most-recent position; a new id at
    /// capacity evicts the earliest-inserted station.
    pub fn put(&mut self, mut record: Record, stamp: u64) -> Result<PutOutcome> {
        let id = record.id().ok_or(NimbusError::MissingId)?.to_string();
        record.insert(LAMPORT_FIELD, stamp.to_string());

        let outcome = match self.position(&id) {
            Some(index) => {
                self.entries.remove(index);
                PutOutcome::Updated
            }
            None => {
                if self.entries.len() >= MAX_STATIONS {
                    let (evicted, _) = self.entries.remove(0);
                    tracing::info!(station = %evicted, "evicted earliest station at capacity");
                }
                PutOutcome::Created
            }
        };

        self.entries.push((
            id,
            StoreEntry {
                record,
                ingested_at_ms: now_millis(),
            },
        ));
        Ok(outcome)
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.position(id)
            .map(|index| self.entries[index].1.record.clone())
    }

    /// The record with the largest ingest timestamp; ties go to the
    /// most recently inserted entry.
    pub fn latest(&self) -> Option<Record> {
        let mut best: Option<&StoreEntry> = None;
        for (_, entry) in &self.entries {
            if best.map_or(true, |current| entry.ingested_at_ms >= current.ingested_at_ms) {
                best = Some(entry);
            }
        }
        best.map(|entry| entry.record.clone())
    }

    /// Drops entries older than [`EXPIRY_MS`] relative to `now_ms`,
    /// preserving the order of survivors. Returns true if anything
    /// was removed.
    pub fn sweep(&mut self, now_ms: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, entry)| {
            let expired = now_ms.saturating_sub(entry.ingested_at_ms) > EXPIRY_MS;
            if expired {
                tracing::info!(station = %id, "expired stale station data");
            }
            !expired
        });
        self.entries.len() != before
    }

    /// Ordered copy of every record, including the persisted
    /// `lamportClock` stamp.
    pub fn snapshot(&self) -> Vec<Record> {
        self.entries
            .iter()
            .map(|(_, entry)| entry.record.clone())
            .collect()
    }

    /// Replaces the store contents with recovered records. Every entry
    /// is restamped with the current wall clock (recovered data lives
    /// a fresh expiry lifetime), records without an id are skipped,
    /// and the process clock observes the largest persisted stamp.
    pub fn load_snapshot(&mut self, records: Vec<Record>, clock: &LamportClock) {
        self.entries.clear();
        let now = now_millis();
        let mut max_stamp: Option<u64> = None;

        for record in records {
            let id = match record.id() {
                Some(id) => id.to_string(),
                None => continue,
            };

            match record.get(LAMPORT_FIELD).map(str::parse::<u64>) {
                Some(Ok(stamp)) => {
                    max_stamp = Some(max_stamp.map_or(stamp, |current| current.max(stamp)));
                }
                Some(Err(_)) => {
                    tracing::warn!(station = %id, "ignoring unparseable lamportClock in data file");
                }
                None => {}
            }

            if let Some(index) = self.position(&id) {
                self.entries.remove(index);
            }
            self.entries.push((
                id,
                StoreEntry {
                    record,
                    ingested_at_ms: now,
                },
            ));
        }

        if let Some(stamp) = max_stamp {
            clock.merge(stamp);
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|(existing, _)| existing == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str) -> Record {
        [("id", id), ("temperature", "13.3")].into_iter().collect()
    }

    #[test]
    fn put_reports_created_then_updated() {
        let mut store = WeatherStore::new();
        assert_eq!(store.put(station("A"), 1).unwrap(), PutOutcome::Created);
        assert_eq!(store.put(station("A"), 2).unwrap(), PutOutcome::Updated);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn put_stamps_lamport_clock() {
        let mut store = WeatherStore::new();
        store.put(station("A"), 7).unwrap();
        let record = store.get("A").unwrap();
        assert_eq!(record.get(LAMPORT_FIELD), Some("7"));
    }

    #[test]
    fn put_without_id_fails() {
        let mut store = WeatherStore::new();
        let record: Record = [("temperature", "13.3")].into_iter().collect();
        assert!(matches!(store.put(record, 1), Err(NimbusError::MissingId)));
    }

    #[test]
    fn overflow_evicts_earliest_insertion() {
        let mut store = WeatherStore::new();
        for index in 1..=21 {
            store.put(station(&format!("S{}", index)), index as u64).unwrap();
        }
        assert_eq!(store.len(), MAX_STATIONS);
        assert!(store.get("S1").is_none());
        assert!(store.get("S2").is_some());
        assert!(store.get("S21").is_some());
    }

    #[test]
    fn update_moves_entry_to_most_recent_position() {
        let mut store = WeatherStore::new();
        for index in 1..=20 {
            store.put(station(&format!("S{}", index)), index as u64).unwrap();
        }
        // Refreshing S1 makes S2 the earliest insertion, so the next
        // overflow evicts S2.
        store.put(station("S1"), 21).unwrap();
        store.put(station("S99"), 22).unwrap();
        assert!(store.get("S1").is_some());
        assert!(store.get("S2").is_none());
    }

    #[test]
    fn latest_prefers_most_recent_insertion_on_ties() {
        let mut store = WeatherStore::new();
        store.put(station("A"), 1).unwrap();
        store.put(station("B"), 2).unwrap();
        let latest = store.latest().unwrap();
        assert_eq!(latest.id(), Some("B"));
    }

    #[test]
    fn latest_on_empty_store_is_none() {
        assert!(WeatherStore::new().latest().is_none());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let mut store = WeatherStore::new();
        store.put(station("A"), 1).unwrap();
        let now = now_millis();

        assert!(!store.sweep(now));
        assert_eq!(store.len(), 1);

        assert!(store.sweep(now + EXPIRY_MS + 1));
        assert!(store.is_empty());
        assert!(store.get("A").is_none());
    }

    #[test]
    fn snapshot_preserves_order_and_stamps() {
        let mut store = WeatherStore::new();
        store.put(station("A"), 1).unwrap();
        store.put(station("B"), 2).unwrap();
        store.put(station("A"), 3).unwrap();

        let snapshot = store.snapshot();
        let ids: Vec<_> = snapshot.iter().map(|record| record.id().unwrap()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(snapshot[1].get(LAMPORT_FIELD), Some("3"));
    }

    #[test]
    fn load_snapshot_restamps_and_raises_clock() {
        let mut store = WeatherStore::new();
        let clock = LamportClock::new();

        let mut persisted = station("A");
        persisted.insert(LAMPORT_FIELD, "40");
        let headless: Record = [("temperature", "9.9")].into_iter().collect();

        store.load_snapshot(vec![persisted, headless], &clock);

        assert_eq!(store.len(), 1);
        assert!(clock.current() > 40);
        // Recovered entries get a fresh expiry lifetime.
        assert!(!store.sweep(now_millis()));
        assert_eq!(store.len(), 1);
    }
}
