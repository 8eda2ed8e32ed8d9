//! Insertion-ordered station record.
//!
//! Field order is observable on the wire, so records are backed by an
//! explicit pair list instead of a hash map. Records are small (a
//! station reading is a couple dozen fields at most), which keeps the
//! linear lookups honest.

/// Mandatory field identifying the station a record belongs to.
pub const ID_FIELD: &str = "id";

/// Reserved field stamped by the aggregator at ingest. It rides the
/// persisted form but is hidden from consumer-facing output.
pub const LAMPORT_FIELD: &str = "lamportClock";

/// An ordered mapping from string keys to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Inserts a field. An existing key keeps its position and gets
    /// the new value; the previous value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        for (existing, slot) in &mut self.fields {
            if *existing == key {
                return Some(std::mem::replace(slot, value));
            }
        }
        self.fields.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}
