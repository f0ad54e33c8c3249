//! Reassembly of inbound audio units
//!
//! The server streams each synthesized sentence as a `sentence_start`
//! control event, a run of binary chunks, and a `sentence_end` event.
//! Chunks carry no id; correlation is purely by arrival order relative to
//! the last `sentence_start`. This buffer is owned and mutated only from
//! the session's event task.

use std::collections::BTreeMap;

/// One in-flight audio unit ("sentence")
#[derive(Debug, Default)]
struct Unit {
    /// Binary chunks in arrival order
    chunks: Vec<Vec<u8>>,
    /// Set when the end-of-unit event for this id is observed
    complete: bool,
}

/// Per-session store mapping unit id to its accumulated chunks
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    units: BTreeMap<u64, Unit>,
    collecting_id: Option<u64>,
    stray_chunks: u64,
}

impl ReassemblyBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin collecting chunks for unit `id`
    ///
    /// Last begin wins: a duplicate or out-of-order begin overwrites any
    /// existing entry for `id` rather than failing.
    pub fn begin_unit(&mut self, id: u64) {
        if self.units.insert(id, Unit::default()).is_some() {
            tracing::warn!(id, "duplicate sentence_start, replacing unit");
        }
        if self.collecting_id.is_some_and(|current| id <= current) {
            tracing::warn!(id, "sentence_start id did not increase");
        }
        self.collecting_id = Some(id);
    }

    /// Append a binary chunk to the currently collecting unit
    ///
    /// A chunk with no collecting unit is dropped and counted; it never
    /// creates a unit entry.
    pub fn append_chunk(&mut self, bytes: Vec<u8>) {
        match self.collecting_id {
            Some(id) => {
                self.units.entry(id).or_default().chunks.push(bytes);
            }
            None => {
                self.stray_chunks += 1;
                tracing::warn!(
                    len = bytes.len(),
                    "dropping audio chunk with no active sentence"
                );
            }
        }
    }

    /// Mark unit `id` complete
    ///
    /// Does not clear the collecting id; only the next `begin_unit` does.
    pub fn end_unit(&mut self, id: u64) {
        match self.units.get_mut(&id) {
            Some(unit) => unit.complete = true,
            None => tracing::warn!(id, "sentence_end for unknown unit"),
        }
    }

    /// Whether unit `id` exists and is complete
    #[must_use]
    pub fn is_ready(&self, id: u64) -> bool {
        self.units.get(&id).is_some_and(|unit| unit.complete)
    }

    /// Remove unit `id` and return its chunks concatenated in arrival order
    pub fn take(&mut self, id: u64) -> Option<Vec<u8>> {
        let unit = self.units.remove(&id)?;
        let total = unit.chunks.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in unit.chunks {
            bytes.extend_from_slice(&chunk);
        }
        Some(bytes)
    }

    /// Number of unit entries currently buffered
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no units are buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Id of the unit presently receiving chunks, if any
    #[must_use]
    pub const fn collecting_id(&self) -> Option<u64> {
        self.collecting_id
    }

    /// Number of chunks dropped for lack of a collecting unit
    #[must_use]
    pub const fn stray_chunks(&self) -> u64 {
        self.stray_chunks
    }

    /// Wipe all state back to the initial empty buffer
    pub fn reset(&mut self) {
        self.units.clear();
        self.collecting_id = None;
        self.stray_chunks = 0;
    }
}
