//! Bounded in-memory audit log buffer (spec §4.9).
//!
//! Grounded on `audit.py::AuditLogBuffer`: `log()` is memory-only and
//! microsecond-cheap; a background cycle drains it. Overflow drops the
//! oldest record, not the newest — a `VecDeque` makes that a cheap
//! `pop_front` instead of the Python list's O(n) `pop(0)`.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;

use crate::collaborators::AuditRecord;
use crate::entry::now_millis;

const DEFAULT_MAX_SIZE: usize = 1000;

pub struct AuditBuffer {
    buffer: Mutex<VecDeque<AuditRecord>>,
    max_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditStats {
    pub pending: usize,
    pub max_size: usize,
}

impl AuditBuffer {
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::new()),
            max_size,
        }
    }

    pub fn log(&self, user_id: i64, action: impl Into<String>, target: impl Into<String>, detail: impl Into<String>, ip: impl Into<String>) {
        let record = AuditRecord {
            user_id,
            action: action.into(),
            target: target.into(),
            detail: detail.into(),
            ip: ip.into(),
            created_at: now_millis(),
        };
        let mut buffer = self.buffer.lock();
        buffer.push_back(record);
        if buffer.len() > self.max_size {
            buffer.pop_front();
        }
    }

    /// Atomically returns all buffered records and empties the buffer.
    /// Called once per Syncer cycle; anything lost to a failed downstream
    /// insert after this point is accepted loss (spec §4.9).
    #[must_use]
    pub fn flush(&self) -> Vec<AuditRecord> {
        let mut buffer = self.buffer.lock();
        std::mem::take(&mut *buffer).into_iter().collect()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.buffer.lock().len()
    }

    #[must_use]
    pub fn stats(&self) -> AuditStats {
        AuditStats {
            pending: self.size(),
            max_size: self.max_size,
        }
    }
}

impl Default for AuditBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_oldest_not_newest() {
        let buffer = AuditBuffer::new(2);
        buffer.log(1, "login", "", "", "1.1.1.1");
        buffer.log(2, "login", "", "", "1.1.1.2");
        buffer.log(3, "login", "", "", "1.1.1.3");
        let entries = buffer.flush();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_id, 2);
        assert_eq!(entries[1].user_id, 3);
    }

    #[test]
    fn flush_empties_buffer() {
        let buffer = AuditBuffer::new(10);
        buffer.log(1, "login", "", "", "");
        assert_eq!(buffer.size(), 1);
        let entries = buffer.flush();
        assert_eq!(entries.len(), 1);
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn stats_reports_pending_and_capacity() {
        let buffer = AuditBuffer::new(5);
        buffer.log(1, "login", "", "", "");
        let stats = buffer.stats();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.max_size, 5);
    }
}
