use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::GenerationMode;

pub const HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub prompt: String,
    pub style: String,
    pub mode: GenerationMode,
    pub created_at: DateTime<Utc>,
    pub image_count: usize,
}

/// Recent actions of a session, newest first, oldest evicted past capacity.
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl HistoryLedger {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-session state threaded through every tool call.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub history: HistoryLedger,
    pub total_cost: f64,
}

impl SessionContext {
    pub fn record(&mut self, entry: HistoryEntry, cost_per_image: f64) {
        self.total_cost += entry.image_count as f64 * cost_per_image;
        self.history.record(entry);
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub history: Vec<HistoryEntry>,
    pub total_cost: f64,
}

impl From<&SessionContext> for SessionSnapshot {
    fn from(session: &SessionContext) -> Self {
        Self {
            history: session.history.entries().cloned().collect(),
            total_cost: session.total_cost,
        }
    }
}
