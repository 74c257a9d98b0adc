//! Caller-owned invocation history
//!
//! Each invocation appends one entry; the log keeps the most recent
//! `max_entries` and at most `max_responses` raw responses per entry.

use super::invoker::PaginationState;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;

pub const DEFAULT_MAX_ENTRIES: usize = 10;
pub const DEFAULT_MAX_RESPONSES: usize = 5;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub command: String,
    pub started_at: DateTime<Utc>,
    /// Request as supplied by the caller
    pub request: Value,
    /// Raw responses, oldest first, capped per entry
    pub responses: Vec<Value>,
    pub calls: usize,
    pub emitted: usize,
    pub state: PaginationState,
    pub error: Option<String>,
}

impl HistoryEntry {
    fn new(command: &str, request: Value) -> Self {
        Self {
            command: command.to_string(),
            started_at: Utc::now(),
            request,
            responses: Vec::new(),
            calls: 0,
            emitted: 0,
            state: PaginationState::Start,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultLog {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
    max_responses: usize,
}

impl Default for ResultLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_RESPONSES)
    }
}

impl ResultLog {
    pub fn new(max_entries: usize, max_responses: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            max_responses,
        }
    }

    /// Open a new entry for an invocation, evicting the oldest if full
    pub(crate) fn begin(&mut self, command: &str, request: Value) {
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry::new(command, request));
    }

    pub(crate) fn record_response(&mut self, response: &Value) {
        let max_responses = self.max_responses;
        if let Some(entry) = self.entries.back_mut() {
            entry.calls += 1;
            if entry.responses.len() < max_responses {
                entry.responses.push(response.clone());
            }
        }
    }

    pub(crate) fn record_emit(&mut self) {
        if let Some(entry) = self.entries.back_mut() {
            entry.emitted += 1;
        }
    }

    pub(crate) fn finish(&mut self, state: PaginationState, error: Option<String>) {
        if let Some(entry) = self.entries.back_mut() {
            entry.state = state;
            entry.error = error;
        }
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_is_bounded() {
        let mut log = ResultLog::new(2, 5);
        for command in ["A", "B", "C"] {
            log.begin(command, json!({}));
        }
        let commands: Vec<_> = log.entries().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["B", "C"]);
    }

    #[test]
    fn test_responses_are_capped_but_counted() {
        let mut log = ResultLog::new(10, 2);
        log.begin("Get-Items", json!({"MaxResults": 10}));
        for i in 0..4 {
            log.record_response(&json!({ "page": i }));
        }
        log.record_emit();
        log.finish(PaginationState::Done, None);

        let entry = log.last().unwrap();
        assert_eq!(entry.calls, 4);
        assert_eq!(entry.responses.len(), 2);
        assert_eq!(entry.emitted, 1);
        assert_eq!(entry.state, PaginationState::Done);
        assert_eq!(entry.request, json!({"MaxResults": 10}));
    }

    #[test]
    fn test_zero_capacity_keeps_one_entry() {
        let mut log = ResultLog::new(0, 0);
        log.begin("A", json!({}));
        log.begin("B", json!({}));
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().command, "B");
    }
}
