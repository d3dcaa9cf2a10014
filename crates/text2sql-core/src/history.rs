//! Bounded, most-recent-first query history.

use std::collections::VecDeque;

use crate::models::HistoryEntry;

/// Default number of conversions kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct QueryHistory {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl QueryHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Record a conversion at the front, evicting the oldest past the limit.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            sql_query: format!("SELECT {};", n),
            question: format!("question {}", n),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_most_recent_first() {
        let mut history = QueryHistory::default();
        for n in 1..=3 {
            history.record(entry(n));
        }
        let questions: Vec<String> = history.entries().into_iter().map(|e| e.question).collect();
        assert_eq!(questions, vec!["question 3", "question 2", "question 1"]);
    }

    #[test]
    fn test_evicts_oldest_past_limit() {
        let mut history = QueryHistory::default();
        for n in 1..=5 {
            history.record(entry(n));
        }
        assert_eq!(history.len(), 5);

        history.record(entry(6));
        assert_eq!(history.len(), 5);
        let entries = history.entries();
        assert_eq!(entries[0].question, "question 6");
        assert_eq!(entries[4].question, "question 2");
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let mut history = QueryHistory::new(0);
        history.record(entry(1));
        assert!(history.is_empty());
    }
}
