//! Bounded recent-history windows.
//!
//! Building a window is a pure function over the caller's history; it never
//! reorders entries beyond putting them in chronological order.

use crate::message::HistoryEntry;

/// Order in which a history source returns entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryOrder {
    /// Chronological ascending.
    #[default]
    OldestFirst,
    /// Most recent first, as returned by a descending database query.
    NewestFirst,
}

/// The most recent turns of a conversation, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextWindow {
    entries: Vec<HistoryEntry>,
}

impl ContextWindow {
    /// Entries in chronological order.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the window as a transcript, one `"User: …"`/`"AI: …"` line per entry.
    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.transcript_line() + "\n")
            .collect()
    }

    /// Consumes the window.
    #[must_use]
    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }
}

/// Returns the last `k` entries of `history` in chronological order.
#[must_use]
pub fn context_window(history: &[HistoryEntry], order: HistoryOrder, k: usize) -> ContextWindow {
    let take = k.min(history.len());
    let entries = match order {
        HistoryOrder::OldestFirst => history[history.len() - take..].to_vec(),
        HistoryOrder::NewestFirst => history[..take].iter().rev().cloned().collect(),
    };
    ContextWindow { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> Vec<HistoryEntry> {
        (1..=n)
            .map(|i| {
                if i % 2 == 1 {
                    HistoryEntry::user(format!("m{i}"))
                } else {
                    HistoryEntry::assistant(format!("m{i}"))
                }
            })
            .collect()
    }

    fn texts(window: &ContextWindow) -> Vec<&str> {
        window.entries().iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn keeps_last_k_in_chronological_order() {
        let window = context_window(&history(12), HistoryOrder::OldestFirst, 10);
        let expected: Vec<String> = (3..=12).map(|i| format!("m{i}")).collect();
        assert_eq!(texts(&window), expected);
    }

    #[test]
    fn k_larger_than_history_returns_everything() {
        let all = history(4);
        let window = context_window(&all, HistoryOrder::OldestFirst, 10);
        assert_eq!(window.entries(), all.as_slice());
    }

    #[test]
    fn empty_history_and_zero_k() {
        assert!(context_window(&[], HistoryOrder::OldestFirst, 6).is_empty());
        assert!(context_window(&history(3), HistoryOrder::NewestFirst, 0).is_empty());
    }

    #[test]
    fn newest_first_input_is_reversed() {
        let mut newest_first = history(12);
        newest_first.reverse();
        let window = context_window(&newest_first, HistoryOrder::NewestFirst, 10);
        let expected: Vec<String> = (3..=12).map(|i| format!("m{i}")).collect();
        assert_eq!(texts(&window), expected);
    }

    #[test]
    fn render_produces_transcript() {
        let window = context_window(&history(3), HistoryOrder::OldestFirst, 2);
        assert_eq!(window.render(), "AI: m2\nUser: m3\n");
        assert_eq!(ContextWindow::default().render(), "");
    }
}
