//! Prompt assembly for conversational generations.

use crate::window::ContextWindow;

/// Default preamble for the study assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant for students. \
Answer clearly and concisely, and use the provided document when it is relevant.";

/// Builds the prompt text handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationPrompt {
    system: String,
    document: Option<String>,
    window: ContextWindow,
}

impl Default for ConversationPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl ConversationPrompt {
    /// Creates a prompt with a system preamble.
    #[must_use]
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            document: None,
            window: ContextWindow::default(),
        }
    }

    /// Attaches reference document text.
    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Attaches the recent history window.
    #[must_use]
    pub fn with_window(mut self, window: ContextWindow) -> Self {
        self.window = window;
        self
    }

    /// Renders the full prompt for `message`.
    ///
    /// The layout is the preamble, the document (empty line when absent),
    /// the transcript under `Conversation so far:`, then the new message and
    /// an open `AI:` turn.
    #[must_use]
    pub fn render(&self, message: &str) -> String {
        format!(
            "{}\n{}\nConversation so far:\n{}\nUser: {}\nAI:",
            self.system,
            self.document.as_deref().unwrap_or_default(),
            self.window.render(),
            message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::HistoryEntry;
    use crate::window::{HistoryOrder, context_window};

    #[test]
    fn renders_all_sections_in_order() {
        let history = vec![HistoryEntry::user("hi"), HistoryEntry::assistant("hello")];
        let prompt = ConversationPrompt::new("SYS")
            .with_document("DOC")
            .with_window(context_window(&history, HistoryOrder::OldestFirst, 6));

        assert_eq!(
            prompt.render("2+2?"),
            "SYS\nDOC\nConversation so far:\nUser: hi\nAI: hello\n\nUser: 2+2?\nAI:"
        );
    }

    #[test]
    fn missing_document_and_history_leave_empty_sections() {
        let rendered = ConversationPrompt::new("SYS").render("q");
        assert_eq!(rendered, "SYS\n\nConversation so far:\n\nUser: q\nAI:");
    }

    #[test]
    fn default_uses_study_preamble() {
        assert!(ConversationPrompt::default().render("q").starts_with(DEFAULT_SYSTEM_PROMPT));
    }
}
