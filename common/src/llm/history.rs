use crate::llm::message::Message;

/// position in a history that a failed attempt can be rolled back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// append-only log of prior turns for one chat stage.
///
/// turns are only ever pushed in user/assistant pairs, and nothing outside
/// `rollback` removes them, so the history grows for the lifetime of the
/// owning session.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// record a completed exchange
    pub fn push_turn(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.messages.push(Message::user(prompt));
        self.messages.push(Message::assistant(reply));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn turn_count(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.messages.len())
    }

    /// drop every turn recorded after `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.messages.truncate(checkpoint.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::MessageRole;

    #[test]
    fn test_push_turn_appends_pair() {
        let mut history = ConversationHistory::new();
        assert!(history.is_empty());

        history.push_turn("q1", "a1");
        history.push_turn("q2", "a2");

        assert_eq!(history.turn_count(), 2);
        let roles: Vec<MessageRole> = history.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant
            ]
        );
        assert_eq!(history.messages()[2].content, "q2");
    }

    #[test]
    fn test_rollback_to_checkpoint() {
        let mut history = ConversationHistory::new();
        history.push_turn("kept", "kept reply");

        let checkpoint = history.checkpoint();
        history.push_turn("failed", "garbage");
        assert_eq!(history.turn_count(), 2);

        history.rollback(checkpoint);
        assert_eq!(history.turn_count(), 1);
        assert_eq!(history.messages()[0].content, "kept");
    }
}
