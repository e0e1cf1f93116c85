use std::collections::VecDeque;

/// One employee/assistant exchange kept for follow-up context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub query: String,
    pub reply: String,
}

impl Turn {
    fn chars(&self) -> usize {
        self.query.chars().count() + self.reply.chars().count()
    }
}

/// Rolling conversation window bounded by total characters.
///
/// The knowledge service sees at most this much history per request.
/// Oldest turns are evicted first; a budget of zero disables history
/// entirely.
#[derive(Clone, Debug)]
pub struct TranscriptBuffer {
    turns: VecDeque<Turn>,
    char_budget: usize,
}

impl TranscriptBuffer {
    pub fn new(char_budget: usize) -> Self {
        Self { turns: VecDeque::new(), char_budget }
    }

    pub fn record(&mut self, query: impl Into<String>, reply: impl Into<String>) {
        self.turns.push_back(Turn { query: query.into(), reply: reply.into() });
        while self.total_chars() > self.char_budget {
            if self.turns.pop_front().is_none() {
                break;
            }
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn total_chars(&self) -> usize {
        self.turns.iter().map(Turn::chars).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_turns_under_the_budget() {
        let mut buffer = TranscriptBuffer::new(100);
        buffer.record("short question", "short answer");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn evicts_oldest_turns_first() {
        let mut buffer = TranscriptBuffer::new(40);
        buffer.record("first question here", "first answer");
        buffer.record("second question", "second answer");

        assert_eq!(buffer.len(), 1);
        let remaining = buffer.turns().next().unwrap();
        assert_eq!(remaining.query, "second question");
    }

    #[test]
    fn zero_budget_disables_history() {
        let mut buffer = TranscriptBuffer::new(0);
        buffer.record("anything", "at all");
        assert!(buffer.is_empty());
    }

    #[test]
    fn single_oversized_turn_is_dropped_too() {
        let mut buffer = TranscriptBuffer::new(10);
        buffer.record("a very long question that blows the budget", "and a long answer");
        assert!(buffer.is_empty());
    }
}
