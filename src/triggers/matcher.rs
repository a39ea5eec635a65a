use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum gap between two firings of the same action.
pub const DEBOUNCE: Duration = Duration::from_secs(1);

/// What a recognized trigger word asks the overlay to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerAction {
    Start,
    Reset,
}

/// Recognizes trigger words in a stream of typed characters.
///
/// Keeps only as many recent characters as the longest trigger. After each
/// character the triggers are compared against the end of the buffer, longest
/// first; a match clears the buffer.
#[derive(Debug)]
pub struct TriggerMatcher {
    /// Sorted longest first
    words: Vec<(String, TriggerAction)>,
    buffer: Vec<char>,
    max_len: usize,
    last_start: Option<Instant>,
    last_reset: Option<Instant>,
}

impl TriggerMatcher {
    /// Expects words already validated and lowercased.
    pub fn new(start: &str, reset: &str) -> Self {
        let mut words = vec![
            (start.to_string(), TriggerAction::Start),
            (reset.to_string(), TriggerAction::Reset),
        ];
        words.sort_by_key(|(word, _)| std::cmp::Reverse(word.chars().count()));
        let max_len = words
            .iter()
            .map(|(word, _)| word.chars().count())
            .max()
            .unwrap_or(0);

        Self {
            words,
            buffer: Vec::with_capacity(max_len),
            max_len,
            last_start: None,
            last_reset: None,
        }
    }

    /// Feeds one key press. Returns the action when a trigger completes and
    /// the same action has not fired within the debounce window.
    pub fn push(&mut self, key: char, now: Instant) -> Option<TriggerAction> {
        if key.is_control() {
            return None;
        }
        self.buffer.extend(key.to_lowercase());
        if self.buffer.len() > self.max_len {
            let excess = self.buffer.len() - self.max_len;
            self.buffer.drain(..excess);
        }

        let action = self.words.iter().find_map(|(word, action)| {
            let len = word.chars().count();
            let tail = self.buffer.len().checked_sub(len)?;
            self.buffer[tail..]
                .iter()
                .copied()
                .eq(word.chars())
                .then_some(*action)
        })?;
        self.buffer.clear();

        let last = match action {
            TriggerAction::Start => &mut self.last_start,
            TriggerAction::Reset => &mut self.last_reset,
        };
        if let Some(prev) = *last
            && now.saturating_duration_since(prev) < DEBOUNCE
        {
            debug!(?action, "Trigger fired too quickly, ignoring");
            return None;
        }
        *last = Some(now);
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_word(matcher: &mut TriggerMatcher, word: &str, now: Instant) -> Vec<TriggerAction> {
        word.chars().filter_map(|c| matcher.push(c, now)).collect()
    }

    #[test]
    fn test_detects_triggers() {
        let mut matcher = TriggerMatcher::new("ccc", "rrr");
        let t0 = Instant::now();
        assert_eq!(type_word(&mut matcher, "ccc", t0), vec![TriggerAction::Start]);
        assert_eq!(
            type_word(&mut matcher, "rrr", t0 + Duration::from_secs(2)),
            vec![TriggerAction::Reset]
        );
    }

    #[test]
    fn test_case_insensitive_and_embedded() {
        let mut matcher = TriggerMatcher::new("ccc", "rrr");
        assert_eq!(
            type_word(&mut matcher, "hello CCC", Instant::now()),
            vec![TriggerAction::Start]
        );
    }

    #[test]
    fn test_buffer_clears_after_match() {
        let mut matcher = TriggerMatcher::new("ccc", "rrr");
        let t0 = Instant::now();
        // The fourth 'c' must not reuse the first match's characters.
        assert_eq!(
            type_word(&mut matcher, "cccc", t0),
            vec![TriggerAction::Start]
        );
        assert_eq!(
            type_word(&mut matcher, "cc", t0 + Duration::from_secs(2)),
            vec![TriggerAction::Start]
        );
    }

    #[test]
    fn test_debounce_same_action() {
        let mut matcher = TriggerMatcher::new("ccc", "rrr");
        let t0 = Instant::now();
        assert_eq!(type_word(&mut matcher, "ccc", t0), vec![TriggerAction::Start]);
        assert!(type_word(&mut matcher, "ccc", t0 + Duration::from_millis(500)).is_empty());
        assert_eq!(
            type_word(&mut matcher, "ccc", t0 + Duration::from_millis(1600)),
            vec![TriggerAction::Start]
        );
    }

    #[test]
    fn test_debounce_is_per_action() {
        let mut matcher = TriggerMatcher::new("ccc", "rrr");
        let t0 = Instant::now();
        assert_eq!(type_word(&mut matcher, "ccc", t0), vec![TriggerAction::Start]);
        assert_eq!(
            type_word(&mut matcher, "rrr", t0 + Duration::from_millis(100)),
            vec![TriggerAction::Reset]
        );
    }

    #[test]
    fn test_longest_trigger_checked_first() {
        // Both words end at the last key; the longer one wins.
        let mut matcher = TriggerMatcher::new("ab", "xab");
        assert_eq!(type_word(&mut matcher, "xab", Instant::now()), vec![TriggerAction::Reset]);
    }

    #[test]
    fn test_ignores_control_keys() {
        let mut matcher = TriggerMatcher::new("ccc", "rrr");
        let t0 = Instant::now();
        assert!(type_word(&mut matcher, "cc\n", t0).is_empty());
        assert_eq!(type_word(&mut matcher, "c", t0), vec![TriggerAction::Start]);
    }
}
