use tracing::info;

/// Text currently typed into the input field. Submitting never clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDraft {
    text: String,
}

impl InputDraft {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn pop(&mut self) -> Option<char> {
        self.text.pop()
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

/// Receives submitted form values.
pub trait SubmitSink {
    fn submitted(&mut self, value: &str);
}

/// Sink that only emits a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl SubmitSink for LogSink {
    fn submitted(&mut self, value: &str) {
        info!(value = %value, "User input submitted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_append_and_remove_from_the_end() {
        let mut d = InputDraft::default();
        for c in "alt=50".chars() {
            d.push(c);
        }
        assert_eq!(d.pop(), Some('0'));
        assert_eq!(d.as_str(), "alt=5");
    }

    #[test]
    fn pop_on_empty_draft_is_none() {
        let mut d = InputDraft::default();
        assert!(d.is_empty());
        assert_eq!(d.pop(), None);
    }
}
