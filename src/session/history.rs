use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum HistoryMode {
    Push,
    Replace,
}

/// The browser history seam: the session reads the current URL and writes
/// new ones through this.
pub trait NavigationHistory {
    fn current(&self) -> String;
    fn push(&mut self, url: &str);
    fn replace(&mut self, url: &str);

    fn apply(&mut self, mode: HistoryMode, url: &str) {
        match mode {
            HistoryMode::Push => self.push(url),
            HistoryMode::Replace => self.replace(url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<String>,
    cursor: usize,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: vec![initial.into()],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }
}

impl NavigationHistory for MemoryHistory {
    fn current(&self) -> String {
        self.entries[self.cursor].clone()
    }

    fn push(&mut self, url: &str) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(url.to_string());
        self.cursor += 1;
    }

    fn replace(&mut self, url: &str) {
        self.entries[self.cursor] = url.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_discards_forward_entries() {
        let mut history = MemoryHistory::new("/");
        history.push("/?is=A");
        history.push("/?is=A-B");
        assert!(history.back());
        history.push("/?is=C");
        assert_eq!(history.len(), 3);
        assert!(!history.forward());
        assert_eq!(history.current(), "/?is=C");
    }

    #[test]
    fn replace_keeps_length() {
        let mut history = MemoryHistory::new("/");
        history.apply(HistoryMode::Replace, "/?n=x");
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), "/?n=x");
        assert!(!history.back());
        assert_eq!(HistoryMode::Replace.to_string(), "replace");
    }
}
