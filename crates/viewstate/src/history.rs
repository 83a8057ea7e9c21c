/// Where the encoded view state goes.
///
/// Writes replace the current history entry; they never push a new one.
pub trait HistorySink {
    /// `query` has no leading `?` and may be empty.
    fn replace(&mut self, query: &str);
}

/// Keeps every write, newest last.
#[derive(Debug, Default, Clone)]
pub struct MemoryHistory {
    writes: Vec<String>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.writes.last().map(String::as_str)
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }
}

impl HistorySink for MemoryHistory {
    fn replace(&mut self, query: &str) {
        self.writes.push(query.to_string());
    }
}
