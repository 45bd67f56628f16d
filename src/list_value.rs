use std::fmt;

use serde::Serialize;

/// Join delimiter for every list written to a cell.
pub const CANONICAL_DELIMITER: &str = "; ";

/// Delimiters accepted when reading cells written by older tooling or edited
/// by hand, in priority order.
const LEGACY_DELIMITERS: [char; 3] = [';', '|', ','];

/// Ordered set of short labels stored in one cell (interests, tags, areas).
/// Membership compares case-insensitively; the first spelling wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for value in values {
            list.add(value.as_ref());
        }
        list
    }

    /// Reads a stored cell: split on the first of `;`, `|`, `,` that occurs.
    /// Hand-entered duplicates collapse to their first spelling.
    pub fn parse_legacy(cell: &str) -> Self {
        match LEGACY_DELIMITERS
            .iter()
            .find(|delimiter| cell.contains(**delimiter))
        {
            Some(delimiter) => Self::from_values(cell.split(*delimiter)),
            None => Self::from_values([cell]),
        }
    }

    pub fn encode(&self) -> String {
        self.0.join(CANONICAL_DELIMITER)
    }

    pub fn contains(&self, value: &str) -> bool {
        let needle = value.trim().to_lowercase();
        self.0.iter().any(|item| item.to_lowercase() == needle)
    }

    /// Returns false when the value is blank or already present.
    pub fn add(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.contains(value) {
            return false;
        }
        self.0.push(value.to_string());
        true
    }

    pub fn remove(&mut self, value: &str) -> bool {
        let needle = value.trim().to_lowercase();
        let before = self.0.len();
        self.0.retain(|item| item.to_lowercase() != needle);
        self.0.len() != before
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
