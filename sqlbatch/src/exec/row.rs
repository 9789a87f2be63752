use indexmap::IndexMap;

use crate::exec::value::Value;

/// A result row that maps from column labels to database values ([`Value`]).
///
/// Entries are kept in column order. Labels are not guaranteed to be unique
/// in a result set; setting an existing label replaces its value but keeps the
/// position of the first occurrence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    inner: IndexMap<String, Value>,
}

impl Row {
    /// Constructs a new empty row.
    pub fn new() -> Row {
        Row::default()
    }

    /// Constructs a new empty row with room for `capacity` columns.
    pub fn with_capacity(capacity: usize) -> Row {
        Row {
            inner: IndexMap::with_capacity(capacity),
        }
    }

    /// Returns a reference to the value of the given column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    /// Sets a value.
    pub fn set(&mut self, name: String, value: Value) {
        self.inner.insert(name, value);
    }

    /// Number of distinct column labels.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over the column labels, in column order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Iterates over the entries, in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Row {
        let mut row = Row::new();
        for (name, value) in iter {
            row.set(name.into(), value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}
