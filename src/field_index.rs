use std::collections::HashMap;

/// Maps `${name}` field references to positional slots in a row.
///
/// The caller owns the mapping and supplies rows to
/// [`Generator::set`](crate::Generator::set) in slot order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FieldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index with one slot per name, in the order given.
    pub fn with_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for name in names {
            index.create(name);
        }
        index
    }

    /// Slot for `name`, allocating the next one if the name is new.
    pub fn create(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(pos) = self.positions.get(&name) {
            return *pos;
        }
        let pos = self.names.len();
        self.positions.insert(name.clone(), pos);
        self.names.push(name);
        pos
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn name(&self, pos: usize) -> Option<&str> {
        self.names.get(pos).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
