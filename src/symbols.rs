use std::collections::BTreeSet;

/// Distinct variable names seen while rendering one expression.
///
/// Each parse or render gets its own table; nothing is shared between
/// invocations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    names: BTreeSet<char>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name`. Returns `false` if it was already present.
    pub fn insert(&mut self, name: char) -> bool {
        self.names.insert(name)
    }

    pub fn contains(&self, name: char) -> bool {
        self.names.contains(&name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order. Uppercase letters sort before lowercase.
    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.names.iter().copied()
    }

    /// Names as strings, ready to hand to a symbolic engine.
    pub fn to_names(&self) -> Vec<String> {
        self.iter().map(String::from).collect()
    }
}

impl Extend<char> for SymbolTable {
    fn extend<I: IntoIterator<Item = char>>(&mut self, iter: I) {
        self.names.extend(iter);
    }
}

impl FromIterator<char> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
