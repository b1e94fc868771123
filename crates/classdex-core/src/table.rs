use std::collections::HashMap;

use smol_str::SmolStr;

use crate::name::{DotName, NESTED_DELIMITER};

/// Content-addressed interning table for [`DotName`]s.
///
/// Interning is an optimisation only: names compare by content, so a name
/// created outside the table still equals the interned one. The table keeps
/// equal chains sharing their prefix nodes, which matters when thousands of
/// classes live in the same packages.
#[derive(Debug, Default)]
pub struct NameTable {
    components: HashMap<(Option<DotName>, SmolStr, bool), DotName>,
    simple: HashMap<SmolStr, DotName>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len() + self.simple.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.simple.is_empty()
    }

    pub fn simple(&mut self, name: &str) -> DotName {
        if let Some(existing) = self.simple.get(name) {
            return existing.clone();
        }
        let name = DotName::simple(name);
        self.simple.insert(SmolStr::new(name.local()), name.clone());
        name
    }

    pub fn componentized(&mut self, prefix: Option<&DotName>, local: &str, inner: bool) -> DotName {
        let key = (prefix.cloned(), SmolStr::new(local), inner);
        if let Some(existing) = self.components.get(&key) {
            return existing.clone();
        }
        let name = DotName::componentized(key.0.clone(), key.1.clone(), inner);
        self.components.insert(key, name.clone());
        name
    }

    /// Converts a class-file internal name (`java/util/Map$Entry`) into a
    /// componentized name.
    ///
    /// `$` only starts a nested component between two non-empty names, so
    /// names such as `$Proxy12` or `Foo$` stay a single component.
    pub fn from_internal(&mut self, internal: &str) -> DotName {
        self.from_separated(internal, '/')
    }

    /// Same as [`NameTable::from_internal`] for binary (`.`-separated) names.
    pub fn from_binary(&mut self, binary: &str) -> DotName {
        self.from_separated(binary, '.')
    }

    fn from_separated(&mut self, name: &str, separator: char) -> DotName {
        let mut current: Option<DotName> = None;
        let mut packages = name.split(separator).peekable();
        while let Some(segment) = packages.next() {
            if packages.peek().is_some() {
                current = Some(self.componentized(current.as_ref(), segment, false));
                continue;
            }

            for (local, inner) in split_nested(segment) {
                current = Some(self.componentized(current.as_ref(), local, inner));
            }
        }
        match current {
            Some(name) => name,
            None => self.simple(""),
        }
    }
}

/// Splits `Outer$Inner$Deep` into its nested components.
fn split_nested(segment: &str) -> Vec<(&str, bool)> {
    let bytes = segment.as_bytes();
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let splits = bytes[i] == NESTED_DELIMITER as u8
            && i > start
            && i + 1 < bytes.len()
            && bytes[i + 1] != NESTED_DELIMITER as u8;
        if splits {
            out.push((&segment[start..i], !out.is_empty()));
            start = i + 1;
        }
        i += 1;
    }
    out.push((&segment[start..], !out.is_empty()));
    out
}
