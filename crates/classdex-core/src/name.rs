use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;

/// Separator between package (or plain) segments when a name is rendered.
pub const PACKAGE_DELIMITER: char = '.';

/// Separator between an enclosing class and a nested class.
pub const NESTED_DELIMITER: char = '$';

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A dotted, possibly nested, Java name.
///
/// A name is stored either *simple* (the whole dotted string in one node) or
/// *componentized* (a chain of `(prefix, local, inner)` nodes). Equality,
/// hashing and ordering only look at the rendered `.`/`$` string, so both
/// representations can be mixed freely:
///
/// ```
/// use classdex_core::DotName;
///
/// let simple = DotName::simple("java.util.Map$Entry");
/// let java = DotName::componentized(None, "java", false);
/// let util = DotName::componentized(Some(java), "util", false);
/// let map = DotName::componentized(Some(util), "Map", false);
/// let entry = DotName::componentized(Some(map), "Entry", true);
///
/// assert_eq!(simple, entry);
/// assert_eq!(entry.to_string_with('/'), "java/util/Map$Entry");
/// ```
///
/// Names are immutable and cheap to clone (an `Arc` bump).
#[derive(Clone)]
pub struct DotName(Arc<Node>);

struct Node {
    prefix: Option<DotName>,
    local: SmolStr,
    componentized: bool,
    inner: bool,
    /// FNV-1a state after feeding every rendered byte.
    hash: u64,
    /// Length of the rendered string in bytes.
    len: usize,
}

impl DotName {
    /// Creates a name holding the full dotted string in a single node.
    pub fn simple(name: impl Into<SmolStr>) -> Self {
        let local = name.into();
        let hash = fnv(FNV_OFFSET, local.as_bytes());
        let len = local.len();
        DotName(Arc::new(Node {
            prefix: None,
            local,
            componentized: false,
            inner: false,
            hash,
            len,
        }))
    }

    /// Creates a name by appending `local` to `prefix`.
    ///
    /// `inner` marks `local` as a nested class of `prefix`; it is rendered with
    /// [`NESTED_DELIMITER`] instead of the caller's delimiter.
    pub fn componentized(prefix: Option<DotName>, local: impl Into<SmolStr>, inner: bool) -> Self {
        let local = local.into();
        let (hash, len) = match &prefix {
            Some(prefix) => {
                let sep = if inner { b'$' } else { b'.' };
                let hash = fnv(fnv(prefix.0.hash, &[sep]), local.as_bytes());
                (hash, prefix.0.len + 1 + local.len())
            }
            None => (fnv(FNV_OFFSET, local.as_bytes()), local.len()),
        };
        DotName(Arc::new(Node {
            prefix,
            local,
            componentized: true,
            inner,
            hash,
            len,
        }))
    }

    /// Returns `true` when this name is stored as a chain of components.
    pub fn is_componentized(&self) -> bool {
        self.0.componentized
    }

    /// Returns `true` when the last component is a nested class of its prefix.
    pub fn is_inner(&self) -> bool {
        self.0.inner
    }

    /// The enclosing component, if this name is componentized.
    pub fn prefix(&self) -> Option<&DotName> {
        self.0.prefix.as_ref()
    }

    /// The local portion of this name.
    ///
    /// For a simple name the local portion is the entire string.
    pub fn local(&self) -> &str {
        &self.0.local
    }

    /// Renders the name, using `delim` between package segments.
    ///
    /// Nested-class boundaries of componentized names always render as `$`.
    pub fn to_string_with(&self, delim: char) -> String {
        let mut out = String::with_capacity(self.0.len);
        for segment in self.segments() {
            match segment {
                Segment::Package => out.push(delim),
                Segment::Nested => out.push(NESTED_DELIMITER),
                Segment::Text(text) => {
                    if delim == PACKAGE_DELIMITER {
                        out.push_str(text);
                    } else {
                        out.extend(text.chars().map(|c| if c == '.' { delim } else { c }));
                    }
                }
            }
        }
        out
    }

    /// The package this name belongs to, or `None` for the default package.
    pub fn package_prefix(&self) -> Option<DotName> {
        if self.0.componentized {
            let mut top = self;
            let mut dotted = top.0.local.contains(PACKAGE_DELIMITER);
            while top.0.inner && !dotted {
                match &top.0.prefix {
                    Some(prefix) => top = prefix,
                    None => break,
                }
                dotted = top.0.local.contains(PACKAGE_DELIMITER);
            }
            if !dotted {
                return top.0.prefix.clone();
            }
        }

        let rendered = self.to_string();
        rendered
            .rsplit_once(PACKAGE_DELIMITER)
            .map(|(package, _)| DotName::simple(package))
    }

    /// The name with its package prefix stripped, e.g. `Map$Entry`.
    pub fn without_package_prefix(&self) -> String {
        let rendered = self.to_string();
        match rendered.rsplit_once(PACKAGE_DELIMITER) {
            Some((_, local)) => local.to_string(),
            None => rendered,
        }
    }

    /// Walks the chain from the root, yielding separators and text.
    fn segments(&self) -> Vec<Segment<'_>> {
        let mut out = Vec::new();
        let mut current = Some(self);
        while let Some(name) = current {
            out.push(Segment::Text(name.0.local.as_str()));
            if name.0.prefix.is_some() {
                out.push(if name.0.inner {
                    Segment::Nested
                } else {
                    Segment::Package
                });
            }
            current = name.0.prefix.as_ref();
        }
        out.reverse();
        out
    }

    fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.segments().into_iter().flat_map(|segment| {
            let bytes: &[u8] = match segment {
                Segment::Package => b".",
                Segment::Nested => b"$",
                Segment::Text(text) => text.as_bytes(),
            };
            bytes.iter().copied()
        })
    }
}

#[derive(Clone, Copy)]
enum Segment<'a> {
    Package,
    Nested,
    Text(&'a str),
}

fn fnv(mut state: u64, bytes: &[u8]) -> u64 {
    for b in bytes {
        state ^= u64::from(*b);
        state = state.wrapping_mul(FNV_PRIME);
    }
    state
}

impl PartialEq for DotName {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.0.hash != other.0.hash || self.0.len != other.0.len {
            return false;
        }
        if !self.0.componentized && !other.0.componentized {
            return self.0.local == other.0.local;
        }
        self.bytes().eq(other.bytes())
    }
}

impl Eq for DotName {}

impl Hash for DotName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl Ord for DotName {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        if !self.0.componentized && !other.0.componentized {
            return self.0.local.as_bytes().cmp(other.0.local.as_bytes());
        }
        self.bytes().cmp(other.bytes())
    }
}

impl PartialOrd for DotName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.componentized {
            return f.write_str(&self.0.local);
        }
        for segment in self.segments() {
            match segment {
                Segment::Package => f.write_str(".")?,
                Segment::Nested => f.write_str("$")?,
                Segment::Text(text) => f.write_str(text)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DotName({self})")
    }
}

impl From<&str> for DotName {
    fn from(value: &str) -> Self {
        DotName::simple(value)
    }
}

impl From<String> for DotName {
    fn from(value: String) -> Self {
        DotName::simple(value)
    }
}
