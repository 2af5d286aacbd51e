use std::fmt;

/// 1-based genomic coordinate.
pub type Pos = u32;

// AHash-backed collections; import the `*Ext` traits for `::new()` / `::with_capacity()`.
pub type HashMap<K, V> = ahash::HashMap<K, V>;
pub type HashSet<T> = ahash::HashSet<T>;
pub(crate) use ahash::HashMapExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn from_char(c: char) -> Self {
        if c == '-' {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn is_forward(self) -> bool {
        self == Strand::Forward
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}
