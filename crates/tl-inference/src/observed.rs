//! Observed-count tuples used as memo keys.

use std::fmt;

/// Observed counts of every channel of a combination, in channel order.
/// A masked slot (`None`) stands for "any count" and keys the partitions
/// of the limit interpolation cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Observed(Vec<Option<u64>>);

impl Observed {
    /// Tuple of counts.
    pub fn new(counts: impl IntoIterator<Item = u64>) -> Self {
        Self(counts.into_iter().map(Some).collect())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tuple has no slot.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Count in slot `i`, `None` if masked or out of range.
    pub fn get(&self, i: usize) -> Option<u64> {
        self.0.get(i).copied().flatten()
    }

    /// Set slot `i`; ignored when out of range.
    pub fn set(&mut self, i: usize, count: u64) {
        if let Some(slot) = self.0.get_mut(i) {
            *slot = Some(count);
        }
    }

    /// Copy with slot `i` masked.
    pub fn masked(&self, i: usize) -> Self {
        let mut out = self.clone();
        if let Some(slot) = out.0.get_mut(i) {
            *slot = None;
        }
        out
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for slot in &self.0 {
            match slot {
                Some(n) => write!(f, " {n}")?,
                None => f.write_str(" -")?,
            }
        }
        f.write_str(" )")
    }
}
