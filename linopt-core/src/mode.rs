//! Optical mode addressing

use std::fmt;

/// Type-safe identifier for an optical mode (circuit port)
///
/// # Example
/// ```
/// use linopt_core::ModeId;
///
/// let m0 = ModeId::new(0);
/// let m1 = ModeId::new(1);
/// assert!(m0 < m1);
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ModeId(usize);

impl ModeId {
    /// Create a new mode identifier
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying index
    ///
    /// # Example
    /// ```
    /// use linopt_core::ModeId;
    /// let m = ModeId::new(5);
    /// assert_eq!(m.index(), 5);
    /// ```
    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }

    /// Shift this mode by a port offset
    #[inline]
    pub const fn offset(&self, by: usize) -> Self {
        Self(self.0 + by)
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl From<usize> for ModeId {
    #[inline]
    fn from(id: usize) -> Self {
        Self::new(id)
    }
}

impl From<ModeId> for usize {
    #[inline]
    fn from(mid: ModeId) -> Self {
        mid.index()
    }
}

/// Contiguous run of modes `offset..offset + width`
pub fn mode_range(offset: usize, width: usize) -> impl Iterator<Item = ModeId> {
    (offset..offset + width).map(ModeId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_ordering() {
        let m0 = ModeId::new(0);
        let m1 = ModeId::new(1);
        assert!(m0 < m1);
        assert_eq!(m0, ModeId::from(0));
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(format!("{}", ModeId::new(5)), "m5");
    }

    #[test]
    fn test_mode_offset() {
        assert_eq!(ModeId::new(1).offset(2), ModeId::new(3));
    }

    #[test]
    fn test_mode_range() {
        let modes: Vec<usize> = mode_range(2, 3).map(usize::from).collect();
        assert_eq!(modes, vec![2, 3, 4]);
    }
}
