use std::ops::RangeInclusive;

use crate::ArrayError;

/// Per-dimension `(begin, end, step)` selector.
///
/// Both bounds are inclusive. Negative bounds count from the end of the
/// dimension, so `-1` is the last element and [`Seq::span`] is `(0, -1, 1)`.
/// A negative step walks from `begin` down to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seq {
    pub begin: isize,
    pub end: isize,
    pub step: isize,
}

/// A selector applied to one concrete extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqExtent {
    /// First source index visited. Meaningless when `len == 0`.
    pub begin: usize,
    pub len: usize,
    pub step: isize,
}

impl Seq {
    pub const fn new(begin: isize, end: isize, step: isize) -> Self {
        Self { begin, end, step }
    }

    /// The whole dimension.
    pub const fn span() -> Self {
        Self::new(0, -1, 1)
    }

    /// A single index.
    pub const fn at(index: isize) -> Self {
        Self::new(index, index, 1)
    }

    pub fn is_span(&self) -> bool {
        *self == Self::span()
    }

    /// Resolves the selector against a dimension of length `dim`.
    ///
    /// An inverted range selects nothing and is not an error. A non-empty range
    /// must lie inside `[0, dim)`.
    pub fn extent(&self, dim: usize) -> Result<SeqExtent, ArrayError> {
        if self.step == 0 {
            return Err(ArrayError::InvalidArgument(format!(
                "Selector {} has a zero step",
                self
            )));
        }
        let extent = dim as isize;
        let normalize = |i: isize| if i < 0 { i + extent } else { i };
        let (begin, end) = (normalize(self.begin), normalize(self.end));

        let empty = if self.step > 0 { end < begin } else { begin < end };
        if empty {
            return Ok(SeqExtent {
                begin: 0,
                len: 0,
                step: self.step,
            });
        }

        let out_of_range = || {
            ArrayError::IndexOutOfRange(format!(
                "Selector {} exceeds a dimension of {}",
                self, dim
            ))
        };
        let len = (begin.abs_diff(end) / self.step.unsigned_abs())
            .checked_add(1)
            .ok_or_else(out_of_range)?;
        let last = isize::try_from(len - 1)
            .ok()
            .and_then(|n| n.checked_mul(self.step))
            .and_then(|delta| begin.checked_add(delta));
        let in_bounds = |i: isize| (0..extent).contains(&i);
        match last {
            Some(last) if in_bounds(begin) && in_bounds(last) => {}
            _ => return Err(out_of_range()),
        }

        Ok(SeqExtent {
            begin: begin as usize,
            len,
            step: self.step,
        })
    }
}

impl Default for Seq {
    fn default() -> Self {
        Self::span()
    }
}

impl std::fmt::Display for Seq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.begin, self.end, self.step)
    }
}

impl From<RangeInclusive<isize>> for Seq {
    fn from(range: RangeInclusive<isize>) -> Self {
        Self::new(*range.start(), *range.end(), 1)
    }
}

impl From<isize> for Seq {
    fn from(index: isize) -> Self {
        Self::at(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len(seq: Seq, dim: usize) -> usize {
        seq.extent(dim).unwrap().len
    }

    #[test]
    fn test_forward_extent() {
        assert_eq!(len(Seq::new(1, 2, 1), 4), 2);
        assert_eq!(len(Seq::new(0, 3, 2), 4), 2);
        assert_eq!(len(Seq::new(0, 2, 2), 4), 2);
        assert_eq!(len(Seq::new(0, 0, 1), 1), 1);
        assert_eq!(len(Seq::span(), 7), 7);
    }

    #[test]
    fn test_reverse_extent() {
        let e = Seq::new(-1, 0, -1).extent(5).unwrap();
        assert_eq!((e.begin, e.len), (4, 5));
        let e = Seq::new(4, 1, -2).extent(5).unwrap();
        assert_eq!((e.begin, e.len), (4, 2));
    }

    #[test]
    fn test_empty_ranges() {
        assert_eq!(len(Seq::new(2, 1, 1), 4), 0);
        assert_eq!(len(Seq::new(1, 2, -1), 4), 0);
        assert_eq!(len(Seq::span(), 0), 0);
        assert_eq!(len(Seq::new(9, 3, 1), 4), 0);
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            Seq::new(1, 4, 1).extent(4),
            Err(ArrayError::IndexOutOfRange(_))
        ));
        assert!(matches!(
            Seq::new(-5, 0, 1).extent(4),
            Err(ArrayError::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn test_extreme_bounds_and_steps() {
        assert!(matches!(
            Seq::new(0, isize::MAX, 1).extent(4),
            Err(ArrayError::IndexOutOfRange(_))
        ));
        assert!(matches!(
            Seq::new(isize::MIN, isize::MAX, 1).extent(4),
            Err(ArrayError::IndexOutOfRange(_))
        ));
        let e = Seq::new(1, 0, isize::MIN).extent(4).unwrap();
        assert_eq!((e.begin, e.len, e.step), (1, 1, isize::MIN));
        let e = Seq::new(0, 0, isize::MAX).extent(4).unwrap();
        assert_eq!((e.begin, e.len), (0, 1));
        let e = Seq::new(0, 3, isize::MAX).extent(4).unwrap();
        assert_eq!((e.begin, e.len), (0, 1));
    }

    #[test]
    fn test_zero_step() {
        assert!(matches!(
            Seq::new(0, 3, 0).extent(4),
            Err(ArrayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Seq::from(1..=2), Seq::new(1, 2, 1));
        assert_eq!(Seq::from(3), Seq::new(3, 3, 1));
        assert!(Seq::default().is_span());
    }
}
