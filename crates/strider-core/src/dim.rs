use std::ops::{Index, IndexMut};

pub const MAX_DIMS: usize = 4;

/// Fixed rank-4 extent of an array.
///
/// Dimension 0 varies fastest. Trailing dimensions that were never specified are 1,
/// so a 3x2 matrix is `[3x2x1x1]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dim4([usize; MAX_DIMS]);

impl Dim4 {
    pub const fn new(dims: [usize; MAX_DIMS]) -> Self {
        Self(dims)
    }

    pub fn inner(&self) -> &[usize; MAX_DIMS] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&usize> {
        self.0.get(index)
    }

    pub fn elements(&self) -> usize {
        self.0.iter().product()
    }

    /// Number of dimensions up to and including the last non-unit one.
    ///
    /// An empty array has zero dimensions, a scalar has one.
    pub fn ndims(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.0
            .iter()
            .rposition(|&d| d != 1)
            .map(|last| last + 1)
            .unwrap_or(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.0.to_vec()
    }

    pub fn is_empty(&self) -> bool {
        self.elements() == 0
    }

    pub fn is_scalar(&self) -> bool {
        self.elements() == 1
    }

    /// Exactly one dimension is longer than 1 and all others are 1.
    pub fn is_vector(&self) -> bool {
        let singular = self.0.iter().filter(|&&d| d == 1).count();
        let non_singular = self.0.iter().filter(|&&d| d > 1).count();
        singular == MAX_DIMS - 1 && non_singular == 1
    }

    pub fn is_row(&self) -> bool {
        self.0[0] == 1 && self.0[1] > 1 && self.0[2] == 1 && self.0[3] == 1
    }

    pub fn is_column(&self) -> bool {
        self.0[0] > 1 && self.0[1] == 1 && self.0[2] == 1 && self.0[3] == 1
    }
}

impl std::fmt::Debug for Dim4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dims = format!("[{}", self.0[0]);
        for dim in self.0.iter().skip(1) {
            dims.push_str(&format!("x{}", dim));
        }
        write!(f, "{}]", dims)
    }
}

impl std::fmt::Display for Dim4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Index<usize> for Dim4 {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Dim4 {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl From<[usize; MAX_DIMS]> for Dim4 {
    fn from(dims: [usize; MAX_DIMS]) -> Self {
        Self(dims)
    }
}

impl TryFrom<&[usize]> for Dim4 {
    type Error = anyhow::Error;

    fn try_from(slice: &[usize]) -> Result<Self, Self::Error> {
        if slice.is_empty() || slice.len() > MAX_DIMS {
            anyhow::bail!("Dim4 takes 1 to {} extents, got {}", MAX_DIMS, slice.len());
        }
        let mut dims = [1; MAX_DIMS];
        dims[..slice.len()].copy_from_slice(slice);
        Ok(Self(dims))
    }
}

impl From<&Dim4> for [u32; MAX_DIMS] {
    fn from(dims: &Dim4) -> Self {
        dims.0.map(|d| d as u32)
    }
}

#[cfg(test)]
mod tests {
    use crate::{dim4, Dim4};
    use proptest::prelude::*;
    use proptest::strategy::{BoxedStrategy, Strategy};
    use std::ops::RangeInclusive;

    impl Arbitrary for Dim4 {
        type Parameters = Vec<RangeInclusive<usize>>;
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
            let mut ranges = args.into_iter();
            let mut next = || ranges.next().unwrap_or(1..=1);
            (next(), next(), next(), next())
                .prop_map(|(a, b, c, d)| Dim4::new([a, b, c, d]))
                .boxed()
        }
    }

    #[test]
    fn test_ndims() {
        assert_eq!(dim4![5].ndims(), 1);
        assert_eq!(dim4![1].ndims(), 1);
        assert_eq!(dim4![4, 4].ndims(), 2);
        assert_eq!(dim4![1, 1, 3].ndims(), 3);
        assert_eq!(dim4![2, 0, 3].ndims(), 0);
    }

    #[test]
    fn test_degeneracy() {
        assert!(dim4![7].is_vector());
        assert!(dim4![7].is_column());
        assert!(dim4![1, 7].is_row());
        assert!(dim4![1, 7].is_vector());
        assert!(!dim4![2, 7].is_vector());
        assert!(dim4![1, 1, 1, 1].is_scalar());
        assert!(dim4![3, 0].is_empty());
        assert!(!dim4![3, 0].is_vector());
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", dim4![4, 3]), "[4x3x1x1]");
    }

    #[test]
    fn test_try_from_slice() {
        let dims = Dim4::try_from(&[2usize, 3][..]).unwrap();
        assert_eq!(dims, dim4![2, 3, 1, 1]);
        assert!(Dim4::try_from(&[1usize, 2, 3, 4, 5][..]).is_err());
    }

    #[test_strategy::proptest(cases = 64)]
    fn test_elements(#[any(vec![0..=8, 0..=8, 0..=4, 0..=4])] dims: Dim4) {
        assert_eq!(dims.elements(), dims[0] * dims[1] * dims[2] * dims[3]);
        assert_eq!(dims.is_empty(), dims.iter().any(|&d| d == 0));
    }
}
