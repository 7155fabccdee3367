use crate::{Dim4, MAX_DIMS};
use std::ops::Index;

/// Per-dimension distance between neighbouring elements, in elements.
///
/// Strides are signed: a view with a negative step walks its source backwards.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Strides([isize; MAX_DIMS]);

impl Strides {
    pub const fn new(strides: [isize; MAX_DIMS]) -> Self {
        Self(strides)
    }

    pub fn inner(&self) -> &[isize; MAX_DIMS] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<isize> {
        self.0.to_vec()
    }
}

impl std::fmt::Debug for Strides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut strides = format!("[{}", self.0[0]);
        for stride in self.0.iter().skip(1) {
            strides.push_str(&format!("x{}", stride));
        }
        write!(f, "{}]", strides)
    }
}

impl Index<usize> for Strides {
    type Output = isize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<&Dim4> for Strides {
    fn from(dims: &Dim4) -> Self {
        let mut strides = [0; MAX_DIMS];
        let mut stride = 1;
        for (i, size) in dims.iter().enumerate() {
            strides[i] = stride;
            stride *= *size as isize;
        }
        Self(strides)
    }
}

impl From<&Strides> for [i32; MAX_DIMS] {
    fn from(strides: &Strides) -> Self {
        strides.0.map(|s| s as i32)
    }
}
