use crate::{ArrayError, DeviceError, Dim4, Seq, Strides, MAX_DIMS};

/// Maps a logical coordinate to an element index within a buffer.
///
/// `index = offset + sum(coord[d] * strides[d])`. A contiguous layout has
/// column-major strides and offset zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    dims: Dim4,
    strides: Strides,
    offset: usize,
}

impl Layout {
    pub fn new(dims: Dim4, strides: Strides, offset: usize) -> Self {
        Self {
            dims,
            strides,
            offset,
        }
    }

    pub fn contiguous(dims: Dim4) -> Self {
        Self::new(dims, Strides::from(&dims), 0)
    }

    pub fn dims(&self) -> Dim4 {
        self.dims
    }

    pub fn strides(&self) -> Strides {
        self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn elements(&self) -> usize {
        self.dims.elements()
    }

    /// True when the layout walks its buffer front to back without gaps.
    ///
    /// Unit dimensions never contribute to the address, so their strides are ignored.
    pub fn is_linear(&self) -> bool {
        if self.offset != 0 {
            return false;
        }
        let mut expected = 1isize;
        for d in 0..MAX_DIMS {
            let extent = self.dims[d];
            if extent > 1 && self.strides[d] != expected {
                return false;
            }
            expected *= extent as isize;
        }
        true
    }

    /// Buffer element index of a logical coordinate. No bounds checking.
    pub fn index_of(&self, coord: [usize; MAX_DIMS]) -> usize {
        let rel: isize = coord
            .iter()
            .zip(self.strides.inner())
            .map(|(&c, &s)| c as isize * s)
            .sum();
        (self.offset as isize + rel) as usize
    }

    /// Composes a selector into this layout, producing the layout of the view.
    ///
    /// Dimensions without a selector keep their full span. The returned layout
    /// addresses the same buffer as `self`.
    pub fn apply(&self, selector: &[Seq; MAX_DIMS]) -> Result<Layout, ArrayError> {
        let mut dims = [0usize; MAX_DIMS];
        let mut strides = [0isize; MAX_DIMS];
        let mut offset = self.offset as isize;
        let mut empty = false;

        let overflow = |d: usize| {
            ArrayError::IndexOutOfRange(format!(
                "Selector {} overflows the address space of dimension {}",
                selector[d], d
            ))
        };
        for d in 0..MAX_DIMS {
            let extent = selector[d].extent(self.dims[d])?;
            dims[d] = extent.len;
            // A step never taken does not change the stride.
            strides[d] = match extent.len {
                0 | 1 => self.strides[d],
                _ => self.strides[d]
                    .checked_mul(extent.step)
                    .ok_or_else(|| overflow(d))?,
            };
            if extent.len == 0 {
                empty = true;
            } else {
                offset = (extent.begin as isize)
                    .checked_mul(self.strides[d])
                    .and_then(|delta| offset.checked_add(delta))
                    .ok_or_else(|| overflow(d))?;
            }
        }

        // An empty view never touches memory, keep the source offset.
        if empty {
            offset = self.offset as isize;
        }

        Ok(Layout::new(
            Dim4::new(dims),
            Strides::new(strides),
            offset as usize,
        ))
    }

    /// Lowest and highest buffer index the layout touches, `None` when empty.
    pub fn address_range(&self) -> Option<(isize, isize)> {
        if self.elements() == 0 {
            return None;
        }
        let (mut lo, mut hi) = (self.offset as isize, self.offset as isize);
        for d in 0..MAX_DIMS {
            let reach = (self.dims[d] as isize - 1) * self.strides[d];
            if reach < 0 {
                lo += reach;
            } else {
                hi += reach;
            }
        }
        Some((lo, hi))
    }

    /// Fails unless every address lies inside a buffer of `len` elements.
    pub fn check_bounds(&self, len: usize) -> Result<(), DeviceError> {
        match self.address_range() {
            Some((lo, _)) if lo < 0 => Err(DeviceError::OutOfBounds { index: lo, len }),
            Some((_, hi)) if hi >= len as isize => Err(DeviceError::OutOfBounds { index: hi, len }),
            _ => Ok(()),
        }
    }

    /// Visits every buffer index in logical (column-major) order.
    pub fn for_each_index(&self, mut f: impl FnMut(usize, usize)) {
        let dims = self.dims;
        let mut linear = 0;
        for i3 in 0..dims[3] {
            for i2 in 0..dims[2] {
                for i1 in 0..dims[1] {
                    for i0 in 0..dims[0] {
                        f(linear, self.index_of([i0, i1, i2, i3]));
                        linear += 1;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Layout({:?} {:?} +{})",
            self.dims, self.strides, self.offset
        )
    }
}
