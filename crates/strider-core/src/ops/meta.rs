use bytemuck::{Pod, Zeroable};

use crate::{ArrayError, DeviceError, Dim4, Layout, Strides, MAX_DIMS};

/// Uniform block shared by every geometry kernel, CPU and GPU alike.
///
/// Strides and offset are in elements. `tf` holds the rows of the 3x3 matrix that
/// maps an output pixel `(x, y, 1)` to a source coordinate; the fourth column is padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GeometryMeta {
    pub out_dims: [u32; 4],
    pub in_dims: [u32; 4],
    pub out_strides: [i32; 4],
    pub in_strides: [i32; 4],
    pub in_offset: u32,
    pub _pad: [u32; 3],
    pub tf: [[f32; 4]; 3],
}

const IDENTITY: [[f32; 4]; 3] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

/// Checked conversion of a size, stride or offset into its uniform field type.
pub(crate) fn narrow<T: TryFrom<N>, N: Copy + std::fmt::Display>(
    value: N,
) -> Result<T, DeviceError> {
    T::try_from(value).map_err(|_| DeviceError::AbiOverflow(value.to_string()))
}

impl GeometryMeta {
    pub fn new(out_dims: Dim4, input: &Layout) -> Result<Self, ArrayError> {
        let out_strides = Strides::from(&out_dims);
        let mut meta = Self {
            out_dims: [0; MAX_DIMS],
            in_dims: [0; MAX_DIMS],
            out_strides: [0; MAX_DIMS],
            in_strides: [0; MAX_DIMS],
            in_offset: narrow(input.offset())?,
            _pad: [0; 3],
            tf: IDENTITY,
        };
        for d in 0..MAX_DIMS {
            meta.out_dims[d] = narrow(out_dims[d])?;
            meta.in_dims[d] = narrow(input.dims()[d])?;
            meta.out_strides[d] = narrow(out_strides[d])?;
            meta.in_strides[d] = narrow(input.strides()[d])?;
        }
        Ok(meta)
    }

    pub fn with_matrix(mut self, m: glam::Mat3) -> Self {
        for r in 0..3 {
            let row = m.row(r);
            self.tf[r] = [row.x, row.y, row.z, 0.0];
        }
        self
    }

    /// The layout the kernel reads its input through.
    pub fn input_layout(&self) -> Layout {
        let mut dims = [0usize; MAX_DIMS];
        let mut strides = [0isize; MAX_DIMS];
        for d in 0..MAX_DIMS {
            dims[d] = self.in_dims[d] as usize;
            strides[d] = self.in_strides[d] as isize;
        }
        Layout::new(Dim4::new(dims), Strides::new(strides), self.in_offset as usize)
    }

    pub fn out_elements(&self) -> usize {
        self.out_dims.iter().map(|&d| d as usize).product()
    }

    /// Buffer index of input element `(x, y, plane2, plane3)`.
    pub fn in_index(&self, x: usize, y: usize, p2: usize, p3: usize) -> usize {
        let s = &self.in_strides;
        (self.in_offset as isize
            + x as isize * s[0] as isize
            + y as isize * s[1] as isize
            + p2 as isize * s[2] as isize
            + p3 as isize * s[3] as isize) as usize
    }

    pub fn out_index(&self, x: usize, y: usize, p2: usize, p3: usize) -> usize {
        let s = &self.out_strides;
        (x as isize * s[0] as isize
            + y as isize * s[1] as isize
            + p2 as isize * s[2] as isize
            + p3 as isize * s[3] as isize) as usize
    }

    /// Source coordinate of output pixel `(x, y)` under `tf`, with perspective divide.
    pub fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let row = |r: usize| self.tf[r][0] * x + self.tf[r][1] * y + self.tf[r][2];
        let w = row(2);
        (row(0) / w, row(1) / w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dim4, Seq};

    #[test]
    fn test_abi_size() {
        assert_eq!(std::mem::size_of::<GeometryMeta>(), 128);
    }

    #[test]
    fn test_strided_input() {
        let base = Layout::contiguous(dim4!(4, 4));
        let sel = [Seq::new(1, 2, 1), Seq::new(1, 2, 1), Seq::span(), Seq::span()];
        let view = base.apply(&sel).unwrap();
        let meta = GeometryMeta::new(dim4!(3, 3), &view).unwrap();
        assert_eq!(meta.in_offset, 5);
        assert_eq!(meta.in_strides, [1, 4, 16, 16]);
        assert_eq!(meta.in_index(1, 1, 0, 0), 10);
        assert_eq!(meta.out_index(1, 1, 0, 0), 4);
        assert_eq!(meta.out_elements(), 9);
        assert_eq!(meta.input_layout(), view);
    }

    #[test]
    fn test_oversized_layout_rejected() {
        let huge = Layout::new(dim4!(2, 2), Strides::from(&dim4!(2, 2)), u32::MAX as usize + 1);
        assert!(matches!(
            GeometryMeta::new(dim4!(2, 2), &huge),
            Err(ArrayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_projection() {
        let m = glam::Mat3::from_cols_array_2d(&[[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 3.0, 1.0]]);
        let meta = GeometryMeta::new(dim4!(2, 2), &Layout::contiguous(dim4!(2, 2)))
            .unwrap()
            .with_matrix(m);
        assert_eq!(meta.project(1.0, 1.0), (3.0, 4.0));
    }
}
