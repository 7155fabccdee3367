use glam::Mat3;

use crate::{
    dim4, Array, ArrayError, DType, Dim4, GeometryMeta, GeometryOp, Interpolation, KernelKind,
    OpGuards, StorageView,
};

use super::{check_geometry_method, check_kernel, check_operands};

/// Warps dims 0 and 1 by an affine (3x2) or perspective (3x3) matrix.
///
/// Matrices are row-major: the affine `[a b c; d e f]` maps `(x, y)` to
/// `(a*x + b*y + c, d*x + e*y + f)`. Unless `inverse` is set the matrix maps source
/// to destination and is inverted before dispatch. Samples outside the source are zero.
#[derive(Debug, Clone)]
pub struct Transform {
    input: StorageView,
    matrix: Array,
    out0: usize,
    out1: usize,
    interp: Interpolation,
    inverse: bool,
}

impl Transform {
    pub fn new(
        input: StorageView,
        matrix: Array,
        out0: usize,
        out1: usize,
        interp: Interpolation,
        inverse: bool,
    ) -> Self {
        Self {
            input,
            matrix,
            out0,
            out1,
            interp,
            inverse,
        }
    }

    /// The matrix mapping output pixels to source coordinates.
    fn sampling_matrix(&self) -> Result<Mat3, ArrayError> {
        let values = self.matrix.host::<f32>()?;
        let m = match values.as_slice() {
            &[a, b, c, d, e, f] => Mat3::from_cols_array(&[a, d, 0.0, b, e, 0.0, c, f, 1.0]),
            &[a, b, c, d, e, f, g, h, i] => Mat3::from_cols_array(&[a, d, g, b, e, h, c, f, i]),
            other => {
                return Err(ArrayError::InvalidArgument(format!(
                    "Transform matrix must have 6 or 9 elements, got {}",
                    other.len()
                )))
            }
        };
        if self.inverse {
            return Ok(m);
        }
        let det = m.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(ArrayError::InvalidArgument(format!(
                "Transform matrix {:?} is singular",
                values
            )));
        }
        Ok(m.inverse())
    }
}

impl OpGuards for Transform {
    fn check_arguments(&self) -> Result<(), ArrayError> {
        check_geometry_method(self.interp)?;
        let n = self.matrix.elements()?;
        if n != 6 && n != 9 {
            return Err(ArrayError::InvalidArgument(format!(
                "Transform matrix must have 6 or 9 elements, got {}",
                n
            )));
        }
        Ok(())
    }

    fn check_dtypes(&self) -> Result<(), ArrayError> {
        let dt = self.matrix.dt()?;
        if dt != DType::F32 {
            return Err(ArrayError::InvalidType(format!(
                "Transform matrix must be f32, got {}",
                dt
            )));
        }
        check_kernel(KernelKind::Transform, &self.input, self.interp)
    }

    fn check_shapes(&self) -> Result<(), ArrayError> {
        check_operands(&self.input.layout().dims(), &self.out_dims())
    }
}

impl GeometryOp for Transform {
    fn kind(&self) -> KernelKind {
        KernelKind::Transform
    }

    fn input(&self) -> &StorageView {
        &self.input
    }

    fn interp(&self) -> Interpolation {
        self.interp
    }

    fn out_dims(&self) -> Dim4 {
        let in_dims = self.input.layout().dims();
        dim4!(self.out0, self.out1, in_dims[2], in_dims[3])
    }

    fn meta(&self) -> Result<GeometryMeta, ArrayError> {
        let meta = GeometryMeta::new(self.out_dims(), self.input.layout())?;
        Ok(meta.with_matrix(self.sampling_matrix()?))
    }
}
