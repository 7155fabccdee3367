use half::f16;
use num_complex::{Complex, Complex32, Complex64};

/// Element type tag carried by every buffer.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Default,
    Hash,
    strum_macros::EnumIter,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DType {
    F16,
    #[default]
    F32,
    F64,
    C32,
    C64,
    I32,
    U32,
    U8,
    I8,
}

impl DType {
    /// Returns the size of the type in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::F16 => 2,
            DType::F32 => 4,
            DType::F64 => 8,
            DType::C32 => 8,
            DType::C64 => 16,
            DType::I32 => 4,
            DType::U32 => 4,
            DType::U8 => 1,
            DType::I8 => 1,
        }
    }

    /// Real or complex floating point.
    pub fn is_floating(self) -> bool {
        self.is_real_floating() || self.is_complex()
    }

    pub fn is_real_floating(self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, DType::I32 | DType::U32 | DType::U8 | DType::I8)
    }

    pub fn is_single(self) -> bool {
        matches!(self, DType::F32 | DType::C32)
    }

    pub fn is_double(self) -> bool {
        matches!(self, DType::F64 | DType::C64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DType::C32 | DType::C64)
    }

    pub fn is_real(self) -> bool {
        !self.is_complex()
    }
}

/// Rust element types that can live in an [`crate::Array`].
///
/// Real conversions go through `f64`, which is exact for every registered real type.
/// Narrowing follows `as` semantics: truncation toward zero, saturation at the bounds.
/// The real value of a complex element is its magnitude.
pub trait ArrayDType:
    Copy + std::fmt::Debug + PartialEq + 'static + num_traits::Zero + Send + Sync + bytemuck::Pod
{
    fn dt() -> DType;

    fn to_f64(self) -> f64;

    fn from_f64(v: f64) -> Self;

    fn to_c64(self) -> Complex64 {
        Complex64::new(self.to_f64(), 0.0)
    }

    fn from_c64(v: Complex64) -> Self {
        Self::from_f64(v.re)
    }
}

macro_rules! map_type {
    ($t:ty, $v:ident) => {
        impl ArrayDType for $t {
            fn dt() -> DType {
                DType::$v
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(v: f64) -> Self {
                v as Self
            }
        }
    };
}

map_type!(f32, F32);
map_type!(f64, F64);
map_type!(i32, I32);
map_type!(u32, U32);
map_type!(u8, U8);
map_type!(i8, I8);

impl ArrayDType for f16 {
    fn dt() -> DType {
        DType::F16
    }

    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
}

macro_rules! map_complex {
    ($t:ty, $v:ident) => {
        impl ArrayDType for Complex<$t> {
            fn dt() -> DType {
                DType::$v
            }

            fn to_f64(self) -> f64 {
                self.norm() as f64
            }

            fn from_f64(v: f64) -> Self {
                Complex::new(v as $t, 0.0)
            }

            fn to_c64(self) -> Complex64 {
                Complex64::new(self.re as f64, self.im as f64)
            }

            fn from_c64(v: Complex64) -> Self {
                Complex::new(v.re as $t, v.im as $t)
            }
        }
    };
}

map_complex!(f32, C32);
map_complex!(f64, C64);

/// Converts one element. Complex targets keep both parts, real targets take the real value.
pub fn convert_element<S: ArrayDType, D: ArrayDType>(v: S) -> D {
    if D::dt().is_complex() {
        D::from_c64(v.to_c64())
    } else {
        D::from_f64(v.to_f64())
    }
}
