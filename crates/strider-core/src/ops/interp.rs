/// Sampling method used by the geometry kernels.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum_macros::EnumIter,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
    Bilinear,
    Cubic,
}

impl Interpolation {
    /// Whether the geometry kernels implement this method at all.
    pub fn is_geometry_method(self) -> bool {
        matches!(self, Interpolation::Nearest | Interpolation::Bilinear)
    }
}
