use crate::{ArrayDType, GeometryMeta};

/// A single `(dim0, dim1)` plane of a kernel input.
pub struct Plane<'a, T> {
    data: &'a [T],
    meta: &'a GeometryMeta,
    p2: usize,
    p3: usize,
}

impl<'a, T: ArrayDType> Plane<'a, T> {
    pub fn new(data: &'a [T], meta: &'a GeometryMeta, p2: usize, p3: usize) -> Self {
        Self { data, meta, p2, p3 }
    }

    pub fn width(&self) -> usize {
        self.meta.in_dims[0] as usize
    }

    pub fn height(&self) -> usize {
        self.meta.in_dims[1] as usize
    }

    fn at(&self, x: usize, y: usize) -> f64 {
        self.data[self.meta.in_index(x, y, self.p2, self.p3)].to_f64()
    }
}

/// Rounds half up, so the CPU and GPU kernels agree on ties.
pub fn nearest_index(coord: f32, extent: usize) -> usize {
    let i = (coord + 0.5).floor().max(0.0) as usize;
    i.min(extent - 1)
}

/// The two neighbouring indices of `coord` and their weights, clamped to `[0, extent - 1]`.
pub fn bilinear_taps(coord: f32, extent: usize) -> [(usize, f32); 2] {
    let c = coord.clamp(0.0, (extent - 1) as f32);
    let lo = c.floor();
    let w = c - lo;
    let i0 = lo as usize;
    let i1 = (i0 + 1).min(extent - 1);
    [(i0, 1.0 - w), (i1, w)]
}

fn inside(coord: f32, extent: usize) -> bool {
    coord >= 0.0 && coord <= (extent - 1) as f32
}

pub trait Sampler {
    /// Samples at `(x, y)`, clamping to the plane's edge.
    fn clamped<T: ArrayDType>(plane: &Plane<T>, x: f32, y: f32) -> f64;

    /// Samples at `(x, y)`, yielding zero outside the plane.
    fn bounded<T: ArrayDType>(plane: &Plane<T>, x: f32, y: f32) -> f64;
}

pub struct Nearest;

impl Sampler for Nearest {
    fn clamped<T: ArrayDType>(plane: &Plane<T>, x: f32, y: f32) -> f64 {
        plane.at(
            nearest_index(x, plane.width()),
            nearest_index(y, plane.height()),
        )
    }

    fn bounded<T: ArrayDType>(plane: &Plane<T>, x: f32, y: f32) -> f64 {
        let (xi, yi) = ((x + 0.5).floor(), (y + 0.5).floor());
        if !inside(xi, plane.width()) || !inside(yi, plane.height()) {
            return 0.0;
        }
        plane.at(xi as usize, yi as usize)
    }
}

pub struct Bilinear;

impl Sampler for Bilinear {
    fn clamped<T: ArrayDType>(plane: &Plane<T>, x: f32, y: f32) -> f64 {
        let xs = bilinear_taps(x, plane.width());
        let ys = bilinear_taps(y, plane.height());
        let mut acc = 0.0;
        for (yi, wy) in ys {
            for (xi, wx) in xs {
                acc += (wx * wy) as f64 * plane.at(xi, yi);
            }
        }
        acc
    }

    fn bounded<T: ArrayDType>(plane: &Plane<T>, x: f32, y: f32) -> f64 {
        if !inside(x, plane.width()) || !inside(y, plane.height()) {
            return 0.0;
        }
        Self::clamped(plane, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest(cases = 256)]
    fn test_bilinear_taps_bounded(#[strategy(-4.0f32..40.0)] coord: f32, #[strategy(1usize..32)] extent: usize) {
        let taps = bilinear_taps(coord, extent);
        let total: f32 = taps.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-6);
        for (i, w) in taps {
            assert!(i < extent);
            assert!((0.0..=1.0).contains(&w));
        }
    }

    #[test]
    fn test_nearest_rounds_half_up() {
        assert_eq!(nearest_index(0.5, 4), 1);
        assert_eq!(nearest_index(1.5, 4), 2);
        assert_eq!(nearest_index(2.49, 4), 2);
        assert_eq!(nearest_index(-3.0, 4), 0);
        assert_eq!(nearest_index(9.0, 4), 3);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let meta = GeometryMeta::new(
            crate::dim4!(1, 1),
            &crate::Layout::contiguous(crate::dim4!(2, 2)),
        )
        .unwrap();
        let data = [0.0f32, 10.0, 20.0, 30.0];
        let plane = Plane::new(&data, &meta, 0, 0);
        assert_eq!(Bilinear::clamped(&plane, 0.5, 0.5), 15.0);
        assert_eq!(Bilinear::bounded(&plane, 1.5, 0.0), 0.0);
        assert_eq!(Nearest::bounded(&plane, -0.6, 0.0), 0.0);
        assert_eq!(Nearest::bounded(&plane, 0.6, 1.0), 30.0);
    }
}
