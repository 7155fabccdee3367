use rustc_hash::FxHashMap;

use crate::{DType, Interpolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum KernelKind {
    Resize,
    Transform,
}

/// Identifies one kernel specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_new::new)]
pub struct KernelKey {
    pub kind: KernelKind,
    pub dt: DType,
    pub interp: Interpolation,
}

impl std::fmt::Display for KernelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.kind, self.dt, self.interp)
    }
}

/// Kernels of one kind, keyed by element type and interpolation mode.
///
/// A missing entry is the only way a backend declares a combination unsupported.
#[derive(Debug)]
pub struct KernelTable<K> {
    kind: KernelKind,
    entries: FxHashMap<(DType, Interpolation), K>,
}

impl<K> KernelTable<K> {
    pub fn new(kind: KernelKind) -> Self {
        Self {
            kind,
            entries: FxHashMap::default(),
        }
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn register(&mut self, dt: DType, interp: Interpolation, kernel: K) -> &mut Self {
        if self.entries.insert((dt, interp), kernel).is_some() {
            log::warn!("Replacing {} kernel for ({}, {})", self.kind, dt, interp);
        }
        self
    }

    pub fn get(&self, dt: DType, interp: Interpolation) -> Option<&K> {
        self.entries.get(&(dt, interp))
    }

    pub fn lookup(&self, key: &KernelKey) -> Option<&K> {
        debug_assert_eq!(key.kind, self.kind);
        self.get(key.dt, key.interp)
    }

    /// Registered combinations, in a stable order.
    pub fn supported(&self) -> Vec<(DType, Interpolation)> {
        let mut keys: Vec<_> = self.entries.keys().copied().collect();
        keys.sort_by_key(|(dt, interp)| (dt.to_string(), interp.to_string()));
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut table = KernelTable::new(KernelKind::Resize);
        table
            .register(DType::F32, Interpolation::Nearest, 1)
            .register(DType::U8, Interpolation::Bilinear, 2);
        let key = KernelKey::new(KernelKind::Resize, DType::U8, Interpolation::Bilinear);
        assert_eq!(table.lookup(&key), Some(&2));
        assert_eq!(table.get(DType::U8, Interpolation::Nearest), None);
        assert_eq!(table.supported().len(), 2);
        assert_eq!(key.to_string(), "Resize_u8_bilinear");
    }
}
