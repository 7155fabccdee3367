use bytemuck::{NoUninit, Pod};

use crate::{ArrayDType, DType, DeviceError};

/// Host allocation backed by 8-byte words, so any element type can be viewed in place.
#[derive(Clone, PartialEq, Eq)]
pub struct RawCPUBuffer {
    words: Vec<u64>,
    n_bytes: usize,
}

impl RawCPUBuffer {
    pub fn zeroed(n_bytes: usize) -> Result<Self, DeviceError> {
        let n_words = n_bytes.div_ceil(std::mem::size_of::<u64>());
        let mut words = Vec::new();
        words
            .try_reserve_exact(n_words)
            .map_err(|_| DeviceError::AllocationFailed(n_bytes))?;
        words.resize(n_words, 0);
        Ok(Self { words, n_bytes })
    }

    pub fn n_bytes(&self) -> usize {
        self.n_bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.n_bytes]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.n_bytes]
    }
}

impl std::fmt::Debug for RawCPUBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawCPUBuffer({} bytes)", self.n_bytes)
    }
}

/// Managed CPU buffer
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct CPUBuffer {
    inner: RawCPUBuffer,
}

impl CPUBuffer {
    pub fn zeros(n_bytes: usize) -> Result<Self, DeviceError> {
        Ok(Self::new(RawCPUBuffer::zeroed(n_bytes)?))
    }

    pub fn from_slice<T: NoUninit>(data: &[T]) -> Result<Self, DeviceError> {
        Self::from_bytes(bytemuck::cast_slice(data))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeviceError> {
        let mut raw = RawCPUBuffer::zeroed(bytes.len())?;
        raw.as_bytes_mut().copy_from_slice(bytes);
        Ok(Self::new(raw))
    }

    pub fn inner(&self) -> &RawCPUBuffer {
        &self.inner
    }

    pub fn n_bytes(&self) -> usize {
        self.inner.n_bytes()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.inner.as_bytes_mut()
    }

    pub fn to_slice<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(self.inner.as_bytes())
    }

    pub fn to_slice_mut<T: Pod>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.inner.as_bytes_mut())
    }

    pub fn dump(&self, dt: DType, full: bool) -> String {
        fn dump_inner<T: ArrayDType>(data: &[T], full: bool) -> String {
            let length = if data.len() < 64 { data.len() } else { 64 };
            if full || data.len() <= 64 {
                format!("{:?}", data)
            } else {
                format!("{:?}...{:?}", &data[..length], &data[data.len() - length..])
            }
        }
        match dt {
            DType::F16 => dump_inner(self.to_slice::<half::f16>(), full),
            DType::F32 => dump_inner(self.to_slice::<f32>(), full),
            DType::F64 => dump_inner(self.to_slice::<f64>(), full),
            DType::C32 => dump_inner(self.to_slice::<num_complex::Complex32>(), full),
            DType::C64 => dump_inner(self.to_slice::<num_complex::Complex64>(), full),
            DType::I32 => dump_inner(self.to_slice::<i32>(), full),
            DType::U32 => dump_inner(self.to_slice::<u32>(), full),
            DType::U8 => dump_inner(self.to_slice::<u8>(), full),
            DType::I8 => dump_inner(self.to_slice::<i8>(), full),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_sized_buffer() {
        let buf = CPUBuffer::from_slice(&[1u8, 2, 3]).unwrap();
        assert_eq!(buf.n_bytes(), 3);
        assert_eq!(buf.to_slice::<u8>(), &[1, 2, 3]);
    }

    #[test]
    fn test_aligned_view() {
        let mut buf = CPUBuffer::zeros(3 * 8).unwrap();
        buf.to_slice_mut::<f64>()[1] = 2.5;
        assert_eq!(buf.to_slice::<f64>(), &[0.0, 2.5, 0.0]);
        assert_eq!(buf.dump(DType::F64, true), "[0.0, 2.5, 0.0]");
    }
}
