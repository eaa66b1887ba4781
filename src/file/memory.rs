use super::Backend;
use crate::Result;

/// Sample data held in an owned buffer.
///
/// Used for uploads that already live in memory, nested archive payloads and
/// test fixtures. Bounds discipline is identical to the mapped backend, so
/// analysis code never cares which one is underneath.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a backend that takes ownership of `data`.
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        if offset_end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn slices_are_bounds_checked() {
        let mut data = b"MZ\x90\x00 loader image with trailing archive".to_vec();
        data.extend_from_slice(&[0u8; 64]);
        let total = data.len();
        let memory = Memory::new(data);

        assert_eq!(memory.len(), total);
        assert_eq!(memory.data_slice(0, 2).unwrap(), b"MZ");
        assert_eq!(memory.data_slice(total - 4, 4).unwrap(), &[0u8; 4]);

        assert!(memory.data_slice(0, total + 1).is_err());
        assert!(memory.data_slice(total, 1).is_err());
        // Zero-length reads at the end boundary are fine
        let empty: &[u8] = &[];
        assert_eq!(memory.data_slice(total, 0).unwrap(), empty);
    }

    #[test]
    fn empty_buffer() {
        let memory = Memory::new(Vec::new());

        assert_eq!(memory.len(), 0);
        assert!(memory.is_empty());
        assert!(memory.data_slice(0, 1).is_err());
        assert!(memory.data_slice(1, 0).is_err());
        let empty: &[u8] = &[];
        assert_eq!(memory.data_slice(0, 0).unwrap(), empty);
    }

    #[test]
    fn offset_overflow_is_out_of_bounds() {
        let memory = Memory::new(vec![0u8; 100]);

        let result = memory.data_slice(usize::MAX, 2);
        assert!(matches!(result.unwrap_err(), Error::OutOfBounds { .. }));

        let result = memory.data_slice(99, 2);
        assert!(matches!(result.unwrap_err(), Error::OutOfBounds { .. }));
    }

    #[test]
    fn full_read_matches_input() {
        let data: Vec<u8> = (0..=255).collect();
        let memory = Memory::new(data.clone());

        assert_eq!(memory.data(), data.as_slice());
        assert_eq!(memory.data_slice(0, memory.len()).unwrap(), data.as_slice());
        assert_eq!(memory.data_slice(128, 1).unwrap(), &[128]);
    }
}
