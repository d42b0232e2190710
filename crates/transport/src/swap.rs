//! Byte-order conversion for 4-byte big-endian groups
//!
//! Calibration and result blobs travel in big-endian 4-byte groups whatever
//! the host byte order. Swapping twice restores the original buffer.

use crate::error::{Result, TransportError};

/// Convert every complete 4-byte group between big-endian and host order.
///
/// Trailing bytes that do not form a complete group are left untouched.
pub fn swap_buffer(buffer: &mut [u8]) {
    for group in buffer.chunks_exact_mut(4) {
        let word = u32::from_be_bytes([group[0], group[1], group[2], group[3]]);
        group.copy_from_slice(&word.to_ne_bytes());
    }
}

/// Like [`swap_buffer`], but rejects buffers whose length is not a multiple of 4
pub fn try_swap_buffer(buffer: &mut [u8]) -> Result<()> {
    if buffer.len() % 4 != 0 {
        return Err(TransportError::UnalignedBuffer { len: buffer.len() });
    }
    swap_buffer(buffer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn swap_produces_host_order_words() {
        let mut buffer = [0x12, 0x34, 0x56, 0x78, 0xa1, 0x28, 0x00, 0x10];
        swap_buffer(&mut buffer);

        assert_eq!(u32::from_ne_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]), 0x1234_5678);
        assert_eq!(u32::from_ne_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]), 0xa128_0010);
    }

    #[test]
    fn swap_twice_is_identity() {
        let mut rng = rand::rng();
        for len in [0usize, 4, 8, 64, 776] {
            let original: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            let mut buffer = original.clone();
            swap_buffer(&mut buffer);
            swap_buffer(&mut buffer);
            assert_eq!(buffer, original, "len {len}");
        }
    }

    #[test]
    fn unaligned_buffer_is_rejected() {
        let mut buffer = [0u8; 6];
        let err = try_swap_buffer(&mut buffer).unwrap_err();
        assert!(matches!(err, TransportError::UnalignedBuffer { len: 6 }));
        assert_eq!(err.status(), 255);
    }
}
