//! Calibration blob and tag scanner

use contracts::{ContractError, Resolution};
use tracing::{debug, warn};
use transport::swap_buffer;

use crate::block::{
    CalibrationBlock, SHAPE_BIN_COUNT, SIGNAL_GRID_SCALE, TAG_SHAPE_BINS, TAG_SIGNAL_GRID,
};

/// Size of the crosstalk blob the device hands out
pub const XTALK_BUFFER_SIZE: usize = 776;

const WORD: usize = 4;

/// Raw calibration blob in wire layout (big-endian 4-byte groups)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationBuffer {
    bytes: Vec<u8>,
}

impl CalibrationBuffer {
    /// Wrap a blob, rejecting lengths that are not a multiple of 4
    pub fn new(bytes: Vec<u8>) -> Result<Self, ContractError> {
        if bytes.len() % WORD != 0 {
            return Err(ContractError::calibration(format!(
                "length {} is not a multiple of {WORD}",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// Wire bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Scan the blob for known blocks.
    ///
    /// Works on a host-order copy; the buffer itself is left untouched. Every
    /// 4-byte offset is examined, including offsets inside a block that was
    /// already decoded. A known tag whose payload would run past the end of
    /// the blob is skipped.
    pub fn decode(&self, resolution: Resolution) -> Vec<CalibrationBlock> {
        let mut host = self.bytes.clone();
        swap_buffer(&mut host);

        let words: Vec<u32> = host
            .chunks_exact(WORD)
            .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        let zone_count = resolution.zone_count();
        let mut blocks = Vec::new();

        for (index, word) in words.iter().enumerate() {
            let offset = index * WORD;
            let payload = &words[index + 1..];

            match (word >> 16) as u16 {
                TAG_SHAPE_BINS => {
                    // two bins per word, low half first
                    let needed = SHAPE_BIN_COUNT / 2;
                    if payload.len() < needed {
                        warn!(offset, tag = "0xa128", "truncated shape block skipped");
                        continue;
                    }
                    let mut bins = [0u16; SHAPE_BIN_COUNT];
                    for (pair, word) in bins.chunks_exact_mut(2).zip(&payload[..needed]) {
                        pair[0] = (*word & 0xffff) as u16;
                        pair[1] = (*word >> 16) as u16;
                    }
                    debug!(offset, "shape block decoded");
                    blocks.push(CalibrationBlock::ShapeBins { offset, bins });
                }
                TAG_SIGNAL_GRID => {
                    if payload.len() < zone_count {
                        warn!(offset, tag = "0x9ffc", zone_count, "truncated signal grid skipped");
                        continue;
                    }
                    let kcps = payload[..zone_count]
                        .iter()
                        .map(|raw| raw / SIGNAL_GRID_SCALE)
                        .collect();
                    debug!(offset, zone_count, "signal grid decoded");
                    blocks.push(CalibrationBlock::SignalGrid { offset, kcps });
                }
                _ => {}
            }
        }

        blocks
    }
}

impl TryFrom<Vec<u8>> for CalibrationBuffer {
    type Error = ContractError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecodedCalibration;
    use rand::Rng;

    /// Blob builder writing host-order words in wire layout
    struct Blob(Vec<u8>);

    impl Blob {
        fn zeroed(len: usize) -> Self {
            Self(vec![0; len])
        }

        fn word(&mut self, offset: usize, value: u32) -> &mut Self {
            self.0[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
            self
        }

        fn tag(&mut self, offset: usize, tag: u16) -> &mut Self {
            self.word(offset, u32::from(tag) << 16)
        }

        fn buffer(&self) -> CalibrationBuffer {
            CalibrationBuffer::new(self.0.clone()).unwrap()
        }
    }

    #[test]
    fn test_rejects_unaligned_length() {
        assert!(CalibrationBuffer::new(vec![0; 6]).is_err());
        assert!(CalibrationBuffer::new(vec![0; XTALK_BUFFER_SIZE]).is_ok());
    }

    #[test]
    fn test_no_tag_decodes_to_nothing() {
        let buffer = Blob::zeroed(XTALK_BUFFER_SIZE).buffer();
        assert!(buffer.decode(Resolution::R8x8).is_empty());

        let empty = CalibrationBuffer::new(Vec::new()).unwrap();
        assert!(empty.decode(Resolution::R4x4).is_empty());
    }

    #[test]
    fn test_signal_grid_decoded_and_scaled() {
        let mut blob = Blob::zeroed(XTALK_BUFFER_SIZE);
        blob.tag(100, TAG_SIGNAL_GRID);
        for zone in 0..64u32 {
            blob.word(104 + zone as usize * 4, (zone + 1) * 2048 + 7);
        }

        let blocks = blob.buffer().decode(Resolution::R8x8);
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            CalibrationBlock::SignalGrid { offset, kcps } => {
                assert_eq!(*offset, 100);
                assert_eq!(kcps.len(), 64);
                assert_eq!(kcps[0], 1);
                assert_eq!(kcps[63], 64);
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn test_signal_grid_follows_resolution() {
        let mut blob = Blob::zeroed(XTALK_BUFFER_SIZE);
        blob.tag(0, TAG_SIGNAL_GRID);
        let decoded = DecodedCalibration::from_blocks(blob.buffer().decode(Resolution::R4x4));
        assert_eq!(decoded.signal_grid().map(<[u32]>::len), Some(16));
    }

    #[test]
    fn test_shape_bins_decoded_in_order() {
        let mut blob = Blob::zeroed(XTALK_BUFFER_SIZE);
        blob.tag(8, TAG_SHAPE_BINS);
        for pair in 0..(SHAPE_BIN_COUNT as u32 / 2) {
            let low = pair * 2;
            let high = pair * 2 + 1;
            blob.word(12 + pair as usize * 4, low | (high << 16));
        }

        let decoded = DecodedCalibration::from_blocks(blob.buffer().decode(Resolution::R8x8));
        let bins = decoded.shape_bins().unwrap();
        let expected: Vec<u16> = (0..SHAPE_BIN_COUNT as u16).collect();
        assert_eq!(bins.as_slice(), expected.as_slice());
        assert!(decoded.signal_grid().is_none());
    }

    #[test]
    fn test_unrelated_bytes_do_not_disturb_payload() {
        let mut rng = rand::rng();
        let mut blob = Blob::zeroed(XTALK_BUFFER_SIZE);
        for offset in (0..XTALK_BUFFER_SIZE).step_by(4) {
            // random words whose tag half never matches a known tag
            let mut value: u32 = rng.random();
            while matches!((value >> 16) as u16, TAG_SHAPE_BINS | TAG_SIGNAL_GRID) {
                value = rng.random();
            }
            blob.word(offset, value);
        }
        blob.tag(400, TAG_SIGNAL_GRID);
        for zone in 0..16u32 {
            blob.word(404 + zone as usize * 4, 4096 * (zone + 1));
        }

        let blocks = blob.buffer().decode(Resolution::R4x4);
        let grid = blocks
            .iter()
            .find_map(|block| match block {
                CalibrationBlock::SignalGrid { offset: 400, kcps } => Some(kcps.clone()),
                _ => None,
            })
            .unwrap();
        let expected: Vec<u32> = (1..=16).map(|z| z * 2).collect();
        assert_eq!(grid, expected);
    }

    #[test]
    fn test_scan_does_not_skip_over_payload() {
        let mut blob = Blob::zeroed(XTALK_BUFFER_SIZE);
        blob.tag(0, TAG_SIGNAL_GRID);
        // tag word sitting inside the first block's payload
        blob.tag(8, TAG_SIGNAL_GRID);

        let offsets: Vec<usize> = blob
            .buffer()
            .decode(Resolution::R4x4)
            .iter()
            .map(CalibrationBlock::offset)
            .collect();
        assert_eq!(offsets, vec![0, 8]);
    }

    #[test]
    fn test_truncated_block_is_skipped() {
        let mut blob = Blob::zeroed(64);
        blob.tag(0, TAG_SHAPE_BINS);
        blob.tag(32, TAG_SIGNAL_GRID);
        assert!(blob.buffer().decode(Resolution::R8x8).is_empty());
    }

    #[test]
    fn test_decode_leaves_buffer_untouched() {
        let mut blob = Blob::zeroed(XTALK_BUFFER_SIZE);
        blob.tag(0, TAG_SIGNAL_GRID).word(4, 0x0102_0304);
        let buffer = blob.buffer();
        let before = buffer.as_bytes().to_vec();

        let first = buffer.decode(Resolution::R8x8);
        let second = buffer.decode(Resolution::R8x8);
        assert_eq!(buffer.as_bytes(), before.as_slice());
        assert_eq!(first, second);
    }
}
