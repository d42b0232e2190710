//! Decoded calibration blocks

/// Tag of the crosstalk shape block
pub const TAG_SHAPE_BINS: u16 = 0xa128;

/// Tag of the per-zone crosstalk signal block
pub const TAG_SIGNAL_GRID: u16 = 0x9ffc;

/// Bins in a shape block
pub const SHAPE_BIN_COUNT: usize = 144;

/// Fixed-point divisor applied to signal grid entries
pub const SIGNAL_GRID_SCALE: u32 = 2048;

/// One recognised block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationBlock {
    /// Crosstalk histogram shape
    ShapeBins {
        /// Byte offset of the tag word
        offset: usize,
        bins: [u16; SHAPE_BIN_COUNT],
    },
    /// Crosstalk signal per zone (kcps)
    SignalGrid {
        /// Byte offset of the tag word
        offset: usize,
        kcps: Vec<u32>,
    },
}

impl CalibrationBlock {
    /// Byte offset of the tag word in the blob
    pub fn offset(&self) -> usize {
        match self {
            Self::ShapeBins { offset, .. } | Self::SignalGrid { offset, .. } => *offset,
        }
    }

    /// Tag that introduced this block
    pub fn tag(&self) -> u16 {
        match self {
            Self::ShapeBins { .. } => TAG_SHAPE_BINS,
            Self::SignalGrid { .. } => TAG_SIGNAL_GRID,
        }
    }
}

/// First occurrence of each block kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedCalibration {
    shape_bins: Option<[u16; SHAPE_BIN_COUNT]>,
    signal_grid: Option<Vec<u32>>,
}

impl DecodedCalibration {
    /// Keep the first block of each kind, later repeats are ignored
    pub fn from_blocks(blocks: impl IntoIterator<Item = CalibrationBlock>) -> Self {
        let mut decoded = Self::default();
        for block in blocks {
            match block {
                CalibrationBlock::ShapeBins { bins, .. } => {
                    decoded.shape_bins.get_or_insert(bins);
                }
                CalibrationBlock::SignalGrid { kcps, .. } => {
                    decoded.signal_grid.get_or_insert(kcps);
                }
            }
        }
        decoded
    }

    pub fn shape_bins(&self) -> Option<&[u16; SHAPE_BIN_COUNT]> {
        self.shape_bins.as_ref()
    }

    pub fn signal_grid(&self) -> Option<&[u32]> {
        self.signal_grid.as_deref()
    }

    /// Nothing recognised
    pub fn is_empty(&self) -> bool {
        self.shape_bins.is_none() && self.signal_grid.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_block_of_each_kind_wins() {
        let blocks = vec![
            CalibrationBlock::SignalGrid {
                offset: 8,
                kcps: vec![1, 2],
            },
            CalibrationBlock::ShapeBins {
                offset: 40,
                bins: [3; SHAPE_BIN_COUNT],
            },
            CalibrationBlock::SignalGrid {
                offset: 400,
                kcps: vec![9, 9],
            },
        ];

        let decoded = DecodedCalibration::from_blocks(blocks);
        assert_eq!(decoded.signal_grid(), Some(&[1u32, 2][..]));
        assert_eq!(decoded.shape_bins().map(|b| b[0]), Some(3));
        assert!(!decoded.is_empty());
    }

    #[test]
    fn test_no_blocks_is_empty() {
        let decoded = DecodedCalibration::from_blocks(Vec::new());
        assert!(decoded.is_empty());
        assert!(decoded.shape_bins().is_none());
    }
}
