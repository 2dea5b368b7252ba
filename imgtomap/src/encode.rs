//! Run-length encoding of quantized pixel rows.

use itertools::Itertools;

use crate::quantize::QuantizedCanvas;

/// One pixel row as runs of identical tile indices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedRow {
    /// Tile index of each run, left to right
    pub values: Vec<u8>,
    /// Length of each run, parallel to `values`
    pub run_lengths: Vec<u32>,
}

impl EncodedRow {
    /// Encode a row of tile indices into maximal runs.
    pub fn encode(row: &[u8]) -> Self {
        let (run_lengths, values): (Vec<u32>, Vec<u8>) = row
            .iter()
            .copied()
            .dedup_with_count()
            .map(|(count, value)| (count as u32, value))
            .unzip();

        EncodedRow {
            values,
            run_lengths,
        }
    }

    /// Number of pixels the row covers
    pub fn pixel_count(&self) -> u64 {
        self.run_lengths.iter().map(|&n| u64::from(n)).sum()
    }

    /// Expand the runs back into tile indices.
    pub fn decode(&self) -> Vec<u8> {
        self.values
            .iter()
            .zip(self.run_lengths.iter())
            .flat_map(|(&value, &count)| std::iter::repeat(value).take(count as usize))
            .collect()
    }
}

/// Encode every row of the canvas, bottom row first.
///
/// WorldBox counts rows upwards from the bottom edge of the map, so the
/// canvas is flipped before encoding. Runs never continue across rows.
pub fn encode_rows(canvas: &QuantizedCanvas) -> Vec<EncodedRow> {
    canvas.rows().rev().map(EncodedRow::encode).collect()
}
