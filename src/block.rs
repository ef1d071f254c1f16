// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Decoding of one 8x8 coefficient block: DC delta, AC run-length symbols,
//! dequantization and the inverse transform.

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use crate::huffman::{VlcEntry, read_code};
use crate::idct::{col_idct, row_idct};
use crate::{BLOCK_DIM, BLOCK_SIZE};

/// Maps zigzag scan positions to natural (row-major) block positions.
pub(crate) const ZIGZAG: [usize; BLOCK_SIZE] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Decodes the next block of a scan into `out` at `offset` with `stride`.
///
/// The DC coefficient is a Huffman-coded magnitude category plus sign-
/// extended value bits, added to the component's running predictor. AC
/// symbols pack (zero-run, category) in their nibbles; 0x00 ends the block
/// and 0xF0 skips 16 zero positions. Coefficients are dequantized with the
/// component's table (natural order, indexed through the zigzag map) and the
/// block is then inverse-transformed straight into the component plane.
#[allow(clippy::too_many_arguments)]
pub(crate) fn decode_block(
    reader: &mut BitReader,
    dc_table: &[VlcEntry],
    ac_table: &[VlcEntry],
    quant: &[u8; BLOCK_SIZE],
    dc_pred: &mut i32,
    out: &mut [u8],
    offset: usize,
    stride: usize,
) -> Result<()> {
    let mut block = [0i32; BLOCK_SIZE];

    let (_, dc_diff) = read_code(reader, dc_table)?;
    // A corrupt stream can walk the predictor arbitrarily far; wrap rather
    // than overflow, the transform below wraps the same way.
    *dc_pred = dc_pred.wrapping_add(dc_diff);
    block[0] = dc_pred.wrapping_mul(quant[0] as i32);

    let mut coef = 0usize;
    loop {
        let (symbol, value) = read_code(reader, ac_table)?;
        if symbol == 0 {
            break; // end of block
        }
        if symbol & 0x0F == 0 && symbol != 0xF0 {
            return Err(Error::SyntaxError("invalid AC run-length symbol"));
        }
        coef += (symbol >> 4) as usize + 1;
        if coef > 63 {
            return Err(Error::SyntaxError("too many coefficients in block"));
        }
        let pos = ZIGZAG[coef];
        block[pos] = value * quant[pos] as i32;
        if coef >= 63 {
            break;
        }
    }

    for row in block.chunks_exact_mut(BLOCK_DIM) {
        row_idct(row);
    }
    for col in 0..BLOCK_DIM {
        col_idct(&block, col, out, offset + col, stride);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::huffman::{TABLE_SIZE, build_vlc_table};
    use test_log::test;

    fn dc_cat2_table() -> Vec<VlcEntry> {
        // '0' -> category 0 (no change), '1' -> category 2.
        let mut counts = [0u8; 16];
        counts[0] = 2;
        let mut table = vec![VlcEntry::default(); TABLE_SIZE];
        build_vlc_table(&counts, &[0x00, 0x02], &mut table).unwrap();
        table
    }

    fn eob_only_table() -> Vec<VlcEntry> {
        let mut counts = [0u8; 16];
        counts[0] = 1;
        let mut table = vec![VlcEntry::default(); TABLE_SIZE];
        build_vlc_table(&counts, &[0x00], &mut table).unwrap();
        table
    }

    #[test]
    fn dc_only_block_fills_plane() -> Result<()> {
        let dc = dc_cat2_table();
        let ac = eob_only_table();
        let quant = [2u8; BLOCK_SIZE];
        // DC: code '1' + bits '10' (= +2), AC: EOB '0'.
        let mut reader = BitReader::new(&[0b1100_0000]);
        let mut out = [0u8; BLOCK_SIZE];
        let mut dc_pred = 0;
        decode_block(&mut reader, &dc, &ac, &quant, &mut dc_pred, &mut out, 0, 8)?;
        assert_eq!(dc_pred, 2);
        // Dequantized DC 4 becomes a flat 129 after the level shift.
        assert!(out.iter().all(|&v| v == 129), "{out:?}");
        Ok(())
    }

    #[test]
    fn predictor_carries_between_blocks() -> Result<()> {
        let dc = dc_cat2_table();
        let ac = eob_only_table();
        let quant = [1u8; BLOCK_SIZE];
        // Two blocks: diff +2 then diff 0.
        let mut reader = BitReader::new(&[0b1100_0000]);
        let mut out = [0u8; 2 * BLOCK_SIZE];
        let mut dc_pred = 0;
        decode_block(&mut reader, &dc, &ac, &quant, &mut dc_pred, &mut out, 0, 16)?;
        decode_block(&mut reader, &dc, &ac, &quant, &mut dc_pred, &mut out, 8, 16)?;
        assert_eq!(dc_pred, 2);
        assert_eq!(out[0], out[8]);
        Ok(())
    }

    #[test]
    fn saturated_predictor_wraps_instead_of_overflowing() -> Result<()> {
        let dc = dc_cat2_table();
        let ac = eob_only_table();
        let quant = [1u8; BLOCK_SIZE];
        // Diff +2 on a predictor at the top of the i32 range.
        let mut reader = BitReader::new(&[0b1100_0000]);
        let mut out = [0u8; BLOCK_SIZE];
        let mut dc_pred = i32::MAX - 1;
        decode_block(&mut reader, &dc, &ac, &quant, &mut dc_pred, &mut out, 0, 8)?;
        assert_eq!(dc_pred, i32::MIN);
        Ok(())
    }

    #[test]
    fn coefficient_overflow_rejected() {
        // AC table where '0' decodes to ZRL (0xF0): five of them run past
        // position 63.
        let mut counts = [0u8; 16];
        counts[0] = 1;
        let mut ac = vec![VlcEntry::default(); TABLE_SIZE];
        build_vlc_table(&counts, &[0xF0], &mut ac).unwrap();
        let dc = dc_cat2_table();
        let quant = [1u8; BLOCK_SIZE];
        // DC '0' (diff 0) then endless ZRL symbols.
        let mut reader = BitReader::new(&[0x00, 0x00]);
        let mut out = [0u8; BLOCK_SIZE];
        let mut dc_pred = 0;
        let r = decode_block(&mut reader, &dc, &ac, &quant, &mut dc_pred, &mut out, 0, 8);
        assert!(matches!(r, Err(Error::SyntaxError(_))));
    }
}
