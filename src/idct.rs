// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Separable fixed-point inverse DCT.
//!
//! The row pass leaves the block scaled by 8 with 3 fractional bits; the
//! column pass finishes the transform and emits clipped 8-bit samples with a
//! +128 level shift. Constants are the usual 11-bit fixed-point cosine
//! approximations. Both passes short-circuit to a constant fill when all AC
//! inputs are zero, which is the common case for flat camera frames.
//!
//! All intermediate arithmetic wraps: coefficients from a corrupt stream can
//! exceed any range a real encoder produces, and wrapped values turn into
//! clipped garbage samples rather than an abort mid-scan.

use std::num::Wrapping;

use crate::BLOCK_DIM;
use crate::util::clip;

const W1: Wrapping<i32> = Wrapping(2841); // 2048 * sqrt(2) * cos(1 * pi / 16)
const W2: Wrapping<i32> = Wrapping(2676); // 2048 * sqrt(2) * cos(2 * pi / 16)
const W3: Wrapping<i32> = Wrapping(2408); // 2048 * sqrt(2) * cos(3 * pi / 16)
const W5: Wrapping<i32> = Wrapping(1609); // 2048 * sqrt(2) * cos(5 * pi / 16)
const W6: Wrapping<i32> = Wrapping(1108); // 2048 * sqrt(2) * cos(6 * pi / 16)
const W7: Wrapping<i32> = Wrapping(565); //  2048 * sqrt(2) * cos(7 * pi / 16)

/// In-place transform of one row of 8 coefficients.
pub(crate) fn row_idct(blk: &mut [i32]) {
    let x1 = Wrapping(blk[4]) << 11;
    let x2 = Wrapping(blk[6]);
    let x3 = Wrapping(blk[2]);
    let x4 = Wrapping(blk[1]);
    let x5 = Wrapping(blk[7]);
    let x6 = Wrapping(blk[5]);
    let x7 = Wrapping(blk[3]);
    if (x1 | x2 | x3 | x4 | x5 | x6 | x7).0 == 0 {
        blk.fill((Wrapping(blk[0]) << 3).0);
        return;
    }
    let mut x0 = (Wrapping(blk[0]) << 11) + Wrapping(128);
    let mut x8 = W7 * (x4 + x5);
    let x4 = x8 + (W1 - W7) * x4;
    let x5 = x8 - (W1 + W7) * x5;
    x8 = W3 * (x6 + x7);
    let x6 = x8 - (W3 - W5) * x6;
    let x7 = x8 - (W3 + W5) * x7;
    x8 = x0 + x1;
    x0 -= x1;
    let x1 = W6 * (x3 + x2);
    let x2 = x1 - (W2 + W6) * x2;
    let x3 = x1 + (W2 - W6) * x3;
    let x1 = x4 + x6;
    let x4 = x4 - x6;
    let x6 = x5 + x7;
    let x5 = x5 - x7;
    let x7 = x8 + x3;
    let x8 = x8 - x3;
    let x3 = x0 + x2;
    let x0 = x0 - x2;
    let x2 = (Wrapping(181) * (x4 + x5) + Wrapping(128)) >> 8;
    let x4 = (Wrapping(181) * (x4 - x5) + Wrapping(128)) >> 8;
    blk[0] = ((x7 + x1) >> 8).0;
    blk[1] = ((x3 + x2) >> 8).0;
    blk[2] = ((x0 + x4) >> 8).0;
    blk[3] = ((x8 + x6) >> 8).0;
    blk[4] = ((x8 - x6) >> 8).0;
    blk[5] = ((x0 - x4) >> 8).0;
    blk[6] = ((x3 - x2) >> 8).0;
    blk[7] = ((x7 - x1) >> 8).0;
}

/// Transforms column `col` of a row-transformed block, writing 8 clipped
/// samples into `out` starting at `offset` and stepping by `stride`.
pub(crate) fn col_idct(blk: &[i32; 64], col: usize, out: &mut [u8], offset: usize, stride: usize) {
    let at = |row: usize| Wrapping(blk[row * BLOCK_DIM + col]);
    let x1 = at(4) << 8;
    let x2 = at(6);
    let x3 = at(2);
    let x4 = at(1);
    let x5 = at(7);
    let x6 = at(5);
    let x7 = at(3);
    if (x1 | x2 | x3 | x4 | x5 | x6 | x7).0 == 0 {
        let v = clip((((at(0) + Wrapping(32)) >> 6) + Wrapping(128)).0);
        for row in 0..BLOCK_DIM {
            out[offset + row * stride] = v;
        }
        return;
    }
    let mut x0 = (at(0) << 8) + Wrapping(8192);
    let mut x8 = W7 * (x4 + x5) + Wrapping(4);
    let x4 = (x8 + (W1 - W7) * x4) >> 3;
    let x5 = (x8 - (W1 + W7) * x5) >> 3;
    x8 = W3 * (x6 + x7) + Wrapping(4);
    let x6 = (x8 - (W3 - W5) * x6) >> 3;
    let x7 = (x8 - (W3 + W5) * x7) >> 3;
    x8 = x0 + x1;
    x0 -= x1;
    let x1 = W6 * (x3 + x2) + Wrapping(4);
    let x2 = (x1 - (W2 + W6) * x2) >> 3;
    let x3 = (x1 + (W2 - W6) * x3) >> 3;
    let x1 = x4 + x6;
    let x4 = x4 - x6;
    let x6 = x5 + x7;
    let x5 = x5 - x7;
    let x7 = x8 + x3;
    let x8 = x8 - x3;
    let x3 = x0 + x2;
    let x0 = x0 - x2;
    let x2 = (Wrapping(181) * (x4 + x5) + Wrapping(128)) >> 8;
    let x4 = (Wrapping(181) * (x4 - x5) + Wrapping(128)) >> 8;
    let samples = [
        x7 + x1,
        x3 + x2,
        x0 + x4,
        x8 + x6,
        x8 - x6,
        x0 - x4,
        x3 - x2,
        x7 - x1,
    ];
    for (row, &s) in samples.iter().enumerate() {
        out[offset + row * stride] = clip(((s >> 14) + Wrapping(128)).0);
    }
}
