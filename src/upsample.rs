// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Chroma plane reconstruction to full luma resolution.
//!
//! Subsampled planes are expanded with one of two strategies, chosen at
//! runtime so both stay testable in a single build: plain nearest-neighbour
//! replication, or a separable 3/4-tap reconstruction filter that doubles
//! the plane per pass with dedicated boundary taps at the first and last two
//! columns or rows.

use crate::decode::Component;
use crate::error::{Error, Result};
use crate::util::{clip, try_alloc_zeroed};
use crate::util::tracing_wrappers::*;

/// How subsampled chroma planes are brought up to full resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChromaUpsampling {
    /// Pixel replication. What the reference camera pipeline ships with.
    #[default]
    Nearest,
    /// Separable reconstruction filter; smoother edges, more arithmetic.
    Filtered,
}

// Interior and boundary filter taps, in 1/128 units. Each tap set sums to
// 128 so flat regions pass through unchanged.
const CF4A: i32 = -9;
const CF4B: i32 = 111;
const CF4C: i32 = 29;
const CF4D: i32 = -3;
const CF3A: i32 = 28;
const CF3B: i32 = 109;
const CF3C: i32 = -9;
const CF3X: i32 = 104;
const CF3Y: i32 = 27;
const CF3Z: i32 = -3;
const CF2A: i32 = 139;
const CF2B: i32 = -11;

#[inline]
fn cf(x: i32) -> u8 {
    clip((x + 64) >> 7)
}

/// Doubles the plane horizontally with the reconstruction filter.
fn upsample_h(c: &mut Component) -> Result<()> {
    let xmax = c.width - 3;
    let mut out = try_alloc_zeroed((c.width * c.height) * 2)?;
    for y in 0..c.height {
        let lin = &c.pixels[y * c.stride..y * c.stride + c.width];
        let lout = &mut out[y * c.width * 2..(y + 1) * c.width * 2];
        let px = |x: usize| lin[x] as i32;
        lout[0] = cf(CF2A * px(0) + CF2B * px(1));
        lout[1] = cf(CF3X * px(0) + CF3Y * px(1) + CF3Z * px(2));
        lout[2] = cf(CF3A * px(0) + CF3B * px(1) + CF3C * px(2));
        for x in 0..xmax {
            lout[x * 2 + 3] = cf(CF4A * px(x) + CF4B * px(x + 1) + CF4C * px(x + 2) + CF4D * px(x + 3));
            lout[x * 2 + 4] = cf(CF4D * px(x) + CF4C * px(x + 1) + CF4B * px(x + 2) + CF4A * px(x + 3));
        }
        let w = c.width;
        lout[2 * w - 3] = cf(CF3A * px(w - 1) + CF3B * px(w - 2) + CF3C * px(w - 3));
        lout[2 * w - 2] = cf(CF3X * px(w - 1) + CF3Y * px(w - 2) + CF3Z * px(w - 3));
        lout[2 * w - 1] = cf(CF2A * px(w - 1) + CF2B * px(w - 2));
    }
    c.width *= 2;
    c.stride = c.width;
    c.pixels = out;
    Ok(())
}

/// Doubles the plane vertically with the reconstruction filter.
fn upsample_v(c: &mut Component) -> Result<()> {
    let w = c.width;
    let h = c.height;
    let s = c.stride;
    let mut out = try_alloc_zeroed(w * h * 2)?;
    for x in 0..w {
        let px = |row: usize| c.pixels[row * s + x] as i32;
        out[x] = cf(CF2A * px(0) + CF2B * px(1));
        out[w + x] = cf(CF3X * px(0) + CF3Y * px(1) + CF3Z * px(2));
        out[2 * w + x] = cf(CF3A * px(0) + CF3B * px(1) + CF3C * px(2));
        let mut o = 3;
        for y in 1..=h - 3 {
            out[o * w + x] =
                cf(CF4A * px(y - 1) + CF4B * px(y) + CF4C * px(y + 1) + CF4D * px(y + 2));
            out[(o + 1) * w + x] =
                cf(CF4D * px(y - 1) + CF4C * px(y) + CF4B * px(y + 1) + CF4A * px(y + 2));
            o += 2;
        }
        out[o * w + x] = cf(CF3A * px(h - 1) + CF3B * px(h - 2) + CF3C * px(h - 3));
        out[(o + 1) * w + x] = cf(CF3X * px(h - 1) + CF3Y * px(h - 2) + CF3Z * px(h - 3));
        out[(o + 2) * w + x] = cf(CF2A * px(h - 1) + CF2B * px(h - 2));
    }
    c.height *= 2;
    c.stride = w;
    c.pixels = out;
    Ok(())
}

/// Expands the plane to at least `width` x `height` by pixel replication in
/// a single pass.
fn upsample_nearest(c: &mut Component, width: usize, height: usize) -> Result<()> {
    let mut xshift = 0;
    let mut yshift = 0;
    let mut w = c.width;
    let mut h = c.height;
    while w < width {
        w *= 2;
        xshift += 1;
    }
    while h < height {
        h *= 2;
        yshift += 1;
    }
    let mut out = try_alloc_zeroed(w * h)?;
    for y in 0..h {
        let lin = &c.pixels[(y >> yshift) * c.stride..];
        let lout = &mut out[y * w..(y + 1) * w];
        for (x, v) in lout.iter_mut().enumerate() {
            *v = lin[x >> xshift];
        }
    }
    c.width = w;
    c.height = h;
    c.stride = w;
    c.pixels = out;
    Ok(())
}

/// Brings one component plane up to full frame resolution.
///
/// Power-of-two subsampling guarantees the doubling passes land on (or past,
/// for frames that are not a multiple of the MCU size) the frame dimensions;
/// anything else is an internal invariant violation.
pub(crate) fn upsample_component(
    c: &mut Component,
    mode: ChromaUpsampling,
    width: usize,
    height: usize,
) -> Result<()> {
    if c.width >= width && c.height >= height {
        return Ok(());
    }
    debug!(
        "upsampling plane {}x{} -> {}x{} ({:?})",
        c.width, c.height, width, height, mode
    );
    match mode {
        ChromaUpsampling::Nearest => upsample_nearest(c, width, height)?,
        ChromaUpsampling::Filtered => {
            while c.width < width || c.height < height {
                if c.width < width {
                    upsample_h(c)?;
                }
                if c.height < height {
                    upsample_v(c)?;
                }
            }
        }
    }
    if c.width < width || c.height < height {
        return Err(Error::InternalError("upsampled plane smaller than frame"));
    }
    Ok(())
}
