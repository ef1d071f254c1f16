// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Colorspace conversion into the packed output buffer.
//!
//! Fixed-point BT.601 with 8 fractional bits: r = y + 1.402 cr,
//! g = y - 0.344 cb - 0.714 cr, b = y + 1.772 cb, with Cb/Cr offset by -128
//! and +128 rounding before the shift.

use crate::decode::Component;
use crate::error::{Error, Result};
use crate::util::clip;

/// Converts three full-resolution planes into interleaved RGB, tightly
/// packed (stride == width * 3). `rgb` is the pre-sized output buffer.
pub(crate) fn ycbcr_to_rgb(
    y: &Component,
    cb: &Component,
    cr: &Component,
    width: usize,
    height: usize,
    rgb: &mut [u8],
) -> Result<()> {
    if rgb.len() != width * height * 3 {
        return Err(Error::InternalError("output buffer size mismatch"));
    }
    for row in 0..height {
        let py = &y.pixels[row * y.stride..];
        let pcb = &cb.pixels[row * cb.stride..];
        let pcr = &cr.pixels[row * cr.stride..];
        let out = &mut rgb[row * width * 3..(row + 1) * width * 3];
        for x in 0..width {
            let lum = (py[x] as i32) << 8;
            let cb_v = pcb[x] as i32 - 128;
            let cr_v = pcr[x] as i32 - 128;
            out[x * 3] = clip((lum + 359 * cr_v + 128) >> 8);
            out[x * 3 + 1] = clip((lum - 88 * cb_v - 183 * cr_v + 128) >> 8);
            out[x * 3 + 2] = clip((lum + 454 * cb_v + 128) >> 8);
        }
    }
    Ok(())
}

/// Copies a grayscale plane into a tightly packed buffer, dropping the MCU
/// row padding.
pub(crate) fn strip_stride(
    c: &Component,
    width: usize,
    height: usize,
    out: &mut [u8],
) -> Result<()> {
    if out.len() != width * height {
        return Err(Error::InternalError("output buffer size mismatch"));
    }
    for row in 0..height {
        out[row * width..(row + 1) * width]
            .copy_from_slice(&c.pixels[row * c.stride..row * c.stride + width]);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn flat(width: usize, height: usize, stride: usize, value: u8) -> Component {
        Component {
            width,
            height,
            stride,
            pixels: vec![value; stride * height],
            ..Component::default()
        }
    }

    #[test]
    fn neutral_chroma_is_gray() -> Result<()> {
        let y = flat(4, 2, 8, 129);
        let cb = flat(4, 2, 8, 128);
        let cr = flat(4, 2, 8, 128);
        let mut rgb = vec![0u8; 24];
        ycbcr_to_rgb(&y, &cb, &cr, 4, 2, &mut rgb)?;
        assert!(rgb.iter().all(|&v| v == 129));
        Ok(())
    }

    #[test]
    fn primary_red() -> Result<()> {
        let y = flat(1, 1, 1, 76);
        let cb = flat(1, 1, 1, 84);
        let cr = flat(1, 1, 1, 255);
        let mut rgb = [0u8; 3];
        ycbcr_to_rgb(&y, &cb, &cr, 1, 1, &mut rgb)?;
        let [r, g, b] = rgb;
        assert!(r >= 250, "r = {r}");
        assert!(g <= 5, "g = {g}");
        assert!(b <= 5, "b = {b}");
        Ok(())
    }

    #[test]
    fn channels_clip_to_byte_range() -> Result<()> {
        let y = flat(1, 1, 1, 255);
        let cb = flat(1, 1, 1, 255);
        let cr = flat(1, 1, 1, 255);
        let mut rgb = [0u8; 3];
        ycbcr_to_rgb(&y, &cb, &cr, 1, 1, &mut rgb)?;
        // Red and blue overflow and clip; green stays in range.
        assert_eq!(rgb, [255, 121, 255]);
        Ok(())
    }

    #[test]
    fn wrong_output_size_is_internal_error() {
        let y = flat(2, 2, 2, 0);
        let mut rgb = [0u8; 3];
        assert!(matches!(
            ycbcr_to_rgb(&y, &y, &y, 2, 2, &mut rgb),
            Err(Error::InternalError(_))
        ));
    }

    #[test]
    fn stride_removed_for_grayscale() -> Result<()> {
        let mut c = flat(3, 2, 8, 0);
        for y in 0..2 {
            for x in 0..3 {
                c.pixels[y * 8 + x] = (10 * y + x) as u8;
            }
        }
        let mut out = vec![0u8; 6];
        strip_stride(&c, 3, 2, &mut out)?;
        assert_eq!(out, vec![0, 1, 2, 10, 11, 12]);
        Ok(())
    }
}
