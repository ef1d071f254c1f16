// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! End-to-end decodes through the public API, with frame sizes that are not
//! a multiple of the MCU size so the output crop path is exercised.

use camjpeg::{
    ChromaUpsampling, DecodeOptions, DecoderContext, Result, State, decode_frame,
};
use test_log::test;

fn dqt(value: u8) -> Vec<u8> {
    let mut v = vec![0xFF, 0xDB, 0x00, 0x43, 0x00];
    v.extend([value; 64]);
    v
}

/// DC table 0: '0' -> category 0, '1' -> category 2.
/// AC table 0: '0' -> end-of-block.
fn dht() -> Vec<u8> {
    let mut v = vec![0xFF, 0xC4, 0x00, 0x27, 0x00];
    let mut counts = [0u8; 16];
    counts[0] = 2;
    v.extend(counts);
    v.extend([0x00, 0x02]);
    v.push(0x10);
    counts[0] = 1;
    v.extend(counts);
    v.push(0x00);
    v
}

fn sof(width: u16, height: u16, components: &[u8]) -> Vec<u8> {
    let len = 8 + components.len() as u16;
    let mut v = vec![0xFF, 0xC0];
    v.extend(len.to_be_bytes());
    v.push(0x08);
    v.extend(height.to_be_bytes());
    v.extend(width.to_be_bytes());
    v.push((components.len() / 3) as u8);
    v.extend_from_slice(components);
    v
}

fn sos(selectors: &[u8]) -> Vec<u8> {
    let len = 6 + selectors.len() as u16;
    let mut v = vec![0xFF, 0xDA];
    v.extend(len.to_be_bytes());
    v.push((selectors.len() / 2) as u8);
    v.extend_from_slice(selectors);
    v.extend([0x00, 0x3F, 0x00]);
    v
}

fn stream(parts: &[&[u8]]) -> Vec<u8> {
    let mut v = vec![0xFF, 0xD8];
    for p in parts {
        v.extend_from_slice(p);
    }
    v.extend([0xFF, 0xD9]);
    v
}

/// 12x10 grayscale: four MCUs covering a 16x16 area, cropped to the frame.
/// First MCU carries DC diff +2, the rest diff 0, so every sample is 129.
fn gray_12x10() -> Vec<u8> {
    stream(&[
        &dqt(2),
        &sof(12, 10, &[0x01, 0x11, 0x00]),
        &dht(),
        &sos(&[0x01, 0x00]),
        &[0xC0, 0x3F],
    ])
}

/// 10x10 4:2:0 color: one 16x16 MCU, luma DC +2, chroma neutral.
fn color_10x10() -> Vec<u8> {
    stream(&[
        &dqt(2),
        &sof(10, 10, &[0x01, 0x22, 0x00, 0x02, 0x11, 0x00, 0x03, 0x11, 0x00]),
        &dht(),
        &sos(&[0x01, 0x00, 0x02, 0x00, 0x03, 0x00]),
        &[0xC0, 0x03],
    ])
}

#[test]
fn grayscale_crops_to_frame_size() -> Result<()> {
    let image = decode_frame(&gray_12x10())?;
    assert_eq!((image.width, image.height, image.channels), (12, 10, 1));
    assert_eq!(image.pixels.len(), 120);
    assert!(image.pixels.iter().all(|&v| v == 129));
    Ok(())
}

#[test]
fn color_crops_to_frame_size() -> Result<()> {
    let image = decode_frame(&color_10x10())?;
    assert_eq!((image.width, image.height, image.channels), (10, 10, 3));
    assert_eq!(image.pixels.len(), 300);
    assert!(image.pixels.iter().all(|&v| v == 129));
    Ok(())
}

#[test]
fn filtered_upsampling_handles_odd_frames() -> Result<()> {
    let mut ctx = DecoderContext::new(DecodeOptions {
        chroma_upsampling: ChromaUpsampling::Filtered,
    });
    let image = ctx.decode(&color_10x10())?;
    assert_eq!(ctx.state(), State::Done);
    assert_eq!(image.pixels.len(), 300);
    assert!(image.pixels.iter().all(|&v| v == 129));
    Ok(())
}
