// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Marker constants and per-segment parsers.
//!
//! Every segment starts with a two-byte big-endian length that includes the
//! length field itself. Parsers operate on the segment payload slice and
//! return structured results; the decoder context applies them.

use byteorder::{BigEndian, ByteOrder};
use num_derive::FromPrimitive;

use crate::block::ZIGZAG;
use crate::error::{Error, Result};
use crate::huffman::{VlcEntry, build_vlc_table};
use crate::util::tracing_wrappers::*;

/// Markers the baseline decoder dispatches on. APPn markers (0xE0..=0xEF)
/// are matched by range instead.
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Marker {
    /// Baseline sequential frame header.
    Sof0 = 0xC0,
    /// Progressive frame header (rejected).
    Sof2 = 0xC2,
    /// Huffman table definition.
    Dht = 0xC4,
    /// Start of image.
    Soi = 0xD8,
    /// End of image.
    Eoi = 0xD9,
    /// Scan header.
    Sos = 0xDA,
    /// Quantization table definition.
    Dqt = 0xDB,
    /// Restart interval definition.
    Dri = 0xDD,
    /// Comment segment (skipped).
    Com = 0xFE,
}

/// Reads the segment at `pos`, returning its payload (length bytes excluded)
/// and the position of the byte after the segment.
pub(crate) fn read_segment(data: &[u8], pos: usize) -> Result<(&[u8], usize)> {
    let rest = &data[pos..];
    if rest.len() < 2 {
        return Err(Error::SyntaxError("truncated segment length"));
    }
    let length = BigEndian::read_u16(rest) as usize;
    if length < 2 || length > rest.len() {
        return Err(Error::SyntaxError("segment length out of bounds"));
    }
    Ok((&rest[2..length], pos + length))
}

/// Per-component fields of a frame header, before geometry is derived.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RawComponent {
    pub id: u8,
    pub ssx: usize,
    pub ssy: usize,
    pub qt_index: usize,
}

/// Parsed SOF0 payload.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameInfo {
    pub width: usize,
    pub height: usize,
    pub ncomp: usize,
    pub raw: [RawComponent; 3],
}

pub(crate) fn parse_sof(segment: &[u8]) -> Result<FrameInfo> {
    if segment.len() < 6 {
        return Err(Error::SyntaxError("frame header too short"));
    }
    if segment[0] != 8 {
        return Err(Error::UnsupportedFormat("sample precision is not 8 bits"));
    }
    let height = BigEndian::read_u16(&segment[1..]) as usize;
    let width = BigEndian::read_u16(&segment[3..]) as usize;
    if width == 0 || height == 0 {
        return Err(Error::SyntaxError("zero image dimensions"));
    }
    let ncomp = segment[5] as usize;
    if ncomp != 1 && ncomp != 3 {
        return Err(Error::UnsupportedFormat("component count is not 1 or 3"));
    }
    if segment.len() < 6 + 3 * ncomp {
        return Err(Error::SyntaxError("frame header too short for components"));
    }
    let mut raw = [RawComponent::default(); 3];
    for (i, comp) in raw.iter_mut().take(ncomp).enumerate() {
        let f = &segment[6 + 3 * i..];
        comp.id = f[0];
        comp.ssx = (f[1] >> 4) as usize;
        comp.ssy = (f[1] & 0x0F) as usize;
        if comp.ssx == 0 || comp.ssy == 0 {
            return Err(Error::SyntaxError("zero subsampling factor"));
        }
        if !comp.ssx.is_power_of_two() || !comp.ssy.is_power_of_two() {
            return Err(Error::UnsupportedFormat("non-power-of-two subsampling"));
        }
        if f[2] & 0xFC != 0 {
            return Err(Error::SyntaxError("invalid quantization table selector"));
        }
        comp.qt_index = f[2] as usize;
    }
    debug!("frame header: {}x{}, {} component(s)", width, height, ncomp);
    Ok(FrameInfo {
        width,
        height,
        ncomp,
        raw,
    })
}

/// Parses a DHT payload holding one or more table definitions.
///
/// The slot byte packs class (high nibble, 0 = DC / 1 = AC) and table id
/// (low nibble); the four context tables are laid out DC0, DC1, AC0, AC1.
pub(crate) fn parse_dht(
    segment: &[u8],
    vlc: &mut [Vec<VlcEntry>; 4],
    defined: &mut [bool; 4],
) -> Result<()> {
    let mut seg = segment;
    while seg.len() >= 17 {
        let id = seg[0];
        if id & 0xEC != 0 {
            return Err(Error::SyntaxError("invalid huffman table class or slot"));
        }
        if id & 0x02 != 0 {
            return Err(Error::UnsupportedFormat("huffman table slot above 1"));
        }
        let slot = ((id | (id >> 3)) & 3) as usize;
        let counts: [u8; 16] = array_init::array_init(|i| seg[1 + i]);
        let consumed = build_vlc_table(&counts, &seg[17..], &mut vlc[slot])?;
        defined[slot] = true;
        trace!("huffman table slot {}: {} symbols", slot, consumed);
        seg = &seg[17 + consumed..];
    }
    if !seg.is_empty() {
        return Err(Error::SyntaxError("trailing bytes in huffman segment"));
    }
    Ok(())
}

/// Parses a DQT payload holding one or more 64-entry tables, de-zigzagging
/// each into natural order.
pub(crate) fn parse_dqt(
    segment: &[u8],
    qtab: &mut [[u8; 64]; 4],
    defined: &mut [bool; 4],
) -> Result<()> {
    let mut seg = segment;
    while seg.len() >= 65 {
        let id = seg[0];
        // High nibble nonzero would mean 16-bit table entries.
        if id & 0xFC != 0 {
            return Err(Error::SyntaxError("invalid quantization table id"));
        }
        let slot = id as usize;
        for (i, &v) in seg[1..65].iter().enumerate() {
            qtab[slot][ZIGZAG[i]] = v;
        }
        defined[slot] = true;
        trace!("quantization table slot {}", slot);
        seg = &seg[65..];
    }
    if !seg.is_empty() {
        return Err(Error::SyntaxError("trailing bytes in quantization segment"));
    }
    Ok(())
}

/// Parses a DRI payload: the restart interval in MCUs (0 disables restarts).
pub(crate) fn parse_dri(segment: &[u8]) -> Result<usize> {
    if segment.len() < 2 {
        return Err(Error::SyntaxError("restart interval segment too short"));
    }
    Ok(BigEndian::read_u16(segment) as usize)
}

/// Table bindings from a scan header: (dc_table, ac_table) per component,
/// in frame-component order.
pub(crate) fn parse_sos(
    segment: &[u8],
    ids: &[u8],
) -> Result<Vec<(usize, usize)>> {
    let ncomp = ids.len();
    if segment.len() < 1 + 2 * ncomp + 3 {
        return Err(Error::SyntaxError("scan header too short"));
    }
    if segment[0] as usize != ncomp {
        return Err(Error::UnsupportedFormat("scan component count mismatch"));
    }
    let mut bindings = Vec::with_capacity(ncomp);
    for (i, &id) in ids.iter().enumerate() {
        let f = &segment[1 + 2 * i..];
        if f[0] != id {
            return Err(Error::SyntaxError("scan component id mismatch"));
        }
        if f[1] & 0xEE != 0 {
            return Err(Error::SyntaxError("invalid scan table selector"));
        }
        // AC tables live in slots 2 and 3 of the context's table array.
        bindings.push(((f[1] >> 4) as usize, ((f[1] & 1) | 2) as usize));
    }
    let tail = &segment[1 + 2 * ncomp..];
    if tail[0] != 0 || tail[1] != 63 || tail[2] != 0 {
        return Err(Error::UnsupportedFormat("non-baseline spectral selection"));
    }
    Ok(bindings)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::huffman::TABLE_SIZE;
    use test_log::test;

    #[test]
    fn segment_framing() -> Result<()> {
        let data = [0xFFu8, 0xDB, 0x00, 0x04, 0xAA, 0xBB, 0x12];
        let (seg, next) = read_segment(&data, 2)?;
        assert_eq!(seg, &[0xAA, 0xBB]);
        assert_eq!(next, 6);
        Ok(())
    }

    #[test]
    fn segment_length_past_buffer() {
        let data = [0x00u8, 0x10, 0xAA];
        assert!(matches!(
            read_segment(&data, 0),
            Err(Error::SyntaxError(_))
        ));
    }

    #[test]
    fn segment_length_below_minimum() {
        let data = [0x00u8, 0x01, 0xAA];
        assert!(matches!(
            read_segment(&data, 0),
            Err(Error::SyntaxError(_))
        ));
    }

    #[test]
    fn sof_rejects_bad_precision() {
        let seg = [12u8, 0, 8, 0, 8, 1, 1, 0x11, 0];
        assert!(matches!(
            parse_sof(&seg),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn sof_rejects_bad_component_count() {
        let seg = [8u8, 0, 8, 0, 8, 2, 1, 0x11, 0, 2, 0x11, 0];
        assert!(matches!(
            parse_sof(&seg),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn sof_rejects_non_power_of_two_subsampling() {
        let seg = [8u8, 0, 8, 0, 8, 1, 1, 0x31, 0];
        assert!(matches!(
            parse_sof(&seg),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn sof_parses_color_frame() -> Result<()> {
        let seg = [
            8u8, 0x01, 0x00, 0x00, 0xC0, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1,
        ];
        let info = parse_sof(&seg)?;
        assert_eq!((info.width, info.height, info.ncomp), (192, 256, 3));
        assert_eq!((info.raw[0].ssx, info.raw[0].ssy), (2, 2));
        assert_eq!(info.raw[1].qt_index, 1);
        Ok(())
    }

    #[test]
    fn dqt_stores_natural_order() -> Result<()> {
        let mut seg = vec![0u8];
        seg.extend((0..64).map(|i| i as u8));
        let mut qtab = [[0u8; 64]; 4];
        let mut defined = [false; 4];
        parse_dqt(&seg, &mut qtab, &mut defined)?;
        assert!(defined[0]);
        // Zigzag stream positions 0, 1, 2 land at natural 0, 1, 8.
        assert_eq!(qtab[0][0], 0);
        assert_eq!(qtab[0][1], 1);
        assert_eq!(qtab[0][8], 2);
        assert_eq!(qtab[0][63], 63);
        Ok(())
    }

    #[test]
    fn dht_trailing_bytes_rejected() {
        let mut seg = vec![0u8];
        seg.extend([0u8; 16]);
        seg.push(0xAB); // no symbols declared, so this byte is garbage
        let mut vlc: [Vec<VlcEntry>; 4] =
            array_init::array_init(|_| vec![VlcEntry::default(); TABLE_SIZE]);
        let mut defined = [false; 4];
        assert!(matches!(
            parse_dht(&seg, &mut vlc, &mut defined),
            Err(Error::SyntaxError(_))
        ));
    }

    #[test]
    fn sos_binds_tables() -> Result<()> {
        let seg = [3u8, 1, 0x00, 2, 0x11, 3, 0x11, 0, 63, 0];
        let bindings = parse_sos(&seg, &[1, 2, 3])?;
        assert_eq!(bindings, vec![(0, 2), (1, 3), (1, 3)]);
        Ok(())
    }

    #[test]
    fn sos_rejects_progressive_spectral_selection() {
        let seg = [1u8, 1, 0x00, 1, 5, 0];
        assert!(matches!(
            parse_sos(&seg, &[1]),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
