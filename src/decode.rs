// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Decoder context and the marker-to-scan state machine.

use crate::bit_reader::BitReader;
use crate::block::decode_block;
use crate::color::{strip_stride, ycbcr_to_rgb};
use crate::error::{Error, Result};
use crate::huffman::{TABLE_SIZE, VlcEntry};
use crate::markers::{FrameInfo, Marker, parse_dht, parse_dqt, parse_dri, parse_sof, parse_sos, read_segment};
use crate::upsample::{ChromaUpsampling, upsample_component};
use crate::util::tracing_wrappers::*;
use crate::util::try_alloc_zeroed;
use crate::{BLOCK_DIM, BLOCK_SIZE};

use num_traits::FromPrimitive;

/// Per-decode configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeOptions {
    pub chroma_upsampling: ChromaUpsampling,
}

/// A decoded frame: row-major, channel-interleaved, one byte per channel,
/// tightly packed (stride == width * channels).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub pixels: Vec<u8>,
}

/// Lifecycle of a [`DecoderContext`].
///
/// `Error` latches: once entered, only a reset (explicit or the implicit one
/// at the start of the next decode) leaves it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Init,
    ExpectStart,
    ReadingHeaders,
    Scanning,
    Done,
    Error,
}

/// One image component and its pixel plane.
#[derive(Clone, Debug, Default)]
pub(crate) struct Component {
    pub id: u8,
    pub ssx: usize,
    pub ssy: usize,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub qt_index: usize,
    pub dc_table: usize,
    pub ac_table: usize,
    pub dc_pred: i32,
    pub pixels: Vec<u8>,
}

/// All state for decoding one image.
///
/// A context is exclusively owned by the thread running a decode; concurrent
/// decodes need independent contexts. The four dense VLC tables are
/// allocated once here and cleared on reset rather than reallocated, since
/// they dominate the context's footprint. `decode` resets implicitly, so a
/// context can be reused across frames (including after an error).
pub struct DecoderContext {
    options: DecodeOptions,
    state: State,
    width: usize,
    height: usize,
    ncomp: usize,
    mcu_w: usize,
    mcu_h: usize,
    mcu_size_x: usize,
    mcu_size_y: usize,
    restart_interval: usize,
    components: [Component; 3],
    qtab: [[u8; BLOCK_SIZE]; 4],
    qt_defined: [bool; 4],
    vlc: [Vec<VlcEntry>; 4],
    vlc_defined: [bool; 4],
    out: Vec<u8>,
}

impl DecoderContext {
    pub fn new(options: DecodeOptions) -> DecoderContext {
        DecoderContext {
            options,
            state: State::Init,
            width: 0,
            height: 0,
            ncomp: 0,
            mcu_w: 0,
            mcu_h: 0,
            mcu_size_x: 0,
            mcu_size_y: 0,
            restart_interval: 0,
            components: array_init::array_init(|_| Component::default()),
            qtab: [[0; BLOCK_SIZE]; 4],
            qt_defined: [false; 4],
            vlc: array_init::array_init(|_| vec![VlcEntry::default(); TABLE_SIZE]),
            vlc_defined: [false; 4],
            out: Vec::new(),
        }
    }

    /// Drops all per-image state, keeping the table allocations.
    pub fn reset(&mut self) {
        self.width = 0;
        self.height = 0;
        self.ncomp = 0;
        self.mcu_w = 0;
        self.mcu_h = 0;
        self.mcu_size_x = 0;
        self.mcu_size_y = 0;
        self.restart_interval = 0;
        for c in &mut self.components {
            *c = Component::default();
        }
        self.qtab = [[0; BLOCK_SIZE]; 4];
        self.qt_defined = [false; 4];
        for table in &mut self.vlc {
            table.fill(VlcEntry::default());
        }
        self.vlc_defined = [false; 4];
        self.out = Vec::new();
        self.state = State::ExpectStart;
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Decodes one complete JPEG stream.
    ///
    /// The context is reset first, so previous state (including a latched
    /// error) never leaks into this decode. On failure the context stays in
    /// the error state until the next decode or explicit reset.
    pub fn decode(&mut self, data: &[u8]) -> Result<DecodedImage> {
        self.reset();
        match self.decode_inner(data) {
            Ok(image) => Ok(image),
            Err(e) => {
                self.state = State::Error;
                Err(e)
            }
        }
    }

    fn decode_inner(&mut self, data: &[u8]) -> Result<DecodedImage> {
        if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
            return Err(Error::NotAJpeg);
        }
        self.state = State::ReadingHeaders;
        let mut pos = 2usize;
        loop {
            if data.len() < pos + 2 || data[pos] != 0xFF {
                return Err(Error::SyntaxError("expected a marker"));
            }
            let byte = data[pos + 1];
            pos += 2;
            match Marker::from_u8(byte) {
                Some(Marker::Sof0) => {
                    let (seg, next) = read_segment(data, pos)?;
                    let info = parse_sof(seg)?;
                    self.apply_frame_header(info)?;
                    pos = next;
                }
                Some(Marker::Dht) => {
                    let (seg, next) = read_segment(data, pos)?;
                    parse_dht(seg, &mut self.vlc, &mut self.vlc_defined)?;
                    pos = next;
                }
                Some(Marker::Dqt) => {
                    let (seg, next) = read_segment(data, pos)?;
                    parse_dqt(seg, &mut self.qtab, &mut self.qt_defined)?;
                    pos = next;
                }
                Some(Marker::Dri) => {
                    let (seg, next) = read_segment(data, pos)?;
                    self.restart_interval = parse_dri(seg)?;
                    pos = next;
                }
                Some(Marker::Sos) => {
                    let (seg, next) = read_segment(data, pos)?;
                    self.apply_scan_header(seg)?;
                    self.state = State::Scanning;
                    return self.decode_scan(&data[next..]);
                }
                Some(Marker::Com) => {
                    let (_, next) = read_segment(data, pos)?;
                    pos = next;
                }
                Some(Marker::Sof2) => {
                    return Err(Error::UnsupportedFormat("progressive JPEG"));
                }
                _ if (0xE0..=0xEF).contains(&byte) => {
                    // Application segment: skip by declared length.
                    let (_, next) = read_segment(data, pos)?;
                    pos = next;
                }
                _ => return Err(Error::UnsupportedFormat("unhandled marker")),
            }
        }
    }

    /// Derives MCU geometry from the frame header and allocates the planes
    /// and the output buffer.
    fn apply_frame_header(&mut self, info: FrameInfo) -> Result<()> {
        self.width = info.width;
        self.height = info.height;
        self.ncomp = info.ncomp;
        let mut raw = info.raw;
        // A grayscale frame is decoded as a single full-resolution plane no
        // matter what subsampling the header declares.
        if self.ncomp == 1 {
            raw[0].ssx = 1;
            raw[0].ssy = 1;
        }
        let ssx_max = raw[..self.ncomp].iter().map(|c| c.ssx).max().unwrap_or(1);
        let ssy_max = raw[..self.ncomp].iter().map(|c| c.ssy).max().unwrap_or(1);
        self.mcu_size_x = ssx_max * BLOCK_DIM;
        self.mcu_size_y = ssy_max * BLOCK_DIM;
        self.mcu_w = self.width.div_ceil(self.mcu_size_x);
        self.mcu_h = self.height.div_ceil(self.mcu_size_y);
        for (c, r) in self.components[..self.ncomp].iter_mut().zip(&raw) {
            c.id = r.id;
            c.ssx = r.ssx;
            c.ssy = r.ssy;
            c.qt_index = r.qt_index;
            c.dc_pred = 0;
            c.width = (self.width * c.ssx).div_ceil(ssx_max);
            c.height = (self.height * c.ssy).div_ceil(ssy_max);
            c.stride = self.mcu_w * c.ssx * BLOCK_DIM;
            if (c.width < 3 && c.ssx != ssx_max) || (c.height < 3 && c.ssy != ssy_max) {
                return Err(Error::UnsupportedFormat("component too small to upsample"));
            }
            c.pixels = try_alloc_zeroed(c.stride * self.mcu_h * c.ssy * BLOCK_DIM)?;
        }
        self.out = try_alloc_zeroed(self.width * self.height * self.ncomp)?;
        info!(
            "frame {}x{}, {} component(s), {} MCU(s)",
            self.width,
            self.height,
            self.ncomp,
            self.mcu_w * self.mcu_h
        );
        Ok(())
    }

    /// Binds scan-header table selections and checks every referenced table
    /// has been defined.
    fn apply_scan_header(&mut self, segment: &[u8]) -> Result<()> {
        if self.ncomp == 0 {
            return Err(Error::SyntaxError("scan before frame header"));
        }
        let mut ids = [0u8; 3];
        for (id, c) in ids.iter_mut().zip(&self.components) {
            *id = c.id;
        }
        let bindings = parse_sos(segment, &ids[..self.ncomp])?;
        for (c, (dc, ac)) in self.components[..self.ncomp].iter_mut().zip(bindings) {
            c.dc_table = dc;
            c.ac_table = ac;
        }
        for c in &self.components[..self.ncomp] {
            if !self.qt_defined[c.qt_index] {
                return Err(Error::SyntaxError("quantization table not defined"));
            }
            if !self.vlc_defined[c.dc_table] || !self.vlc_defined[c.ac_table] {
                return Err(Error::SyntaxError("huffman table not defined"));
            }
        }
        Ok(())
    }

    fn decode_block_at(
        &mut self,
        reader: &mut BitReader<'_>,
        ci: usize,
        offset: usize,
    ) -> Result<()> {
        let (dc_t, ac_t, qt) = {
            let c = &self.components[ci];
            (c.dc_table, c.ac_table, c.qt_index)
        };
        let c = &mut self.components[ci];
        decode_block(
            reader,
            &self.vlc[dc_t],
            &self.vlc[ac_t],
            &self.qtab[qt],
            &mut c.dc_pred,
            &mut c.pixels,
            offset,
            c.stride,
        )
    }

    /// Decodes all MCUs in raster order, resyncing at restart markers, then
    /// runs upsampling and color conversion.
    fn decode_scan(&mut self, scan: &[u8]) -> Result<DecodedImage> {
        let mut reader = BitReader::new(scan);
        let mut rst_count = self.restart_interval;
        let mut next_rst = 0u32;
        let (mut mbx, mut mby) = (0usize, 0usize);
        loop {
            for ci in 0..self.ncomp {
                let (ssx, ssy, stride) = {
                    let c = &self.components[ci];
                    (c.ssx, c.ssy, c.stride)
                };
                for sby in 0..ssy {
                    for sbx in 0..ssx {
                        let offset =
                            ((mby * ssy + sby) * stride + mbx * ssx + sbx) * BLOCK_DIM;
                        self.decode_block_at(&mut reader, ci, offset)?;
                    }
                }
            }
            mbx += 1;
            if mbx >= self.mcu_w {
                mbx = 0;
                mby += 1;
                if mby >= self.mcu_h {
                    break;
                }
            }
            if self.restart_interval > 0 {
                rst_count -= 1;
                if rst_count == 0 {
                    reader.align();
                    let marker = reader.read(16)?;
                    if marker & 0xFFF8 != 0xFFD0 || marker & 7 != next_rst {
                        return Err(Error::SyntaxError("invalid restart marker"));
                    }
                    trace!("restart {} at MCU row {}", next_rst, mby);
                    next_rst = (next_rst + 1) & 7;
                    rst_count = self.restart_interval;
                    for c in &mut self.components {
                        c.dc_pred = 0;
                    }
                }
            }
        }
        self.state = State::Done;
        for ci in 0..self.ncomp {
            upsample_component(
                &mut self.components[ci],
                self.options.chroma_upsampling,
                self.width,
                self.height,
            )?;
        }
        let mut out = std::mem::take(&mut self.out);
        if self.ncomp == 3 {
            let [y, cb, cr] = &self.components;
            ycbcr_to_rgb(y, cb, cr, self.width, self.height, &mut out)?;
        } else {
            strip_stride(&self.components[0], self.width, self.height, &mut out)?;
        }
        info!(
            "decoded {}x{} with {} channel(s)",
            self.width, self.height, self.ncomp
        );
        Ok(DecodedImage {
            width: self.width,
            height: self.height,
            channels: self.ncomp,
            pixels: out,
        })
    }
}

/// Decodes one frame with default options and a fresh context.
pub fn decode_frame(data: &[u8]) -> Result<DecodedImage> {
    DecoderContext::new(DecodeOptions::default()).decode(data)
}
