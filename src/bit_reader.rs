// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use crate::error::{Error, Result};

/// Reads MSB-first bits from the entropy-coded segment of a scan.
///
/// Byte-stuffing is handled transparently: a literal `0xFF` data byte is
/// encoded as `FF 00` and the stuffed zero is stripped; `FF FF` is treated as
/// fill. Restart markers (`FF D0`..`FF D7`) are injected into the bit buffer
/// so the caller's resync logic can read them as a 16-bit value. An
/// end-of-image marker stops bit supply; reads past the true end of data
/// synthesize 1-bits, matching the usual decoder tolerance for trailing
/// padding. Any other marker inside the scan is a syntax error.
#[derive(Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit_buf: u32,
    bits_in_buf: usize,
}

/// `peek`/`read` never need more than one VLC lookup worth of bits.
pub const MAX_BITS_PER_CALL: usize = 16;

impl Debug for BitReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BitReader{{ pos: {}/{} bytes, bits_in_buf: {} }}",
            self.pos,
            self.data.len(),
            self.bits_in_buf
        )
    }
}

impl<'a> BitReader<'a> {
    /// Constructs a BitReader over the scan data following a scan header.
    pub fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader {
            data,
            pos: 0,
            bit_buf: 0,
            bits_in_buf: 0,
        }
    }

    /// Returns the next `num` bits without consuming them.
    pub fn peek(&mut self, num: usize) -> Result<u32> {
        debug_assert!(num <= MAX_BITS_PER_CALL);
        if num == 0 {
            return Ok(0);
        }
        while self.bits_in_buf < num {
            self.refill_byte()?;
        }
        Ok((self.bit_buf >> (self.bits_in_buf - num)) & ((1 << num) - 1))
    }

    /// Advances by `num` bits, refilling first if the buffer is short.
    pub fn consume(&mut self, num: usize) -> Result<()> {
        if self.bits_in_buf < num {
            self.peek(num)?;
        }
        self.bits_in_buf -= num;
        Ok(())
    }

    /// Reads `num` bits.
    pub fn read(&mut self, num: usize) -> Result<u32> {
        let ret = self.peek(num)?;
        self.bits_in_buf -= num;
        Ok(ret)
    }

    /// Discards buffered bits up to the next byte boundary.
    pub fn align(&mut self) {
        self.bits_in_buf &= !7;
    }

    fn refill_byte(&mut self) -> Result<()> {
        if self.pos >= self.data.len() {
            // Exhausted: behave as if the stream were padded with 0xFF.
            self.bit_buf = (self.bit_buf << 8) | 0xFF;
            self.bits_in_buf += 8;
            return Ok(());
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        self.bit_buf = (self.bit_buf << 8) | byte as u32;
        self.bits_in_buf += 8;
        if byte == 0xFF {
            let Some(&marker) = self.data.get(self.pos) else {
                return Err(Error::SyntaxError("scan ends in unterminated 0xFF"));
            };
            self.pos += 1;
            match marker {
                // Stuffed zero or fill byte: the 0xFF already in the buffer
                // is the data.
                0x00 | 0xFF => {}
                // End of image: stop supplying real bytes.
                0xD9 => self.pos = self.data.len(),
                // Restart markers stay visible to the resync logic.
                m if m & 0xF8 == 0xD0 => {
                    self.bit_buf = (self.bit_buf << 8) | marker as u32;
                    self.bits_in_buf += 8;
                }
                _ => return Err(Error::SyntaxError("invalid marker inside scan")),
            }
        }
        Ok(())
    }
}
