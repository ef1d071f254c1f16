// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Canonical Huffman decode tables.
//!
//! A table definition gives the number of codes of each length 1..=16 plus
//! the symbol values in code order. Decoding uses a dense table indexed by
//! the next 16 bits of bitstream: every possible bit pattern sharing a code's
//! prefix maps to that code's symbol and length, so one peek resolves any
//! symbol without tree walking.

use crate::bit_reader::BitReader;
use crate::error::{Error, Result};

pub const LOOKUP_BITS: usize = 16;
pub const TABLE_SIZE: usize = 1 << LOOKUP_BITS;

/// Largest magnitude category baseline JPEG can produce (11 for DC
/// differences, 10 for AC coefficients).
const MAX_CATEGORY: usize = 11;

/// One dense-table entry: `bits` consumed by the code (0 = no such code) and
/// the decoded symbol value.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct VlcEntry {
    pub bits: u8,
    pub symbol: u8,
}

/// Fills `table` (of `TABLE_SIZE` entries) from a canonical code definition.
///
/// `counts[l - 1]` is the number of codes of length `l`; `symbols` holds the
/// symbol values in code order (and may extend past this definition when a
/// DHT segment packs several tables). Returns the number of symbols consumed.
///
/// Codes are assigned by increasing length; a code of length `l` spreads over
/// `2^(16 - l)` consecutive entries. Residual entries are marked invalid
/// (zero bit-length). Oversubscribed definitions and definitions overrunning
/// the segment are syntax errors.
pub fn build_vlc_table(counts: &[u8; 16], symbols: &[u8], table: &mut [VlcEntry]) -> Result<usize> {
    debug_assert_eq!(table.len(), TABLE_SIZE);
    let mut remain = TABLE_SIZE as i32;
    let mut spread = TABLE_SIZE;
    let mut next = 0usize;
    let mut consumed = 0usize;
    for codelen in 1..=LOOKUP_BITS {
        spread >>= 1;
        let currcnt = counts[codelen - 1] as usize;
        if currcnt == 0 {
            continue;
        }
        if symbols.len() < consumed + currcnt {
            return Err(Error::SyntaxError("huffman table overruns segment"));
        }
        remain -= (currcnt << (LOOKUP_BITS - codelen)) as i32;
        if remain < 0 {
            return Err(Error::SyntaxError("oversubscribed huffman table"));
        }
        for &symbol in &symbols[consumed..consumed + currcnt] {
            for entry in &mut table[next..next + spread] {
                *entry = VlcEntry {
                    bits: codelen as u8,
                    symbol,
                };
            }
            next += spread;
        }
        consumed += currcnt;
    }
    // Bit patterns not covered by any code are invalid.
    for entry in &mut table[next..] {
        entry.bits = 0;
    }
    Ok(consumed)
}

/// Decodes one Huffman symbol plus its trailing value bits.
///
/// The symbol's low nibble is the magnitude category: that many raw bits
/// follow and are sign-extended by the JPEG rule (values below half the
/// category range are shifted negative). Returns `(symbol, value)`.
pub fn read_code(reader: &mut BitReader, table: &[VlcEntry]) -> Result<(u8, i32)> {
    let index = reader.peek(LOOKUP_BITS)? as usize;
    let entry = table[index];
    if entry.bits == 0 {
        return Err(Error::SyntaxError("invalid huffman code"));
    }
    reader.consume(entry.bits as usize)?;
    let category = (entry.symbol & 0x0F) as usize;
    if category == 0 {
        return Ok((entry.symbol, 0));
    }
    if category > MAX_CATEGORY {
        return Err(Error::SyntaxError("magnitude category out of range"));
    }
    let mut value = reader.read(category)? as i32;
    if value < (1 << (category - 1)) {
        value += ((-1i32) << category) + 1;
    }
    Ok((entry.symbol, value))
}
