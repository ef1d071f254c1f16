// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub mod tracing_wrappers;

use crate::error::Result;

/// Clamps a fixed-point intermediate to the 8-bit sample range.
#[inline]
pub(crate) fn clip(x: i32) -> u8 {
    x.clamp(0, 255) as u8
}

/// Allocates a zero-filled pixel buffer, reporting allocation failure as
/// `Error::OutOfMemory` instead of aborting.
pub(crate) fn try_alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, 0);
    Ok(v)
}
