// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::TryReserveError;

use thiserror::Error;

/// Decoding failures, in rough order of severity.
///
/// `NotAJpeg` and `SyntaxError` are routine for a corrupted camera frame and
/// callers are expected to drop the frame and move on; `OutOfMemory` and
/// `InternalError` indicate conditions worth escalating.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not a JPEG stream: missing start-of-image marker")]
    NotAJpeg,
    #[error("Unsupported JPEG feature: {0}")]
    UnsupportedFormat(&'static str),
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("Syntax error: {0}")]
    SyntaxError(&'static str),
    #[error("Internal error: {0}")]
    InternalError(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
