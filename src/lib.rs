// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#![deny(unsafe_code)]
pub mod bit_reader;
pub mod block;
pub mod color;
pub mod decode;
pub mod error;
pub mod huffman;
pub mod idct;
pub mod markers;
pub mod upsample;
pub mod util;

pub use decode::{DecodeOptions, DecodedImage, DecoderContext, State, decode_frame};
pub use error::{Error, Result};
pub use upsample::ChromaUpsampling;

const BLOCK_DIM: usize = 8;
const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;
