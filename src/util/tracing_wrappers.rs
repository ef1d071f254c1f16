// Copyright (c) the camjpeg Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! No-op fallbacks for the `tracing` macros when the `tracing` feature is
//! disabled, so call sites don't need cfg guards.

#[cfg(feature = "tracing")]
pub use tracing::{debug, info, trace, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($rest:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! info {
    ($($rest:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($rest:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($rest:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{debug, info, trace, warn};
