// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-minute log archiving.
//!
//! The host's attach fan-out feeds lines in here; they accumulate in
//! in-memory minute windows and, once a window's minute is old enough,
//! a worker pool gzips and uploads it to the object store, recording a
//! LogReference row. Re-uploads into an existing minute append to the
//! object (decompress, separator, recompress) instead of clobbering it.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod archiver;
mod upload;
mod window;

pub use archiver::{ArchiverConfig, ArchiverError, ArchiverMetrics, LogArchiver};
pub use upload::{gunzip, gzip, object_key, UploadOutcome};
pub use window::{format_line, minute_of, LogLine, MinuteWindow, WindowKey};
