// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker attach-stream demultiplexing.
//!
//! The daemon multiplexes stdout and stderr onto one connection using an
//! 8-byte frame header: one stream-type byte, three reserved bytes, and a
//! big-endian u32 payload length. Scanning that stream as text puts the
//! headers into the logs as binary garbage, so frames are decoded first
//! and only then assembled into lines.

use bytes::{Buf, Bytes, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

const HEADER_LEN: usize = 8;

/// Which half of the multiplexed stream a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl StreamKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(StreamKind::Stdin),
            1 => Some(StreamKind::Stdout),
            2 => Some(StreamKind::Stderr),
            _ => None,
        }
    }
}

/// One demultiplexed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: StreamKind,
    pub payload: Bytes,
}

/// Incremental decoder for the multiplexed framing.
///
/// A header whose length field claims more bytes than have arrived simply
/// waits; at EOF the truncated payload is yielded as a partial frame so
/// nothing already decoded is corrupted.
#[derive(Debug, Default)]
pub struct FrameDecoder;

impl FrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let kind = StreamKind::from_byte(src[0]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid stream-type byte {:#04x}", src[0]),
            )
        })?;
        let payload_len =
            u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;

        if src.len() < HEADER_LEN + payload_len {
            src.reserve(HEADER_LEN + payload_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(payload_len).freeze();
        Ok(Some(Frame { kind, payload }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        if src.len() < HEADER_LEN {
            // A torn header is unrecoverable; drop it.
            src.clear();
            return Ok(None);
        }

        // Header claims more payload than the stream delivered: yield the
        // truncated frame rather than losing it.
        let kind = StreamKind::from_byte(src[0]).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "invalid stream-type byte at eof")
        })?;
        src.advance(HEADER_LEN);
        let payload = src.split_to(src.len()).freeze();
        Ok(Some(Frame { kind, payload }))
    }
}

/// Reassembles frame payloads into complete text lines.
///
/// Frames are not line-aligned; a line may span frames, and stdout and
/// stderr interleave, so each stream keeps its own partial buffer.
/// Invalid UTF-8 is replaced rather than dropped.
#[derive(Debug, Default)]
pub struct LineAssembler {
    stdout: String,
    stderr: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame; returns the lines it completed, in order.
    pub fn push(&mut self, frame: &Frame) -> Vec<(StreamKind, String)> {
        let kind = match frame.kind {
            // Stdin frames never appear on the read side; treat them as
            // stdout rather than silently discarding bytes.
            StreamKind::Stdin | StreamKind::Stdout => StreamKind::Stdout,
            StreamKind::Stderr => StreamKind::Stderr,
        };
        let buf = match kind {
            StreamKind::Stderr => &mut self.stderr,
            _ => &mut self.stdout,
        };
        buf.push_str(&String::from_utf8_lossy(&frame.payload));

        let mut lines = Vec::new();
        while let Some(pos) = buf.find('\n') {
            let mut line: String = buf.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push((kind, line));
        }
        lines
    }

    /// Flush whatever partial lines remain (called at stream EOF).
    pub fn finish(&mut self) -> Vec<(StreamKind, String)> {
        let mut lines = Vec::new();
        for (kind, buf) in [
            (StreamKind::Stdout, &mut self.stdout),
            (StreamKind::Stderr, &mut self.stderr),
        ] {
            if !buf.is_empty() {
                let mut line = std::mem::take(buf);
                if line.ends_with('\r') {
                    line.pop();
                }
                lines.push((kind, line));
            }
        }
        lines
    }
}

#[cfg(test)]
#[path = "demux_tests.rs"]
mod tests;
