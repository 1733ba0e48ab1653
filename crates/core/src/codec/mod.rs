//! Codec state machines for the filter pipeline.
//!
//! This module contains:
//! - `base16`: ASCIIHex encoding/decoding
//! - `base64`: base-64 encoding/decoding
//! - `base85`: Adobe ASCII85 encoding/decoding
//! - `runlength`: PostScript run-length coding
//! - `eexec`: Type 1 font-program cipher
//! - `predictor`: PNG Up / TIFF horizontal row differencing
//! - `arcfour`: RC4 stream cipher
//! - `aes`: AES stream encryption (CTR and CBC)
//! - `flate`: zlib/deflate adapter
//! - `lzw`: LZW adapter
//!
//! Every state machine exposes the same resumable contract:
//! `step(src, dst, flush)` consumes as much input and produces as much output
//! as fits, parks anything incomplete in its tail state, and reports a
//! [`Step`]. Malformed data surfaces as an error, never a panic.

pub mod aes;
pub mod arcfour;
pub mod base16;
pub mod base64;
pub mod base85;
pub mod eexec;
pub mod flate;
pub mod lzw;
pub mod predictor;
pub mod runlength;

use crate::buffer::StreamBuf;
use crate::error::Result;

pub use aes::{AesDecryptor, AesEncryptor, AesMode, AesParams};
pub use arcfour::{Arcfour, ArcfourCodec};
pub use base16::{HexCase, HexDecoder, HexEncoder};
pub use base64::{Base64Decoder, Base64Encoder};
pub use base85::{Base85Decoder, Base85Encoder};
pub use eexec::{EexecDecoder, EexecEncoder};
pub use flate::{FlateDecoder, FlateEncoder};
pub use lzw::{LzwDecoder, LzwEncoder};
pub use predictor::{PredictorDecoder, PredictorEncoder, PredictorKind, PredictorParams};
pub use runlength::{RunLengthDecoder, RunLengthEncoder};

/// Outcome of one codec step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Output space exhausted. Drain the output buffer and step again.
    Full,
    /// More input is required before more output can be produced. Never
    /// returned once `flush` is set: a flushing codec either finalizes or
    /// reports an error.
    Empty,
    /// Terminal condition reached; no further output will ever be produced.
    Eof,
}

/// Line-wrapping configuration for the text encoders.
///
/// A newline is inserted immediately before any unit that would cross
/// `max_line_width`. `line_start_offset` is the column already occupied on
/// the first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWrap {
    pub line_start_offset: usize,
    pub max_line_width: usize,
}

/// Output-column tracker shared by the wrapping encoders.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Wrapper {
    column: usize,
    width: usize,
}

impl Wrapper {
    pub(crate) fn new(cfg: Option<LineWrap>) -> Self {
        match cfg {
            Some(w) => Self {
                column: w.line_start_offset,
                width: w.max_line_width,
            },
            None => Self { column: 0, width: 0 },
        }
    }

    /// Output bytes needed to place a unit of `n` characters.
    pub(crate) fn cost(&self, n: usize) -> usize {
        if self.width > 0 && self.column + n > self.width {
            n + 1
        } else {
            n
        }
    }

    /// Emit `unit`, preceded by a newline when it would cross the width.
    /// The caller has already checked `dst.space() >= cost(unit.len())`.
    pub(crate) fn emit(&mut self, dst: &mut StreamBuf, unit: &[u8]) {
        if self.width > 0 && self.column + unit.len() > self.width {
            dst.push(b'\n');
            self.column = 0;
        }
        dst.extend_from_slice(unit);
        self.column += unit.len();
    }
}

/// Closed set of codec state machines.
///
/// The set of formats is fixed at compile time, so dispatch is a plain match
/// instead of a per-node function pointer.
pub enum Codec {
    HexDecode(HexDecoder),
    HexEncode(HexEncoder),
    Base64Decode(Base64Decoder),
    Base64Encode(Base64Encoder),
    Base85Decode(Base85Decoder),
    Base85Encode(Base85Encoder),
    RunLengthDecode(RunLengthDecoder),
    RunLengthEncode(RunLengthEncoder),
    EexecDecode(EexecDecoder),
    EexecEncode(EexecEncoder),
    PredictorDecode(PredictorDecoder),
    PredictorEncode(PredictorEncoder),
    ArcfourCrypt(ArcfourCodec),
    AesEncrypt(AesEncryptor),
    AesDecrypt(AesDecryptor),
    FlateDecode(FlateDecoder),
    FlateEncode(FlateEncoder),
    LzwDecode(LzwDecoder),
    LzwEncode(LzwEncoder),
}

impl Codec {
    /// Filter name used in error context.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::HexDecode(_) | Codec::HexEncode(_) => "ASCIIHex",
            Codec::Base64Decode(_) | Codec::Base64Encode(_) => "Base64",
            Codec::Base85Decode(_) | Codec::Base85Encode(_) => "ASCII85",
            Codec::RunLengthDecode(_) | Codec::RunLengthEncode(_) => "RunLength",
            Codec::EexecDecode(_) | Codec::EexecEncode(_) => "Eexec",
            Codec::PredictorDecode(_) | Codec::PredictorEncode(_) => "Predictor",
            Codec::ArcfourCrypt(_) => "RC4",
            Codec::AesEncrypt(_) | Codec::AesDecrypt(_) => "AES",
            Codec::FlateDecode(_) | Codec::FlateEncode(_) => "Flate",
            Codec::LzwDecode(_) | Codec::LzwEncode(_) => "LZW",
        }
    }

    /// Run one resumable step: consume from `src`, produce into `dst`.
    ///
    /// `flush` means no further input will ever arrive; the codec must emit
    /// trailing groups and report [`Step::Eof`] once done.
    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        match self {
            Codec::HexDecode(c) => c.step(src, dst, flush),
            Codec::HexEncode(c) => c.step(src, dst, flush),
            Codec::Base64Decode(c) => c.step(src, dst, flush),
            Codec::Base64Encode(c) => c.step(src, dst, flush),
            Codec::Base85Decode(c) => c.step(src, dst, flush),
            Codec::Base85Encode(c) => c.step(src, dst, flush),
            Codec::RunLengthDecode(c) => c.step(src, dst, flush),
            Codec::RunLengthEncode(c) => c.step(src, dst, flush),
            Codec::EexecDecode(c) => c.step(src, dst, flush),
            Codec::EexecEncode(c) => c.step(src, dst, flush),
            Codec::PredictorDecode(c) => c.step(src, dst, flush),
            Codec::PredictorEncode(c) => c.step(src, dst, flush),
            Codec::ArcfourCrypt(c) => c.step(src, dst, flush),
            Codec::AesEncrypt(c) => c.step(src, dst, flush),
            Codec::AesDecrypt(c) => c.step(src, dst, flush),
            Codec::FlateDecode(c) => c.step(src, dst, flush),
            Codec::FlateEncode(c) => c.step(src, dst, flush),
            Codec::LzwDecode(c) => c.step(src, dst, flush),
            Codec::LzwEncode(c) => c.step(src, dst, flush),
        }
    }
}
