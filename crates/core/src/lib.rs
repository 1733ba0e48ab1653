//! orinoco - a composable streaming codec pipeline for document generation.
//!
//! Chains of stream nodes apply byte encodings transparently: reading from
//! the head of a decode chain or writing into the head of an encode chain
//! runs the payload through hex, base-64, base-85, run-length, eexec,
//! predictor, RC4/AES, flate or LZW filters, in bounded memory, with state
//! that resumes across whatever chunk boundaries the caller picks.

pub mod buffer;
pub mod chain;
pub mod codec;
pub mod error;
pub mod pool;
pub mod stream;

pub use buffer::{CHUNK_SIZE, ChunkPool, StreamBuf};
pub use chain::{Compression, DecodeFilter, EncodeFilter, make_decoder, make_encoder};
pub use codec::{
    AesMode, AesParams, Codec, HexCase, LineWrap, PredictorKind, PredictorParams, Step,
};
pub use error::{Result, StreamError};
pub use stream::{
    IoSink, IoSource, Link, MemorySink, MemorySource, RawSink, RawSource, SharedNode, StreamNode,
};
