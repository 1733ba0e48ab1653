//! Chain constructors: validate parameters, bind a codec to a pooled node,
//! and link it to the rest of the chain.
//!
//! Decoders stack upward from a source node, encoders stack downward onto a
//! sink node; either end of a stack can also be a shared node reachable from
//! another chain. Parameter validation happens before any pool slot is
//! taken, so a failed construction allocates nothing.

pub use flate2::Compression;

use crate::buffer::ChunkPool;
use crate::codec::{
    AesDecryptor, AesEncryptor, AesParams, ArcfourCodec, Base64Decoder, Base64Encoder,
    Base85Decoder, Base85Encoder, Codec, EexecDecoder, EexecEncoder, FlateDecoder, FlateEncoder,
    HexCase, HexDecoder, HexEncoder, LineWrap, LzwDecoder, LzwEncoder, PredictorDecoder,
    PredictorEncoder, PredictorParams, RunLengthDecoder, RunLengthEncoder,
};
use crate::error::{Result, StreamError};
use crate::stream::{Link, StreamNode};

/// Filter selection for a decoder node.
pub enum DecodeFilter {
    Hex,
    Base64,
    Base85,
    RunLength,
    Eexec,
    Predictor(PredictorParams),
    Arcfour { key: Vec<u8> },
    Aes(AesParams),
    Flate,
    Lzw { early_change: bool },
}

/// Filter selection for an encoder node.
pub enum EncodeFilter {
    Hex {
        case: HexCase,
        wrap: Option<LineWrap>,
    },
    Base64 {
        wrap: Option<LineWrap>,
    },
    Base85 {
        wrap: Option<LineWrap>,
    },
    RunLength,
    Eexec,
    Predictor(PredictorParams),
    Arcfour {
        key: Vec<u8>,
    },
    Aes(AesParams),
    Flate {
        level: Compression,
    },
    Lzw,
}

fn validate_wrap(wrap: Option<&LineWrap>, filter: &'static str) -> Result<()> {
    if let Some(w) = wrap {
        if w.max_line_width == 0 {
            return Err(StreamError::MalformedInput {
                filter,
                offset: 0,
                msg: "zero line width".into(),
            });
        }
    }
    Ok(())
}

fn validate_rc4_key(key: &[u8]) -> Result<()> {
    if key.is_empty() || key.len() > 256 {
        return Err(StreamError::MalformedInput {
            filter: "RC4",
            offset: 0,
            msg: format!("key must be 1-256 bytes, got {}", key.len()),
        });
    }
    Ok(())
}

/// Build a decoder node that reads decoded bytes through `filter` from
/// `upstream`. Pass the upstream node by value for exclusive ownership or as
/// a [`crate::stream::SharedNode`] when another chain keeps a handle to it.
pub fn make_decoder(
    pool: &ChunkPool,
    upstream: impl Into<Link>,
    filter: DecodeFilter,
) -> Result<StreamNode> {
    let codec = match filter {
        DecodeFilter::Hex => Codec::HexDecode(HexDecoder::new()),
        DecodeFilter::Base64 => Codec::Base64Decode(Base64Decoder::new()),
        DecodeFilter::Base85 => Codec::Base85Decode(Base85Decoder::new()),
        DecodeFilter::RunLength => Codec::RunLengthDecode(RunLengthDecoder::new()),
        DecodeFilter::Eexec => Codec::EexecDecode(EexecDecoder::new()),
        DecodeFilter::Predictor(params) => Codec::PredictorDecode(PredictorDecoder::new(params)?),
        DecodeFilter::Arcfour { key } => {
            validate_rc4_key(&key)?;
            Codec::ArcfourCrypt(ArcfourCodec::new(&key))
        }
        DecodeFilter::Aes(params) => {
            params.validate()?;
            Codec::AesDecrypt(AesDecryptor::new(&params))
        }
        DecodeFilter::Flate => Codec::FlateDecode(FlateDecoder::new()),
        DecodeFilter::Lzw { early_change } => Codec::LzwDecode(LzwDecoder::new(early_change)),
    };
    StreamNode::decoder(pool, codec, upstream.into())
}

/// Build an encoder node that accepts raw bytes and pushes encoded bytes
/// into `downstream`.
pub fn make_encoder(
    pool: &ChunkPool,
    downstream: impl Into<Link>,
    filter: EncodeFilter,
) -> Result<StreamNode> {
    let codec = match filter {
        EncodeFilter::Hex { case, wrap } => {
            validate_wrap(wrap.as_ref(), "ASCIIHex")?;
            Codec::HexEncode(HexEncoder::new(case, wrap))
        }
        EncodeFilter::Base64 { wrap } => {
            validate_wrap(wrap.as_ref(), "Base64")?;
            Codec::Base64Encode(Base64Encoder::new(wrap))
        }
        EncodeFilter::Base85 { wrap } => {
            validate_wrap(wrap.as_ref(), "ASCII85")?;
            Codec::Base85Encode(Base85Encoder::new(wrap))
        }
        EncodeFilter::RunLength => Codec::RunLengthEncode(RunLengthEncoder::new()),
        EncodeFilter::Eexec => Codec::EexecEncode(EexecEncoder::new()),
        EncodeFilter::Predictor(params) => Codec::PredictorEncode(PredictorEncoder::new(params)?),
        EncodeFilter::Arcfour { key } => {
            validate_rc4_key(&key)?;
            Codec::ArcfourCrypt(ArcfourCodec::new(&key))
        }
        EncodeFilter::Aes(params) => {
            params.validate()?;
            Codec::AesEncrypt(AesEncryptor::new(&params))
        }
        EncodeFilter::Flate { level } => Codec::FlateEncode(FlateEncoder::new(level)),
        EncodeFilter::Lzw => Codec::LzwEncode(LzwEncoder::new()),
    };
    StreamNode::encoder(pool, codec, downstream.into())
}
