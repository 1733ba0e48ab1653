//! LZW adapter filters, using the weezl crate (MSB first, 8-bit symbols).
//!
//! Decoding accepts the EarlyChange toggle: the default uses the code-size
//! switch one code early, EarlyChange=0 uses TIFF-style switching. A stream
//! that ends without the explicit end-of-data code is treated as complete,
//! matching how permissive consumers read legacy data.

use weezl::{BitOrder, LzwStatus, decode, encode};

use crate::buffer::StreamBuf;
use crate::codec::Step;
use crate::error::{Result, StreamError};

const FILTER: &str = "LZW";

/// Streaming LZW decoder.
pub struct LzwDecoder {
    inner: decode::Decoder,
    done: bool,
    offset: u64,
}

impl LzwDecoder {
    pub fn new(early_change: bool) -> Self {
        let inner = if early_change {
            decode::Decoder::new(BitOrder::Msb, 8)
        } else {
            decode::Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
        };
        Self {
            inner,
            done: false,
            offset: 0,
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            if self.done {
                return Ok(Step::Eof);
            }
            if dst.space() == 0 {
                return Ok(Step::Full);
            }
            let inner = &mut self.inner;
            let offset = self.offset;
            let mut status = LzwStatus::Ok;
            let mut consumed = 0usize;
            dst.with_space(|out| {
                let result = inner.decode_bytes(src.readable(), out);
                consumed = result.consumed_in;
                match result.status {
                    Ok(s) => {
                        status = s;
                        Ok(result.consumed_out)
                    }
                    Err(e) => Err(StreamError::MalformedInput {
                        filter: FILTER,
                        offset,
                        msg: e.to_string(),
                    }),
                }
            })?;
            src.consume(consumed);
            self.offset += consumed as u64;
            match status {
                LzwStatus::Done => {
                    self.done = true;
                    return Ok(Step::Eof);
                }
                LzwStatus::Ok => {
                    if dst.space() == 0 {
                        return Ok(Step::Full);
                    }
                    if src.is_empty() && !flush {
                        return Ok(Step::Empty);
                    }
                }
                LzwStatus::NoProgress => {
                    if !flush {
                        return Ok(Step::Empty);
                    }
                    // End of input without the EOD code.
                    self.done = true;
                    return Ok(Step::Eof);
                }
            }
        }
    }
}

/// Streaming LZW encoder.
pub struct LzwEncoder {
    inner: encode::Encoder,
    finished: bool,
    done: bool,
}

impl LzwEncoder {
    pub fn new() -> Self {
        Self {
            inner: encode::Encoder::new(BitOrder::Msb, 8),
            finished: false,
            done: false,
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            if self.done {
                return Ok(Step::Eof);
            }
            if flush && !self.finished && src.is_empty() {
                // All input consumed: emit the end-of-data code and the
                // final partial code word.
                self.inner.finish();
                self.finished = true;
            }
            if dst.space() == 0 {
                return Ok(Step::Full);
            }
            let inner = &mut self.inner;
            let mut status = LzwStatus::Ok;
            let mut consumed = 0usize;
            dst.with_space(|out| {
                let result = inner.encode_bytes(src.readable(), out);
                consumed = result.consumed_in;
                match result.status {
                    Ok(s) => {
                        status = s;
                        Ok(result.consumed_out)
                    }
                    Err(e) => Err(StreamError::MalformedInput {
                        filter: FILTER,
                        offset: 0,
                        msg: e.to_string(),
                    }),
                }
            })?;
            src.consume(consumed);
            match status {
                LzwStatus::Done => {
                    self.done = true;
                    return Ok(Step::Eof);
                }
                LzwStatus::Ok => {
                    if dst.space() == 0 {
                        return Ok(Step::Full);
                    }
                    if src.is_empty() && !flush {
                        return Ok(Step::Empty);
                    }
                }
                LzwStatus::NoProgress => {
                    if !flush {
                        return Ok(Step::Empty);
                    }
                    if self.finished {
                        self.done = true;
                        return Ok(Step::Eof);
                    }
                }
            }
        }
    }
}

impl Default for LzwEncoder {
    fn default() -> Self {
        Self::new()
    }
}
