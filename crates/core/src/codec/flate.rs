//! Flate (zlib/deflate) adapter filters.
//!
//! Wraps `flate2`'s raw streaming state onto the step contract. Consumption
//! and production are recovered from the `total_in`/`total_out` deltas, so
//! the adapter resumes cleanly across arbitrary chunk boundaries.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::buffer::StreamBuf;
use crate::codec::Step;
use crate::error::{Result, StreamError};

const FILTER: &str = "Flate";

/// Streaming zlib decoder.
pub struct FlateDecoder {
    z: Decompress,
    done: bool,
    offset: u64,
}

impl FlateDecoder {
    pub fn new() -> Self {
        Self {
            z: Decompress::new(true),
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
            let before_in = self.z.total_in();
            let before_out = self.z.total_out();
            let mode = if flush {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };
            let z = &mut self.z;
            let offset = self.offset;
            let mut status = Status::Ok;
            dst.with_space(|out| match z.decompress(src.readable(), out, mode) {
                Ok(s) => {
                    status = s;
                    Ok((z.total_out() - before_out) as usize)
                }
                Err(e) => Err(StreamError::MalformedInput {
                    filter: FILTER,
                    offset,
                    msg: e.to_string(),
                }),
            })?;
            let consumed = (self.z.total_in() - before_in) as usize;
            let produced = (self.z.total_out() - before_out) as usize;
            src.consume(consumed);
            self.offset += consumed as u64;
            match status {
                Status::StreamEnd => {
                    self.done = true;
                    return Ok(Step::Eof);
                }
                Status::Ok | Status::BufError => {
                    if dst.space() == 0 {
                        return Ok(Step::Full);
                    }
                    if src.is_empty() {
                        if !flush {
                            return Ok(Step::Empty);
                        }
                        if produced == 0 {
                            // Finish could not complete: truncated stream.
                            return Err(StreamError::PrematureEnd { filter: FILTER });
                        }
                    } else if consumed == 0 && produced == 0 {
                        return Err(StreamError::MalformedInput {
                            filter: FILTER,
                            offset: self.offset,
                            msg: "decoder made no progress".into(),
                        });
                    }
                }
            }
        }
    }
}

impl Default for FlateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming zlib encoder.
pub struct FlateEncoder {
    z: Compress,
    done: bool,
}

impl FlateEncoder {
    pub fn new(level: Compression) -> Self {
        Self {
            z: Compress::new(level, true),
            done: false,
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
            let before_in = self.z.total_in();
            let before_out = self.z.total_out();
            let mode = if flush {
                FlushCompress::Finish
            } else {
                FlushCompress::None
            };
            let z = &mut self.z;
            let mut status = Status::Ok;
            dst.with_space(|out| match z.compress(src.readable(), out, mode) {
                Ok(s) => {
                    status = s;
                    Ok((z.total_out() - before_out) as usize)
                }
                Err(e) => Err(StreamError::MalformedInput {
                    filter: FILTER,
                    offset: before_in,
                    msg: e.to_string(),
                }),
            })?;
            let consumed = (self.z.total_in() - before_in) as usize;
            let produced = (self.z.total_out() - before_out) as usize;
            src.consume(consumed);
            match status {
                Status::StreamEnd => {
                    self.done = true;
                    return Ok(Step::Eof);
                }
                Status::Ok | Status::BufError => {
                    if dst.space() == 0 {
                        return Ok(Step::Full);
                    }
                    if src.is_empty() && !flush {
                        return Ok(Step::Empty);
                    }
                    if !src.is_empty() && consumed == 0 && produced == 0 {
                        return Err(StreamError::MalformedInput {
                            filter: FILTER,
                            offset: before_in,
                            msg: "encoder made no progress".into(),
                        });
                    }
                    // With flush set, keep finishing until StreamEnd.
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_small_buffers() {
        let data: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();
        let mut src = StreamBuf::detached(data.len()).unwrap();
        src.extend_from_slice(&data);
        let mut packed = Vec::new();
        let mut mid = StreamBuf::detached(64).unwrap();
        let mut enc = FlateEncoder::new(Compression::default());
        loop {
            let step = enc.step(&mut src, &mut mid, true).unwrap();
            packed.extend_from_slice(mid.readable());
            mid.consume(mid.available());
            if step == Step::Eof {
                break;
            }
        }

        let mut src = StreamBuf::detached(packed.len()).unwrap();
        src.extend_from_slice(&packed);
        let mut out = Vec::new();
        let mut mid = StreamBuf::detached(64).unwrap();
        let mut dec = FlateDecoder::new();
        loop {
            let step = dec.step(&mut src, &mut mid, true).unwrap();
            out.extend_from_slice(mid.readable());
            mid.consume(mid.available());
            if step == Step::Eof {
                break;
            }
        }
        assert_eq!(out, data);
    }
}
