//! ASCIIHex encode/decode filters.
//!
//! Two hex characters per byte. The decoder accepts both alphabets, skips
//! ASCII whitespace between digits, and completes an odd trailing digit with
//! `0` at flush.

use crate::buffer::StreamBuf;
use crate::codec::{LineWrap, Step, Wrapper};
use crate::error::{Result, StreamError};

const FILTER: &str = "ASCIIHex";

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";
const HEX_LOWER: &[u8; 16] = b"0123456789abcdef";

/// Output alphabet for [`HexEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexCase {
    Upper,
    Lower,
}

fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Streaming ASCIIHex decoder. The tail is at most one pending nibble.
pub struct HexDecoder {
    pending: Option<u8>,
    offset: u64,
}

impl HexDecoder {
    pub fn new() -> Self {
        Self {
            pending: None,
            offset: 0,
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            let Some(&byte) = src.readable().first() else {
                if !flush {
                    return Ok(Step::Empty);
                }
                // An odd trailing digit decodes as if followed by 0.
                if let Some(high) = self.pending {
                    if dst.space() == 0 {
                        return Ok(Step::Full);
                    }
                    dst.push(high << 4);
                    self.pending = None;
                }
                return Ok(Step::Eof);
            };
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => {}
                _ => {
                    let Some(nibble) = hex_nibble(byte) else {
                        return Err(StreamError::MalformedInput {
                            filter: FILTER,
                            offset: self.offset,
                            msg: format!("invalid character 0x{byte:02x}"),
                        });
                    };
                    match self.pending {
                        Some(high) => {
                            if dst.space() == 0 {
                                return Ok(Step::Full);
                            }
                            dst.push((high << 4) | nibble);
                            self.pending = None;
                        }
                        None => self.pending = Some(nibble),
                    }
                }
            }
            src.consume(1);
            self.offset += 1;
        }
    }
}

impl Default for HexDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming ASCIIHex encoder with optional line wrapping.
pub struct HexEncoder {
    case: HexCase,
    wrap: Wrapper,
}

impl HexEncoder {
    pub fn new(case: HexCase, wrap: Option<LineWrap>) -> Self {
        Self {
            case,
            wrap: Wrapper::new(wrap),
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        let table = match self.case {
            HexCase::Upper => HEX_UPPER,
            HexCase::Lower => HEX_LOWER,
        };
        loop {
            let Some(&byte) = src.readable().first() else {
                return Ok(if flush { Step::Eof } else { Step::Empty });
            };
            if dst.space() < self.wrap.cost(2) {
                return Ok(Step::Full);
            }
            let unit = [table[(byte >> 4) as usize], table[(byte & 0x0f) as usize]];
            self.wrap.emit(dst, &unit);
            src.consume(1);
        }
    }
}
