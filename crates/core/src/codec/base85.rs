//! ASCII85 (Adobe base-85) encode/decode filters.
//!
//! Five characters `!`..`u` per 4-byte group, `z` shorthand for an all-zero
//! group. A partial final group of n characters is padded with `u` before the
//! division-based decode and yields n-1 bytes. Stream framing (`<~` / `~>`)
//! belongs to the surrounding document generator, not to this filter.

use crate::buffer::StreamBuf;
use crate::codec::{LineWrap, Step, Wrapper};
use crate::error::{Result, StreamError};

const FILTER: &str = "ASCII85";

fn group_value(chars: &[u8; 5], offset: u64) -> Result<u32> {
    let mut value: u64 = 0;
    for &c in chars {
        value = value * 85 + (c - b'!') as u64;
    }
    if value > u32::MAX as u64 {
        return Err(StreamError::MalformedInput {
            filter: FILTER,
            offset,
            msg: "group value exceeds 32 bits".into(),
        });
    }
    Ok(value as u32)
}

/// Streaming ASCII85 decoder. The tail is a partial 5-character group.
pub struct Base85Decoder {
    group: [u8; 5],
    glen: usize,
    offset: u64,
}

impl Base85Decoder {
    pub fn new() -> Self {
        Self {
            group: [0; 5],
            glen: 0,
            offset: 0,
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            let Some(&byte) = src.readable().first() else {
                if !flush {
                    return Ok(Step::Empty);
                }
                return self.finalize(dst);
            };
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    src.consume(1);
                    self.offset += 1;
                }
                b'z' => {
                    if self.glen != 0 {
                        return Err(StreamError::MalformedInput {
                            filter: FILTER,
                            offset: self.offset,
                            msg: "z inside a group".into(),
                        });
                    }
                    if dst.space() < 4 {
                        return Ok(Step::Full);
                    }
                    dst.extend_from_slice(&[0, 0, 0, 0]);
                    src.consume(1);
                    self.offset += 1;
                }
                b'!'..=b'u' => {
                    if self.glen == 4 {
                        if dst.space() < 4 {
                            return Ok(Step::Full);
                        }
                        let chars = [
                            self.group[0],
                            self.group[1],
                            self.group[2],
                            self.group[3],
                            byte,
                        ];
                        let value = group_value(&chars, self.offset)?;
                        dst.extend_from_slice(&value.to_be_bytes());
                        self.glen = 0;
                    } else {
                        self.group[self.glen] = byte;
                        self.glen += 1;
                    }
                    src.consume(1);
                    self.offset += 1;
                }
                _ => {
                    return Err(StreamError::MalformedInput {
                        filter: FILTER,
                        offset: self.offset,
                        msg: format!("invalid character 0x{byte:02x}"),
                    });
                }
            }
        }
    }

    /// Decode the `u`-padded partial final group.
    fn finalize(&mut self, dst: &mut StreamBuf) -> Result<Step> {
        match self.glen {
            0 => Ok(Step::Eof),
            1 => Err(StreamError::PrematureEnd { filter: FILTER }),
            n => {
                if dst.space() < n - 1 {
                    return Ok(Step::Full);
                }
                let mut padded = [b'u'; 5];
                padded[..n].copy_from_slice(&self.group[..n]);
                let value = group_value(&padded, self.offset)?;
                dst.extend_from_slice(&value.to_be_bytes()[..n - 1]);
                self.glen = 0;
                Ok(Step::Eof)
            }
        }
    }
}

impl Default for Base85Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming ASCII85 encoder with optional line wrapping.
pub struct Base85Encoder {
    tail: [u8; 4],
    tlen: usize,
    wrap: Wrapper,
}

impl Base85Encoder {
    pub fn new(wrap: Option<LineWrap>) -> Self {
        Self {
            tail: [0; 4],
            tlen: 0,
            wrap: Wrapper::new(wrap),
        }
    }

    fn encode_group(value: u32) -> [u8; 5] {
        let mut chars = [0u8; 5];
        let mut v = value;
        for slot in chars.iter_mut().rev() {
            *slot = (v % 85) as u8 + b'!';
            v /= 85;
        }
        chars
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            while self.tlen < 4 {
                let Some(&b) = src.readable().first() else {
                    break;
                };
                self.tail[self.tlen] = b;
                self.tlen += 1;
                src.consume(1);
            }
            if self.tlen == 4 {
                let value = u32::from_be_bytes(self.tail);
                if value == 0 {
                    if dst.space() < self.wrap.cost(1) {
                        return Ok(Step::Full);
                    }
                    self.wrap.emit(dst, b"z");
                } else {
                    if dst.space() < self.wrap.cost(5) {
                        return Ok(Step::Full);
                    }
                    self.wrap.emit(dst, &Self::encode_group(value));
                }
                self.tlen = 0;
                continue;
            }
            if !flush {
                return Ok(Step::Empty);
            }
            if self.tlen == 0 {
                return Ok(Step::Eof);
            }
            // Partial final group: n bytes emit n+1 characters, zero-padded,
            // never the z shorthand.
            if dst.space() < self.wrap.cost(self.tlen + 1) {
                return Ok(Step::Full);
            }
            let mut padded = [0u8; 4];
            padded[..self.tlen].copy_from_slice(&self.tail[..self.tlen]);
            let chars = Self::encode_group(u32::from_be_bytes(padded));
            self.wrap.emit(dst, &chars[..self.tlen + 1]);
            self.tlen = 0;
            return Ok(Step::Eof);
        }
    }
}
