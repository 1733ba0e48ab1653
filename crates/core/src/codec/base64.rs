//! Base-64 encode/decode filters.
//!
//! Standard alphabet, 4 characters per 3 bytes. `=` and end-of-input are both
//! valid terminators; a partial final group of 2 or 3 characters decodes to
//! 1 or 2 bytes.

use crate::buffer::StreamBuf;
use crate::codec::{LineWrap, Step, Wrapper};
use crate::error::{Result, StreamError};

const FILTER: &str = "Base64";

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn b64_value(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Streaming base-64 decoder. The tail is a partial 4-character group.
pub struct Base64Decoder {
    quad: [u8; 4],
    qlen: usize,
    done: bool,
    offset: u64,
}

impl Base64Decoder {
    pub fn new() -> Self {
        Self {
            quad: [0; 4],
            qlen: 0,
            done: false,
            offset: 0,
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            if self.done {
                // Swallow padding and whitespace trailing the terminator.
                while let Some(&b) = src.readable().first() {
                    match b {
                        b'=' | b' ' | b'\t' | b'\r' | b'\n' => {
                            src.consume(1);
                            self.offset += 1;
                        }
                        _ => break,
                    }
                }
                return Ok(Step::Eof);
            }
            let Some(&byte) = src.readable().first() else {
                if !flush {
                    return Ok(Step::Empty);
                }
                // End of input terminates exactly like '='.
                match self.finalize(dst)? {
                    Step::Full => return Ok(Step::Full),
                    _ => continue,
                }
            };
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    src.consume(1);
                    self.offset += 1;
                }
                b'=' => {
                    if self.qlen < 2 {
                        return Err(StreamError::MalformedInput {
                            filter: FILTER,
                            offset: self.offset,
                            msg: "padding inside an empty group".into(),
                        });
                    }
                    match self.finalize(dst)? {
                        Step::Full => return Ok(Step::Full),
                        _ => continue,
                    }
                }
                _ => {
                    let Some(value) = b64_value(byte) else {
                        return Err(StreamError::MalformedInput {
                            filter: FILTER,
                            offset: self.offset,
                            msg: format!("invalid character 0x{byte:02x}"),
                        });
                    };
                    if self.qlen == 3 {
                        if dst.space() < 3 {
                            return Ok(Step::Full);
                        }
                        let [a, b, c] = [self.quad[0], self.quad[1], self.quad[2]];
                        dst.push((a << 2) | (b >> 4));
                        dst.push((b << 4) | (c >> 2));
                        dst.push((c << 6) | value);
                        self.qlen = 0;
                    } else {
                        self.quad[self.qlen] = value;
                        self.qlen += 1;
                    }
                    src.consume(1);
                    self.offset += 1;
                }
            }
        }
    }

    /// Decode the partial final group. Marks the stream done unless the
    /// output has no room, in which case the tail is kept for a retry.
    fn finalize(&mut self, dst: &mut StreamBuf) -> Result<Step> {
        match self.qlen {
            0 => {}
            1 => return Err(StreamError::PrematureEnd { filter: FILTER }),
            2 => {
                if dst.space() < 1 {
                    return Ok(Step::Full);
                }
                dst.push((self.quad[0] << 2) | (self.quad[1] >> 4));
            }
            3 => {
                if dst.space() < 2 {
                    return Ok(Step::Full);
                }
                dst.push((self.quad[0] << 2) | (self.quad[1] >> 4));
                dst.push((self.quad[1] << 4) | (self.quad[2] >> 2));
            }
            _ => unreachable!("quad never holds a complete group"),
        }
        self.qlen = 0;
        self.done = true;
        Ok(Step::Eof)
    }
}

impl Default for Base64Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming base-64 encoder with optional line wrapping.
pub struct Base64Encoder {
    tail: [u8; 3],
    tlen: usize,
    wrap: Wrapper,
}

impl Base64Encoder {
    pub fn new(wrap: Option<LineWrap>) -> Self {
        Self {
            tail: [0; 3],
            tlen: 0,
            wrap: Wrapper::new(wrap),
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            while self.tlen < 3 {
                let Some(&b) = src.readable().first() else {
                    break;
                };
                self.tail[self.tlen] = b;
                self.tlen += 1;
                src.consume(1);
            }
            if self.tlen == 3 {
                if dst.space() < self.wrap.cost(4) {
                    return Ok(Step::Full);
                }
                let [b0, b1, b2] = self.tail;
                let unit = [
                    ALPHABET[(b0 >> 2) as usize],
                    ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize],
                    ALPHABET[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize],
                    ALPHABET[(b2 & 0x3f) as usize],
                ];
                self.wrap.emit(dst, &unit);
                self.tlen = 0;
                continue;
            }
            if !flush {
                return Ok(Step::Empty);
            }
            if self.tlen == 0 {
                return Ok(Step::Eof);
            }
            if dst.space() < self.wrap.cost(4) {
                return Ok(Step::Full);
            }
            let [b0, b1, _] = self.tail;
            let unit = match self.tlen {
                1 => [
                    ALPHABET[(b0 >> 2) as usize],
                    ALPHABET[((b0 & 0x03) << 4) as usize],
                    b'=',
                    b'=',
                ],
                _ => [
                    ALPHABET[(b0 >> 2) as usize],
                    ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize],
                    ALPHABET[((b1 & 0x0f) << 2) as usize],
                    b'=',
                ],
            };
            self.wrap.emit(dst, &unit);
            self.tlen = 0;
            return Ok(Step::Eof);
        }
    }
}
