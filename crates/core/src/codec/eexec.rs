//! Type 1 font-program (eexec) cipher filters.
//!
//! Multiplicative/additive stream cipher with the published initial key. The
//! first four plaintext bytes are padding and are always discarded. Legacy
//! ciphertext comes in two transports; the decoder keeps the historical
//! heuristic: buffer the first four ciphertext bytes and use the hex path
//! only when all four are ASCII hex digits. The encoder emits binary; hex
//! transport is obtained by stacking an ASCIIHex encoder on top.

use crate::buffer::StreamBuf;
use crate::codec::Step;
use crate::error::{Result, StreamError};

const FILTER: &str = "Eexec";

/// Published initial cipher key.
const KEY: u16 = 55665;
const C1: u16 = 52845;
const C2: u16 = 22719;

/// Length of the discarded lead-in.
const LEAD_LEN: usize = 4;

fn decrypt_byte(r: &mut u16, cipher: u8) -> u8 {
    let plain = cipher ^ (*r >> 8) as u8;
    *r = (cipher as u16)
        .wrapping_add(*r)
        .wrapping_mul(C1)
        .wrapping_add(C2);
    plain
}

fn encrypt_byte(r: &mut u16, plain: u8) -> u8 {
    let cipher = plain ^ (*r >> 8) as u8;
    *r = (cipher as u16)
        .wrapping_add(*r)
        .wrapping_mul(C1)
        .wrapping_add(C2);
    cipher
}

fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Detect,
    Binary,
    Hex,
}

/// Streaming eexec decoder with hex/binary auto-detection.
pub struct EexecDecoder {
    r: u16,
    mode: Mode,
    /// Ciphertext lookahead used for detection, replayed afterwards.
    lead: [u8; LEAD_LEN],
    lead_len: usize,
    replay: usize,
    /// Plaintext lead-in bytes still to discard.
    skip: usize,
    /// High nibble pending in hex mode.
    pending: Option<u8>,
    offset: u64,
}

impl EexecDecoder {
    pub fn new() -> Self {
        Self {
            r: KEY,
            mode: Mode::Detect,
            lead: [0; LEAD_LEN],
            lead_len: 0,
            replay: 0,
            skip: LEAD_LEN,
            pending: None,
            offset: 0,
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        if self.mode == Mode::Detect {
            while self.lead_len < LEAD_LEN {
                let Some(&byte) = src.readable().first() else {
                    if !flush {
                        return Ok(Step::Empty);
                    }
                    break;
                };
                self.lead[self.lead_len] = byte;
                self.lead_len += 1;
                src.consume(1);
                self.offset += 1;
            }
            let window = &self.lead[..self.lead_len];
            self.mode = if self.lead_len == LEAD_LEN && window.iter().all(u8::is_ascii_hexdigit) {
                Mode::Hex
            } else {
                Mode::Binary
            };
        }
        loop {
            // Next ciphertext byte: replay the lookahead, then live input.
            let (byte, from_replay) = if self.replay < self.lead_len {
                (self.lead[self.replay], true)
            } else {
                match src.readable().first() {
                    Some(&b) => (b, false),
                    None => {
                        if !flush {
                            return Ok(Step::Empty);
                        }
                        return self.finalize(dst);
                    }
                }
            };
            match self.mode {
                Mode::Binary => {
                    if self.skip == 0 && dst.space() == 0 {
                        return Ok(Step::Full);
                    }
                    let plain = decrypt_byte(&mut self.r, byte);
                    self.emit(plain, dst);
                    self.advance(from_replay, src);
                }
                Mode::Hex => match byte {
                    b' ' | b'\t' | b'\r' | b'\n' => self.advance(from_replay, src),
                    _ => {
                        let Some(nibble) = hex_nibble(byte) else {
                            return Err(StreamError::MalformedInput {
                                filter: FILTER,
                                offset: self.offset,
                                msg: format!("invalid hex character 0x{byte:02x}"),
                            });
                        };
                        match self.pending {
                            None => {
                                self.pending = Some(nibble);
                                self.advance(from_replay, src);
                            }
                            Some(high) => {
                                if self.skip == 0 && dst.space() == 0 {
                                    return Ok(Step::Full);
                                }
                                let plain = decrypt_byte(&mut self.r, (high << 4) | nibble);
                                self.emit(plain, dst);
                                self.pending = None;
                                self.advance(from_replay, src);
                            }
                        }
                    }
                },
                Mode::Detect => unreachable!("detection completed above"),
            }
        }
    }

    fn emit(&mut self, plain: u8, dst: &mut StreamBuf) {
        if self.skip > 0 {
            self.skip -= 1;
        } else {
            dst.push(plain);
        }
    }

    fn advance(&mut self, from_replay: bool, src: &mut StreamBuf) {
        if from_replay {
            self.replay += 1;
        } else {
            src.consume(1);
            self.offset += 1;
        }
    }

    fn finalize(&mut self, dst: &mut StreamBuf) -> Result<Step> {
        if let Some(high) = self.pending {
            // Odd trailing digit completes with 0, as in the hex filter.
            if self.skip == 0 && dst.space() == 0 {
                return Ok(Step::Full);
            }
            let plain = decrypt_byte(&mut self.r, high << 4);
            self.emit(plain, dst);
            self.pending = None;
        }
        if self.skip > 0 {
            // Ciphertext shorter than the lead-in.
            return Err(StreamError::PrematureEnd { filter: FILTER });
        }
        Ok(Step::Eof)
    }
}

impl Default for EexecDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming eexec encoder. Emits an encrypted four-byte lead-in followed by
/// binary ciphertext.
pub struct EexecEncoder {
    r: u16,
    lead_remaining: usize,
}

impl EexecEncoder {
    pub fn new() -> Self {
        Self {
            r: KEY,
            lead_remaining: LEAD_LEN,
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        // The lead-in plaintext is fixed zeros; its first ciphertext byte is
        // 0xD9, which can never re-detect as hex.
        while self.lead_remaining > 0 {
            if dst.space() == 0 {
                return Ok(Step::Full);
            }
            dst.push(encrypt_byte(&mut self.r, 0));
            self.lead_remaining -= 1;
        }
        loop {
            let Some(&byte) = src.readable().first() else {
                return Ok(if flush { Step::Eof } else { Step::Empty });
            };
            if dst.space() == 0 {
                return Ok(Step::Full);
            }
            dst.push(encrypt_byte(&mut self.r, byte));
            src.consume(1);
        }
    }
}

impl Default for EexecEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_in_is_not_hex() {
        let mut r = KEY;
        assert_eq!(encrypt_byte(&mut r, 0), 0xd9);
    }

    #[test]
    fn binary_roundtrip_discards_lead() {
        let data = b"dup 5 /funny-proc def";
        let mut src = StreamBuf::detached(64).unwrap();
        src.extend_from_slice(data);
        let mut mid = StreamBuf::detached(64).unwrap();
        let mut enc = EexecEncoder::new();
        assert_eq!(enc.step(&mut src, &mut mid, true).unwrap(), Step::Eof);
        assert_eq!(mid.available(), data.len() + LEAD_LEN);

        let mut out = StreamBuf::detached(64).unwrap();
        let mut dec = EexecDecoder::new();
        assert_eq!(dec.step(&mut mid, &mut out, true).unwrap(), Step::Eof);
        assert_eq!(out.readable(), data);
    }
}
