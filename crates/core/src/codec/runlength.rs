//! PostScript run-length encode/decode filters.
//!
//! Control byte 0..=127 copies the next control+1 bytes literally, 129..=255
//! repeats the following byte 257-control times, 128 ends the data. The
//! encoder picks between literal and replicate runs to minimize output and
//! never emits a run of length 1 through the replicate form; its output
//! depends only on the byte sequence and the final flush, never on how the
//! input was chunked.

use crate::buffer::StreamBuf;
use crate::codec::Step;
use crate::error::{Result, StreamError};

const FILTER: &str = "RunLength";

/// End-of-data control byte.
const EOD: u8 = 128;

#[derive(Debug, Clone, Copy)]
enum State {
    /// Expecting a control byte.
    Control,
    /// Copying literal bytes.
    Literal(usize),
    /// Expecting the byte to replicate.
    ReplByte(usize),
    /// Emitting copies of a replicated byte.
    ReplEmit(u8, usize),
    Done,
}

/// Streaming run-length decoder, resumable in the middle of a run.
///
/// A stream that ends at a clean run boundary without the 128 terminator is
/// treated as complete; truncation inside a run is an error.
pub struct RunLengthDecoder {
    state: State,
    offset: u64,
}

impl RunLengthDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Control,
            offset: 0,
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            match self.state {
                State::Done => return Ok(Step::Eof),
                State::Control => {
                    let Some(&control) = src.readable().first() else {
                        if flush {
                            // Missing EOD at a clean boundary is tolerated.
                            self.state = State::Done;
                            return Ok(Step::Eof);
                        }
                        return Ok(Step::Empty);
                    };
                    src.consume(1);
                    self.offset += 1;
                    self.state = match control {
                        EOD => State::Done,
                        0..=127 => State::Literal(control as usize + 1),
                        _ => State::ReplByte(257 - control as usize),
                    };
                }
                State::Literal(rem) => {
                    if src.is_empty() {
                        if flush {
                            return Err(StreamError::PrematureEnd { filter: FILTER });
                        }
                        return Ok(Step::Empty);
                    }
                    if dst.space() == 0 {
                        return Ok(Step::Full);
                    }
                    let n = rem.min(src.available()).min(dst.space());
                    let chunk = &src.readable()[..n];
                    dst.extend_from_slice(chunk);
                    src.consume(n);
                    self.offset += n as u64;
                    self.state = if rem == n {
                        State::Control
                    } else {
                        State::Literal(rem - n)
                    };
                }
                State::ReplByte(count) => {
                    let Some(&byte) = src.readable().first() else {
                        if flush {
                            return Err(StreamError::PrematureEnd { filter: FILTER });
                        }
                        return Ok(Step::Empty);
                    };
                    src.consume(1);
                    self.offset += 1;
                    self.state = State::ReplEmit(byte, count);
                }
                State::ReplEmit(byte, rem) => {
                    if dst.space() == 0 {
                        return Ok(Step::Full);
                    }
                    let n = rem.min(dst.space());
                    for _ in 0..n {
                        dst.push(byte);
                    }
                    self.state = if rem == n {
                        State::Control
                    } else {
                        State::ReplEmit(byte, rem - n)
                    };
                }
            }
        }
    }
}

impl Default for RunLengthDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming run-length encoder.
///
/// Bytes are fed one at a time into a pending literal plus a trailing run
/// candidate. A run becomes a replicate form when it reaches length 3, or
/// length 2 with no literal pending; runs of 1 always join the literal.
pub struct RunLengthEncoder {
    lit: Vec<u8>,
    run_byte: u8,
    run_len: usize,
    pending: Vec<u8>,
    pending_pos: usize,
    done: bool,
}

impl RunLengthEncoder {
    pub fn new() -> Self {
        Self {
            lit: Vec::new(),
            run_byte: 0,
            run_len: 0,
            pending: Vec::new(),
            pending_pos: 0,
            done: false,
        }
    }

    fn drain_pending(&mut self, dst: &mut StreamBuf) -> bool {
        while self.pending_pos < self.pending.len() {
            if dst.space() == 0 {
                return false;
            }
            dst.push(self.pending[self.pending_pos]);
            self.pending_pos += 1;
        }
        self.pending.clear();
        self.pending_pos = 0;
        true
    }

    /// Move full 128-byte literal chunks (all of them, when forced) into the
    /// pending output.
    fn spill_literal(&mut self, force: bool) {
        while self.lit.len() >= 128 {
            self.pending.push(127);
            self.pending.extend_from_slice(&self.lit[..128]);
            self.lit.drain(..128);
        }
        if force && !self.lit.is_empty() {
            self.pending.push(self.lit.len() as u8 - 1);
            self.pending.extend_from_slice(&self.lit);
            self.lit.clear();
        }
    }

    /// Decide the fate of the trailing run candidate.
    fn commit_run(&mut self) {
        match self.run_len {
            0 => {}
            1 => {
                self.lit.push(self.run_byte);
                self.spill_literal(false);
            }
            2 if !self.lit.is_empty() => {
                // A lone pair costs less inside the literal than as a
                // replicate run next to it.
                self.lit.push(self.run_byte);
                self.lit.push(self.run_byte);
                self.spill_literal(false);
            }
            n => {
                self.spill_literal(true);
                self.pending.push((257 - n) as u8);
                self.pending.push(self.run_byte);
            }
        }
        self.run_len = 0;
    }

    fn push_byte(&mut self, byte: u8) {
        if self.run_len > 0 && byte == self.run_byte {
            self.run_len += 1;
            if self.run_len == 128 {
                self.spill_literal(true);
                self.pending.push(129); // 257 - 128
                self.pending.push(self.run_byte);
                self.run_len = 0;
            }
        } else {
            self.commit_run();
            self.run_byte = byte;
            self.run_len = 1;
        }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            if !self.drain_pending(dst) {
                return Ok(Step::Full);
            }
            if self.done {
                return Ok(Step::Eof);
            }
            let Some(&byte) = src.readable().first() else {
                if !flush {
                    return Ok(Step::Empty);
                }
                self.commit_run();
                self.spill_literal(true);
                self.pending.push(EOD);
                self.done = true;
                continue;
            };
            src.consume(1);
            self.push_byte(byte);
        }
    }
}

impl Default for RunLengthEncoder {
    fn default() -> Self {
        Self::new()
    }
}
