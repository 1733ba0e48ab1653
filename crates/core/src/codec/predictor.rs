//! Row-predictor filters: PNG-style Up and TIFF-style horizontal
//! differencing.
//!
//! Up differences each row byte-wise against the previous row (an all-zero
//! row before the first). Horizontal differences each sample against its
//! left neighbor `colors` samples back, at the configured bit depth, with
//! MSB-first sub-byte packing for depths 1/2/4 and big-endian pairs for 16.
//! Rows restart the left-neighbor chain. A trailing partial row is
//! transformed over its available prefix with the same rule, so arbitrary
//! payload lengths survive a round trip.

use crate::buffer::StreamBuf;
use crate::codec::Step;
use crate::error::{Result, StreamError};

const FILTER: &str = "Predictor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorKind {
    /// Byte-wise difference against the previous row.
    Up,
    /// Per-sample difference against the left neighbor within the row.
    Horizontal,
}

/// Image geometry for a predictor filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub kind: PredictorKind,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl PredictorParams {
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.colors == 0 {
            return Err(StreamError::MalformedInput {
                filter: FILTER,
                offset: 0,
                msg: "zero image geometry".into(),
            });
        }
        match self.bits_per_component {
            1 | 2 | 4 | 8 | 16 => Ok(()),
            other => Err(StreamError::MalformedInput {
                filter: FILTER,
                offset: 0,
                msg: format!("unsupported bit depth {other}"),
            }),
        }
    }

    /// Bytes per packed row.
    pub fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }
}

fn diff_up(row: &mut [u8], prev: &[u8]) {
    for (cur, &above) in row.iter_mut().zip(prev) {
        *cur = cur.wrapping_sub(above);
    }
}

fn undo_up(row: &mut [u8], prev: &[u8]) {
    for (cur, &above) in row.iter_mut().zip(prev) {
        *cur = cur.wrapping_add(above);
    }
}

fn diff_horizontal(row: &mut [u8], params: &PredictorParams) {
    let colors = params.colors;
    match params.bits_per_component {
        8 => {
            for i in (colors..row.len()).rev() {
                row[i] = row[i].wrapping_sub(row[i - colors]);
            }
        }
        16 => {
            let n = row.len() / 2;
            for i in (colors..n).rev() {
                let cur = u16::from_be_bytes([row[2 * i], row[2 * i + 1]]);
                let left = u16::from_be_bytes([row[2 * (i - colors)], row[2 * (i - colors) + 1]]);
                row[2 * i..2 * i + 2].copy_from_slice(&cur.wrapping_sub(left).to_be_bytes());
            }
        }
        bpc => {
            let mut samples = unpack_samples(row, bpc);
            let mask = (1u8 << bpc) - 1;
            for i in (colors..samples.len()).rev() {
                samples[i] = samples[i].wrapping_sub(samples[i - colors]) & mask;
            }
            pack_samples(&samples, bpc, row);
        }
    }
}

fn undo_horizontal(row: &mut [u8], params: &PredictorParams) {
    let colors = params.colors;
    match params.bits_per_component {
        8 => {
            for i in colors..row.len() {
                row[i] = row[i].wrapping_add(row[i - colors]);
            }
        }
        16 => {
            let n = row.len() / 2;
            for i in colors..n {
                let cur = u16::from_be_bytes([row[2 * i], row[2 * i + 1]]);
                let left = u16::from_be_bytes([row[2 * (i - colors)], row[2 * (i - colors) + 1]]);
                row[2 * i..2 * i + 2].copy_from_slice(&cur.wrapping_add(left).to_be_bytes());
            }
        }
        bpc => {
            let mut samples = unpack_samples(row, bpc);
            let mask = (1u8 << bpc) - 1;
            for i in colors..samples.len() {
                samples[i] = samples[i].wrapping_add(samples[i - colors]) & mask;
            }
            pack_samples(&samples, bpc, row);
        }
    }
}

/// MSB-first sub-byte sample extraction for depths 1/2/4.
fn unpack_samples(row: &[u8], bpc: usize) -> Vec<u8> {
    let per_byte = 8 / bpc;
    let mask = (1u8 << bpc) - 1;
    let mut samples = Vec::with_capacity(row.len() * per_byte);
    for &byte in row {
        for k in (0..per_byte).rev() {
            samples.push((byte >> (k * bpc)) & mask);
        }
    }
    samples
}

fn pack_samples(samples: &[u8], bpc: usize, row: &mut [u8]) {
    let per_byte = 8 / bpc;
    for (i, byte) in row.iter_mut().enumerate() {
        let mut packed = 0u8;
        for k in 0..per_byte {
            packed = (packed << bpc) | samples[i * per_byte + k];
        }
        *byte = packed;
    }
}

/// Streaming predictor encoder: applies the differencing transform.
pub struct PredictorEncoder {
    params: PredictorParams,
    /// Previous raw row; all zeros before the first row.
    prev: Vec<u8>,
    row: Vec<u8>,
    pending: Vec<u8>,
    pending_pos: usize,
}

impl PredictorEncoder {
    pub fn new(params: PredictorParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            prev: vec![0; params.row_bytes()],
            row: Vec::with_capacity(params.row_bytes()),
            pending: Vec::new(),
            pending_pos: 0,
        })
    }

    fn transform_row(&mut self) {
        let mut out = std::mem::take(&mut self.row);
        match self.params.kind {
            PredictorKind::Up => {
                let raw = out.clone();
                diff_up(&mut out, &self.prev);
                if raw.len() == self.params.row_bytes() {
                    self.prev = raw;
                }
            }
            PredictorKind::Horizontal => diff_horizontal(&mut out, &self.params),
        }
        self.pending = out;
        self.pending_pos = 0;
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        let row_bytes = self.params.row_bytes();
        loop {
            if !drain_pending(&mut self.pending, &mut self.pending_pos, dst) {
                return Ok(Step::Full);
            }
            while self.row.len() < row_bytes {
                let Some(&b) = src.readable().first() else {
                    break;
                };
                self.row.push(b);
                src.consume(1);
            }
            if self.row.len() == row_bytes {
                self.transform_row();
                continue;
            }
            if !flush {
                return Ok(Step::Empty);
            }
            if self.row.is_empty() {
                return Ok(Step::Eof);
            }
            self.transform_row();
        }
    }
}

/// Streaming predictor decoder: undoes the differencing transform.
pub struct PredictorDecoder {
    params: PredictorParams,
    prev: Vec<u8>,
    row: Vec<u8>,
    pending: Vec<u8>,
    pending_pos: usize,
}

impl PredictorDecoder {
    pub fn new(params: PredictorParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            prev: vec![0; params.row_bytes()],
            row: Vec::with_capacity(params.row_bytes()),
            pending: Vec::new(),
            pending_pos: 0,
        })
    }

    fn restore_row(&mut self) {
        let mut out = std::mem::take(&mut self.row);
        match self.params.kind {
            PredictorKind::Up => {
                undo_up(&mut out, &self.prev);
                if out.len() == self.params.row_bytes() {
                    self.prev.copy_from_slice(&out);
                }
            }
            PredictorKind::Horizontal => undo_horizontal(&mut out, &self.params),
        }
        self.pending = out;
        self.pending_pos = 0;
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        let row_bytes = self.params.row_bytes();
        loop {
            if !drain_pending(&mut self.pending, &mut self.pending_pos, dst) {
                return Ok(Step::Full);
            }
            while self.row.len() < row_bytes {
                let Some(&b) = src.readable().first() else {
                    break;
                };
                self.row.push(b);
                src.consume(1);
            }
            if self.row.len() == row_bytes {
                self.restore_row();
                continue;
            }
            if !flush {
                return Ok(Step::Empty);
            }
            if self.row.is_empty() {
                return Ok(Step::Eof);
            }
            self.restore_row();
        }
    }
}

fn drain_pending(pending: &mut Vec<u8>, pos: &mut usize, dst: &mut StreamBuf) -> bool {
    while *pos < pending.len() {
        if dst.space() == 0 {
            return false;
        }
        dst.push(pending[*pos]);
        *pos += 1;
    }
    pending.clear();
    *pos = 0;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(params: PredictorParams, data: &[u8], encode: bool) -> Vec<u8> {
        let mut src = StreamBuf::detached(data.len().max(1)).unwrap();
        src.extend_from_slice(data);
        let mut dst = StreamBuf::detached(data.len().max(1)).unwrap();
        let step = if encode {
            PredictorEncoder::new(params).unwrap().step(&mut src, &mut dst, true)
        } else {
            PredictorDecoder::new(params).unwrap().step(&mut src, &mut dst, true)
        };
        assert_eq!(step.unwrap(), Step::Eof);
        dst.readable().to_vec()
    }

    #[test]
    fn up_deltas_match_rows() {
        let params = PredictorParams {
            kind: PredictorKind::Up,
            colors: 1,
            bits_per_component: 8,
            columns: 3,
        };
        let encoded = run(params, &[10, 10, 10, 12, 10, 8], true);
        assert_eq!(encoded, [10, 10, 10, 2, 0, 254]);
        let decoded = run(params, &encoded, false);
        assert_eq!(decoded, [10, 10, 10, 12, 10, 8]);
    }

    #[test]
    fn horizontal_subbyte_roundtrip() {
        let params = PredictorParams {
            kind: PredictorKind::Horizontal,
            colors: 1,
            bits_per_component: 4,
            columns: 6,
        };
        let data = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc];
        let encoded = run(params, &data, true);
        assert_eq!(run(params, &encoded, false), data);
    }
}
