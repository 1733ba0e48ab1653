//! AES stream encryption filters.
//!
//! Two modes wrapped to the uniform step contract, both framing-free: the
//! caller supplies the key and the 16-byte IV/counter block out of band.
//!
//! - `Ctr`: big-endian 128-bit counter keystream. Length-preserving and
//!   symmetric, so encrypt and decrypt are the same transformation.
//! - `Cbc`: block-buffered CBC with PKCS#7 padding applied at flush on the
//!   encrypt side and stripped (leniently, invalid padding passes through)
//!   on the decrypt side, which holds back one block until end of input.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyIvInit, KeyInit, consts::U16};
use aes::{Aes128, Aes256};
use cbc::{Decryptor, Encryptor};

use crate::buffer::StreamBuf;
use crate::codec::Step;
use crate::error::{Result, StreamError};

const FILTER: &str = "AES";

/// AES block size in bytes.
pub const BLOCK: usize = 16;

type Block16 = GenericArray<u8, U16>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesMode {
    Ctr,
    Cbc,
}

/// Key, initial counter/IV, and mode for an AES filter.
#[derive(Clone)]
pub struct AesParams {
    pub key: Vec<u8>,
    pub iv: [u8; BLOCK],
    pub mode: AesMode,
}

impl AesParams {
    pub fn validate(&self) -> Result<()> {
        match self.key.len() {
            16 | 32 => Ok(()),
            n => Err(StreamError::MalformedInput {
                filter: FILTER,
                offset: 0,
                msg: format!("key must be 16 or 32 bytes, got {n}"),
            }),
        }
    }
}

enum BlockCipher {
    Aes128(Aes128),
    Aes256(Aes256),
}

impl BlockCipher {
    /// # Panics
    /// Panics if the key is not 16 or 32 bytes; the chain constructor
    /// validates before building the codec.
    fn new(key: &[u8]) -> Self {
        match key.len() {
            16 => Self::Aes128(Aes128::new(key.into())),
            32 => Self::Aes256(Aes256::new(key.into())),
            _ => panic!("AES key must be 16 or 32 bytes"),
        }
    }

    fn encrypt(&self, block: &mut Block16) {
        match self {
            Self::Aes128(c) => c.encrypt_block(block),
            Self::Aes256(c) => c.encrypt_block(block),
        }
    }
}

/// Counter-mode keystream generator.
struct Ctr {
    cipher: BlockCipher,
    counter: [u8; BLOCK],
    keystream: [u8; BLOCK],
    used: usize,
}

impl Ctr {
    fn new(key: &[u8], iv: [u8; BLOCK]) -> Self {
        Self {
            cipher: BlockCipher::new(key),
            counter: iv,
            keystream: [0; BLOCK],
            used: BLOCK,
        }
    }

    fn next_key_byte(&mut self) -> u8 {
        if self.used == BLOCK {
            let mut block = Block16::clone_from_slice(&self.counter);
            self.cipher.encrypt(&mut block);
            self.keystream = block.into();
            for byte in self.counter.iter_mut().rev() {
                *byte = byte.wrapping_add(1);
                if *byte != 0 {
                    break;
                }
            }
            self.used = 0;
        }
        let key = self.keystream[self.used];
        self.used += 1;
        key
    }

    fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        loop {
            let Some(&byte) = src.readable().first() else {
                return Ok(if flush { Step::Eof } else { Step::Empty });
            };
            if dst.space() == 0 {
                return Ok(Step::Full);
            }
            dst.push(byte ^ self.next_key_byte());
            src.consume(1);
        }
    }
}

enum CbcEnc {
    Aes128(Encryptor<Aes128>),
    Aes256(Encryptor<Aes256>),
}

impl CbcEnc {
    fn new(key: &[u8], iv: &[u8; BLOCK]) -> Self {
        match key.len() {
            16 => Self::Aes128(Encryptor::new(key.into(), iv.into())),
            32 => Self::Aes256(Encryptor::new(key.into(), iv.into())),
            _ => panic!("AES key must be 16 or 32 bytes"),
        }
    }

    fn encrypt(&mut self, block: &mut Block16) {
        match self {
            Self::Aes128(c) => c.encrypt_block_mut(block),
            Self::Aes256(c) => c.encrypt_block_mut(block),
        }
    }
}

enum CbcDec {
    Aes128(Decryptor<Aes128>),
    Aes256(Decryptor<Aes256>),
}

impl CbcDec {
    fn new(key: &[u8], iv: &[u8; BLOCK]) -> Self {
        match key.len() {
            16 => Self::Aes128(Decryptor::new(key.into(), iv.into())),
            32 => Self::Aes256(Decryptor::new(key.into(), iv.into())),
            _ => panic!("AES key must be 16 or 32 bytes"),
        }
    }

    fn decrypt(&mut self, block: &mut Block16) {
        match self {
            Self::Aes128(c) => c.decrypt_block_mut(block),
            Self::Aes256(c) => c.decrypt_block_mut(block),
        }
    }
}

/// Remove PKCS#7 padding from the final decrypted block.
///
/// Returns the block unchanged if the padding is invalid:
/// - padding byte value is 0 or > 16
/// - padding bytes are not all equal to the padding length
fn unpad(block: &[u8; BLOCK]) -> &[u8] {
    let pad = block[BLOCK - 1] as usize;
    if pad == 0 || pad > BLOCK {
        return block;
    }
    let start = BLOCK - pad;
    if block[start..].iter().all(|&b| b as usize == pad) {
        &block[..start]
    } else {
        block
    }
}

enum EncState {
    Ctr(Ctr),
    Cbc {
        cipher: CbcEnc,
        tail: [u8; BLOCK],
        tlen: usize,
        done: bool,
    },
}

/// AES encryption wrapped to the step contract.
pub struct AesEncryptor {
    state: EncState,
}

impl AesEncryptor {
    pub fn new(params: &AesParams) -> Self {
        let state = match params.mode {
            AesMode::Ctr => EncState::Ctr(Ctr::new(&params.key, params.iv)),
            AesMode::Cbc => EncState::Cbc {
                cipher: CbcEnc::new(&params.key, &params.iv),
                tail: [0; BLOCK],
                tlen: 0,
                done: false,
            },
        };
        Self { state }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        match &mut self.state {
            EncState::Ctr(ctr) => ctr.step(src, dst, flush),
            EncState::Cbc {
                cipher,
                tail,
                tlen,
                done,
            } => loop {
                if *done {
                    return Ok(Step::Eof);
                }
                while *tlen < BLOCK {
                    let Some(&b) = src.readable().first() else {
                        break;
                    };
                    tail[*tlen] = b;
                    *tlen += 1;
                    src.consume(1);
                }
                if *tlen == BLOCK {
                    if dst.space() < BLOCK {
                        return Ok(Step::Full);
                    }
                    let mut block = Block16::clone_from_slice(tail);
                    cipher.encrypt(&mut block);
                    dst.extend_from_slice(block.as_slice());
                    *tlen = 0;
                    continue;
                }
                if !flush {
                    return Ok(Step::Empty);
                }
                if dst.space() < BLOCK {
                    return Ok(Step::Full);
                }
                // PKCS#7: the final block always carries padding.
                let pad = (BLOCK - *tlen) as u8;
                for slot in tail[*tlen..].iter_mut() {
                    *slot = pad;
                }
                let mut block = Block16::clone_from_slice(tail);
                cipher.encrypt(&mut block);
                dst.extend_from_slice(block.as_slice());
                *tlen = 0;
                *done = true;
                return Ok(Step::Eof);
            },
        }
    }
}

enum DecState {
    Ctr(Ctr),
    Cbc {
        cipher: CbcDec,
        tail: [u8; BLOCK],
        tlen: usize,
        held: Option<[u8; BLOCK]>,
        done: bool,
    },
}

/// AES decryption wrapped to the step contract.
pub struct AesDecryptor {
    state: DecState,
}

impl AesDecryptor {
    pub fn new(params: &AesParams) -> Self {
        let state = match params.mode {
            AesMode::Ctr => DecState::Ctr(Ctr::new(&params.key, params.iv)),
            AesMode::Cbc => DecState::Cbc {
                cipher: CbcDec::new(&params.key, &params.iv),
                tail: [0; BLOCK],
                tlen: 0,
                held: None,
                done: false,
            },
        };
        Self { state }
    }

    pub fn step(&mut self, src: &mut StreamBuf, dst: &mut StreamBuf, flush: bool) -> Result<Step> {
        match &mut self.state {
            DecState::Ctr(ctr) => ctr.step(src, dst, flush),
            DecState::Cbc {
                cipher,
                tail,
                tlen,
                held,
                done,
            } => loop {
                if *done {
                    return Ok(Step::Eof);
                }
                while *tlen < BLOCK {
                    let Some(&b) = src.readable().first() else {
                        break;
                    };
                    tail[*tlen] = b;
                    *tlen += 1;
                    src.consume(1);
                }
                if *tlen == BLOCK {
                    // A newer block proves the held one was not last.
                    if let Some(block) = held.take() {
                        if dst.space() < BLOCK {
                            *held = Some(block);
                            return Ok(Step::Full);
                        }
                        dst.extend_from_slice(&block);
                    }
                    let mut block = Block16::clone_from_slice(tail);
                    cipher.decrypt(&mut block);
                    *held = Some(block.into());
                    *tlen = 0;
                    continue;
                }
                if !flush {
                    return Ok(Step::Empty);
                }
                if *tlen != 0 {
                    // Ciphertext is not a whole number of blocks.
                    return Err(StreamError::PrematureEnd { filter: FILTER });
                }
                match held.take() {
                    Some(block) => {
                        let rest = unpad(&block);
                        if dst.space() < rest.len() {
                            *held = Some(block);
                            return Ok(Step::Full);
                        }
                        dst.extend_from_slice(rest);
                        *done = true;
                        return Ok(Step::Eof);
                    }
                    None => {
                        *done = true;
                        return Ok(Step::Eof);
                    }
                }
            },
        }
    }
}
