//! Bitcoin-style Base58Check encoding/decoding, as used by Dash addresses.
//!
//! Big-integer base conversion with a 4-byte double-SHA-256 checksum.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Base58 alphabet (Bitcoin variant).
const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Checksum length appended to the payload before encoding.
pub const CHECKSUM_SIZE: usize = 4;

#[derive(Debug, Error)]
pub enum Base58Error {
    #[error("invalid character '{0}' at position {1}")]
    InvalidCharacter(char, usize),

    #[error("decoded data too short ({0} bytes, need more than {CHECKSUM_SIZE})")]
    TooShort(usize),

    #[error("checksum mismatch")]
    ChecksumMismatch,
}

/// Build reverse alphabet lookup table at compile time.
const fn build_reverse_alphabet() -> [u8; 128] {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < 58 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static REVERSE_ALPHABET: [u8; 128] = build_reverse_alphabet();

fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Encode raw bytes to Base58 (no checksum).
pub fn encode(data: &[u8]) -> String {
    // Leading zero bytes map to leading '1's.
    let zeros = data.iter().take_while(|&&b| b == 0).count();

    // Base conversion over a little-endian digit accumulator.
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in &data[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut result = Vec::with_capacity(zeros + digits.len());
    result.extend(std::iter::repeat(ALPHABET[0]).take(zeros));
    result.extend(digits.iter().rev().map(|&d| ALPHABET[d as usize]));

    // SAFETY: all bytes are valid ASCII from ALPHABET
    unsafe { String::from_utf8_unchecked(result) }
}

/// Decode a Base58 string to raw bytes (no checksum verification).
pub fn decode(encoded: &str) -> Result<Vec<u8>, Base58Error> {
    let bytes = encoded.as_bytes();
    let ones = bytes.iter().take_while(|&&b| b == ALPHABET[0]).count();

    let mut data: Vec<u8> = Vec::with_capacity(encoded.len() * 733 / 1000 + 1);
    for (i, &ch) in bytes[ones..].iter().enumerate() {
        if ch >= 128 {
            return Err(Base58Error::InvalidCharacter(ch as char, ones + i));
        }
        let digit = REVERSE_ALPHABET[ch as usize];
        if digit == 0xFF {
            return Err(Base58Error::InvalidCharacter(ch as char, ones + i));
        }

        let mut carry = digit as u32;
        for byte in data.iter_mut() {
            carry += *byte as u32 * 58;
            *byte = (carry & 0xFF) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            data.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    let mut result = vec![0u8; ones];
    result.extend(data.iter().rev());
    Ok(result)
}

/// Encode payload bytes with an appended 4-byte double-SHA-256 checksum.
pub fn encode_check(payload: &[u8]) -> String {
    let checksum = sha256d(payload);
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_SIZE);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum[..CHECKSUM_SIZE]);
    encode(&data)
}

/// Decode a Base58Check string, verifying and stripping the checksum.
pub fn decode_check(encoded: &str) -> Result<Vec<u8>, Base58Error> {
    let data = decode(encoded)?;
    if data.len() <= CHECKSUM_SIZE {
        return Err(Base58Error::TooShort(data.len()));
    }

    let (payload, checksum) = data.split_at(data.len() - CHECKSUM_SIZE);
    let expected = sha256d(payload);
    if checksum != &expected[..CHECKSUM_SIZE] {
        return Err(Base58Error::ChecksumMismatch);
    }

    Ok(payload.to_vec())
}
