// This file is part of OpenFA.
//
// OpenFA is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// OpenFA is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with OpenFA.  If not, see <http://www.gnu.org/licenses/>.

//! LZ1 and LZ2 back-reference decoders (C2). Both are signature-prefixed,
//! LSB-first bit-token streams with literal, short-match, and long-match
//! forms; LZ2 differs from LZ1 only in its signature, minimum match length,
//! and the order it reads its mode flags in.

use bitio::LsbBitPool;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    #[error("signature does not match this LZ variant")]
    InvalidSignature,
    #[error("match length prefix exceeded 15 zero bits")]
    UnsupportedVariant,
    #[error("bit pool or back-reference exhausted before a required read")]
    Underrun,
    #[error("failed to allocate the output buffer")]
    AllocationFailure,
}

impl From<bitio::BitIoError> for DecodeError {
    fn from(_: bitio::BitIoError) -> Self {
        DecodeError::Underrun
    }
}

const SENTINEL_OFFSET: u32 = 0x113F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Lz1,
    Lz2,
}

impl Variant {
    fn signature(self) -> [u8; 2] {
        match self {
            Variant::Lz1 => [0x44, 0x53],
            Variant::Lz2 => [0x4A, 0x4D],
        }
    }

    fn min_match(self) -> u32 {
        match self {
            Variant::Lz1 => 2,
            Variant::Lz2 => 3,
        }
    }
}

enum Token {
    Literal(u8),
    Match { offset: u32 },
}

fn read_long_match_offset(pool: &mut LsbBitPool) -> Result<u32, DecodeError> {
    let far = pool.read_bit()?;
    let offset = if far == 0 {
        pool.read_bits(8)? + 0x40
    } else {
        pool.read_bits(12)? + 0x140
    };
    Ok(offset)
}

fn read_token(pool: &mut LsbBitPool, variant: Variant) -> Result<Token, DecodeError> {
    match variant {
        Variant::Lz1 => {
            let mode = pool.read_bits(2)?;
            match mode {
                1 => Ok(Token::Literal((pool.read_bits(7)? as u8) | 0x80)),
                2 => Ok(Token::Literal(pool.read_bits(7)? as u8)),
                3 => Ok(Token::Match {
                    offset: read_long_match_offset(pool)?,
                }),
                _ => Ok(Token::Match {
                    offset: pool.read_bits(6)?,
                }),
            }
        }
        Variant::Lz2 => {
            if pool.read_bit()? == 0 {
                return Ok(Token::Literal(pool.read_bits(7)? as u8));
            }
            if pool.read_bit()? == 1 {
                return Ok(Token::Literal((pool.read_bits(7)? as u8) | 0x80));
            }
            if pool.read_bit()? == 1 {
                Ok(Token::Match {
                    offset: read_long_match_offset(pool)?,
                })
            } else {
                Ok(Token::Match {
                    offset: pool.read_bits(6)?,
                })
            }
        }
    }
}

fn read_match_length(pool: &mut LsbBitPool, min_match: u32) -> Result<u32, DecodeError> {
    let mut k = 0u32;
    while pool.read_bit()? == 0 {
        k += 1;
        if k > 15 {
            return Err(DecodeError::UnsupportedVariant);
        }
    }
    if k == 0 {
        Ok(min_match)
    } else {
        Ok((1 << k) + pool.read_bits(k)? + min_match - 1)
    }
}

fn decompress(
    compressed: &[u8],
    uncompressed_size: usize,
    variant: Variant,
) -> Result<Vec<u8>, DecodeError> {
    let sig = variant.signature();
    if compressed.len() < 2 || compressed[0] != sig[0] || compressed[1] != sig[1] {
        return Err(DecodeError::InvalidSignature);
    }

    let mut out = Vec::new();
    out.try_reserve_exact(uncompressed_size)
        .map_err(|_| DecodeError::AllocationFailure)?;

    let mut pool = LsbBitPool::new(&compressed[2..]);
    while out.len() < uncompressed_size {
        match read_token(&mut pool, variant)? {
            Token::Literal(byte) => out.push(byte),
            Token::Match { offset } => {
                if offset == SENTINEL_OFFSET {
                    continue;
                }
                let offset = offset as usize;
                let length = read_match_length(&mut pool, variant.min_match())?;
                for _ in 0..length {
                    if out.len() >= uncompressed_size {
                        break;
                    }
                    let idx = out.len().checked_sub(offset).ok_or(DecodeError::Underrun)?;
                    let byte = *out.get(idx).ok_or(DecodeError::Underrun)?;
                    out.push(byte);
                }
            }
        }
    }
    log::trace!(
        "lzss: decoded {} bytes ({} bit-pool bytes consumed)",
        out.len(),
        pool.bytes_consumed()
    );
    Ok(out)
}

/// Decode an LZ1 stream (signature `0x44 0x53`, minimum match length 2).
pub fn decompress_lz1(compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, DecodeError> {
    decompress(compressed, uncompressed_size, Variant::Lz1)
}

/// Decode an LZ2 stream (signature `0x4A 0x4D`, minimum match length 3).
pub fn decompress_lz2(compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, DecodeError> {
    decompress(compressed, uncompressed_size, Variant::Lz2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lz1_minimal_literal() {
        // mode=2 (low literal), 7-bit payload 0x40, then padding bits.
        let input = [0x44, 0x53, 0b0100_0010, 0x00];
        let out = decompress_lz1(&input, 1).unwrap();
        assert_eq!(out, vec![0x40]);
    }

    #[test]
    fn lz1_high_literal_sets_top_bit() {
        // mode=1 (high literal), 7-bit payload 0x01 -> 0x81.
        let input = [0x44, 0x53, 0b0000_1001, 0x00];
        let out = decompress_lz1(&input, 1).unwrap();
        assert_eq!(out, vec![0x81]);
    }

    #[test]
    fn rejects_bad_signature() {
        let input = [0x00, 0x00, 0x00];
        assert_eq!(decompress_lz1(&input, 1), Err(DecodeError::InvalidSignature));
    }

    #[test]
    fn rejects_lz2_stream_fed_as_lz1() {
        let input = [0x4A, 0x4D, 0x00];
        assert_eq!(decompress_lz1(&input, 1), Err(DecodeError::InvalidSignature));
    }

    #[test]
    fn short_match_copies_from_history() {
        // Emit two low literals "AB", then a short match of offset=2, length=min_match(2),
        // reproducing "AB" again via back-reference.
        let mut bits = Lz1BitWriter::new();
        bits.push_bits(2, 2); // mode=2 low literal
        bits.push_bits(b'A' as u32, 7);
        bits.push_bits(2, 2); // mode=2 low literal
        bits.push_bits(b'B' as u32, 7);
        bits.push_bits(0, 2); // mode=0 short match
        bits.push_bits(2, 6); // offset = 2
        bits.push_bit(1); // k=0 unary terminator -> length = min_match = 2
        let mut input = vec![0x44, 0x53];
        input.extend(bits.finish());
        let out = decompress_lz1(&input, 4).unwrap();
        assert_eq!(out, b"ABAB");
    }

    #[test]
    fn sentinel_offset_emits_nothing_and_continues() {
        let mut bits = Lz1BitWriter::new();
        bits.push_bits(2, 2); // literal 'A'
        bits.push_bits(b'A' as u32, 7);
        bits.push_bits(3, 2); // mode=3 long match
        bits.push_bit(1); // far=1 -> 12-bit offset + 0x140
        bits.push_bits(SENTINEL_OFFSET - 0x140, 12);
        bits.push_bits(2, 2); // literal 'B' follows with no length/copy read
        bits.push_bits(b'B' as u32, 7);
        let mut input = vec![0x44, 0x53];
        input.extend(bits.finish());
        let out = decompress_lz1(&input, 2).unwrap();
        assert_eq!(out, b"AB");
    }

    /// Minimal LSB-first bit writer, used only to build fixtures for the
    /// tests above (mirrors the reader's carry semantics in reverse).
    struct Lz1BitWriter {
        bytes: Vec<u8>,
        cur: u32,
        cur_bits: u32,
    }

    impl Lz1BitWriter {
        fn new() -> Self {
            Self {
                bytes: Vec::new(),
                cur: 0,
                cur_bits: 0,
            }
        }

        fn push_bit(&mut self, bit: u32) {
            self.cur |= (bit & 1) << self.cur_bits;
            self.cur_bits += 1;
            if self.cur_bits == 8 {
                self.bytes.push(self.cur as u8);
                self.cur = 0;
                self.cur_bits = 0;
            }
        }

        fn push_bits(&mut self, value: u32, n: u32) {
            for i in 0..n {
                self.push_bit((value >> i) & 1);
            }
        }

        fn finish(mut self) -> Vec<u8> {
            if self.cur_bits > 0 {
                self.bytes.push(self.cur as u8);
            }
            self.bytes
        }
    }
}
