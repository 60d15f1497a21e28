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

//! Escape-coded 16-bit differential decoder (C3). An optional leading byte
//! passes through unchanged when the declared output length is odd; the
//! remaining bytes reconstruct a signed 16-bit sample stream from a running
//! `previous` value and three escape opcodes.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    #[error("compressed stream ran out before the declared output size was reached")]
    Underrun,
    #[error("failed to allocate the output buffer")]
    AllocationFailure,
}

const LITERAL16: u8 = 0x80;
const NEGATIVE_ESCAPE: u8 = 0x81;
const POSITIVE_ESCAPE: u8 = 0x82;

/// Decode a delta stream into exactly `uncompressed_size` bytes.
pub fn decompress_delta(compressed: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    out.try_reserve_exact(uncompressed_size)
        .map_err(|_| DecodeError::AllocationFailure)?;

    let mut cursor = 0usize;
    let mut remaining = uncompressed_size;

    if remaining % 2 == 1 {
        let b = *compressed.get(cursor).ok_or(DecodeError::Underrun)?;
        cursor += 1;
        out.push(b);
        remaining -= 1;
    }
    if remaining == 0 {
        return Ok(out);
    }

    let anchor = compressed
        .get(cursor..cursor + 2)
        .ok_or(DecodeError::Underrun)?;
    let mut previous = i16::from_le_bytes([anchor[0], anchor[1]]);
    cursor += 2;
    out.extend_from_slice(&previous.to_le_bytes());
    remaining -= 2;

    while remaining > 0 {
        let opcode = *compressed.get(cursor).ok_or(DecodeError::Underrun)?;
        let value = match opcode {
            LITERAL16 => {
                let pair = compressed
                    .get(cursor + 1..cursor + 3)
                    .ok_or(DecodeError::Underrun)?;
                cursor += 3;
                i16::from_le_bytes([pair[0], pair[1]])
            }
            NEGATIVE_ESCAPE => {
                let b = *compressed.get(cursor + 1).ok_or(DecodeError::Underrun)?;
                cursor += 2;
                previous.wrapping_sub(b as i16).wrapping_sub(126)
            }
            POSITIVE_ESCAPE => {
                let b = *compressed.get(cursor + 1).ok_or(DecodeError::Underrun)?;
                cursor += 2;
                previous.wrapping_add(b as i16).wrapping_add(128)
            }
            _ => {
                cursor += 1;
                previous.wrapping_add(opcode as i8 as i16)
            }
        };
        out.extend_from_slice(&value.to_le_bytes());
        previous = value;
        remaining -= 2;
    }

    log::trace!("delta: decoded {} bytes from {} compressed", out.len(), cursor);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_length_matches_request() {
        let input = [10i16.to_le_bytes()[0], 10i16.to_le_bytes()[1]];
        let out = decompress_delta(&input, 2).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(i16::from_le_bytes([out[0], out[1]]), 10);
    }

    #[test]
    fn odd_length_passes_through_leading_byte() {
        let mut input = vec![0xEE];
        input.extend_from_slice(&5i16.to_le_bytes());
        let out = decompress_delta(&input, 3).unwrap();
        assert_eq!(out[0], 0xEE);
        assert_eq!(i16::from_le_bytes([out[1], out[2]]), 5);
    }

    #[test]
    fn literal16_escape_passes_raw_bytes_through() {
        let mut input = 100i16.to_le_bytes().to_vec();
        input.push(LITERAL16);
        input.push(0xAA);
        input.push(0xBB);
        let out = decompress_delta(&input, 4).unwrap();
        assert_eq!(&out[2..4], &[0xAA, 0xBB]);
    }

    #[test]
    fn signed_byte_delta() {
        let mut input = 100i16.to_le_bytes().to_vec();
        input.push(0xFBu8); // -5 as i8
        let out = decompress_delta(&input, 4).unwrap();
        assert_eq!(i16::from_le_bytes([out[2], out[3]]), 95);
    }

    #[test]
    fn negative_escape_formula() {
        let mut input = 100i16.to_le_bytes().to_vec();
        input.push(NEGATIVE_ESCAPE);
        input.push(10);
        let out = decompress_delta(&input, 4).unwrap();
        // previous - next_byte - 126 = 100 - 10 - 126 = -36
        assert_eq!(i16::from_le_bytes([out[2], out[3]]), -36);
    }

    #[test]
    fn positive_escape_formula() {
        let mut input = 100i16.to_le_bytes().to_vec();
        input.push(POSITIVE_ESCAPE);
        input.push(10);
        let out = decompress_delta(&input, 4).unwrap();
        // previous + next_byte + 128 = 100 + 10 + 128 = 238
        assert_eq!(i16::from_le_bytes([out[2], out[3]]), 238);
    }

    #[test]
    fn underrun_on_truncated_stream() {
        let input = [0u8];
        assert_eq!(decompress_delta(&input, 4), Err(DecodeError::Underrun));
    }
}
