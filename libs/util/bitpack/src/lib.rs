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

//! Recursive quadtree bit-plane decoder (C4). A raster is carved into a 4×4
//! grid of sub-rectangles (the last row/column of the grid absorbing any
//! remainder); each sub-rectangle either bottoms out as a uniform fill, a
//! per-sample fixed-width read, or keeps recursing.

use bitio::MsbBitPool;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    #[error("bit pool exhausted before a required read")]
    Underrun,
    #[error("expected size does not divide evenly into rows * cols samples")]
    UnsupportedVariant,
    #[error("failed to allocate the sample buffer")]
    AllocationFailure,
}

impl From<bitio::BitIoError> for DecodeError {
    fn from(_: bitio::BitIoError) -> Self {
        DecodeError::Underrun
    }
}

const SLICES: usize = 4;

/// Splits `total` samples into `SLICES` divisions, the last absorbing the
/// remainder, the way the teacher's row/column splits also work.
fn divide(total: usize) -> [usize; SLICES] {
    let base = total / SLICES;
    let mut parts = [base; SLICES];
    parts[SLICES - 1] = total - base * (SLICES - 1);
    parts
}

#[allow(clippy::too_many_arguments)]
fn decode_region(
    pool: &mut MsbBitPool,
    out: &mut [u32],
    total_cols: usize,
    row0: usize,
    col0: usize,
    rows: usize,
    cols: usize,
    add_value: u32,
    num_bits: u32,
    shift: u32,
    max_bits_read: u32,
) -> Result<(), DecodeError> {
    if num_bits == 0 {
        for r in 0..rows {
            for c in 0..cols {
                out[(row0 + r) * total_cols + (col0 + c)] = add_value;
            }
        }
        return Ok(());
    }

    if rows < 8 || cols < 8 {
        let clamped = num_bits.min(max_bits_read);
        for r in 0..rows {
            for c in 0..cols {
                let sample = pool.read_bits(clamped)?;
                out[(row0 + r) * total_cols + (col0 + c)] = add_value.wrapping_add(sample.wrapping_shl(shift));
            }
        }
        return Ok(());
    }

    let row_divs = divide(rows);
    let col_divs = divide(cols);
    let mut r_off = row0;
    for &rr in &row_divs {
        if rr == 0 {
            continue;
        }
        let mut c_off = col0;
        for &cc in &col_divs {
            if cc == 0 {
                continue;
            }
            let inc_bits = num_bits.min(8);
            let increment = pool.read_bits(inc_bits)?;
            let extra_shifts = num_bits.saturating_sub(8);
            let new_add_value = add_value.wrapping_add(increment.wrapping_shl(extra_shifts + shift));
            let new_num_bits = pool.read_bits(4)?;
            decode_region(
                pool,
                out,
                total_cols,
                r_off,
                c_off,
                rr,
                cc,
                new_add_value,
                new_num_bits,
                shift,
                max_bits_read,
            )?;
            c_off += cc;
        }
        r_off += rr;
    }
    Ok(())
}

struct Header {
    shift: u32,
    initial_add_value: u32,
    num_bits: u32,
    max_bits_read: u32,
}

fn read_header(pool: &mut MsbBitPool) -> Result<Header, DecodeError> {
    let num_bits_add_value = pool.read_bits(8)?;
    let shift = pool.read_bits(8)?;
    let initial_add_value = pool.read_bits(8 * num_bits_add_value)?;
    let num_bits = pool.read_bits(4)?;
    let max_bits_read = pool.read_bits(4)?;
    let max_bits_read = if max_bits_read == 0 { 16 } else { max_bits_read };
    Ok(Header {
        shift,
        initial_add_value,
        num_bits,
        max_bits_read,
    })
}

fn decode_samples(compressed: &[u8], rows: usize, cols: usize) -> Result<Vec<u32>, DecodeError> {
    let mut pool = MsbBitPool::new(compressed);
    let header = read_header(&mut pool)?;

    let mut samples = vec![0u32; rows * cols];
    decode_region(
        &mut pool,
        &mut samples,
        cols,
        0,
        0,
        rows,
        cols,
        header.initial_add_value,
        header.num_bits,
        header.shift,
        header.max_bits_read,
    )?;
    log::trace!(
        "bitpack: decoded {}x{} samples ({} bytes consumed)",
        rows,
        cols,
        pool.bytes_consumed()
    );
    Ok(samples)
}

/// Decode either the 8-bit or 16-bit BitPack raster variant, selected by
/// `uncompressed_size / (rows * cols)`.
pub fn decompress_bitpack(
    compressed: &[u8],
    uncompressed_size: usize,
    rows: usize,
    cols: usize,
) -> Result<Vec<u8>, DecodeError> {
    let cell_count = rows.checked_mul(cols).ok_or(DecodeError::UnsupportedVariant)?;
    if cell_count == 0 {
        return Ok(Vec::new());
    }
    if uncompressed_size == cell_count {
        let samples = decode_samples(compressed, rows, cols)?;
        let mut out = Vec::new();
        out.try_reserve_exact(uncompressed_size)
            .map_err(|_| DecodeError::AllocationFailure)?;
        out.extend(samples.iter().map(|&s| s as u8));
        Ok(out)
    } else if uncompressed_size == 2 * cell_count {
        let samples = decode_samples(compressed, rows, cols)?;
        let mut out = Vec::new();
        out.try_reserve_exact(uncompressed_size)
            .map_err(|_| DecodeError::AllocationFailure)?;
        for s in samples {
            out.extend_from_slice(&(s as u16).to_le_bytes());
        }
        Ok(out)
    } else {
        Err(DecodeError::UnsupportedVariant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal MSB-first bit writer, used only to build fixtures for the
    /// tests below.
    struct MsbBitWriter {
        bytes: Vec<u8>,
        cur: u32,
        cur_bits: u32,
    }

    impl MsbBitWriter {
        fn new() -> Self {
            Self {
                bytes: Vec::new(),
                cur: 0,
                cur_bits: 0,
            }
        }

        fn push_bits(&mut self, value: u32, n: u32) {
            for i in (0..n).rev() {
                let bit = (value >> i) & 1;
                self.cur = (self.cur << 1) | bit;
                self.cur_bits += 1;
                if self.cur_bits == 8 {
                    self.bytes.push(self.cur as u8);
                    self.cur = 0;
                    self.cur_bits = 0;
                }
            }
        }

        fn finish(mut self) -> Vec<u8> {
            if self.cur_bits > 0 {
                self.cur <<= 8 - self.cur_bits;
                self.bytes.push(self.cur as u8);
            }
            self.bytes
        }
    }

    #[test]
    fn all_equal_block_fills_with_add_value() {
        let mut w = MsbBitWriter::new();
        w.push_bits(1, 8); // num_bits_add_value = 1 byte
        w.push_bits(0, 8); // shift = 0
        w.push_bits(42, 8); // initial_add_value = 42
        w.push_bits(0, 4); // num_bits = 0 -> uniform fill
        w.push_bits(0, 4); // max_bits_read (unused when num_bits == 0)
        let compressed = w.finish();

        let out = decompress_bitpack(&compressed, 16, 4, 4).unwrap();
        assert_eq!(out, vec![42u8; 16]);
    }

    #[test]
    fn rejects_size_not_matching_rows_cols() {
        let compressed = [0u8; 8];
        assert_eq!(
            decompress_bitpack(&compressed, 15, 4, 4),
            Err(DecodeError::UnsupportedVariant)
        );
    }

    #[test]
    fn dispatches_16_bit_variant_by_size() {
        let mut w = MsbBitWriter::new();
        w.push_bits(1, 8);
        w.push_bits(0, 8);
        w.push_bits(7, 8);
        w.push_bits(0, 4);
        w.push_bits(0, 4);
        let compressed = w.finish();

        let out = decompress_bitpack(&compressed, 32, 4, 4).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(u16::from_le_bytes([out[0], out[1]]), 7);
    }

    #[test]
    fn per_sample_reads_respect_shift_and_add_value() {
        let mut w = MsbBitWriter::new();
        w.push_bits(1, 8); // num_bits_add_value
        w.push_bits(2, 8); // shift = 2
        w.push_bits(0, 8); // initial_add_value = 0
        w.push_bits(3, 4); // num_bits = 3 (root region < 8 -> base case for a 4x4 raster)
        w.push_bits(3, 4); // max_bits_read = 3
        for _ in 0..16 {
            w.push_bits(5, 3); // sample value 5 for every cell
        }
        let compressed = w.finish();

        let out = decompress_bitpack(&compressed, 16, 4, 4).unwrap();
        assert!(out.iter().all(|&b| b == (5u8 << 2)));
    }
}
