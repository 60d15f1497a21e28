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

//! Block-lossless decoder (C7 "BLC"): a binary image coded row-by-row with
//! a 2D causal context (6 bits drawn from the two rows above and the pixels
//! already decoded in the current row) driving a per-context adaptive
//! run-length bit coder, with up to 16 blocks individually flaggable as
//! uniform (all-0 / all-1) instead of coded.

use bitio::MsbBitPool;

struct BlcState {
    run: [u16; 64],
    bit: [u16; 64],
    kp: [u16; 64],
    qzc: [u8; 64],
}

fn init_qzc() -> [u8; 64] {
    let mut qzc = [0u8; 64];
    for (i, slot) in qzc.iter_mut().enumerate() {
        let mut t = 6i32;
        if i & 1 != 0 {
            t -= 1;
        }
        if i & 2 != 0 {
            t -= 1;
        }
        if i & 4 != 0 {
            t -= 1;
        }
        if i & 8 != 0 {
            t -= 1;
        }
        if i & 0x10 != 0 {
            t -= 1;
        }
        if i & 0x20 != 0 {
            t -= 1;
        }
        *slot = (7 * t / 6) as u8;
    }
    qzc
}

fn adaptive_rlr(pool: &mut MsbBitPool, c: usize, blc: &mut BlcState) -> u8 {
    if blc.run[c] != 0 {
        blc.run[c] -= 1;
        return if blc.run[c] == 0 { blc.bit[c] as u8 } else { 0 };
    }

    let mut kp = blc.kp[c] as i32;
    let k = kp >> 4;

    if k != 0 {
        if pool.read_bit().unwrap_or(0) != 0 {
            let bits = pool.read_bits(k as u32).unwrap_or(0);
            blc.run[c] = bits as u16;
            if bits != 0 {
                blc.bit[c] = 1;
            }
            kp = (kp - k - 4).max(0);
            blc.kp[c] = kp as u16;
            return if bits != 0 { 0 } else { 1 };
        }

        blc.run[c] = ((1 << k) - 1) as u16;
        blc.bit[c] = 0;
        kp = (kp + k + 4).min(224);
        blc.kp[c] = kp as u16;
        return 0;
    }

    let bit = pool.read_bit().unwrap_or(0);
    if bit == 0 {
        kp = (kp + 4).min(224);
    }
    blc.kp[c] = kp as u16;
    bit as u8
}

/// Decode `block_count` (<= 16) rows of `width` binary pixels each into
/// `dest`, using `lines` as 3-row scratch context storage (as produced by
/// [`scratch_len`]).
pub fn entropy_blc(compressed: &[u8], dest: &mut [u8], lines: &mut [u8], block_count: usize, width: usize) -> Result<(), ()> {
    if compressed.is_empty() {
        return Ok(());
    }
    if block_count > 16 {
        return Err(());
    }

    let mut pool = MsbBitPool::new(compressed);

    for b in lines.iter_mut() {
        *b = 0;
    }

    let mut blk = BlcState {
        run: [0; 64],
        bit: [0; 64],
        kp: [16; 64],
        qzc: init_qzc(),
    };

    let mut blocks = [0i32; 16];
    let block_mode = pool.read_bits(2).unwrap_or(0);

    if block_mode == 0 {
        blocks.fill(-1);
    } else if block_mode == 1 {
        let block_mask = (pool.read_byte().unwrap_or(0) as u32) << 8 | pool.read_byte().unwrap_or(0) as u32;
        let block_value = (pool.read_byte().unwrap_or(0) as u32) << 8 | pool.read_byte().unwrap_or(0) as u32;
        let mut bitmask = 32768u32;
        for i in (0..16).rev() {
            if bitmask & block_mask != 0 {
                blocks[i] = i32::from((bitmask & block_value) != 0);
            } else {
                blocks[i] = -1;
            }
            bitmask >>= 1;
        }
    } else {
        let bit = pool.read_bit().unwrap_or(0) as i32;
        blocks.fill(bit);
    }

    let row0_base = 0usize;
    let row1_base = width + 6;
    let row2_base = 2 * width + 12;
    let mut row0 = row0_base;
    let mut row1 = row1_base;
    let mut row2 = row2_base;

    let mut cr0 = 0i32;
    let mut cr1 = 0i32;
    let mut out = 0usize;

    for block in 0..block_count {
        if blocks[block] < 0 {
            for i in 0..width {
                cr0 = lines[row0 + 2 + i] as i32 + 2 * (cr0 & 1);
                cr1 = 2 * (2 * lines[row1 + i + 4] as i32 + (cr1 & 0xF));
                let c = (cr0 + cr1 + 32 * lines[row2 + i + 4] as i32) as usize;

                let pc = 1 - (blk.qzc[c] >> 2) as i32;
                let x = pc ^ adaptive_rlr(&mut pool, c, &mut blk) as i32;
                lines[row0 + 3 + i] = x as u8;

                let mut qzc = blk.qzc[c] as i32 - 2 * x + 1;
                qzc = qzc.clamp(0, 7);
                blk.qzc[c] = qzc as u8;
            }
            dest[out..out + width].copy_from_slice(&lines[row0 + 3..row0 + 3 + width]);
            out += width;

            if row0 == row0_base {
                row0 = row2_base;
                row1 = row0_base;
                row2 = row1_base;
            } else if row0 == row2_base {
                row0 = row1_base;
                row1 = row2_base;
                row2 = row0_base;
            } else {
                row0 = row0_base;
                row1 = row1_base;
                row2 = row2_base;
            }
        } else {
            let fill = blocks[block] as u8;
            for slot in &mut lines[row0 + 3..row0 + 3 + width] {
                *slot = fill;
            }
            dest[out..out + width].copy_from_slice(&lines[row0 + 3..row0 + 3 + width]);
            out += width;
        }
    }

    Ok(())
}

/// Scratch-buffer size required by [`entropy_blc`] for a given row `width`.
pub fn scratch_len(width: usize) -> usize {
    3 * width + 18
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn block_mode_two_uniform_bit_fills_every_row() {
        let mut w = MsbBitWriter::new();
        w.push_bits(2, 2); // blockMode = 2
        w.push_bits(1, 1); // bit = 1 -> every block filled with 1s
        let compressed = w.finish();

        let width = 4;
        let mut dest = vec![0u8; width * 2];
        let mut lines = vec![0u8; scratch_len(width)];
        entropy_blc(&compressed, &mut dest, &mut lines, 2, width).unwrap();
        assert_eq!(dest, vec![1u8; width * 2]);
    }

    #[test]
    fn rejects_more_than_sixteen_blocks() {
        let compressed = [0u8];
        let mut dest = vec![0u8; 4];
        let mut lines = vec![0u8; scratch_len(4)];
        assert!(entropy_blc(&compressed, &mut dest, &mut lines, 17, 4).is_err());
    }
}
