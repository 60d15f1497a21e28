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

//! Bit-plane coefficient decoder (C7 "BPC"). Coefficients are resolved one
//! bit-plane at a time, from the most significant plane down, with a
//! per-plane adaptive run-length code marking which samples are still
//! undetermined (bit 30) and which have settled on a sign (bit 31).

use bitio::MsbBitPool;

const RESOLVED: u32 = 0x4000_0000;
const SIGN: u32 = 0x8000_0000;
const MAGNITUDE_MASK: u32 = 0x3FFF_FFFF;

/// Decode `dest_count` coefficients out of `compressed`, laid out across
/// `plane_count` total bit-planes, using `k_init` as the adaptive run-length
/// coder's starting parameter. Returns the number of compressed bytes
/// consumed.
pub fn entropy_bpc(compressed: &[u8], plane_count: i32, dest: &mut [i32], k_init: i32) -> usize {
    if compressed.is_empty() || dest.is_empty() {
        return 0;
    }

    let mut pool = MsbBitPool::new(compressed);
    let mut work = vec![0u32; dest.len()];

    let planes = pool.read_bits(6).unwrap_or(0) as i32;
    let unknown_count = pool.read_bits(2).unwrap_or(0);
    if unknown_count != 0 {
        let unknown_length = pool.read_bits(4).unwrap_or(0);
        for _ in 0..=unknown_count {
            let _ = pool.read_bits(unknown_length);
        }
    }
    pool.flush();

    let mut plane = planes - 1;
    while plane > plane_count - planes {
        let local_mask = 1u32 << plane;

        if plane != planes - 1 {
            for slot in work.iter_mut() {
                if *slot & RESOLVED == 0 {
                    continue;
                }
                if pool.read_bit().unwrap_or(0) != 0 {
                    *slot |= local_mask;
                }
            }
        }

        let mut kp: i32 = k_init << 3;
        let mut i = 0usize;
        while i < work.len() {
            if work[i] & RESOLVED != 0 {
                i += 1;
                continue;
            }

            let k = kp >> 3;
            if k == 0 {
                if pool.read_bit().unwrap_or(0) == 0 {
                    kp = (kp + 4).min(96);
                    i += 1;
                    continue;
                }
                work[i] |= RESOLVED;
                if pool.read_bit().unwrap_or(0) != 0 {
                    work[i] |= SIGN;
                }
                work[i] |= local_mask;
                kp = (kp - 3).max(0);
                i += 1;
            } else if pool.read_bit().unwrap_or(0) == 0 {
                let mut run = 1i32 << k;
                while run > 0 && i < work.len() {
                    if work[i] & RESOLVED == 0 {
                        run -= 1;
                    }
                    i += 1;
                }
                i = i.saturating_sub(1);
                kp = (kp + 5).min(96);
                i += 1;
            } else {
                let sign = pool.read_bit().unwrap_or(0);
                let mut run = pool.read_bits(k as u32).unwrap_or(0) as i32 + 1;
                while run > 0 && i < work.len() {
                    if work[i] & RESOLVED == 0 {
                        run -= 1;
                    }
                    i += 1;
                }
                if i >= work.len() {
                    continue;
                }
                work[i] |= RESOLVED;
                if sign != 0 {
                    work[i] |= SIGN;
                }
                work[i] |= local_mask;
                kp = (kp - 6).max(0);
                i += 1;
            }
        }

        pool.flush();
        plane -= 1;
    }

    for (d, &val) in dest.iter_mut().zip(work.iter()) {
        let magnitude = (val & MAGNITUDE_MASK) as i32;
        *d = if val & SIGN != 0 { -magnitude } else { magnitude };
    }

    pool.bytes_consumed()
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
    fn empty_input_yields_no_bytes_consumed() {
        let mut dest = [0i32; 4];
        assert_eq!(entropy_bpc(&[], 4, &mut dest, 1), 0);
    }

    #[test]
    fn single_plane_all_zero_leaves_dest_zeroed() {
        let mut w = MsbBitWriter::new();
        w.push_bits(1, 6); // planes = 1
        w.push_bits(0, 2); // unknownCount = 0
        // plane loop: plane = 0, plane_count - planes = 3, loop condition 0 > 3 is false => no plane runs.
        let compressed = w.finish();
        let mut dest = [7i32; 4];
        entropy_bpc(&compressed, 4, &mut dest, 1);
        assert_eq!(dest, [0, 0, 0, 0]);
    }
}
