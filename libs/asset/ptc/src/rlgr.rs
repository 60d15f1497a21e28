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

//! Run-length Golomb-Rice coefficient decoder (C7 "RLGR"). Samples are
//! either a run of zeros or a single Golomb-Rice coded magnitude and sign,
//! with two independently adapting parameters: one for run length, one for
//! the Golomb-Rice remainder.

use bitio::MsbBitPool;

struct State {
    run: i32,
    k: i32,
    kp: i32,
    kr: i32,
    krp: i32,
}

/// Absorbs a run of `state.run` zeros into `dest` starting at `count`,
/// returning the (possibly decremented) position the caller should resume
/// writing non-zero values at.
fn run_length(state: &mut State, dest: &mut [i32], mut count: usize, partial: bool) -> usize {
    if state.run > 0 {
        loop {
            dest[count] = 0;
            count += 1;
            state.run -= 1;
            if !(count < dest.len() && state.run > 0) {
                break;
            }
        }
    }

    if partial {
        state.kp = (state.kp - 6).max(0);
    } else {
        count -= 1;
        state.kp = (state.kp + 4).min(120);
    }
    count
}

fn code_gr(pool: &mut MsbBitPool, state: &mut State) -> i32 {
    state.kr = state.krp >> 3;
    let mut p = 0i32;
    let val;
    loop {
        if pool.read_bit().unwrap_or(0) == 0 {
            val = if state.kr != 0 {
                (p << state.kr) + pool.read_bits(state.kr as u32).unwrap_or(0) as i32
            } else {
                p
            };
            break;
        }
        p += 1;
    }

    if p == 0 {
        state.krp = (state.krp - 2).max(0);
    } else if p > 1 {
        state.krp = (state.krp + p).min(120);
    }
    val
}

/// Decode `dest.len()` coefficients from `compressed`, using `range` to pick
/// the starting Rice parameter. Returns the number of compressed bytes
/// consumed.
pub fn entropy_rlgr(compressed: &[u8], dest: &mut [i32], range: i32) -> usize {
    if compressed.is_empty() || dest.is_empty() {
        return 0;
    }

    let mut pool = MsbBitPool::new(compressed);

    let (k, kr) = if range > 1 {
        let mut kr = 0;
        let mut r = range + 1;
        while r > 1 {
            r >>= 1;
            kr += 1;
        }
        (0, kr)
    } else {
        (1, 2)
    };

    let mut state = State {
        run: 0,
        k,
        kp: k << 3,
        kr,
        krp: kr << 3,
    };

    let mut count = 0usize;
    while count < dest.len() {
        state.k = state.kp >> 3;

        if state.k == 0 {
            let raw = code_gr(&mut pool, &mut state);
            let mut val = (raw + 1) >> 1;
            if val != 0 {
                state.kp = (state.kp - 3).max(0);
            } else {
                state.kp = (state.kp + 3).min(120);
            }
            if raw & 1 != 0 {
                val = -val;
            }
            dest[count] = val;
            count += 1;
        } else if pool.read_bit().unwrap_or(0) == 0 {
            state.run = 1 << state.k;
            count = run_length(&mut state, dest, count, false);
            count += 1;
        } else {
            state.run = pool.read_bits(state.k as u32).unwrap_or(0) as i32;
            count = run_length(&mut state, dest, count, true);
            let sign = pool.read_bit().unwrap_or(0);
            let val = code_gr(&mut pool, &mut state);
            if count < dest.len() {
                dest[count] = if sign != 0 { -(val + 1) } else { val + 1 };
            }
            count += 1;
        }
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
        assert_eq!(entropy_rlgr(&[], &mut dest, 4), 0);
    }

    #[test]
    fn zero_value_decodes_with_k_zero_path() {
        // range <= 1 forces k=1, kr=2, so the first sample takes the
        // "complete run" branch (readBit == 0) rather than the k==0 path.
        let mut w = MsbBitWriter::new();
        w.push_bits(0, 1); // readBit() == 0 -> complete run of 1<<k = 2 zeros
        let compressed = w.finish();
        let mut dest = [9i32; 2];
        entropy_rlgr(&compressed, &mut dest, 1);
        assert_eq!(dest, [0, 0]);
    }
}
