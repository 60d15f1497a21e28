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

//! Static scan-order tables (C6/C7 reorder): the byte-packed row/column
//! offsets the entropy-decoded coefficient vector gets scattered through on
//! its way into a 4x4 block, for both the AC (Peano) and DC
//! (spatial-frequency) scans.

use lazy_static::lazy_static;

/// Packed as `(row << 4) | col`, Peano + spatial-frequency ordered scan.
pub const BLOCK_OFFSET_AC: [u8; 16] = [
    0x00, 0x04, 0x44, 0x40, 0x80, 0xC0, 0xC4, 0x84, 0x88, 0xC8, 0xCC, 0x8C, 0x4C, 0x48, 0x08, 0x0C,
];

/// Packed as `(row << 4) | col`, spatial-frequency scan used for DC blocks.
pub const BLOCK_OFFSET_DC: [u8; 16] = [
    0x00, 0x04, 0x44, 0x40, 0x80, 0x84, 0x48, 0x08, 0x0C, 0x4C, 0x88, 0xC4, 0xC0, 0xC8, 0xCC, 0x8C,
];

lazy_static! {
    /// `BLOCK_OFFSET_AC`/`_DC` split into `(row, col)` pairs, computed once
    /// since every chunk decode re-walks the same 16 entries.
    pub static ref AC_ROW_COL: [(usize, usize); 16] =
        { let mut out = [(0usize, 0usize); 16]; for (i, &b) in BLOCK_OFFSET_AC.iter().enumerate() { out[i] = ((b >> 4) as usize, (b & 0xF) as usize); } out };
    pub static ref DC_ROW_COL: [(usize, usize); 16] =
        { let mut out = [(0usize, 0usize); 16]; for (i, &b) in BLOCK_OFFSET_DC.iter().enumerate() { out[i] = ((b >> 4) as usize, (b & 0xF) as usize); } out };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ac_row_col_matches_packed_table() {
        assert_eq!(AC_ROW_COL[4], (2, 0));
        assert_eq!(DC_ROW_COL[4], (2, 0));
    }

    #[test]
    fn tables_cover_all_sixteen_block_positions() {
        let mut seen = [false; 16];
        for &(r, c) in AC_ROW_COL.iter() {
            seen[r * 4 + c] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
