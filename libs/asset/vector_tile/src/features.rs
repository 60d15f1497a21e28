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

//! Per-category feature records and the bitmask-indexed type-boundary table
//! shared by every section.
//!
//! The reference decoder keeps one raw pointer per type into a flat feature
//! vector; here a type's features are `features[boundaries[type]..
//! boundaries[type + 1]]`, which is the same "indexed view instead of
//! pointer arithmetic" redesign used for the PTC coefficient planes.

use crate::error::DecodeError;
use crate::reader::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadFeature {
    pub id: u32,
    pub width: u8,
    pub start: u32,
    pub end: u32,
    pub flags: u8,
    pub lanes: u8,
    /// `None` is the reference decoder's `Level == 0xFF` sentinel (bits 6-7 of `flags` != 2).
    pub level: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RailFeature {
    pub id: u32,
    pub width: u8,
    pub start: u16,
    pub end: u16,
    pub class: u8,
    pub crossing: u8,
    pub level: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiverFeature {
    pub width: u8,
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterPolygon {
    pub height: f32,
    pub start: u16,
    pub end: u16,
}

/// The reference decoder repurposes a plain `(Start, End)` vertex-range
/// struct for this table: `Start` holds the remapped water-type code and
/// `End` the polygon count for that type. Named fields read better than the
/// borrowed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterFeatureEntry {
    pub water_type: u8,
    pub polygon_count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerFeature {
    pub id: u32,
    pub start: u16,
    pub end: u16,
}

/// Reads a bitmask-indexed section header: the bitmask itself, "first bit
/// set per group" offsets, and the trailing total feature count. Returns
/// `None` when the bitmask is zero (the whole section is absent).
///
/// `bit_mask` has already been read by the caller (its width varies by
/// category and format version); `num_types` is the category's type count,
/// giving a `num_types + 1`-entry boundary table (the last entry is the
/// total feature count, closing the final type's range).
pub fn unpack_bitmask(cursor: &mut Cursor, bit_mask: u64, num_types: usize) -> Result<Option<(Vec<usize>, usize)>, DecodeError> {
    if bit_mask == 0 {
        return Ok(None);
    }

    let boundaries_len = num_types + 1;
    let mut boundaries = vec![0usize; boundaries_len];
    let mut ty = (bit_mask & 1) as usize;

    for i in 1..(boundaries_len - 1) {
        let bit = 1u64 << i;
        if bit & bit_mask != 0 {
            if (bit - 1) & bit_mask != 0 {
                let offset = cursor.read_u16()? as usize;
                while ty <= i {
                    boundaries[ty] = offset;
                    ty += 1;
                }
            } else {
                while ty <= i {
                    boundaries[ty] = 0;
                    ty += 1;
                }
            }
        }
    }

    let feature_count = cursor.read_u16()? as usize;
    for b in boundaries.iter_mut().skip(ty) {
        *b = feature_count;
    }

    Ok(Some((boundaries, feature_count)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bitmask_means_the_section_is_absent() {
        let mut cursor = Cursor::new(&[]);
        assert_eq!(unpack_bitmask(&mut cursor, 0, 5).unwrap(), None);
    }

    #[test]
    fn a_single_type_bit_yields_one_nonempty_range() {
        // bit 0 set only: every feature belongs to type 0, no per-group offsets read.
        let mut cursor = Cursor::new(&[7, 0]); // trailing feature_count = 7
        let (boundaries, count) = unpack_bitmask(&mut cursor, 0b1, 3).unwrap().unwrap();
        assert_eq!(count, 7);
        assert_eq!(boundaries, vec![0, 7, 7, 7]);
    }
}
