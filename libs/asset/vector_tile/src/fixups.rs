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

//! Post-parse road cleanup: default widths by class, and a hard-coded
//! culvert override list keyed by a masked id and tile level.

use crate::features::RoadFeature;
use crate::quadkey::TileQuad;

/// Indexed by `class >> 1`; `class` is the road's type index within its
/// bitmask section.
const ROAD_WIDTHS: [f32; 16] = [
    12.5, 12.5, 12.5, 12.5, 12.5, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 7.5, 3.0, 0.0,
];

/// `(id, l0, l1, l2)`; a road matches when its masked id equals `id` and the
/// tile's level equals any of `l0`/`l1`/`l2`, or `l0` is negative (match at
/// any level).
const ROAD_FIXUPS: &[(u32, i32, i32, i32)] = &[
    (0x0102D8D6, -1, -1, -1),
    (0x0102D8E3, -1, -1, -1),
    (0x0103782D, -1, -1, -1),
    (0x01037833, -1, -1, -1),
    (0x01037834, -1, -1, -1),
    (0x01037835, -1, -1, -1),
    (0x01037844, -1, -1, -1),
    (0x01037855, -1, -1, -1),
    (0x0104718C, -1, -1, -1),
    (0x010471AE, -1, -1, -1),
    (0x01047CE1, -1, -1, -1),
    (0x00817821, 8, 12, -1),
    (0x0081781E, 8, 12, -1),
    (0x01E830C0, 14, -1, -1),
    (0x01E83101, 14, -1, -1),
    (0x01E83136, 14, -1, -1),
    (0x01E830B7, 14, -1, -1),
    (0x01E7C672, 12, 14, -1),
    (0x01E82FE8, 12, 14, -1),
    (0x01E83151, 12, 14, -1),
    (0x01E8315E, 12, 14, -1),
    (0x01E83171, 12, 14, -1),
    (0x01E82F33, 8, 12, -1),
    (0x01E82EC4, 12, 14, -1),
    (0x01E8315F, -1, -1, -1),
    (0x01E83163, -1, -1, -1),
    (0x01E82EE8, 14, -1, -1),
    (0x01E83154, 12, 14, -1),
    (0x01E83152, 12, 14, -1),
    (0x01E82FA3, 12, 14, -1),
    (0x01E83170, 12, 14, -1),
    (0x04D097A7, -1, -1, -1),
    (0x00F2488E, -1, -1, -1),
    (0x01BCF210, -1, -1, -1),
    (0x03F6FAE8, -1, -1, -1),
    (0x055342B7, -1, -1, -1),
    (0x06D680A9, -1, -1, -1),
    (0x06357AAC, -1, -1, -1),
    (0x0676006B, -1, -1, -1),
    (0x067600F8, -1, -1, -1),
    (0x067600FD, -1, -1, -1),
    (0x06760395, -1, -1, -1),
    (0x0676039F, -1, -1, -1),
    (0x067603BD, -1, -1, -1),
    (0x067603C0, -1, -1, -1),
    (0x067603C2, -1, -1, -1),
    (0x067603C5, -1, -1, -1),
    (0x067603DB, -1, -1, -1),
    (0x005CC197, -1, -1, -1),
    (0x01D4862F, -1, -1, -1),
    (0x01D47EFE, -1, -1, -1),
    (0x0628E1E0, -1, -1, -1),
    (0x0628E1AD, -1, -1, -1),
    (0x027EF4EA, -1, -1, -1),
    (0x027EF4EB, -1, -1, -1),
    (0x0728AD25, -1, -1, -1),
    (0x05AC979C, -1, -1, -1),
    (0x04BDF011, -1, -1, -1),
    (0x06EF8996, -1, -1, -1),
    (0x06533E90, -1, -1, -1),
    (0x06533923, -1, -1, -1),
    (0x06533E89, -1, -1, -1),
    (0x005EB09D, -1, -1, -1),
    (0x0623E32B, -1, -1, -1),
    (0x06F3C47C, -1, -1, -1),
    (0x0391FA99, -1, -1, -1),
    (0x04460CB0, -1, -1, -1),
    (0x008A4916, -1, -1, -1),
    (0x05216484, -1, -1, -1),
    (0x05E3DFE6, -1, -1, -1),
    (0x0623E32B, -1, -1, -1),
    (0x07FFFFFF, -1, -1, -1),
    (0x033F34AA, -1, -1, -1),
    (0x029F7146, -1, -1, -1),
    (0x04DAA4CD, -1, -1, -1),
    (0x027B8B1D, -1, -1, -1),
    (0x03825BAF, -1, -1, -1),
    (0x0265A627, -1, -1, -1),
    (0x0265A626, -1, -1, -1),
    (0x0265A0DB, -1, -1, -1),
    (0x0265A632, -1, -1, -1),
    (0x0265A629, -1, -1, -1),
    (0x0265A62C, -1, -1, -1),
    (0x0265A62D, -1, -1, -1),
    (0x0265A62E, -1, -1, -1),
    (0x0265A62F, -1, -1, -1),
    (0x0265A630, -1, -1, -1),
    (0x0265A631, -1, -1, -1),
    (0x0478B01E, -1, -1, -1),
    (0x02D6B3B5, -1, -1, -1),
    (0x02D6B3C1, -1, -1, -1),
    (0x05797AD3, -1, -1, -1),
    (0x0360131D, -1, -1, -1),
    (0x03601310, -1, -1, -1),
    (0x0360130C, -1, -1, -1),
    (0x0360130E, -1, -1, -1),
    (0x0360130B, -1, -1, -1),
    (0x0455DB55, -1, -1, -1),
    (0x0455DB85, -1, -1, -1),
    (0x0455DB89, -1, -1, -1),
    (0x0455DB88, -1, -1, -1),
    (0x0664B2E2, -1, -1, -1),
    (0x051BDA74, -1, -1, -1),
    (0x05FDF782, -1, -1, -1),
    (0x01E1E701, -1, -1, -1),
    (0x01E1E6FD, -1, -1, -1),
    (0x01E1E6FE, -1, -1, -1),
    (0x014875AB, -1, -1, -1),
    (0x06F91748, -1, -1, -1),
    (0x02054E70, -1, -1, -1),
    (0x02054E70, -1, -1, -1),
];

const CULVERT_FLAG: u8 = 0x20;

fn is_culvert(flags: u8) -> bool {
    flags & 0x60 == CULVERT_FLAG
}

/// Applies default widths, the level-8157/4718-4719 special case, and the
/// `ROAD_FIXUPS` culvert table to every road, keyed by its boundary-table
/// type index.
pub fn fix_roads(roads: &mut [RoadFeature], boundaries: &[usize], quad: &TileQuad) {
    for ty in 0..boundaries.len() - 1 {
        for road in &mut roads[boundaries[ty]..boundaries[ty + 1]] {
            road.flags &= 0xE0;
            road.flags |= (ty as u8) & 0x1F;

            if road.width == 0 {
                if road.id >> 27 == 0 {
                    road.id &= 0x7FF_FFFF;
                    road.id |= 0x800_0000;
                }
                road.width = ((road.id >> 27) as f32 * ROAD_WIDTHS[ty >> 1]) as u8;
            }

            if quad.level == 14 && quad.tile_x == 8157 && (quad.tile_y == 4718 || quad.tile_y == 4719) {
                road.flags &= 0xBF;
                road.flags |= CULVERT_FLAG;
            }

            if is_culvert(road.flags) {
                continue;
            }

            let masked_id = road.id & 0x7FF_FFFF;
            for &(id, l0, l1, l2) in ROAD_FIXUPS {
                if masked_id == id && (l0 < 0 || l0 == quad.level || l1 == quad.level || l2 == quad.level) {
                    road.flags &= 0xBF;
                    road.flags |= CULVERT_FLAG;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road(id: u32, width: u8, flags: u8) -> RoadFeature {
        RoadFeature { id, width, start: 0, end: 0, flags, lanes: 0, level: None }
    }

    #[test]
    fn zero_width_road_gets_a_class_based_default() {
        let mut roads = vec![road(0x0800_0000, 0, 0)];
        let quad = TileQuad { level: 5, tile_x: 1, tile_y: 1 };
        fix_roads(&mut roads, &[0, 1], &quad);
        assert_eq!(roads[0].width, 12); // (1 << 27 >> 27) * 12.5 = 12.5 -> truncates to 12
    }

    #[test]
    fn fixup_table_marks_matching_road_as_culvert() {
        let mut roads = vec![road(0x0102D8D6, 5, 0)];
        let quad = TileQuad { level: 9, tile_x: 0, tile_y: 0 };
        fix_roads(&mut roads, &[0, 1], &quad);
        assert!(is_culvert(roads[0].flags));
    }

    #[test]
    fn already_culvert_roads_are_left_alone_by_the_table_pass() {
        let mut roads = vec![road(0xFFFF_FFFF, 5, CULVERT_FLAG)];
        let quad = TileQuad { level: 9, tile_x: 0, tile_y: 0 };
        fix_roads(&mut roads, &[0, 1], &quad);
        assert_eq!(roads[0].flags & 0x60, CULVERT_FLAG);
    }
}
