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

//! Parses a version-discriminated vector-tile body (roads, land use, water,
//! rivers, points of interest, rails, power lines, and two unidentified line
//! categories) into typed feature arrays, computes the tile's geodetic
//! bounds, and applies the fixed road-width/culvert fixups.
//!
//! Picking which tile buffer to hand this parser, and any terrain-elevation
//! sideband feeding water heights, are owned by the (out-of-scope) record
//! layer; this crate only owns the bytes-in, typed-features-out contract.

mod bounds;
mod error;
mod features;
mod fixups;
mod quadkey;
mod reader;
mod vertex;

pub use bounds::VectorBounds;
pub use error::DecodeError;
pub use features::{PowerFeature, RailFeature, RiverFeature, RoadFeature, VertexRange, WaterFeatureEntry, WaterPolygon};
pub use quadkey::TileQuad;
pub use vertex::{LatLon, VectorVertex};

use reader::Cursor;

const ROAD_TYPE_COUNT: usize = 31;
const LAND_TYPE_COUNT: usize = 28;
const POINT_TYPE_COUNT: usize = 20;
const RAIL_TYPE_COUNT: usize = 9;
const POWER_TYPE_COUNT: usize = 2;
const UNKNOWN1_TYPE_COUNT: usize = 10;
const UNKNOWN2_TYPE_COUNT: usize = 5;

fn is_valid_height(val: f32) -> bool {
    !val.is_nan() && val > -750.0 && val < 10000.0
}

/// A fully parsed vector tile: one flat feature array plus a type-boundary
/// table per category, a shared vertex array per category, and the tile's
/// computed bounds.
#[derive(Debug, Clone, Default)]
pub struct VectorTile {
    pub quad: TileQuad,
    pub version: i32,
    pub bounds: VectorBounds,

    pub road_features: Vec<RoadFeature>,
    pub road_boundaries: Vec<usize>,
    pub road_vertices: Vec<VectorVertex>,

    pub land_features: Vec<VertexRange>,
    pub land_boundaries: Vec<usize>,
    pub land_vertices: Vec<VectorVertex>,

    pub water_polygons: Vec<WaterPolygon>,
    pub water_vertices: Vec<VectorVertex>,
    pub water_features: Vec<WaterFeatureEntry>,

    pub river_features: Vec<RiverFeature>,
    pub river_vertices: Vec<VectorVertex>,

    pub point_boundaries: Vec<usize>,
    pub point_vertices: Vec<VectorVertex>,

    pub rail_features: Vec<RailFeature>,
    pub rail_boundaries: Vec<usize>,
    pub rail_vertices: Vec<VectorVertex>,

    pub power_features: Vec<PowerFeature>,
    pub power_boundaries: Vec<usize>,
    pub power_vertices: Vec<VectorVertex>,

    pub unknown1_features: Vec<VertexRange>,
    pub unknown1_boundaries: Vec<usize>,
    pub unknown1_vertices: Vec<VectorVertex>,

    pub unknown2_features: Vec<VertexRange>,
    pub unknown2_boundaries: Vec<usize>,
    pub unknown2_vertices: Vec<VectorVertex>,
}

impl Default for TileQuad {
    fn default() -> Self {
        TileQuad { level: 0, tile_x: 0, tile_y: 0 }
    }
}

impl Default for VectorBounds {
    fn default() -> Self {
        VectorBounds {
            delta_lat: 0.0,
            delta_lon: 0.0,
            tile_width: 0.0,
            tile_height: 0.0,
            tl_lat: 0.0,
            tl_lon: 0.0,
            overlap_factor: 0.0,
        }
    }
}

impl VectorTile {
    /// Parses `data` (the tile body, signature and record framing already
    /// stripped by the caller) against `quad_key` and the tile-format
    /// `version`.
    ///
    /// `version == 19 && data.len() == 5`, or `data.len() == 1`, are the
    /// reference decoder's "empty tile" markers: an empty tile is returned
    /// without touching the quadkey or computing bounds, matching the
    /// original early-return exactly.
    pub fn from_binary(data: &[u8], quad_key: &str, version: i32) -> Result<VectorTile, DecodeError> {
        if (version == 19 && data.len() == 5) || data.len() == 1 {
            return Ok(VectorTile {
                version,
                ..VectorTile::default()
            });
        }

        let quad = quadkey::parse_quadkey(quad_key)?;
        let mut tile = VectorTile {
            quad,
            version,
            bounds: bounds::calc_bounds(&quad, version),
            ..VectorTile::default()
        };
        tile.parse(&mut Cursor::new(data), None)?;
        Ok(tile)
    }

    fn parse(&mut self, cursor: &mut Cursor, elevation: Option<&[f32]>) -> Result<(), DecodeError> {
        self.parse_roads(cursor)?;
        self.parse_land(cursor)?;
        self.parse_water(cursor, elevation)?;
        self.parse_rivers(cursor)?;
        self.parse_points(cursor)?;
        self.parse_rails(cursor)?;
        self.parse_power(cursor)?;
        self.parse_unknown1(cursor)?;
        self.parse_unknown2(cursor)?;
        Ok(())
    }

    fn parse_roads(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        let bit_mask = cursor.read_u32()? as u64;
        if let Some((boundaries, feature_count)) = features::unpack_bitmask(cursor, bit_mask, ROAD_TYPE_COUNT)? {
            let (mut roads, vertices) = read_roads(cursor, feature_count, self.version)?;
            fixups::fix_roads(&mut roads, &boundaries, &self.quad);
            self.road_features = roads;
            self.road_boundaries = boundaries;
            self.road_vertices = vertices;
        }
        Ok(())
    }

    fn parse_land(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        let bit_mask = cursor.read_u32()? as u64;
        if let Some((boundaries, feature_count)) = features::unpack_bitmask(cursor, bit_mask, LAND_TYPE_COUNT)? {
            let (features, vertices) = read_vertex_ranges(cursor, feature_count)?;
            self.land_features = features;
            self.land_boundaries = boundaries;
            self.land_vertices = vertices;
        }
        Ok(())
    }

    fn parse_water(&mut self, cursor: &mut Cursor, elevation: Option<&[f32]>) -> Result<(), DecodeError> {
        let water_count = cursor.read_u16()? as usize;
        if water_count == 0 {
            return Ok(());
        }

        let mut polygons = Vec::with_capacity(water_count);
        let mut val = cursor.read_u16()?;
        let mut elevation_iter = elevation.map(|e| e.iter());
        for _ in 0..water_count {
            let start = val;
            let height = if self.version < 20 {
                cursor.read_f32()?
            } else if let Some(&h) = elevation_iter.as_mut().and_then(|it| it.next()) {
                if is_valid_height(h) {
                    h
                } else {
                    -750.0
                }
            } else {
                -750.0
            };
            let end = cursor.read_u16()?;
            val = end;
            polygons.push(WaterPolygon { height, start, end });
        }
        self.water_vertices = cursor.read_vertices(val as usize)?;
        self.water_polygons = polygons;

        let water_feature_count = cursor.read_u16()? as usize;
        let mut water_features = Vec::with_capacity(water_feature_count);
        for _ in 0..water_feature_count {
            let polygon_count = cursor.read_u16()?;
            let water_type = match cursor.read_u8()? {
                0 => 5,
                1 => 2,
                2 => 3,
                3 => 4,
                4 => 0,
                5 => 1,
                _ => 7,
            };
            water_features.push(WaterFeatureEntry { water_type, polygon_count });
        }
        self.water_features = water_features;
        Ok(())
    }

    fn parse_rivers(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        let river_count = cursor.read_u16()? as usize;
        if river_count == 0 {
            return Ok(());
        }
        let mut features = Vec::with_capacity(river_count);
        let mut val = cursor.read_u16()?;
        for _ in 0..river_count {
            let start = val;
            let mut width = cursor.read_u8()?;
            if width >= 100 {
                width = 20;
            }
            let end = cursor.read_u16()?;
            val = end;
            features.push(RiverFeature { width, start, end });
        }
        self.river_vertices = cursor.read_vertices(val as usize)?;
        self.river_features = features;
        Ok(())
    }

    fn parse_points(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        let bit_mask = if self.version > 20 { cursor.read_u32()? as u64 } else { cursor.read_u16()? as u64 };
        if let Some((boundaries, count)) = features::unpack_bitmask(cursor, bit_mask, POINT_TYPE_COUNT)? {
            self.point_vertices = cursor.read_vertices(count)?;
            self.point_boundaries = boundaries;
        }
        Ok(())
    }

    fn parse_rails(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        let bit_mask = cursor.read_u16()? as u64;
        if let Some((boundaries, feature_count)) = features::unpack_bitmask(cursor, bit_mask, RAIL_TYPE_COUNT)? {
            let (mut rails, vertices) = read_rails(cursor, feature_count)?;
            for ty in 0..boundaries.len() - 1 {
                for rail in &mut rails[boundaries[ty]..boundaries[ty + 1]] {
                    rail.class = ty as u8;
                }
            }
            self.rail_features = rails;
            self.rail_boundaries = boundaries;
            self.rail_vertices = vertices;
        }
        Ok(())
    }

    fn parse_power(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        let bit_mask = cursor.read_u8()? as u64;
        if let Some((boundaries, feature_count)) = features::unpack_bitmask(cursor, bit_mask, POWER_TYPE_COUNT)? {
            let mut val = cursor.read_u16()?;
            let mut features = Vec::with_capacity(feature_count);
            for _ in 0..feature_count {
                let start = val;
                let id = cursor.read_u32()?;
                let end = cursor.read_u16()?;
                val = end;
                features.push(PowerFeature { id, start, end });
            }
            self.power_vertices = cursor.read_vertices(val as usize)?;
            self.power_features = features;
            self.power_boundaries = boundaries;
        }
        Ok(())
    }

    fn parse_unknown1(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        if self.version <= 20 {
            return Ok(());
        }
        let bit_mask = cursor.read_u16()? as u64;
        if let Some((boundaries, feature_count)) = features::unpack_bitmask(cursor, bit_mask, UNKNOWN1_TYPE_COUNT)? {
            let (features, vertices) = read_vertex_ranges(cursor, feature_count)?;
            self.unknown1_features = features;
            self.unknown1_boundaries = boundaries;
            self.unknown1_vertices = vertices;
        }
        Ok(())
    }

    fn parse_unknown2(&mut self, cursor: &mut Cursor) -> Result<(), DecodeError> {
        if self.version <= 20 {
            return Ok(());
        }
        let bit_mask = cursor.read_u8()? as u64;
        if let Some((boundaries, feature_count)) = features::unpack_bitmask(cursor, bit_mask, UNKNOWN2_TYPE_COUNT)? {
            let (features, vertices) = read_vertex_ranges(cursor, feature_count)?;
            self.unknown2_features = features;
            self.unknown2_boundaries = boundaries;
            self.unknown2_vertices = vertices;
        }
        Ok(())
    }

    pub fn vertex_to_lat_lon(&self, vertex: VectorVertex) -> LatLon {
        vertex::vertex_to_lat_lon(&self.bounds, vertex)
    }

    /// Road features whose boundary-table type index is `ty`; empty if `ty`
    /// is out of range or the roads section was absent.
    pub fn road_features_for(&self, ty: usize) -> &[RoadFeature] {
        slice_for(&self.road_features, &self.road_boundaries, ty)
    }

    pub fn rail_features_for(&self, ty: usize) -> &[RailFeature] {
        slice_for(&self.rail_features, &self.rail_boundaries, ty)
    }

    pub fn power_features_for(&self, ty: usize) -> &[PowerFeature] {
        slice_for(&self.power_features, &self.power_boundaries, ty)
    }

    pub fn point_vertices_for(&self, ty: usize) -> &[VectorVertex] {
        slice_for(&self.point_vertices, &self.point_boundaries, ty)
    }
}

fn slice_for<'a, T>(items: &'a [T], boundaries: &[usize], ty: usize) -> &'a [T] {
    if ty + 1 >= boundaries.len() {
        return &[];
    }
    &items[boundaries[ty]..boundaries[ty + 1]]
}

fn read_roads(cursor: &mut Cursor, feature_count: usize, version: i32) -> Result<(Vec<RoadFeature>, Vec<VectorVertex>), DecodeError> {
    let mut val = cursor.read_u16()? as u32;
    let mut roads = Vec::with_capacity(feature_count);
    for _ in 0..feature_count {
        let start = val;
        let id = cursor.read_u32()?;
        let flags_byte = cursor.read_u8()?;
        let mut flags = if version < 21 { ((flags_byte >> 1) & 0xE0) | 0x80 } else { (flags_byte >> 1) & 0x60 };
        let width = 2 * (flags_byte & 0x3F);

        let lanes = if version < 21 {
            0
        } else {
            let lanes_byte = cursor.read_u8()?;
            let four_lanes = lanes_byte.wrapping_mul(4);
            flags = four_lanes ^ ((flags ^ four_lanes) & 0x7F);
            lanes_byte & 0x1F
        };

        let level = if flags & 0x60 == 0x40 { Some(cursor.read_u8()?) } else { None };
        let end = cursor.read_u16()? as u32;
        val = end;

        roads.push(RoadFeature { id, width, start, end, flags, lanes, level });
    }
    let vertices = cursor.read_vertices(val as usize)?;
    Ok((roads, vertices))
}

fn read_rails(cursor: &mut Cursor, feature_count: usize) -> Result<(Vec<RailFeature>, Vec<VectorVertex>), DecodeError> {
    let mut val = cursor.read_u16()?;
    let mut rails = Vec::with_capacity(feature_count);
    for _ in 0..feature_count {
        let start = val;
        let mut id = cursor.read_u32()?;
        let width = cursor.read_u8()?;
        let crossing = (id >> 30) as u8;
        id &= 0x3F_FFFF;
        let level = if crossing == 2 { Some(cursor.read_u8()?) } else { None };
        let end = cursor.read_u16()?;
        val = end;
        rails.push(RailFeature { id, width, start, end, class: 0, crossing, level });
    }
    let vertices = cursor.read_vertices(val as usize)?;
    Ok((rails, vertices))
}

fn read_vertex_ranges(cursor: &mut Cursor, feature_count: usize) -> Result<(Vec<VertexRange>, Vec<VectorVertex>), DecodeError> {
    let mut val = cursor.read_u16()?;
    let mut out = Vec::with_capacity(feature_count);
    for _ in 0..feature_count {
        let start = val;
        let end = cursor.read_u16()?;
        val = end;
        out.push(VertexRange { start: start as u32, end: end as u32 });
    }
    let vertices = cursor.read_vertices(val as usize)?;
    Ok((out, vertices))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_u16(v: u16) -> [u8; 2] {
        v.to_le_bytes()
    }

    fn le_u32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    /// An empty body: every bitmask-indexed section and count reads as zero.
    fn empty_tile_body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&le_u32(0)); // roads bitmask
        body.extend_from_slice(&le_u32(0)); // land bitmask
        body.extend_from_slice(&le_u16(0)); // water count
        body.extend_from_slice(&le_u16(0)); // river count
        body.extend_from_slice(&le_u16(0)); // points bitmask (v <= 20)
        body.extend_from_slice(&le_u16(0)); // rails bitmask
        body.push(0); // power bitmask
        body
    }

    #[test]
    fn short_circuit_markers_skip_quadkey_and_bounds() {
        let tile = VectorTile::from_binary(&[0u8], "0123", 19).unwrap();
        assert_eq!(tile.quad, TileQuad::default());
        assert_eq!(tile.bounds, VectorBounds::default());
    }

    #[test]
    fn empty_body_parses_with_every_section_absent() {
        let body = empty_tile_body();
        let tile = VectorTile::from_binary(&body, "0123012301", 18).unwrap();
        assert!(tile.road_features.is_empty());
        assert!(tile.land_features.is_empty());
        assert!(tile.water_polygons.is_empty());
        assert!(tile.river_features.is_empty());
        assert!(tile.rail_features.is_empty());
        assert!(tile.power_features.is_empty());
        assert_eq!(tile.quad.level, 10);
    }

    #[test]
    fn invalid_quadkey_character_is_rejected() {
        let body = empty_tile_body();
        assert_eq!(VectorTile::from_binary(&body, "012x", 18), Err(DecodeError::InvalidHeader));
    }

    #[test]
    fn truncated_body_reports_underrun() {
        assert_eq!(VectorTile::from_binary(&[0, 0], "01", 18), Err(DecodeError::Underrun));
    }
}
