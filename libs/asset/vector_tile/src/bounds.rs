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

//! Tile geodetic bounds: a fixed-point Web Mercator inverse plus an
//! overlap apron sized off the tile's pixel ground resolution, computed once
//! per tile from its quadkey and format version.

use crate::quadkey::TileQuad;
use std::f64::consts::PI;

/// Top-left lat/lon, deltas, and pixel-to-degree multipliers for one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorBounds {
    pub delta_lat: f64,
    pub delta_lon: f64,
    pub tile_width: f32,
    pub tile_height: f32,
    pub tl_lat: f64,
    pub tl_lon: f64,
    pub overlap_factor: f32,
}

fn normalized_to_lat(norm: f64) -> f64 {
    90.0 - (norm * 2.0 * PI - PI).exp().atan() * (360.0 / PI)
}

fn normalized_to_lon(norm: f64) -> f64 {
    (norm - 0.5) * 360.0
}

/// `overlap` is 10 for tile-format version ≤ 14, 80 otherwise.
pub fn calc_bounds(quad: &TileQuad, version: i32) -> VectorBounds {
    let overlap_factor: f32 = if version > 14 { 80.0 } else { 10.0 };

    let level_cells = if quad.level < 0 {
        2f64.powi(quad.level)
    } else if quad.level > 0 {
        (1i64 << quad.level) as f64
    } else {
        0.0
    };

    let norm_lon = (quad.tile_x as f64 + 0.5) / level_cells;
    let norm_lat = (quad.tile_y as f64 + 0.5) / level_cells;
    let pixel_ratio = 1.442700600680826e10 / (256i64 << quad.level) as f64;
    let overlap_y = overlap_factor as f64 * 0.000008983152841195214
        + pixel_ratio * 0.00000002495320233665337
        + 0.001122894105149402;
    let overlap_x = 0.00000002495320233665337
        / (normalized_to_lat(norm_lat) * PI / 180.0).cos()
        * (overlap_factor as f64 * 360.0 + pixel_ratio + 45000.0);

    let tl_lat = normalized_to_lat(norm_lat + 0.5 / level_cells) - overlap_y;
    let tl_lon = normalized_to_lon(norm_lon - 0.5 / level_cells) - overlap_x;
    let delta_lat = normalized_to_lat(norm_lat - 0.5 / level_cells) + overlap_y - tl_lat;
    let delta_lon = normalized_to_lon(norm_lon + 0.5 / level_cells) + overlap_x - tl_lon;

    let tile_width = ((overlap_x + overlap_x) / (delta_lon - (overlap_x + overlap_x)) + 1.0) as f32;
    let tile_height = ((overlap_y + overlap_y) / (delta_lat - (overlap_y + overlap_y)) + 1.0) as f32;

    VectorBounds {
        delta_lat,
        delta_lon,
        tile_width,
        tile_height,
        tl_lat,
        tl_lon,
        overlap_factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadkey::parse_quadkey;

    #[test]
    fn overlap_factor_switches_above_version_fourteen() {
        let quad = parse_quadkey("0123012301230").unwrap(); // level 13
        assert_eq!(calc_bounds(&quad, 14).overlap_factor, 10.0);
        assert_eq!(calc_bounds(&quad, 15).overlap_factor, 80.0);
    }

    #[test]
    fn bounds_are_deterministic_for_the_same_quadkey() {
        let quad = parse_quadkey("021301230123").unwrap();
        let a = calc_bounds(&quad, 21);
        let b = calc_bounds(&quad, 21);
        assert_eq!(a, b);
    }
}
