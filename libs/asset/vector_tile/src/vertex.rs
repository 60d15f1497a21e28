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

//! Vertices are shared across every feature category: two quantized 16-bit
//! integers that map into a tile's lat/lon rectangle via its precomputed
//! bounds.

use crate::bounds::VectorBounds;

/// `1 / 65535 * 2^-16`, pre-multiplied so `lat`/`lon` fall out of one FMA.
const QUANT_TO_UNIT: f64 = 0.00001525902189669642175936522469;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VectorVertex {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

pub fn vertex_to_lat_lon(bounds: &VectorBounds, vertex: VectorVertex) -> LatLon {
    LatLon {
        lon: bounds.tl_lon + bounds.delta_lon * vertex.start as f64 * QUANT_TO_UNIT,
        lat: bounds.tl_lat + bounds.delta_lat * vertex.end as f64 * QUANT_TO_UNIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_vertex_maps_to_the_top_left_corner() {
        let bounds = VectorBounds {
            delta_lat: 1.0,
            delta_lon: 1.0,
            tile_width: 1.0,
            tile_height: 1.0,
            tl_lat: 10.0,
            tl_lon: 20.0,
            overlap_factor: 10.0,
        };
        let ll = vertex_to_lat_lon(&bounds, VectorVertex { start: 0, end: 0 });
        assert_eq!(ll.lat, 10.0);
        assert_eq!(ll.lon, 20.0);
    }
}
