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

//! Rectangular sub-window selection against a decoded frame's full extent.
//!
//! `processHeader`'s `HasSubregion` branch validates a requested
//! `(left, top, width, height)` window against the frame before computing
//! which macroblock/chunk range covers it. Its height check reads
//! `Frame.Height + Params.Top > Frame.Height`, which is true for any
//! `Top > 0` regardless of `Params.Height` — almost certainly meant to read
//! `Params.Height + Params.Top`. It is reproduced here unmodified rather
//! than "corrected", since no build of the original ever shipped with a fix.

use crate::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subregion {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// The macroblock-aligned chunk window a subregion covers, plus the pixel
/// offset from the first covered macroblock row/chunk column to the
/// subregion's actual top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubregionPlan {
    pub top_chunk: i32,
    pub left_chunk: i32,
    pub bottom_chunk: i32,
    pub right_chunk: i32,
    pub top_offset: i32,
    pub left_offset: i32,
}

/// Validates a subregion against the frame's full extent and derives the
/// chunk-aligned window covering it.
///
/// `chunk_width` is the frame's tile chunk width (columns per entropy-coded
/// chunk); rows are always grouped in macroblocks of 16.
pub fn validate_subregion(frame_width: i32, frame_height: i32, chunk_width: i32, sub: &Subregion) -> Result<SubregionPlan, DecodeError> {
    if sub.width <= 0 || sub.height <= 0 || sub.left < 0 || sub.top < 0 {
        return Err(DecodeError::InvalidHeader);
    }
    // Reproduced verbatim from the reference header validation: always
    // true for Top > 0, so in practice any nonzero top offset is rejected.
    if frame_height + sub.top > frame_height {
        return Err(DecodeError::InvalidHeader);
    }
    if frame_width + sub.left > frame_width {
        return Err(DecodeError::InvalidHeader);
    }
    let chunk_width = chunk_width.max(1);

    let top_chunk = sub.top / 16;
    let left_chunk = sub.left / chunk_width;
    let bottom_chunk = (sub.top + sub.height + 15) / 16;
    let right_chunk = (sub.left + sub.width + chunk_width - 1) / chunk_width;
    let top_offset = sub.top % 16;
    let left_offset = sub.left % chunk_width;

    Ok(SubregionPlan {
        top_chunk,
        left_chunk,
        bottom_chunk,
        right_chunk,
        top_offset,
        left_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_top_and_left_is_always_accepted() {
        let sub = Subregion { left: 0, top: 0, width: 32, height: 32 };
        let plan = validate_subregion(256, 256, 32, &sub).unwrap();
        assert_eq!(plan.top_chunk, 0);
        assert_eq!(plan.left_chunk, 0);
    }

    #[test]
    fn any_nonzero_top_trips_the_inherited_bounds_quirk() {
        // Frame.Height + Params.Top > Frame.Height is true whenever Top > 0,
        // so a subregion offset from the top edge is always rejected here,
        // exactly as in the reference decoder.
        let sub = Subregion { left: 0, top: 1, width: 32, height: 32 };
        assert_eq!(validate_subregion(256, 256, 32, &sub), Err(DecodeError::InvalidHeader));
    }

    #[test]
    fn negative_dimensions_are_rejected() {
        let sub = Subregion { left: 0, top: 0, width: -1, height: 32 };
        assert_eq!(validate_subregion(256, 256, 32, &sub), Err(DecodeError::InvalidHeader));
    }
}
