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

//! Packs a decoded PTC image's per-channel planes (§4.7's row-packing step)
//! into the interleaved byte buffer the raster dispatcher's callers expect:
//! one sample per channel per pixel, channel-minor, row-major, each sample
//! widened to `bpp` bits.

use ptc::DecodedImage;

/// Interleave `image`'s planar channels into `bpp`-bits-per-sample packed
/// pixels. `bpp` of 8 keeps one byte per channel; 16 widens each sample to a
/// little-endian `u16` (the channel's 8-bit plane value left-shifted so full
/// white/black still land at the format's extremes).
pub fn pack_channels(image: &DecodedImage, bpp: usize) -> Vec<u8> {
    let pixel_count = image.width * image.height;
    let bytes_per_sample = (bpp / 8).max(1);
    let mut out = Vec::with_capacity(pixel_count * image.num_channels * bytes_per_sample);

    for pixel in 0..pixel_count {
        for channel in &image.channels {
            let sample = *channel.get(pixel).unwrap_or(&0);
            match bytes_per_sample {
                1 => out.push(sample),
                _ => out.extend_from_slice(&((sample as u16) << 8 | sample as u16).to_le_bytes()),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_packing_interleaves_channel_minor() {
        let image = DecodedImage {
            width: 2,
            height: 1,
            num_channels: 2,
            bit_depth: 8,
            channels: vec![vec![1, 2], vec![10, 20]],
        };
        assert_eq!(pack_channels(&image, 8), vec![1, 10, 2, 20]);
    }

    #[test]
    fn sixteen_bit_packing_widens_each_sample() {
        let image = DecodedImage {
            width: 1,
            height: 1,
            num_channels: 1,
            bit_depth: 8,
            channels: vec![vec![0xAB]],
        };
        assert_eq!(pack_channels(&image, 16), vec![0xAB, 0xAB]);
    }
}
