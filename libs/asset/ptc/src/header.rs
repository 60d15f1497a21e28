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

//! File and frame header overlays (C3/C6 in the file layout sense): the
//! two fixed-size records a PTC stream opens with, read directly off the
//! byte buffer with no copying.

use packed_struct::packed_struct;

packed_struct!(FileHeader {
    _0 => magic: [u8; 8],
    _1 => version_major: i16,
    _2 => version_minor: i16,
    _3 => reserved1: i16,
    _4 => reserved2: i16,
    _5 => data_length: i32,
    _6 => num_frames: i32,
    _7 => reserved3: i32,
    _8 => reserved4: i32,
    _9 => reserved5: i32,
    _10 => offset_to_frame: i32
});

pub const FILE_MAGIC: &[u8; 8] = b"PTC+MSHM";

packed_struct!(FrameHeader {
    _0 => compressed_length: i32,
    _1 => tile_length: i32,
    _2 => tile_count: i32,
    _3 => reserved1: i32,
    _4 => reserved2: i32,
    _5 => one_bit_alpha: u16,
    _6 => flags: u16,
    _7 => qs_color: i32,
    _8 => qs_alpha: i32,
    _9 => height: i32,
    _10 => width: i32,
    _11 => reserved3: i32,
    _12 => reserved4: i32,
    _13 => bit_count: i16,
    _14 => bit_depth: i16,
    _15 => num_channels: i16,
    _16 => chunk_width: i16,
    _17 => reserved5: i32,
    _18 => reserved6: i32,
    _19 => scale: f32,
    _20 => float_mode: i32,
    _21 => offset_to_data: i32
});

impl FrameHeader {
    pub fn has_alpha(&self) -> bool {
        self.flags() & 0x1000 != 0
    }

    pub fn is_hdr(&self) -> bool {
        self.flags() & 0x2000 != 0
    }

    pub fn bayer_pattern(&self) -> u16 {
        (self.flags() >> 8) & 0xF
    }

    pub fn color_space_raw(&self) -> u16 {
        (self.flags() >> 4) & 0xF
    }

    pub fn lossless_color(&self) -> bool {
        self.qs_color() == 0
    }

    pub fn lossless_alpha(&self) -> bool {
        if self.flags() & 0x1000 != 0 && (1 << (self.num_channels() - 1)) & self.one_bit_alpha() as i16 != 0 {
            return true;
        }
        self.qs_alpha() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file_header() -> Vec<u8> {
        let mut buf = vec![0u8; std::mem::size_of::<FileHeader>()];
        buf[0..8].copy_from_slice(b"PTC+MSHM");
        buf[8..10].copy_from_slice(&430i16.to_le_bytes());
        buf
    }

    #[test]
    fn file_header_overlays_magic_and_version() {
        let buf = sample_file_header();
        let header = FileHeader::overlay(&buf).unwrap();
        assert_eq!(header.magic(), *b"PTC+MSHM");
        assert_eq!(header.version_major(), 430);
    }

    #[test]
    fn frame_header_derives_lossless_flags_from_quantizer_step() {
        let mut buf = vec![0u8; std::mem::size_of::<FrameHeader>()];
        buf[50..52].copy_from_slice(&16i16.to_le_bytes()); // bit_depth
        buf[52..54].copy_from_slice(&3i16.to_le_bytes()); // num_channels
        let header = FrameHeader::overlay(&buf).unwrap();
        assert!(header.lossless_color());
        assert!(header.lossless_alpha());
    }
}
