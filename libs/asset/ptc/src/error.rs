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

use thiserror::Error;

/// The full failure taxonomy a PTC decode can surface. Every lower-level
/// codec error (bitio underrun, bitpack/lzss/delta failures inside a
/// chained tile) collapses into one of these variants.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    #[error("stream does not start with the PTC file signature")]
    InvalidSignature,
    #[error("file or frame header failed a structural check")]
    InvalidHeader,
    #[error("declared size does not match the data actually available")]
    SizeMismatch,
    #[error("bit pool exhausted before a required read")]
    Underrun,
    #[error("frame uses a coder type or color space this decoder does not support")]
    UnsupportedVariant,
    #[error("failed to allocate a decode buffer")]
    AllocationFailure,
}

impl From<bitio::BitIoError> for DecodeError {
    fn from(_: bitio::BitIoError) -> Self {
        DecodeError::Underrun
    }
}
