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

//! A tiny macro for declaring `#[repr(C, packed)]` wire-format header
//! structs with typed accessors, and overlaying them directly on top of a
//! byte buffer instead of hand-rolling per-field `u32::from_le_bytes` reads.

#[macro_export]
macro_rules! _make_packed_struct_accessor {
    ($field:ident, $field_name:ident, $field_ty:ty, $output_ty:ty) => {
        pub fn $field_name(&self) -> $output_ty {
            self.$field as $output_ty
        }
    };

    ($field:ident, $field_name:ident, $field_ty:ty, ) => {
        pub fn $field_name(&self) -> $field_ty {
            self.$field as $field_ty
        }
    };
}

#[macro_export]
macro_rules! packed_struct {
    ($name:ident {
        $( $field:ident => $field_name:ident : $field_ty:ty $(as $field_name_ty:ty),* ),+
    }) => {
        #[repr(C)]
        #[repr(packed)]
        pub struct $name {
            $(
                $field: $field_ty
            ),+
        }

        impl $name {
            $(
                $crate::_make_packed_struct_accessor!($field, $field_name, $field_ty, $($field_name_ty),*);
            )+

            pub fn overlay(buf: &[u8]) -> anyhow::Result<&$name> {
                anyhow::ensure!(
                    buf.len() >= std::mem::size_of::<$name>(),
                    "buffer too short to overlay {}",
                    stringify!($name)
                );
                let ptr: *const $name = buf.as_ptr() as *const _;
                Ok(unsafe { &*ptr })
            }

            pub fn overlay_slice(buf: &[u8]) -> anyhow::Result<&[$name]> {
                let sz = std::mem::size_of::<$name>();
                anyhow::ensure!(
                    buf.len() % sz == 0,
                    "buffer does not divide evenly into {}",
                    stringify!($name)
                );
                let ptr: *const $name = buf.as_ptr() as *const _;
                Ok(unsafe { std::slice::from_raw_parts(ptr, buf.len() / sz) })
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    $(.field(stringify!($field_name), &self.$field_name()))*
                    .finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    packed_struct!(TestStruct {
        _0 => foo: u8 as usize,
        _1 => bar: u32,
        _2 => baz: u16 as u8
    });

    #[test]
    fn it_has_accessors() {
        let buf: &[u8] = &[42, 1, 0, 0, 0, 0, 1];
        let ts = TestStruct::overlay(buf).unwrap();
        assert_eq!(ts.foo(), 42usize);
        assert_eq!(ts.bar(), 1u32);
        assert_eq!(ts.baz(), 0u8);
    }

    #[test]
    fn it_can_debug() {
        let buf: &[u8] = &[42, 1, 0, 0, 0, 0, 1];
        let ts = TestStruct::overlay(buf).unwrap();
        format!("{:?}", ts);
    }

    #[test]
    fn it_rejects_short_buffers() {
        let buf: &[u8] = &[1, 2, 3];
        assert!(TestStruct::overlay(buf).is_err());
    }
}
