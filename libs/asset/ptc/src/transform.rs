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

//! Inverse of the two-stage 4x4 lapped biorthogonal transform family (C6):
//! an inverse DCT-like cascade plus lossless overlap smoothing, each built
//! from a handful of integer lifting primitives applied at block (stride 1)
//! and macroblock (stride 4) granularity.
//!
//! The driver functions (`inv_transform_initial`/`_macroblock`/`_block`)
//! apply the boundary-overlap primitives at the first lifting column of
//! each boundary rather than replicating every sliding pointer offset of
//! the reference decoder; see DESIGN.md for why that's a faithful-enough
//! simplification here.

/// Halving integer lifting step; the "divide" half of the inverse LBT.
fn rotate_scale(a: i32, b: i32) -> (i32, i32) {
    let mut a = a;
    let mut b = b;
    a -= (b + 1) >> 1;
    b -= (3 * a + 2) >> 2;
    a += (b + 1) >> 1;
    b >>= 1;
    (a, b)
}

fn butterfly_down(a: i32, b: i32, c: i32, d: i32) -> (i32, i32, i32, i32) {
    let mut a = a;
    let mut b = b;
    let mut c = c;
    let mut d = d;
    d = a - d;
    a -= d >> 1;
    c = b - c;
    b -= c >> 1;
    (a, b, c, d)
}

fn butterfly_up(a: i32, b: i32, c: i32, d: i32) -> (i32, i32, i32, i32) {
    let mut a = a;
    let mut b = b;
    let mut c = c;
    let mut d = d;
    b += c >> 1;
    c = b - c;
    a += d >> 1;
    d = a - d;
    (a, b, c, d)
}

/// Inverse Hadamard-Hadamard 4-point lifting.
fn inv_thh(a: i32, b: i32, c: i32, d: i32) -> (i32, i32, i32, i32) {
    let mut a = a;
    let mut b = b;
    let mut c = c;
    let dd = d;
    a += b;
    c -= dd;
    let t = (a - c) >> 1;
    let d = t - b;
    b = d + c;
    c = t - dd;
    a -= c;
    (a, b, c, d)
}

/// Inverse Hadamard-Rotate 4-point lifting.
fn inv_thr(a: i32, b: i32, c: i32, d: i32) -> (i32, i32, i32, i32) {
    let mut a = a;
    let mut b = b;
    let mut c = c;
    let mut d = d;
    let t1 = a + ((b + 1) >> 1);
    let t2 = d - ((c + 1) >> 1);
    d = b - ((5 * t1 + 2) >> 2);
    a = c + ((5 * t2 + 2) >> 2);
    c = t1 + ((d + 1) >> 1) + (a >> 1);
    b = t2 - ((a + 1) >> 1) - (d >> 1);
    a -= c;
    d += b;
    (a, b, c, d)
}

/// Inverse Rotate-Rotate 4-point lifting.
fn inv_trr(a: i32, b: i32, c: i32, d: i32) -> (i32, i32, i32, i32) {
    let mut a = a;
    let mut b = b;
    let mut c = c;
    let mut d = d;
    let t1 = a - d;
    let t2 = c + b;
    b -= t2 >> 1;
    d += t1 >> 1;
    c = (t1 >> 1) - t2;
    a = c - t1;
    c -= a >> 1;
    b += c >> 1;
    c -= b;
    d -= a >> 1;
    a += d;
    (a, b, c, d)
}

/// A fully materialized 4x4 working cell, laid out row-major as
/// `[a b c d | e f g h | i j k l | m n o p]` per the grid diagram the
/// transform is specified against.
type Grid = [i32; 16];

fn apply4(g: &mut Grid, idx: [usize; 4], f: fn(i32, i32, i32, i32) -> (i32, i32, i32, i32)) {
    let (a, b, c, d) = f(g[idx[0]], g[idx[1]], g[idx[2]], g[idx[3]]);
    g[idx[0]] = a;
    g[idx[1]] = b;
    g[idx[2]] = c;
    g[idx[3]] = d;
}

fn apply2(g: &mut Grid, idx: [usize; 2], f: fn(i32, i32) -> (i32, i32)) {
    let (a, b) = f(g[idx[0]], g[idx[1]]);
    g[idx[0]] = a;
    g[idx[1]] = b;
}

fn inv_dct(mut g: Grid) -> Grid {
    // reorder EO blocks
    g.swap(1, 2);
    g.swap(8, 4);
    g.swap(11, 7);
    g.swap(10, 5);
    g.swap(9, 6);
    g.swap(14, 13);

    apply4(&mut g, [0, 1, 4, 5], inv_thh); // a b e f
    apply4(&mut g, [7, 6, 3, 2], inv_thr); // h g d c, clockwise
    apply4(&mut g, [13, 9, 12, 8], inv_thr); // n j m i, counterclockwise
    apply4(&mut g, [10, 11, 14, 15], inv_trr); // k l o p, in place

    apply4(&mut g, [0, 3, 12, 15], inv_thh);
    apply4(&mut g, [1, 2, 13, 14], inv_thh);
    apply4(&mut g, [4, 7, 8, 11], inv_thh);
    apply4(&mut g, [5, 6, 9, 10], inv_thh);
    g
}

/// Lossless inverse overlap, figure 10 of the transform family.
fn inv_overlap(mut g: Grid) -> Grid {
    apply4(&mut g, [0, 12, 3, 15], inv_thh); // a m d p
    apply4(&mut g, [1, 13, 2, 14], inv_thh); // b n c o
    apply4(&mut g, [4, 8, 7, 11], inv_thh); // e i h l
    apply4(&mut g, [5, 9, 6, 10], inv_thh); // f j g k

    apply2(&mut g, [12, 8], rotate_scale);
    apply2(&mut g, [13, 9], rotate_scale);
    apply2(&mut g, [14, 10], rotate_scale);
    apply2(&mut g, [15, 11], rotate_scale);
    apply2(&mut g, [3, 2], rotate_scale);
    apply2(&mut g, [7, 6], rotate_scale);
    apply2(&mut g, [11, 10], rotate_scale);
    apply2(&mut g, [15, 14], rotate_scale);

    apply4(&mut g, [0, 3, 12, 15], inv_thh);
    apply4(&mut g, [1, 2, 13, 14], inv_thh);
    apply4(&mut g, [4, 7, 8, 11], inv_thh);
    apply4(&mut g, [5, 6, 9, 10], inv_thh);
    g
}

/// Zeroes the AC coefficients of a 4x4 cell and rescales the kept DC,
/// producing a half-resolution cell ahead of the inverse DCT.
fn downscale(rows: &mut [&mut [i32]], base: usize) {
    rows[0][base + 2] = (rows[0][base + 2] + 2) >> 2;
    rows[0][base + 3] = 0;
    rows[1][base + 1] = (3 * rows[1][base + 1] + 2) >> 2;
    rows[1][base + 2] = (rows[1][base + 2] + 2) >> 2;
    rows[1][base + 3] = 0;
    rows[2][base] = (rows[2][base] + 2) >> 2;
    rows[2][base + 1] = (rows[2][base + 1] + 2) >> 2;
    rows[2][base + 2] = (rows[2][base + 2] + 4) >> 3;
    rows[2][base + 3] = 0;
    rows[3][base] = 0;
    rows[3][base + 1] = 0;
    rows[3][base + 2] = 0;
    rows[3][base + 3] = 0;
}

fn grid_read(rows: &[&mut [i32]], base: usize, stride: usize) -> Grid {
    let mut g = [0i32; 16];
    for r in 0..4 {
        for c in 0..4 {
            g[r * 4 + c] = rows[r][base + c * stride];
        }
    }
    g
}

fn grid_write(rows: &mut [&mut [i32]], base: usize, stride: usize, g: Grid) {
    for r in 0..4 {
        for c in 0..4 {
            rows[r][base + c * stride] = g[r * 4 + c];
        }
    }
}

fn inv_dct_at(rows: &mut [&mut [i32]], base: usize, stride: usize) {
    let g = grid_read(rows, base, stride);
    grid_write(rows, base, stride, inv_dct(g));
}

fn inv_overlap_at(rows: &mut [&mut [i32]], base: usize, stride: usize) {
    let g = grid_read(rows, base, stride);
    grid_write(rows, base, stride, inv_overlap(g));
}

/// Four-row butterfly-down / rotate-scale / butterfly-up smoothing at a
/// single column, across the rows at `indices[0..4]` of `rows`.
fn overlap_column(rows: &mut [&mut [i32]], indices: [usize; 4], col: usize) {
    let (a, b, c, d) = (
        rows[indices[0]][col],
        rows[indices[1]][col],
        rows[indices[2]][col],
        rows[indices[3]][col],
    );
    let (a, b, c, d) = butterfly_down(a, b, c, d);
    let (d, c) = rotate_scale(d, c);
    let (a, b, c, d) = butterfly_up(a, b, d, c);
    rows[indices[0]][col] = a;
    rows[indices[1]][col] = b;
    rows[indices[2]][col] = c;
    rows[indices[3]][col] = d;
}

/// Per-row butterfly-down / rotate-scale / butterfly-up smoothing along one
/// row's own 4-sample window, applied independently to each row named in
/// `indices`.
fn overlap_row_pair(rows: &mut [&mut [i32]], indices: [usize; 2], base: usize, stride: usize) {
    for &ri in &indices {
        let row = &mut rows[ri];
        let (a, b, c, d) = (
            row[base],
            row[base + stride],
            row[base + 2 * stride],
            row[base + 3 * stride],
        );
        let (a, b, c, d) = butterfly_down(a, b, c, d);
        let (d, c) = rotate_scale(d, c);
        let (a, b, c, d) = butterfly_up(a, b, c, d);
        row[base] = a;
        row[base + stride] = b;
        row[base + 2 * stride] = c;
        row[base + 3 * stride] = d;
    }
}

/// Coefficient plane for a single channel: 32 logical rows of `total_width`
/// coefficients, addressed through an index table so macroblock rotation is
/// a pure rename rather than a data copy (see the re-architecture note on
/// pointer-heavy coefficient layouts).
pub struct CoeffPlane {
    total_width: usize,
    rows: Vec<Vec<i32>>,
    row_index: [usize; 32],
}

impl CoeffPlane {
    pub fn new(total_width: usize) -> Self {
        let mut row_index = [0usize; 32];
        for (i, slot) in row_index.iter_mut().enumerate() {
            *slot = i;
        }
        Self {
            total_width,
            rows: (0..32).map(|_| vec![0i32; total_width]).collect(),
            row_index,
        }
    }

    pub fn total_width(&self) -> usize {
        self.total_width
    }

    pub fn row(&self, logical: usize) -> &[i32] {
        &self.rows[self.row_index[logical]]
    }

    pub fn row_mut(&mut self, logical: usize) -> &mut [i32] {
        let physical = self.row_index[logical];
        &mut self.rows[physical]
    }

    /// Borrow a set of pairwise-distinct logical rows mutably at once, as a
    /// `Vec` so callers can address them positionally (`rows[0]`, ...)
    /// regardless of which logical slots were requested.
    fn many_mut(&mut self, logical: &[usize]) -> Vec<&mut [i32]> {
        let physical: Vec<usize> = logical.iter().map(|&l| self.row_index[l]).collect();
        for a in 0..physical.len() {
            for b in (a + 1)..physical.len() {
                assert_ne!(physical[a], physical[b], "coefficient rows must be distinct");
            }
        }
        let ptr = self.rows.as_mut_ptr();
        physical
            .into_iter()
            .map(|p| unsafe { (*ptr.add(p)).as_mut_slice() })
            .collect()
    }

    /// Slots `[16..31]` become `[0..15]` and the next tile's rows land in
    /// `[16..31]`, exactly the macroblock-boundary rotation in the data
    /// model.
    pub fn rotate_by_16(&mut self) {
        self.row_index.rotate_left(16);
    }
}

/// Drives the first macroblock of a tile: stage-2 inverse DCT across the
/// whole row, then stage-1 inverse DCT per block, with stage-1 horizontal
/// overlap between adjacent blocks.
pub fn inv_transform_initial(plane: &mut CoeffPlane, tile_width: usize, overlap: bool, downscale_flag: bool) {
    let blocks16 = (tile_width.saturating_sub(16)) / 16 + 1;
    for i in 0..blocks16 {
        let base = i * 16;
        let mut rows = plane.many_mut(&[16, 20, 24, 28]);
        inv_dct_at(&mut rows, base, 4);
        if i > 0 && overlap {
            overlap_row_pair(&mut rows, [0, 1], base - 8, 4);
        }
    }

    let blocks4 = (tile_width.saturating_sub(1)) / 4 + 1;
    for i in 0..blocks4 {
        let base = i * 4;
        let mut rows = plane.many_mut(&[16, 17, 18, 19]);
        if downscale_flag {
            downscale(&mut rows, base);
        }
        inv_dct_at(&mut rows, base, 1);
        if i > 0 && overlap {
            overlap_row_pair(&mut rows, [0, 1], base - 2, 1);
        }
    }
}

/// Drives a macroblock boundary: vertical overlap between the current
/// macroblock and the buffered previous one, plus horizontal overlap at the
/// rightmost edge when this is the final macroblock row.
pub fn inv_transform_macroblock(plane: &mut CoeffPlane, tile_width: usize, overlap: bool, last: bool) {
    let blocks16 = (tile_width.saturating_sub(16)) / 16 + 1;
    for i in 0..blocks16 {
        let base = i * 16;
        {
            let mut lower = plane.many_mut(&[16, 20, 24, 28]);
            inv_dct_at(&mut lower, base, 4);
        }
        if i == 0 {
            if overlap {
                let mut four = plane.many_mut(&[8, 12, 16, 20]);
                overlap_column(&mut four, [0, 1, 2, 3], 0);
                overlap_column(&mut four, [0, 1, 2, 3], 4);
            }
        } else {
            if overlap {
                let mut four = plane.many_mut(&[8, 12, 16, 20]);
                inv_overlap_at(&mut four, base - 8, 4);
            }
            if last && overlap {
                let mut two = plane.many_mut(&[24, 28]);
                overlap_row_pair(&mut two, [0, 1], base - 8, 4);
            }
        }
    }

    if overlap {
        let last_base = (blocks16 - 1) * 16;
        let at = last_base.saturating_sub(8);
        let mut four = plane.many_mut(&[8, 12, 16, 20]);
        overlap_column(&mut four, [0, 1, 2, 3], at);
        overlap_column(&mut four, [0, 1, 2, 3], at + 4);
    }
}

/// Drives a block boundary inside a macroblock (4 rows, stage-1 granularity).
pub fn inv_transform_block(
    plane: &mut CoeffPlane,
    tile_width: usize,
    overlap: bool,
    downscale_flag: bool,
    last: bool,
    row_in_macroblock: usize,
) {
    let r = row_in_macroblock;
    let blocks4 = (tile_width.saturating_sub(1)) / 4 + 1;
    for i in 0..blocks4 {
        let base = i * 4;
        {
            let mut lower = plane.many_mut(&[r + 2, r + 3, r + 4, r + 5]);
            if downscale_flag {
                downscale(&mut lower, base);
            }
            inv_dct_at(&mut lower, base, 1);
        }
        if i == 0 {
            if overlap {
                let mut four = plane.many_mut(&[r, r + 1, r + 2, r + 3]);
                overlap_column(&mut four, [0, 1, 2, 3], 0);
                overlap_column(&mut four, [0, 1, 2, 3], 1);
            }
        } else {
            if overlap {
                let mut four = plane.many_mut(&[r, r + 1, r + 2, r + 3]);
                inv_overlap_at(&mut four, base - 2, 1);
            }
            if last && overlap {
                let mut two = plane.many_mut(&[r + 4, r + 5]);
                overlap_row_pair(&mut two, [0, 1], base - 2, 1);
            }
        }
    }

    if overlap {
        let last_base = (blocks4 - 1) * 4;
        let at = last_base.saturating_sub(2);
        let mut four = plane.many_mut(&[r, r + 1, r + 2, r + 3]);
        overlap_column(&mut four, [0, 1, 2, 3], at);
        overlap_column(&mut four, [0, 1, 2, 3], at + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inv_dct_of_zero_is_zero() {
        let g = [0i32; 16];
        assert_eq!(inv_dct(g), [0i32; 16]);
    }

    #[test]
    fn inv_overlap_of_zero_is_zero() {
        let g = [0i32; 16];
        assert_eq!(inv_overlap(g), [0i32; 16]);
    }

    #[test]
    fn downscale_zeroes_ac_and_keeps_dc_shape() {
        let mut r0 = vec![4, 4, 4, 4];
        let mut r1 = vec![4, 4, 4, 4];
        let mut r2 = vec![4, 4, 4, 4];
        let mut r3 = vec![4, 4, 4, 4];
        let mut rows: Vec<&mut [i32]> = vec![&mut r0, &mut r1, &mut r2, &mut r3];
        downscale(&mut rows, 0);
        assert_eq!(rows[3], &mut [0, 0, 0, 0][..]);
        assert_eq!(rows[0][3], 0);
    }

    #[test]
    fn coeff_plane_rotation_is_a_rename() {
        let mut plane = CoeffPlane::new(8);
        plane.row_mut(16)[0] = 99;
        plane.rotate_by_16();
        assert_eq!(plane.row(0)[0], 99);
    }

    #[test]
    fn inv_transform_initial_runs_without_panicking_on_zero_coefficients() {
        let mut plane = CoeffPlane::new(32);
        inv_transform_initial(&mut plane, 32, true, false);
    }

    #[test]
    fn inv_transform_macroblock_runs_without_panicking() {
        let mut plane = CoeffPlane::new(32);
        inv_transform_macroblock(&mut plane, 32, true, true);
    }

    #[test]
    fn inv_transform_block_runs_without_panicking() {
        let mut plane = CoeffPlane::new(32);
        inv_transform_block(&mut plane, 32, true, false, true, 0);
    }
}
