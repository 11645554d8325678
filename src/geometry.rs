//! Minimal geometry collaborator for the Hubbard builder.
//!
//! The only contract the builders need is the minimum-image lookup: the
//! lattice translation of a neighbour site that brings it closest to a
//! reference site under the periodic boundary conditions.

const SINGULAR_EPS: f64 = 1e-12;

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn invert3(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = det3(m);
    if det.abs() < SINGULAR_EPS {
        return None;
    }
    let inv_det = 1.0 / det;
    let mut inv = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            // Cofactor expansion; note the (j, i) transpose.
            let a = m[(j + 1) % 3][(i + 1) % 3];
            let b = m[(j + 2) % 3][(i + 2) % 3];
            let c = m[(j + 1) % 3][(i + 2) % 3];
            let d = m[(j + 2) % 3][(i + 1) % 3];
            inv[i][j] = (a * b - c * d) * inv_det;
        }
    }
    Some(inv)
}

/// Row vector times matrix, with cell rows as lattice vectors.
fn row_mul(v: [f64; 3], m: &[[f64; 3]; 3]) -> [f64; 3] {
    [
        v[0] * m[0][0] + v[1] * m[1][0] + v[2] * m[2][0],
        v[0] * m[0][1] + v[1] * m[1][1] + v[2] * m[2][1],
        v[0] * m[0][2] + v[1] * m[1][2] + v[2] * m[2][2],
    ]
}

fn norm_sq(v: [f64; 3]) -> f64 {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

/// Lattice translation of site `b` minimizing its cartesian distance to
/// site `a`.
///
/// The rounded fractional separation is used as the search center and the
/// surrounding `±1` images are scanned per periodic axis. Non-periodic axes
/// are never translated; a singular (e.g. all-zero) cell yields `(0,0,0)`.
pub(crate) fn minimum_image_translation(
    cell: &[[f64; 3]; 3],
    pbc: [bool; 3],
    a: [f64; 3],
    b: [f64; 3],
) -> [i32; 3] {
    let Some(inverse) = invert3(cell) else {
        return [0, 0, 0];
    };
    if pbc == [false, false, false] {
        return [0, 0, 0];
    }

    let frac_a = row_mul(a, &inverse);
    let frac_b = row_mul(b, &inverse);
    let delta = [
        frac_b[0] - frac_a[0],
        frac_b[1] - frac_a[1],
        frac_b[2] - frac_a[2],
    ];

    let center: Vec<i32> = (0..3)
        .map(|axis| {
            if pbc[axis] {
                -delta[axis].round() as i32
            } else {
                0
            }
        })
        .collect();

    let axis_range = |axis: usize| -> Vec<i32> {
        if pbc[axis] {
            vec![center[axis] - 1, center[axis], center[axis] + 1]
        } else {
            vec![0]
        }
    };

    let mut best = [0, 0, 0];
    let mut best_dist = f64::INFINITY;
    for &nx in &axis_range(0) {
        for &ny in &axis_range(1) {
            for &nz in &axis_range(2) {
                let shifted = [
                    delta[0] + nx as f64,
                    delta[1] + ny as f64,
                    delta[2] + nz as f64,
                ];
                let dist = norm_sq(row_mul(shifted, cell));
                if dist < best_dist {
                    best_dist = dist;
                    best = [nx, ny, nz];
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBIC: [[f64; 3]; 3] = [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]];

    #[test]
    fn same_site_is_zero_translation() {
        let t = minimum_image_translation(&CUBIC, [true; 3], [0.0; 3], [0.0; 3]);
        assert_eq!(t, [0, 0, 0]);
    }

    #[test]
    fn neighbour_across_the_boundary() {
        // Site b sits near the far face; its closest image is one cell back.
        let t = minimum_image_translation(&CUBIC, [true; 3], [0.0; 3], [3.5, 0.0, 0.0]);
        assert_eq!(t, [-1, 0, 0]);
    }

    #[test]
    fn interior_neighbour_needs_no_translation() {
        let t = minimum_image_translation(&CUBIC, [true; 3], [0.0; 3], [1.5, 1.5, 0.0]);
        assert_eq!(t, [0, 0, 0]);
    }

    #[test]
    fn open_axis_is_never_translated() {
        let t = minimum_image_translation(&CUBIC, [false, true, true], [0.0; 3], [3.5, 3.5, 0.0]);
        assert_eq!(t, [0, -1, 0]);
    }

    #[test]
    fn zero_cell_yields_zero_translation() {
        let zero = [[0.0; 3]; 3];
        let t = minimum_image_translation(&zero, [true; 3], [0.0; 3], [1.0, 2.0, 3.0]);
        assert_eq!(t, [0, 0, 0]);
    }

    #[test]
    fn inverse_of_cubic_cell() {
        let inv = invert3(&CUBIC).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 0.25 } else { 0.0 };
                assert!((inv[i][j] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn triclinic_round_trip() {
        let cell = [[3.0, 0.1, 0.0], [0.2, 2.8, 0.0], [0.0, 0.3, 3.2]];
        let inv = invert3(&cell).unwrap();
        let cart = [1.3, 0.7, 2.1];
        let frac = row_mul(cart, &inv);
        let back = row_mul(frac, &cell);
        for axis in 0..3 {
            assert!((back[axis] - cart[axis]).abs() < 1e-10);
        }
    }
}
