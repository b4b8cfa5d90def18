//! Octahedral normal encoding and vertex normal computation.
//!
//! Quantized-mesh tiles store one normal per vertex as two bytes: the unit
//! vector is projected onto an octahedron, the lower hemisphere is folded over
//! the upper one, and both coordinates are quantized from `[-1, 1]` to `[0, 255]`.

use glam::{Vec2, Vec3};

use crate::model::IndexBuffer;

/// Largest value of a quantized octahedral component.
const OCT_RANGE: f32 = 255.0;

/// Component-wise sign that treats zero as positive.
fn sign_not_zero(v: Vec2) -> Vec2 {
    Vec2::new(
        if v.x >= 0.0 { 1.0 } else { -1.0 },
        if v.y >= 0.0 { 1.0 } else { -1.0 },
    )
}

/// Map a quantized byte to `[-1, 1]`.
fn snorm_to_float(value: u8) -> f32 {
    (f32::from(value) / OCT_RANGE) * 2.0 - 1.0
}

/// Map `[-1, 1]` to a quantized byte.
#[allow(clippy::cast_sign_loss)]
fn float_to_snorm(value: f32) -> u8 {
    ((value.clamp(-1.0, 1.0) * 0.5 + 0.5) * OCT_RANGE).round() as u8
}

/// Reconstruct a unit normal from an octahedral byte pair.
#[must_use]
pub fn oct_decode(x: u8, y: u8) -> Vec3 {
    let e = Vec2::new(snorm_to_float(x), snorm_to_float(y));
    let z = 1.0 - e.x.abs() - e.y.abs();
    let xy = if z < 0.0 {
        (Vec2::ONE - Vec2::new(e.y.abs(), e.x.abs())) * sign_not_zero(e)
    } else {
        e
    };
    xy.extend(z).normalize()
}

/// Encode a unit normal as an octahedral byte pair.
#[must_use]
pub fn oct_encode(normal: Vec3) -> [u8; 2] {
    let n = normal / (normal.x.abs() + normal.y.abs() + normal.z.abs());
    let mut e = n.truncate();
    if n.z < 0.0 {
        e = (Vec2::ONE - Vec2::new(e.y.abs(), e.x.abs())) * sign_not_zero(e);
    }
    [float_to_snorm(e.x), float_to_snorm(e.y)]
}

/// Area-weighted smooth vertex normals.
///
/// Each triangle contributes its unnormalized face normal to its three
/// vertices. Vertices not referenced by any triangle get a zero normal.
#[must_use]
pub fn compute_vertex_normals(positions: &[Vec3], indices: &IndexBuffer) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    let indices: Vec<usize> = indices.iter().map(|i| i as usize).collect();

    for triangle in indices.chunks_exact(3) {
        let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
        let (Some(&pa), Some(&pb), Some(&pc)) =
            (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        let face = (pc - pb).cross(pa - pb);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals.iter().map(|n| n.normalize_or_zero()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOLERANCE: f32 = 0.02;

    #[test]
    fn decode_center_is_up() {
        // 127.5 is not representable, so the nearest pair is slightly off axis.
        let n = oct_decode(128, 128);
        assert!((n - Vec3::Z).length() < TOLERANCE, "{n}");
    }

    #[test]
    fn decode_corners_fold_to_down() {
        for (x, y) in [(0, 0), (0, 255), (255, 0), (255, 255)] {
            let n = oct_decode(x, y);
            assert!((n - Vec3::NEG_Z).length() < 1e-6, "({x}, {y}) -> {n}");
        }
    }

    #[test]
    fn decode_edges_are_horizontal() {
        assert!((oct_decode(255, 128) - Vec3::X).length() < TOLERANCE);
        assert!((oct_decode(0, 128) - Vec3::NEG_X).length() < TOLERANCE);
        assert!((oct_decode(128, 255) - Vec3::Y).length() < TOLERANCE);
    }

    #[test]
    fn round_trip_up() {
        let [x, y] = oct_encode(Vec3::Z);
        assert_eq!([x, y], [128, 128]);
        assert!((oct_decode(x, y) - Vec3::Z).length() < TOLERANCE);
    }

    #[test]
    fn decoded_normals_are_unit_length() {
        for x in (0..=255).step_by(15) {
            for y in (0..=255).step_by(15) {
                let n = oct_decode(x, y);
                assert!((n.length() - 1.0).abs() < 1e-5);
            }
        }
    }

    proptest! {
        #[test]
        fn round_trip_within_quantization_error(
            x in -1.0f32..1.0,
            y in -1.0f32..1.0,
            z in -1.0f32..1.0,
        ) {
            let v = Vec3::new(x, y, z);
            prop_assume!(v.length() > 0.1);
            let normal = v.normalize();
            let [ex, ey] = oct_encode(normal);
            let decoded = oct_decode(ex, ey);
            prop_assert!(decoded.angle_between(normal) < 0.03, "{normal} -> {decoded}");
        }
    }
}
