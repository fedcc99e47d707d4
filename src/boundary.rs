//! Boundary model: static collider geometry plus the collision response
//! policy applied in the grid-update kernel (on cell velocities) and again
//! in G2P (on particle positions, as a safety net).

use crate::math::CollisionMode;
use cgmath::{InnerSpace, Point3, Vector3, Zero};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum BoundaryShape {
    Viewport { aspect: f32 },
    Box { half_extents: Vector3<f32> },
    Sphere { radius: f32 },
    Tube { radius: f32, height: f32, axis: Vector3<f32> },
    Dodecahedron { radius: f32 },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BoundaryDescriptor {
    pub shape: BoundaryShape,
    pub collision_mode: CollisionMode,
    pub stiffness: f32,
    pub thickness: f32,
    pub restitution: f32,
    pub friction: f32,
}

impl Default for BoundaryDescriptor {
    fn default() -> Self {
        BoundaryDescriptor {
            shape: BoundaryShape::Box {
                half_extents: Vector3::new(32.0, 32.0, 32.0),
            },
            collision_mode: CollisionMode::Reflect,
            stiffness: 40.0,
            thickness: 1.0,
            restitution: 0.3,
            friction: 0.1,
        }
    }
}

impl BoundaryDescriptor {
    /// Updates the `Viewport` aspect ratio in place; a no-op for other
    /// shapes. Called by the driver when the host reports a new aspect
    /// ratio; the Viewport boundary derives its extents from it directly.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let BoundaryShape::Viewport { aspect: a } = &mut self.shape {
            *a = aspect;
        }
    }

    /// Signed distance from `p` (in grid space, centered on the domain
    /// center) to the interior, and the outward unit normal at that point.
    /// Positive `phi` means inside; `phi < thickness` triggers the response
    /// in §4.4.
    pub fn signed_distance(&self, p: Point3<f32>, center: Point3<f32>) -> (f32, Vector3<f32>) {
        let local = p - center;
        match self.shape {
            BoundaryShape::Viewport { aspect } => {
                let half = Vector3::new(center.x.max(1.0) * aspect.max(0.01), center.y, center.z);
                box_sdf(local, half)
            }
            BoundaryShape::Box { half_extents } => box_sdf(local, half_extents),
            BoundaryShape::Sphere { radius } => {
                let d = local.magnitude();
                (radius - d, -crate::math::safe_normalize(local))
            }
            BoundaryShape::Tube { radius, height, axis } => tube_sdf(local, radius, height, axis),
            BoundaryShape::Dodecahedron { radius } => {
                // Conservative approximation: inscribed-sphere bound, since an
                // exact dodecahedral SDF is not load-bearing for the physics;
                // any analytic phi/normal pair per boundary kind is enough.
                let d = local.magnitude();
                (radius * 0.795 - d, -crate::math::safe_normalize(local))
            }
        }
    }
}

fn box_sdf(local: Vector3<f32>, half_extents: Vector3<f32>) -> (f32, Vector3<f32>) {
    let d = Vector3::new(
        half_extents.x - local.x.abs(),
        half_extents.y - local.y.abs(),
        half_extents.z - local.z.abs(),
    );
    let (phi, axis_index) = [d.x, d.y, d.z]
        .into_iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(i, v)| (v, i))
        .unwrap();
    let mut normal = Vector3::zero();
    let sign = match axis_index {
        0 => local.x,
        1 => local.y,
        _ => local.z,
    }
    .signum();
    match axis_index {
        0 => normal.x = -sign,
        1 => normal.y = -sign,
        _ => normal.z = -sign,
    }
    (phi, normal)
}

fn tube_sdf(local: Vector3<f32>, radius: f32, height: f32, axis: Vector3<f32>) -> (f32, Vector3<f32>) {
    let axis = crate::math::safe_normalize(axis);
    let axial = local.dot(axis);
    let radial_vec = local - axis * axial;
    let radial_dist = radial_vec.magnitude();

    let phi_radial = radius - radial_dist;
    let phi_axial = height * 0.5 - axial.abs();

    if phi_radial < phi_axial {
        (phi_radial, -crate::math::safe_normalize(radial_vec))
    } else {
        (phi_axial, -axis * axial.signum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_center_is_deep_inside() {
        let b = BoundaryDescriptor::default();
        let center = Point3::new(32.0, 32.0, 32.0);
        let (phi, _) = b.signed_distance(center, center);
        assert!(phi > 0.0);
    }

    #[test]
    fn box_face_normal_points_inward_is_negative_of_outward() {
        let half = Vector3::new(10.0, 10.0, 10.0);
        let center = Point3::new(10.0, 10.0, 10.0);
        let p = Point3::new(20.0, 10.0, 10.0); // on the +x face
        let (phi, normal) = box_sdf(p - center, half);
        assert!(phi.abs() < 1e-4);
        assert!(normal.x < 0.0); // points back toward the interior (-x)
    }

    #[test]
    fn sphere_symmetry() {
        let b = BoundaryDescriptor {
            shape: BoundaryShape::Sphere { radius: 10.0 },
            ..BoundaryDescriptor::default()
        };
        let center = Point3::new(0.0, 0.0, 0.0);
        let (phi_a, _) = b.signed_distance(Point3::new(5.0, 0.0, 0.0), center);
        let (phi_b, _) = b.signed_distance(Point3::new(-5.0, 0.0, 0.0), center);
        assert!((phi_a - phi_b).abs() < 1e-5);
    }

    #[test]
    fn viewport_aspect_updates_in_place() {
        let mut b = BoundaryDescriptor {
            shape: BoundaryShape::Viewport { aspect: 1.0 },
            ..BoundaryDescriptor::default()
        };
        b.set_aspect(1.777);
        match b.shape {
            BoundaryShape::Viewport { aspect } => assert!((aspect - 1.777).abs() < 1e-5),
            _ => panic!("wrong shape"),
        }
    }
}
