//! Pure-CPU reference pipeline mirroring the clear/P2G/grid-update/G2P
//! kernel sequence (the stress-scatter, neighbor-density, and vorticity
//! passes are omitted: this is a PIC/FLIP/APIC transfer check, not a
//! constitutive-model check, which `src/math.rs`'s `stress_*` tests already
//! cover in isolation). Exists solely so the cross-kernel invariants (mass
//! conservation, momentum consistency, FLIP/PIC energy bounds, boundary
//! containment, determinism) can be unit tested without a GPU device, as a
//! readable reference for the GPU kernels in `src/shaders/`.
//!
//! Not part of the public API: `src/driver.rs` never calls into this module,
//! it drives the real GPU kernels. Kept behind `#[cfg(test)]` visibility in
//! spirit (it's a plain module so `tests/` integration tests can use it too).

use crate::boundary::BoundaryDescriptor;
use crate::math::{apply_boundary_response, base_cell_and_fract, neighbor_dpos, quadratic_bspline_weights};
use cgmath::{InnerSpace, Matrix3, Point3, Vector3, Zero};

/// APIC inverse-inertia scale for quadratic B-splines on a unit grid
/// (`4 / h^2`, `h = 1`; see `math::CELL_SIZE`), used by both [`p2g`] (applying
/// the affine term) and [`g2p`] (reconstructing `C`).
const APIC_D_INV: f32 = 4.0;

#[derive(Clone, Copy, Debug)]
pub struct ReferenceParticle {
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub c: Matrix3<f32>,
    pub mass: f32,
}

impl ReferenceParticle {
    pub fn at_rest(position: Point3<f32>, mass: f32) -> Self {
        ReferenceParticle {
            position,
            velocity: Vector3::zero(),
            c: Matrix3::from_value(0.0),
            mass,
        }
    }
}

pub struct ReferenceGrid {
    size: usize,
    momentum: Vec<Vector3<f32>>,
    mass: Vec<f32>,
    velocity_transferred: Vec<Vector3<f32>>,
    velocity: Vec<Vector3<f32>>,
}

impl ReferenceGrid {
    pub fn new(size: usize) -> Self {
        let n = size * size * size;
        ReferenceGrid {
            size,
            momentum: vec![Vector3::zero(); n],
            mass: vec![0.0; n],
            velocity_transferred: vec![Vector3::zero(); n],
            velocity: vec![Vector3::zero(); n],
        }
    }

    fn index(&self, i: i32, j: i32, k: i32) -> Option<usize> {
        if i < 0 || j < 0 || k < 0 || i as usize >= self.size || j as usize >= self.size || k as usize >= self.size {
            return None;
        }
        Some((i as usize * self.size + j as usize) * self.size + k as usize)
    }

    pub fn total_mass(&self) -> f32 {
        self.mass.iter().sum()
    }

    pub fn total_momentum(&self) -> Vector3<f32> {
        self.momentum.iter().fold(Vector3::zero(), |acc, m| acc + m)
    }

    fn clear(&mut self) {
        self.momentum.iter_mut().for_each(|m| *m = Vector3::zero());
        self.mass.iter_mut().for_each(|m| *m = 0.0);
    }
}

/// K2 mirror: scatters mass and APIC momentum from `particles` into `grid`.
/// `grid` must have just been [`ReferenceGrid::clear`]ed (done by [`step`]).
pub fn p2g(grid: &mut ReferenceGrid, particles: &[ReferenceParticle]) {
    for p in particles {
        let (base, fract) = base_cell_and_fract(p.position);
        let wx = quadratic_bspline_weights(fract.x);
        let wy = quadratic_bspline_weights(fract.y);
        let wz = quadratic_bspline_weights(fract.z);

        for di in 0..3 {
            for dj in 0..3 {
                for dk in 0..3 {
                    let Some(idx) = grid.index(base.x + di as i32, base.y + dj as i32, base.z + dk as i32) else {
                        continue;
                    };
                    let weight = wx[di] * wy[dj] * wz[dk];
                    if weight <= 0.0 {
                        continue;
                    }
                    let dpos = neighbor_dpos(Vector3::new(di as f32, dj as f32, dk as f32), fract);
                    let velocity_contribution = p.velocity + p.c * dpos;
                    grid.momentum[idx] += velocity_contribution * (weight * p.mass);
                    grid.mass[idx] += weight * p.mass;
                }
            }
        }
    }
}

/// Mass-normalizes [`ReferenceGrid::momentum`] into `velocity_transferred`,
/// the pre-force snapshot G2P's FLIP term reads (see DESIGN.md).
fn finalize_transferred(grid: &mut ReferenceGrid) {
    for idx in 0..grid.momentum.len() {
        grid.velocity_transferred[idx] = if grid.mass[idx] > 1e-9 {
            grid.momentum[idx] / grid.mass[idx]
        } else {
            Vector3::zero()
        };
    }
}

/// K4 mirror: gravity plus a boundary collision response applied to every
/// mass-bearing cell. `center` is the boundary's local-space origin (see
/// `BoundaryDescriptor::signed_distance`).
pub fn grid_update(grid: &mut ReferenceGrid, gravity: Vector3<f32>, dt: f32, boundary: &BoundaryDescriptor, center: Point3<f32>) {
    for i in 0..grid.size {
        for j in 0..grid.size {
            for k in 0..grid.size {
                let idx = grid.index(i as i32, j as i32, k as i32).unwrap();
                if grid.mass[idx] <= 1e-9 {
                    grid.velocity[idx] = Vector3::zero();
                    continue;
                }
                let mut v = grid.velocity_transferred[idx] + gravity * dt;
                let p = Point3::new(i as f32, j as f32, k as f32);
                let (phi, normal) = boundary.signed_distance(p, center);
                if phi < boundary.thickness {
                    let (v_response, killed) = apply_boundary_response(v, normal, boundary.collision_mode, boundary.restitution, boundary.friction, dt);
                    v = if killed { Vector3::zero() } else { v_response };
                }
                grid.velocity[idx] = v;
            }
        }
    }
}

/// K7 mirror (transfer-only: no stress/surface-tension/aging terms, see
/// module docs): gathers the FLIP/PIC blended velocity and the APIC affine
/// field back onto each particle and advects its position.
pub fn g2p(grid: &ReferenceGrid, particles: &mut [ReferenceParticle], dt: f32, flip_ratio: f32) {
    for p in particles.iter_mut() {
        let (base, fract) = base_cell_and_fract(p.position);
        let wx = quadratic_bspline_weights(fract.x);
        let wy = quadratic_bspline_weights(fract.y);
        let wz = quadratic_bspline_weights(fract.z);

        let mut v_pic = Vector3::zero();
        let mut v_pic_from_old = Vector3::zero();
        let mut c_new = Matrix3::from_value(0.0);

        for di in 0..3 {
            for dj in 0..3 {
                for dk in 0..3 {
                    let Some(idx) = grid.index(base.x + di as i32, base.y + dj as i32, base.z + dk as i32) else {
                        continue;
                    };
                    let weight = wx[di] * wy[dj] * wz[dk];
                    if weight <= 0.0 {
                        continue;
                    }
                    let dpos = neighbor_dpos(Vector3::new(di as f32, dj as f32, dk as f32), fract);
                    v_pic += grid.velocity[idx] * weight;
                    v_pic_from_old += grid.velocity_transferred[idx] * weight;
                    c_new += outer(grid.velocity[idx] * weight, dpos);
                }
            }
        }
        c_new *= APIC_D_INV;

        let v_flip = p.velocity + (v_pic - v_pic_from_old);
        let v_new = v_flip * flip_ratio + v_pic * (1.0 - flip_ratio);

        p.position += v_new * dt;
        p.velocity = v_new;
        p.c = c_new;
    }
}

fn outer(v: Vector3<f32>, d: Vector3<f32>) -> Matrix3<f32> {
    Matrix3::new(v.x * d.x, v.x * d.y, v.x * d.z, v.y * d.x, v.y * d.y, v.y * d.z, v.z * d.x, v.z * d.y, v.z * d.z)
}

/// Runs one full K1->K2->K4->K7 cycle in place.
pub fn step(grid: &mut ReferenceGrid, particles: &mut [ReferenceParticle], gravity: Vector3<f32>, dt: f32, flip_ratio: f32, boundary: &BoundaryDescriptor, center: Point3<f32>) {
    grid.clear();
    p2g(grid, particles);
    finalize_transferred(grid);
    grid_update(grid, gravity, dt, boundary, center);
    g2p(grid, particles, dt, flip_ratio);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryShape;
    use crate::math::CollisionMode;
    use approx::assert_relative_eq;
    use cgmath::Vector3;

    fn interior_cube(grid_size: usize, count_per_axis: usize, mass: f32) -> Vec<ReferenceParticle> {
        let mut particles = Vec::new();
        let start = (grid_size / 2 - count_per_axis / 2).max(4) as f32;
        for i in 0..count_per_axis {
            for j in 0..count_per_axis {
                for k in 0..count_per_axis {
                    let pos = Point3::new(start + i as f32 * 0.5 + 0.25, start + j as f32 * 0.5 + 0.25, start + k as f32 * 0.5 + 0.25);
                    particles.push(ReferenceParticle::at_rest(pos, mass));
                }
            }
        }
        particles
    }

    fn no_boundary() -> BoundaryDescriptor {
        BoundaryDescriptor {
            shape: BoundaryShape::Box {
                half_extents: Vector3::new(1000.0, 1000.0, 1000.0),
            },
            collision_mode: CollisionMode::Reflect,
            stiffness: 0.0,
            thickness: -1000.0, // never triggers: phi is always > thickness
            restitution: 1.0,
            friction: 0.0,
        }
    }

    #[test]
    fn p2g_conserves_total_mass() {
        // Total grid mass after P2G equals the sum
        // of particle masses, for particles comfortably inside the grid.
        let mut grid = ReferenceGrid::new(32);
        let particles = interior_cube(32, 4, 2.0);
        p2g(&mut grid, &particles);
        let expected: f32 = particles.iter().map(|p| p.mass).sum();
        assert_relative_eq!(grid.total_mass(), expected, epsilon = 1e-3);
    }

    #[test]
    fn p2g_conserves_total_momentum_for_uniform_velocity() {
        // A uniformly-moving particle cloud with
        // zero affine term transfers its momentum exactly (no C contribution
        // means P2G is a pure weighted average, and weights sum to 1).
        let mut grid = ReferenceGrid::new(32);
        let mut particles = interior_cube(32, 4, 1.0);
        for p in &mut particles {
            p.velocity = Vector3::new(2.0, -1.0, 0.5);
        }
        p2g(&mut grid, &particles);
        let expected_momentum: Vector3<f32> = particles.iter().map(|p| p.velocity * p.mass).fold(Vector3::zero(), |a, b| a + b);
        let actual = grid.total_momentum();
        assert_relative_eq!(actual.x, expected_momentum.x, epsilon = 1e-2);
        assert_relative_eq!(actual.y, expected_momentum.y, epsilon = 1e-2);
        assert_relative_eq!(actual.z, expected_momentum.z, epsilon = 1e-2);
    }

    #[test]
    fn full_step_is_deterministic() {
        // Identical inputs produce identical
        // outputs, bit-for-bit, since the reference pipeline has no RNG and
        // no reduction-order nondeterminism (single-threaded accumulation).
        let boundary = no_boundary();
        let center = Point3::new(16.0, 16.0, 16.0);
        let run = || {
            let mut grid = ReferenceGrid::new(32);
            let mut particles = interior_cube(32, 3, 1.0);
            for p in &mut particles {
                p.velocity = Vector3::new(0.1, -0.2, 0.05);
            }
            step(&mut grid, &mut particles, Vector3::new(0.0, 0.0, -9.8), 0.01, 0.95, &boundary, center);
            particles
        };
        let a = run();
        let b = run();
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_eq!(pa.position, pb.position);
            assert_eq!(pa.velocity, pb.velocity);
        }
    }

    #[test]
    fn pure_pic_damps_kinetic_energy_more_than_flip() {
        // With gravity disabled, pure PIC
        // (flip_ratio = 0) should lose at least as much kinetic energy over a
        // few steps as hybrid/FLIP, since PIC resamples velocity straight
        // from the grid average every step.
        let boundary = no_boundary();
        let center = Point3::new(16.0, 16.0, 16.0);

        let run = |flip_ratio: f32| {
            let mut grid = ReferenceGrid::new(32);
            let mut particles = interior_cube(32, 4, 1.0);
            for (i, p) in particles.iter_mut().enumerate() {
                p.velocity = Vector3::new(if i % 2 == 0 { 1.0 } else { -1.0 }, 0.0, 0.0);
            }
            let ke_start: f32 = particles.iter().map(|p| 0.5 * p.mass * p.velocity.magnitude2()).sum();
            for _ in 0..5 {
                step(&mut grid, &mut particles, Vector3::zero(), 0.01, flip_ratio, &boundary, center);
            }
            let ke_end: f32 = particles.iter().map(|p| 0.5 * p.mass * p.velocity.magnitude2()).sum();
            (ke_start, ke_end)
        };

        let (ke_start_pic, ke_end_pic) = run(0.0);
        let (_, ke_end_flip) = run(1.0);
        assert!(ke_end_pic <= ke_start_pic + 1e-6);
        assert!(ke_end_pic <= ke_end_flip + 1e-6);
    }

    #[test]
    fn grid_update_reflects_off_boundary() {
        // A cell moving into the boundary has its
        // outward velocity component reversed (scaled by restitution) rather
        // than passing through.
        let mut grid = ReferenceGrid::new(16);
        let particles = vec![ReferenceParticle {
            position: Point3::new(8.0, 8.0, 1.0),
            velocity: Vector3::zero(),
            c: Matrix3::from_value(0.0),
            mass: 1.0,
        }];
        p2g(&mut grid, &particles);
        finalize_transferred(&mut grid);
        for v in grid.velocity_transferred.iter_mut() {
            *v = Vector3::new(0.0, 0.0, -5.0);
        }

        let boundary = BoundaryDescriptor {
            shape: BoundaryShape::Box {
                half_extents: Vector3::new(8.0, 8.0, 8.0),
            },
            collision_mode: CollisionMode::Reflect,
            stiffness: 0.0,
            thickness: 2.0,
            restitution: 0.5,
            friction: 0.0,
        };
        grid_update(&mut grid, Vector3::zero(), 0.01, &boundary, Point3::new(8.0, 8.0, 8.0));

        let idx = grid.index(8, 8, 1).unwrap();
        assert!(grid.velocity[idx].z > 0.0, "velocity into the boundary should reflect to positive z");
    }
}
