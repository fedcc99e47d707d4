//! Pure host-side mirrors of the per-particle / per-cell math used by the
//! compute kernels in `src/shaders/`. Kept free of any `wgpu` types so it can
//! be unit tested without a GPU device, and so kernel authors have a single
//! place to check a GLSL formula against.
//!
//! Every function here documents which kernel and which `.comp` file it
//! mirrors. Keep the two in lock-step.

use cgmath::{InnerSpace, Matrix3, Point3, Vector3, Zero};

/// Cell spacing in grid units. This solver always works in grid
/// coordinates where one cell == one unit, so `h == 1.0` throughout.
pub const CELL_SIZE: f32 = 1.0;

/// Scale used by the fixed-point emulation of f32 atomic add for backends
/// without native float atomics. Chosen conservatively for
/// expected particle masses in the 1e-3..1e2 range; see `fixed_point_encode`.
pub const FIXED_POINT_SCALE: f32 = (1u32 << 20) as f32;

/// Encodes a float accumulator value for atomic-add emulation via `atomicAdd`
/// on a signed 32 bit integer view of the cell. Mirrored in
/// `shaders/common.glsl` as `fixedPointEncode`.
pub fn fixed_point_encode(value: f32) -> i32 {
    (value * FIXED_POINT_SCALE).round() as i32
}

/// Inverse of [`fixed_point_encode`]. Mirrored as `fixedPointDecode`.
pub fn fixed_point_decode(value: i32) -> f32 {
    value as f32 / FIXED_POINT_SCALE
}

/// Per-axis quadratic B-spline weights for a fractional
/// offset `fx` within `[0, 1)`. Returns `[w0, w1, w2]` for the three
/// neighboring cells along that axis, in base-cell order (i.e. the particle's
/// base cell is `floor(p - 0.5)`, and `fx = p - base`).
///
/// Mirrors `quadraticBSplineWeights` in `shaders/common.glsl`.
pub fn quadratic_bspline_weights(fx: f32) -> [f32; 3] {
    let w0 = 0.5 * (1.5 - fx).powi(2);
    let w1 = 0.75 - (fx - 1.0).powi(2);
    let w2 = 0.5 * (fx - 0.5).powi(2);
    [w0, w1, w2]
}

/// Base cell and fractional offset for a particle position in grid units.
pub fn base_cell_and_fract(position: Point3<f32>) -> (Point3<i32>, Vector3<f32>) {
    let base = Point3::new(
        (position.x - 0.5).floor(),
        (position.y - 0.5).floor(),
        (position.z - 0.5).floor(),
    );
    let fract = position - base;
    (Point3::new(base.x as i32, base.y as i32, base.z as i32), fract)
}

/// Offset vector `dpos = (i,j,k) - fx + 0.5` used both for the APIC affine
/// transfer (K2) and the dual-purpose gather weights in K7.
pub fn neighbor_dpos(ijk: Vector3<f32>, fract: Vector3<f32>) -> Vector3<f32> {
    ijk - fract + Vector3::new(0.5, 0.5, 0.5)
}

/// `Falloff` curves for force fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Falloff {
    Constant,
    Linear,
    Quadratic,
    SmoothStep,
}

impl Falloff {
    pub fn evaluate(self, distance: f32, radius: f32) -> f32 {
        match self {
            Falloff::Constant => 1.0,
            Falloff::Linear => (1.0 - distance / radius).max(0.0),
            Falloff::Quadratic => 1.0 / (1.0 + (distance / radius).powi(2)),
            Falloff::SmoothStep => smoothstep(radius, 0.0, distance),
        }
    }
}

/// GLSL-style `smoothstep(edge0, edge1, x)`. Falloff curves call this with
/// `edge0 = radius, edge1 = 0`, i.e. descending, which is intentional: it
/// fades to zero as `x` approaches `radius` and saturates to one at `x = 0`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Adaptive timestep selection.
pub struct CflParams {
    pub cfl_target: f32,
    pub dt_min: f32,
    pub dt_max: f32,
}

impl Default for CflParams {
    fn default() -> Self {
        CflParams {
            cfl_target: 0.7,
            dt_min: 0.001,
            dt_max: 0.1,
        }
    }
}

/// Returns the CFL-safe timestep for a given max particle speed.
pub fn cfl_dt(v_max: f32, params: &CflParams) -> f32 {
    const EPS: f32 = 1e-5;
    let dt_safe = params.cfl_target * CELL_SIZE / (v_max + EPS);
    dt_safe.clamp(params.dt_min, params.dt_max)
}

/// Number of sub-steps needed to cover `dt_hint` using steps no larger than
/// `dt_safe`, capped at `max_substeps`. Always returns at least 1.
pub fn substep_count(dt_hint: f32, dt_safe: f32, max_substeps: u32) -> u32 {
    if dt_safe <= 0.0 {
        return 1;
    }
    ((dt_hint / dt_safe).ceil() as u32).clamp(1, max_substeps.max(1))
}

/// Material stress policy. `sigma` is the Cauchy-ish stress
/// tensor scattered into momentum during P2G2.
#[derive(Clone, Copy, Debug)]
pub struct StressParams {
    pub stiffness: f32,       // k, fluid pressure stiffness
    pub dynamic_viscosity: f32, // nu
    pub rest_density: f32,
    pub youngs_modulus: f32,
    pub poisson_ratio: f32,
}

/// Fluid constitutive law: `sigma = -k*(J-1)*I + nu*(C + C^T)`.
pub fn stress_fluid(f: Matrix3<f32>, c: Matrix3<f32>, params: &StressParams) -> Matrix3<f32> {
    let j = f.determinant();
    let pressure = -params.stiffness * (j - 1.0);
    let identity = Matrix3::from_value(0.0) + Matrix3::from_diagonal(Vector3::new(1.0, 1.0, 1.0));
    identity * pressure + (c + c.transpose()) * params.dynamic_viscosity
}

/// Neo-Hookean elastic stress from Lame parameters derived from Young's
/// modulus / Poisson ratio, used for `MaterialId::Elastic`.
pub fn lame_parameters(youngs_modulus: f32, poisson_ratio: f32) -> (f32, f32) {
    let mu = youngs_modulus / (2.0 * (1.0 + poisson_ratio));
    let lambda = youngs_modulus * poisson_ratio / ((1.0 + poisson_ratio) * (1.0 - 2.0 * poisson_ratio));
    (mu, lambda)
}

/// Fixed-corotated Neo-Hookean stress. `r` must be the rotational part of the
/// polar decomposition of `f` (`f = r * s`, `s` symmetric positive-definite);
/// the GPU kernel obtains it via an SVD, the host mirror takes it as an input
/// to avoid re-deriving an SVD routine for a function used mainly for tests.
pub fn stress_neo_hookean(f: Matrix3<f32>, r: Matrix3<f32>, mu: f32, lambda: f32) -> Matrix3<f32> {
    let j = f.determinant();
    let identity = Matrix3::from_diagonal(Vector3::new(1.0, 1.0, 1.0));
    let f_inv_t = f.transpose().invert().unwrap_or(identity);
    // First Piola-Kirchhoff stress of the fixed-corotated model, converted to
    // Cauchy-ish form for the APIC/MLS-MPM momentum update.
    (f - r) * (2.0 * mu) * f.transpose() + f_inv_t * (lambda * j * (j - 1.0))
}

/// Boundary collision policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CollisionMode {
    Reflect,
    Clamp,
    Wrap,
    Kill,
}

/// Applies the boundary velocity response given the signed
/// distance `phi` (positive inside, negative outside; `phi < thickness`
/// means "needs handling"), outward unit normal `n`, and the boundary's
/// `restitution`/`friction`. Returns `(new_velocity, killed)`.
pub fn apply_boundary_response(
    velocity: Vector3<f32>,
    normal: Vector3<f32>,
    mode: CollisionMode,
    restitution: f32,
    friction: f32,
    dt: f32,
) -> (Vector3<f32>, bool) {
    match mode {
        CollisionMode::Kill => (velocity, true),
        CollisionMode::Wrap => (velocity, false),
        CollisionMode::Reflect => {
            let vn = velocity.dot(normal);
            let v_normal_removed = velocity - normal * ((1.0 + restitution) * vn.min(0.0));
            (apply_tangential_friction(v_normal_removed, normal, friction, dt), false)
        }
        CollisionMode::Clamp => {
            let vn = velocity.dot(normal);
            let v_clamped = velocity - normal * vn.max(0.0);
            (apply_tangential_friction(v_clamped, normal, friction, dt), false)
        }
    }
}

fn apply_tangential_friction(velocity: Vector3<f32>, normal: Vector3<f32>, friction: f32, dt: f32) -> Vector3<f32> {
    let vn = velocity.dot(normal) * normal;
    let vt = velocity - vn;
    vn + vt * (1.0 - friction * dt).max(0.0)
}

/// Additional penalty acceleration from `stiffness` pushing the cell back
/// into the domain when `phi < thickness`.
pub fn boundary_penalty_acceleration(phi: f32, thickness: f32, stiffness: f32, normal: Vector3<f32>) -> Vector3<f32> {
    normal * (-stiffness * (phi - thickness).min(0.0))
}

/// Normalizes a vector, returning zero if the input is (numerically) zero
/// length, rather than propagating NaN — used pervasively by force fields
/// and cohesion direction computation (K3 Vortex, K7 surface tension).
pub fn safe_normalize(v: Vector3<f32>) -> Vector3<f32> {
    let len2 = v.magnitude2();
    if len2 < 1e-12 {
        Vector3::zero()
    } else {
        v / len2.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bspline_weights_partition_of_unity() {
        // For any fractional position in [0,1)^3 the
        // sum of the 27 neighbor weights is 1. Checking one axis at a time is
        // sufficient since the 3D weight is a separable product and
        // sum_i w_x[i] * sum_j w_y[j] * sum_k w_z[k] == 1 iff each axis sums to 1.
        let mut fx = 0.0f32;
        while fx < 1.0 {
            let w = quadratic_bspline_weights(fx);
            assert_relative_eq!(w.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
            fx += 0.037;
        }
    }

    #[test]
    fn bspline_weights_nonnegative() {
        let mut fx = 0.0f32;
        while fx < 1.0 {
            let w = quadratic_bspline_weights(fx);
            for wi in w {
                assert!(wi >= -1e-6, "negative weight {wi} at fx={fx}");
            }
            fx += 0.041;
        }
    }

    #[test]
    fn cfl_dt_respects_bounds() {
        let params = CflParams::default();
        // v_max * dt <= cfl_target * h + eps
        for v_max in [0.0f32, 1.0, 10.0, 80.0, 10_000.0] {
            let dt = cfl_dt(v_max, &params);
            assert!(dt >= params.dt_min - 1e-6);
            assert!(dt <= params.dt_max + 1e-6);
            if v_max > 1.0 {
                assert!(v_max * dt <= params.cfl_target * CELL_SIZE + 1e-3);
            }
        }
    }

    #[test]
    fn cfl_dt_matches_s4_scenario() {
        // Adaptive CFL: v_max ~= 80 => dt_used <= 0.01.
        let params = CflParams::default();
        let dt = cfl_dt(80.0, &params);
        assert!(dt <= 0.01);
    }

    #[test]
    fn substep_count_is_capped() {
        assert_eq!(substep_count(0.1, 0.001, 4), 4);
        assert_eq!(substep_count(0.001, 0.01, 4), 1);
        assert_eq!(substep_count(0.0, 0.01, 4), 1);
    }

    #[test]
    fn falloff_constant_is_always_one() {
        assert_relative_eq!(Falloff::Constant.evaluate(0.0, 5.0), 1.0);
        assert_relative_eq!(Falloff::Constant.evaluate(100.0, 5.0), 1.0);
    }

    #[test]
    fn falloff_linear_reaches_zero_at_radius() {
        assert_relative_eq!(Falloff::Linear.evaluate(5.0, 5.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(Falloff::Linear.evaluate(0.0, 5.0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(Falloff::Linear.evaluate(10.0, 5.0), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn falloff_smoothstep_monotonic_decreasing() {
        let a = Falloff::SmoothStep.evaluate(1.0, 10.0);
        let b = Falloff::SmoothStep.evaluate(5.0, 10.0);
        let c = Falloff::SmoothStep.evaluate(9.0, 10.0);
        assert!(a > b);
        assert!(b > c);
    }

    #[test]
    fn fixed_point_roundtrip_within_tolerance() {
        for value in [0.0f32, 1.0, -1.0, 123.456, -0.0001] {
            let encoded = fixed_point_encode(value);
            let decoded = fixed_point_decode(encoded);
            assert_relative_eq!(decoded, value, epsilon = 1.0 / FIXED_POINT_SCALE * 2.0);
        }
    }

    #[test]
    fn boundary_reflect_reverses_normal_velocity() {
        let n = Vector3::new(0.0, 0.0, 1.0);
        let v = Vector3::new(1.0, 0.0, -2.0);
        let (v_new, killed) = apply_boundary_response(v, n, CollisionMode::Reflect, 0.5, 0.0, 0.0);
        assert!(!killed);
        // restitution 0.5 -> reflected normal speed is 0.5 * incoming speed.
        assert_relative_eq!(v_new.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn boundary_clamp_zeroes_outward_velocity_only() {
        let n = Vector3::new(0.0, 0.0, 1.0);
        let v = Vector3::new(1.0, 0.0, -2.0);
        let (v_new, killed) = apply_boundary_response(v, n, CollisionMode::Clamp, 0.0, 0.0, 0.0);
        assert!(!killed);
        assert_relative_eq!(v_new.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(v_new.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn boundary_kill_marks_particle_inactive() {
        let n = Vector3::new(0.0, 1.0, 0.0);
        let v = Vector3::new(0.0, -1.0, 0.0);
        let (_, killed) = apply_boundary_response(v, n, CollisionMode::Kill, 0.0, 0.0, 0.0);
        assert!(killed);
    }

    #[test]
    fn safe_normalize_handles_zero_vector() {
        assert_eq!(safe_normalize(Vector3::zero()), Vector3::zero());
        let n = safe_normalize(Vector3::new(3.0, 0.0, 4.0));
        assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn fluid_stress_resists_compression() {
        // J < 1 (compressed) should produce positive pressure pushing particles apart,
        // i.e. sigma should be a positive multiple of identity when C = 0.
        let f = Matrix3::from_diagonal(Vector3::new(0.9, 0.9, 0.9));
        let c = Matrix3::from_value(0.0);
        let params = StressParams {
            stiffness: 10.0,
            dynamic_viscosity: 0.0,
            rest_density: 1.0,
            youngs_modulus: 0.0,
            poisson_ratio: 0.0,
        };
        let sigma = stress_fluid(f, c, &params);
        assert!(sigma.x.x > 0.0);
        assert!(sigma.y.y > 0.0);
        assert!(sigma.z.z > 0.0);
    }

    #[test]
    fn lame_parameters_are_positive_for_typical_inputs() {
        let (mu, lambda) = lame_parameters(1.0e4, 0.3);
        assert!(mu > 0.0);
        assert!(lambda > 0.0);
    }
}
