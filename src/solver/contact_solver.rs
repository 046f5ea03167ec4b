use std::collections::HashMap;

use crate::collision::{AccumulatedImpulse, CollisionPair, ContactManifold, MAX_CONTACT_POINTS};
use crate::constraints::{ContactConstraint, ContactParams};
use crate::dynamics::RigidBody;
use crate::error::{PhysicsError, Result};

/// How two per-body coefficients merge into one per-contact value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombineMode {
    Max,
    Min,
    /// Geometric mean, `sqrt(a * b)`
    #[default]
    Multiply,
    Average,
}

impl CombineMode {
    #[inline]
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            CombineMode::Max => a.max(b),
            CombineMode::Min => a.min(b),
            CombineMode::Multiply => (a * b).max(0.0).sqrt(),
            CombineMode::Average => (a + b) * 0.5,
        }
    }
}

/// Configuration for the contact solver
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverSettings {
    /// Velocity iterations per step
    pub iterations: usize,
    /// Penetration (metres) left uncorrected to keep resting contacts quiet
    pub penetration_slop: f32,
    /// Fraction of the remaining penetration corrected per step
    pub baumgarte: f32,
    pub friction_combine: CombineMode,
    pub restitution_combine: CombineMode,
    /// Closing speed (m/s) below which contacts do not bounce
    pub restitution_threshold: f32,
    /// Seed each step with the previous step's impulses
    pub warm_starting: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            iterations: 10,
            penetration_slop: 0.01,
            baumgarte: 0.2,
            friction_combine: CombineMode::Multiply,
            restitution_combine: CombineMode::Max,
            restitution_threshold: 1.0,
            warm_starting: true,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(PhysicsError::InvalidSettings {
                reason: "solver needs at least one iteration",
            });
        }
        if !self.penetration_slop.is_finite() || self.penetration_slop < 0.0 {
            return Err(PhysicsError::InvalidSettings {
                reason: "penetration slop must be finite and non-negative",
            });
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return Err(PhysicsError::InvalidSettings {
                reason: "baumgarte factor must lie in [0, 1]",
            });
        }
        if !self.restitution_threshold.is_finite() || self.restitution_threshold < 0.0 {
            return Err(PhysicsError::InvalidSettings {
                reason: "restitution threshold must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Convergence record of one [`ContactSolver::solve`] call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverStats {
    /// Iterations actually run
    pub iterations: usize,
    /// Largest normal velocity correction applied in each iteration
    pub residuals: Vec<f32>,
}

impl SolverStats {
    /// Number of iterations it took for the correction to drop to
    /// `threshold`, or `None` if it never did.
    pub fn iterations_to_reach(&self, threshold: f32) -> Option<usize> {
        self.residuals
            .iter()
            .position(|&r| r <= threshold)
            .map(|i| i + 1)
    }

    /// Residual of the last iteration (0 when nothing was solved)
    pub fn final_residual(&self) -> f32 {
        self.residuals.last().copied().unwrap_or(0.0)
    }
}

/// Sequential-impulse solver over contact constraints.
///
/// Accumulated impulses are kept per body pair between steps so the next
/// step can start from them.
#[derive(Debug, Default)]
pub struct ContactSolver {
    settings: SolverSettings,
    constraints: Vec<ContactConstraint>,
    /// Manifold and point index each constraint was built from
    sources: Vec<(usize, usize)>,
    cache: HashMap<CollisionPair, [AccumulatedImpulse; MAX_CONTACT_POINTS]>,
}

impl ContactSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[inline]
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SolverSettings) {
        self.settings = settings;
    }

    /// Constraints built by the last [`build`](Self::build)
    #[inline]
    pub fn constraints(&self) -> &[ContactConstraint] {
        &self.constraints
    }

    /// Number of pairs with impulses carried into the next step
    #[inline]
    pub fn cached_pairs(&self) -> usize {
        self.cache.len()
    }

    /// Forgets every carried impulse
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Seeds manifold points with last step's impulses for the same pair, or
    /// zero when warm starting is off.
    pub fn restore_impulses(&self, manifolds: &mut [ContactManifold]) {
        for manifold in manifolds.iter_mut() {
            let cached = if self.settings.warm_starting {
                self.cache.get(&manifold.pair()).copied()
            } else {
                None
            };

            for (i, point) in manifold.iter_mut().enumerate() {
                point.impulse = cached.map(|c| c[i]).unwrap_or_default();
            }
        }
    }

    /// Builds one constraint per contact point.
    ///
    /// Pairs whose bodies are missing or where neither body is dynamic are
    /// skipped.
    pub fn build(&mut self, manifolds: &[ContactManifold], bodies: &[Option<RigidBody>], inv_dt: f32) {
        self.constraints.clear();
        self.sources.clear();

        for (m, manifold) in manifolds.iter().enumerate() {
            let ia = manifold.body_a.index();
            let ib = manifold.body_b.index();
            let (Some(Some(body_a)), Some(Some(body_b))) = (bodies.get(ia), bodies.get(ib)) else {
                continue;
            };
            if !body_a.is_dynamic() && !body_b.is_dynamic() {
                continue;
            }

            let (mat_a, mat_b) = (body_a.material(), body_b.material());
            let params = ContactParams {
                friction: self.settings.friction_combine.combine(mat_a.friction, mat_b.friction),
                restitution: self
                    .settings
                    .restitution_combine
                    .combine(mat_a.restitution, mat_b.restitution),
                penetration_slop: self.settings.penetration_slop,
                baumgarte: self.settings.baumgarte,
                inv_dt,
            };

            for (p, point) in manifold.iter().enumerate() {
                self.constraints
                    .push(ContactConstraint::new((ia, body_a), (ib, body_b), point, &params));
                self.sources.push((m, p));
            }
        }
    }

    /// Applies the seeded impulses to the bodies
    pub fn warm_start(&self, bodies: &mut [Option<RigidBody>]) {
        if !self.settings.warm_starting {
            return;
        }

        for constraint in &self.constraints {
            if let Some((a, b)) = pair_mut(bodies, constraint.body_a, constraint.body_b) {
                constraint.warm_start(a, b);
            }
        }
    }

    /// Runs `iterations` Gauss-Seidel passes over the constraints in build
    /// order.
    pub fn solve(&mut self, bodies: &mut [Option<RigidBody>], iterations: usize) -> SolverStats {
        let mut stats = SolverStats::default();
        if self.constraints.is_empty() {
            return stats;
        }

        let threshold = self.settings.restitution_threshold;
        for iteration in 0..iterations {
            let mut residual = 0.0f32;

            for constraint in self.constraints.iter_mut() {
                let Some((a, b)) = pair_mut(bodies, constraint.body_a, constraint.body_b) else {
                    continue;
                };

                let correction = constraint.solve_normal(a, b, iteration == 0, threshold);
                constraint.solve_friction(a, b);
                residual = residual.max(correction);
            }

            stats.residuals.push(residual);
            stats.iterations += 1;
        }

        stats
    }

    /// Writes the solved impulses back into the manifolds and replaces the
    /// carried impulses with them. Pairs not in `manifolds` are dropped.
    pub fn store_impulses(&mut self, manifolds: &mut [ContactManifold]) {
        for (constraint, &(m, p)) in self.constraints.iter().zip(&self.sources) {
            if let Some(point) = manifolds.get_mut(m).and_then(|manifold| manifold.iter_mut().nth(p)) {
                point.impulse = constraint.impulse;
            }
        }

        self.cache.clear();
        for manifold in manifolds.iter() {
            let mut impulses = [AccumulatedImpulse::default(); MAX_CONTACT_POINTS];
            for (slot, point) in impulses.iter_mut().zip(manifold.iter()) {
                *slot = point.impulse;
            }
            self.cache.insert(manifold.pair(), impulses);
        }
    }
}

/// Borrows two distinct body slots mutably. `None` if either slot is empty.
fn pair_mut(
    bodies: &mut [Option<RigidBody>],
    a: usize,
    b: usize,
) -> Option<(&mut RigidBody, &mut RigidBody)> {
    if a == b || a.max(b) >= bodies.len() {
        return None;
    }

    let (slot_a, slot_b) = if a < b {
        let (left, right) = bodies.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(a);
        (&mut right[0], &mut left[b])
    };

    Some((slot_a.as_mut()?, slot_b.as_mut()?))
}
