use crate::collision::narrow_phase::{contact_manifold, EPA_MAX_ITERATIONS};
use crate::collision::{
    classify_bounded, BodyHandle, CollisionPair, ContactManifold, DynamicAabbTree, Intersection, ProxyId,
};
use crate::dynamics::{integrate_transform, integrate_velocities, CollisionFilter, RigidBody, RigidBodyDesc};
use crate::error::{PhysicsError, Result};
use crate::geometry::{Aabb, Shape};
use crate::math::consts::EPSILON;
use crate::math::utils::normalize_or_identity;
use crate::math::{Pose, Transform, Vec3};
use crate::solver::{ContactSolver, SolverSettings, SolverStats};

/// When and how dynamic bodies fall asleep
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SleepSettings {
    pub enabled: bool,
    /// Bound on `|v|^2 + |w|^2` below which a body counts as resting
    pub linear_threshold: f32,
    /// Seconds a body must rest before it sleeps
    pub time_to_sleep: f32,
}

impl Default for SleepSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            linear_threshold: 0.01,
            time_to_sleep: 0.5,
        }
    }
}

/// Configuration for the physics world
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorldConfig {
    pub gravity: Vec3,
    pub solver: SolverSettings,
    /// Padding added to broadphase boxes; 0 reinserts a leaf on every move
    pub broadphase_margin: f32,
    pub sleep: SleepSettings,
    /// Cap on penetration refinements per pair; overlaps left unmeasured are
    /// counted in [`StepReport::unresolved`]
    pub epa_max_iterations: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            solver: SolverSettings::default(),
            broadphase_margin: 0.0,
            sleep: SleepSettings::default(),
            epa_max_iterations: EPA_MAX_ITERATIONS,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidSettings {
                reason: "gravity must be finite",
            });
        }
        if !self.broadphase_margin.is_finite() || self.broadphase_margin < 0.0 {
            return Err(PhysicsError::InvalidSettings {
                reason: "broadphase margin must be finite and non-negative",
            });
        }
        if !self.sleep.linear_threshold.is_finite() || !self.sleep.time_to_sleep.is_finite() {
            return Err(PhysicsError::InvalidSettings {
                reason: "sleep thresholds must be finite",
            });
        }
        Ok(())
    }
}

/// What happened during one [`World::step`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Pairs whose broadphase boxes overlapped
    pub candidate_pairs: usize,
    /// Pairs that passed filtering and the narrowphase
    pub manifolds: usize,
    /// Velocity constraints handed to the solver
    pub constraints: usize,
    /// Overlaps the penetration search could not measure
    pub unresolved: usize,
    pub solver: SolverStats,
}

/// Result of a ray cast query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    /// Body that was hit
    pub body: BodyHandle,
    /// World space hit point
    pub point: Vec3,
    /// Surface normal at hit point
    pub normal: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}

/// The physics world: owns every body and runs the simulation pipeline.
///
/// Removing a body nulls its slot; slots are never reused, so a handle stays
/// tied to the body it was issued for.
pub struct World {
    gravity: Vec3,
    broadphase_margin: f32,
    sleep: SleepSettings,
    epa_max_iterations: usize,
    bodies: Vec<Option<RigidBody>>,
    /// Broadphase leaf of each body slot
    proxies: Vec<Option<ProxyId>>,
    live: usize,
    broad_phase: DynamicAabbTree<BodyHandle>,
    pairs: Vec<CollisionPair>,
    manifolds: Vec<ContactManifold>,
    solver: ContactSolver,
    time: f32,
}

impl Default for World {
    fn default() -> Self {
        Self::with_valid_config(WorldConfig::default())
    }
}

impl World {
    /// Creates a new physics world with the given configuration
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: WorldConfig) -> Self {
        Self {
            gravity: config.gravity,
            broadphase_margin: config.broadphase_margin,
            sleep: config.sleep,
            epa_max_iterations: config.epa_max_iterations,
            bodies: Vec::new(),
            proxies: Vec::new(),
            live: 0,
            broad_phase: DynamicAabbTree::new(),
            pairs: Vec::new(),
            manifolds: Vec::new(),
            solver: ContactSolver::new(config.solver),
            time: 0.0,
        }
    }

    /// Current configuration
    pub fn config(&self) -> WorldConfig {
        WorldConfig {
            gravity: self.gravity,
            solver: *self.solver.settings(),
            broadphase_margin: self.broadphase_margin,
            sleep: self.sleep,
            epa_max_iterations: self.epa_max_iterations,
        }
    }

    /// Creates a body and registers it with the broadphase.
    pub fn add_body(&mut self, desc: RigidBodyDesc) -> Result<BodyHandle> {
        let mut body = RigidBody::from_desc(desc)?;
        let handle = BodyHandle::new(self.bodies.len() as u32);
        body.handle = handle;

        let proxy = self
            .broad_phase
            .insert(body.world_aabb().expand(self.broadphase_margin), handle);
        log::trace!("added {:?} body {:?}", body.motion_type(), handle);

        self.bodies.push(Some(body));
        self.proxies.push(Some(proxy));
        self.live += 1;
        Ok(handle)
    }

    /// Removes a body and its broadphase leaf, returning the body.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let body = self
            .bodies
            .get_mut(handle.index())
            .and_then(Option::take)
            .ok_or(PhysicsError::StaleHandle(handle))?;

        if let Some(proxy) = self.proxies[handle.index()].take() {
            self.broad_phase.remove(proxy);
        }
        self.manifolds
            .retain(|m| m.body_a != handle && m.body_b != handle);
        self.live -= 1;

        log::trace!("removed body {:?}", handle);
        Ok(body)
    }

    /// Gets a reference to a body
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.index()).and_then(Option::as_ref)
    }

    /// Gets a mutable reference to a body. Pose edits made through it reach
    /// the broadphase at the start of the next step.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.index()).and_then(Option::as_mut)
    }

    fn live_body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.body_mut(handle)
            .ok_or(PhysicsError::StaleHandle(handle))
    }

    /// Gets the pose of a body
    pub fn pose(&self, handle: BodyHandle) -> Result<Transform> {
        self.body(handle)
            .map(RigidBody::transform)
            .ok_or(PhysicsError::StaleHandle(handle))
    }

    /// Teleports a body to `pose` and refreshes its broadphase leaf.
    pub fn set_pose<P: Pose>(&mut self, handle: BodyHandle, pose: &P) -> Result<()> {
        let body = self.live_body_mut(handle)?;
        body.position = pose.position();
        body.rotation = normalize_or_identity(pose.orientation());
        body.update_world_inertia();
        body.wake_up();

        self.refresh_leaf(handle.index());
        Ok(())
    }

    /// Sets both velocities of a body. Static bodies keep zero velocity.
    pub fn set_velocity(&mut self, handle: BodyHandle, linear: Vec3, angular: Vec3) -> Result<()> {
        let body = self.live_body_mut(handle)?;
        if !body.is_static() {
            body.linear_velocity = linear;
            body.angular_velocity = angular;
            body.wake_up();
        }
        Ok(())
    }

    pub fn set_collision_filter(&mut self, handle: BodyHandle, filter: CollisionFilter) -> Result<()> {
        self.live_body_mut(handle)?.filter = filter;
        Ok(())
    }

    pub fn set_solver_settings(&mut self, settings: SolverSettings) -> Result<()> {
        settings.validate()?;
        self.solver.set_settings(settings);
        Ok(())
    }

    pub fn solver_settings(&self) -> &SolverSettings {
        self.solver.settings()
    }

    /// Sets the gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Gets the gravity
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Steps the simulation with the configured iteration count
    pub fn step(&mut self, dt: f32) -> Result<StepReport> {
        let iterations = self.solver.settings().iterations;
        self.step_with_iterations(dt, iterations)
    }

    /// Steps the simulation once with an explicit iteration count.
    ///
    /// Pipeline: integrate velocities, refresh bounds, gather pairs,
    /// narrowphase, solve contacts, integrate poses.
    pub fn step_with_iterations(&mut self, dt: f32, iterations: usize) -> Result<StepReport> {
        if !dt.is_finite() || dt <= 0.0 {
            log::warn!("rejecting step with dt = {dt}");
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        if iterations == 0 {
            log::warn!("rejecting step with zero solver iterations");
            return Err(PhysicsError::InvalidSettings {
                reason: "solver needs at least one iteration",
            });
        }

        for body in self.bodies.iter_mut().flatten() {
            integrate_velocities(body, self.gravity, dt);
        }

        self.refresh_bounds();
        self.find_pairs();
        let unresolved = self.narrow_phase();

        self.solver.restore_impulses(&mut self.manifolds);
        self.solver.build(&self.manifolds, &self.bodies, 1.0 / dt);
        self.solver.warm_start(&mut self.bodies);
        let stats = self.solver.solve(&mut self.bodies, iterations);
        self.solver.store_impulses(&mut self.manifolds);

        for body in self.bodies.iter_mut().flatten() {
            integrate_transform(body, dt);
            body.clear_forces();
        }
        // Keep queries between steps in sync with the new poses
        self.refresh_bounds();

        if self.sleep.enabled {
            self.update_sleep(dt);
        }
        self.time += dt;

        let report = StepReport {
            candidate_pairs: self.pairs.len(),
            manifolds: self.manifolds.len(),
            constraints: self.solver.constraints().len(),
            unresolved,
            solver: stats,
        };
        log::debug!(
            "step t={:.4}: {} pairs, {} manifolds, {} constraints, {} unresolved",
            self.time,
            report.candidate_pairs,
            report.manifolds,
            report.constraints,
            report.unresolved
        );
        Ok(report)
    }

    /// Reinserts leaves whose stored box no longer covers the body
    fn refresh_bounds(&mut self) {
        for index in 0..self.bodies.len() {
            self.refresh_leaf(index);
        }
    }

    fn refresh_leaf(&mut self, index: usize) {
        let (Some(Some(body)), Some(Some(proxy))) = (self.bodies.get(index), self.proxies.get(index))
        else {
            return;
        };

        let tight = body.world_aabb();
        let (stored, _) = self.broad_phase.leaf(*proxy);
        let stale = if self.broadphase_margin > 0.0 {
            !stored.contains_aabb(tight)
        } else {
            stored != tight
        };

        if stale {
            self.broad_phase
                .update(*proxy, tight.expand(self.broadphase_margin));
        }
    }

    /// Collects every overlapping leaf pair once, lower slot first, sorted
    fn find_pairs(&mut self) {
        self.pairs.clear();

        for (index, entry) in self.bodies.iter().enumerate() {
            let (Some(body), Some(proxy)) = (entry, self.proxies[index]) else {
                continue;
            };

            let (aabb, _) = self.broad_phase.leaf(proxy);
            self.broad_phase.query(aabb, |_, other| {
                if other.index() > index {
                    self.pairs.push(CollisionPair::new(body.handle, other));
                }
            });
        }

        self.pairs.sort_unstable();
    }

    /// Runs the exact test on every candidate pair that passes filtering.
    /// Returns how many overlaps could not be measured.
    fn narrow_phase(&mut self) -> usize {
        self.manifolds.clear();
        let mut unresolved = 0;
        let mut to_wake = Vec::new();
        let max_epa_iterations = self.epa_max_iterations;

        for pair in &self.pairs {
            let (Some(a), Some(b)) = (slot(&self.bodies, pair.body_a), slot(&self.bodies, pair.body_b))
            else {
                continue;
            };
            if !should_collide(a, b) {
                continue;
            }

            match classify_bounded(a.shape(), a, b.shape(), b, max_epa_iterations) {
                Intersection::Separated => {}
                Intersection::Penetrating(penetration) => {
                    self.manifolds.push(contact_manifold(
                        (a.handle, a.shape(), a),
                        (b.handle, b.shape(), b),
                        penetration,
                    ));
                    for body in [a, b] {
                        if body.is_dynamic() && !body.is_awake() {
                            to_wake.push(body.handle);
                        }
                    }
                }
                Intersection::Unresolved(err) => {
                    unresolved += 1;
                    log::debug!("no contact for {:?}/{:?}: {err}", pair.body_a, pair.body_b);
                }
            }
        }

        for handle in to_wake {
            if let Some(body) = self.body_mut(handle) {
                body.wake_up();
                log::trace!("contact woke body {:?}", handle);
            }
        }

        unresolved
    }

    fn update_sleep(&mut self, dt: f32) {
        let SleepSettings {
            linear_threshold,
            time_to_sleep,
            ..
        } = self.sleep;

        for body in self.bodies.iter_mut().flatten() {
            if body.update_sleep(dt, linear_threshold, time_to_sleep) {
                log::trace!("body {:?} fell asleep", body.handle);
            }
        }
    }

    /// Manifolds produced by the last step
    pub fn contacts(&self) -> &[ContactManifold] {
        &self.manifolds
    }

    /// Bodies whose bounds overlap `aabb`, in handle order
    pub fn query_aabb(&self, aabb: Aabb) -> Vec<BodyHandle> {
        let mut hits = Vec::new();
        self.broad_phase.query(aabb, |_, handle| {
            if slot(&self.bodies, handle).is_some_and(|body| body.world_aabb().intersects(aabb)) {
                hits.push(handle);
            }
        });
        hits.sort_unstable();
        hits
    }

    /// Closest body hit by the ray within `max_distance`.
    ///
    /// Spheres are hit exactly; other shapes are tested against their local
    /// bounding box in body space.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayCastHit> {
        let direction = direction.try_normalize()?;
        let mut closest: Option<RayCastHit> = None;

        self.broad_phase
            .raycast(origin, direction, max_distance, |_, handle, _| {
                let Some(body) = slot(&self.bodies, handle) else {
                    return true;
                };
                let limit = closest.map_or(max_distance, |hit| hit.distance);

                if let Some((distance, normal)) = cast_body(body, origin, direction, limit) {
                    if closest.map_or(true, |hit| distance < hit.distance) {
                        closest = Some(RayCastHit {
                            body: handle,
                            point: origin + direction * distance,
                            normal,
                            distance,
                        });
                    }
                }
                true
            });

        closest
    }

    /// Iterates over live bodies in handle order
    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> + '_ {
        self.bodies.iter().flatten()
    }

    /// Returns the number of bodies in the world
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the current simulation time
    pub fn time(&self) -> f32 {
        self.time
    }
}

#[inline]
fn slot(bodies: &[Option<RigidBody>], handle: BodyHandle) -> Option<&RigidBody> {
    bodies.get(handle.index()).and_then(Option::as_ref)
}

/// Pair filter: something must be able to move, both filters must accept
/// each other, and at least one body must be awake and non-static.
fn should_collide(a: &RigidBody, b: &RigidBody) -> bool {
    if !a.is_dynamic() && !b.is_dynamic() {
        return false;
    }
    if !a.filter.allows(&b.filter) {
        return false;
    }
    let active = |body: &RigidBody| !body.is_static() && body.is_awake();
    active(a) || active(b)
}

/// Distance and surface normal where a unit ray first meets a body
fn cast_body(body: &RigidBody, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
    if let Shape::Sphere(sphere) = body.shape() {
        return cast_sphere(body.position, sphere.radius, origin, direction, max_distance);
    }

    let local_origin = body.inverse_transform_point(origin);
    let local_direction = body.inverse_transform_direction(direction);
    let bounds = body.shape().local_bounds();
    let (t, _) = bounds.ray_interval(local_origin, local_direction, max_distance)?;

    if t <= 0.0 {
        return Some((0.0, -direction));
    }
    let local_normal = box_face_normal(bounds, local_origin + local_direction * t);
    Some((t, body.transform_direction(local_normal)))
}

fn cast_sphere(
    center: Vec3,
    radius: f32,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<(f32, Vec3)> {
    let m = origin - center;
    let b = m.dot(direction);
    let c = m.length_squared() - radius * radius;
    // Outside and pointing away
    if c > 0.0 && b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = (-b - discriminant.sqrt()).max(0.0);
    if t > max_distance {
        return None;
    }
    if t == 0.0 {
        return Some((0.0, -direction));
    }

    let normal = (origin + direction * t - center)
        .try_normalize()
        .unwrap_or(-direction);
    Some((t, normal))
}

/// Outward normal of the box face nearest to a point on its surface
fn box_face_normal(bounds: Aabb, point: Vec3) -> Vec3 {
    let local = (point - bounds.center()) / bounds.half_extents().max(Vec3::splat(EPSILON));
    let abs = local.abs();

    if abs.x >= abs.y && abs.x >= abs.z {
        Vec3::X * local.x.signum()
    } else if abs.y >= abs.z {
        Vec3::Y * local.y.signum()
    } else {
        Vec3::Z * local.z.signum()
    }
}
