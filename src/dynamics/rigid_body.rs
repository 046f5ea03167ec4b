use crate::collision::BodyHandle;
use crate::error::{PhysicsError, Result};
use crate::geometry::{Aabb, Collider, Material, Shape};
use crate::math::utils::{inverse_clamped, normalize_or_identity};
use crate::math::{Mat3, Pose, Quat, Transform, Vec3};

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionType {
    /// Never moves; infinite mass
    Static,
    /// Moves with its velocity but ignores forces and contacts
    Kinematic,
    /// Responds to gravity, forces and contacts
    #[default]
    Dynamic,
}

/// Collision group membership and the groups a body collides with.
///
/// Two bodies interact only if each one's group is in the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionFilter {
    pub group: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::new(Self::GROUP_DEFAULT, Self::ALL)
    }
}

impl CollisionFilter {
    pub const GROUP_DEFAULT: u32 = 1;
    pub const GROUP_STATIC: u32 = 1 << 1;
    pub const GROUP_DYNAMIC: u32 = 1 << 2;
    pub const ALL: u32 = u32::MAX;

    pub const fn new(group: u32, mask: u32) -> Self {
        Self { group, mask }
    }

    /// Default filter for a freshly created body
    pub fn for_motion(motion: MotionType) -> Self {
        let group = match motion {
            MotionType::Static => Self::GROUP_STATIC,
            MotionType::Kinematic | MotionType::Dynamic => Self::GROUP_DYNAMIC,
        };
        Self::new(group, Self::ALL)
    }

    /// Returns true if both bodies accept each other
    #[inline]
    pub fn allows(&self, other: &Self) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

/// A rigid body in the physics simulation
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// Slot of this body in its world
    pub handle: BodyHandle,
    motion_type: MotionType,
    collider: Collider,

    /// Position of the centre of mass in world space
    pub position: Vec3,
    /// Orientation (unit quaternion)
    pub rotation: Quat,

    /// Linear velocity
    pub linear_velocity: Vec3,
    /// Angular velocity (radians per second)
    pub angular_velocity: Vec3,

    mass: f32,
    inv_mass: f32,
    inertia_local: Mat3,
    inv_inertia_world: Mat3,

    force: Vec3,
    torque: Vec3,

    /// Per-second linear velocity loss, applied as `max(0, 1 - d * dt)`
    pub linear_damping: f32,
    /// Per-second angular velocity loss
    pub angular_damping: f32,

    pub filter: CollisionFilter,

    is_awake: bool,
    /// Whether the body is allowed to fall asleep
    pub can_sleep: bool,
    sleep_time: f32,

    /// Free for host use
    pub user_data: u64,
}

impl RigidBody {
    /// Builds a body from its description.
    ///
    /// Fails with [`PhysicsError::InvalidMass`] when a dynamic body ends up
    /// with a mass that is not finite and positive.
    pub fn from_desc(desc: RigidBodyDesc) -> Result<Self> {
        let mut body = Self {
            handle: BodyHandle::INVALID,
            motion_type: desc.motion_type,
            collider: desc.collider,
            position: desc.position,
            rotation: normalize_or_identity(desc.rotation),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 0.0,
            inv_mass: 0.0,
            inertia_local: Mat3::ZERO,
            inv_inertia_world: Mat3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            filter: desc
                .filter
                .unwrap_or_else(|| CollisionFilter::for_motion(desc.motion_type)),
            is_awake: true,
            can_sleep: desc.can_sleep,
            sleep_time: 0.0,
            user_data: desc.user_data,
        };

        if body.motion_type != MotionType::Static {
            body.linear_velocity = desc.linear_velocity;
            body.angular_velocity = desc.angular_velocity;
        }

        if body.is_dynamic() {
            let mass = desc
                .mass
                .unwrap_or_else(|| body.collider.shape.volume() * body.collider.material.density);
            body.set_mass(mass)?;
        }

        Ok(body)
    }

    #[inline]
    pub fn motion_type(&self) -> MotionType {
        self.motion_type
    }

    #[inline]
    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.collider.shape
    }

    #[inline]
    pub fn material(&self) -> &Material {
        &self.collider.material
    }

    /// Mass in kg (0 for static and kinematic bodies)
    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Local inertia tensor about the centre of mass
    #[inline]
    pub fn inertia_local(&self) -> Mat3 {
        self.inertia_local
    }

    /// World-space inverse inertia tensor for the current orientation
    #[inline]
    pub fn inv_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.motion_type == MotionType::Dynamic
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.motion_type == MotionType::Static
    }

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.motion_type == MotionType::Kinematic
    }

    #[inline]
    pub fn is_awake(&self) -> bool {
        self.is_awake
    }

    /// Current pose as a plain transform
    #[inline]
    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
        }
    }

    /// World-space bounds of the collider at the current pose
    #[inline]
    pub fn world_aabb(&self) -> Aabb {
        self.collider.shape.world_aabb(self)
    }

    /// Re-masses a dynamic body and recomputes its inertia from the shape.
    /// Ignored for static and kinematic bodies.
    pub fn set_mass(&mut self, mass: f32) -> Result<()> {
        if !self.is_dynamic() {
            return Ok(());
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }

        self.mass = mass;
        self.inv_mass = 1.0 / mass;
        self.inertia_local = self.collider.shape.inertia(mass);
        self.update_world_inertia();
        Ok(())
    }

    /// Recomputes the world inverse inertia as `inverse(R * I * R^T)`.
    pub fn update_world_inertia(&mut self) {
        if !self.is_dynamic() {
            self.inv_inertia_world = Mat3::ZERO;
            return;
        }

        let rot = Mat3::from_quat(self.rotation);
        self.inv_inertia_world = inverse_clamped(rot * self.inertia_local * rot.transpose());
    }

    /// Accumulates a force at the centre of mass until the end of the step
    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_dynamic() {
            self.force += force;
            self.wake_up();
        }
    }

    /// Accumulates a torque until the end of the step
    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.is_dynamic() {
            self.torque += torque;
            self.wake_up();
        }
    }

    /// Accumulated force for the current step
    #[inline]
    pub fn force(&self) -> Vec3 {
        self.force
    }

    #[inline]
    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    /// Applies an impulse at the centre of mass
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if self.is_dynamic() {
            self.linear_velocity += impulse * self.inv_mass;
            self.wake_up();
        }
    }

    /// Applies an impulse at a world point. Only dynamic bodies respond.
    pub fn apply_impulse_at_point(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_dynamic() {
            self.linear_velocity += impulse * self.inv_mass;
            let r = point - self.position;
            self.angular_velocity += self.inv_inertia_world * r.cross(impulse);
            self.wake_up();
        }
    }

    /// Velocity of the material point at world position `point`
    #[inline]
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.position)
    }

    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    pub fn wake_up(&mut self) {
        self.is_awake = true;
        self.sleep_time = 0.0;
    }

    /// Puts the body to sleep, zeroing its motion
    pub fn sleep(&mut self) {
        if self.can_sleep && self.is_dynamic() {
            self.is_awake = false;
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            self.clear_forces();
        }
    }

    /// Advances the sleep timer; returns true if the body fell asleep.
    pub fn update_sleep(&mut self, dt: f32, threshold: f32, time_to_sleep: f32) -> bool {
        if !self.can_sleep || !self.is_dynamic() || !self.is_awake {
            return false;
        }

        let motion =
            self.linear_velocity.length_squared() + self.angular_velocity.length_squared();
        if motion < threshold {
            self.sleep_time += dt;
            if self.sleep_time > time_to_sleep {
                self.sleep();
                return true;
            }
        } else {
            self.sleep_time = 0.0;
        }
        false
    }
}

impl Pose for RigidBody {
    #[inline]
    fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    fn orientation(&self) -> Quat {
        self.rotation
    }
}

/// Description for creating a rigid body
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigidBodyDesc {
    pub motion_type: MotionType,
    pub collider: Collider,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Explicit mass; dynamic bodies without one use density times volume
    pub mass: Option<f32>,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Explicit filter; `None` picks one from the motion type
    pub filter: Option<CollisionFilter>,
    pub can_sleep: bool,
    pub user_data: u64,
}

impl RigidBodyDesc {
    pub fn new(motion_type: MotionType, shape: Shape) -> Self {
        Self {
            motion_type,
            collider: Collider::new(shape),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: None,
            linear_damping: 0.01,
            angular_damping: 0.05,
            filter: None,
            can_sleep: true,
            user_data: 0,
        }
    }

    pub fn dynamic(shape: Shape) -> Self {
        Self::new(MotionType::Dynamic, shape)
    }

    pub fn fixed(shape: Shape) -> Self {
        Self::new(MotionType::Static, shape)
    }

    pub fn kinematic(shape: Shape) -> Self {
        Self::new(MotionType::Kinematic, shape)
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.collider.material = material;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }
}
