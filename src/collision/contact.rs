use crate::math::Vec3;

/// Maximum number of contact points in a manifold
pub const MAX_CONTACT_POINTS: usize = 4;

/// A handle to a body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyHandle(pub u32);

impl BodyHandle {
    /// Invalid/null body handle
    pub const INVALID: Self = Self(u32::MAX);

    #[inline]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index of this handle
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for BodyHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// An unordered pair of bodies, stored with the smaller handle first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
}

impl CollisionPair {
    /// Creates a new collision pair, ensuring consistent ordering
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        if a.0 <= b.0 {
            Self { body_a: a, body_b: b }
        } else {
            Self { body_a: b, body_b: a }
        }
    }
}

/// Impulses accumulated at a contact over the solver iterations of one step.
///
/// Carried into the next step for warm starting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumulatedImpulse {
    /// Along the contact normal; never negative
    pub normal: f32,
    /// Along the two tangent directions
    pub tangent: [f32; 2],
}

/// A single contact point between two bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World-space contact location
    pub position: Vec3,
    /// Unit normal pointing from body A towards body B
    pub normal: Vec3,
    /// Penetration depth (positive when overlapping)
    pub depth: f32,
    pub impulse: AccumulatedImpulse,
}

impl ContactPoint {
    pub fn new(position: Vec3, normal: Vec3, depth: f32) -> Self {
        Self {
            position,
            normal,
            depth,
            impulse: AccumulatedImpulse::default(),
        }
    }
}

/// Contact points between one pair of bodies
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    points: [Option<ContactPoint>; MAX_CONTACT_POINTS],
    num_points: usize,
}

impl ContactManifold {
    /// Creates a new empty contact manifold
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            points: [None; MAX_CONTACT_POINTS],
            num_points: 0,
        }
    }

    /// Key used to carry impulses between steps
    #[inline]
    pub fn pair(&self) -> CollisionPair {
        CollisionPair::new(self.body_a, self.body_b)
    }

    /// Adds a point. When the manifold is full the shallowest point is
    /// replaced if the new one is deeper.
    pub fn add_point(&mut self, point: ContactPoint) {
        if self.num_points < MAX_CONTACT_POINTS {
            self.points[self.num_points] = Some(point);
            self.num_points += 1;
            return;
        }

        let shallowest = self
            .points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i, p.depth)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        if let Some((idx, depth)) = shallowest {
            if point.depth > depth {
                self.points[idx] = Some(point);
            }
        }
    }

    /// Iterates over contact points
    pub fn iter(&self) -> impl Iterator<Item = &ContactPoint> {
        self.points.iter().flatten()
    }

    /// Iterates mutably over contact points
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ContactPoint> {
        self.points.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Largest penetration depth among the points
    pub fn max_depth(&self) -> f32 {
        self.iter().map(|p| p.depth).fold(0.0, f32::max)
    }
}
