//! Rigid 3D transform math for submap and texture-slice poses.
//!
//! Poses arrive from the map service as translation + unit quaternion in
//! double precision. The compositor paints in the horizontal plane, so the
//! only projection it needs is the translation's x/y plus the rotation's
//! yaw; the z component feeds the distance fader.

/// 3D vector in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Cross product.
    #[inline]
    pub fn cross(self, rhs: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3 {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

/// Unit quaternion, scalar-first (w, x, y, z).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    #[inline]
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotation of `theta` radians about the +z axis (CCW looking down).
    #[inline]
    pub fn from_yaw(theta: f64) -> Self {
        let (sin, cos) = (theta * 0.5).sin_cos();
        Self {
            w: cos,
            x: 0.0,
            y: 0.0,
            z: sin,
        }
    }

    /// Renormalize to unit length. Wire-supplied quaternions can carry
    /// rounding drift; a zero quaternion falls back to identity.
    pub fn normalized(self) -> Self {
        let norm_sq = self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z;
        if norm_sq <= f64::EPSILON {
            return Self::identity();
        }
        let inv = norm_sq.sqrt().recip();
        Self {
            w: self.w * inv,
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
        }
    }

    /// Rotate a vector by this quaternion.
    #[inline]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w(u × v) + 2(u × (u × v)), u = vector part
        let u = Vec3::new(self.x, self.y, self.z);
        let uv = u.cross(v);
        let uuv = u.cross(uv);
        v + uv * (2.0 * self.w) + uuv * 2.0
    }

    /// Heading about +z, in radians [-π, π].
    #[inline]
    pub fn yaw(self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

impl Default for Quat {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Quat {
    type Output = Quat;

    /// Hamilton product (apply `rhs` first, then `self`).
    #[inline]
    fn mul(self, rhs: Quat) -> Quat {
        Quat {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}

/// Rigid 3D transform: rotate, then translate.
///
/// Composition chains frames the usual way: if `a` maps frame B to frame A
/// and `b` maps frame C to frame B, `a * b` maps frame C to frame A.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rigid3 {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Rigid3 {
    #[inline]
    pub const fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::identity(),
        }
    }

    #[inline]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::identity(),
        }
    }

    /// Transform a point from this frame into the parent frame.
    #[inline]
    pub fn transform(self, p: Vec3) -> Vec3 {
        self.translation + self.rotation.rotate(p)
    }
}

impl std::ops::Mul for Rigid3 {
    type Output = Rigid3;

    #[inline]
    fn mul(self, rhs: Rigid3) -> Rigid3 {
        Rigid3 {
            translation: self.transform(rhs.translation),
            rotation: self.rotation * rhs.rotation,
        }
    }
}
