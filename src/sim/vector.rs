//! 2D vector helpers on top of `glam::Vec2`
//!
//! glam covers the arithmetic, dot, length and `normalize_or_zero`. The
//! extension trait adds the variants the simulation relies on that must never
//! produce NaN: division by zero yields zero, angles clamp their cosine,
//! interpolation clamps its parameter.

use glam::Vec2;

/// Components closer to zero than this count as zero
pub const ZERO_EPSILON: f32 = 1e-6;

pub trait Vector2Ext: Sized {
    /// Divide by a scalar; dividing by zero returns the zero vector
    fn safe_div(self, scalar: f32) -> Self;
    /// z-component of the 3D cross product
    fn cross_z(self, other: Self) -> f32;
    /// Angle of the vector in radians (atan2)
    fn heading(self) -> f32;
    /// Unsigned angle between two vectors in radians
    fn angle_between_clamped(self, other: Self) -> f32;
    /// Linear interpolation with `t` clamped to [0, 1]
    fn lerp_clamped(self, other: Self, t: f32) -> Self;
    /// Reflect about a surface normal: v - 2(v·n)n
    fn reflect_about(self, normal: Self) -> Self;
    /// Rotate counter-clockwise by `radians`
    fn rotated(self, radians: f32) -> Self;
    /// Shorten to `max` if longer; a negative `max` yields zero
    fn clamp_magnitude(self, max: f32) -> Self;
    /// No NaN or infinite component
    fn is_valid(self) -> bool;
    fn is_near_zero(self) -> bool;
}

impl Vector2Ext for Vec2 {
    #[inline]
    fn safe_div(self, scalar: f32) -> Vec2 {
        if scalar == 0.0 {
            Vec2::ZERO
        } else {
            self / scalar
        }
    }

    #[inline]
    fn cross_z(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    fn heading(self) -> f32 {
        self.y.atan2(self.x)
    }

    fn angle_between_clamped(self, other: Vec2) -> f32 {
        let cos = self
            .normalize_or_zero()
            .dot(other.normalize_or_zero())
            .clamp(-1.0, 1.0);
        cos.acos()
    }

    #[inline]
    fn lerp_clamped(self, other: Vec2, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        self + (other - self) * t
    }

    #[inline]
    fn reflect_about(self, normal: Vec2) -> Vec2 {
        self - normal * (2.0 * self.dot(normal))
    }

    fn rotated(self, radians: f32) -> Vec2 {
        let (sin, cos) = radians.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    fn clamp_magnitude(self, max: f32) -> Vec2 {
        if max < 0.0 {
            return Vec2::ZERO;
        }
        if self.length_squared() > max * max {
            self.normalize_or_zero() * max
        } else {
            self
        }
    }

    #[inline]
    fn is_valid(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    fn is_near_zero(self) -> bool {
        self.x.abs() < ZERO_EPSILON && self.y.abs() < ZERO_EPSILON
    }
}

/// Unit vector pointing at `radians`
#[inline]
pub fn from_angle(radians: f32) -> Vec2 {
    let (sin, cos) = radians.sin_cos();
    Vec2::new(cos, sin)
}

/// Vector from polar coordinates
#[inline]
pub fn from_polar(magnitude: f32, radians: f32) -> Vec2 {
    from_angle(radians) * magnitude
}
