use glam::{Quat, Vec3};

/// Values a keyframe can hold and be blended between.
pub trait Interpolatable: Copy + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        unit_or_identity(start).slerp(unit_or_identity(end), t)
    }
}

/// Normalizes `q`, falling back to identity when it has no usable length.
#[inline]
#[must_use]
pub fn unit_or_identity(q: Quat) -> Quat {
    let len = q.length();
    if len.is_finite() && len > 1e-6 {
        q.normalize()
    } else {
        Quat::IDENTITY
    }
}
