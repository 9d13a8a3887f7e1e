// tween.rs — 单一补间任务

use glam::Vec3;

use super::Easing;

pub trait Lerp: Copy {
    fn lerp_to(self, end: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp_to(self, end: Self, t: f32) -> Self {
        self + (end - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp_to(self, end: Self, t: f32) -> Self {
        self.lerp(end, t)
    }
}

/// Interpolates one value from `from` to `to` over `duration` seconds.
///
/// The owner holds at most one `Tween` per animated property; starting a new
/// one replaces the old value outright.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T: Lerp> {
    from: T,
    to: T,
    elapsed: f32,
    duration: f32,
    easing: Easing,
}

impl<T: Lerp> Tween<T> {
    pub fn new(from: T, to: T, duration: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration: duration.max(0.0),
            easing,
        }
    }

    /// 线性进度 [0, 1]；时长为 0 时直接视为完成
    pub fn progress(&self) -> f32 {
        if self.duration <= f32::EPSILON {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn value(&self) -> T {
        if self.is_finished() {
            return self.to;
        }
        self.from.lerp_to(self.to, self.easing.apply(self.progress()))
    }

    /// Advances by `dt` seconds and returns the new value.
    pub fn advance(&mut self, dt: f32) -> T {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed = (self.elapsed + dt).min(self.duration);
        }
        self.value()
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_tween_reaches_midpoint_and_end() {
        let mut t = Tween::new(0.0f32, 10.0, 2.0, Easing::Linear);
        assert_eq!(t.advance(1.0), 5.0);
        assert!(!t.is_finished());
        assert_eq!(t.advance(5.0), 10.0);
        assert!(t.is_finished());
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let t = Tween::new(Vec3::ZERO, Vec3::ONE, 0.0, Easing::CubicOut);
        assert!(t.is_finished());
        assert_eq!(t.value(), Vec3::ONE);
    }

    #[test]
    fn negative_or_nan_dt_is_ignored() {
        let mut t = Tween::new(1.0f32, 2.0, 1.0, Easing::Linear);
        assert_eq!(t.advance(-1.0), 1.0);
        assert_eq!(t.advance(f32::NAN), 1.0);
        assert_eq!(t.progress(), 0.0);
    }

    #[test]
    fn vec3_tween_follows_easing() {
        let mut t = Tween::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), 1.0, Easing::QuadraticOut);
        let v = t.advance(0.5);
        assert!((v.x - 3.0).abs() < 1e-5);
    }
}
