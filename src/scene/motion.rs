// motion.rs — 模型翻转 / 自转状态

use std::f32::consts::{PI, TAU};

use crate::animation::{Easing, Tween};

/// 每个渲染帧的自转增量（弧度）
pub const SPIN_STEP: f32 = 0.01;
pub const FLIP_DURATION_SECS: f32 = 1.0;

/// Flip and spin state of one model group.
///
/// The vertical rotation is `spin_angle + flip_angle`. The flip angle rests at
/// `0` or `π` and owns at most one tween; toggling mid-flip replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMotion {
    is_flipped: bool,
    pub is_spinning: bool,
    flip_angle: f32,
    spin_angle: f32,
    flip: Option<Tween<f32>>,
    flip_duration: f32,
    easing: Easing,
}

impl Default for ModelMotion {
    fn default() -> Self {
        Self::new(FLIP_DURATION_SECS, Easing::QuadraticInOut)
    }
}

impl ModelMotion {
    pub fn new(flip_duration: f32, easing: Easing) -> Self {
        Self {
            is_flipped: false,
            is_spinning: false,
            flip_angle: 0.0,
            spin_angle: 0.0,
            flip: None,
            flip_duration,
            easing,
        }
    }

    pub fn toggle_flip(&mut self) {
        self.is_flipped = !self.is_flipped;
        let end = if self.is_flipped { PI } else { 0.0 };
        if self.flip.is_some() {
            log::debug!("flip superseded at {:.3} rad", self.flip_angle);
        }
        self.flip = Some(Tween::new(self.flip_angle, end, self.flip_duration, self.easing));
    }

    pub fn toggle_spin(&mut self) {
        self.is_spinning = !self.is_spinning;
    }

    /// One render tick: advances the flip tween and applies the spin step.
    pub fn tick(&mut self, dt: f32) {
        if let Some(flip) = self.flip.as_mut() {
            self.flip_angle = flip.advance(dt);
            if flip.is_finished() {
                self.flip = None;
            }
        }
        if self.is_spinning {
            self.spin_angle = (self.spin_angle + SPIN_STEP).rem_euclid(TAU);
        }
    }

    pub fn rotation_y(&self) -> f32 {
        self.spin_angle + self.flip_angle
    }

    pub fn is_flipped(&self) -> bool {
        self.is_flipped
    }

    pub fn is_flipping(&self) -> bool {
        self.flip.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(m: &mut ModelMotion) {
        for _ in 0..120 {
            m.tick(1.0 / 30.0);
        }
        assert!(!m.is_flipping());
    }

    fn angle_eq(a: f32, b: f32) -> bool {
        let d = (a - b).rem_euclid(TAU);
        d < 1e-4 || TAU - d < 1e-4
    }

    #[test]
    fn flip_turns_half_way() {
        let mut m = ModelMotion::default();
        m.toggle_flip();
        assert!(m.is_flipped());
        settle(&mut m);
        assert!(angle_eq(m.rotation_y(), PI));
    }

    #[test]
    fn two_flips_return_to_start() {
        let mut m = ModelMotion::default();
        let start = m.rotation_y();
        m.toggle_flip();
        settle(&mut m);
        m.toggle_flip();
        settle(&mut m);
        assert!(!m.is_flipped());
        assert!(angle_eq(m.rotation_y(), start));
    }

    #[test]
    fn flip_mid_animation_starts_from_live_angle() {
        let mut m = ModelMotion::default();
        m.toggle_flip();
        m.tick(0.4);
        let live = m.rotation_y();
        assert!(live > 0.0 && live < PI);
        m.toggle_flip();
        // 新补间从当前角度出发
        assert!(angle_eq(m.rotation_y(), live));
        settle(&mut m);
        assert!(angle_eq(m.rotation_y(), 0.0));
    }

    #[test]
    fn spin_adds_fixed_step_per_tick() {
        let mut m = ModelMotion::default();
        m.toggle_spin();
        for _ in 0..10 {
            m.tick(0.5);
        }
        assert!((m.rotation_y() - 10.0 * SPIN_STEP).abs() < 1e-5);
        m.toggle_spin();
        m.tick(0.5);
        assert!((m.rotation_y() - 10.0 * SPIN_STEP).abs() < 1e-5);
    }

    #[test]
    fn flip_and_spin_compose() {
        let mut m = ModelMotion::default();
        m.toggle_spin();
        m.toggle_flip();
        settle(&mut m);
        m.toggle_spin();
        let spun = 120.0 * SPIN_STEP;
        assert!(angle_eq(m.rotation_y(), PI + spun));
    }
}
