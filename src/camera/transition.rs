// transition.rs — 相机过渡任务

use glam::Vec3;

use crate::animation::{Easing, Tween};

/// One in-flight camera move: eye and interaction target share a clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionJob {
    position: Tween<Vec3>,
    target: Tween<Vec3>,
}

/// Sample of a transition after one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionFrame {
    pub position: Vec3,
    pub target: Vec3,
    pub finished: bool,
}

impl TransitionJob {
    pub fn new(
        start_position: Vec3,
        end_position: Vec3,
        start_target: Vec3,
        end_target: Vec3,
        duration: f32,
        easing: Easing,
    ) -> Self {
        Self {
            position: Tween::new(start_position, end_position, duration, easing),
            target: Tween::new(start_target, end_target, duration, easing),
        }
    }

    pub fn advance(&mut self, dt: f32) -> TransitionFrame {
        let position = self.position.advance(dt);
        let target = self.target.advance(dt);
        TransitionFrame {
            position,
            target,
            finished: self.position.is_finished(),
        }
    }

    pub fn progress(&self) -> f32 {
        self.position.progress()
    }
}
