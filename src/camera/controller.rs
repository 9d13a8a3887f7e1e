// controller.rs — 相机视图控制器：预设注册表、当前视图、过渡与轨道交互

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::core::{Camera, Projection, TOP_DOWN_UP};
use super::preset::{CameraPreset, TransitionPolicy, ViewKey};
use super::registry::CameraRegistry;
use super::resize::{self, ResizeReport};
use super::transition::TransitionJob;
use crate::animation::Easing;
use crate::error::{Result, ViewerError};

const ROTATE_SPEED: f32 = 0.005;
const ZOOM_SPEED: f32 = 0.1;
const MIN_DISTANCE: f32 = 0.2;
const MAX_DISTANCE: f32 = 40.0;
const MIN_HALF_EXTENT: f32 = 0.25;
const MAX_HALF_EXTENT: f32 = 50.0;
// 极角留一点余量，避免翻越极点
const POLAR_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionSettings {
    pub policy: TransitionPolicy,
    pub duration_secs: f32,
    pub easing: Easing,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            policy: TransitionPolicy::Animated,
            duration_secs: 1.0,
            easing: Easing::CubicOut,
        }
    }
}

/// Which camera the renderer uses and the point orbit input revolves around.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub active: ViewKey,
    pub interaction_target: Vec3,
}

pub struct CameraViewController {
    presets: Vec<CameraPreset>,
    registry: CameraRegistry,
    state: ViewState,
    initial: ViewKey,
    settings: TransitionSettings,
    transition: Option<TransitionJob>,
    aspect: f32,
}

impl CameraViewController {
    pub fn new(
        presets: Vec<CameraPreset>,
        initial: ViewKey,
        settings: TransitionSettings,
        aspect: f32,
    ) -> Result<Self> {
        let registry = CameraRegistry::from_presets(&presets, aspect)?;
        let Some(entry) = registry.get(&initial) else {
            return Err(ViewerError::UnknownInitialView(initial));
        };
        let state = ViewState {
            active: initial.clone(),
            interaction_target: entry.preset.look_at,
        };
        log::info!(
            "camera controller ready: {} presets, initial view {}",
            registry.len(),
            initial
        );
        Ok(Self {
            presets,
            registry,
            state,
            initial,
            settings,
            transition: None,
            aspect,
        })
    }

    pub fn switch_to(&mut self, product: &str, view: &str) -> Result<()> {
        self.switch_to_key(&ViewKey::new(product, view))
    }

    /// Makes `key`'s camera active, instantly or through an animated transition.
    ///
    /// An unknown key is logged and leaves the current view untouched. A
    /// transition already in flight is replaced, never blended.
    fn switch_to_key(&mut self, key: &ViewKey) -> Result<()> {
        let Some(entry) = self.registry.get(key) else {
            let err = ViewerError::ViewNotFound(key.clone());
            log::warn!("{err}");
            return Err(err);
        };
        let preset = entry.preset.clone();
        let policy = preset.transition.unwrap_or(self.settings.policy);

        let start_position = self.active_camera().eye;
        let start_target = self.state.interaction_target;
        if self.transition.take().is_some() {
            log::debug!("superseding in-flight transition");
        }

        let aspect = self.aspect;
        let Some(entry) = self.registry.get_mut(key) else {
            return Err(ViewerError::CameraMissing(key.clone()));
        };
        let camera = &mut entry.camera;
        if camera.projection.is_orthographic() {
            // 丢弃之前的缩放，回到预设的半高
            camera.up = TOP_DOWN_UP;
            camera.projection = Projection::from_kind(preset.projection, aspect);
        }

        let duration = self.settings.duration_secs;
        match policy {
            TransitionPolicy::Animated if duration > 0.0 => {
                camera.eye = start_position;
                camera.look_at(start_target);
                self.transition = Some(TransitionJob::new(
                    start_position,
                    preset.position,
                    start_target,
                    preset.look_at,
                    duration,
                    self.settings.easing,
                ));
            }
            _ => {
                camera.eye = preset.position;
                camera.look_at(preset.look_at);
                self.state.interaction_target = preset.look_at;
            }
        }

        self.state.active = key.clone();
        log::info!("switched camera to {key} ({policy:?})");
        Ok(())
    }

    /// Advances the in-flight transition. Returns `true` while one is running.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(job) = self.transition.as_mut() else {
            return false;
        };
        let frame = job.advance(dt);

        let Some(entry) = self.registry.get_mut(&self.state.active) else {
            log::warn!("{}", ViewerError::CameraMissing(self.state.active.clone()));
            self.transition = None;
            return false;
        };
        entry.camera.eye = frame.position;
        // 每帧根据插值后的目标点重新 lookAt
        entry.camera.look_at(frame.target);
        self.state.interaction_target = frame.target;

        if frame.finished {
            self.transition = None;
            log::debug!("transition to {} finished", self.state.active);
        }
        !frame.finished
    }

    pub fn reset(&mut self) -> Result<()> {
        let initial = self.initial.clone();
        self.switch_to_key(&initial)
    }

    pub fn resize(&mut self, aspect: f32) -> ResizeReport {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
        resize::apply_aspect(&mut self.registry, &self.presets, aspect)
    }

    /// Rotates the active camera around the interaction target.
    pub fn orbit(&mut self, delta: Vec2) {
        self.cancel_transition();
        let target = self.state.interaction_target;
        let Some(camera) = self.active_camera_mut() else {
            return;
        };

        let offset = camera.eye - target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        azimuth -= delta.x * ROTATE_SPEED;
        polar = (polar - delta.y * ROTATE_SPEED).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        let sin_polar = polar.sin();
        camera.eye = target
            + radius * Vec3::new(sin_polar * azimuth.sin(), polar.cos(), sin_polar * azimuth.cos());
        camera.look_at(target);
    }

    /// Positive `delta` zooms in: perspective cameras move toward the target,
    /// orthographic cameras shrink their half extent.
    pub fn zoom(&mut self, delta: f32) {
        self.cancel_transition();
        let target = self.state.interaction_target;
        let Some(camera) = self.active_camera_mut() else {
            return;
        };
        if camera.projection.is_orthographic() {
            camera
                .projection
                .scale_half_extent(1.0 - delta * ZOOM_SPEED, MIN_HALF_EXTENT, MAX_HALF_EXTENT);
            return;
        }
        let offset = camera.eye - target;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return;
        }
        let new_distance = (distance * (1.0 - delta * ZOOM_SPEED)).clamp(MIN_DISTANCE, MAX_DISTANCE);
        camera.eye = target + offset * (new_distance / distance);
    }

    fn cancel_transition(&mut self) {
        if let Some(job) = self.transition.take() {
            // 停在当前位置，目标点同步到当前插值
            self.state.interaction_target = self.active_camera().target;
            log::debug!(
                "transition to {} cancelled at {:.0}%",
                self.state.active,
                job.progress() * 100.0
            );
        }
    }

    fn active_camera_mut(&mut self) -> Option<&mut Camera> {
        self.registry
            .get_mut(&self.state.active)
            .map(|entry| &mut entry.camera)
    }

    pub fn active_camera(&self) -> &Camera {
        // 构造时已校验初始视图存在，切换也只会指向已注册的键
        match self.registry.get(&self.state.active) {
            Some(entry) => &entry.camera,
            None => unreachable!("active view {} is always registered", self.state.active),
        }
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Linear progress of the in-flight transition, if any.
    pub fn transition_progress(&self) -> Option<f32> {
        self.transition.as_ref().map(TransitionJob::progress)
    }

    pub fn keys(&self) -> Vec<ViewKey> {
        self.registry.keys()
    }

    pub fn default_policy(&self) -> TransitionPolicy {
        self.settings.policy
    }

    pub fn set_default_policy(&mut self, policy: TransitionPolicy) {
        self.settings.policy = policy;
    }
}
