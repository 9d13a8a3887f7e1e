// model.rs — 已加载的产品模型组

use glam::{EulerRot, Mat4, Quat, Vec3};

use super::motion::ModelMotion;
use super::node::{Renderable, SceneNode};
use crate::config::{ProductConfig, Rgb};

/// A loaded product: its node tree, placement, tint and flip/spin state.
#[derive(Debug, Clone)]
pub struct ModelGroup {
    pub product: String,
    pub root: SceneNode,
    pub scale: f32,
    /// Euler XYZ, radians.
    pub rotation: Vec3,
    pub position: Vec3,
    pub motion: ModelMotion,
    tint: Rgb,
}

impl ModelGroup {
    pub fn new(config: &ProductConfig, root: SceneNode) -> Self {
        let mut group = Self {
            product: config.key.clone(),
            root,
            scale: config.scale,
            rotation: config.rotation,
            position: config.position,
            motion: ModelMotion::default(),
            tint: config.color,
        };
        group.apply_tint(config.color);
        if let Some(screen) = &config.screen {
            group.mark_screen_meshes(&screen.mesh_names);
        }
        group
    }

    /// 设置所有网格的基础色，保留 alpha；屏幕网格除外
    pub fn apply_tint(&mut self, color: Rgb) {
        self.tint = color;
        let [r, g, b] = color.to_linear();
        self.root.for_each_renderable_mut(&mut |_, renderable| {
            if renderable.material.screen_texture {
                return;
            }
            let alpha = renderable.material.base_color[3];
            renderable.material.base_color = [r, g, b, alpha];
        });
    }

    pub fn tint(&self) -> Rgb {
        self.tint
    }

    /// Flags nodes whose names match exactly; returns how many matched.
    pub fn mark_screen_meshes(&mut self, names: &[String]) -> usize {
        let mut matched = Vec::new();
        self.root.for_each_renderable_mut(&mut |name, renderable| {
            if let Some(name) = name.filter(|n| names.iter().any(|s| s.as_str() == *n)) {
                renderable.material.screen_texture = true;
                // 屏幕不参与染色
                renderable.material.base_color = [1.0, 1.0, 1.0, 1.0];
                matched.push(name.to_owned());
            }
        });
        for name in names {
            if !matched.contains(name) {
                log::warn!("{}: no mesh named {name:?} for screen texture", self.product);
            }
        }
        matched.len()
    }

    pub fn world_transform(&self) -> Mat4 {
        let base = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_y(self.motion.rotation_y())
            * Mat4::from_quat(base)
            * Mat4::from_scale(Vec3::splat(self.scale))
    }

    pub fn renderables(&self) -> Vec<(Mat4, &Renderable)> {
        self.root.flatten(self.world_transform())
    }

    pub fn tick(&mut self, dt: f32) {
        self.motion.tick(dt);
    }
}
