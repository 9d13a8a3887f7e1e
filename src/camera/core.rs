// core.rs — 相机状态与矩阵

use glam::{Mat4, Vec3};

use super::preset::{CameraPreset, ProjectionKind};

/// 俯视正交相机的 up 向量，保证画面不镜像
pub const TOP_DOWN_UP: Vec3 = Vec3::NEG_Z;

pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in degrees.
        fovy: f32,
        aspect: f32,
    },
    Orthographic {
        half_extent: f32,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
    },
}

impl Projection {
    pub fn from_kind(kind: ProjectionKind, aspect: f32) -> Self {
        let mut projection = match kind {
            ProjectionKind::Perspective { fov } => Projection::Perspective { fovy: fov, aspect },
            ProjectionKind::Orthographic { half_extent } => Projection::Orthographic {
                half_extent,
                left: 0.0,
                right: 0.0,
                top: 0.0,
                bottom: 0.0,
            },
        };
        projection.set_aspect(aspect);
        projection
    }

    /// 透视相机更新 aspect；正交相机按垂直半高重新推导四个边界
    pub fn set_aspect(&mut self, new_aspect: f32) {
        match self {
            Projection::Perspective { aspect, .. } => *aspect = new_aspect,
            Projection::Orthographic {
                half_extent,
                left,
                right,
                top,
                bottom,
            } => {
                *left = -*half_extent * new_aspect;
                *right = *half_extent * new_aspect;
                *top = *half_extent;
                *bottom = -*half_extent;
            }
        }
    }

    /// Scales an orthographic half extent, keeping the current aspect.
    /// Perspective projections are left alone.
    pub fn scale_half_extent(&mut self, factor: f32, min: f32, max: f32) {
        let Projection::Orthographic {
            half_extent, right, top, ..
        } = *self
        else {
            return;
        };
        let aspect = if top > 0.0 { right / top } else { 1.0 };
        *self = Projection::Orthographic {
            half_extent: (half_extent * factor).clamp(min, max),
            left: 0.0,
            right: 0.0,
            top: 0.0,
            bottom: 0.0,
        };
        self.set_aspect(aspect);
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self, Projection::Orthographic { .. })
    }

    pub fn matrix(&self) -> Mat4 {
        // *_rh 系列本身就是 wgpu 的 [0,1] 深度范围
        match *self {
            Projection::Perspective { fovy, aspect } => {
                Mat4::perspective_rh(fovy.to_radians(), aspect, Z_NEAR, Z_FAR)
            }
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                ..
            } => Mat4::orthographic_rh(left, right, bottom, top, Z_NEAR, Z_FAR),
        }
    }
}

/// A live camera: eye position, look-at point, up vector and projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Camera {
    pub fn from_preset(preset: &CameraPreset, aspect: f32) -> Self {
        let projection = Projection::from_kind(preset.projection, aspect);
        let up = if projection.is_orthographic() {
            TOP_DOWN_UP
        } else {
            Vec3::Y
        };
        Self {
            eye: preset.position,
            target: preset.look_at,
            up,
            projection,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = self.forward();
        // 视线与 up 平行时 look_at 退化，换一个轴
        let up = if forward.cross(self.up).length_squared() < 1e-8 {
            if forward.cross(TOP_DOWN_UP).length_squared() < 1e-8 {
                Vec3::X
            } else {
                TOP_DOWN_UP
            }
        } else {
            self.up
        };
        Mat4::look_at_rh(self.eye, self.target, up)
    }

    pub fn build_matrix(&self) -> Mat4 {
        self.projection.matrix() * self.view_matrix()
    }
}
