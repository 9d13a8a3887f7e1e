// preset.rs — 相机预设（只读）

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 通用视图使用的产品键
pub const MAIN_PRODUCT: &str = "main";

/// `(product, view)` pair identifying one camera preset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewKey {
    pub product: String,
    pub view: String,
}

impl ViewKey {
    pub fn new(product: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            view: view.into(),
        }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product, self.view)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Vertical field of view in degrees.
    Perspective { fov: f32 },
    /// Vertical half extent in world units.
    Orthographic {
        #[serde(default = "default_half_extent")]
        half_extent: f32,
    },
}

pub const DEFAULT_HALF_EXTENT: f32 = 5.0;

fn default_half_extent() -> f32 {
    DEFAULT_HALF_EXTENT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    Instant,
    #[default]
    Animated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPreset {
    pub product: String,
    pub view: String,
    pub position: Vec3,
    pub look_at: Vec3,
    pub projection: ProjectionKind,
    /// Overrides the controller's default policy for this view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionPolicy>,
}

impl CameraPreset {
    pub fn perspective(
        product: &str,
        view: &str,
        position: Vec3,
        look_at: Vec3,
        fov: f32,
    ) -> Self {
        Self {
            product: product.to_owned(),
            view: view.to_owned(),
            position,
            look_at,
            projection: ProjectionKind::Perspective { fov },
            transition: None,
        }
    }

    pub fn orthographic(product: &str, view: &str, position: Vec3, look_at: Vec3) -> Self {
        Self {
            product: product.to_owned(),
            view: view.to_owned(),
            position,
            look_at,
            projection: ProjectionKind::Orthographic {
                half_extent: DEFAULT_HALF_EXTENT,
            },
            transition: None,
        }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::new(self.product.clone(), self.view.clone())
    }
}
