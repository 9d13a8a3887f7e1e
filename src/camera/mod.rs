// camera/mod.rs — 相机预设、注册表与视图控制器

mod controller;
mod core;
mod preset;
mod registry;
mod resize;
mod transition;

pub use controller::{CameraViewController, TransitionSettings};
pub use self::core::{Camera, Projection};
pub use preset::{CameraPreset, ProjectionKind, TransitionPolicy, ViewKey, MAIN_PRODUCT};
pub use resize::aspect_ratio;
