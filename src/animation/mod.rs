// animation/mod.rs — 缓动曲线与补间

mod easing;
mod tween;

pub use easing::Easing;
pub use tween::Tween;
