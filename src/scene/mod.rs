// scene/mod.rs — 场景图、模型组与翻转 / 自转

mod model;
mod motion;
mod node;

pub use model::ModelGroup;
pub use node::{Material, Renderable, SceneNode};
