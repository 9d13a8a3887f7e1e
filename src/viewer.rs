// viewer.rs — 查看器上下文：配置、相机控制器、模型槽与加载任务

use std::path::PathBuf;

use image::RgbaImage;

use crate::camera::{aspect_ratio, CameraViewController, TransitionPolicy};
use crate::config::{ProductConfig, Rgb, ViewerConfig};
use crate::error::{Result, ViewerError};
use crate::loader::{self, LoadHandle, SkyboxImages};
use crate::scene::{ModelGroup, SceneNode};

pub enum ModelState {
    Loading(LoadHandle<SceneNode>),
    Ready(ModelGroup),
    Failed(String),
}

pub struct ModelSlot {
    pub config: ProductConfig,
    pub state: ModelState,
    screen: Option<LoadHandle<RgbaImage>>,
}

impl ModelSlot {
    pub fn model(&self) -> Option<&ModelGroup> {
        match &self.state {
            ModelState::Ready(group) => Some(group),
            _ => None,
        }
    }

    fn model_mut(&mut self) -> Option<&mut ModelGroup> {
        match &mut self.state {
            ModelState::Ready(group) => Some(group),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ModelState::Loading(_))
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            ModelState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Results handed to the renderer after polling background loads.
#[derive(Default)]
pub struct LoadEvents {
    pub skybox: Option<SkyboxImages>,
    pub screens: Vec<(String, RgbaImage)>,
}

/// Everything the viewer mutates, owned in one place and driven by the event loop.
pub struct ViewerContext {
    pub config: ViewerConfig,
    pub controller: CameraViewController,
    pub models: Vec<ModelSlot>,
    skybox: Option<LoadHandle<SkyboxImages>>,
    /// Bumped whenever model geometry or textures change.
    scene_revision: u64,
    /// Last rejected view switch; load failures live on their slots.
    pub view_error: Option<String>,
    pub show_fps: bool,
    pub is_fullscreen: bool,
}

impl ViewerContext {
    pub fn new(config: ViewerConfig, width: u32, height: u32) -> Result<Self> {
        let aspect = aspect_ratio(width, height).unwrap_or(16.0 / 9.0);
        let controller = CameraViewController::new(
            config.cameras.clone(),
            config.initial_view.clone(),
            config.transition,
            aspect,
        )?;
        Ok(Self {
            config,
            controller,
            models: Vec::new(),
            skybox: None,
            scene_revision: 0,
            view_error: None,
            show_fps: false,
            is_fullscreen: false,
        })
    }

    /// Starts every configured model, screen image and skybox load.
    pub fn start_loading(&mut self) {
        self.models = self
            .config
            .products
            .iter()
            .map(|product| ModelSlot {
                config: product.clone(),
                state: ModelState::Loading(spawn_model(self.config.resolve(&product.model))),
                screen: product.screen.as_ref().map(|screen| {
                    let path = self.config.resolve(&screen.image);
                    LoadHandle::spawn(path.display().to_string(), move || loader::load_image(&path))
                }),
            })
            .collect();

        if let Some(skybox) = &self.config.skybox {
            let faces = skybox.faces.clone().map(|p| self.config.resolve(&p));
            self.skybox = Some(LoadHandle::spawn("skybox", move || loader::load_skybox(&faces)));
        }
    }

    /// Replaces one product's model with the file at `path`, cancelling a pending load.
    pub fn replace_model(&mut self, product: &str, path: PathBuf) {
        let Some(slot) = self.models.iter_mut().find(|s| s.config.key == product) else {
            log::warn!("no product {product:?} to replace");
            return;
        };
        if let ModelState::Loading(handle) = &slot.state {
            handle.cancel();
        }
        slot.config.model = path.clone();
        slot.state = ModelState::Loading(spawn_model(path));
        self.scene_revision += 1;
    }

    pub fn poll_loads(&mut self) -> LoadEvents {
        let mut events = LoadEvents::default();

        for slot in &mut self.models {
            if let ModelState::Loading(handle) = &mut slot.state {
                match handle.poll() {
                    None => {}
                    Some(Ok(root)) => {
                        slot.state = ModelState::Ready(ModelGroup::new(&slot.config, root));
                        self.scene_revision += 1;
                    }
                    Some(Err(err)) => {
                        // 句柄已结束，槽位不能停留在 Loading
                        if matches!(err, ViewerError::Cancelled) {
                            log::debug!("{}: {err}", slot.config.key);
                        } else {
                            log::warn!("{}: {err}", slot.config.key);
                        }
                        slot.state = ModelState::Failed(err.to_string());
                        self.scene_revision += 1;
                    }
                }
            }

            if let Some(handle) = slot.screen.as_mut() {
                match handle.poll() {
                    None => {}
                    Some(Ok(img)) => {
                        events.screens.push((slot.config.key.clone(), img));
                        slot.screen = None;
                    }
                    Some(Err(err)) => {
                        log::warn!("{}: screen image {}: {err}", slot.config.key, handle.label());
                        slot.screen = None;
                    }
                }
            }
        }

        if let Some(handle) = self.skybox.as_mut() {
            match handle.poll() {
                None => {}
                Some(Ok(images)) => {
                    events.skybox = Some(images);
                    self.skybox = None;
                }
                Some(Err(err)) => {
                    // 天空盒失败时退回纯色背景
                    log::warn!("skybox: {err}, using background color");
                    self.skybox = None;
                }
            }
        }
        events
    }

    /// One render tick.
    pub fn tick(&mut self, dt: f32) {
        self.controller.tick(dt);
        for slot in &mut self.models {
            if let Some(model) = slot.model_mut() {
                model.tick(dt);
            }
        }
    }

    pub fn switch_view(&mut self, product: &str, view: &str) {
        // 失败已在控制器里记录日志，这里只更新状态栏
        self.view_error = self.controller.switch_to(product, view).err().map(|e| e.to_string());
    }

    pub fn reset_view(&mut self) {
        self.view_error = self.controller.reset().err().map(|e| e.to_string());
    }

    /// First model load failure, for the status bar.
    pub fn load_error(&self) -> Option<&str> {
        self.models.iter().find_map(ModelSlot::failure)
    }

    pub fn set_policy(&mut self, policy: TransitionPolicy) {
        self.controller.set_default_policy(policy);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(aspect) = aspect_ratio(width, height) {
            let report = self.controller.resize(aspect);
            log::debug!("resized to {width}x{height}: {} cameras updated", report.updated);
        }
    }

    pub fn set_tint(&mut self, product: &str, color: Rgb) {
        if let Some(model) = self.model_mut(product) {
            model.apply_tint(color);
        }
    }

    pub fn toggle_flip(&mut self, product: &str) {
        if let Some(model) = self.model_mut(product) {
            model.motion.toggle_flip();
        }
    }

    pub fn toggle_spin(&mut self, product: &str) {
        if let Some(model) = self.model_mut(product) {
            model.motion.toggle_spin();
        }
    }

    fn model_mut(&mut self, product: &str) -> Option<&mut ModelGroup> {
        self.models
            .iter_mut()
            .find(|s| s.config.key == product)
            .and_then(ModelSlot::model_mut)
    }

    pub fn ready_models(&self) -> impl Iterator<Item = &ModelGroup> {
        self.models.iter().filter_map(ModelSlot::model)
    }

    pub fn is_loading(&self) -> bool {
        self.models.iter().any(ModelSlot::is_loading) || self.skybox.is_some()
    }

    pub fn scene_revision(&self) -> u64 {
        self.scene_revision
    }

    #[cfg(test)]
    pub fn insert_model(&mut self, config: ProductConfig, root: SceneNode) {
        let group = ModelGroup::new(&config, root);
        match self.models.iter_mut().find(|s| s.config.key == config.key) {
            Some(slot) => slot.state = ModelState::Ready(group),
            None => self.models.push(ModelSlot {
                config,
                state: ModelState::Ready(group),
                screen: None,
            }),
        }
        self.scene_revision += 1;
    }
}

fn spawn_model(path: PathBuf) -> LoadHandle<SceneNode> {
    LoadHandle::spawn(path.display().to_string(), move || loader::load_model(&path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_plane;
    use crate::scene::{Material, Renderable};
    use glam::Mat4;
    use std::time::{Duration, Instant};

    fn context() -> ViewerContext {
        ViewerContext::new(ViewerConfig::default(), 1280, 720).unwrap()
    }

    fn plane_node() -> SceneNode {
        SceneNode::mesh(
            Some("Body".into()),
            Mat4::IDENTITY,
            Renderable {
                mesh: build_plane(1.0),
                material: Material::default(),
            },
        )
    }

    fn settle(ctx: &mut ViewerContext) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while ctx.is_loading() {
            assert!(Instant::now() < deadline, "load never finished");
            let _ = ctx.poll_loads();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn bad_view_sets_status_and_keeps_camera() {
        let mut ctx = context();
        let before = *ctx.controller.active_camera();
        ctx.switch_view("main", "back");
        assert!(ctx.view_error.as_deref().unwrap_or_default().contains("main/back"));
        assert_eq!(*ctx.controller.active_camera(), before);

        ctx.switch_view("main", "zoom");
        assert!(ctx.view_error.is_none());
    }

    #[test]
    fn tint_and_flip_reach_loaded_model() {
        let mut ctx = context();
        let product = ProductConfig::default();
        ctx.insert_model(product.clone(), plane_node());
        let rev = ctx.scene_revision();

        ctx.set_tint(&product.key, Rgb([0, 0, 255]));
        ctx.toggle_flip(&product.key);
        for _ in 0..90 {
            ctx.tick(1.0 / 60.0);
        }
        let model = ctx.ready_models().next().unwrap();
        assert_eq!(model.tint(), Rgb([0, 0, 255]));
        assert!(model.motion.is_flipped());
        assert!(!model.motion.is_flipping());
        // 染色不需要重新上传几何
        assert_eq!(ctx.scene_revision(), rev);
    }

    #[test]
    fn missing_model_file_becomes_failed_slot() {
        let dir = tempfile::tempdir().unwrap();
        let config = ViewerConfig {
            skybox: None,
            products: vec![ProductConfig {
                model: PathBuf::from("missing.glb"),
                ..ProductConfig::default()
            }],
            base_dir: dir.path().to_path_buf(),
            ..ViewerConfig::default()
        };
        let mut ctx = ViewerContext::new(config, 800, 600).unwrap();
        ctx.start_loading();
        assert!(ctx.is_loading());

        settle(&mut ctx);
        assert!(matches!(ctx.models[0].state, ModelState::Failed(_)));
        assert!(ctx.load_error().unwrap_or_default().contains("missing.glb"));
        assert_eq!(ctx.ready_models().count(), 0);

        // 切换视角不会抹掉加载失败
        ctx.switch_view("main", "zoom");
        assert!(ctx.view_error.is_none());
        assert!(ctx.load_error().is_some());
    }

    #[test]
    fn dead_loader_thread_fails_the_slot() {
        let mut ctx = context();
        ctx.models.push(ModelSlot {
            config: ProductConfig::default(),
            state: ModelState::Loading(LoadHandle::spawn("boom", || panic!("loader crashed"))),
            screen: None,
        });
        settle(&mut ctx);
        assert!(!ctx.is_loading());
        assert!(ctx.models[0].failure().unwrap_or_default().contains("boom"));
        assert!(ctx.load_error().is_some());
    }

    #[test]
    fn resize_updates_active_projection() {
        let mut ctx = context();
        ctx.switch_view("main", "top");
        ctx.resize(1000, 500);
        let resized = ctx.controller.active_camera().projection;
        assert!(matches!(
            resized,
            crate::camera::Projection::Orthographic { right, .. } if (right - 10.0).abs() < 1e-5
        ));
        // 最小化窗口不改变任何东西
        ctx.resize(0, 0);
        assert_eq!(ctx.controller.active_camera().projection, resized);
    }
}
