// config.rs — 查看器配置：产品、相机预设、天空盒与地面
//
// 配置文件查找顺序：
// - CLI: --config <path>
// - Env: PRODUCT_VIEWER_CONFIG
// - <exe_dir>/assets/viewer.json
// - ./assets/viewer.json
// 都没有时使用内置默认配置。相对资源路径以配置文件所在目录为基准。

use std::f32::consts::{FRAC_PI_2, PI};
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraPreset, ProjectionKind, TransitionSettings, ViewKey, MAIN_PRODUCT};
use crate::error::{Result, ViewerError};

pub const CONFIG_FILE: &str = "viewer.json";
pub const CONFIG_ENV: &str = "PRODUCT_VIEWER_CONFIG";

/// sRGB color written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || ViewerError::InvalidColor(s.to_owned());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let mut out = [0u8; 3];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Rgb(out))
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    pub fn to_linear(self) -> [f32; 3] {
        self.0.map(|c| srgb_to_linear(c as f32 / 255.0))
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ViewerError;

    fn try_from(value: String) -> Result<Self> {
        Rgb::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Still image shown on the screen meshes.
    pub image: PathBuf,
    /// 必须与模型内部节点名完全一致
    pub mesh_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    pub key: String,
    pub model: PathBuf,
    pub scale: f32,
    /// Euler XYZ, radians.
    pub rotation: Vec3,
    pub position: Vec3,
    pub color: Rgb,
    pub flip: bool,
    pub spin: bool,
    pub screen: Option<ScreenConfig>,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            key: "iPhone".to_owned(),
            model: PathBuf::from("models/phone/iphone_mini.glb"),
            scale: 2.0,
            // 让手机立起来，再绕 Y 转 180° 修正朝向
            rotation: Vec3::new(-FRAC_PI_2, PI, 0.0),
            position: Vec3::new(0.0, 1.0, 0.0),
            color: Rgb([0xff, 0x00, 0x00]),
            flip: false,
            spin: false,
            screen: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyboxConfig {
    /// px, nx, py, ny, pz, nz
    pub faces: [PathBuf; 6],
}

impl Default for SkyboxConfig {
    fn default() -> Self {
        let face = |name: &str| PathBuf::from("textures/skybox").join(format!("{name}.png"));
        Self {
            faces: [
                face("px"),
                face("nx"),
                face("py"),
                face("ny"),
                face("pz"),
                face("nz"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    pub size: f32,
    pub color: Rgb,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            size: 10.0,
            color: Rgb([0xcc, 0xcc, 0xcc]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub ambient: f32,
    pub directional: f32,
    pub direction_from: Vec3,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            ambient: 0.5,
            directional: 1.0,
            direction_from: Vec3::new(5.0, 5.0, 5.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub title: String,
    pub background: Rgb,
    pub skybox: Option<SkyboxConfig>,
    pub floor: Option<FloorConfig>,
    pub light: LightConfig,
    pub transition: TransitionSettings,
    pub initial_view: ViewKey,
    pub products: Vec<ProductConfig>,
    pub cameras: Vec<CameraPreset>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let look_at = Vec3::new(0.0, 1.0, 0.0);
        Self {
            title: "Product Viewer".to_owned(),
            background: Rgb([0xee, 0xee, 0xee]),
            skybox: Some(SkyboxConfig::default()),
            floor: None,
            light: LightConfig::default(),
            transition: TransitionSettings::default(),
            initial_view: ViewKey::new(MAIN_PRODUCT, "main"),
            products: vec![ProductConfig::default()],
            cameras: vec![
                CameraPreset::perspective(MAIN_PRODUCT, "main", Vec3::new(1.5, 1.0, 2.0), look_at, 45.0),
                CameraPreset::perspective(MAIN_PRODUCT, "zoom", Vec3::new(1.0, 0.5, 1.0), look_at, 50.0),
                CameraPreset::orthographic(MAIN_PRODUCT, "top", Vec3::new(0.0, 1.5, 0.0), Vec3::ZERO),
            ],
            base_dir: PathBuf::from("."),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ViewerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: ViewerConfig =
            serde_json::from_str(&text).map_err(|source| ViewerError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.validate()?;
        Ok(config)
    }

    /// Rejects duplicate presets, unusable projections and an initial view without a preset.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for preset in &self.cameras {
            if !seen.insert(preset.key()) {
                return Err(ViewerError::DuplicatePreset(preset.key()));
            }
            let usable = match preset.projection {
                ProjectionKind::Perspective { fov } => fov > 0.0 && fov < 180.0,
                ProjectionKind::Orthographic { half_extent } => {
                    half_extent.is_finite() && half_extent > 0.0
                }
            };
            if !usable {
                return Err(ViewerError::InvalidProjection(preset.key()));
            }
        }
        if !seen.contains(&self.initial_view) {
            return Err(ViewerError::UnknownInitialView(self.initial_view.clone()));
        }
        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join(CONFIG_FILE);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join(CONFIG_FILE);
    if p.exists() {
        return Some(p);
    }

    None
}

/// Config path from `--config <path>`, then the environment, then the asset directories.
pub fn resolve_config_path(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    while let Some(a) = args.next() {
        if a == "--config" {
            if let Some(v) = args.next() {
                return Some(PathBuf::from(v));
            }
        }
    }

    if let Ok(v) = std::env::var(CONFIG_ENV) {
        if !v.trim().is_empty() {
            return Some(PathBuf::from(v));
        }
    }

    find_config_file()
}

/// Loads the resolved config, or the built-in default when none is found.
pub fn load_from_args() -> Result<ViewerConfig> {
    match resolve_config_path(std::env::args()) {
        Some(path) => {
            log::info!("loading config {}", path.display());
            ViewerConfig::load(&path)
        }
        None => {
            log::info!("no {CONFIG_FILE} found, using built-in defaults");
            let config = ViewerConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn colors_parse_and_print() {
        assert_eq!(Rgb::parse("#ff0000").unwrap(), Rgb([255, 0, 0]));
        assert_eq!(Rgb::parse("#EEeeEE").unwrap().to_hex(), "#eeeeee");
        for bad in ["ff0000", "#ff00", "#gg0000", "#ff00000", "#ééé"] {
            assert!(matches!(Rgb::parse(bad), Err(ViewerError::InvalidColor(_))), "{bad}");
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = ViewerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.cameras.len(), 3);
        assert!(matches!(
            config.cameras[2].projection,
            ProjectionKind::Orthographic { .. }
        ));
    }

    #[test]
    fn loads_file_and_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r##"{{
                "title": "Two phones",
                "initial_view": {{ "product": "iPhone", "view": "main" }},
                "products": [
                    {{ "key": "iPhone", "model": "models/a.glb", "color": "#3366ff", "flip": true }},
                    {{ "key": "Pixel", "model": "/abs/b.glb", "position": [1.0, 1.0, 0.0], "spin": true }}
                ],
                "cameras": [
                    {{ "product": "iPhone", "view": "main", "position": [-1, 1.5, 5], "look_at": [0, 1, 0],
                       "projection": {{ "kind": "perspective", "fov": 45 }} }},
                    {{ "product": "iPhone", "view": "top", "position": [0, 2.5, 0], "look_at": [0, 1, 0],
                       "projection": {{ "kind": "orthographic", "half_extent": 4 }} }}
                ]
            }}"##
        )
        .unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.title, "Two phones");
        assert_eq!(config.products.len(), 2);
        let product = |key: &str| config.products.iter().find(|p| p.key == key).unwrap();
        let iphone = product("iPhone");
        assert_eq!(iphone.color, Rgb([0x33, 0x66, 0xff]));
        assert!(iphone.flip);
        // 未写的字段取默认值
        assert_eq!(iphone.scale, 2.0);
        assert_eq!(config.resolve(&iphone.model), dir.path().join("models/a.glb"));
        assert_eq!(
            config.resolve(&product("Pixel").model),
            PathBuf::from("/abs/b.glb")
        );
        assert_eq!(config.transition, TransitionSettings::default());
    }

    #[test]
    fn duplicate_presets_are_rejected() {
        let mut config = ViewerConfig::default();
        config.cameras.push(config.cameras[0].clone());
        assert!(matches!(config.validate(), Err(ViewerError::DuplicatePreset(_))));
    }

    #[test]
    fn unknown_initial_view_is_rejected() {
        let config = ViewerConfig {
            initial_view: ViewKey::new("iPhone", "back"),
            ..ViewerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ViewerError::UnknownInitialView(_))));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "background": "red" }"#).unwrap();
        assert!(matches!(ViewerConfig::load(&path), Err(ViewerError::ConfigParse { .. })));
        assert!(matches!(
            ViewerConfig::load(&dir.path().join("missing.json")),
            Err(ViewerError::ConfigRead { .. })
        ));
    }

    #[test]
    fn cli_flag_wins() {
        let args = ["viewer", "--config", "custom.json"].map(String::from);
        assert_eq!(
            resolve_config_path(args.into_iter()),
            Some(PathBuf::from("custom.json"))
        );
    }

    #[test]
    fn bundled_config_parses() {
        let config: ViewerConfig =
            serde_json::from_str(include_str!("../assets/viewer.json")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.products.len(), 2);
        assert_eq!(config.cameras.len(), 5);
        assert!(config.products[0].screen.is_some());
    }

    #[test]
    fn degenerate_projections_are_rejected() {
        let mut config = ViewerConfig::default();
        config.cameras[0].projection = ProjectionKind::Perspective { fov: 0.0 };
        assert!(matches!(config.validate(), Err(ViewerError::InvalidProjection(_))));

        let mut config = ViewerConfig::default();
        config.cameras[2].projection = ProjectionKind::Orthographic { half_extent: -1.0 };
        assert!(matches!(config.validate(), Err(ViewerError::InvalidProjection(k)) if k.view == "top"));
    }
}
