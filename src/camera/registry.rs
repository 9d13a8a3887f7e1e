// registry.rs — (product, view) → 实时相机

use std::collections::HashMap;

use super::core::Camera;
use super::preset::{CameraPreset, ViewKey};
use crate::error::{Result, ViewerError};

#[derive(Debug, Clone)]
pub struct RegisteredCamera {
    pub preset: CameraPreset,
    pub camera: Camera,
}

/// Live cameras, exactly one per preset.
#[derive(Debug, Clone, Default)]
pub struct CameraRegistry {
    entries: HashMap<ViewKey, RegisteredCamera>,
}

impl CameraRegistry {
    /// Creates one live camera per preset. A key appearing twice is rejected.
    pub fn from_presets<'a>(
        presets: impl IntoIterator<Item = &'a CameraPreset>,
        aspect: f32,
    ) -> Result<Self> {
        let mut entries = HashMap::new();
        for preset in presets {
            let key = preset.key();
            if entries.contains_key(&key) {
                return Err(ViewerError::DuplicatePreset(key));
            }
            let camera = Camera::from_preset(preset, aspect);
            entries.insert(
                key,
                RegisteredCamera {
                    preset: preset.clone(),
                    camera,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &ViewKey) -> Option<&RegisteredCamera> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &ViewKey) -> Option<&mut RegisteredCamera> {
        self.entries.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 排序后的键，供面板稳定显示
    pub fn keys(&self) -> Vec<ViewKey> {
        let mut keys: Vec<_> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn one_camera_per_preset() {
        let presets = [
            CameraPreset::perspective("main", "main", Vec3::new(1.5, 1.0, 2.0), Vec3::Y, 45.0),
            CameraPreset::orthographic("main", "top", Vec3::new(0.0, 1.5, 0.0), Vec3::ZERO),
        ];
        let registry = CameraRegistry::from_presets(&presets, 1.0).unwrap();
        assert_eq!(registry.len(), 2);
        let top = registry.get(&ViewKey::new("main", "top")).unwrap();
        assert_eq!(top.camera.eye, Vec3::new(0.0, 1.5, 0.0));
        assert!(top.camera.projection.is_orthographic());
        assert_eq!(
            registry.keys(),
            vec![ViewKey::new("main", "main"), ViewKey::new("main", "top")]
        );
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let presets = [
            CameraPreset::perspective("iPhone", "main", Vec3::ONE, Vec3::ZERO, 45.0),
            CameraPreset::perspective("iPhone", "main", Vec3::X, Vec3::ZERO, 50.0),
        ];
        let err = CameraRegistry::from_presets(&presets, 1.0).unwrap_err();
        assert!(matches!(err, ViewerError::DuplicatePreset(k) if k == ViewKey::new("iPhone", "main")));
    }
}
