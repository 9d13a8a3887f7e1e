// resize.rs — 窗口尺寸变化时重新推导所有相机的视锥

use super::preset::{CameraPreset, ViewKey};
use super::registry::CameraRegistry;
use crate::error::ViewerError;

/// Aspect ratio for a surface size, or `None` for a zero-sized (minimized) window.
pub fn aspect_ratio(width: u32, height: u32) -> Option<f32> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(width as f32 / height as f32)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResizeReport {
    pub updated: usize,
    pub missing: Vec<ViewKey>,
}

/// Reapplies `aspect` to the camera behind every preset.
///
/// Perspective cameras take the new aspect; orthographic cameras recompute
/// left/right/top/bottom from their vertical half extent. Presets whose
/// camera is absent are logged and skipped.
pub fn apply_aspect(
    registry: &mut CameraRegistry,
    presets: &[CameraPreset],
    aspect: f32,
) -> ResizeReport {
    let mut report = ResizeReport::default();
    if !aspect.is_finite() || aspect <= 0.0 {
        log::debug!("ignoring resize with aspect {aspect}");
        return report;
    }

    for preset in presets {
        let key = preset.key();
        match registry.get_mut(&key) {
            Some(entry) => {
                entry.camera.projection.set_aspect(aspect);
                report.updated += 1;
            }
            None => {
                log::warn!("{}", ViewerError::CameraMissing(key.clone()));
                report.missing.push(key);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::core::Projection;
    use glam::Vec3;

    fn presets() -> Vec<CameraPreset> {
        vec![
            CameraPreset::perspective("main", "main", Vec3::new(1.5, 1.0, 2.0), Vec3::Y, 45.0),
            CameraPreset::perspective("main", "zoom", Vec3::new(1.0, 0.5, 1.0), Vec3::Y, 50.0),
            CameraPreset::orthographic("main", "top", Vec3::new(0.0, 1.5, 0.0), Vec3::ZERO),
        ]
    }

    fn projections(registry: &CameraRegistry) -> Vec<Projection> {
        registry
            .keys()
            .iter()
            .map(|k| registry.get(k).unwrap().camera.projection)
            .collect()
    }

    #[test]
    fn updates_perspective_and_orthographic() {
        let presets = presets();
        let mut registry = CameraRegistry::from_presets(&presets, 1.0).unwrap();
        let report = apply_aspect(&mut registry, &presets, 16.0 / 9.0);
        assert_eq!(report.updated, 3);
        assert!(report.missing.is_empty());

        let main = registry.get(&ViewKey::new("main", "main")).unwrap();
        assert!(matches!(main.camera.projection, Projection::Perspective { aspect, .. } if (aspect - 16.0 / 9.0).abs() < 1e-6));
        let top = registry.get(&ViewKey::new("main", "top")).unwrap();
        match top.camera.projection {
            Projection::Orthographic { left, right, top, bottom, .. } => {
                assert!((right - 5.0 * 16.0 / 9.0).abs() < 1e-5);
                assert!((left + 5.0 * 16.0 / 9.0).abs() < 1e-5);
                assert_eq!((top, bottom), (5.0, -5.0));
            }
            other => panic!("expected orthographic, got {other:?}"),
        }
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let presets = presets();
        let mut registry = CameraRegistry::from_presets(&presets, 1.0).unwrap();
        apply_aspect(&mut registry, &presets, 1.6);
        let once = projections(&registry);
        apply_aspect(&mut registry, &presets, 1.6);
        assert_eq!(once, projections(&registry));
    }

    #[test]
    fn missing_camera_is_reported_and_skipped() {
        let presets = presets();
        let mut registry = CameraRegistry::from_presets(&presets[..2], 1.0).unwrap();
        let report = apply_aspect(&mut registry, &presets, 2.0);
        assert_eq!(report.updated, 2);
        assert_eq!(report.missing, vec![ViewKey::new("main", "top")]);
    }

    #[test]
    fn degenerate_sizes_are_ignored() {
        assert_eq!(aspect_ratio(0, 720), None);
        assert_eq!(aspect_ratio(1280, 0), None);
        let presets = presets();
        let mut registry = CameraRegistry::from_presets(&presets, 1.5).unwrap();
        let before = projections(&registry);
        assert_eq!(apply_aspect(&mut registry, &presets, f32::NAN).updated, 0);
        assert_eq!(before, projections(&registry));
    }
}
