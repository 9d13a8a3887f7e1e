// loader.rs — 后台加载：glTF 模型、天空盒六面图、屏幕贴图

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use glam::Mat4;
use image::RgbaImage;

use crate::error::{Result, ViewerError};
use crate::mesh::MeshData;
use crate::scene::{Material, Renderable, SceneNode};

/// Handle to a single background load.
///
/// `poll` is non-blocking; a cancelled handle never yields a result.
pub struct LoadHandle<T> {
    label: String,
    rx: Receiver<Result<T>>,
    cancelled: Arc<AtomicBool>,
    done: bool,
}

impl<T: Send + 'static> LoadHandle<T> {
    pub fn spawn(label: impl Into<String>, job: impl FnOnce() -> Result<T> + Send + 'static) -> Self {
        let label = label.into();
        let (tx, rx) = channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let thread_label = label.clone();

        thread::spawn(move || {
            log::info!("loading {thread_label} in background");
            let result = job();
            if flag.load(Ordering::Acquire) {
                log::debug!("{thread_label}: result dropped, load was cancelled");
                return;
            }
            if tx.send(result).is_err() {
                log::debug!("{thread_label}: receiver gone");
            }
        });

        Self {
            label,
            rx,
            cancelled,
            done: false,
        }
    }
}

impl<T> LoadHandle<T> {
    /// `None` while pending (or after the result was taken / cancelled).
    /// `Cancelled` only follows an explicit `cancel`; a worker that died
    /// without sending reports `LoadAborted`.
    pub fn poll(&mut self) -> Option<Result<T>> {
        if self.done {
            return None;
        }
        if self.cancelled.load(Ordering::Acquire) {
            self.done = true;
            return Some(Err(ViewerError::Cancelled));
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.done = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // 线程异常退出（panic），没有发送结果
                self.done = true;
                Some(Err(ViewerError::LoadAborted(self.label.clone())))
            }
        }
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            log::info!("cancelled load of {}", self.label);
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

pub fn load_model(path: &Path) -> Result<SceneNode> {
    let (document, buffers, _images) = gltf::import(path).map_err(|source| ViewerError::ModelLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let scene = document.default_scene().or_else(|| document.scenes().next());
    let children = match scene {
        Some(scene) => scene
            .nodes()
            .map(|node| convert_node(&node, &buffers))
            .collect(),
        None => {
            log::warn!("{}: no scenes in file", path.display());
            Vec::new()
        }
    };

    let root = SceneNode::group(
        path.file_stem().map(|s| s.to_string_lossy().into_owned()),
        Mat4::IDENTITY,
        children,
    );
    log::info!(
        "loaded {} ({} meshes)",
        path.display(),
        root.renderable_count()
    );
    Ok(root)
}

fn convert_node(node: &gltf::Node<'_>, buffers: &[gltf::buffer::Data]) -> SceneNode {
    let name = node.name().map(str::to_owned);
    let transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    let mut children: Vec<SceneNode> = node
        .children()
        .map(|child| convert_node(&child, buffers))
        .collect();

    let Some(mesh) = node.mesh() else {
        return SceneNode::group(name, transform, children);
    };

    let mut primitives: Vec<Renderable> = mesh
        .primitives()
        .filter_map(|p| convert_primitive(&p, buffers))
        .collect();

    // 单图元直接挂在节点上；多图元拆成同名子节点
    if primitives.len() == 1 && children.is_empty() {
        if let Some(renderable) = primitives.pop() {
            return SceneNode::mesh(name, transform, renderable);
        }
    }
    for renderable in primitives {
        children.push(SceneNode::mesh(name.clone(), Mat4::IDENTITY, renderable));
    }
    SceneNode::group(name, transform, children)
}

fn convert_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<Renderable> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::debug!("skipping non-triangle primitive {:?}", primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();

    let mut mesh = MeshData {
        positions,
        normals: reader.read_normals().map(|n| n.collect()).unwrap_or_default(),
        uvs: reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().collect())
            .unwrap_or_default(),
        indices: reader
            .read_indices()
            .map(|i| i.into_u32().collect())
            .unwrap_or_default(),
    };
    mesh.ensure_indices();
    if mesh.normals.len() != mesh.positions.len() {
        mesh.compute_normals();
    }

    let base_color = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();
    Some(Renderable {
        mesh,
        material: Material {
            base_color,
            screen_texture: false,
        },
    })
}

pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|source| ViewerError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// Six square faces in cube order px, nx, py, ny, pz, nz.
pub struct SkyboxImages {
    pub size: u32,
    pub faces: Vec<RgbaImage>,
}

pub fn load_skybox(paths: &[PathBuf; 6]) -> Result<SkyboxImages> {
    let mut faces = Vec::with_capacity(6);
    for path in paths {
        faces.push(load_image(path)?);
    }
    Ok(normalize_faces(faces))
}

/// 所有面缩放到第一面的正方形尺寸
fn normalize_faces(faces: Vec<RgbaImage>) -> SkyboxImages {
    let size = faces
        .first()
        .map(|f| f.width().min(f.height()))
        .unwrap_or(1)
        .max(1);
    let faces = faces
        .into_iter()
        .enumerate()
        .map(|(i, face)| {
            if face.dimensions() == (size, size) {
                face
            } else {
                log::warn!(
                    "skybox face {i} is {}x{}, resizing to {size}x{size}",
                    face.width(),
                    face.height()
                );
                image::imageops::resize(&face, size, size, image::imageops::FilterType::Triangle)
            }
        })
        .collect();
    SkyboxImages { size, faces }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait<T>(handle: &mut LoadHandle<T>) -> Result<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = handle.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "load timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn missing_model_reports_error() {
        let mut handle = LoadHandle::spawn("missing", || {
            load_model(Path::new("does/not/exist.glb"))
        });
        assert!(matches!(wait(&mut handle), Err(ViewerError::ModelLoad { .. })));
        assert!(handle.poll().is_none());
    }

    #[test]
    fn cancelled_handle_never_yields_a_value() {
        let (gate_tx, gate_rx) = channel::<()>();
        let mut handle = LoadHandle::spawn("gated", move || {
            let _ = gate_rx.recv();
            Ok(42)
        });
        handle.cancel();
        let _ = gate_tx.send(());
        assert!(matches!(handle.poll(), Some(Err(ViewerError::Cancelled))));
        assert!(handle.poll().is_none());
    }

    #[test]
    fn panicking_job_reports_aborted_load() {
        let mut handle: LoadHandle<u32> = LoadHandle::spawn("boom", || panic!("decoder exploded"));
        match wait(&mut handle) {
            Err(ViewerError::LoadAborted(label)) => assert_eq!(label, "boom"),
            other => panic!("expected LoadAborted, got {:?}", other.map(|_| ())),
        }
        assert!(handle.poll().is_none());
    }

    #[test]
    fn successful_job_is_delivered_once() {
        let mut handle = LoadHandle::spawn("value", || Ok("ready"));
        assert_eq!(wait(&mut handle).unwrap(), "ready");
        assert!(handle.poll().is_none());
    }

    #[test]
    fn skybox_faces_are_resized_to_first() {
        let faces = vec![
            RgbaImage::new(8, 8),
            RgbaImage::new(8, 8),
            RgbaImage::new(16, 16),
            RgbaImage::new(8, 4),
            RgbaImage::new(8, 8),
            RgbaImage::new(8, 8),
        ];
        let sky = normalize_faces(faces);
        assert_eq!(sky.size, 8);
        assert!(sky.faces.iter().all(|f| f.dimensions() == (8, 8)));
    }

    #[test]
    fn images_decode_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        let img = load_image(&path).unwrap();
        assert_eq!(img.get_pixel(1, 1).0, [10, 20, 30, 255]);
        assert!(matches!(
            load_image(&dir.path().join("nope.png")),
            Err(ViewerError::ImageLoad { .. })
        ));
    }
}
