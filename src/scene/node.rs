// node.rs — 场景图节点（带标签的变体）

use glam::Mat4;

use crate::mesh::MeshData;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Linear RGBA.
    pub base_color: [f32; 4],
    /// 使用屏幕贴图（视频纹理的静态替代）
    pub screen_texture: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            screen_texture: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub mesh: MeshData,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(Renderable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: Mat4,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: Option<String>, transform: Mat4, children: Vec<SceneNode>) -> Self {
        Self {
            name,
            transform,
            kind: NodeKind::Group,
            children,
        }
    }

    pub fn mesh(name: Option<String>, transform: Mat4, renderable: Renderable) -> Self {
        Self {
            name,
            transform,
            kind: NodeKind::Mesh(renderable),
            children: Vec::new(),
        }
    }

    pub fn as_renderable(&self) -> Option<&Renderable> {
        match &self.kind {
            NodeKind::Mesh(r) => Some(r),
            NodeKind::Group => None,
        }
    }

    /// Depth-first visit of every renderable together with its node name.
    pub fn for_each_renderable_mut(&mut self, f: &mut impl FnMut(Option<&str>, &mut Renderable)) {
        let name = self.name.as_deref();
        if let NodeKind::Mesh(r) = &mut self.kind {
            f(name, r);
        }
        for child in &mut self.children {
            child.for_each_renderable_mut(f);
        }
    }

    /// World transforms of every renderable, depth-first.
    pub fn flatten(&self, parent: Mat4) -> Vec<(Mat4, &Renderable)> {
        let mut out = Vec::new();
        self.flatten_into(parent, &mut out);
        out
    }

    fn flatten_into<'a>(&'a self, parent: Mat4, out: &mut Vec<(Mat4, &'a Renderable)>) {
        let world = parent * self.transform;
        if let Some(r) = self.as_renderable() {
            out.push((world, r));
        }
        for child in &self.children {
            child.flatten_into(world, out);
        }
    }

    pub fn renderable_count(&self) -> usize {
        usize::from(self.as_renderable().is_some())
            + self.children.iter().map(SceneNode::renderable_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn quad() -> Renderable {
        Renderable {
            mesh: crate::mesh::build_plane(1.0),
            material: Material::default(),
        }
    }

    fn tree() -> SceneNode {
        SceneNode::group(
            Some("root".into()),
            Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            vec![
                SceneNode::mesh(Some("Body".into()), Mat4::IDENTITY, quad()),
                SceneNode::group(
                    None,
                    Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)),
                    vec![SceneNode::mesh(Some("Screen".into()), Mat4::IDENTITY, quad())],
                ),
            ],
        )
    }

    #[test]
    fn only_mesh_nodes_are_renderable() {
        let root = tree();
        assert!(root.as_renderable().is_none());
        assert!(root.children[0].as_renderable().is_some());
        assert!(root.children[1].as_renderable().is_none());
        assert_eq!(root.renderable_count(), 2);
    }

    #[test]
    fn flatten_composes_parent_transforms() {
        let root = tree();
        let flat = root.flatten(Mat4::IDENTITY);
        assert_eq!(flat.len(), 2);
        let screen_origin = flat[1].0.transform_point3(Vec3::ZERO);
        assert!((screen_origin - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn visitor_sees_names() {
        let mut root = tree();
        let mut names = Vec::new();
        root.for_each_renderable_mut(&mut |name, _| names.push(name.map(str::to_owned)));
        assert_eq!(names, vec![Some("Body".to_owned()), Some("Screen".to_owned())]);
    }
}
