// mesh.rs — CPU 端网格数据与简单几何体

use glam::Vec3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshData {
    /// 交错顶点；缺失的法线 / UV 用默认值补齐
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, p)| Vertex {
                position: *p,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uv: self.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }

    /// Fills in sequential indices for non-indexed geometry.
    pub fn ensure_indices(&mut self) {
        if self.indices.is_empty() {
            self.indices = (0..self.positions.len() as u32).collect();
        }
    }

    /// Area-weighted smooth normals, used when the source has none.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= acc.len() || b >= acc.len() || c >= acc.len() {
                continue;
            }
            let pa = Vec3::from(self.positions[a]);
            let pb = Vec3::from(self.positions[b]);
            let pc = Vec3::from(self.positions[c]);
            let n = (pb - pa).cross(pc - pa);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }
        self.normals = acc
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
            .collect();
    }
}

/// Horizontal square floor of side `size`, centred at the origin, facing +Y.
pub fn build_plane(size: f32) -> MeshData {
    let h = size / 2.0;
    MeshData {
        positions: vec![[-h, 0.0, -h], [h, 0.0, -h], [h, 0.0, h], [-h, 0.0, h]],
        normals: vec![[0.0, 1.0, 0.0]; 4],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        // 逆时针朝上
        indices: vec![0, 2, 1, 0, 3, 2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_faces_up() {
        let mut plane = build_plane(10.0);
        assert_eq!(plane.positions.len(), 4);
        plane.compute_normals();
        for n in &plane.normals {
            assert!((Vec3::from(*n) - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn missing_attributes_are_defaulted() {
        let mut mesh = MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            ..Default::default()
        };
        mesh.ensure_indices();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        let v = mesh.vertices();
        assert_eq!(v.len(), 3);
        assert_eq!(v[1].uv, [0.0, 0.0]);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let mut mesh = MeshData {
            positions: vec![[0.0; 3]; 2],
            indices: vec![0, 1, 7],
            ..Default::default()
        };
        mesh.compute_normals();
        assert_eq!(mesh.normals, vec![[0.0, 1.0, 0.0]; 2]);
    }
}
