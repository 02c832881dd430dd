//! Point-light volume geometry.
//!
//! A unit sphere (radius 1, centered at the origin) scaled and translated
//! per light. Triangles wind counter-clockwise seen from outside.

use std::f32::consts::{PI, TAU};

use wgpu::util::DeviceExt;

/// CPU-side indexed triangle mesh of a light volume.
#[derive(Debug, Clone, PartialEq)]
pub struct LightVolumeMesh {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Triangle list indices into `positions`.
    pub indices: Vec<u32>,
}

impl LightVolumeMesh {
    /// UV sphere with `rings` latitude bands and `segments` longitude
    /// slices. Values below 3 are raised to 3.
    #[must_use]
    pub fn unit_sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(3);
        let segments = segments.max(3);
        let stride = segments + 1;

        let mut positions = Vec::with_capacity(((rings + 1) * stride) as usize);
        for r in 0..=rings {
            let theta = PI * r as f32 / rings as f32;
            let (sin_t, cos_t) = theta.sin_cos();
            for s in 0..=segments {
                let phi = TAU * s as f32 / segments as f32;
                let (sin_p, cos_p) = phi.sin_cos();
                positions.push([sin_t * cos_p, cos_t, sin_t * sin_p]);
            }
        }

        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                let c = a + 1;
                let d = b + 1;
                // The top band's first triangle and the bottom band's
                // second collapse onto a pole.
                if r != 0 {
                    indices.extend_from_slice(&[a, c, b]);
                }
                if r != rings - 1 {
                    indices.extend_from_slice(&[c, d, b]);
                }
            }
        }

        Self { positions, indices }
    }
}

impl Default for LightVolumeMesh {
    fn default() -> Self {
        Self::unit_sphere(12, 16)
    }
}

/// GPU buffers of the active light volume.
pub struct LightVolume {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl LightVolume {
    /// Upload `mesh`.
    #[must_use]
    pub fn new(device: &wgpu::Device, mesh: &LightVolumeMesh) -> Self {
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Light Volume Vertices"),
                contents: bytemuck::cast_slice(&mesh.positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Light Volume Indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    /// Vertex layout: one `vec3<f32>` position at location 0.
    pub const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> =
        wgpu::VertexBufferLayout {
            array_stride: size_of::<[f32; 3]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
        };

    /// Bind the mesh buffers on `pass`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(
            self.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
    }

    /// Number of indices to draw.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn triangles(mesh: &LightVolumeMesh) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        mesh.indices.chunks_exact(3).map(|tri| {
            [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.positions[i as usize]))
        })
    }

    #[test]
    fn vertices_lie_on_unit_sphere() {
        let mesh = LightVolumeMesh::unit_sphere(8, 12);
        for p in &mesh.positions {
            assert!((Vec3::from_array(*p).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn triangles_wind_counter_clockwise_from_outside() {
        let mesh = LightVolumeMesh::default();
        for [a, b, c] in triangles(&mesh) {
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(
                normal.dot(centroid) > 0.0,
                "inward-facing triangle {a} {b} {c}"
            );
        }
    }

    #[test]
    fn no_degenerate_triangles() {
        let mesh = LightVolumeMesh::unit_sphere(6, 8);
        for [a, b, c] in triangles(&mesh) {
            assert!((b - a).cross(c - a).length() > 1e-6);
        }
    }

    #[test]
    fn index_count_matches_band_layout() {
        let mesh = LightVolumeMesh::unit_sphere(4, 6);
        // Pole bands contribute one triangle per segment, inner bands two.
        assert_eq!(mesh.indices.len(), (2 * 6 + 2 * 2 * 6) * 3);
        assert!(mesh
            .indices
            .iter()
            .all(|&i| (i as usize) < mesh.positions.len()));
    }

    #[test]
    fn tiny_requests_are_raised_to_minimum() {
        let mesh = LightVolumeMesh::unit_sphere(0, 1);
        assert_eq!(mesh.positions.len(), 4 * 4);
    }
}
