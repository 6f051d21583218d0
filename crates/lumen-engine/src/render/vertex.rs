//! GPU-facing data layouts shared by the batches and the backends.

use bytemuck::{Pod, Zeroable};

// ── batch vertex ──────────────────────────────────────────────────────────

/// Vertex layout for quads and glyph quads (36 bytes, tightly packed):
///
///  offset  0  position  [f32; 2]   loc 0
///  offset  8  texcoord  [f32; 3]   loc 1  (u, v, slice)
///  offset 20  tint      [f32; 4]   loc 2
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct BatchVertex {
    pub position: [f32; 2],
    pub texcoord: [f32; 3],
    pub tint: [f32; 4],
}

impl BatchVertex {
    pub const STRIDE: u64 = std::mem::size_of::<BatchVertex>() as u64;

    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x3, // texcoord + slice
        2 => Float32x4  // tint
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Vertices per quad; corners are written top-left, top-right,
/// bottom-right, bottom-left.
pub const VERTICES_PER_QUAD: usize = 4;

/// Indices per quad (two triangles).
pub const INDICES_PER_QUAD: u32 = 6;

/// Builds the static index pattern for `max_quads` quads:
/// `[0, 1, 2, 2, 3, 0]` offset by `4 * i` for quad `i`.
pub fn quad_indices(max_quads: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((max_quads * INDICES_PER_QUAD) as usize);
    for quad in 0..max_quads {
        let base = quad * VERTICES_PER_QUAD as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    indices
}

// ── camera uniform ────────────────────────────────────────────────────────

/// View then projection, column-major (128 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl CameraUniform {
    pub const SIZE: u64 = std::mem::size_of::<CameraUniform>() as u64;
}

// ── full-screen pass ──────────────────────────────────────────────────────

/// Clip-space position + UV for the compositing triangle pair.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct FullscreenVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl FullscreenVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<FullscreenVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Two triangles covering clip space; UV origin is the top-left texel.
pub(crate) const FULLSCREEN_VERTICES: [FullscreenVertex; 6] = [
    FullscreenVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
    FullscreenVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    FullscreenVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    FullscreenVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    FullscreenVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    FullscreenVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_is_nine_floats() {
        assert_eq!(BatchVertex::STRIDE, 36);
    }

    #[test]
    fn camera_uniform_is_two_matrices() {
        assert_eq!(CameraUniform::SIZE, 2 * 16 * 4);
    }

    #[test]
    fn index_pattern_repeats_per_quad() {
        let indices = quad_indices(3);
        assert_eq!(indices.len(), 18);
        assert_eq!(&indices[..6], &[0, 1, 2, 2, 3, 0]);
        assert_eq!(&indices[6..12], &[4, 5, 6, 6, 7, 4]);
        assert_eq!(&indices[12..], &[8, 9, 10, 10, 11, 8]);
    }
}
