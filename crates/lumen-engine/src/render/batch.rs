use crate::coords::Vec2;
use crate::paint::Color;

use super::backend::{BatchDraw, BatchKind, BufferId, GraphicsBackend, TextureArrayId};
use super::vertex::{quad_indices, BatchVertex, INDICES_PER_QUAD, VERTICES_PER_QUAD};
use super::{SinkError, TextureCoordinates, VertexSink};

/// Vertex sink + GPU buffers + pending quad count for one batch class.
///
/// Shared by [`QuadBatch`](super::QuadBatch) and
/// [`TextBatch`](super::TextBatch); geometry is computed by the owners.
pub(crate) struct Batch {
    kind: BatchKind,
    sink: VertexSink<BatchVertex>,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    quad_count: u32,
    max_quads: u32,
}

impl Batch {
    pub(crate) fn new(
        backend: &mut dyn GraphicsBackend,
        kind: BatchKind,
        label: &str,
        max_quads: u32,
    ) -> Self {
        let vertex_capacity = max_quads as usize * VERTICES_PER_QUAD;
        let vertex_buffer = backend.create_vertex_buffer(
            &format!("{label} vbo"),
            vertex_capacity as u64 * BatchVertex::STRIDE,
        );
        let index_buffer =
            backend.create_index_buffer(&format!("{label} ibo"), &quad_indices(max_quads));

        log::debug!("{label}: {max_quads} quads ({vertex_capacity} vertices) allocated");

        Self {
            kind,
            sink: VertexSink::new(vertex_capacity),
            vertex_buffer,
            index_buffer,
            quad_count: 0,
            max_quads,
        }
    }

    #[inline]
    pub(crate) fn quad_count(&self) -> u32 {
        self.quad_count
    }

    #[inline]
    pub(crate) fn max_quads(&self) -> u32 {
        self.max_quads
    }

    #[inline]
    pub(crate) fn sink(&self) -> &VertexSink<BatchVertex> {
        &self.sink
    }

    #[inline]
    pub(crate) fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    #[inline]
    pub(crate) fn is_mapped(&self) -> bool {
        self.sink.is_mapped()
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.sink.is_full()
    }

    pub(crate) fn begin(&mut self) {
        self.sink.begin_map();
        self.quad_count = 0;
    }

    /// Appends one quad. `corners` are top-left, top-right, bottom-right,
    /// bottom-left; each maps to the matching UV corner of `coords`.
    pub(crate) fn push(
        &mut self,
        corners: [Vec2; 4],
        coords: &TextureCoordinates,
        tint: Color,
    ) -> Result<(), SinkError> {
        let uv = coords.corners();
        let tint = tint.to_array();
        let vertices: [BatchVertex; VERTICES_PER_QUAD] = std::array::from_fn(|i| BatchVertex {
            position: corners[i].to_array(),
            texcoord: uv[i],
            tint,
        });
        self.sink.write(&vertices)?;
        self.quad_count += 1;
        Ok(())
    }

    /// Unmaps the sink and, if anything was written, uploads it and issues
    /// one indexed draw. Returns the number of quads drawn.
    pub(crate) fn flush(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        camera: BufferId,
        textures: TextureArrayId,
    ) -> Option<u32> {
        let vertices = self.sink.end_map();
        let drawn = std::mem::take(&mut self.quad_count);
        if drawn == 0 {
            return None;
        }

        backend.write_buffer(self.vertex_buffer, bytemuck::cast_slice(vertices));
        backend.draw_batch(&BatchDraw {
            kind: self.kind,
            vertex_buffer: self.vertex_buffer,
            index_buffer: self.index_buffer,
            camera,
            textures,
            index_count: drawn * INDICES_PER_QUAD,
        });
        Some(drawn)
    }
}
