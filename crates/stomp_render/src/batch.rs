//! CPU-side quad list, rebuilt every frame and streamed to the GPU in one draw.

use crate::vertex::QuadVertex;

#[derive(Debug, Default)]
pub struct QuadBatch {
    pub vertices: Vec<QuadVertex>,
    pub indices: Vec<u32>,
}

impl QuadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Append an axis-aligned rectangle given by its top-left corner in world units.
    pub fn push_rect(&mut self, left: f32, top: f32, width: f32, height: f32, color: [f32; 4]) {
        let right = left + width;
        let bottom = top + height;
        let base = self.vertices.len() as u32;

        for position in [[left, top], [right, top], [right, bottom], [left, bottom]] {
            self.vertices.push(QuadVertex { position, color });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}
