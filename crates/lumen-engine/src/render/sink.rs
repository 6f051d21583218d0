use bytemuck::Pod;

use super::SinkError;

/// Fixed-capacity, bounds-checked write cursor over staged vertex data.
///
/// `begin_map` grants write access and rewinds the cursor; `end_map` revokes
/// it and hands back the written prefix for upload. Writes outside a map,
/// or past the end, are rejected rather than corrupting memory.
///
/// The staging storage is allocated once and never grows.
pub struct VertexSink<V> {
    storage: Box<[V]>,
    cursor: usize,
    mapped: bool,
}

impl<V: Pod> VertexSink<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![V::zeroed(); capacity].into_boxed_slice(),
            cursor: 0,
            mapped: false,
        }
    }

    /// Capacity in vertices.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Vertices written since the last `begin_map`.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.storage.len() - self.cursor
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cursor == self.storage.len()
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Acquires write access and resets the cursor to the start.
    pub fn begin_map(&mut self) {
        self.mapped = true;
        self.cursor = 0;
    }

    /// Appends `vertices` at the cursor. All-or-nothing.
    pub fn write(&mut self, vertices: &[V]) -> Result<(), SinkError> {
        if !self.mapped {
            return Err(SinkError::Unmapped);
        }
        if vertices.len() > self.remaining() {
            return Err(SinkError::Full {
                capacity: self.capacity(),
            });
        }
        let end = self.cursor + vertices.len();
        self.storage[self.cursor..end].copy_from_slice(vertices);
        self.cursor = end;
        Ok(())
    }

    /// Releases write access and returns the written vertices.
    ///
    /// Unmapping an unmapped sink yields an empty slice.
    pub fn end_map(&mut self) -> &[V] {
        if !self.mapped {
            return &[];
        }
        self.mapped = false;
        &self.storage[..self.cursor]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_before_map_is_rejected() {
        let mut sink = VertexSink::<u32>::new(4);
        assert_eq!(sink.write(&[1]), Err(SinkError::Unmapped));
        assert_eq!(sink.cursor(), 0);
    }

    #[test]
    fn write_after_unmap_is_rejected() {
        let mut sink = VertexSink::<u32>::new(4);
        sink.begin_map();
        sink.write(&[1, 2]).unwrap();
        assert_eq!(sink.end_map(), &[1, 2]);
        assert_eq!(sink.write(&[3]), Err(SinkError::Unmapped));
    }

    #[test]
    fn overflowing_write_leaves_cursor_untouched() {
        let mut sink = VertexSink::<u32>::new(4);
        sink.begin_map();
        sink.write(&[1, 2, 3]).unwrap();
        assert_eq!(sink.write(&[4, 5]), Err(SinkError::Full { capacity: 4 }));
        assert_eq!(sink.cursor(), 3);
        sink.write(&[4]).unwrap();
        assert!(sink.is_full());
    }

    #[test]
    fn begin_map_rewinds() {
        let mut sink = VertexSink::<u32>::new(2);
        sink.begin_map();
        sink.write(&[7, 8]).unwrap();
        let _ = sink.end_map();
        sink.begin_map();
        assert_eq!(sink.cursor(), 0);
        sink.write(&[9]).unwrap();
        assert_eq!(sink.end_map(), &[9]);
    }
}
