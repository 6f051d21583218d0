use wgpu::COPY_BUFFER_ALIGNMENT;

const INITIAL_CAPACITY: u64 = 256 * 1024;

/// Per-frame write cursor over the staging buffer.
///
/// Every upload of a frame gets its own byte range, so `queue.write_buffer`
/// calls (applied at submit) never overwrite data an earlier copy in the
/// same encoder still has to read. The cursor is reset when a frame is
/// acquired.
#[derive(Debug)]
pub(crate) struct StagingCursor {
    capacity: u64,
    cursor: u64,
}

impl StagingCursor {
    pub(crate) fn new() -> Self {
        Self { capacity: INITIAL_CAPACITY, cursor: 0 }
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    pub(crate) fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Offset for `len` bytes in the current buffer, or `None` if they do
    /// not fit.
    pub(crate) fn reserve(&mut self, len: u64) -> Option<u64> {
        let offset = self.cursor.next_multiple_of(COPY_BUFFER_ALIGNMENT);
        let end = offset.checked_add(len)?;
        if end > self.capacity {
            return None;
        }
        self.cursor = end;
        Some(offset)
    }

    /// Switches to a fresh buffer able to hold at least `len` bytes and
    /// returns its capacity. Ranges handed out before stay valid in the old
    /// buffer.
    pub(crate) fn regrow(&mut self, len: u64) -> u64 {
        self.capacity = (self.capacity * 2).max(len.next_power_of_two());
        self.cursor = 0;
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploads_in_one_frame_never_overlap() {
        let mut staging = StagingCursor::new();
        let first = staging.reserve(36 * 4).unwrap();
        let second = staging.reserve(36 * 4).unwrap();
        let third = staging.reserve(128).unwrap();
        assert_eq!(first, 0);
        assert!(second >= first + 36 * 4);
        assert!(third >= second + 36 * 4);
    }

    #[test]
    fn offsets_respect_copy_alignment() {
        let mut staging = StagingCursor::new();
        staging.reserve(6).unwrap();
        assert_eq!(staging.reserve(4), Some(8));
    }

    #[test]
    fn new_frame_starts_at_zero() {
        let mut staging = StagingCursor::new();
        staging.reserve(1024).unwrap();
        staging.reset();
        assert_eq!(staging.reserve(16), Some(0));
    }

    #[test]
    fn oversized_upload_regrows() {
        let mut staging = StagingCursor::new();
        let len = INITIAL_CAPACITY + 4;
        assert_eq!(staging.reserve(len), None);

        let capacity = staging.regrow(len);
        assert!(capacity >= len);
        assert_eq!(staging.reserve(len), Some(0));
        assert_eq!(staging.reserve(capacity), None);
    }
}
