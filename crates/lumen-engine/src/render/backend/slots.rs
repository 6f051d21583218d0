/// Arena of resources addressed by stable `u32` slot indices.
///
/// Removed slots are left empty and never reused, so a stale handle can
/// only miss, never alias a newer resource.
#[derive(Debug)]
pub(crate) struct Slots<T> {
    items: Vec<Option<T>>,
}

impl<T> Slots<T> {
    pub(crate) fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub(crate) fn insert(&mut self, item: T) -> u32 {
        let index = self.items.len() as u32;
        self.items.push(Some(item));
        index
    }

    pub(crate) fn get(&self, index: u32) -> Option<&T> {
        self.items.get(index as usize).and_then(Option::as_ref)
    }

    pub(crate) fn remove(&mut self, index: u32) -> Option<T> {
        self.items.get_mut(index as usize).and_then(Option::take)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(|(i, item)| item.as_mut().map(|item| (i as u32, item)))
    }
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_slots_are_not_reused() {
        let mut slots = Slots::new();
        let a = slots.insert("a");
        assert_eq!(slots.remove(a), Some("a"));
        let b = slots.insert("b");
        assert_ne!(a, b);
        assert!(slots.get(a).is_none());
        assert_eq!(slots.get(b), Some(&"b"));
    }

    #[test]
    fn iter_skips_empty_slots() {
        let mut slots = Slots::new();
        let a = slots.insert(1);
        slots.insert(2);
        slots.remove(a);
        let live: Vec<_> = slots.iter_mut().map(|(i, v)| (i, *v)).collect();
        assert_eq!(live, vec![(1, 2)]);
    }
}
