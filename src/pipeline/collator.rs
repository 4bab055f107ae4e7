use std::collections::HashMap;

/// Re-orders items that arrive out of order, releasing them by ascending index
/// with no gaps.
#[derive(Debug)]
pub struct Collator<T: Send> {
    pub waiting: HashMap<usize, T>,
    pub next_key: usize,
}

impl<T: Send> Default for Collator<T> {
    fn default() -> Self {
        Self {
            waiting: Default::default(),
            next_key: Default::default(),
        }
    }
}

impl<T: Send> Collator<T> {
    pub fn receive(&mut self, index: usize, item: T) {
        self.waiting.insert(index, item);
    }

    pub fn try_next(&mut self) -> Option<(usize, T)> {
        let entry = self.waiting.remove_entry(&self.next_key)?;
        self.next_key += 1;
        Some(entry)
    }

    /// The number of items held back waiting for an earlier index
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_collate_out_of_order() {
        let mut collator = Collator::default();
        collator.receive(2, "c");
        collator.receive(1, "b");
        assert!(collator.try_next().is_none());

        collator.receive(0, "a");
        let released: Vec<_> = std::iter::from_fn(|| collator.try_next()).collect();
        assert_eq!(released, vec![(0, "a"), (1, "b"), (2, "c")]);
        assert!(collator.is_empty());

        collator.receive(4, "e");
        assert_eq!(collator.len(), 1);
        assert!(collator.try_next().is_none());
    }
}
