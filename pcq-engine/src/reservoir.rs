use rand::Rng;

/// Reservoir sampling (Algorithm R): a uniform random sample of at most
/// `capacity` items from a stream of unknown, unbounded length, in
/// O(capacity) memory and one pass.
///
/// After n offers each item has been retained with probability
/// capacity / max(n, capacity). The random source is injected so tests can
/// assert exact contents under a seeded generator.
#[derive(Debug)]
pub struct ReservoirSampler<T, R: Rng> {
    capacity: usize,
    offered: u64,
    items: Vec<T>,
    rng: R,
}

impl<T, R: Rng> ReservoirSampler<T, R> {
    pub fn new(capacity: usize, rng: R) -> Self {
        Self {
            capacity,
            offered: 0,
            items: Vec::new(),
            rng,
        }
    }

    pub fn offer(&mut self, item: T) {
        self.offered += 1;
        if self.items.len() < self.capacity {
            self.items.push(item);
        } else if self.capacity > 0 {
            let slot = self.rng.gen_range(0..self.offered);
            if (slot as usize) < self.capacity {
                self.items[slot as usize] = item;
            }
        }
    }

    /// Count of all items offered so far, admitted or not.
    pub fn offered(&self) -> u64 {
        self.offered
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
