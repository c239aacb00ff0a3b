use crate::dataset::{Dataset, Sample};
use crate::errors::Result;

/// Infinite batching wrapper over a dataset: yields only full batches,
/// drops the trailing partial batch of each pass and immediately starts a
/// new pass. The consumer decides when to stop pulling; iteration ends on
/// its own only when the dataset cannot fill a single batch.
pub struct Stream<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Stream<'a> {
    pub(crate) fn new(dataset: &'a Dataset, batch_size: usize) -> Self {
        Self {
            dataset,
            batch_size,
            cursor: 0,
        }
    }
}

impl Iterator for Stream<'_> {
    type Item = Result<Vec<Sample>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.batch_size == 0 || self.dataset.len() < self.batch_size {
            return None;
        }
        if self.cursor + self.batch_size > self.dataset.len() {
            self.cursor = 0;
        }
        let range = self.cursor..self.cursor + self.batch_size;
        self.cursor += self.batch_size;
        Some(range.map(|index| self.dataset.sample(index)).collect())
    }
}
