pub mod las;

use pcq_core::pointcloud::point::{Point, SourceMetadata};

use crate::error::SourceError;

/// Pull interface over a point stream. Header metadata is read once at open;
/// points exist only inside the chunk buffer currently being filled.
pub trait PointSource {
    fn metadata(&self) -> &SourceMetadata;

    fn next_point(&mut self) -> Result<Option<Point>, SourceError>;

    /// Fixed-size chunk view over the remaining stream.
    fn chunks(&mut self, chunk_size: usize) -> Chunks<'_, Self>
    where
        Self: Sized,
    {
        Chunks {
            source: self,
            chunk_size,
        }
    }
}

pub struct Chunks<'a, S: PointSource> {
    source: &'a mut S,
    chunk_size: usize,
}

impl<S: PointSource> Iterator for Chunks<'_, S> {
    type Item = Result<Vec<Point>, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = Vec::with_capacity(self.chunk_size);

        for _ in 0..self.chunk_size {
            match self.source.next_point() {
                Ok(Some(point)) => buffer.push(point),
                Ok(None) => break,
                Err(e) => return Some(Err(e)),
            }
        }

        if buffer.is_empty() {
            None
        } else {
            Some(Ok(buffer))
        }
    }
}
