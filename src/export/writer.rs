use crate::animation::{AssembledSequence, SharedTracks, StandaloneSequence};
use crate::scene::Node;

/// Error type returned by [`ShapeWriter`] implementations.
pub type WriterError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that goes into the shape itself.
#[derive(Debug, Clone, Copy)]
pub struct Shape<'a> {
    /// Flattened hierarchy with rest transforms, root first.
    pub nodes: &'a [Node],
    /// Sequences stored in the shape, pointing into `tracks`.
    pub sequences: &'a [AssembledSequence],
    pub tracks: &'a SharedTracks,
}

/// Consumer of the baked output. Serialisation formats live behind this
/// trait.
///
/// Standalone sequences are written first, then the shape. If any call
/// fails the export stops and [`discard`](Self::discard) is called so no
/// partial output is kept.
pub trait ShapeWriter {
    fn write_standalone(
        &mut self,
        nodes: &[Node],
        sequence: &StandaloneSequence,
    ) -> Result<(), WriterError>;

    fn write_shape(&mut self, shape: &Shape<'_>) -> Result<(), WriterError>;

    /// Removes whatever was written so far.
    fn discard(&mut self) {}
}
