use displaydoc::Display;

use crate::vertex::VertexId;

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum Error {
    /// Vertex {0} is not a member of the graph
    VertexNotFound(VertexId),
    /// Edge ({0}, {1}) references a vertex absent from the graph
    MissingEndpoint(VertexId, VertexId),
    /// Edge ({0}, {1}) supplied for the adjacency bucket of vertex {2}
    EdgeSourceMismatch(VertexId, VertexId, VertexId),
    /// Terminal vertex {0} is not a member of the graph
    TerminalNotInGraph(VertexId),
    /// Augmenting path references the non-existent edge ({0}, {1})
    MissingPathEdge(VertexId, VertexId),
    /// Pixel buffer of length {0} does not form a grid of row width {1}
    InvalidDimensions(usize, usize),
    /// No minimum cut found within {0} augmentations
    DidNotConverge(usize),
}
