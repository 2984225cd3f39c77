/// Identifier of a vertex in a [`Graph`](crate::Graph).
///
/// Identifiers are expected to be dense (`0..n`): the graph stores its
/// adjacency as an arena indexed by id, and solvers size their per-vertex
/// state arrays from the largest id present.
pub type VertexId = usize;
