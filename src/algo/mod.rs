use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec;
use core::fmt::Debug;

use crate::error::Error;
use crate::graph::Graph;
use crate::vertex::VertexId;
use crate::weight::Weight;

pub mod boykov_kolmogorov;
pub mod edmonds_karp;

pub use self::boykov_kolmogorov::BoykovKolmogorov;
pub use self::edmonds_karp::EdmondsKarp;

/// A two-terminal minimum-cut algorithm.
///
/// Solvers borrow their graph mutably for their whole lifetime and are
/// consumed by the solve: the residual mutation they perform makes a second
/// run over the same graph meaningless.
pub trait MinCut {
    type Weight;
    type Error: Debug;

    /// Run the algorithm to completion and return the cut.
    fn min_cut(self) -> Result<Cut<Self::Weight>, Self::Error>;
}

/// The result of a minimum-cut computation.
#[derive(Clone, Debug, PartialEq)]
pub struct Cut<W> {
    /// Vertices on the source side of the cut, the source itself excluded.
    pub source_side: BTreeSet<VertexId>,
    /// Total flow pushed across all augmentations; by the max-flow/min-cut
    /// theorem this equals the capacity of the cut.
    pub max_flow: W,
    /// Number of augmenting paths the solver pushed flow along.
    pub augmentations: usize,
}

/// Recomputes the source side of the cut from the residual graph.
///
/// Breadth-first reachability from `source` over strictly positive residual
/// edges. This is authoritative over any solver-internal bookkeeping, which
/// may lag true residual reachability after adoption. The source itself is
/// not part of the returned set.
pub fn source_partition<W: Weight>(
    graph: &Graph<W>,
    source: VertexId,
) -> Result<BTreeSet<VertexId>, Error> {
    if !graph.has_vertex(source) {
        return Err(Error::VertexNotFound(source));
    }
    let mut reached = BTreeSet::new();
    let mut visited = vec![false; graph.id_bound()];
    visited[source] = true;
    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(vertex) = queue.pop_front() {
        for edge in graph.edges(vertex)? {
            let next = edge.target();
            if edge.weight() > W::zero() && graph.has_vertex(next) && !visited[next] {
                visited[next] = true;
                reached.insert(next);
                queue.push_back(next);
            }
        }
    }
    Ok(reached)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::edge::Edge;

    use super::*;

    #[test]
    fn partition_ignores_exhausted_edges() {
        let mut g = Graph::new();
        for v in 0..4 {
            g.add_vertex(v);
        }
        g.add_edge(Edge::new(0, 1, 1.0f32)).unwrap();
        g.add_edge(Edge::new(1, 2, 0.0)).unwrap();
        g.add_edge(Edge::new(0, 3, 0.0)).unwrap();

        let side = source_partition(&g, 0).unwrap();
        assert_eq!(side.into_iter().collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn partition_requires_a_member_source() {
        let g = Graph::<f32>::new();
        assert_eq!(source_partition(&g, 0).unwrap_err(), Error::VertexNotFound(0));
    }
}
