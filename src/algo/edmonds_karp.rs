use alloc::vec;
use alloc::vec::Vec;
use alloc::collections::VecDeque;

use crate::algo::{source_partition, Cut, MinCut};
use crate::edge::Edge;
use crate::error::Error;
use crate::graph::Graph;
use crate::vertex::VertexId;
use crate::weight::Weight;

/// Shortest-augmenting-path max-flow (Edmonds-Karp) over the same graph
/// structures as the incremental engine.
///
/// Rebuilds its search from scratch for every augmentation, which keeps it
/// simple enough to serve as a reference oracle; the same single-use
/// contract applies.
pub struct EdmondsKarp<'g, W> {
    graph: &'g mut Graph<W>,
    source: VertexId,
    sink: VertexId,
}

impl<'g, W: Weight> EdmondsKarp<'g, W> {
    pub fn new(
        graph: &'g mut Graph<W>,
        source: VertexId,
        sink: VertexId,
    ) -> Result<Self, Error> {
        if !graph.has_vertex(source) {
            return Err(Error::TerminalNotInGraph(source));
        }
        if !graph.has_vertex(sink) {
            return Err(Error::TerminalNotInGraph(sink));
        }
        Ok(Self {
            graph,
            source,
            sink,
        })
    }

    /// Runs the algorithm to completion and returns the cut.
    pub fn min_cut(self) -> Result<Cut<W>, Error> {
        let mut flow = W::zero();
        let mut augmentations = 0;

        while let Some(path) = self.shortest_path()? {
            let mut delta = W::infinity();
            for &(u, v) in &path {
                let weight = match self.graph.edge(u, v)? {
                    Some(edge) => edge.weight(),
                    None => return Err(Error::MissingPathEdge(u, v)),
                };
                if weight < delta {
                    delta = weight;
                }
            }
            for &(u, v) in &path {
                match self.graph.edge_mut(u, v)? {
                    Some(edge) => {
                        let weight = edge.weight();
                        edge.set_weight(weight - delta);
                    }
                    None => return Err(Error::MissingPathEdge(u, v)),
                }
                match self.graph.edge_mut(v, u)? {
                    Some(reverse) => {
                        let weight = reverse.weight();
                        reverse.set_weight(weight + delta);
                    }
                    None => {
                        self.graph.add_edge(Edge::new(v, u, delta))?;
                    }
                }
            }
            flow += delta;
            augmentations += 1;
            log::trace!("augmentation {augmentations}: pushed {delta}");
        }

        let source_side = source_partition(self.graph, self.source)?;
        Ok(Cut {
            source_side,
            max_flow: flow,
            augmentations,
        })
    }

    /// Breadth-first search for the shortest residual source-to-sink path.
    fn shortest_path(&self) -> Result<Option<Vec<(VertexId, VertexId)>>, Error> {
        let mut predecessor: Vec<Option<VertexId>> = vec![None; self.graph.id_bound()];
        let mut queue = VecDeque::new();
        predecessor[self.source] = Some(self.source);
        queue.push_back(self.source);

        while let Some(vertex) = queue.pop_front() {
            for edge in self.graph.edges(vertex)? {
                let next = edge.target();
                if !(edge.weight() > W::zero())
                    || !self.graph.has_vertex(next)
                    || predecessor[next].is_some()
                {
                    continue;
                }
                predecessor[next] = Some(vertex);
                if next == self.sink {
                    let mut path = Vec::new();
                    let mut current = next;
                    while current != self.source {
                        match predecessor[current] {
                            Some(previous) => {
                                path.push((previous, current));
                                current = previous;
                            }
                            None => break,
                        }
                    }
                    path.reverse();
                    return Ok(Some(path));
                }
                queue.push_back(next);
            }
        }
        Ok(None)
    }
}

impl<W: Weight> MinCut for EdmondsKarp<'_, W> {
    type Weight = W;
    type Error = Error;

    fn min_cut(self) -> Result<Cut<W>, Error> {
        EdmondsKarp::min_cut(self)
    }
}
