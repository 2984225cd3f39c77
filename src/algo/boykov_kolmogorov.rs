use alloc::vec;
use alloc::vec::Vec;
use alloc::collections::VecDeque;

use crate::algo::{source_partition, Cut, MinCut};
use crate::edge::Edge;
use crate::error::Error;
use crate::graph::Graph;
use crate::grid::GridLayout;
use crate::vertex::VertexId;
use crate::weight::Weight;

/// Tree affiliation of a vertex during the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Affiliation {
    Free,
    Source,
    Sink,
}

/// The Boykov-Kolmogorov incremental max-flow/min-cut engine.
///
/// Two search trees rooted at the terminals are grown towards each other
/// and kept alive across augmentations: pushing flow saturates edges and
/// orphans the subtrees they justified, and the adoption phase reattaches
/// or frees those orphans instead of rebuilding the trees from scratch.
/// The graph is expected to follow the canonical grid layout (source 0,
/// pixels `1..=n` row-major with the given row width, sink `n + 1`); the
/// adoption phase uses that layout to enumerate a pixel's neighbours.
///
/// The solve mutates edge weights in place and lazily inserts reverse
/// edges, so the solver takes the graph by mutable borrow and `min_cut`
/// consumes the solver: one graph, one solve.
#[derive(Debug)]
pub struct BoykovKolmogorov<'g, W> {
    graph: &'g mut Graph<W>,
    source: VertexId,
    sink: VertexId,
    layout: GridLayout,
    affiliation: Vec<Affiliation>,
    parent: Vec<Option<VertexId>>,
    active: VecDeque<VertexId>,
    orphans: VecDeque<VertexId>,
    max_augmentations: usize,
}

impl<'g, W: Weight> BoykovKolmogorov<'g, W> {
    /// Creates a solver over `graph` with the given terminals and pixel row
    /// width. Fails fast when a terminal is not a member of the graph.
    pub fn new(
        graph: &'g mut Graph<W>,
        source: VertexId,
        sink: VertexId,
        width: usize,
    ) -> Result<Self, Error> {
        if !graph.has_vertex(source) {
            return Err(Error::TerminalNotInGraph(source));
        }
        if !graph.has_vertex(sink) {
            return Err(Error::TerminalNotInGraph(sink));
        }
        let layout = GridLayout::from_len(graph.size().saturating_sub(2), width)?;

        let bound = graph.id_bound();
        let mut affiliation = vec![Affiliation::Free; bound];
        affiliation[source] = Affiliation::Source;
        affiliation[sink] = Affiliation::Sink;

        let mut active = VecDeque::new();
        active.push_back(source);
        active.push_back(sink);

        // floating-point capacities can shrink the bottleneck indefinitely;
        // the default cap is quadratic in the vertex count
        let max_augmentations = bound.saturating_mul(bound).saturating_add(1024);

        Ok(Self {
            graph,
            source,
            sink,
            layout,
            affiliation,
            parent: vec![None; bound],
            active,
            orphans: VecDeque::new(),
            max_augmentations,
        })
    }

    /// Caps the number of augmentations before the solve gives up with
    /// [`Error::DidNotConverge`].
    pub fn with_augmentation_limit(mut self, limit: usize) -> Self {
        self.max_augmentations = limit;
        self
    }

    /// Runs the algorithm to completion and returns the cut.
    ///
    /// The partition is recomputed by a residual reachability scan rather
    /// than read from the search trees: adoption can leave the affiliation
    /// state lagging behind true residual reachability.
    pub fn min_cut(mut self) -> Result<Cut<W>, Error> {
        let mut flow = W::zero();
        let mut augmentations = 0;

        loop {
            let path = self.grow()?;
            if path.is_empty() {
                break;
            }
            if augmentations == self.max_augmentations {
                return Err(Error::DidNotConverge(augmentations));
            }
            let delta = self.augment(&path)?;
            flow += delta;
            augmentations += 1;
            log::trace!(
                "augmentation {augmentations}: pushed {delta} along {} edges",
                path.len()
            );
            self.adopt()?;
        }

        let source_side = source_partition(self.graph, self.source)?;
        log::debug!(
            "min cut: flow {flow} after {augmentations} augmentations, {} vertices on the source side",
            source_side.len()
        );
        Ok(Cut {
            source_side,
            max_flow: flow,
            augmentations,
        })
    }

    /// Growth phase: expand both trees from the active frontier until an
    /// edge connecting them is found.
    ///
    /// The front vertex is inspected without being removed, so a vertex
    /// interrupted by an augmentation is revisited; it is popped only once
    /// its edge list is exhausted without yielding a connection. An empty
    /// return means no augmenting path remains.
    fn grow(&mut self) -> Result<Vec<(VertexId, VertexId)>, Error> {
        while let Some(&p) = self.active.front() {
            let side = self.affiliation[p];
            if side == Affiliation::Free {
                // freed by adoption while still queued
                self.active.pop_front();
                continue;
            }
            let count = self.graph.edges(p)?.len();
            for slot in 0..count {
                let edge = self.graph.edges(p)?[slot];
                if !(edge.weight() > W::zero()) {
                    continue;
                }
                let q = edge.target();
                match self.affiliation[q] {
                    Affiliation::Free => {
                        self.parent[q] = Some(p);
                        self.affiliation[q] = side;
                        self.active.push_back(q);
                    }
                    other if other != side => {
                        if let Some(path) = self.connect(p, q, side)? {
                            return Ok(path);
                        }
                    }
                    _ => {}
                }
            }
            self.active.pop_front();
        }
        Ok(Vec::new())
    }

    /// Assembles the full source-to-sink path once a connecting edge
    /// between the trees is found.
    ///
    /// `side` is the affiliation of `p`; a sink-side discovery runs against
    /// the flow direction and uses the mirrored arc instead. Returns `None`
    /// when the connection is unusable (missing or exhausted mirror), in
    /// which case growth keeps scanning.
    fn connect(
        &self,
        p: VertexId,
        q: VertexId,
        side: Affiliation,
    ) -> Result<Option<Vec<(VertexId, VertexId)>>, Error> {
        let (source_end, sink_end) = match side {
            Affiliation::Source => (p, q),
            Affiliation::Sink => match self.graph.edge(q, p)? {
                Some(mirror) if mirror.weight() > W::zero() => (q, p),
                _ => return Ok(None),
            },
            Affiliation::Free => return Ok(None),
        };

        // source → … → source_end, rebuilt from the parent chain
        let mut head = Vec::new();
        let mut current = source_end;
        while let Some(parent) = self.parent[current] {
            head.push((parent, current));
            current = parent;
        }
        head.reverse();

        let mut path = head;
        path.push((source_end, sink_end));

        // sink_end → … → sink; the tree grew these links in the opposite
        // direction, so each step must have a live mirror
        let mut current = sink_end;
        while let Some(parent) = self.parent[current] {
            let usable = match self.graph.edge(current, parent)? {
                Some(edge) => edge.weight() > W::zero(),
                None => false,
            };
            if !usable {
                return Ok(None);
            }
            path.push((current, parent));
            current = parent;
        }
        Ok(Some(path))
    }

    /// Augmentation phase: push the bottleneck flow through the path and
    /// orphan every vertex whose tree-justifying edge saturated.
    fn augment(&mut self, path: &[(VertexId, VertexId)]) -> Result<W, Error> {
        let mut delta = W::infinity();
        for &(u, v) in path {
            let weight = match self.graph.edge(u, v)? {
                Some(edge) => edge.weight(),
                None => return Err(Error::MissingPathEdge(u, v)),
            };
            if weight < delta {
                delta = weight;
            }
        }

        for &(u, v) in path {
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

        for &(u, v) in path {
            let saturated = match self.graph.edge(u, v)? {
                Some(edge) => !(edge.weight() > W::zero()),
                None => false,
            };
            if !saturated {
                continue;
            }
            let side = self.affiliation[u];
            if side == Affiliation::Free || self.affiliation[v] != side {
                continue;
            }
            // the deeper endpoint loses its justification
            if self.parent[v] == Some(u) {
                self.parent[v] = None;
                self.orphans.push_back(v);
            } else if self.parent[u] == Some(v) {
                self.parent[u] = None;
                self.orphans.push_back(u);
            }
        }
        Ok(delta)
    }

    /// Adoption phase: reattach or free every orphan until the queue
    /// drains.
    fn adopt(&mut self) -> Result<(), Error> {
        while let Some(p) = self.orphans.pop_front() {
            let side = self.affiliation[p];
            let terminal = match side {
                Affiliation::Source => self.source,
                Affiliation::Sink => self.sink,
                Affiliation::Free => continue,
            };

            // cheapest repair first: the direct terminal link
            let direct = match self.graph.edge(terminal, p)? {
                Some(edge) => edge.weight() > W::zero(),
                None => false,
            };
            if direct {
                self.parent[p] = Some(terminal);
                continue;
            }

            if self.adopt_from_neighbours(p, side)? {
                continue;
            }
            self.set_free(p, side)?;
        }
        Ok(())
    }

    /// Scans the orphan's grid neighbours for a same-tree parent with a
    /// live edge and a valid origin.
    fn adopt_from_neighbours(&mut self, p: VertexId, side: Affiliation) -> Result<bool, Error> {
        for q in self.layout.neighbours(p) {
            if !self.graph.has_vertex(q) || self.affiliation[q] != side {
                continue;
            }
            let usable = match self.graph.edge(q, p)? {
                Some(edge) => edge.weight() > W::zero(),
                None => false,
            };
            if usable && self.valid_origin(q) {
                self.parent[p] = Some(q);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// No parent was found: the orphan becomes free, neighbours that might
    /// re-adopt it are re-activated and its children cascade into the
    /// orphan queue.
    fn set_free(&mut self, p: VertexId, side: Affiliation) -> Result<(), Error> {
        for q in self.layout.neighbours(p) {
            if !self.graph.has_vertex(q) || self.affiliation[q] != side {
                continue;
            }
            let reconnectable = match self.graph.edge(q, p)? {
                Some(edge) => edge.weight() > W::zero(),
                None => false,
            };
            if reconnectable {
                self.active.push_back(q);
            }
            if self.parent[q] == Some(p) {
                self.parent[q] = None;
                self.orphans.push_back(q);
            }
        }
        self.active.retain(|&v| v != p);
        self.affiliation[p] = Affiliation::Free;
        self.parent[p] = None;
        Ok(())
    }

    /// A parent chain is a valid origin when it reaches a terminal without
    /// crossing a broken (unparented) vertex.
    fn valid_origin(&self, q: VertexId) -> bool {
        if q == self.source || q == self.sink {
            return true;
        }
        let mut current = q;
        for _ in 0..self.parent.len() {
            match self.parent[current] {
                Some(parent) if parent == self.source || parent == self.sink => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

impl<W: Weight> MinCut for BoykovKolmogorov<'_, W> {
    type Weight = W;
    type Error = Error;

    fn min_cut(self) -> Result<Cut<W>, Error> {
        BoykovKolmogorov::min_cut(self)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    /// A terminal pair around a single row of pixels, in the canonical
    /// layout: source 0, pixels 1..=n, sink n+1.
    fn row_graph(capacities: &[(VertexId, VertexId, f32)], pixels: usize) -> Graph<f32> {
        let mut g = Graph::with_capacity(pixels + 2);
        for v in 0..pixels + 2 {
            g.add_vertex(v);
        }
        for &(u, v, w) in capacities {
            g.add_edge(Edge::new(u, v, w)).unwrap();
        }
        g
    }

    #[test]
    fn single_pixel_cuts_at_the_weaker_link() {
        // source→p is stronger than p→sink, so p stays on the source side
        let mut g = row_graph(&[(0, 1, 5.0), (1, 2, 2.0)], 1);
        let cut = BoykovKolmogorov::new(&mut g, 0, 2, 1)
            .unwrap()
            .min_cut()
            .unwrap();
        assert_eq!(cut.max_flow, 2.0);
        assert_eq!(cut.source_side.into_iter().collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn diamond_graph_saturates_the_source_links() {
        // s→a 3, s→b 2, a→t 2, b→t 3, a→b 1: flow 2 via a, 2 via b and 1
        // more via a→b, leaving the source isolated
        let mut g = row_graph(
            &[
                (0, 1, 3.0),
                (0, 2, 2.0),
                (1, 3, 2.0),
                (2, 3, 3.0),
                (1, 2, 1.0),
            ],
            2,
        );
        let pristine = g.duplicate();
        let cut = BoykovKolmogorov::new(&mut g, 0, 3, 2)
            .unwrap()
            .min_cut()
            .unwrap();
        assert_eq!(cut.max_flow, 5.0);
        assert!(cut.source_side.is_empty());
        // cut capacity over the original graph equals the flow
        let mut side = cut.source_side.clone();
        side.insert(0);
        assert_eq!(pristine.crossing_weight(side), 5.0);
        // fixpoint: nothing positive leaves the source side any more
        assert_eq!(g.crossing_weight([0]), 0.0);
    }

    #[test]
    fn saturated_tree_link_is_repaired_by_adoption() {
        // the s→p2 link saturates while p2 still hangs off it; adoption
        // reparents p2 onto its grid neighbour p1
        let mut g = row_graph(
            &[
                (0, 1, 3.0),
                (0, 2, 0.5),
                (1, 2, 2.0),
                (2, 1, 2.0),
                (1, 3, 0.5),
                (2, 3, 2.0),
            ],
            2,
        );
        let pristine = g.duplicate();
        let cut = BoykovKolmogorov::new(&mut g, 0, 3, 2)
            .unwrap()
            .min_cut()
            .unwrap();
        assert_eq!(cut.max_flow, 2.5);
        assert_eq!(
            cut.source_side.iter().copied().collect::<Vec<_>>(),
            [1, 2]
        );
        let mut side = cut.source_side.clone();
        side.insert(0);
        assert_eq!(pristine.crossing_weight(side.clone()), 2.5);
        assert_eq!(g.crossing_weight(side), 0.0);
    }

    #[test]
    fn missing_terminal_fails_fast() {
        let mut g = row_graph(&[(0, 1, 1.0)], 1);
        let err = BoykovKolmogorov::new(&mut g, 7, 2, 1).unwrap_err();
        assert_eq!(err, Error::TerminalNotInGraph(7));
        let err = BoykovKolmogorov::new(&mut g, 0, 9, 1).unwrap_err();
        assert_eq!(err, Error::TerminalNotInGraph(9));
    }

    #[test]
    fn exhausted_augmentation_limit_is_a_recoverable_outcome() {
        let mut g = row_graph(&[(0, 1, 5.0), (1, 2, 2.0)], 1);
        let err = BoykovKolmogorov::new(&mut g, 0, 2, 1)
            .unwrap()
            .with_augmentation_limit(0)
            .min_cut()
            .unwrap_err();
        assert_eq!(err, Error::DidNotConverge(0));
    }

    #[test]
    fn solved_graph_keeps_reverse_flow_bookkeeping() {
        let mut g = row_graph(&[(0, 1, 5.0), (1, 2, 2.0)], 1);
        BoykovKolmogorov::new(&mut g, 0, 2, 1)
            .unwrap()
            .min_cut()
            .unwrap();
        // lazily created reverse edges record the pushed flow
        assert_eq!(g.edge(1, 0).unwrap().unwrap().weight(), 2.0);
        assert_eq!(g.edge(2, 1).unwrap().unwrap().weight(), 2.0);
        assert_eq!(g.edge(0, 1).unwrap().unwrap().weight(), 3.0);
        assert_eq!(g.edge(1, 2).unwrap().unwrap().weight(), 0.0);
    }
}
