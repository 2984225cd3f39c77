use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use crate::edge::Edge;
use crate::error::Error;
use crate::vertex::VertexId;
use crate::weight::Weight;

/// Per-vertex adjacency bucket: outgoing edges in insertion order plus a
/// target-to-slot index for O(1) pair lookup.
#[derive(Clone, Debug)]
struct Bucket<W> {
    edges: Vec<Edge<W>>,
    by_target: BTreeMap<VertexId, usize>,
}

impl<W> Bucket<W> {
    fn new() -> Self {
        Self {
            edges: Vec::new(),
            by_target: BTreeMap::new(),
        }
    }
}

/// A directed weighted graph over densely numbered vertices.
///
/// Each vertex owns the ordered list of its outgoing edges. Insertion order
/// is preserved and is part of the contract: it determines tie-breaks in
/// path discovery. Edge weights are residual capacities and are mutated in
/// place by the solvers, so a graph is single-use per solve; callers that
/// need to solve variations of the same graph must [`duplicate`] it first.
///
/// [`duplicate`]: Graph::duplicate
#[derive(Clone, Debug)]
pub struct Graph<W> {
    buckets: Vec<Option<Bucket<W>>>,
    len: usize,
}

impl<W: Weight> Graph<W> {
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            len: 0,
        }
    }

    /// Creates a graph expecting the given number of vertices.
    pub fn with_capacity(vertices: usize) -> Self {
        Self {
            buckets: Vec::with_capacity(vertices),
            len: 0,
        }
    }

    /// The number of vertices in the graph.
    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the largest vertex id ever added. Solvers size their
    /// per-vertex state arrays from this.
    pub fn id_bound(&self) -> usize {
        self.buckets.len()
    }

    pub fn has_vertex(&self, vertex: VertexId) -> bool {
        self.bucket(vertex).is_some()
    }

    /// Adds a vertex with an empty adjacency list. Returns `false` if the
    /// vertex was already present; existing adjacency is never clobbered.
    pub fn add_vertex(&mut self, vertex: VertexId) -> bool {
        if self.has_vertex(vertex) {
            return false;
        }
        self.ensure_slot(vertex);
        self.buckets[vertex] = Some(Bucket::new());
        self.len += 1;
        true
    }

    /// Adds a vertex together with its prepared outgoing edge list.
    ///
    /// This is the bulk-construction path: edge targets need not be members
    /// yet, but every supplied edge must originate at `vertex`. Duplicate
    /// `(source, target)` pairs beyond the first are skipped.
    pub fn add_connected_vertex(
        &mut self,
        vertex: VertexId,
        edges: Vec<Edge<W>>,
    ) -> Result<(), Error> {
        for edge in &edges {
            if edge.source() != vertex {
                return Err(Error::EdgeSourceMismatch(
                    edge.source(),
                    edge.target(),
                    vertex,
                ));
            }
        }
        if !self.add_vertex(vertex) {
            log::trace!("vertex {vertex} already present, extending its adjacency");
        }
        for edge in edges {
            self.insert_into_bucket(edge);
        }
        Ok(())
    }

    /// Adds a directed edge. Returns `Ok(false)` when an edge for the same
    /// `(source, target)` pair already exists; the insertion is a no-op
    /// then, not an error. Both endpoints must already be members.
    pub fn add_edge(&mut self, edge: Edge<W>) -> Result<bool, Error> {
        if !self.has_vertex(edge.source()) || !self.has_vertex(edge.target()) {
            return Err(Error::MissingEndpoint(edge.source(), edge.target()));
        }
        Ok(self.insert_into_bucket(edge))
    }

    /// Iterates the member vertex ids in ascending order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.buckets
            .iter()
            .enumerate()
            .filter_map(|(id, bucket)| bucket.as_ref().map(|_| id))
    }

    /// The outgoing edges of `vertex` in insertion order.
    pub fn edges(&self, vertex: VertexId) -> Result<&[Edge<W>], Error> {
        self.bucket(vertex)
            .map(|bucket| bucket.edges.as_slice())
            .ok_or(Error::VertexNotFound(vertex))
    }

    /// Looks up the edge for an ordered `(source, target)` pair.
    ///
    /// Returns `Ok(None)` when no such edge exists, which is an ordinary
    /// outcome (e.g. a grid boundary); an absent source vertex is a
    /// contract violation and fails instead.
    pub fn edge(&self, source: VertexId, target: VertexId) -> Result<Option<&Edge<W>>, Error> {
        let bucket = self.bucket(source).ok_or(Error::VertexNotFound(source))?;
        Ok(bucket
            .by_target
            .get(&target)
            .map(|&slot| &bucket.edges[slot]))
    }

    /// Mutable variant of [`edge`](Graph::edge).
    pub fn edge_mut(
        &mut self,
        source: VertexId,
        target: VertexId,
    ) -> Result<Option<&mut Edge<W>>, Error> {
        let bucket = self
            .buckets
            .get_mut(source)
            .and_then(|b| b.as_mut())
            .ok_or(Error::VertexNotFound(source))?;
        Ok(bucket
            .by_target
            .get(&target)
            .map(|&slot| &mut bucket.edges[slot]))
    }

    /// Iterates every edge of the graph.
    pub fn edge_refs(&self) -> impl Iterator<Item = &Edge<W>> {
        self.buckets
            .iter()
            .flatten()
            .flat_map(|bucket| bucket.edges.iter())
    }

    /// Returns an independent deep copy of this graph.
    ///
    /// A solved graph holds mutated residual weights and lazily created
    /// reverse edges; re-solving it is undefined. Duplicate the pristine
    /// graph once per solve instead.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Adds the mirrored reverse of every edge that lacks one, turning the
    /// graph into its undirected equivalent.
    pub fn make_undirected(&mut self) -> Result<(), Error> {
        let mut missing: Vec<Edge<W>> = Vec::new();
        for bucket in self.buckets.iter().flatten() {
            for edge in &bucket.edges {
                let mirrored = self
                    .bucket(edge.target())
                    .map_or(false, |b| b.by_target.contains_key(&edge.source()));
                if !mirrored {
                    missing.push(edge.invert());
                }
            }
        }
        for edge in missing {
            self.add_edge(edge)?;
        }
        Ok(())
    }

    /// Unweighted depth-first path search, following edges in insertion
    /// order. Not used by the min-cut engine's own path discovery; kept for
    /// diagnostics and tests.
    pub fn path_dfs(
        &self,
        source: VertexId,
        target: VertexId,
    ) -> Result<Option<Vec<VertexId>>, Error> {
        if !self.has_vertex(source) {
            return Err(Error::VertexNotFound(source));
        }
        if !self.has_vertex(target) {
            return Err(Error::VertexNotFound(target));
        }
        if source == target {
            return Ok(Some(vec![source]));
        }

        let mut visited = vec![false; self.id_bound()];
        visited[source] = true;
        let mut path = vec![source];
        let mut cursors = vec![0usize];

        while !path.is_empty() {
            let vertex = path[path.len() - 1];
            let next = cursors[cursors.len() - 1];
            let edges = self.edges(vertex)?;
            if next >= edges.len() {
                path.pop();
                cursors.pop();
                continue;
            }
            let slot = cursors.len() - 1;
            cursors[slot] += 1;

            let candidate = edges[next].target();
            if !self.has_vertex(candidate) || visited[candidate] {
                continue;
            }
            if candidate == target {
                path.push(candidate);
                return Ok(Some(path));
            }
            visited[candidate] = true;
            path.push(candidate);
            cursors.push(0);
        }
        Ok(None)
    }

    /// Total weight of edges with a strictly positive residual, leaving the
    /// given vertex set for its complement.
    pub fn crossing_weight<I>(&self, source_side: I) -> W
    where
        I: IntoIterator<Item = VertexId>,
    {
        let mut inside = vec![false; self.id_bound()];
        for v in source_side {
            if v < inside.len() {
                inside[v] = true;
            }
        }
        self.edge_refs()
            .filter(|e| {
                let src = inside.get(e.source()).copied().unwrap_or(false);
                let dst = inside.get(e.target()).copied().unwrap_or(false);
                src && !dst && e.weight() > W::zero()
            })
            .map(|e| e.weight())
            .sum()
    }

    fn bucket(&self, vertex: VertexId) -> Option<&Bucket<W>> {
        self.buckets.get(vertex).and_then(|b| b.as_ref())
    }

    fn ensure_slot(&mut self, vertex: VertexId) {
        if vertex >= self.buckets.len() {
            self.buckets.resize_with(vertex + 1, || None);
        }
    }

    /// Appends `edge` to its source bucket unless the pair already exists.
    /// The bucket must be present.
    fn insert_into_bucket(&mut self, edge: Edge<W>) -> bool {
        let bucket = match self.buckets[edge.source()].as_mut() {
            Some(bucket) => bucket,
            None => return false,
        };
        if bucket.by_target.contains_key(&edge.target()) {
            log::trace!("duplicate edge {edge} skipped");
            return false;
        }
        bucket.by_target.insert(edge.target(), bucket.edges.len());
        bucket.edges.push(edge);
        true
    }
}

impl<W: Weight> Default for Graph<W> {
    fn default() -> Self {
        Self::new()
    }
}
