use alloc::vec::Vec;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::Error;
use crate::graph::Graph;
use crate::vertex::VertexId;
use crate::weight::Weight;

/// Role of a vertex in a pixel-grid segmentation graph.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug)]
pub enum GridNode {
    Source,
    Sink,
    /// A pixel, addressed by its 0-based row-major index.
    Pixel(usize),
}

impl From<usize> for GridNode {
    fn from(index: usize) -> Self {
        Self::Pixel(index)
    }
}

/// Canonical vertex layout of a pixel grid.
///
/// The source terminal is vertex 0, the pixels occupy `1..=n` in row-major
/// order and the sink terminal is `n + 1`. Solvers use the row width to map
/// a pixel vertex back to 2D coordinates when enumerating its neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    width: usize,
    height: usize,
}

impl GridLayout {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Derives the layout of a row-major buffer of `len` pixels.
    pub fn from_len(len: usize, width: usize) -> Result<Self, Error> {
        if width == 0 || len % width != 0 {
            return Err(Error::InvalidDimensions(len, width));
        }
        Ok(Self {
            width,
            height: len / width,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Pixel count plus the two terminals.
    pub fn vertex_count(&self) -> usize {
        self.pixel_count() + 2
    }

    pub fn source(&self) -> VertexId {
        0
    }

    pub fn sink(&self) -> VertexId {
        self.pixel_count() + 1
    }

    /// The vertex id of the pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> VertexId {
        y * self.width + x + 1
    }

    /// The vertex id of the pixel with the given row-major index.
    pub fn pixel_id(&self, index: usize) -> VertexId {
        index + 1
    }

    /// The 2D coordinates of a pixel vertex.
    pub fn coords(&self, vertex: VertexId) -> (usize, usize) {
        let index = vertex - 1;
        (index % self.width, index / self.width)
    }

    pub fn vertex(&self, node: GridNode) -> VertexId {
        match node {
            GridNode::Source => self.source(),
            GridNode::Sink => self.sink(),
            GridNode::Pixel(index) => self.pixel_id(index),
        }
    }

    pub fn node(&self, vertex: VertexId) -> GridNode {
        if vertex == self.source() {
            GridNode::Source
        } else if vertex == self.sink() {
            GridNode::Sink
        } else {
            GridNode::Pixel(vertex - 1)
        }
    }

    /// The 4-connected neighbours of a pixel vertex, in left, up, right,
    /// down order; out-of-bounds neighbours and terminals are excluded.
    /// Non-pixel vertices have no neighbours.
    pub fn neighbours(&self, vertex: VertexId) -> Neighbours {
        if vertex < 1 || vertex > self.pixel_count() {
            return Neighbours::empty();
        }
        let (x, y) = self.coords(vertex);
        let left = (x > 0).then(|| self.pixel(x - 1, y));
        let up = (y > 0).then(|| self.pixel(x, y - 1));
        let right = (x + 1 < self.width).then(|| self.pixel(x + 1, y));
        let down = (y + 1 < self.height).then(|| self.pixel(x, y + 1));
        Neighbours {
            slots: [left, up, right, down],
            at: 0,
        }
    }
}

/// Iterator over the 4-connected neighbours of a pixel vertex.
#[derive(Clone, Debug)]
pub struct Neighbours {
    slots: [Option<VertexId>; 4],
    at: usize,
}

impl Neighbours {
    fn empty() -> Self {
        Self {
            slots: [None; 4],
            at: 4,
        }
    }
}

impl Iterator for Neighbours {
    type Item = VertexId;

    fn next(&mut self) -> Option<VertexId> {
        while self.at < self.slots.len() {
            let slot = self.slots[self.at];
            self.at += 1;
            if slot.is_some() {
                return slot;
            }
        }
        None
    }
}

/// Mean and standard deviation of a pixel population, the seed statistics
/// the likelihood weights are computed from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionStats<W> {
    pub mean: W,
    pub std_dev: W,
}

impl<W: Weight> RegionStats<W> {
    pub fn new(mean: W, std_dev: W) -> Self {
        Self { mean, std_dev }
    }

    /// Population mean and standard deviation of the samples.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = W>,
    {
        let (count, sum, sum_sq) = samples.into_iter().fold(
            (W::zero(), W::zero(), W::zero()),
            |(count, sum, sum_sq), x| (count + W::one(), sum + x, sum_sq + x * x),
        );
        if count == W::zero() {
            return Self::new(W::zero(), W::zero());
        }
        let mean = sum / count;
        let variance = (sum_sq / count - mean * mean).max(W::zero());
        Self::new(mean, variance.sqrt())
    }
}

/// The Gaussian kernel shared by both weight models. A degenerate region
/// (zero spread) matches exactly or not at all.
fn gaussian<W: Weight>(difference: W, sigma: W) -> W {
    if sigma == W::zero() {
        return if difference == W::zero() {
            W::one()
        } else {
            W::zero()
        };
    }
    let two = W::one() + W::one();
    (-(difference * difference) / (two * sigma * sigma)).exp()
}

/// Likelihood of `value` belonging to the region with the given statistics;
/// 1 at the region mean, falling off with the region's spread.
pub fn likelihood_weight<W: Weight>(value: W, stats: &RegionStats<W>) -> W {
    gaussian(stats.mean - value, stats.std_dev)
}

/// Similarity of two neighbouring intensities under the image-wide spread;
/// 1 for equal intensities.
pub fn similarity_weight<W: Weight>(a: W, b: W, image: &RegionStats<W>) -> W {
    gaussian(a - b, image.std_dev)
}

/// Builds the segmentation graph for a row-major intensity buffer.
///
/// Every pixel receives a source t-link weighted by its object likelihood
/// and a sink t-link weighted by its background likelihood; 4-connected
/// neighbours are joined by similarity n-links in both directions. The
/// n-links of a pixel are inserted right, left, down, up, with the sink
/// t-link last; this order is part of the tie-break contract.
pub fn build_grid_graph<W: Weight>(
    intensities: &[W],
    layout: GridLayout,
    object: &RegionStats<W>,
    background: &RegionStats<W>,
) -> Result<Graph<W>, Error> {
    if intensities.len() != layout.pixel_count() {
        return Err(Error::InvalidDimensions(intensities.len(), layout.width()));
    }
    let image = RegionStats::from_samples(intensities.iter().copied());
    log::debug!(
        "image stats: mean {} stdev {}, {} pixels",
        image.mean,
        image.std_dev,
        intensities.len()
    );

    let mut graph = Graph::with_capacity(layout.vertex_count());

    let source_edges: Vec<_> = intensities
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            Edge::new(
                layout.source(),
                layout.pixel_id(index),
                likelihood_weight(value, object),
            )
        })
        .collect();
    graph.add_connected_vertex(layout.source(), source_edges)?;

    let width = layout.width();
    let height = layout.height();
    for (y, x) in (0..height).cartesian_product(0..width) {
        let vertex = layout.pixel(x, y);
        let value = intensities[y * width + x];
        let mut edges = Vec::with_capacity(5);

        if x + 1 < width {
            let other = intensities[y * width + x + 1];
            edges.push(Edge::new(
                vertex,
                layout.pixel(x + 1, y),
                similarity_weight(value, other, &image),
            ));
        }
        if x > 0 {
            let other = intensities[y * width + x - 1];
            edges.push(Edge::new(
                vertex,
                layout.pixel(x - 1, y),
                similarity_weight(value, other, &image),
            ));
        }
        if y + 1 < height {
            let other = intensities[(y + 1) * width + x];
            edges.push(Edge::new(
                vertex,
                layout.pixel(x, y + 1),
                similarity_weight(value, other, &image),
            ));
        }
        if y > 0 {
            let other = intensities[(y - 1) * width + x];
            edges.push(Edge::new(
                vertex,
                layout.pixel(x, y - 1),
                similarity_weight(value, other, &image),
            ));
        }
        edges.push(Edge::new(
            vertex,
            layout.sink(),
            likelihood_weight(value, background),
        ));

        graph.add_connected_vertex(vertex, edges)?;
    }

    graph.add_vertex(layout.sink());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn layout_addresses_terminals_and_pixels() {
        let layout = GridLayout::new(3, 2);
        assert_eq!(layout.source(), 0);
        assert_eq!(layout.sink(), 7);
        assert_eq!(layout.pixel(0, 0), 1);
        assert_eq!(layout.pixel(2, 1), 6);
        assert_eq!(layout.coords(6), (2, 1));
        assert_eq!(layout.vertex(GridNode::Pixel(4)), 5);
        assert_eq!(layout.node(5), GridNode::Pixel(4));
        assert_eq!(layout.node(0), GridNode::Source);
        assert_eq!(layout.node(7), GridNode::Sink);
    }

    #[test]
    fn from_len_rejects_ragged_buffers() {
        assert_eq!(
            GridLayout::from_len(7, 3).unwrap_err(),
            Error::InvalidDimensions(7, 3)
        );
        assert_eq!(
            GridLayout::from_len(4, 0).unwrap_err(),
            Error::InvalidDimensions(4, 0)
        );
        assert_eq!(GridLayout::from_len(6, 3).unwrap(), GridLayout::new(3, 2));
    }

    #[test]
    fn neighbours_respect_grid_bounds() {
        let layout = GridLayout::new(3, 3);
        // centre pixel: left, up, right, down
        let centre: Vec<_> = layout.neighbours(layout.pixel(1, 1)).collect();
        assert_eq!(centre, vec![4, 2, 6, 8]);
        // top-left corner keeps only right and down
        let corner: Vec<_> = layout.neighbours(layout.pixel(0, 0)).collect();
        assert_eq!(corner, vec![2, 4]);
        // terminals have no grid neighbours
        assert_eq!(layout.neighbours(layout.source()).count(), 0);
        assert_eq!(layout.neighbours(layout.sink()).count(), 0);
    }

    #[test]
    fn stats_match_the_population_moments() {
        let stats = RegionStats::from_samples(vec![2.0f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std_dev - 2.0).abs() < 1e-12);

        let empty = RegionStats::<f32>::from_samples(Vec::new());
        assert_eq!(empty.mean, 0.0);
        assert_eq!(empty.std_dev, 0.0);
    }

    #[test]
    fn likelihood_peaks_at_the_region_mean() {
        let stats = RegionStats::new(10.0f32, 2.0);
        assert_eq!(likelihood_weight(10.0, &stats), 1.0);
        assert!(likelihood_weight(11.0, &stats) > likelihood_weight(14.0, &stats));
        // degenerate region: exact match or nothing
        let flat = RegionStats::new(10.0f32, 0.0);
        assert_eq!(likelihood_weight(10.0, &flat), 1.0);
        assert_eq!(likelihood_weight(10.5, &flat), 0.0);
    }

    #[test]
    fn grid_graph_has_the_canonical_shape() {
        let layout = GridLayout::new(2, 2);
        let intensities = vec![10.0f32, 20.0, 30.0, 40.0];
        let object = RegionStats::new(35.0, 5.0);
        let background = RegionStats::new(15.0, 5.0);
        let graph = build_grid_graph(&intensities, layout, &object, &background).unwrap();

        assert_eq!(graph.size(), 6);
        assert_eq!(graph.edges(layout.source()).unwrap().len(), 4);
        assert_eq!(graph.edges(layout.sink()).unwrap().len(), 0);
        // n + n t-links plus two directed n-links per adjacent pair
        assert_eq!(graph.edge_refs().count(), 16);
        // pixel (0,0): right, down, then the sink t-link
        let targets: Vec<_> = graph
            .edges(layout.pixel(0, 0))
            .unwrap()
            .iter()
            .map(Edge::target)
            .collect();
        assert_eq!(targets, vec![2, 3, 5]);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let layout = GridLayout::new(2, 2);
        let object = RegionStats::new(1.0f32, 1.0);
        let err = build_grid_graph(&[1.0, 2.0], layout, &object, &object).unwrap_err();
        assert_eq!(err, Error::InvalidDimensions(2, 2));
    }
}
