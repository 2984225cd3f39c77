#![no_std]
#![deny(
    warnings,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications,
    rust_2018_idioms
)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod algo;
mod edge;
mod error;
mod graph;
mod grid;
mod vertex;
mod weight;

use alloc::vec;
use alloc::vec::Vec;

pub use crate::algo::{source_partition, BoykovKolmogorov, Cut, EdmondsKarp, MinCut};
pub use crate::edge::Edge;
pub use crate::error::Error;
pub use crate::graph::Graph;
pub use crate::grid::{
    build_grid_graph, likelihood_weight, similarity_weight, GridLayout, GridNode, Neighbours,
    RegionStats,
};
pub use crate::vertex::VertexId;
pub use crate::weight::Weight;

/// Outcome of an end-to-end segmentation.
#[derive(Clone, Debug, PartialEq)]
pub struct Segmentation<W> {
    /// One label per pixel, row-major; `true` marks the object (source)
    /// side of the cut.
    pub labels: Vec<bool>,
    /// Total flow pushed, equal to the capacity of the minimum cut.
    pub max_flow: W,
    /// Augmenting paths used by the solver.
    pub augmentations: usize,
}

/// Segments a row-major intensity buffer into object and background.
///
/// Terminal-link weights come from the Gaussian likelihood of each pixel
/// under the object and background seed statistics; neighbour links from
/// intensity similarity under the image-wide spread. The minimum cut of the
/// resulting graph is the lowest-energy binary labelling.
pub fn segment<W: Weight>(
    intensities: &[W],
    width: usize,
    object: &RegionStats<W>,
    background: &RegionStats<W>,
) -> Result<Segmentation<W>, Error> {
    let layout = GridLayout::from_len(intensities.len(), width)?;
    let mut graph = build_grid_graph(intensities, layout, object, background)?;

    let solver = BoykovKolmogorov::new(&mut graph, layout.source(), layout.sink(), width)?;
    let cut = solver.min_cut()?;

    let mut labels = vec![false; intensities.len()];
    for &vertex in &cut.source_side {
        if (1..=intensities.len()).contains(&vertex) {
            labels[vertex - 1] = true;
        }
    }

    let object_pixels = labels.iter().filter(|&&l| l).count();
    log::info!(
        "segmented {} pixels: {} object, {} background, flow {}",
        labels.len(),
        object_pixels,
        labels.len() - object_pixels,
        cut.max_flow
    );

    Ok(Segmentation {
        labels,
        max_flow: cut.max_flow,
        augmentations: cut.augmentations,
    })
}
