use serde::{Deserialize, Serialize};

/// Tuning knobs for the barcode index, supplied by the surrounding pipeline
/// configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexParams {
    /// Width in base pairs of one positional bucket of a frame entry. The
    /// final bucket of an edge absorbs any remainder, so it is oversized
    /// whenever the edge length is not an exact multiple of this value.
    pub frame_size: usize,

    /// Edges longer than this take part in the average coverage statistic.
    pub edge_length_threshold: usize,

    /// Barcodes observed fewer times than this on an edge are dropped by
    /// filtering.
    pub trim_threshold: usize,

    /// Barcodes whose earliest evidence lies farther than this from the edge
    /// head are dropped by filtering.
    pub gap_threshold: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        IndexParams {
            frame_size: 100,
            edge_length_threshold: 1000,
            trim_threshold: 2,
            gap_threshold: 500,
        }
    }
}
