use crate::entry::BarcodeEntry;
use crate::graph::AssemblyGraph;
use crate::index::{BarcodeIndex, BarcodeIndexErr};
use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary of an index's content, for logging and pipeline reports.
#[derive(Serialize, Debug)]
pub struct IndexStatistics {
    pub entries: usize,
    pub empty_entries: usize,
    pub total_observations: usize,
    /// How many entries hold exactly N barcodes, keyed by N.
    pub entry_size_distribution: BTreeMap<usize, usize>,
    /// Mean tail barcode count over long edges; absent when no edge
    /// qualifies.
    pub average_coverage: Option<f64>,
}

impl IndexStatistics {
    pub fn collect<E: BarcodeEntry>(
        index: &BarcodeIndex<E>,
        graph: &impl AssemblyGraph,
    ) -> Result<Self> {
        let sizes: Vec<usize> = index.iter().map(|(_, entry)| entry.size()).collect();

        // a graph with no long edges simply has no coverage statistic, but
        // any other failure (such as a graph/index desynchronization) is
        // fatal and must not be swallowed
        let average_coverage = match index.average_barcode_coverage(graph) {
            Ok(coverage) => Some(coverage),
            Err(e)
                if matches!(
                    e.downcast_ref::<BarcodeIndexErr>(),
                    Some(BarcodeIndexErr::NoQualifyingEdges { .. })
                ) =>
            {
                None
            }
            Err(e) => return Err(e),
        };

        Ok(IndexStatistics {
            entries: sizes.len(),
            empty_entries: sizes.iter().filter(|&&s| s == 0).count(),
            total_observations: sizes.iter().sum(),
            entry_size_distribution: sizes.iter().copied().counts().into_iter().collect(),
            average_coverage,
        })
    }

    /// Renders the statistics as pretty-printed JSON.
    pub fn report(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("could not serialize index statistics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, GraphSnapshot};
    use crate::index::ExactBarcodeIndex;
    use crate::info::Range;
    use crate::params::IndexParams;

    #[test]
    fn collects_distribution_and_coverage() {
        let graph =
            GraphSnapshot::from_pairs([(EdgeId(0), EdgeId(1), 2000), (EdgeId(2), EdgeId(3), 100)])
                .unwrap();
        let mut index = ExactBarcodeIndex::new(IndexParams::default());
        index.initial_fill_map(&graph);

        index
            .insert_barcode(EdgeId(0), 1, 2, Range::new(0, 10))
            .unwrap();
        index
            .insert_barcode(EdgeId(0), 2, 2, Range::new(0, 10))
            .unwrap();
        index
            .insert_barcode(EdgeId(1), 3, 2, Range::new(0, 10))
            .unwrap();

        let stats = IndexStatistics::collect(&index, &graph).unwrap();

        assert_eq!(stats.entries, 4);
        assert_eq!(stats.empty_entries, 2);
        assert_eq!(stats.total_observations, 3);
        assert_eq!(stats.entry_size_distribution[&0], 2);
        assert_eq!(stats.entry_size_distribution[&1], 1);
        assert_eq!(stats.entry_size_distribution[&2], 1);
        // tails of the long pair hold 1 and 2 barcodes
        assert_eq!(stats.average_coverage, Some(1.5));

        let report = stats.report().unwrap();
        assert!(report.contains("\"entries\": 4"));
    }

    #[test]
    fn no_long_edges_means_no_coverage() {
        let graph = GraphSnapshot::from_pairs([(EdgeId(0), EdgeId(1), 100)]).unwrap();
        let mut index = ExactBarcodeIndex::new(IndexParams::default());
        index.initial_fill_map(&graph);

        let stats = IndexStatistics::collect(&index, &graph).unwrap();
        assert_eq!(stats.average_coverage, None);
    }

    #[test]
    fn desynchronized_graph_is_fatal() {
        let built_on = GraphSnapshot::from_pairs([(EdgeId(0), EdgeId(1), 100)]).unwrap();
        let mut index = ExactBarcodeIndex::new(IndexParams::default());
        index.initial_fill_map(&built_on);

        // a long edge the index has never seen must surface, not become None
        let queried_with =
            GraphSnapshot::from_pairs([(EdgeId(8), EdgeId(9), 5000)]).unwrap();
        let err = IndexStatistics::collect(&index, &queried_with).unwrap_err();
        assert!(err.to_string().contains("not present in the barcode index"));
    }
}
