use crate::encoder::BarcodeEncoder;
use crate::entry::BarcodeEntry;
use crate::graph::{AssemblyGraph, EdgeId};
use crate::index::BarcodeIndex;
use crate::info::Range;
use crate::params::IndexParams;
use anyhow::Result;
use rayon::prelude::*;

/// One aligner-emitted piece of evidence: a barcode was seen `count` times
/// on `edge`, spread over `range`.
#[derive(Clone, Debug)]
pub struct BarcodeEvent {
    pub edge: EdgeId,
    pub barcode: String,
    pub count: usize,
    pub range: Range,
}

/// Drives build-phase population of a [`BarcodeIndex`]: owns the barcode
/// encoder, resolves identifiers to codes, and routes evidence to entries.
pub struct IndexBuilder<E: BarcodeEntry> {
    encoder: BarcodeEncoder,
    index: BarcodeIndex<E>,
}

impl<E: BarcodeEntry> IndexBuilder<E> {
    /// Creates a builder over a fill-mapped index for `graph`.
    pub fn new(graph: &impl AssemblyGraph, params: IndexParams) -> Self {
        let mut index = BarcodeIndex::new(params);
        index.initial_fill_map(graph);
        IndexBuilder {
            encoder: BarcodeEncoder::new(),
            index,
        }
    }

    /// Registers the event's barcode and merge-inserts its evidence.
    pub fn insert_event(&mut self, event: &BarcodeEvent) -> Result<()> {
        let code = self.encoder.add_barcode(&event.barcode);
        self.index
            .insert_barcode(event.edge, code, event.count, event.range)
    }

    /// Distinct barcodes registered so far.
    pub fn number_of_barcodes(&self) -> usize {
        self.encoder.len()
    }

    pub fn encoder(&self) -> &BarcodeEncoder {
        &self.encoder
    }

    pub fn index(&self) -> &BarcodeIndex<E> {
        &self.index
    }

    /// Filters the populated index once and hands over the results. The
    /// index is read-only from here on.
    pub fn finish(
        mut self,
        trim_threshold: usize,
        gap_threshold: usize,
    ) -> (BarcodeIndex<E>, BarcodeEncoder) {
        self.index.filter(trim_threshold, gap_threshold);
        (self.index, self.encoder)
    }
}

/// Builds an index from an event stream on a thread pool.
///
/// Codes are resolved up front so every shard shares one registry, then
/// events are sharded by edge: no two workers ever touch the same entry, and
/// the partial indices are merged after the join. Observation merge is
/// commutative and associative, so the result does not depend on shard
/// boundaries or merge order.
pub fn build_parallel<E, G>(
    graph: &G,
    params: &IndexParams,
    events: &[BarcodeEvent],
    threads: usize,
) -> Result<(BarcodeIndex<E>, BarcodeEncoder)>
where
    E: BarcodeEntry + Send,
    G: AssemblyGraph + Sync,
{
    let threads = threads.max(1);

    let mut encoder = BarcodeEncoder::new();
    let mut shards: Vec<Vec<(EdgeId, u64, usize, Range)>> = vec![Vec::new(); threads];
    for event in events {
        let code = encoder.add_barcode(&event.barcode);
        let shard = (event.edge.0 as usize) % threads;
        shards[shard].push((event.edge, code, event.count, event.range));
    }

    info!(
        "Building barcode index from {} events on {threads} threads",
        events.len()
    );

    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let partials: Vec<BarcodeIndex<E>> = pool.install(|| {
        shards
            .into_par_iter()
            .map(|shard| -> Result<BarcodeIndex<E>> {
                let mut partial = BarcodeIndex::new(params.clone());
                partial.initial_fill_map(graph);
                for (edge, code, count, range) in shard {
                    partial.insert_barcode(edge, code, count, range)?;
                }
                Ok(partial)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut index = BarcodeIndex::new(params.clone());
    index.initial_fill_map(graph);
    for partial in partials {
        index.merge_from(partial)?;
    }

    Ok((index, encoder))
}
