use crate::entry::{BarcodeEntry, ExactEdgeEntry, FrameEdgeEntry};
use crate::graph::{AssemblyGraph, EdgeId};
use crate::info::{BarcodeInfo, Range};
use crate::params::IndexParams;
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BarcodeIndexErr {
    #[error(
        "edge {0} is not present in the barcode index; \
         the index and the graph snapshot have desynchronized"
    )]
    UnknownEdge(EdgeId),

    #[error("no edges longer than {threshold} bp: average barcode coverage is undefined")]
    NoQualifyingEdges { threshold: usize },

    #[error("malformed entry input at `{line}`: {reason}")]
    Parse { line: String, reason: String },
}

/// Top-level index holding one entry per graph edge.
///
/// The index stores only head-orientation evidence: barcodes near the tail
/// of an edge are, by construction, the barcodes near the head of its
/// conjugate, so tail queries are routed through the conjugate rather than
/// stored twice.
///
/// Lifecycle: construct, [`initial_fill_map`](Self::initial_fill_map) once,
/// merge-insert during the build phase, [`filter`](Self::filter) once, then
/// query/serialize only. The build phase offers no internal synchronization;
/// concurrent writers must own disjoint edges (see
/// [`build_parallel`](crate::build::build_parallel)) and merge partial
/// indices after a join.
pub struct BarcodeIndex<E: BarcodeEntry> {
    entries: IndexMap<EdgeId, E>,
    params: IndexParams,
}

/// Index with exact positional evidence.
pub type ExactBarcodeIndex = BarcodeIndex<ExactEdgeEntry>;
/// Index with bucketed positional evidence.
pub type FrameBarcodeIndex = BarcodeIndex<FrameEdgeEntry>;

impl<E: BarcodeEntry> BarcodeIndex<E> {
    pub fn new(params: IndexParams) -> Self {
        BarcodeIndex {
            entries: IndexMap::new(),
            params,
        }
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    /// Creates one empty entry per graph edge.
    ///
    /// Must run exactly once, before any insert or query, against the same
    /// graph snapshot every other operation will use. Re-running discards
    /// all accumulated state; nothing guards against that internally.
    pub fn initial_fill_map(&mut self, graph: &impl AssemblyGraph) {
        self.entries.clear();
        for edge in graph.edges() {
            let entry = E::new_for_edge(edge, graph.length(edge), &self.params);
            self.entries.insert(edge, entry);
        }
        info!(
            "Filled barcode index with {} empty entries",
            self.entries.len()
        );
    }

    /// Number of entries (equals the number of graph edges after
    /// [`initial_fill_map`](Self::initial_fill_map)).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has zero entries. Distinct from "every entry is
    /// empty": a populated index of empty entries is not empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &E)> + '_ {
        self.entries.iter().map(|(edge, entry)| (*edge, entry))
    }

    /// Head-orientation entry for `edge`.
    pub fn entry(&self, edge: EdgeId) -> Result<&E> {
        self.entries
            .get(&edge)
            .ok_or_else(|| BarcodeIndexErr::UnknownEdge(edge).into())
    }

    fn entry_mut(&mut self, edge: EdgeId) -> Result<&mut E> {
        self.entries
            .get_mut(&edge)
            .ok_or_else(|| BarcodeIndexErr::UnknownEdge(edge).into())
    }

    /// Tail-orientation entry for `edge`: the head entry of its conjugate.
    pub fn tail_entry(&self, graph: &impl AssemblyGraph, edge: EdgeId) -> Result<&E> {
        self.entry(graph.conjugate(edge))
    }

    /// Merge-inserts raw aligner evidence into the entry of `edge`.
    pub fn insert_barcode(
        &mut self,
        edge: EdgeId,
        code: u64,
        count: usize,
        range: Range,
    ) -> Result<()> {
        self.entry_mut(edge)?.insert_barcode(code, count, range)
    }

    /// Merge-inserts a fully formed observation into the entry of `edge`.
    pub fn insert_info(&mut self, edge: EdgeId, code: u64, info: E::Info) -> Result<()> {
        self.entry_mut(edge)?.insert_info(code, info)
    }

    /// Number of barcodes observed near the head of `edge`.
    pub fn head_barcode_number(&self, edge: EdgeId) -> Result<usize> {
        Ok(self.entry(edge)?.size())
    }

    /// Number of barcodes observed near the tail of `edge`.
    pub fn tail_barcode_number(&self, graph: &impl AssemblyGraph, edge: EdgeId) -> Result<usize> {
        Ok(self.tail_entry(graph, edge)?.size())
    }

    /// Barcode codes shared by the head entries of two edges.
    pub fn intersection(&self, first: EdgeId, second: EdgeId) -> Result<Vec<u64>> {
        Ok(self.entry(first)?.intersection(self.entry(second)?))
    }

    pub fn intersection_size(&self, first: EdgeId, second: EdgeId) -> Result<usize> {
        Ok(self.entry(first)?.intersection_size(self.entry(second)?))
    }

    pub fn union_size(&self, first: EdgeId, second: EdgeId) -> Result<usize> {
        Ok(self.entry(first)?.union_size(self.entry(second)?))
    }

    /// Mean tail barcode count over edges longer than the configured
    /// length threshold.
    ///
    /// Fails with [`BarcodeIndexErr::NoQualifyingEdges`] when no edge
    /// qualifies instead of dividing by zero.
    pub fn average_barcode_coverage(&self, graph: &impl AssemblyGraph) -> Result<f64> {
        let threshold = self.params.edge_length_threshold;
        let mut barcodes_overall = 0usize;
        let mut long_edges = 0usize;

        for edge in graph.edges() {
            if graph.length(edge) > threshold {
                long_edges += 1;
                barcodes_overall += self.tail_barcode_number(graph, edge)?;
            }
        }

        if long_edges == 0 {
            bail!(BarcodeIndexErr::NoQualifyingEdges { threshold });
        }

        debug!("{barcodes_overall} barcodes across {long_edges} long edges");
        Ok(barcodes_overall as f64 / long_edges as f64)
    }

    /// Irreversibly prunes low-confidence observations from every entry.
    /// Idempotent for fixed thresholds, and only ever shrinks entries.
    pub fn filter(&mut self, trim_threshold: usize, gap_threshold: usize) {
        let before: usize = self.entries.values().map(E::size).sum();
        for entry in self.entries.values_mut() {
            entry.filter(trim_threshold, gap_threshold);
        }
        let after: usize = self.entries.values().map(E::size).sum();
        info!("Filtered barcode index: {before} -> {after} observations");
    }

    /// Entry-wise merge of a partial index built over the same graph
    /// snapshot and parameters.
    pub fn merge_from(&mut self, other: Self) -> Result<()> {
        for (edge, entry) in other.entries {
            match self.entries.get_mut(&edge) {
                Some(existing) => existing.merge_from(&entry)?,
                None => {
                    self.entries.insert(edge, entry);
                }
            }
        }
        Ok(())
    }

    /// Writes the head-orientation entry of `edge` in the persisted layout:
    /// an edge identifier line, a distribution size line, then one
    /// `<code> <observation>` line per barcode.
    pub fn write_entry(&self, writer: &mut impl Write, edge: EdgeId) -> Result<()> {
        let entry = self.entry(edge)?;
        writeln!(writer, "{edge}")?;
        entry.write_distribution(writer)
    }

    /// Writes every entry, in map order.
    pub fn write_all(&self, writer: &mut impl Write) -> Result<()> {
        for edge in self.entries.keys() {
            self.write_entry(writer, *edge)?;
        }
        debug!("Serialized {} entries", self.entries.len());
        Ok(())
    }

    /// Reads one entry block and merge-inserts its observations into the
    /// matching (already fill-mapped) entry. Returns the edge read, or
    /// `None` on clean end of input.
    pub fn read_entry(&mut self, reader: &mut impl BufRead) -> Result<Option<EdgeId>> {
        let Some(id_line) = next_line(reader)? else {
            return Ok(None);
        };
        let edge = EdgeId(parse_field(&id_line, "edge identifier")?);

        let size_line = next_line(reader)?
            .ok_or_else(|| parse_err(&id_line, "missing distribution size line"))?;
        let size: usize = parse_field(&size_line, "distribution size")?;

        for _ in 0..size {
            let line = next_line(reader)?
                .ok_or_else(|| parse_err(&size_line, "entry shorter than its declared size"))?;

            let Some((code, text)) = line.split_once(' ') else {
                bail!(parse_err(&line, "expected `<code> <observation>`"));
            };
            let code: u64 =
                parse_field(code, "barcode code").map_err(|e| parse_err(&line, &e.to_string()))?;
            let info = E::Info::parse(text).map_err(|e| parse_err(&line, &e.to_string()))?;

            self.insert_info(edge, code, info)?;
        }

        Ok(Some(edge))
    }

    /// Reads entry blocks until end of input; returns how many were read.
    pub fn read_all(&mut self, reader: &mut impl BufRead) -> Result<usize> {
        let mut read = 0;
        while self.read_entry(reader)?.is_some() {
            read += 1;
        }
        debug!("Deserialized {read} entries");
        Ok(read)
    }
}

fn next_line(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .context("could not read entry input")?;
        if bytes == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| parse_err(field, &format!("invalid {what}")).into())
}

fn parse_err(line: &str, reason: &str) -> BarcodeIndexErr {
    BarcodeIndexErr::Parse {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}
