use anyhow::{bail, Result};
use indexmap::IndexMap;
use std::fmt;

/// Opaque handle for a single edge of the assembly graph.
///
/// Edges are created and owned by the assembler; the barcode index only ever
/// routes observations to them. Every edge has a conjugate (reverse
/// complement) counterpart, and the graph guarantees
/// `conjugate(conjugate(e)) == e`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only view of assembly graph topology, as far as the barcode index
/// needs it: the edge set, per-edge lengths, and the conjugate relation.
pub trait AssemblyGraph {
    /// Every edge of the graph, in a stable order.
    fn edges(&self) -> Box<dyn Iterator<Item = EdgeId> + '_>;

    /// Length of `edge` in base pairs. `edge` must belong to this graph.
    fn length(&self, edge: EdgeId) -> usize;

    /// The reverse complement counterpart of `edge`. `edge` must belong to
    /// this graph.
    fn conjugate(&self, edge: EdgeId) -> EdgeId;
}

#[derive(Clone, Copy, Debug)]
struct EdgeRecord {
    length: usize,
    conjugate: EdgeId,
}

/// In-memory snapshot of graph topology.
///
/// The real assembler hands the index its own graph type; this snapshot is a
/// small concrete implementation for tools and tests. Conjugate closure is
/// enforced at construction: edges are only ever registered in pairs.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    records: IndexMap<EdgeId, EdgeRecord>,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an edge together with its reverse complement counterpart.
    /// Both directions get the same length. A palindromic (self-conjugate)
    /// edge may be registered with `forward == reverse`.
    pub fn add_edge_pair(&mut self, forward: EdgeId, reverse: EdgeId, length: usize) -> Result<()> {
        if self.records.contains_key(&forward) || self.records.contains_key(&reverse) {
            bail!("edge {forward} or {reverse} is already present in the graph snapshot");
        }
        self.records.insert(
            forward,
            EdgeRecord {
                length,
                conjugate: reverse,
            },
        );
        if forward != reverse {
            self.records.insert(
                reverse,
                EdgeRecord {
                    length,
                    conjugate: forward,
                },
            );
        }
        Ok(())
    }

    /// Builds a snapshot from `(forward, reverse, length)` records, one per
    /// conjugate pair.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (EdgeId, EdgeId, usize)>) -> Result<Self> {
        let mut graph = Self::new();
        for (forward, reverse, length) in pairs {
            graph.add_edge_pair(forward, reverse, length)?;
        }
        Ok(graph)
    }

    /// Number of edges (conjugates counted separately).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record(&self, edge: EdgeId) -> &EdgeRecord {
        self.records
            .get(&edge)
            .unwrap_or_else(|| panic!("edge {edge} does not belong to this graph snapshot"))
    }
}

impl AssemblyGraph for GraphSnapshot {
    fn edges(&self) -> Box<dyn Iterator<Item = EdgeId> + '_> {
        Box::new(self.records.keys().copied())
    }

    fn length(&self, edge: EdgeId) -> usize {
        self.record(edge).length
    }

    fn conjugate(&self, edge: EdgeId) -> EdgeId {
        self.record(edge).conjugate
    }
}
