use crate::graph::EdgeId;
use crate::info::{BarcodeInfo, ExactBarcodeInfo, FrameBarcodeInfo, FrameErr, Range};
use crate::params::IndexParams;
use anyhow::{bail, Result};
use indexmap::map::Entry as MapEntry;
use indexmap::IndexMap;
use std::io::Write;

/// Barcode code to observation mapping shared by both entry kinds.
///
/// Kept crate-private so collaborators can only reach the entry operations,
/// never the raw map.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Distribution<I: BarcodeInfo> {
    map: IndexMap<u64, I>,
}

impl<I: BarcodeInfo> Default for Distribution<I> {
    fn default() -> Self {
        Distribution {
            map: IndexMap::new(),
        }
    }
}

impl<I: BarcodeInfo> Distribution<I> {
    fn size(&self) -> usize {
        self.map.len()
    }

    fn get(&self, code: u64) -> Option<&I> {
        self.map.get(&code)
    }

    /// Merge-insert: a code seen before merges, a fresh code inserts.
    fn insert_info(&mut self, code: u64, info: I) -> Result<()> {
        match self.map.entry(code) {
            MapEntry::Occupied(mut occupied) => occupied.get_mut().merge(&info),
            MapEntry::Vacant(vacant) => {
                vacant.insert(info);
                Ok(())
            }
        }
    }

    fn intersection(&self, other: &Self) -> Vec<u64> {
        self.map
            .keys()
            .filter(|code| other.map.contains_key(*code))
            .copied()
            .collect()
    }

    fn intersection_size(&self, other: &Self) -> usize {
        self.map
            .keys()
            .filter(|code| other.map.contains_key(*code))
            .count()
    }

    fn retain(&mut self, keep: impl FnMut(&u64, &mut I) -> bool) {
        self.map.retain(keep);
    }

    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writeln!(writer, "{}", self.map.len())?;
        for (code, info) in &self.map {
            writeln!(writer, "{} {}", code, info.to_text())?;
        }
        Ok(())
    }
}

/// Per-edge record mapping barcode codes to observations.
///
/// The two implementations differ only in observation representation and in
/// the positional half of the filter predicate; everything a collaborator
/// may do to an entry goes through this trait.
pub trait BarcodeEntry: Sized {
    type Info: BarcodeInfo;

    /// Creates an empty entry for `edge`. Frame entries size their bucket
    /// count here, from the edge length and the configured frame size.
    fn new_for_edge(edge: EdgeId, edge_length: usize, params: &IndexParams) -> Self;

    /// The edge this entry belongs to.
    fn edge(&self) -> EdgeId;

    /// Number of distinct barcodes recorded.
    fn size(&self) -> usize;

    /// Observation recorded for `code`, if any.
    fn get(&self, code: u64) -> Option<&Self::Info>;

    /// Merge-inserts raw aligner evidence for one barcode.
    fn insert_barcode(&mut self, code: u64, count: usize, range: Range) -> Result<()>;

    /// Merge-inserts a fully formed observation (deserialization and
    /// cross-entry merges).
    fn insert_info(&mut self, code: u64, info: Self::Info) -> Result<()>;

    /// Barcode codes present in both entries, in no particular order.
    fn intersection(&self, other: &Self) -> Vec<u64>;

    fn intersection_size(&self, other: &Self) -> usize;

    /// `|self| + |other| - |self ∩ other|`; the union is never materialized.
    fn union_size(&self, other: &Self) -> usize {
        self.size() + other.size() - self.intersection_size(other)
    }

    /// Irreversibly drops every barcode observed fewer than `trim_threshold`
    /// times or whose earliest evidence lies farther than `gap_threshold`
    /// from the edge head.
    fn filter(&mut self, trim_threshold: usize, gap_threshold: usize);

    /// Merges every observation of `other` into this entry.
    fn merge_from(&mut self, other: &Self) -> Result<()>;

    /// Writes the distribution block: a size line followed by one
    /// `<code> <observation>` line per barcode.
    fn write_distribution(&self, writer: &mut impl Write) -> Result<()>;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// Entry kind with exact positional evidence per barcode.
#[derive(Clone, Debug, PartialEq)]
pub struct ExactEdgeEntry {
    edge: EdgeId,
    distribution: Distribution<ExactBarcodeInfo>,
}

impl BarcodeEntry for ExactEdgeEntry {
    type Info = ExactBarcodeInfo;

    fn new_for_edge(edge: EdgeId, _edge_length: usize, _params: &IndexParams) -> Self {
        ExactEdgeEntry {
            edge,
            distribution: Distribution::default(),
        }
    }

    fn edge(&self) -> EdgeId {
        self.edge
    }

    fn size(&self) -> usize {
        self.distribution.size()
    }

    fn get(&self, code: u64) -> Option<&Self::Info> {
        self.distribution.get(code)
    }

    fn insert_barcode(&mut self, code: u64, count: usize, range: Range) -> Result<()> {
        self.distribution
            .insert_info(code, ExactBarcodeInfo::new(count, range))
    }

    fn insert_info(&mut self, code: u64, info: Self::Info) -> Result<()> {
        self.distribution.insert_info(code, info)
    }

    fn intersection(&self, other: &Self) -> Vec<u64> {
        self.distribution.intersection(&other.distribution)
    }

    fn intersection_size(&self, other: &Self) -> usize {
        self.distribution.intersection_size(&other.distribution)
    }

    fn filter(&mut self, trim_threshold: usize, gap_threshold: usize) {
        self.distribution.retain(|_, info| {
            info.count() >= trim_threshold && info.range().start <= gap_threshold
        });
    }

    fn merge_from(&mut self, other: &Self) -> Result<()> {
        for (code, info) in &other.distribution.map {
            self.distribution.insert_info(*code, info.clone())?;
        }
        Ok(())
    }

    fn write_distribution(&self, writer: &mut impl Write) -> Result<()> {
        self.distribution.write(writer)
    }
}

/// Entry kind approximating positions with fixed-width buckets.
///
/// The bucket count is fixed at construction as
/// `edge_length / frame_size + 1`: the last bucket absorbs the remainder and
/// is oversized whenever the edge length is not a multiple of the frame
/// size.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameEdgeEntry {
    edge: EdgeId,
    distribution: Distribution<FrameBarcodeInfo>,
    edge_length: usize,
    frame_size: usize,
    number_of_frames: u32,
}

impl FrameEdgeEntry {
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn number_of_frames(&self) -> u32 {
        self.number_of_frames
    }

    fn frame_of(&self, pos: usize) -> u32 {
        (pos / self.frame_size) as u32
    }
}

impl BarcodeEntry for FrameEdgeEntry {
    type Info = FrameBarcodeInfo;

    fn new_for_edge(edge: EdgeId, edge_length: usize, params: &IndexParams) -> Self {
        assert!(params.frame_size > 0, "frame size must be positive");
        FrameEdgeEntry {
            edge,
            distribution: Distribution::default(),
            edge_length,
            frame_size: params.frame_size,
            number_of_frames: (edge_length / params.frame_size + 1) as u32,
        }
    }

    fn edge(&self) -> EdgeId {
        self.edge
    }

    fn size(&self) -> usize {
        self.distribution.size()
    }

    fn get(&self, code: u64) -> Option<&Self::Info> {
        self.distribution.get(code)
    }

    fn insert_barcode(&mut self, code: u64, count: usize, range: Range) -> Result<()> {
        let left_frame = self.frame_of(range.start);
        let right_frame = self.frame_of(range.end);

        let mut info = FrameBarcodeInfo::new(self.number_of_frames);
        info.update(count, left_frame, right_frame)?;
        self.distribution.insert_info(code, info)
    }

    fn insert_info(&mut self, code: u64, info: Self::Info) -> Result<()> {
        // an observation sized for a different bucket count would corrupt
        // the entry's frame-width invariant; deserialization relies on this
        // check to reject wrong-width bitstrings
        if info.number_of_frames() != self.number_of_frames {
            bail!(FrameErr::FrameCountMismatch {
                left: self.number_of_frames,
                right: info.number_of_frames(),
            });
        }
        self.distribution.insert_info(code, info)
    }

    fn intersection(&self, other: &Self) -> Vec<u64> {
        self.distribution.intersection(&other.distribution)
    }

    fn intersection_size(&self, other: &Self) -> usize {
        self.distribution.intersection_size(&other.distribution)
    }

    fn filter(&mut self, trim_threshold: usize, gap_threshold: usize) {
        let gap_frames = gap_threshold / self.frame_size;
        self.distribution
            .retain(|_, info| info.count() >= trim_threshold && info.leftmost() as usize <= gap_frames);
    }

    fn merge_from(&mut self, other: &Self) -> Result<()> {
        for (code, info) in &other.distribution.map {
            self.insert_info(*code, info.clone())?;
        }
        Ok(())
    }

    fn write_distribution(&self, writer: &mut impl Write) -> Result<()> {
        self.distribution.write(writer)
    }
}
