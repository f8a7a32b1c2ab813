use anyhow::{bail, Context, Result};
use roaring::RoaringBitmap;
use std::fmt;
use thiserror::Error;

/// Half-open interval of offsets along an edge.
///
/// Merging two ranges takes their enclosing interval, not the true set
/// union: positional evidence only ever records how far the observations of
/// one barcode spread.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start must not exceed its end");
        Range { start, end }
    }

    /// Expands this range to the enclosing interval of both.
    pub fn merge(&mut self, other: &Range) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[derive(Error, Debug)]
pub enum FrameErr {
    #[error("frame {frame} is outside the declared bucket range [0, {frames})")]
    FrameOutOfRange { frame: u32, frames: u32 },

    #[error("cannot merge frame observations of different widths ({left} vs {right} frames)")]
    FrameCountMismatch { left: u32, right: u32 },
}

/// Evidence for a single barcode on a single edge.
///
/// The two implementations trade positional precision for memory: an exact
/// count-and-range record, or a fixed-width bucket bitmap. Merging is
/// commutative and associative for both kinds, so partial indices built in
/// parallel can be combined in any order.
pub trait BarcodeInfo: Clone {
    /// Total occurrence count accumulated for the barcode.
    fn count(&self) -> usize;

    /// Merges another observation of the same kind into this one.
    fn merge(&mut self, other: &Self) -> Result<()>;

    /// Single-line text form used by entry serialization.
    fn to_text(&self) -> String;

    /// Parses the text form produced by [`BarcodeInfo::to_text`].
    fn parse(text: &str) -> Result<Self>;
}

/// Exact observation: occurrence count plus the enclosing range of every
/// position the barcode was seen at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExactBarcodeInfo {
    count: usize,
    range: Range,
}

impl ExactBarcodeInfo {
    pub fn new(count: usize, range: Range) -> Self {
        ExactBarcodeInfo { count, range }
    }

    /// Merges raw evidence: counts add up, the range expands.
    pub fn update(&mut self, count: usize, range: Range) {
        self.count += count;
        self.range.merge(&range);
    }

    pub fn range(&self) -> Range {
        self.range
    }
}

impl BarcodeInfo for ExactBarcodeInfo {
    fn count(&self) -> usize {
        self.count
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        self.update(other.count, other.range);
        Ok(())
    }

    fn to_text(&self) -> String {
        format!("{} {} {}", self.count, self.range.start, self.range.end)
    }

    fn parse(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        let [count, start, end] = fields.as_slice() else {
            bail!("expected `<count> <start> <end>`, got `{text}`");
        };
        let count = count.parse().context("invalid count")?;
        let start = start.parse().context("invalid range start")?;
        let end = end.parse().context("invalid range end")?;
        Ok(ExactBarcodeInfo::new(count, Range::new(start, end)))
    }
}

/// Approximate observation: the edge is split into a fixed number of buckets
/// ("frames") at entry construction time, and only bucket presence is kept.
///
/// An empty observation carries the sentinel `leftmost == number_of_frames`
/// and `rightmost == 0`, matching the bucket count it was sized for.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBarcodeInfo {
    count: usize,
    frames: RoaringBitmap,
    leftmost: u32,
    rightmost: u32,
    number_of_frames: u32,
}

impl FrameBarcodeInfo {
    pub fn new(number_of_frames: u32) -> Self {
        FrameBarcodeInfo {
            count: 0,
            frames: RoaringBitmap::new(),
            leftmost: number_of_frames,
            rightmost: 0,
            number_of_frames,
        }
    }

    /// Merges raw evidence covering buckets `left_frame..=right_frame`.
    ///
    /// A bucket index at or past the declared bucket count is rejected with
    /// [`FrameErr::FrameOutOfRange`] rather than silently extending the
    /// bitmap.
    pub fn update(&mut self, count: usize, left_frame: u32, right_frame: u32) -> Result<()> {
        debug_assert!(left_frame <= right_frame);
        if right_frame >= self.number_of_frames {
            bail!(FrameErr::FrameOutOfRange {
                frame: right_frame,
                frames: self.number_of_frames,
            });
        }
        self.count += count;
        self.frames.insert_range(left_frame..=right_frame);
        self.leftmost = self.leftmost.min(left_frame);
        self.rightmost = self.rightmost.max(right_frame);
        Ok(())
    }

    /// First bucket the barcode was seen in; `number_of_frames` if none.
    pub fn leftmost(&self) -> u32 {
        self.leftmost
    }

    /// Last bucket the barcode was seen in; 0 if none.
    pub fn rightmost(&self) -> u32 {
        self.rightmost
    }

    pub fn number_of_frames(&self) -> u32 {
        self.number_of_frames
    }

    pub fn is_set(&self, frame: u32) -> bool {
        self.frames.contains(frame)
    }
}

impl BarcodeInfo for FrameBarcodeInfo {
    fn count(&self) -> usize {
        self.count
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        if self.number_of_frames != other.number_of_frames {
            bail!(FrameErr::FrameCountMismatch {
                left: self.number_of_frames,
                right: other.number_of_frames,
            });
        }
        self.count += other.count;
        self.frames |= &other.frames;
        self.leftmost = self.leftmost.min(other.leftmost);
        self.rightmost = self.rightmost.max(other.rightmost);
        Ok(())
    }

    fn to_text(&self) -> String {
        let bits: String = (0..self.number_of_frames)
            .map(|frame| if self.frames.contains(frame) { '1' } else { '0' })
            .collect();
        format!("{} {}", self.count, bits)
    }

    fn parse(text: &str) -> Result<Self> {
        let Some((count, bits)) = text.split_once(' ') else {
            bail!("expected `<count> <bitstring>`, got `{text}`");
        };
        let count = count.parse().context("invalid count")?;
        if bits.is_empty() {
            bail!("empty frame bitstring");
        }

        let mut frames = RoaringBitmap::new();
        for (i, c) in bits.chars().enumerate() {
            match c {
                '1' => {
                    frames.insert(i as u32);
                }
                '0' => {}
                other => bail!("invalid character `{other}` in frame bitstring"),
            }
        }

        let number_of_frames = bits.len() as u32;
        // leftmost and rightmost are not persisted; recompute from the bits
        let leftmost = frames.min().unwrap_or(number_of_frames);
        let rightmost = frames.max().unwrap_or(0);

        Ok(FrameBarcodeInfo {
            count,
            frames,
            leftmost,
            rightmost,
            number_of_frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_merge_expands_range_and_sums_counts() {
        let mut a = ExactBarcodeInfo::new(2, Range::new(0, 10));
        let b = ExactBarcodeInfo::new(3, Range::new(5, 15));

        a.merge(&b).unwrap();

        assert_eq!(a.count(), 5);
        assert_eq!(a.range(), Range::new(0, 15));
    }

    #[test]
    fn exact_text_round_trip() {
        let info = ExactBarcodeInfo::new(5, Range::new(0, 12));
        assert_eq!(info.to_text(), "5 0 12");
        assert_eq!(ExactBarcodeInfo::parse("5 0 12").unwrap(), info);
    }

    #[test]
    fn frame_update_sets_bucket_span() {
        let mut info = FrameBarcodeInfo::new(5);
        info.update(3, 2, 4).unwrap();

        assert_eq!(info.count(), 3);
        assert_eq!(info.leftmost(), 2);
        assert_eq!(info.rightmost(), 4);
        assert!(!info.is_set(1));
        assert!(info.is_set(2));
        assert!(info.is_set(3));
        assert!(info.is_set(4));
    }

    #[test]
    fn frame_out_of_range_rejected() {
        let mut info = FrameBarcodeInfo::new(5);
        let err = info.update(1, 5, 5).unwrap_err();
        assert!(err.to_string().contains("[0, 5)"));
        // the failed update must not leave partial evidence behind
        assert_eq!(info.count(), 0);
    }

    #[test]
    fn frame_merge_width_mismatch_rejected() {
        let mut a = FrameBarcodeInfo::new(4);
        let b = FrameBarcodeInfo::new(5);
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn frame_text_round_trip_recomputes_extremes() {
        let mut info = FrameBarcodeInfo::new(6);
        info.update(7, 1, 3).unwrap();

        let text = info.to_text();
        assert_eq!(text, "7 011100");

        let parsed = FrameBarcodeInfo::parse(&text).unwrap();
        assert_eq!(parsed, info);
        assert_eq!(parsed.leftmost(), 1);
        assert_eq!(parsed.rightmost(), 3);
    }

    #[test]
    fn frame_parse_rejects_garbage() {
        assert!(FrameBarcodeInfo::parse("3").is_err());
        assert!(FrameBarcodeInfo::parse("3 01x0").is_err());
        assert!(FrameBarcodeInfo::parse("x 0110").is_err());
    }

    #[test]
    fn empty_frame_info_has_sentinel_extremes() {
        let info = FrameBarcodeInfo::new(8);
        assert_eq!(info.leftmost(), 8);
        assert_eq!(info.rightmost(), 0);
        assert_eq!(info.count(), 0);
    }
}
