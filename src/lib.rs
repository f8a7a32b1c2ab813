//! In-memory barcode index for linked-read scaffolding.
//!
//! Barcode-tagged ("linked") reads aligned near the endpoints of assembly
//! graph edges are the evidence a scaffolder uses to join edges into longer
//! contigs. This crate maintains that evidence: for every edge it keeps a
//! compact, mergeable record of which barcodes were observed near the edge
//! head, with positional information in one of two representations:
//! exact ranges ([`ExactBarcodeIndex`]) or fixed-width position buckets
//! ([`FrameBarcodeIndex`]).
//!
//! Typical flow: fill the index with one empty entry per edge, stream
//! aligner events into it (optionally sharded across threads with
//! [`build_parallel`]), filter out low-confidence observations once, then
//! query barcode counts and pairwise set overlap between edges, or persist
//! entries as text.

#[macro_use]
extern crate log;

pub mod build;
pub mod encoder;
pub mod entry;
pub mod graph;
pub mod index;
pub mod info;
pub mod params;
pub mod stats;

pub use build::{build_parallel, BarcodeEvent, IndexBuilder};
pub use encoder::{BarcodeEncoder, UnknownBarcode};
pub use entry::{BarcodeEntry, ExactEdgeEntry, FrameEdgeEntry};
pub use graph::{AssemblyGraph, EdgeId, GraphSnapshot};
pub use index::{BarcodeIndex, BarcodeIndexErr, ExactBarcodeIndex, FrameBarcodeIndex};
pub use info::{BarcodeInfo, ExactBarcodeInfo, FrameBarcodeInfo, FrameErr, Range};
pub use params::IndexParams;
pub use stats::IndexStatistics;
