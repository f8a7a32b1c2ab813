use barcode_index::{
    build_parallel, AssemblyGraph, BarcodeEntry, BarcodeEvent, BarcodeInfo, EdgeId,
    FrameBarcodeIndex, FrameEdgeEntry, GraphSnapshot, IndexBuilder, IndexParams, IndexStatistics,
    Range,
};
use std::fs::File;
use std::io::{BufReader, Write};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn small_graph() -> GraphSnapshot {
    GraphSnapshot::from_pairs([
        (EdgeId(10), EdgeId(11), 5000),
        (EdgeId(20), EdgeId(21), 3000),
        (EdgeId(30), EdgeId(31), 800),
    ])
    .unwrap()
}

fn params() -> IndexParams {
    IndexParams {
        frame_size: 100,
        edge_length_threshold: 1000,
        trim_threshold: 2,
        gap_threshold: 500,
    }
}

fn aligner_events() -> Vec<BarcodeEvent> {
    vec![
        // barcode A: twice near the head of edge 10, survives filtering
        BarcodeEvent {
            edge: EdgeId(10),
            barcode: "ACGTACGT".into(),
            count: 2,
            range: Range::new(0, 150),
        },
        BarcodeEvent {
            edge: EdgeId(10),
            barcode: "ACGTACGT".into(),
            count: 1,
            range: Range::new(200, 320),
        },
        // barcode B: single observation, trimmed as noise
        BarcodeEvent {
            edge: EdgeId(10),
            barcode: "TTGGCCAA".into(),
            count: 1,
            range: Range::new(40, 90),
        },
        // barcode A again, far from the head of edge 20: dropped by the gap
        // threshold
        BarcodeEvent {
            edge: EdgeId(20),
            barcode: "ACGTACGT".into(),
            count: 5,
            range: Range::new(2200, 2400),
        },
        // barcode C on the conjugate edge 11, i.e. near the tail of edge 10
        BarcodeEvent {
            edge: EdgeId(11),
            barcode: "GGCCTTAA".into(),
            count: 4,
            range: Range::new(10, 180),
        },
        // shared barcode between edges 10 and 21
        BarcodeEvent {
            edge: EdgeId(21),
            barcode: "ACGTACGT".into(),
            count: 3,
            range: Range::new(100, 260),
        },
    ]
}

#[test]
fn frame_index_end_to_end() {
    init_logging();

    let graph = small_graph();
    let mut builder: IndexBuilder<FrameEdgeEntry> = IndexBuilder::new(&graph, params());

    for event in aligner_events() {
        builder.insert_event(&event).unwrap();
    }
    assert_eq!(builder.number_of_barcodes(), 3);

    let code_a = builder.encoder().get_code("ACGTACGT").unwrap();
    let (index, encoder) = builder.finish(2, 500);

    // barcode A survives on edge 10 with merged bucket evidence
    let entry = index.entry(EdgeId(10)).unwrap();
    assert_eq!(entry.size(), 1);
    let info = entry.get(code_a).unwrap();
    assert_eq!(info.count(), 3);
    assert_eq!(info.leftmost(), 0);
    assert_eq!(info.rightmost(), 3);

    // noise barcode B is gone, and the distant observation on edge 20 too
    assert_eq!(index.head_barcode_number(EdgeId(20)).unwrap(), 0);

    // tail of edge 10 sees barcode C through the conjugate
    assert_eq!(index.tail_barcode_number(&graph, EdgeId(10)).unwrap(), 1);

    // set overlap between edges 10 and 21 is exactly barcode A
    assert_eq!(index.intersection(EdgeId(10), EdgeId(21)).unwrap(), vec![
        code_a
    ]);
    assert_eq!(index.union_size(EdgeId(10), EdgeId(21)).unwrap(), 1);

    // all three long edges qualify for coverage
    let coverage = index.average_barcode_coverage(&graph).unwrap();
    assert!(coverage > 0.0);

    let stats = IndexStatistics::collect(&index, &graph).unwrap();
    assert_eq!(stats.entries, 6);
    assert!(stats.report().unwrap().contains("entry_size_distribution"));

    assert_eq!(encoder.len(), 3);
}

#[test]
fn frame_index_survives_a_disk_round_trip() {
    init_logging();

    let graph = small_graph();
    let mut builder: IndexBuilder<FrameEdgeEntry> = IndexBuilder::new(&graph, params());
    for event in aligner_events() {
        builder.insert_event(&event).unwrap();
    }
    let (index, _) = builder.finish(0, usize::MAX);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("barcode_index.txt");

    let mut file = File::create(&path).unwrap();
    index.write_all(&mut file).unwrap();
    file.flush().unwrap();

    let mut restored: FrameBarcodeIndex = FrameBarcodeIndex::new(params());
    restored.initial_fill_map(&graph);
    let read = restored
        .read_all(&mut BufReader::new(File::open(&path).unwrap()))
        .unwrap();

    assert_eq!(read, 6);
    for edge in graph.edges() {
        let original = index.entry(edge).unwrap();
        let roundtrip = restored.entry(edge).unwrap();
        assert_eq!(original.size(), roundtrip.size());
        for code in original.intersection(roundtrip) {
            let a = original.get(code).unwrap();
            let b = roundtrip.get(code).unwrap();
            assert_eq!(a.count(), b.count());
            assert_eq!(a.leftmost(), b.leftmost());
            assert_eq!(a.rightmost(), b.rightmost());
        }
        assert_eq!(original.intersection_size(roundtrip), original.size());
    }
}

#[test]
fn parallel_and_sequential_builds_agree_after_filtering() {
    init_logging();

    let graph = small_graph();
    let events = aligner_events();

    let mut builder: IndexBuilder<FrameEdgeEntry> = IndexBuilder::new(&graph, params());
    for event in &events {
        builder.insert_event(event).unwrap();
    }
    let (mut sequential, _) = builder.finish(2, 500);

    let (mut parallel, _) =
        build_parallel::<FrameEdgeEntry, _>(&graph, &params(), &events, 3).unwrap();
    parallel.filter(2, 500);
    sequential.filter(2, 500); // filtering twice must not change anything

    for edge in graph.edges() {
        assert_eq!(
            sequential.head_barcode_number(edge).unwrap(),
            parallel.head_barcode_number(edge).unwrap()
        );
    }
}
