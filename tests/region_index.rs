use alnqc_rs::{IntervalIndex, OverlapResult, Strand};

fn spans(index: &IntervalIndex, seq: &str) -> Vec<(u32, u32)> {
    index.intervals(seq).map(|i| (i.start, i.end)).collect()
}

#[test]
fn overlapping_intervals_of_one_feature_merge() {
    let mut index = IntervalIndex::new();
    index.add_region("a", 100, 200, "chr1", Strand::Forward);
    index.add_region("a", 150, 300, "chr1", Strand::Forward);
    assert_eq!(index.len(), 1);
    assert_eq!(spans(&index, "chr1"), [(100, 300)]);
}

#[test]
fn abutting_intervals_merge() {
    let mut index = IntervalIndex::new();
    index.add_region("a", 100, 200, "chr1", Strand::Forward);
    index.add_region("a", 201, 250, "chr1", Strand::Forward);
    assert_eq!(spans(&index, "chr1"), [(100, 250)]);

    index.add_region("a", 252, 260, "chr1", Strand::Forward);
    assert_eq!(index.len(), 2);
}

#[test]
fn bridging_interval_merges_all_neighbours() {
    let mut index = IntervalIndex::new();
    index.add_region("a", 100, 150, "chr1", Strand::Forward);
    index.add_region("a", 200, 250, "chr1", Strand::Forward);
    index.add_region("a", 140, 210, "chr1", Strand::Forward);
    assert_eq!(spans(&index, "chr1"), [(100, 250)]);
}

#[test]
fn exact_duplicate_is_a_no_op() {
    let mut index = IntervalIndex::new();
    index.add_region("a", 100, 200, "chr1", Strand::Forward);
    index.add_region("a", 100, 200, "chr1", Strand::Forward);
    index.add_region("a", 120, 180, "chr1", Strand::Forward);
    assert_eq!(index.len(), 1);
    assert_eq!(spans(&index, "chr1"), [(100, 200)]);
}

#[test]
fn different_features_never_merge() {
    let mut index = IntervalIndex::new();
    index.add_region("a", 100, 200, "chr1", Strand::Forward);
    index.add_region("b", 150, 250, "chr1", Strand::Forward);
    assert_eq!(spans(&index, "chr1"), [(100, 200), (150, 250)]);
}

#[test]
fn coinciding_features_share_a_node() {
    let mut index = IntervalIndex::new();
    index.add_region("a", 100, 200, "chr1", Strand::Forward);
    index.add_region("b", 100, 200, "chr1", Strand::Reverse);
    assert_eq!(index.len(), 1);
    let node = index.intervals("chr1").next().unwrap();
    assert!(node.has_feature("a") && node.has_feature("b"));

    // Growing "a" leaves "b" alone on the old node.
    index.add_region("a", 150, 300, "chr1", Strand::Forward);
    assert_eq!(spans(&index, "chr1"), [(100, 200), (100, 300)]);
    let old = index.intervals("chr1").next().unwrap();
    assert!(!old.has_feature("a") && old.has_feature("b"));
}

#[test]
fn overlap_queries_before_and_after_indexing() {
    let mut index = IntervalIndex::new();
    index.add_region("a", 100, 200, "chr1", Strand::Forward);
    index.add_region("b", 500, 600, "chr2", Strand::Reverse);

    for _ in 0..2 {
        assert!(index.overlaps("chr1", 200, 210));
        assert!(index.overlaps("chr1", 50, 100));
        assert!(!index.overlaps("chr1", 201, 300));
        assert!(!index.overlaps("chr3", 100, 200));
        assert!(index.overlaps("chr2", 550, 551));
        index.index();
    }

    index.add_region("c", 300, 400, "chr1", Strand::Forward);
    assert!(index.overlaps("chr1", 350, 360));
}

#[test]
fn strand_aware_overlap() {
    let mut index = IntervalIndex::new();
    index.add_region("plus", 100, 200, "chr1", Strand::Forward);
    index.add_region("minus", 150, 250, "chr1", Strand::Reverse);
    index.index();

    let hit = |s, e, strand| index.overlaps_with_strand("chr1", s, e, strand);
    assert_eq!(
        hit(100, 120, Strand::Forward),
        OverlapResult { any_overlap: true, all_matching_strand: true }
    );
    assert_eq!(
        hit(100, 120, Strand::Reverse),
        OverlapResult { any_overlap: true, all_matching_strand: false }
    );
    assert_eq!(
        hit(160, 170, Strand::Forward),
        OverlapResult { any_overlap: true, all_matching_strand: false }
    );
    assert_eq!(hit(300, 400, Strand::Forward), OverlapResult::default());
}

#[test]
fn enclosing_and_sequence_names() {
    let mut index = IntervalIndex::new();
    index.add_region("a", 100, 200, "chr1", Strand::Forward);
    index.add_region("b", 150, 160, "chr1", Strand::Forward);
    index.add_region("c", 1, 5, "chrM", Strand::Forward);
    index.index();

    let names: Vec<&str> = index.sequence_names().into_iter().collect();
    assert_eq!(names, ["chr1", "chrM"]);
    assert_eq!(index.enclosing("chr1", 150, 160).len(), 2);
    assert_eq!(index.enclosing("chr1", 140, 160).len(), 1);
    assert!(index.enclosing("chr1", 190, 210).is_empty());
}
