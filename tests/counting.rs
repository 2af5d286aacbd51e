use alnqc_rs::{
    AlignedRead, Assignment, CountingAlgorithm, IntervalIndex, LibraryProtocol, ReadCounter, Strand,
};
use noodles::sam::alignment::record::cigar::{op::Kind, Op};
use noodles::sam::alignment::record::Flags;

fn gene_index() -> IntervalIndex {
    let mut index = IntervalIndex::new();
    index.add_region("G1", 100, 150, "chr1", Strand::Forward);
    index.add_region("G1", 200, 250, "chr1", Strand::Forward);
    index.add_region("G2", 1000, 1100, "chr1", Strand::Reverse);
    index.add_region("G3", 1050, 1200, "chr1", Strand::Forward);
    index.index();
    index
}

fn read(start: u32, cigar: &[(Kind, usize)], flags: Flags) -> AlignedRead {
    let ops: Vec<Op> = cigar.iter().map(|&(k, n)| Op::new(k, n)).collect();
    AlignedRead::new("r", "chr1", start, flags, ops, Vec::new())
}

#[test]
fn spliced_read_inside_exons_counts_for_gene() {
    let index = gene_index();
    let mut counter = ReadCounter::new(LibraryProtocol::NonStrandSpecific, CountingAlgorithm::UniquelyMapped);
    let spliced = read(120, &[(Kind::Match, 31), (Kind::Skip, 49), (Kind::Match, 20)], Flags::empty());
    assert_eq!(counter.count(&index, &spliced), Assignment::Gene("G1".into()));
    assert_eq!(counter.counts().per_gene.get("G1"), Some(&1.0));
}

#[test]
fn blocks_must_be_enclosed() {
    let index = gene_index();
    let mut counter = ReadCounter::new(LibraryProtocol::NonStrandSpecific, CountingAlgorithm::UniquelyMapped);
    let crossing = read(140, &[(Kind::Match, 21)], Flags::empty());
    assert_eq!(counter.count(&index, &crossing), Assignment::NoFeature);
    let intronic = read(160, &[(Kind::Match, 10)], Flags::empty());
    assert_eq!(counter.count(&index, &intronic), Assignment::NoFeature);
    assert_eq!(counter.counts().no_feature, 2);
}

#[test]
fn overlapping_genes_are_ambiguous_unless_strand_decides() {
    let index = gene_index();
    let shared = read(1060, &[(Kind::Match, 20)], Flags::empty());

    let mut plain = ReadCounter::new(LibraryProtocol::NonStrandSpecific, CountingAlgorithm::UniquelyMapped);
    assert_eq!(plain.count(&index, &shared), Assignment::Ambiguous);

    let mut forward = ReadCounter::new(LibraryProtocol::StrandSpecificForward, CountingAlgorithm::UniquelyMapped);
    assert_eq!(forward.count(&index, &shared), Assignment::Gene("G3".into()));

    let mut reverse = ReadCounter::new(LibraryProtocol::StrandSpecificReverse, CountingAlgorithm::UniquelyMapped);
    assert_eq!(reverse.count(&index, &shared), Assignment::Gene("G2".into()));
}

#[test]
fn multi_mapped_reads_follow_the_algorithm() {
    let index = gene_index();
    let multi = read(100, &[(Kind::Match, 30)], Flags::empty()).with_hit_count(4);

    let mut unique = ReadCounter::new(LibraryProtocol::NonStrandSpecific, CountingAlgorithm::UniquelyMapped);
    assert_eq!(unique.count(&index, &multi), Assignment::NotUnique);
    assert_eq!(unique.counts().alignment_not_unique, 1);

    let mut proportional = ReadCounter::new(LibraryProtocol::NonStrandSpecific, CountingAlgorithm::Proportional);
    proportional.count(&index, &multi);
    proportional.count(&index, &multi);
    assert_eq!(proportional.counts().per_gene.get("G1"), Some(&0.5));
}

#[test]
fn unmapped_reads_are_not_aligned() {
    let index = gene_index();
    let mut counter = ReadCounter::new(LibraryProtocol::NonStrandSpecific, CountingAlgorithm::UniquelyMapped);
    let unmapped = read(0, &[], Flags::UNMAPPED);
    assert_eq!(counter.count(&index, &unmapped), Assignment::NotAligned);
    assert_eq!(counter.into_counts().not_aligned, 1);
}

#[test]
fn protocol_expected_strand() {
    let first = Flags::SEGMENTED | Flags::FIRST_SEGMENT;
    let second_rev = Flags::SEGMENTED | Flags::LAST_SEGMENT | Flags::REVERSE_COMPLEMENTED;

    assert_eq!(LibraryProtocol::NonStrandSpecific.expected_strand(first), None);
    assert_eq!(LibraryProtocol::StrandSpecificForward.expected_strand(first), Some(Strand::Forward));
    assert_eq!(LibraryProtocol::StrandSpecificForward.expected_strand(second_rev), Some(Strand::Forward));
    assert_eq!(LibraryProtocol::StrandSpecificReverse.expected_strand(first), Some(Strand::Reverse));
    assert_eq!(
        LibraryProtocol::StrandSpecificReverse.expected_strand(Flags::REVERSE_COMPLEMENTED),
        Some(Strand::Forward)
    );
}

#[test]
fn shard_counts_merge() {
    let index = gene_index();
    let mut a = ReadCounter::new(LibraryProtocol::NonStrandSpecific, CountingAlgorithm::UniquelyMapped);
    let mut b = ReadCounter::new(LibraryProtocol::NonStrandSpecific, CountingAlgorithm::UniquelyMapped);
    a.count(&index, &read(100, &[(Kind::Match, 30)], Flags::empty()));
    b.count(&index, &read(210, &[(Kind::Match, 30)], Flags::empty()));
    b.count(&index, &read(160, &[(Kind::Match, 10)], Flags::empty()));

    let mut merged = a.into_counts();
    merged.merge(b.counts());
    assert_eq!(merged.per_gene.get("G1"), Some(&2.0));
    assert_eq!(merged.no_feature, 1);
    assert_eq!(merged.assigned(), 2.0);
}
