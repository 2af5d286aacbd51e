use alnqc_rs::{AlignedRead, AlignmentPairTracker};
use noodles::sam::alignment::record::cigar::{op::Kind, Op};
use noodles::sam::alignment::record::Flags;

fn read(name: &str, chrom: &str, start: u32, len: usize, flags: Flags) -> AlignedRead {
    AlignedRead::new(name, chrom, start, flags, vec![Op::new(Kind::Match, len)], vec![b'A'; len])
}

fn mate1() -> Flags {
    Flags::SEGMENTED | Flags::FIRST_SEGMENT
}

fn mate2() -> Flags {
    Flags::SEGMENTED | Flags::LAST_SEGMENT | Flags::REVERSE_COMPLEMENTED
}

#[test]
fn overlapping_mates_on_one_chromosome() {
    let mut tracker = AlignmentPairTracker::new(true);
    tracker.update_stats(&read("p1", "chr1", 1, 100, mate1()));
    tracker.update_stats(&read("p1", "chr1", 90, 100, mate2()));
    let stats = tracker.finish();
    assert_eq!(stats.overlapping_pairs, 1);
    assert_eq!(stats.overlapping_bases, 11);
}

#[test]
fn mates_on_different_chromosomes_never_overlap() {
    let mut tracker = AlignmentPairTracker::new(true);
    tracker.update_stats(&read("p1", "chr1", 1, 100, mate1()));
    tracker.update_stats(&read("p1", "chr2", 90, 100, mate2()));
    let stats = tracker.finish();
    assert_eq!(stats.overlapping_pairs, 0);
    assert_eq!(stats.overlapping_bases, 0);
}

#[test]
fn chromosome_change_finalizes_pending_pairs() {
    let mut tracker = AlignmentPairTracker::new(true);
    tracker.update_stats(&read("p1", "chr1", 1, 100, mate1()));
    tracker.update_stats(&read("p1", "chr1", 51, 100, mate2()));
    tracker.update_stats(&read("p2", "chr1", 500, 50, mate1()));
    tracker.update_stats(&read("p2", "chr1", 600, 50, mate2()));
    tracker.update_stats(&read("p3", "chr2", 10, 50, mate1()));
    assert_eq!(tracker.stats().overlapping_pairs, 1);
    assert_eq!(tracker.stats().overlapping_bases, 50);
}

#[test]
fn flag_counters() {
    let mut tracker = AlignmentPairTracker::new(false);
    assert!(!tracker.update_stats(&read("a", "chr1", 1, 10, mate1())));
    tracker.update_stats(&read("b", "chr1", 5, 10, mate2() | Flags::MATE_UNMAPPED));
    assert!(tracker.update_stats(&read("c", "chr1", 7, 10, Flags::DUPLICATE)));
    tracker.update_stats(&read("d", "chr1", 9, 10, Flags::SUPPLEMENTARY));
    tracker.update_stats(&read("e", "", 0, 10, Flags::UNMAPPED));

    let stats = tracker.finish();
    assert_eq!(stats.mapped, 4);
    assert_eq!(stats.unmapped, 1);
    assert_eq!(stats.paired, 2);
    assert_eq!(stats.first_of_pair, 1);
    assert_eq!(stats.second_of_pair, 1);
    assert_eq!(stats.singletons, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.supplementary, 1);
    assert_eq!(stats.overlapping_pairs, 0);
}

#[test]
fn supplementary_and_singleton_reads_are_not_paired_up() {
    let mut tracker = AlignmentPairTracker::new(true);
    tracker.update_stats(&read("p1", "chr1", 1, 100, mate1()));
    tracker.update_stats(&read("p1", "chr1", 20, 30, mate1() | Flags::SUPPLEMENTARY));
    tracker.update_stats(&read("p2", "chr1", 30, 100, mate1() | Flags::MATE_UNMAPPED));
    tracker.update_stats(&read("p2", "chr1", 40, 100, mate2() | Flags::MATE_UNMAPPED));
    let stats = tracker.finish();
    assert_eq!(stats.overlapping_pairs, 0);

    let mut merged = stats.clone();
    merged.merge(&stats);
    assert_eq!(merged.mapped, 8);
}
