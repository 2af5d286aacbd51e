use crate::alignment::AlignedRead;
use crate::types::{HashMap, HashMapExt, Pos};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairStats {
    pub mapped: u64,
    pub unmapped: u64,
    pub paired: u64,
    pub first_of_pair: u64,
    pub second_of_pair: u64,
    pub singletons: u64,
    pub supplementary: u64,
    pub duplicates: u64,
    pub overlapping_pairs: u64,
    pub overlapping_bases: u64,
}

impl PairStats {
    pub fn merge(&mut self, other: &PairStats) {
        self.mapped += other.mapped;
        self.unmapped += other.unmapped;
        self.paired += other.paired;
        self.first_of_pair += other.first_of_pair;
        self.second_of_pair += other.second_of_pair;
        self.singletons += other.singletons;
        self.supplementary += other.supplementary;
        self.duplicates += other.duplicates;
        self.overlapping_pairs += other.overlapping_pairs;
        self.overlapping_bases += other.overlapping_bases;
    }
}

impl fmt::Display for PairStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mapped reads:\t{}", self.mapped)?;
        writeln!(f, "unmapped reads:\t{}", self.unmapped)?;
        writeln!(f, "paired reads:\t{}", self.paired)?;
        writeln!(f, "  first in pair:\t{}", self.first_of_pair)?;
        writeln!(f, "  second in pair:\t{}", self.second_of_pair)?;
        writeln!(f, "  singletons:\t{}", self.singletons)?;
        writeln!(f, "supplementary:\t{}", self.supplementary)?;
        writeln!(f, "duplicates:\t{}", self.duplicates)?;
        writeln!(f, "overlapping pairs:\t{}", self.overlapping_pairs)?;
        writeln!(f, "overlapping bases:\t{}", self.overlapping_bases)
    }
}

#[derive(Debug, Clone, Copy)]
struct MateSpan {
    first_end: Pos,
    second_start: Option<Pos>,
}

/// Single-pass pairing statistics over a coordinate-sorted alignment stream.
///
/// Mate overlap is tracked one chromosome at a time: the pending pairs of a
/// chromosome are resolved as soon as a read on another reference arrives.
/// Input that is not coordinate-sorted is not detected and yields
/// undercounted overlaps.
pub struct AlignmentPairTracker {
    stats: PairStats,
    collect_overlaps: bool,
    current_chrom: Option<String>,
    mates: HashMap<String, MateSpan>,
}

impl AlignmentPairTracker {
    pub fn new(collect_overlaps: bool) -> Self {
        Self {
            stats: PairStats::default(),
            collect_overlaps,
            current_chrom: None,
            mates: HashMap::new(),
        }
    }

    /// Count `read`; returns whether it is flagged as a duplicate.
    pub fn update_stats(&mut self, read: &AlignedRead) -> bool {
        let flags = read.flags;
        if flags.is_unmapped() {
            self.stats.unmapped += 1;
            return false;
        }

        self.stats.mapped += 1;
        if flags.is_segmented() {
            self.stats.paired += 1;
            if flags.is_first_segment() {
                self.stats.first_of_pair += 1;
            }
            if flags.is_last_segment() {
                self.stats.second_of_pair += 1;
            }
            if flags.is_mate_unmapped() {
                self.stats.singletons += 1;
            }
        }
        if flags.is_supplementary() {
            self.stats.supplementary += 1;
        }
        let duplicate = flags.is_duplicate();
        if duplicate {
            self.stats.duplicates += 1;
        }

        if self.collect_overlaps {
            self.track_mate(read);
        }
        duplicate
    }

    fn track_mate(&mut self, read: &AlignedRead) {
        if self.current_chrom.as_deref() != Some(read.reference_name.as_str()) {
            self.finalize();
            self.current_chrom = Some(read.reference_name.clone());
        }

        let flags = read.flags;
        if !flags.is_segmented()
            || flags.is_mate_unmapped()
            || flags.is_supplementary()
            || flags.is_secondary()
        {
            return;
        }
        match self.mates.get_mut(&read.name) {
            Some(span) => {
                if span.second_start.is_none() {
                    span.second_start = Some(read.alignment_start);
                }
            }
            None => {
                self.mates.insert(
                    read.name.clone(),
                    MateSpan {
                        first_end: read.alignment_end,
                        second_start: None,
                    },
                );
            }
        }
    }

    /// Resolve the pending pairs of the current chromosome and clear them.
    pub fn finalize(&mut self) {
        for span in self.mates.values() {
            let Some(second_start) = span.second_start else {
                continue;
            };
            let intersection = span.first_end as i64 - second_start as i64 + 1;
            if intersection > 0 {
                self.stats.overlapping_pairs += 1;
                self.stats.overlapping_bases += intersection as u64;
            }
        }
        self.mates.clear();
    }

    pub fn stats(&self) -> &PairStats {
        &self.stats
    }

    /// Finalize the last chromosome and return the totals.
    pub fn finish(mut self) -> PairStats {
        self.finalize();
        self.stats
    }
}
