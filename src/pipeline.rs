use crate::alignment::AlignedRead;
use crate::bam_input;
use crate::counting::{Assignment, CountingAlgorithm, ReadCounter, ReadCounts};
use crate::feature::{FeatureFormat, FeatureStream};
use crate::pair_tracker::{AlignmentPairTracker, PairStats};
use crate::protocol::LibraryProtocol;
use crate::region_index::IntervalIndex;
use crate::rnaseq_stats::RnaSeqStats;
use crate::transcript::{CoverageBias, TranscriptModel};
use crate::types::HashSet;
use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::Path;

/// Rejects records that go backwards on one reference or return to a
/// reference that was already left.
#[derive(Default)]
struct SortGuard {
    reference: String,
    last_start: u32,
    finished: HashSet<String>,
}

impl SortGuard {
    fn check(&mut self, read: &AlignedRead) -> Result<()> {
        if !read.is_mapped() {
            return Ok(());
        }
        if read.reference_name != self.reference {
            if self.finished.contains(&read.reference_name) {
                bail!(
                    "alignments are not coordinate-sorted: {} returns to {} after {}",
                    read.name,
                    read.reference_name,
                    self.reference
                );
            }
            let left = std::mem::replace(&mut self.reference, read.reference_name.clone());
            if !left.is_empty() {
                self.finished.insert(left);
            }
        } else if read.alignment_start < self.last_start {
            bail!(
                "alignments are not coordinate-sorted: {} at {}:{} follows position {}",
                read.name,
                read.reference_name,
                read.alignment_start,
                self.last_start
            );
        }
        self.last_start = read.alignment_start;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegionsConfig {
    pub protocol: LibraryProtocol,
    pub collect_overlaps: bool,
    /// Leave duplicate-flagged reads out of the inside/outside tallies.
    pub skip_duplicates: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RegionsReport {
    pub total_records: u64,
    pub inside: u64,
    pub outside: u64,
    /// Inside reads whose overlapping features all lie on the expected strand.
    pub strand_consistent: u64,
    pub pairs: PairStats,
}

impl fmt::Display for RegionsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "records:\t{}", self.total_records)?;
        writeln!(f, "reads inside regions:\t{}", self.inside)?;
        writeln!(f, "reads outside regions:\t{}", self.outside)?;
        writeln!(f, "strand consistent:\t{}", self.strand_consistent)?;
        write!(f, "{}", self.pairs)
    }
}

/// Load every record of a region file into an index keyed by feature name.
pub fn load_regions(path: &Path) -> Result<IntervalIndex> {
    let mut index = IntervalIndex::new();
    let stream = FeatureStream::open_guessed(path)
        .with_context(|| format!("failed to open regions {}", path.display()))?;
    for feature in stream {
        let feature = feature?;
        index.add_region(
            feature.feature_name(),
            feature.start(),
            feature.end(),
            feature.seq_name(),
            feature.strand(),
        );
    }
    index.index();
    tracing::info!(
        intervals = index.len(),
        sequences = index.sequence_names().len(),
        "regions loaded"
    );
    Ok(index)
}

/// Classify every mapped read as inside or outside the regions of `regions_path`.
pub fn run_regions(bam_path: &Path, regions_path: &Path, config: &RegionsConfig) -> Result<RegionsReport> {
    let index = load_regions(regions_path)?;
    let protocol = config.protocol;
    let mut tracker = AlignmentPairTracker::new(config.collect_overlaps);
    let mut guard = SortGuard::default();
    let mut report = RegionsReport::default();

    let total_records = bam_input::for_each_read(bam_path, |read| {
        guard.check(&read)?;
        let duplicate = tracker.update_stats(&read);
        if !read.is_mapped() || (duplicate && config.skip_duplicates) {
            return Ok(());
        }
        let (seq, start, end) = (&read.reference_name, read.alignment_start, read.alignment_end);
        let inside = match protocol.expected_strand(read.flags) {
            None => index.overlaps(seq, start, end),
            Some(strand) => {
                let hit = index.overlaps_with_strand(seq, start, end, strand);
                if hit.all_matching_strand {
                    report.strand_consistent += 1;
                }
                hit.any_overlap
            }
        };
        if inside {
            report.inside += 1;
        } else {
            report.outside += 1;
        }
        Ok(())
    })?;

    report.total_records = total_records;
    report.pairs = tracker.finish();
    Ok(report)
}

#[derive(Debug, Clone)]
pub struct RnaSeqConfig {
    pub protocol: LibraryProtocol,
    pub algorithm: CountingAlgorithm,
    /// Transcripts in each of the high- and low-coverage profiles.
    pub profile_transcripts: usize,
    pub collect_overlaps: bool,
    /// Leave duplicate-flagged reads out of counting, coverage and junctions.
    pub skip_duplicates: bool,
}

impl Default for RnaSeqConfig {
    fn default() -> Self {
        Self {
            protocol: LibraryProtocol::NonStrandSpecific,
            algorithm: CountingAlgorithm::UniquelyMapped,
            profile_transcripts: 500,
            collect_overlaps: false,
            skip_duplicates: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RnaSeqReport {
    pub total_records: u64,
    pub counts: ReadCounts,
    pub stats: RnaSeqStats,
    pub pairs: PairStats,
    pub bias: CoverageBias,
    pub mean_coverage_histogram: Vec<u64>,
    pub high_coverage_profile: Vec<f64>,
    pub low_coverage_profile: Vec<f64>,
    pub junction_sequences: Vec<(String, f64)>,
}

impl fmt::Display for RnaSeqReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "records:\t{}", self.total_records)?;
        write!(f, "{}", self.counts)?;
        write!(f, "{}", self.stats)?;
        write!(f, "{}", self.pairs)?;
        writeln!(f, "5' bias:\t{:.4}", self.bias.five_prime)?;
        writeln!(f, "3' bias:\t{:.4}", self.bias.three_prime)?;
        writeln!(f, "5'-3' bias:\t{:.4}", self.bias.five_to_three_prime)?;
        for (seq, pct) in self.junction_sequences.iter().rev().take(10) {
            writeln!(f, "junction {seq}:\t{pct:.2}%")?;
        }
        Ok(())
    }
}

/// Exon features of a GTF as a transcript model plus a gene-keyed exon index.
pub fn load_annotation(path: &Path) -> Result<(TranscriptModel, IntervalIndex)> {
    let mut model = TranscriptModel::new();
    let mut index = IntervalIndex::new();
    let stream = FeatureStream::open(path, FeatureFormat::Gtf)
        .with_context(|| format!("failed to open annotation {}", path.display()))?;
    for feature in stream {
        let feature = feature?;
        if feature.feature_name() != "exon" {
            continue;
        }
        model.add_exon_feature(&feature)?;
        if let Some(gene_id) = feature.attribute("gene_id") {
            index.add_region(
                gene_id,
                feature.start(),
                feature.end(),
                feature.seq_name(),
                feature.strand(),
            );
        }
    }
    model.build();
    index.index();
    Ok((model, index))
}

pub fn run_rnaseq(bam_path: &Path, annotation_path: &Path, config: &RnaSeqConfig) -> Result<RnaSeqReport> {
    let (mut model, index) = load_annotation(annotation_path)?;
    let mut counter = ReadCounter::new(config.protocol, config.algorithm);
    let mut tracker = AlignmentPairTracker::new(config.collect_overlaps);
    let mut stats = RnaSeqStats::default();
    let mut guard = SortGuard::default();

    let total_records = bam_input::for_each_read(bam_path, |read| {
        guard.check(&read)?;
        if tracker.update_stats(&read) && config.skip_duplicates {
            return Ok(());
        }
        let assignment = counter.count(&index, &read);
        if !read.is_mapped() || read.flags.is_secondary() {
            return Ok(());
        }
        let blocks = read.aligned_blocks();
        match assignment {
            Assignment::Gene(gene) => {
                stats.exonic_reads += 1;
                for block in &blocks {
                    model.add_coverage(&gene, block.start, block.end);
                }
            }
            Assignment::NoFeature => {
                let seq = read.reference_name.as_str();
                if blocks.iter().any(|b| index.overlaps(seq, b.start, b.end)) {
                    stats.overlapping_exon_reads += 1;
                } else {
                    model.classify_non_feature_read(&mut stats, seq, &blocks, 1);
                }
            }
            Assignment::Ambiguous | Assignment::NotUnique | Assignment::NotAligned => {}
        }
        for split in read.splits() {
            model.collect_junction_info(&mut stats, &read, &split);
        }
        Ok(())
    })?;

    let bias = model.compute_coverage_bias();
    tracing::info!(
        transcripts = bias.transcripts_used,
        five_prime = bias.five_prime,
        three_prime = bias.three_prime,
        "coverage bias"
    );
    Ok(RnaSeqReport {
        total_records,
        counts: counter.into_counts(),
        junction_sequences: stats.junction_sequence_table(),
        stats,
        pairs: tracker.finish(),
        bias,
        mean_coverage_histogram: model.mean_transcript_coverage_histogram(),
        high_coverage_profile: model.per_base_coverage_histogram(config.profile_transcripts, false),
        low_coverage_profile: model.per_base_coverage_histogram(config.profile_transcripts, true),
    })
}
