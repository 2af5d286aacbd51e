use crate::alignment::{AlignedRead, Segment};
use crate::protocol::LibraryProtocol;
use crate::region_index::IntervalIndex;
use crate::types::{HashMap, Strand};
use clap::ValueEnum;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CountingAlgorithm {
    /// Skip reads with more than one reported alignment (NH > 1)
    #[default]
    #[value(name = "uniquely-mapped-reads")]
    UniquelyMapped,
    /// Weight every alignment by 1/NH
    Proportional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Gene(String),
    Ambiguous,
    NoFeature,
    NotUnique,
    NotAligned,
}

#[derive(Debug, Clone, Default)]
pub struct ReadCounts {
    pub per_gene: HashMap<String, f64>,
    pub no_feature: u64,
    pub ambiguous: u64,
    pub not_aligned: u64,
    pub alignment_not_unique: u64,
}

impl ReadCounts {
    /// Total reads assigned to genes, in alignment weights.
    pub fn assigned(&self) -> f64 {
        self.per_gene.values().sum()
    }

    pub fn merge(&mut self, other: &ReadCounts) {
        for (gene, n) in &other.per_gene {
            *self.per_gene.entry(gene.clone()).or_insert(0.0) += n;
        }
        self.no_feature += other.no_feature;
        self.ambiguous += other.ambiguous;
        self.not_aligned += other.not_aligned;
        self.alignment_not_unique += other.alignment_not_unique;
    }
}

impl fmt::Display for ReadCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "assigned to genes:\t{:.0}", self.assigned())?;
        writeln!(f, "no feature:\t{}", self.no_feature)?;
        writeln!(f, "ambiguous:\t{}", self.ambiguous)?;
        writeln!(f, "not aligned:\t{}", self.not_aligned)?;
        writeln!(f, "alignment not unique:\t{}", self.alignment_not_unique)
    }
}

/// Assigns aligned reads to the feature names of an [`IntervalIndex`].
///
/// A read belongs to a feature only when every aligned block lies inside a
/// merged interval carrying that feature name.
pub struct ReadCounter {
    protocol: LibraryProtocol,
    algorithm: CountingAlgorithm,
    counts: ReadCounts,
}

impl ReadCounter {
    pub fn new(protocol: LibraryProtocol, algorithm: CountingAlgorithm) -> Self {
        Self {
            protocol,
            algorithm,
            counts: ReadCounts::default(),
        }
    }

    pub fn count(&mut self, index: &IntervalIndex, read: &AlignedRead) -> Assignment {
        if !read.is_mapped() {
            self.counts.not_aligned += 1;
            return Assignment::NotAligned;
        }
        let hits = read.hit_count.unwrap_or(1).max(1);
        if hits > 1 && self.algorithm == CountingAlgorithm::UniquelyMapped {
            self.counts.alignment_not_unique += 1;
            return Assignment::NotUnique;
        }

        let expected = self.protocol.expected_strand(read.flags);
        let features = covering_features(index, &read.reference_name, &read.aligned_blocks(), expected);
        let mut it = features.into_iter();
        match (it.next(), it.next()) {
            (None, _) => {
                self.counts.no_feature += 1;
                Assignment::NoFeature
            }
            (Some(gene), None) => {
                let weight = match self.algorithm {
                    CountingAlgorithm::UniquelyMapped => 1.0,
                    CountingAlgorithm::Proportional => 1.0 / hits as f64,
                };
                *self.counts.per_gene.entry(gene.clone()).or_insert(0.0) += weight;
                Assignment::Gene(gene)
            }
            (Some(_), Some(_)) => {
                self.counts.ambiguous += 1;
                Assignment::Ambiguous
            }
        }
    }

    pub fn counts(&self) -> &ReadCounts {
        &self.counts
    }

    pub fn into_counts(self) -> ReadCounts {
        self.counts
    }
}

/// Feature names enclosing every block, restricted to `strand` when given.
fn covering_features(
    index: &IntervalIndex,
    seq: &str,
    blocks: &[Segment],
    strand: Option<Strand>,
) -> BTreeSet<String> {
    let mut common: Option<BTreeSet<String>> = None;
    for block in blocks {
        let here: BTreeSet<String> = index
            .enclosing(seq, block.start, block.end)
            .into_iter()
            .flat_map(|node| node.tags.iter())
            .filter(|tag| strand.map_or(true, |s| tag.strand == s))
            .map(|tag| tag.name.clone())
            .collect();
        common = Some(match common {
            None => here,
            Some(prev) => prev.intersection(&here).cloned().collect(),
        });
        if common.as_ref().is_some_and(BTreeSet::is_empty) {
            break;
        }
    }
    common.unwrap_or_default()
}
