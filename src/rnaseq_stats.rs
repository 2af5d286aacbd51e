use crate::types::HashMap;
use std::fmt;

/// Running totals of an RNA-seq pass. Instances can be merged after a sharded scan.
#[derive(Debug, Clone, Default)]
pub struct RnaSeqStats {
    pub exonic_reads: u64,
    pub intronic_reads: u64,
    pub intergenic_reads: u64,
    /// Reads touching an exon without fitting inside any gene's exons.
    pub overlapping_exon_reads: u64,
    pub total_junctions: u64,
    pub known_junctions: u64,
    pub partly_known_junctions: u64,
    /// Four-base signature around each split -> occurrences.
    pub junction_sequences: HashMap<String, u64>,
}

impl RnaSeqStats {
    pub fn novel_junctions(&self) -> u64 {
        self.total_junctions - self.known_junctions - self.partly_known_junctions
    }

    /// `(signature, percentage of junction reads)` sorted by ascending percentage.
    pub fn junction_sequence_table(&self) -> Vec<(String, f64)> {
        if self.total_junctions == 0 {
            return Vec::new();
        }
        let total = self.total_junctions as f64;
        let mut table: Vec<(String, f64)> = self
            .junction_sequences
            .iter()
            .map(|(seq, &n)| (seq.clone(), n as f64 * 100.0 / total))
            .collect();
        table.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        table
    }

    pub fn merge(&mut self, other: &RnaSeqStats) {
        self.exonic_reads += other.exonic_reads;
        self.intronic_reads += other.intronic_reads;
        self.intergenic_reads += other.intergenic_reads;
        self.overlapping_exon_reads += other.overlapping_exon_reads;
        self.total_junctions += other.total_junctions;
        self.known_junctions += other.known_junctions;
        self.partly_known_junctions += other.partly_known_junctions;
        for (seq, n) in &other.junction_sequences {
            *self.junction_sequences.entry(seq.clone()).or_insert(0) += n;
        }
    }
}

impl fmt::Display for RnaSeqStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "exonic reads:\t{}", self.exonic_reads)?;
        writeln!(f, "intronic reads:\t{}", self.intronic_reads)?;
        writeln!(f, "intergenic reads:\t{}", self.intergenic_reads)?;
        writeln!(f, "overlapping exon reads:\t{}", self.overlapping_exon_reads)?;
        writeln!(f, "junction reads:\t{}", self.total_junctions)?;
        writeln!(f, "  known:\t{}", self.known_junctions)?;
        writeln!(f, "  partly known:\t{}", self.partly_known_junctions)?;
        writeln!(f, "  novel:\t{}", self.novel_junctions())
    }
}
