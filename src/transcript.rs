use crate::alignment::{AlignedRead, Segment, Split};
use crate::error::{QcError, Result};
use crate::feature::GenomicFeature;
use crate::junction_index::{JunctionBoundaryIndex, TranscriptExons};
use crate::rnaseq_stats::RnaSeqStats;
use crate::types::{HashMap, HashMapExt, Pos, Strand};

/// Transcripts shorter than this are not used for coverage bias.
pub const MIN_BIAS_TRANSCRIPT_LENGTH: u32 = 500;
/// Bases at each transcript end averaged for the 5' and 3' bias.
pub const PRIME_BASES: usize = 100;
/// Upper bound on the transcripts retained for coverage bias.
pub const MAX_BIAS_TRANSCRIPTS: usize = 1000;
pub const MEAN_COVERAGE_BINS: usize = 51;
pub const PROFILE_BINS: usize = 100;

#[derive(Debug, Clone)]
pub struct Transcript {
    id: String,
    gene: usize,
    seq: String,
    strand: Strand,
    exons: Vec<(Pos, Pos)>,
    offsets: Vec<u32>,
    length: u32,
}

impl Transcript {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn seq(&self) -> &str {
        &self.seq
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Exons in ascending genomic order.
    pub fn exons(&self) -> &[(Pos, Pos)] {
        &self.exons
    }

    /// Transcript-relative offset of each exon's first base.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn start(&self) -> Pos {
        self.exons.first().map(|e| e.0).unwrap_or(0)
    }

    pub fn end(&self) -> Pos {
        self.exons.iter().map(|e| e.1).max().unwrap_or(0)
    }

    pub fn length(&self) -> u32 {
        self.length
    }
}

#[derive(Debug, Clone)]
pub struct Gene {
    id: String,
    seq: String,
    strand: Strand,
    transcripts: Vec<usize>,
}

impl Gene {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn seq(&self) -> &str {
        &self.seq
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn transcript_count(&self) -> usize {
        self.transcripts.len()
    }
}

/// Median 5', 3' and 5'/3' coverage ratios over the retained transcripts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoverageBias {
    pub five_prime: f64,
    pub three_prime: f64,
    pub five_to_three_prime: f64,
    pub transcripts_used: usize,
}

struct CachedTranscript {
    gene_id: String,
    seq: String,
    strand: Strand,
    exons: Vec<(Pos, Pos)>,
}

#[derive(Default)]
struct ExonCache {
    order: Vec<String>,
    transcripts: HashMap<String, CachedTranscript>,
}

enum ModelState {
    Collecting(ExonCache),
    Built,
}

/// Gene, transcript and exon structures with per-base transcript coverage.
///
/// Exons are collected per `transcript_id` until [`TranscriptModel::build`],
/// after which the structure is fixed and only coverage changes.
pub struct TranscriptModel {
    state: ModelState,
    genes: Vec<Gene>,
    gene_index: HashMap<String, usize>,
    transcripts: Vec<Transcript>,
    transcript_index: HashMap<String, usize>,
    coverage: Vec<Option<Vec<u32>>>,
    junctions: JunctionBoundaryIndex,
}

impl Default for TranscriptModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptModel {
    pub fn new() -> Self {
        Self {
            state: ModelState::Collecting(ExonCache::default()),
            genes: Vec::new(),
            gene_index: HashMap::new(),
            transcripts: Vec::new(),
            transcript_index: HashMap::new(),
            coverage: Vec::new(),
            junctions: JunctionBoundaryIndex::default(),
        }
    }

    pub fn add_exon_feature(&mut self, feature: &GenomicFeature) -> Result<()> {
        let ModelState::Collecting(cache) = &mut self.state else {
            return Err(QcError::Model(format!(
                "exon {}:{}-{} added after the model was built",
                feature.seq_name(),
                feature.start(),
                feature.end()
            )));
        };
        let context = || format!("{}:{}-{}", feature.seq_name(), feature.start(), feature.end());
        let transcript_id = feature
            .attribute("transcript_id")
            .ok_or_else(|| QcError::Attribute {
                attribute: "transcript_id",
                context: context(),
            })?;
        let gene_id = feature.attribute("gene_id").ok_or_else(|| QcError::Attribute {
            attribute: "gene_id",
            context: context(),
        })?;

        let exon = (feature.start().min(feature.end()), feature.start().max(feature.end()));
        match cache.transcripts.get_mut(transcript_id) {
            Some(tx) => tx.exons.push(exon),
            None => {
                cache.order.push(transcript_id.to_string());
                cache.transcripts.insert(
                    transcript_id.to_string(),
                    CachedTranscript {
                        gene_id: gene_id.to_string(),
                        seq: feature.seq_name().to_string(),
                        strand: feature.strand(),
                        exons: vec![exon],
                    },
                );
            }
        }
        Ok(())
    }

    /// Turn cached exons into genes and transcripts and derive the junction index.
    /// Calling it again leaves the model unchanged.
    pub fn build(&mut self) {
        let cache = match std::mem::replace(&mut self.state, ModelState::Built) {
            ModelState::Collecting(cache) => cache,
            ModelState::Built => return,
        };
        let ExonCache {
            order,
            mut transcripts,
        } = cache;

        for tx_id in order {
            let Some(mut cached) = transcripts.remove(&tx_id) else {
                continue;
            };
            cached.exons.sort_unstable();
            cached.exons.dedup();

            let gene = match self.gene_index.get(&cached.gene_id) {
                Some(&g) => g,
                None => {
                    self.genes.push(Gene {
                        id: cached.gene_id.clone(),
                        seq: cached.seq.clone(),
                        strand: cached.strand,
                        transcripts: Vec::new(),
                    });
                    self.gene_index.insert(cached.gene_id, self.genes.len() - 1);
                    self.genes.len() - 1
                }
            };

            let mut offsets = Vec::with_capacity(cached.exons.len());
            let mut length = 0u32;
            for &(s, e) in &cached.exons {
                offsets.push(length);
                length += e - s + 1;
            }

            let idx = self.transcripts.len();
            self.genes[gene].transcripts.push(idx);
            self.transcript_index.insert(tx_id.clone(), idx);
            self.transcripts.push(Transcript {
                id: tx_id,
                gene,
                seq: cached.seq,
                strand: self.genes[gene].strand,
                exons: cached.exons,
                offsets,
                length,
            });
            self.coverage.push(None);
        }

        self.junctions = JunctionBoundaryIndex::from_transcripts(self.transcripts.iter().map(|tx| {
            TranscriptExons {
                id: &tx.id,
                seq: &tx.seq,
                strand: tx.strand,
                exons: &tx.exons,
            }
        }));
        tracing::info!(
            genes = self.genes.len(),
            transcripts = self.transcripts.len(),
            introns = self.junctions.intron_count(),
            "transcript model built"
        );
    }

    pub fn is_built(&self) -> bool {
        matches!(self.state, ModelState::Built)
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    pub fn gene(&self, id: &str) -> Option<&Gene> {
        self.gene_index.get(id).map(|&g| &self.genes[g])
    }

    pub fn transcript(&self, id: &str) -> Option<&Transcript> {
        self.transcript_index.get(id).map(|&t| &self.transcripts[t])
    }

    pub fn transcripts_of<'a>(&'a self, gene: &'a Gene) -> impl Iterator<Item = &'a Transcript> + 'a {
        gene.transcripts.iter().map(|&t| &self.transcripts[t])
    }

    /// Coverage of a transcript in ascending genomic order, if any read touched its gene.
    pub fn coverage(&self, transcript_id: &str) -> Option<&[u32]> {
        let &t = self.transcript_index.get(transcript_id)?;
        self.coverage[t].as_deref()
    }

    pub fn junctions(&self) -> &JunctionBoundaryIndex {
        &self.junctions
    }

    /// Add one to every transcript base of `gene_id` inside `[start, end]`.
    /// Returns `false` when the gene is unknown.
    pub fn add_coverage(&mut self, gene_id: &str, start: Pos, end: Pos) -> bool {
        let Some(&g) = self.gene_index.get(gene_id) else {
            return false;
        };
        let (start, end) = (start.min(end), start.max(end));
        for &t in &self.genes[g].transcripts {
            let tx = &self.transcripts[t];
            let cov = self.coverage[t].get_or_insert_with(|| vec![0; tx.length as usize]);
            for (&(es, ee), &offset) in tx.exons.iter().zip(&tx.offsets) {
                if ee < start || es > end {
                    continue;
                }
                let from = (offset + start.max(es) - es) as usize;
                let to = (offset + end.min(ee) - es) as usize;
                cov[from..=to].iter_mut().for_each(|c| *c += 1);
            }
        }
        true
    }

    /// Coverage oriented 5' to 3'.
    fn oriented_coverage(&self, t: usize) -> Option<Vec<u32>> {
        let mut cov = self.coverage[t].clone()?;
        if self.genes[self.transcripts[t].gene].strand == Strand::Reverse {
            cov.reverse();
        }
        Some(cov)
    }

    fn mean_coverage(&self, t: usize) -> Option<f64> {
        let cov = self.coverage[t].as_ref()?;
        if cov.is_empty() {
            return None;
        }
        Some(cov.iter().map(|&c| c as u64).sum::<u64>() as f64 / cov.len() as f64)
    }

    /// Best transcript per gene by mean coverage, then the top ranked of those.
    fn bias_transcripts(&self) -> Vec<usize> {
        let min_length = MIN_BIAS_TRANSCRIPT_LENGTH.max(PRIME_BASES as u32);
        let mut best: Vec<(usize, f64)> = Vec::new();
        for gene in &self.genes {
            let mut pick: Option<(usize, f64)> = None;
            for &t in &gene.transcripts {
                if self.transcripts[t].length < min_length {
                    continue;
                }
                let Some(mean) = self.mean_coverage(t) else {
                    continue;
                };
                if mean >= 1.0 && pick.map_or(true, |(_, m)| mean > m) {
                    pick = Some((t, mean));
                }
            }
            best.extend(pick);
        }
        if best.is_empty() {
            return Vec::new();
        }

        let mut means: Vec<f64> = best.iter().map(|&(_, m)| m).collect();
        means.sort_by(f64::total_cmp);
        let threshold = means[means.len().saturating_sub(MAX_BIAS_TRANSCRIPTS + 1)];
        best.into_iter()
            .filter(|&(_, m)| m >= threshold)
            .map(|(t, _)| t)
            .collect()
    }

    pub fn compute_coverage_bias(&self) -> CoverageBias {
        let picked = self.bias_transcripts();
        let mut five = Vec::with_capacity(picked.len());
        let mut three = Vec::with_capacity(picked.len());
        let mut ratio = Vec::with_capacity(picked.len());

        for t in picked {
            let Some(cov) = self.oriented_coverage(t) else {
                continue;
            };
            let mean_all = mean(&cov);
            let five_mean = mean(&cov[..PRIME_BASES]);
            let three_mean = mean(&cov[cov.len() - PRIME_BASES..]);
            five.push(five_mean / mean_all);
            three.push(three_mean / mean_all);
            if three_mean > 0.0 {
                ratio.push(five_mean / three_mean);
            }
        }

        if five.is_empty() {
            return CoverageBias::default();
        }
        CoverageBias {
            five_prime: median(&mut five),
            three_prime: median(&mut three),
            five_to_three_prime: median(&mut ratio),
            transcripts_used: five.len(),
        }
    }

    /// Reads that hit no exon: intronic when any block touches an annotated intron.
    pub fn classify_non_feature_read(
        &self,
        stats: &mut RnaSeqStats,
        seq: &str,
        intervals: &[Segment],
        read_count: u64,
    ) {
        let intronic = intervals
            .iter()
            .any(|b| self.junctions.overlaps_intron(seq, b.start, b.end));
        if intronic {
            stats.intronic_reads += read_count;
        } else {
            stats.intergenic_reads += read_count;
        }
    }

    /// Tally the bases around one split of `read` and classify its breakpoints
    /// against the annotated intron boundaries.
    pub fn collect_junction_info(&self, stats: &mut RnaSeqStats, read: &AlignedRead, split: &Split) {
        let at = split.read_offset;
        if at >= 2 && at + 2 <= read.sequence.len() {
            let signature: String = read.sequence[at - 2..at + 2]
                .iter()
                .map(|&b| b.to_ascii_uppercase() as char)
                .collect();
            *stats.junction_sequences.entry(signature).or_insert(0) += 1;
        } else {
            tracing::warn!(
                read = %read.name,
                offset = at,
                read_len = read.sequence.len(),
                "junction signature outside read bounds"
            );
        }

        let seq = read.reference_name.as_str();
        let left = self.junctions.has_overlap(seq, split.ref_start);
        let right = self.junctions.has_overlap(seq, split.ref_end());
        stats.total_junctions += 1;
        match (left, right) {
            (true, true) => stats.known_junctions += 1,
            (true, false) | (false, true) => stats.partly_known_junctions += 1,
            (false, false) => {}
        }
    }

    /// Transcripts bucketed by mean coverage; the last bin collects 50 and above.
    pub fn mean_transcript_coverage_histogram(&self) -> Vec<u64> {
        let mut bins = vec![0u64; MEAN_COVERAGE_BINS];
        for (t, tx) in self.transcripts.iter().enumerate() {
            if tx.length == 0 {
                continue;
            }
            let total: u64 = self.coverage[t]
                .as_ref()
                .map(|c| c.iter().map(|&v| v as u64).sum())
                .unwrap_or(0);
            let bin = ((total / tx.length as u64) as usize).min(MEAN_COVERAGE_BINS - 1);
            bins[bin] += 1;
        }
        bins
    }

    /// Summed 5'→3' coverage profile of the `n` lowest (`ascending`) or highest
    /// mean-coverage transcripts, each normalized by its length.
    pub fn per_base_coverage_histogram(&self, n: usize, ascending: bool) -> Vec<f64> {
        let mut ranked: Vec<(usize, f64)> = (0..self.transcripts.len())
            .filter_map(|t| self.mean_coverage(t).map(|m| (t, m)))
            .collect();
        if ascending {
            ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        } else {
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        }

        let mut profile = vec![0.0; PROFILE_BINS];
        for &(t, _) in ranked.iter().take(n) {
            let Some(cov) = self.oriented_coverage(t) else {
                continue;
            };
            let data: Vec<f64> = cov.iter().map(|&c| c as f64).collect();
            for (acc, v) in profile.iter_mut().zip(binned_profile(&data, PROFILE_BINS)) {
                *acc += v;
            }
        }
        profile
    }
}

/// Sum `data` into `n_bins` bins of `ceil(len / n_bins)` values, divided by `len`.
pub fn binned_profile(data: &[f64], n_bins: usize) -> Vec<f64> {
    let mut bins = vec![0.0; n_bins];
    if data.is_empty() || n_bins == 0 {
        return bins;
    }
    let step = data.len().div_ceil(n_bins);
    for (i, v) in data.iter().enumerate() {
        bins[i / step] += v;
    }
    let len = data.len() as f64;
    bins.iter_mut().for_each(|b| *b /= len);
    bins
}

fn mean(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as u64).sum::<u64>() as f64 / values.len() as f64
}

/// Lower median for even-sized input.
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    values[(values.len() - 1) / 2]
}
