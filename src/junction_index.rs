use crate::types::{HashMap, HashMapExt, Pos, Strand};
use coitrees::{BasicCOITree, Interval, IntervalTree as CoitreeIntervalTree};
use std::collections::BTreeSet;

/// Exon layout of one transcript, as fed to [`JunctionBoundaryIndex::from_transcripts`].
#[derive(Debug, Clone, Copy)]
pub struct TranscriptExons<'a> {
    pub id: &'a str,
    pub seq: &'a str,
    pub strand: Strand,
    /// Exons sorted by ascending start.
    pub exons: &'a [(Pos, Pos)],
}

/// Intron spans `(start, end)` between consecutive exons, in genomic orientation.
///
/// Forward transcripts are walked in ascending coordinate order, reverse ones
/// after re-sorting by descending start. A span with `start >= end` stops the
/// walk; introns found before it are kept.
pub fn derive_introns(id: &str, exons: &[(Pos, Pos)], strand: Strand) -> Vec<(Pos, Pos)> {
    let mut ordered = exons.to_vec();
    match strand {
        Strand::Forward => ordered.sort_by_key(|&(s, _)| s),
        Strand::Reverse => ordered.sort_by(|a, b| b.0.cmp(&a.0)),
    }

    let mut introns = Vec::with_capacity(ordered.len().saturating_sub(1));
    for pair in ordered.windows(2) {
        let (upstream, downstream) = (pair[0], pair[1]);
        let (start, end) = match strand {
            Strand::Forward => (upstream.1 as i64 + 1, downstream.0 as i64 - 1),
            Strand::Reverse => (downstream.1 as i64 + 1, upstream.0 as i64 - 1),
        };
        if start >= end {
            tracing::warn!(
                transcript = id,
                start,
                end,
                "malformed intron span, skipping remaining introns of transcript"
            );
            break;
        }
        introns.push((start as Pos, end as Pos));
    }
    introns
}

struct SeqJunctions {
    boundaries: BasicCOITree<(), u32>,
    introns: BasicCOITree<(), u32>,
    n_boundaries: usize,
    n_introns: usize,
}

/// Annotated intron spans and their boundary positions, per sequence.
///
/// A boundary position `p` matches any query position in `[p - 1, p + 1)`.
#[derive(Default)]
pub struct JunctionBoundaryIndex {
    seqs: HashMap<String, SeqJunctions>,
}

impl JunctionBoundaryIndex {
    pub fn from_transcripts<'a>(transcripts: impl IntoIterator<Item = TranscriptExons<'a>>) -> Self {
        let mut introns: HashMap<String, Vec<(Pos, Pos)>> = HashMap::new();
        for tx in transcripts {
            if tx.exons.len() < 2 {
                continue;
            }
            let spans = derive_introns(tx.id, tx.exons, tx.strand);
            introns.entry(tx.seq.to_string()).or_default().extend(spans);
        }
        Self::from_introns(introns)
    }

    /// Build directly from intron spans keyed by sequence name.
    pub fn from_introns(introns: HashMap<String, Vec<(Pos, Pos)>>) -> Self {
        let mut seqs = HashMap::with_capacity(introns.len());
        for (seq, mut spans) in introns {
            spans.sort_unstable();
            spans.dedup();
            let positions: BTreeSet<Pos> = spans.iter().flat_map(|&(s, e)| [s, e]).collect();

            // Closed coitree intervals: [p - 1, p] is the half-open [p - 1, p + 1).
            let boundary_nodes: Vec<Interval<()>> = positions
                .iter()
                .map(|&p| Interval::new(p as i32 - 1, p as i32, ()))
                .collect();
            let intron_nodes: Vec<Interval<()>> = spans
                .iter()
                .map(|&(s, e)| Interval::new(s as i32, e as i32, ()))
                .collect();

            seqs.insert(
                seq,
                SeqJunctions {
                    boundaries: BasicCOITree::new(&boundary_nodes),
                    introns: BasicCOITree::new(&intron_nodes),
                    n_boundaries: positions.len(),
                    n_introns: spans.len(),
                },
            );
        }
        Self { seqs }
    }

    pub fn has_overlap(&self, seq: &str, pos: Pos) -> bool {
        self.seqs
            .get(seq)
            .is_some_and(|s| s.boundaries.query_count(pos as i32, pos as i32) > 0)
    }

    /// Whether `[start, end]` touches any annotated intron on `seq`.
    pub fn overlaps_intron(&self, seq: &str, start: Pos, end: Pos) -> bool {
        self.seqs
            .get(seq)
            .is_some_and(|s| s.introns.query_count(start as i32, end as i32) > 0)
    }

    /// Distinct boundary positions across all sequences.
    pub fn boundary_count(&self) -> usize {
        self.seqs.values().map(|s| s.n_boundaries).sum()
    }

    pub fn intron_count(&self) -> usize {
        self.seqs.values().map(|s| s.n_introns).sum()
    }
}
