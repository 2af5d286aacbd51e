use crate::types::{HashMap, HashMapExt, Pos, Strand};
use coitrees::{BasicCOITree, Interval, IntervalTree as CoitreeIntervalTree};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureTag {
    pub name: String,
    pub strand: Strand,
}

/// A tree node: one coordinate span, possibly shared by several feature names.
#[derive(Debug, Clone)]
pub struct MergedInterval {
    pub seq: String,
    pub start: Pos,
    pub end: Pos,
    pub strand: Strand,
    pub tags: BTreeSet<FeatureTag>,
}

impl MergedInterval {
    pub fn has_feature(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlapResult {
    pub any_overlap: bool,
    pub all_matching_strand: bool,
}

#[derive(Default)]
struct SeqIndex {
    nodes: BTreeMap<(Pos, Pos), MergedInterval>,
    // Merged spans per feature name.
    spans: HashMap<String, Vec<(Pos, Pos)>>,
    keys: Vec<(Pos, Pos)>,
    tree: Option<BasicCOITree<usize, u32>>,
}

impl SeqIndex {
    fn remove_tag(&mut self, key: (Pos, Pos), name: &str) {
        if let Some(node) = self.nodes.get_mut(&key) {
            node.tags.retain(|t| t.name != name);
            if node.tags.is_empty() {
                self.nodes.remove(&key);
            }
        }
    }

    fn freeze(&mut self) {
        self.keys = self.nodes.keys().copied().collect();
        let intervals: Vec<Interval<usize>> = self
            .keys
            .iter()
            .enumerate()
            .map(|(i, &(s, e))| Interval::new(s as i32, e as i32, i))
            .collect();
        self.tree = Some(BasicCOITree::new(&intervals));
    }

    fn for_each_overlap<'a>(&'a self, start: Pos, end: Pos, mut f: impl FnMut(&'a MergedInterval)) {
        match &self.tree {
            Some(tree) => {
                tree.query(start as i32, end as i32, |node| {
                    let idx: usize = node.metadata.clone();
                    if let Some(found) = self.nodes.get(&self.keys[idx]) {
                        f(found);
                    }
                });
            }
            None => {
                for node in self.nodes.range(..=(end, Pos::MAX)).map(|(_, n)| n) {
                    if node.end >= start {
                        f(node);
                    }
                }
            }
        }
    }
}

/// Strand-aware index of merged feature intervals, one forest per sequence.
///
/// Intervals sharing a feature name merge when they intersect or abut.
/// Queries are answered from a cached interval tree once [`IntervalIndex::index`]
/// has been called, and from an ordered scan otherwise.
#[derive(Default)]
pub struct IntervalIndex {
    seqs: HashMap<String, SeqIndex>,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self { seqs: HashMap::new() }
    }

    pub fn add_region(&mut self, name: &str, start: Pos, end: Pos, seq: &str, strand: Strand) {
        let (start, end) = (start.min(end), start.max(end));
        let index = self.seqs.entry(seq.to_string()).or_default();
        let spans = index.spans.entry(name.to_string()).or_default();

        let touching: Vec<(Pos, Pos)> = spans
            .iter()
            .copied()
            .filter(|&(s, e)| s <= end.saturating_add(1) && start <= e.saturating_add(1))
            .collect();
        let merged_start = touching.iter().map(|&(s, _)| s).fold(start, Pos::min);
        let merged_end = touching.iter().map(|&(_, e)| e).fold(end, Pos::max);
        if touching.len() == 1 && touching[0] == (merged_start, merged_end) {
            return;
        }

        spans.retain(|span| !touching.contains(span));
        spans.push((merged_start, merged_end));
        for key in touching {
            index.remove_tag(key, name);
        }
        let node = index
            .nodes
            .entry((merged_start, merged_end))
            .or_insert_with(|| MergedInterval {
                seq: seq.to_string(),
                start: merged_start,
                end: merged_end,
                strand,
                tags: BTreeSet::new(),
            });
        node.tags.insert(FeatureTag {
            name: name.to_string(),
            strand,
        });
        index.tree = None;
    }

    /// Build the per-sequence interval trees. Later insertions invalidate the
    /// tree of the sequence they touch.
    pub fn index(&mut self) {
        for index in self.seqs.values_mut() {
            if index.tree.is_none() {
                index.freeze();
            }
        }
    }

    pub fn overlaps(&self, seq: &str, start: Pos, end: Pos) -> bool {
        let mut found = false;
        if let Some(index) = self.seqs.get(seq) {
            index.for_each_overlap(start, end, |_| found = true);
        }
        found
    }

    pub fn overlaps_with_strand(
        &self,
        seq: &str,
        start: Pos,
        end: Pos,
        expected_strand: Strand,
    ) -> OverlapResult {
        let (mut matches, mut strand_matches) = (0usize, 0usize);
        if let Some(index) = self.seqs.get(seq) {
            index.for_each_overlap(start, end, |node| {
                for tag in &node.tags {
                    matches += 1;
                    if tag.strand == expected_strand {
                        strand_matches += 1;
                    }
                }
            });
        }
        OverlapResult {
            any_overlap: matches > 0,
            all_matching_strand: matches > 0 && strand_matches == matches,
        }
    }

    /// Nodes whose span fully contains `[start, end]`.
    pub fn enclosing(&self, seq: &str, start: Pos, end: Pos) -> Vec<&MergedInterval> {
        let mut out = Vec::new();
        if let Some(index) = self.seqs.get(seq) {
            index.for_each_overlap(start, end, |node| {
                if node.start <= start && node.end >= end {
                    out.push(node);
                }
            });
        }
        out
    }

    pub fn intervals<'a>(&'a self, seq: &str) -> impl Iterator<Item = &'a MergedInterval> + 'a {
        self.seqs
            .get(seq)
            .into_iter()
            .flat_map(|index| index.nodes.values())
    }

    pub fn sequence_names(&self) -> BTreeSet<&str> {
        self.seqs.keys().map(String::as_str).collect()
    }

    /// Number of tree nodes across all sequences.
    pub fn len(&self) -> usize {
        self.seqs.values().map(|s| s.nodes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
