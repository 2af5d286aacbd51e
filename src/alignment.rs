use crate::types::Pos;
use noodles::sam::alignment::record::cigar::{op::Kind as CigarKind, Op as CigarOp};
use noodles::sam::alignment::record::Flags;

/// Reference-contiguous aligned block, 1-based inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: Pos,
    pub end: Pos,
}

/// One `N` operation of a spliced alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// Read bases consumed before the skip.
    pub read_offset: usize,
    /// First skipped reference base.
    pub ref_start: Pos,
    pub length: u32,
}

impl Split {
    /// Last skipped reference base.
    pub fn ref_end(&self) -> Pos {
        self.ref_start + self.length.saturating_sub(1)
    }
}

/// The fields of an alignment record the QC passes look at.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    pub name: String,
    pub reference_name: String,
    pub alignment_start: Pos,
    pub alignment_end: Pos,
    pub flags: Flags,
    pub cigar: Vec<CigarOp>,
    pub sequence: Vec<u8>,
    /// `NH` tag.
    pub hit_count: Option<u32>,
}

impl AlignedRead {
    pub fn new(
        name: impl Into<String>,
        reference_name: impl Into<String>,
        alignment_start: Pos,
        flags: Flags,
        cigar: Vec<CigarOp>,
        sequence: Vec<u8>,
    ) -> Self {
        let span: u32 = cigar
            .iter()
            .filter(|op| consumes_reference(op.kind()))
            .map(|op| op.len() as u32)
            .sum();
        Self {
            name: name.into(),
            reference_name: reference_name.into(),
            alignment_start,
            alignment_end: alignment_start + span.saturating_sub(1),
            flags,
            cigar,
            sequence,
            hit_count: None,
        }
    }

    pub fn with_hit_count(mut self, hit_count: u32) -> Self {
        self.hit_count = Some(hit_count);
        self
    }

    pub fn is_mapped(&self) -> bool {
        !self.flags.is_unmapped() && self.alignment_start > 0
    }

    /// Aligned blocks; deletions stay inside a block, `N` operations split them.
    pub fn aligned_blocks(&self) -> Vec<Segment> {
        if !self.is_mapped() {
            return Vec::new();
        }
        let mut ref_pos = self.alignment_start;
        let mut block_start = ref_pos;
        let mut blocks = Vec::new();

        for op in &self.cigar {
            let len = op.len() as u32;
            match op.kind() {
                CigarKind::Match
                | CigarKind::SequenceMatch
                | CigarKind::SequenceMismatch
                | CigarKind::Deletion => {
                    ref_pos = ref_pos.saturating_add(len);
                }
                CigarKind::Skip => {
                    if ref_pos > block_start {
                        blocks.push(Segment {
                            start: block_start,
                            end: ref_pos - 1,
                        });
                    }
                    ref_pos = ref_pos.saturating_add(len);
                    block_start = ref_pos;
                }
                _ => {}
            }
        }

        if ref_pos > block_start {
            blocks.push(Segment {
                start: block_start,
                end: ref_pos - 1,
            });
        }
        blocks
    }

    pub fn splits(&self) -> Vec<Split> {
        if !self.is_mapped() {
            return Vec::new();
        }
        let mut ref_pos = self.alignment_start;
        let mut read_pos = 0usize;
        let mut splits = Vec::new();

        for op in &self.cigar {
            let len = op.len();
            let kind = op.kind();
            if kind == CigarKind::Skip {
                splits.push(Split {
                    read_offset: read_pos,
                    ref_start: ref_pos,
                    length: len as u32,
                });
            }
            if consumes_reference(kind) {
                ref_pos = ref_pos.saturating_add(len as u32);
            }
            if consumes_read(kind) {
                read_pos += len;
            }
        }
        splits
    }
}

fn consumes_reference(kind: CigarKind) -> bool {
    matches!(
        kind,
        CigarKind::Match
            | CigarKind::Deletion
            | CigarKind::Skip
            | CigarKind::SequenceMatch
            | CigarKind::SequenceMismatch
    )
}

fn consumes_read(kind: CigarKind) -> bool {
    matches!(
        kind,
        CigarKind::Match
            | CigarKind::Insertion
            | CigarKind::SoftClip
            | CigarKind::SequenceMatch
            | CigarKind::SequenceMismatch
    )
}
