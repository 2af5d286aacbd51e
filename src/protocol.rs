use crate::types::Strand;
use clap::ValueEnum;
use noodles::sam::alignment::record::Flags;
use std::fmt;

/// Library preparation protocol, deciding which transcript strand a read reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum LibraryProtocol {
    #[default]
    NonStrandSpecific,
    StrandSpecificForward,
    StrandSpecificReverse,
}

impl LibraryProtocol {
    pub fn is_strand_specific(self) -> bool {
        self != LibraryProtocol::NonStrandSpecific
    }

    /// Transcript strand a read with these flags is expected to come from.
    ///
    /// Unpaired reads follow the first-of-pair rule. `None` for
    /// non-strand-specific libraries.
    pub fn expected_strand(self, flags: Flags) -> Option<Strand> {
        let forward = !flags.is_reverse_complemented();
        let first = flags.is_first_segment() || !flags.is_segmented();
        let second = flags.is_segmented() && flags.is_last_segment();
        let expect_forward = match self {
            LibraryProtocol::NonStrandSpecific => return None,
            LibraryProtocol::StrandSpecificForward => (first && forward) || (second && !forward),
            LibraryProtocol::StrandSpecificReverse => (first && !forward) || (second && forward),
        };
        Some(if expect_forward {
            Strand::Forward
        } else {
            Strand::Reverse
        })
    }
}

impl fmt::Display for LibraryProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LibraryProtocol::NonStrandSpecific => "non-strand-specific",
            LibraryProtocol::StrandSpecificForward => "strand-specific-forward",
            LibraryProtocol::StrandSpecificReverse => "strand-specific-reverse",
        };
        f.write_str(s)
    }
}
