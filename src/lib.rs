//! alnqc-rs: annotation-aware quality control of sequencing alignments.
//!
//! # Library usage
//!
//! ```no_run
//! use alnqc_rs::{FeatureFormat, FeatureStream, TranscriptModel};
//!
//! # fn main() -> Result<(), alnqc_rs::QcError> {
//! let mut model = TranscriptModel::new();
//! for feature in FeatureStream::open("genes.gtf", FeatureFormat::Gtf)? {
//!     let feature = feature?;
//!     if feature.feature_name() == "exon" {
//!         model.add_exon_feature(&feature)?;
//!     }
//! }
//! model.build();
//! // Feed aligned blocks to `add_coverage`, then:
//! let bias = model.compute_coverage_bias();
//! # let _ = bias;
//! # Ok(())
//! # }
//! ```

pub mod alignment;
pub mod bam_input;
pub mod counting;
pub mod error;
pub mod feature;
pub mod junction_index;
pub mod pair_tracker;
pub mod pipeline;
pub mod protocol;
pub mod region_index;
pub mod rnaseq_stats;
pub mod transcript;
pub mod types;

// Flat re-exports for the most commonly used public types.
pub use alignment::{AlignedRead, Segment, Split};
pub use counting::{Assignment, CountingAlgorithm, ReadCounter, ReadCounts};
pub use error::QcError;
pub use feature::{guess_format, FeatureFormat, FeatureStream, GenomicFeature};
pub use junction_index::JunctionBoundaryIndex;
pub use pair_tracker::{AlignmentPairTracker, PairStats};
pub use protocol::LibraryProtocol;
pub use region_index::{IntervalIndex, MergedInterval, OverlapResult};
pub use rnaseq_stats::RnaSeqStats;
pub use transcript::{CoverageBias, TranscriptModel};
pub use types::Strand;
