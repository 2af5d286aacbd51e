use alnqc_rs::{CountingAlgorithm, LibraryProtocol};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "alnqc-rs",
    about = "Annotation-aware quality control of coordinate-sorted alignments",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Set logging level to WARN
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count reads inside and outside a set of regions (GFF/GTF/BED)
    Regions(RegionsArgs),
    /// RNA-seq QC: gene counts, transcript coverage bias and junctions (GTF)
    Rnaseq(RnaSeqArgs),
}

#[derive(clap::Args, Debug)]
pub struct RegionsArgs {
    /// Coordinate-sorted input BAM
    pub in_bam: PathBuf,

    /// Regions of interest (format guessed from extension or content)
    #[arg(short = 'r', long = "regions", value_name = "GFF/GTF/BED")]
    pub regions: PathBuf,

    /// Library protocol used to check read strand against region strand
    #[arg(short = 'p', long, value_enum, default_value_t = LibraryProtocol::NonStrandSpecific)]
    pub protocol: LibraryProtocol,

    /// Report overlapping mate pairs
    #[arg(long)]
    pub overlaps: bool,

    /// Ignore reads flagged as duplicates (still counted in the pair summary)
    #[arg(long)]
    pub skip_duplicates: bool,
}

#[derive(clap::Args, Debug)]
pub struct RnaSeqArgs {
    /// Coordinate-sorted input BAM
    pub in_bam: PathBuf,

    /// Gene annotation
    #[arg(short = 'G', long = "gtf", value_name = "GTF")]
    pub gtf: PathBuf,

    /// Library protocol
    #[arg(short = 'p', long, value_enum, default_value_t = LibraryProtocol::NonStrandSpecific)]
    pub protocol: LibraryProtocol,

    /// How reads with several alignments are counted
    #[arg(short = 'a', long, value_enum, default_value_t = CountingAlgorithm::UniquelyMapped)]
    pub algorithm: CountingAlgorithm,

    /// Transcripts in the high- and low-coverage profiles
    #[arg(long, default_value_t = 500)]
    pub profile_transcripts: usize,

    /// Report overlapping mate pairs
    #[arg(long)]
    pub overlaps: bool,

    /// Ignore reads flagged as duplicates (still counted in the pair summary)
    #[arg(long)]
    pub skip_duplicates: bool,
}
