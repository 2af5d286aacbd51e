mod cli;

use alnqc_rs::pipeline::{self, RegionsConfig, RnaSeqConfig};
use anyhow::Result;
use clap::Parser;
use cli::Command;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Command::Regions(a) => {
            let config = RegionsConfig {
                protocol: a.protocol,
                collect_overlaps: a.overlaps,
                skip_duplicates: a.skip_duplicates,
            };
            let report = pipeline::run_regions(&a.in_bam, &a.regions, &config)?;
            tracing::info!(
                records = report.total_records,
                inside = report.inside,
                outside = report.outside,
                "alnqc-rs: regions complete"
            );
            print!("{report}");
        }
        Command::Rnaseq(a) => {
            let config = RnaSeqConfig {
                protocol: a.protocol,
                algorithm: a.algorithm,
                profile_transcripts: a.profile_transcripts,
                collect_overlaps: a.overlaps,
                skip_duplicates: a.skip_duplicates,
            };
            let report = pipeline::run_rnaseq(&a.in_bam, &a.gtf, &config)?;
            tracing::info!(
                records = report.total_records,
                exonic = report.stats.exonic_reads,
                junctions = report.stats.total_junctions,
                "alnqc-rs: rnaseq complete"
            );
            print!("{report}");
        }
    }
    Ok(())
}
