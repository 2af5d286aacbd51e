use crate::alignment::AlignedRead;
use anyhow::{Context, Result};
use noodles::sam::alignment::record::data::field::Tag;
use noodles::{bam, sam};
use std::io;
use std::path::Path;

/// Stream every record of a BAM file through `f`, in file order.
/// Returns the number of records read.
pub fn for_each_read<F>(path: &Path, mut f: F) -> Result<u64>
where
    F: FnMut(AlignedRead) -> Result<()>,
{
    let mut reader = bam::io::reader::Builder
        .build_from_path(path)
        .with_context(|| format!("failed to open BAM {}", path.display()))?;
    let header = reader.read_header()?;

    let mut n = 0u64;
    for result in reader.records() {
        let record = result?;
        f(from_bam_record(&header, &record)?)?;
        n += 1;
    }
    Ok(n)
}

pub fn from_bam_record(header: &sam::Header, record: &bam::Record) -> io::Result<AlignedRead> {
    let reference_name = match record.reference_sequence_id().transpose()? {
        Some(id) => header
            .reference_sequences()
            .get_index(id)
            .map(|(name, _)| name.to_string())
            .unwrap_or_default(),
        None => String::new(),
    };
    let alignment_start = record
        .alignment_start()
        .transpose()?
        .map(|pos| pos.get() as u32)
        .unwrap_or(0);
    let cigar = record.cigar().iter().collect::<io::Result<Vec<_>>>()?;
    let name = record.name().map(|n| n.to_string()).unwrap_or_default();

    let mut read = AlignedRead::new(
        name,
        reference_name,
        alignment_start,
        record.flags(),
        cigar,
        record.sequence().iter().collect(),
    );
    if let Some(Ok(value)) = record.data().get(&Tag::ALIGNMENT_HIT_COUNT) {
        if let Some(nh) = value.as_int() {
            read = read.with_hit_count(nh as u32);
        }
    }
    Ok(read)
}
