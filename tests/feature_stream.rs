use alnqc_rs::{guess_format, FeatureFormat, FeatureStream, GenomicFeature, QcError, Strand};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

fn parse_all(text: &str, format: FeatureFormat) -> Vec<GenomicFeature> {
    FeatureStream::from_bytes(text, format)
        .expect("open")
        .collect::<Result<Vec<_>, _>>()
        .expect("parse")
}

const GTF: &str = "\
#!genome-build test
chr1\tsrc\ttranscript\t100\t250\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t100\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; exon_number \"1\";
chr1\tsrc\texon\t200\t250\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; exon_number \"2\";
";

#[test]
fn bed_record_converts_to_one_based_inclusive() {
    let features = parse_all("chr1\t99\t200\tfeatureA\t0\t-\n", FeatureFormat::Bed);
    assert_eq!(features.len(), 1);
    let f = &features[0];
    assert_eq!(f.seq_name(), "chr1");
    assert_eq!((f.start(), f.end()), (100, 200));
    assert_eq!(f.strand(), Strand::Reverse);
    assert_eq!(f.feature_name(), "featureA");
}

#[test]
fn bed_without_name_gets_numbered_names() {
    let features = parse_all("chr1\t0\t10\nchr1\t20\t30\nchr2\t5\t8\tkept\n", FeatureFormat::Bed);
    let names: Vec<&str> = features.iter().map(|f| f.feature_name()).collect();
    assert_eq!(names, ["gene1", "gene2", "kept"]);
    assert!(features.iter().all(|f| f.strand() == Strand::Forward));
}

#[test]
fn gff_columns() {
    let features = parse_all(
        "chr2\tsrc\tCDS\t11\t20\t.\t-\t0\tID=cds1\n",
        FeatureFormat::Gff,
    );
    let f = &features[0];
    assert_eq!(f.feature_name(), "CDS");
    assert_eq!((f.start(), f.end()), (11, 20));
    assert_eq!(f.strand(), Strand::Reverse);
    assert!(f.attributes().is_empty());
}

#[test]
fn gtf_attributes_are_unquoted_and_bad_pairs_skipped() {
    let line = "chr1\tsrc\texon\t100\t150\t.\t+\t.\tgene_id \"G1\"; note \"a;b\"; broken; transcript_id \"T1\";\n";
    let features = parse_all(line, FeatureFormat::Gtf);
    let f = &features[0];
    assert_eq!(f.attribute("gene_id"), Some("G1"));
    assert_eq!(f.attribute("transcript_id"), Some("T1"));
    assert_eq!(f.attribute("note"), Some("a;b"));
    assert_eq!(f.attribute("broken"), None);
    assert_eq!(f.attributes().len(), 3);
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let features = parse_all(GTF, FeatureFormat::Gtf);
    assert_eq!(features.len(), 3);
    assert_eq!(features[1].feature_name(), "exon");
}

#[test]
fn field_count_violation_is_fatal() {
    let text = "chr1\tsrc\texon\t100\t150\t.\t+\t.\tgene_id \"G1\";\nchr1\tsrc\texon\t1\t2\n";
    let mut stream = FeatureStream::from_bytes(text, FeatureFormat::Gtf).unwrap();
    assert!(stream.next().unwrap().is_ok());
    match stream.next() {
        Some(Err(QcError::Parse { line_no, .. })) => assert_eq!(line_no, 2),
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(stream.next().is_none());
}

#[test]
fn non_integer_coordinate_is_fatal() {
    let mut stream = FeatureStream::from_bytes("chr1\tstart\t10\n", FeatureFormat::Bed).unwrap();
    assert!(matches!(stream.next(), Some(Err(QcError::Parse { .. }))));
}

#[test]
fn unknown_format_is_rejected() {
    assert!(matches!(
        FeatureStream::from_bytes("x", FeatureFormat::Unknown),
        Err(QcError::Format { .. })
    ));
}

#[test]
fn reset_and_skip_next() {
    let mut stream = FeatureStream::from_bytes("chr1\t0\t10\nchr1\t20\t30\n", FeatureFormat::Bed).unwrap();
    let first: Vec<_> = stream.by_ref().map(|f| f.unwrap()).collect();
    assert_eq!(first.len(), 2);

    stream.reset().unwrap();
    assert!(stream.skip_next().unwrap());
    let second = stream.next().unwrap().unwrap();
    assert_eq!(second.start(), 21);
    assert!(!stream.skip_next().unwrap());

    stream.reset().unwrap();
    let again: Vec<_> = stream.map(|f| f.unwrap()).collect();
    assert_eq!(again, first);
}

#[test]
fn format_from_extension() {
    assert_eq!(guess_format("a/regions.BED").unwrap(), FeatureFormat::Bed);
    assert_eq!(guess_format("genes.gtf").unwrap(), FeatureFormat::Gtf);
    assert_eq!(guess_format("genes.gff.gz").unwrap(), FeatureFormat::Gff);
}

#[test]
fn format_from_content() {
    let dir = tempfile::tempdir().unwrap();

    let bed = dir.path().join("bed.txt");
    std::fs::write(&bed, "# header\nchr1\t0\t10\tx\nchr1\t20\t30\n").unwrap();
    assert_eq!(guess_format(&bed).unwrap(), FeatureFormat::Bed);

    let gtf = dir.path().join("gtf.txt");
    std::fs::write(&gtf, GTF).unwrap();
    assert_eq!(guess_format(&gtf).unwrap(), FeatureFormat::Gtf);

    let gff = dir.path().join("gff.txt");
    std::fs::write(&gff, "chr1\tsrc\tgene\t1\t100\t.\t+\t.\tID=g1\n").unwrap();
    assert_eq!(guess_format(&gff).unwrap(), FeatureFormat::Gff);

    let junk = dir.path().join("junk.txt");
    std::fs::write(&junk, "hello world\n").unwrap();
    assert_eq!(guess_format(&junk).unwrap(), FeatureFormat::Unknown);
    assert!(matches!(
        FeatureStream::open_guessed(&junk),
        Err(QcError::Format { .. })
    ));
}

#[test]
fn gzipped_annotation_reads_and_rewinds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("genes.gtf.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(GTF.as_bytes()).unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let mut stream = FeatureStream::open_guessed(&path).unwrap();
    assert_eq!(stream.format(), FeatureFormat::Gtf);
    assert_eq!(stream.by_ref().count(), 3);
    stream.reset().unwrap();
    let exon = stream.nth(1).unwrap().unwrap();
    assert_eq!((exon.start(), exon.end()), (100, 150));
}
