use crate::error::{QcError, Result};
use crate::types::{HashMap, HashMapExt, Pos, Strand};
use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Number of non-comment lines inspected when the extension does not name a format.
const SNIFF_LINES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFormat {
    Gff,
    Gtf,
    Bed,
    Unknown,
}

impl fmt::Display for FeatureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeatureFormat::Gff => "GFF",
            FeatureFormat::Gtf => "GTF",
            FeatureFormat::Bed => "BED",
            FeatureFormat::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One annotated genomic element. Coordinates are 1-based inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomicFeature {
    seq_name: String,
    start: Pos,
    end: Pos,
    strand: Strand,
    feature_name: String,
    attributes: HashMap<String, String>,
}

impl GenomicFeature {
    pub fn new(
        seq_name: impl Into<String>,
        start: Pos,
        end: Pos,
        strand: Strand,
        feature_name: impl Into<String>,
    ) -> Self {
        Self {
            seq_name: seq_name.into(),
            start,
            end,
            strand,
            feature_name: feature_name.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn seq_name(&self) -> &str {
        &self.seq_name
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn end(&self) -> Pos {
        self.end
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn is_positive_strand(&self) -> bool {
        self.strand.is_forward()
    }

    /// GFF/GTF feature type, or the BED name column.
    pub fn feature_name(&self) -> &str {
        &self.feature_name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }
}

enum Source {
    Plain(BufReader<File>),
    Gzip(BufReader<MultiGzDecoder<File>>),
    Memory(Cursor<Vec<u8>>),
}

impl Source {
    fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        if is_gzipped(path) {
            Ok(Source::Gzip(BufReader::new(MultiGzDecoder::new(file))))
        } else {
            Ok(Source::Plain(BufReader::new(file)))
        }
    }

    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        match self {
            Source::Plain(r) => r.read_line(buf),
            Source::Gzip(r) => r.read_line(buf),
            Source::Memory(r) => r.read_line(buf),
        }
    }

    /// Rewind to the first byte, keeping the same file handle.
    fn rewind(self) -> io::Result<Self> {
        match self {
            Source::Plain(mut r) => {
                r.seek(SeekFrom::Start(0))?;
                Ok(Source::Plain(r))
            }
            Source::Gzip(r) => {
                let mut file = r.into_inner().into_inner();
                file.seek(SeekFrom::Start(0))?;
                Ok(Source::Gzip(BufReader::new(MultiGzDecoder::new(file))))
            }
            Source::Memory(mut r) => {
                r.set_position(0);
                Ok(Source::Memory(r))
            }
        }
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Lazy, restartable reader of GFF, GTF and BED records.
pub struct FeatureStream {
    source: Option<Source>,
    format: FeatureFormat,
    line_no: usize,
    bed_names: u32,
    failed: bool,
    buf: String,
}

impl FeatureStream {
    pub fn open(path: impl AsRef<Path>, format: FeatureFormat) -> Result<Self> {
        let path = path.as_ref();
        if format == FeatureFormat::Unknown {
            return Err(QcError::Format {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::with_source(Source::open(path)?, format))
    }

    /// Open with the format taken from the extension or, failing that, the content.
    pub fn open_guessed(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = guess_format(path)?;
        tracing::debug!(path = %path.display(), %format, "annotation format");
        Self::open(path, format)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>, format: FeatureFormat) -> Result<Self> {
        if format == FeatureFormat::Unknown {
            return Err(QcError::Format {
                path: PathBuf::from("<memory>"),
            });
        }
        Ok(Self::with_source(Source::Memory(Cursor::new(bytes.into())), format))
    }

    fn with_source(source: Source, format: FeatureFormat) -> Self {
        Self {
            source: Some(source),
            format,
            line_no: 0,
            bed_names: 0,
            failed: false,
            buf: String::new(),
        }
    }

    pub fn format(&self) -> FeatureFormat {
        self.format
    }

    /// Rewind to the first record. Auto-generated BED names restart at `gene1`.
    pub fn reset(&mut self) -> Result<()> {
        if let Some(source) = self.source.take() {
            self.source = Some(source.rewind()?);
        }
        self.line_no = 0;
        self.bed_names = 0;
        self.failed = false;
        Ok(())
    }

    /// Advance past one record without parsing it. Returns `false` at end of input.
    pub fn skip_next(&mut self) -> Result<bool> {
        Ok(self.next_record_line()?.is_some())
    }

    fn next_record_line(&mut self) -> Result<Option<String>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        loop {
            self.buf.clear();
            if source.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buf.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            return Ok(Some(line.to_string()));
        }
    }

    fn parse_line(&mut self, line: &str) -> Result<GenomicFeature> {
        let fields: Vec<&str> = line.split('\t').collect();
        match self.format {
            FeatureFormat::Gff => self.parse_gff(line, &fields),
            FeatureFormat::Gtf => self.parse_gtf(line, &fields),
            FeatureFormat::Bed => self.parse_bed(line, &fields),
            FeatureFormat::Unknown => Err(self.parse_error(line, "unknown format")),
        }
    }

    fn parse_gff(&self, line: &str, fields: &[&str]) -> Result<GenomicFeature> {
        if fields.len() < 8 {
            return Err(self.parse_error(
                line,
                format!("expected at least 8 fields, found {}", fields.len()),
            ));
        }
        self.gff_like(line, fields)
    }

    fn parse_gtf(&self, line: &str, fields: &[&str]) -> Result<GenomicFeature> {
        if fields.len() != 9 {
            return Err(self.parse_error(
                line,
                format!("expected exactly 9 fields, found {}", fields.len()),
            ));
        }
        let mut feature = self.gff_like(line, fields)?;
        for attr in split_attributes(fields[8]) {
            match attr.split_once(' ') {
                Some((name, value)) => {
                    let value = value.trim().trim_matches('"');
                    feature.attributes.insert(name.to_string(), value.to_string());
                }
                None => {
                    tracing::warn!(
                        line_no = self.line_no,
                        attribute = attr,
                        "skipping malformed GTF attribute"
                    );
                }
            }
        }
        Ok(feature)
    }

    fn gff_like(&self, line: &str, fields: &[&str]) -> Result<GenomicFeature> {
        let start = self.coordinate(line, fields[3])?;
        let end = self.coordinate(line, fields[4])?;
        Ok(GenomicFeature::new(
            fields[0],
            start,
            end,
            Strand::from_char(fields[6].chars().next().unwrap_or('+')),
            fields[2],
        ))
    }

    fn parse_bed(&mut self, line: &str, fields: &[&str]) -> Result<GenomicFeature> {
        if fields.len() < 3 {
            return Err(self.parse_error(
                line,
                format!("expected at least 3 fields, found {}", fields.len()),
            ));
        }
        let start = self.coordinate(line, fields[1])? + 1;
        let end = self.coordinate(line, fields[2])?;
        let name = match fields.get(3).map(|s| s.trim()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                self.bed_names += 1;
                format!("gene{}", self.bed_names)
            }
        };
        let strand = match fields.get(5).map(|s| s.trim()) {
            Some("-") => Strand::Reverse,
            _ => Strand::Forward,
        };
        Ok(GenomicFeature::new(fields[0], start, end, strand, name))
    }

    fn coordinate(&self, line: &str, field: &str) -> Result<Pos> {
        field
            .trim()
            .parse::<Pos>()
            .map_err(|_| self.parse_error(line, format!("invalid coordinate '{field}'")))
    }

    fn parse_error(&self, line: &str, reason: impl Into<String>) -> QcError {
        QcError::Parse {
            format: self.format,
            line_no: self.line_no,
            reason: reason.into(),
            line: line.to_string(),
        }
    }
}

impl Iterator for FeatureStream {
    type Item = Result<GenomicFeature>;

    /// A parse or I/O error is yielded once, after which the stream is exhausted.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = match self.next_record_line() {
            Ok(None) => return None,
            Ok(Some(line)) => self.parse_line(&line),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Split a GTF attribute column on semicolons outside double quotes.
fn split_attributes(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut begin = 0;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push(&text[begin..i]);
                begin = i + 1;
            }
            _ => {}
        }
    }
    out.push(&text[begin..]);
    out.into_iter()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect()
}

/// Pick the annotation format from the file extension, sniffing the content
/// when the extension is not one of `bed`, `gff` or `gtf`. A trailing `.gz` is ignored.
pub fn guess_format(path: impl AsRef<Path>) -> Result<FeatureFormat> {
    let path = path.as_ref();
    let stem_path = if is_gzipped(path) {
        PathBuf::from(path.file_stem().unwrap_or_default())
    } else {
        path.to_path_buf()
    };
    let ext = stem_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "bed" => return Ok(FeatureFormat::Bed),
        "gff" => return Ok(FeatureFormat::Gff),
        "gtf" => return Ok(FeatureFormat::Gtf),
        _ => {}
    }

    let mut source = Source::open(path)?;
    let mut sample = Vec::new();
    let mut buf = String::new();
    while sample.len() < SNIFF_LINES {
        buf.clear();
        if source.read_line(&mut buf)? == 0 {
            break;
        }
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        sample.push(line.to_string());
    }
    Ok(sniff_format(sample.iter().map(String::as_str)))
}

/// Score sampled annotation lines and return the format every line agrees on.
pub fn sniff_format<'a>(lines: impl IntoIterator<Item = &'a str>) -> FeatureFormat {
    let (mut count, mut bed, mut gff, mut gtf) = (0usize, 0usize, 0usize, 0usize);
    for line in lines {
        count += 1;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() >= 9 {
            if fields[3].trim().parse::<i64>().is_ok() {
                gff += 1;
            }
            if fields[8].contains("gene_id") && fields[8].contains("transcript_id") {
                gtf += 1;
            }
        }
        if fields.len() >= 3 && fields[1].trim().parse::<i64>().is_ok() {
            bed += 1;
        }
    }

    if count == 0 {
        FeatureFormat::Unknown
    } else if bed == count {
        FeatureFormat::Bed
    } else if gff == count {
        if gtf > 0 {
            FeatureFormat::Gtf
        } else {
            FeatureFormat::Gff
        }
    } else {
        FeatureFormat::Unknown
    }
}
