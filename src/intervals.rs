//! Interval-list parsing
//!
//! Reads tab-delimited interval records (chrom, 0-based start, exclusive end)
//! and converts them to the 1-based inclusive regions the engine expects.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{Result, ScatterError};

/// A contiguous genomic span, 1-based and inclusive on both ends
///
/// One region is derived per interval-file record and consumed immediately by
/// command construction; regions are never retained or mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    /// Render in the engine's interval syntax, e.g. `chr1:1-100`
    pub fn interval(&self) -> String {
        format!("{}:{}-{}", self.chrom, self.start, self.end)
    }
}

/// Lazy, non-restartable iterator of regions in file order
///
/// Blank lines are skipped; any other line must carry at least three
/// whitespace-separated columns (extra columns are ignored). Chromosome names
/// are not validated against a reference; that is the engine's job.
#[derive(Debug)]
pub struct RegionReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
}

impl RegionReader<BufReader<File>> {
    /// Open an interval file for reading
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScatterError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ScatterError::Io(e),
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RegionReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<Region> {
        let mut fields = line.split_whitespace();
        let (chrom, start, end) = match (fields.next(), fields.next(), fields.next()) {
            (Some(chrom), Some(start), Some(end)) => (chrom, start, end),
            _ => {
                return Err(ScatterError::malformed_interval(
                    self.line_no,
                    "expected at least 3 columns: chrom, start, end",
                ));
            }
        };

        let start: u64 = start.parse().map_err(|_| {
            ScatterError::malformed_interval(self.line_no, format!("invalid start '{start}'"))
        })?;
        let end: u64 = end.parse().map_err(|_| {
            ScatterError::malformed_interval(self.line_no, format!("invalid end '{end}'"))
        })?;

        // 0-based half-open on disk; the engine takes 1-based inclusive.
        let start = start.checked_add(1).ok_or_else(|| {
            ScatterError::malformed_interval(self.line_no, "start out of range")
        })?;

        if start > end {
            return Err(ScatterError::malformed_interval(
                self.line_no,
                format!("start must precede end in '{line}'"),
            ));
        }

        Ok(Region {
            chrom: chrom.to_string(),
            start,
            end,
        })
    }
}

impl<R: BufRead> Iterator for RegionReader<R> {
    type Item = Result<Region>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(ScatterError::Io(e))),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(self.parse_line(trimmed));
        }
    }
}

/// Read every region from an interval file, in file order
pub fn read_regions(path: impl AsRef<Path>) -> Result<Vec<Region>> {
    RegionReader::open(path)?.collect()
}
