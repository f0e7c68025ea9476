//! Sample-name extraction from BAM headers

use std::fs::File;
use std::io::Read;
use std::path::Path;

use noodles::bgzf;

use crate::error::{Result, ScatterError};

/// BAM magic number ("BAM\1")
const BAM_MAGIC: [u8; 4] = [b'B', b'A', b'M', 0x01];

/// Read the sample name (`SM`) from the first read group of a BAM header
pub fn read_sample_name(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScatterError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ScatterError::Io(e),
    })?;

    let text = read_header_text(file)?;
    sample_from_header(&text)
        .ok_or_else(|| ScatterError::vcf(format!("no @RG SM tag in {}", path.display())))
}

/// Pull the SAM-formatted header text out of a BAM stream
fn read_header_text(file: File) -> Result<String> {
    let mut reader = bgzf::Reader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != BAM_MAGIC {
        return Err(ScatterError::vcf("not a BAM file (bad magic)"));
    }

    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    let l_text = u32::from_le_bytes(len) as usize;

    let mut text = vec![0u8; l_text];
    reader.read_exact(&mut text)?;

    Ok(String::from_utf8_lossy(&text).into_owned())
}

fn sample_from_header(text: &str) -> Option<String> {
    for line in text.lines() {
        if !line.starts_with("@RG") {
            continue;
        }
        for field in line.split('\t').skip(1) {
            if let Some(sample) = field.strip_prefix("SM:") {
                return Some(sample.to_string());
            }
        }
    }
    None
}
