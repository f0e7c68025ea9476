//! VCF sample-header rewriting
//!
//! Streams a block-compressed VCF line by line, replaces the tumor (and
//! optionally normal) sample names on the `#CHROM` header line with the fixed
//! labels `TUMOR` / `NORMAL`, re-emits the stream BGZF-compressed, and
//! rebuilds the tabix index. Every other line passes through unmodified.

use std::fs::File;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use noodles::bgzf;
use noodles::core::Position;
use noodles::csi::binning_index::index::header::Builder as TabixHeaderBuilder;
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::tabix;

use crate::error::{Result, ScatterError};

/// Rewrite sample names in `vcf` into `output` and re-index the result
pub fn rename_samples(
    vcf: impl AsRef<Path>,
    output: impl AsRef<Path>,
    tumor_sample: &str,
    normal_sample: Option<&str>,
) -> Result<()> {
    let vcf = vcf.as_ref();
    let output = output.as_ref();

    rewrite(vcf, output, tumor_sample, normal_sample)?;
    build_tabix_index(output)?;

    Ok(())
}

fn rewrite(
    vcf: &Path,
    output: &Path,
    tumor_sample: &str,
    normal_sample: Option<&str>,
) -> Result<()> {
    let mut reader = bgzf::Reader::new(File::open(vcf)?);
    let mut writer = bgzf::Writer::new(File::create(output)?);

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        let stripped = line.trim_end_matches('\n');
        if stripped.starts_with("#CHROM") {
            let renamed = rename_chrom_line(stripped, tumor_sample, normal_sample)?;
            writer.write_all(renamed.as_bytes())?;
        } else {
            writer.write_all(stripped.as_bytes())?;
        }
        writer.write_all(b"\n")?;
    }

    writer.finish()?;
    Ok(())
}

/// Replace sample names on the `#CHROM` header line
///
/// The normal sample is replaced before the tumor sample, and each must be
/// present: a name that cannot be found means the VCF was not produced from
/// these BAMs.
fn rename_chrom_line(
    line: &str,
    tumor_sample: &str,
    normal_sample: Option<&str>,
) -> Result<String> {
    let mut line = line.to_string();

    if let Some(normal) = normal_sample {
        if !line.contains(normal) {
            return Err(ScatterError::vcf(format!(
                "unable to find normal sample tag in the vcf header: {normal}"
            )));
        }
        line = line.replace(normal, "NORMAL");
    }

    if !line.contains(tumor_sample) {
        return Err(ScatterError::vcf(format!(
            "unable to find tumor sample tag in the vcf header: {tumor_sample}"
        )));
    }

    Ok(line.replace(tumor_sample, "TUMOR"))
}

/// Build a fresh `.tbi` (VCF preset) for a block-compressed VCF
fn build_tabix_index(vcf: &Path) -> Result<()> {
    let mut reader = bgzf::Reader::new(File::open(vcf)?);

    let mut indexer = tabix::index::Indexer::default();
    indexer.set_header(TabixHeaderBuilder::vcf().build());

    let mut line = String::new();
    let mut start_vpos = reader.virtual_position();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let end_vpos = reader.virtual_position();

        if !line.starts_with('#') {
            let (chrom, start, end) = record_span(line.trim_end_matches('\n'))?;
            indexer.add_record(chrom, start, end, Chunk::new(start_vpos, end_vpos))?;
        }

        start_vpos = end_vpos;
    }

    let index = indexer.build();

    let tbi_path = index_path(vcf);
    let mut writer = tabix::io::Writer::new(File::create(tbi_path)?);
    writer.write_index(&index)?;

    Ok(())
}

/// Genomic span of one VCF data line: (CHROM, POS, POS + len(REF) - 1)
fn record_span(line: &str) -> Result<(&str, Position, Position)> {
    let mut fields = line.split('\t');
    let (chrom, pos, reference) = match (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) {
        (Some(chrom), Some(pos), Some(_id), Some(reference)) => (chrom, pos, reference),
        _ => return Err(ScatterError::vcf(format!("truncated VCF record: {line}"))),
    };

    let pos: usize = pos
        .parse()
        .map_err(|_| ScatterError::vcf(format!("invalid POS '{pos}'")))?;

    let start = Position::try_from(pos)
        .map_err(|_| ScatterError::vcf(format!("POS out of range: {pos}")))?;
    let end = Position::try_from(pos + reference.len().max(1) - 1)
        .map_err(|_| ScatterError::vcf(format!("record end out of range at POS {pos}")))?;

    Ok((chrom, start, end))
}

fn index_path(vcf: &Path) -> PathBuf {
    let mut name = vcf.as_os_str().to_os_string();
    name.push(".tbi");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const VCF_BODY: &str = "##fileformat=VCFv4.2\n\
        ##contig=<ID=chr1,length=248956422>\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tpatient1_normal\tpatient1_tumor\n\
        chr1\t100\t.\tA\tT\t.\tPASS\t.\tGT\t0/0\t0/1\n\
        chr1\t250\t.\tGTC\tG\t.\tPASS\t.\tGT\t0/0\t1/1\n";

    fn write_bgzf_vcf(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut writer = bgzf::Writer::new(File::create(&path).unwrap());
        writer.write_all(body.as_bytes()).unwrap();
        writer.finish().unwrap();
        path
    }

    fn read_bgzf(path: &Path) -> String {
        let mut reader = bgzf::Reader::new(File::open(path).unwrap());
        let mut text = String::new();
        std::io::Read::read_to_string(&mut reader, &mut text).unwrap();
        text
    }

    #[test]
    fn test_tumor_and_normal_renamed() {
        let dir = TempDir::new().unwrap();
        let input = write_bgzf_vcf(&dir, "in.vcf.gz", VCF_BODY);
        let output = dir.path().join("out.vcf.gz");

        rename_samples(&input, &output, "patient1_tumor", Some("patient1_normal")).unwrap();

        let text = read_bgzf(&output);
        let chrom_line = text
            .lines()
            .find(|l| l.starts_with("#CHROM"))
            .unwrap();
        assert!(chrom_line.ends_with("FORMAT\tNORMAL\tTUMOR"));
        assert!(!text.contains("patient1_tumor"));

        // Data lines pass through unmodified
        assert!(text.contains("chr1\t100\t.\tA\tT\t.\tPASS\t.\tGT\t0/0\t0/1"));
    }

    #[test]
    fn test_tumor_only_vcf() {
        let dir = TempDir::new().unwrap();
        let body = VCF_BODY.replace("\tpatient1_normal\tpatient1_tumor", "\tpatient1_tumor");
        let input = write_bgzf_vcf(&dir, "in.vcf.gz", &body);
        let output = dir.path().join("out.vcf.gz");

        rename_samples(&input, &output, "patient1_tumor", None).unwrap();

        let text = read_bgzf(&output);
        assert!(text.contains("FORMAT\tTUMOR\n") || text.contains("FORMAT\tTUMOR"));
        assert!(!text.contains("NORMAL"));
    }

    #[test]
    fn test_missing_sample_is_an_error() {
        let dir = TempDir::new().unwrap();
        let input = write_bgzf_vcf(&dir, "in.vcf.gz", VCF_BODY);
        let output = dir.path().join("out.vcf.gz");

        let err = rename_samples(&input, &output, "someone_else", None).unwrap_err();
        assert!(matches!(err, ScatterError::Vcf { .. }));
    }

    #[test]
    fn test_index_written_alongside_output() {
        let dir = TempDir::new().unwrap();
        let input = write_bgzf_vcf(&dir, "in.vcf.gz", VCF_BODY);
        let output = dir.path().join("out.vcf.gz");

        rename_samples(&input, &output, "patient1_tumor", Some("patient1_normal")).unwrap();

        let tbi = dir.path().join("out.vcf.gz.tbi");
        assert!(tbi.exists());
        assert!(std::fs::metadata(&tbi).unwrap().len() > 0);
    }

    #[test]
    fn test_record_span_covers_ref_allele() {
        let (chrom, start, end) =
            record_span("chr1\t250\t.\tGTC\tG\t.\tPASS\t.\tGT\t0/0").unwrap();
        assert_eq!(chrom, "chr1");
        assert_eq!(usize::from(start), 250);
        assert_eq!(usize::from(end), 252);
    }
}
