//! Per-region engine command construction

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::JAVA_OPTIONS_PREFIX;
use crate::intervals::Region;
use crate::scatter::job::JobSpec;

/// Fixed parameters shared by every per-region invocation in a run
///
/// The block number is the only per-region input: it is the region's 0-based
/// position in the source sequence and is embedded in every output filename,
/// which makes output paths unique and order-traceable by construction. The
/// builder itself does not (and need not) enforce uniqueness.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    engine_path: PathBuf,
    java_heap: String,
    arguments_file: PathBuf,
    output_prefix: PathBuf,
    f1r2_tar_gz: bool,
    bam_output: bool,
    timeout: Option<Duration>,
}

impl CommandBuilder {
    pub fn new(
        engine_path: impl Into<PathBuf>,
        java_heap: impl Into<String>,
        arguments_file: impl Into<PathBuf>,
        output_prefix: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine_path: engine_path.into(),
            java_heap: java_heap.into(),
            arguments_file: arguments_file.into(),
            output_prefix: output_prefix.into(),
            f1r2_tar_gz: false,
            bam_output: false,
            timeout: None,
        }
    }

    /// Also request the per-region F1R2 orientation-bias archive
    pub fn with_f1r2_tar_gz(mut self, enabled: bool) -> Self {
        self.f1r2_tar_gz = enabled;
        self
    }

    /// Also request the per-region reassembly alignment file
    pub fn with_bam_output(mut self, enabled: bool) -> Self {
        self.bam_output = enabled;
        self
    }

    /// Wall-clock budget applied to every job (unbounded if absent)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The `{prefix}.{block}.vcf.gz` path a given block writes to
    pub fn output_path(&self, block: usize) -> PathBuf {
        self.numbered_path(block, "vcf.gz")
    }

    fn numbered_path(&self, block: usize, suffix: &str) -> PathBuf {
        let mut name = self.output_prefix.as_os_str().to_os_string();
        name.push(format!(".{block}.{suffix}"));
        PathBuf::from(name)
    }

    /// Build the invocation for one region
    ///
    /// `block` must be the region's 0-based position in the source sequence.
    pub fn build(&self, region: &Region, block: usize) -> JobSpec {
        let mut argv = vec![
            path_arg(&self.engine_path),
            "--java-options".to_string(),
            format!("{JAVA_OPTIONS_PREFIX}{}", self.java_heap),
            "Mutect2".to_string(),
            "--intervals".to_string(),
            region.interval(),
            "--arguments_file".to_string(),
            path_arg(&self.arguments_file),
            "--output".to_string(),
            path_arg(&self.output_path(block)),
        ];

        if self.f1r2_tar_gz {
            argv.push("--f1r2-tar-gz".to_string());
            argv.push(path_arg(&self.numbered_path(block, "tar.gz")));
        }

        if self.bam_output {
            argv.push("--bam-output".to_string());
            argv.push(path_arg(&self.numbered_path(block, "reassembly.bam")));
        }

        JobSpec {
            index: block,
            argv,
            timeout: self.timeout,
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(chrom: &str, start: u64, end: u64) -> Region {
        Region {
            chrom: chrom.to_string(),
            start,
            end,
        }
    }

    fn builder() -> CommandBuilder {
        CommandBuilder::new("/usr/local/bin/gatk", "4G", "/work/out.args", "out")
    }

    #[test]
    fn test_basic_invocation_shape() {
        let spec = builder().build(&region("chr1", 1, 100), 0);

        assert_eq!(spec.index, 0);
        assert_eq!(
            spec.argv,
            vec![
                "/usr/local/bin/gatk",
                "--java-options",
                "-XX:+UseSerialGC -Xmx4G",
                "Mutect2",
                "--intervals",
                "chr1:1-100",
                "--arguments_file",
                "/work/out.args",
                "--output",
                "out.0.vcf.gz",
            ]
        );
    }

    #[test]
    fn test_block_number_traces_sequence_position() {
        let b = builder();
        let regions = [
            region("chr1", 1, 100),
            region("chr1", 101, 200),
            region("chr2", 1, 50),
        ];

        let specs: Vec<JobSpec> = regions
            .iter()
            .enumerate()
            .map(|(i, r)| b.build(r, i))
            .collect();

        let intervals: Vec<&str> = specs.iter().map(|s| s.argv[5].as_str()).collect();
        assert_eq!(intervals, ["chr1:1-100", "chr1:101-200", "chr2:1-50"]);

        let outputs: Vec<&str> = specs.iter().map(|s| s.argv[9].as_str()).collect();
        assert_eq!(outputs, ["out.0.vcf.gz", "out.1.vcf.gz", "out.2.vcf.gz"]);
    }

    #[test]
    fn test_auxiliary_artifacts_requested_per_region() {
        let spec = builder()
            .with_f1r2_tar_gz(true)
            .with_bam_output(true)
            .build(&region("chr2", 1, 50), 7);

        let tail: Vec<&str> = spec.argv[10..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            [
                "--f1r2-tar-gz",
                "out.7.tar.gz",
                "--bam-output",
                "out.7.reassembly.bam",
            ]
        );
    }

    #[test]
    fn test_java_options_stay_one_argument() {
        let spec = builder().build(&region("chr1", 1, 10), 0);
        assert_eq!(spec.argv[2], "-XX:+UseSerialGC -Xmx4G");
    }

    #[test]
    fn test_timeout_carried_onto_spec() {
        let spec = builder()
            .with_timeout(Some(Duration::from_secs(30)))
            .build(&region("chr1", 1, 10), 0);
        assert_eq!(spec.timeout, Some(Duration::from_secs(30)));
    }
}
