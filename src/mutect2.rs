//! The enumerated Mutect2 option set and the shared argument file
//!
//! Every engine option the wrapper accepts is a named field here, making this
//! struct the single source of truth for CLI parsing and for argument-file
//! emission. Values are passed through to the engine verbatim; the engine owns
//! their validation. Wrapper-only parameters (output prefix, intervals, pool
//! size, heap, engine path, timeout, per-region artifact flags) live outside
//! this struct and never reach the argument file.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::error::Result;

/// Engine options forwarded to Mutect2 through `--arguments_file`
#[derive(Debug, Clone, Default, Args)]
pub struct Mutect2Options {
    /// BAM files.
    #[arg(short = 'I', long, required = true)]
    pub input: Vec<String>,

    /// Reference sequence file.
    #[arg(short = 'R', long, required = true)]
    pub reference: Option<String>,

    /// Minimum probability for a locus to be considered active.
    #[arg(long)]
    pub active_probability_threshold: Option<String>,

    /// Initial base error rate estimate for adaptive pruning.
    #[arg(long)]
    pub adaptive_pruning_initial_error_rate: Option<String>,

    /// Population allele fraction assigned to alleles not found in the germline resource.
    #[arg(long)]
    pub af_of_alleles_not_in_resource: Option<String>,

    /// Allow graphs that have non-unique kmers in the reference.
    #[arg(long)]
    pub allow_non_unique_kmers_in_ref: bool,

    /// Number of additional bases of context to include around each assembly region.
    #[arg(long)]
    pub assembly_region_padding: Option<String>,

    /// Which haplotypes should be written to the BAM.
    #[arg(long)]
    pub bam_writer_type: Option<String>,

    /// Base qualities below this threshold will be reduced to the minimum (6).
    #[arg(long)]
    pub base_quality_score_threshold: Option<String>,

    /// Minimum depth to be considered callable for Mutect stats. Does not affect genotyping.
    #[arg(long)]
    pub callable_depth: Option<String>,

    /// Disable the adaptive algorithm for pruning paths in the graph.
    #[arg(long)]
    pub disable_adaptive_pruning: bool,

    /// If true, don't cache bam indexes; reduces memory at a possible speed cost.
    #[arg(long)]
    pub disable_bam_index_caching: bool,

    /// Do not check the sequence dictionaries from our inputs for compatibility.
    #[arg(long)]
    pub disable_sequence_dictionary_validation: bool,

    /// Disable all tool default annotations.
    #[arg(long)]
    pub disable_tool_default_annotations: bool,

    /// Disable iterating over kmer sizes when graph cycles are detected.
    #[arg(long)]
    pub dont_increase_kmer_sizes_for_cycles: bool,

    /// Do not trim the active region from the full region to just the active interval.
    #[arg(long)]
    pub dont_trim_active_regions: bool,

    /// Do not analyze soft clipped bases in the reads.
    #[arg(long)]
    pub dont_use_soft_clipped_bases: bool,

    /// Downsample a pool of reads starting within a range of one or more bases.
    #[arg(long)]
    pub downsampling_stride: Option<String>,

    /// (BETA feature) Mode for emitting reference confidence scores.
    #[arg(long)]
    pub emit_ref_confidence: Option<String>,

    /// Use all possible annotations.
    #[arg(long)]
    pub enable_all_annotations: bool,

    /// Sites with depth higher than this value will be grouped.
    #[arg(long)]
    pub f1r2_max_depth: Option<String>,

    /// Skip sites with median mapping quality below this value.
    #[arg(long)]
    pub f1r2_median_mq: Option<String>,

    /// Exclude bases below this quality from pileup.
    #[arg(long)]
    pub f1r2_min_bq: Option<String>,

    /// If provided, all regions will be marked as active.
    #[arg(long)]
    pub force_active: bool,

    /// Whether to force genotype even filtered alleles.
    #[arg(long)]
    pub genotype_filtered_alleles: bool,

    /// (EXPERIMENTAL) Call all apparent germline sites even though they will be filtered.
    #[arg(long)]
    pub genotype_germline_sites: bool,

    /// Call sites in the PoN even though they will ultimately be filtered.
    #[arg(long)]
    pub genotype_pon_sites: bool,

    /// Population vcf of germline sequencing containing allele fractions.
    #[arg(long)]
    pub germline_resource: Option<String>,

    /// Exclusive upper bounds for reference confidence LOD bands.
    #[arg(long)]
    pub gvcf_lod_band: Option<String>,

    /// Turn off the read transformer that clips artifacts near inverted tandem repeats.
    #[arg(long)]
    pub ignore_itr_artifacts: bool,

    /// Log 10 odds threshold to consider pileup active.
    #[arg(long)]
    pub initial_tumor_lod: Option<String>,

    /// Interval merging rule for abutting intervals.
    #[arg(long)]
    pub interval_merging_rule: Option<String>,

    /// Kmer size to use in the read threading assembler.
    #[arg(long)]
    pub kmer_size: Option<String>,

    /// Maximum size of an assembly region.
    #[arg(long)]
    pub max_assembly_region_size: Option<String>,

    /// Phased substitutions separated by this distance or less are merged into MNPs.
    #[arg(long)]
    pub max_mnp_distance: Option<String>,

    /// Maximum number of haplotypes to consider for your population.
    #[arg(long)]
    pub max_num_haplotypes_in_population: Option<String>,

    /// Maximum population allele frequency in tumor-only mode.
    #[arg(long)]
    pub max_population_af: Option<String>,

    /// Upper limit on how far probability mass can be moved when calculating region boundaries.
    #[arg(long)]
    pub max_prob_propagation_distance: Option<String>,

    /// Maximum number of reads to retain per alignment start position. 0 disables.
    #[arg(long)]
    pub max_reads_per_alignment_start: Option<String>,

    /// Maximum number of suspicious reads allowed in a downsampling stride. 0 disables.
    #[arg(long)]
    pub max_suspicious_reads_per_alignment_start: Option<String>,

    /// Maximum number of variants in graph the adaptive pruner will allow.
    #[arg(long)]
    pub max_unpruned_variants: Option<String>,

    /// Minimum size of an assembly region.
    #[arg(long)]
    pub min_assembly_region_size: Option<String>,

    /// Minimum base quality required to consider a base for calling.
    #[arg(long)]
    pub min_base_quality_score: Option<String>,

    /// Minimum length of a dangling branch to attempt recovery.
    #[arg(long)]
    pub min_dangling_branch_length: Option<String>,

    /// Minimum support to not prune paths in the graph.
    #[arg(long)]
    pub min_pruning: Option<String>,

    /// Lower bound of variant allele fractions to consider when calculating variant LOD.
    #[arg(long)]
    pub minimum_allele_fraction: Option<String>,

    /// Mitochondria mode sets emission and initial LODs to 0.
    #[arg(long)]
    pub mitochondria_mode: bool,

    /// How many threads a native pairHMM implementation should use.
    #[arg(long)]
    pub native_pair_hmm_threads: Option<String>,

    /// Use double precision in the native pairHmm.
    #[arg(long)]
    pub native_pair_hmm_use_double_precision: bool,

    /// Log 10 odds threshold for calling normal variant non-germline.
    #[arg(long)]
    pub normal_lod: Option<String>,

    /// BAM sample name of normal(s), if any.
    #[arg(long)]
    pub normal_sample: Option<String>,

    /// Number of samples that must pass the minPruning threshold.
    #[arg(long)]
    pub num_pruning_samples: Option<String>,

    /// Flat gap continuation penalty for use in the Pair HMM.
    #[arg(long)]
    pub pair_hmm_gap_continuation_penalty: Option<String>,

    /// The PairHMM implementation to use for genotype likelihood calculations.
    #[arg(long)]
    pub pair_hmm_implementation: Option<String>,

    /// VCF file of sites observed in normal.
    #[arg(long)]
    pub panel_of_normals: Option<String>,

    /// The PCR indel model to use.
    #[arg(long)]
    pub pcr_indel_model: Option<String>,

    /// Phred-scaled PCR indel qual for overlapping fragments.
    #[arg(long)]
    pub pcr_indel_qual: Option<String>,

    /// Phred-scaled PCR SNV qual for overlapping fragments.
    #[arg(long)]
    pub pcr_snv_qual: Option<String>,

    /// Pedigree file for determining the population "founders".
    #[arg(long)]
    pub pedigree: Option<String>,

    /// The global assumed mismapping rate for reads.
    #[arg(long)]
    pub phred_scaled_global_read_mismapping_rate: Option<String>,

    /// Ln likelihood ratio threshold for the adaptive pruning algorithm.
    #[arg(long)]
    pub pruning_lod_threshold: Option<String>,

    /// Recover all dangling branches.
    #[arg(long)]
    pub recover_all_dangling_branches: bool,

    /// Display hidden arguments.
    #[arg(long = "showHidden")]
    pub show_hidden: bool,

    /// If true, don't emit genotype fields when writing vcf file output.
    #[arg(long)]
    pub sites_only_vcf_output: bool,

    /// Which Smith-Waterman implementation to use.
    #[arg(long)]
    pub smith_waterman: Option<String>,

    /// Log 10 odds threshold to emit variant to VCF.
    #[arg(long)]
    pub tumor_lod_to_emit: Option<String>,
}

impl Mutect2Options {
    /// One `--flag value` (or bare `--flag`) line per set option, in
    /// declaration order
    pub fn argument_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for input in &self.input {
            lines.push(format!("--input {input}"));
        }
        value(&mut lines, "--reference", &self.reference);
        value(
            &mut lines,
            "--active-probability-threshold",
            &self.active_probability_threshold,
        );
        value(
            &mut lines,
            "--adaptive-pruning-initial-error-rate",
            &self.adaptive_pruning_initial_error_rate,
        );
        value(
            &mut lines,
            "--af-of-alleles-not-in-resource",
            &self.af_of_alleles_not_in_resource,
        );
        flag(
            &mut lines,
            "--allow-non-unique-kmers-in-ref",
            self.allow_non_unique_kmers_in_ref,
        );
        value(
            &mut lines,
            "--assembly-region-padding",
            &self.assembly_region_padding,
        );
        value(&mut lines, "--bam-writer-type", &self.bam_writer_type);
        value(
            &mut lines,
            "--base-quality-score-threshold",
            &self.base_quality_score_threshold,
        );
        value(&mut lines, "--callable-depth", &self.callable_depth);
        flag(
            &mut lines,
            "--disable-adaptive-pruning",
            self.disable_adaptive_pruning,
        );
        flag(
            &mut lines,
            "--disable-bam-index-caching",
            self.disable_bam_index_caching,
        );
        flag(
            &mut lines,
            "--disable-sequence-dictionary-validation",
            self.disable_sequence_dictionary_validation,
        );
        flag(
            &mut lines,
            "--disable-tool-default-annotations",
            self.disable_tool_default_annotations,
        );
        flag(
            &mut lines,
            "--dont-increase-kmer-sizes-for-cycles",
            self.dont_increase_kmer_sizes_for_cycles,
        );
        flag(
            &mut lines,
            "--dont-trim-active-regions",
            self.dont_trim_active_regions,
        );
        flag(
            &mut lines,
            "--dont-use-soft-clipped-bases",
            self.dont_use_soft_clipped_bases,
        );
        value(&mut lines, "--downsampling-stride", &self.downsampling_stride);
        value(&mut lines, "--emit-ref-confidence", &self.emit_ref_confidence);
        flag(
            &mut lines,
            "--enable-all-annotations",
            self.enable_all_annotations,
        );
        value(&mut lines, "--f1r2-max-depth", &self.f1r2_max_depth);
        value(&mut lines, "--f1r2-median-mq", &self.f1r2_median_mq);
        value(&mut lines, "--f1r2-min-bq", &self.f1r2_min_bq);
        flag(&mut lines, "--force-active", self.force_active);
        flag(
            &mut lines,
            "--genotype-filtered-alleles",
            self.genotype_filtered_alleles,
        );
        flag(
            &mut lines,
            "--genotype-germline-sites",
            self.genotype_germline_sites,
        );
        flag(&mut lines, "--genotype-pon-sites", self.genotype_pon_sites);
        value(&mut lines, "--germline-resource", &self.germline_resource);
        value(&mut lines, "--gvcf-lod-band", &self.gvcf_lod_band);
        flag(
            &mut lines,
            "--ignore-itr-artifacts",
            self.ignore_itr_artifacts,
        );
        value(&mut lines, "--initial-tumor-lod", &self.initial_tumor_lod);
        value(
            &mut lines,
            "--interval-merging-rule",
            &self.interval_merging_rule,
        );
        value(&mut lines, "--kmer-size", &self.kmer_size);
        value(
            &mut lines,
            "--max-assembly-region-size",
            &self.max_assembly_region_size,
        );
        value(&mut lines, "--max-mnp-distance", &self.max_mnp_distance);
        value(
            &mut lines,
            "--max-num-haplotypes-in-population",
            &self.max_num_haplotypes_in_population,
        );
        value(&mut lines, "--max-population-af", &self.max_population_af);
        value(
            &mut lines,
            "--max-prob-propagation-distance",
            &self.max_prob_propagation_distance,
        );
        value(
            &mut lines,
            "--max-reads-per-alignment-start",
            &self.max_reads_per_alignment_start,
        );
        value(
            &mut lines,
            "--max-suspicious-reads-per-alignment-start",
            &self.max_suspicious_reads_per_alignment_start,
        );
        value(
            &mut lines,
            "--max-unpruned-variants",
            &self.max_unpruned_variants,
        );
        value(
            &mut lines,
            "--min-assembly-region-size",
            &self.min_assembly_region_size,
        );
        value(
            &mut lines,
            "--min-base-quality-score",
            &self.min_base_quality_score,
        );
        value(
            &mut lines,
            "--min-dangling-branch-length",
            &self.min_dangling_branch_length,
        );
        value(&mut lines, "--min-pruning", &self.min_pruning);
        value(
            &mut lines,
            "--minimum-allele-fraction",
            &self.minimum_allele_fraction,
        );
        flag(&mut lines, "--mitochondria-mode", self.mitochondria_mode);
        value(
            &mut lines,
            "--native-pair-hmm-threads",
            &self.native_pair_hmm_threads,
        );
        flag(
            &mut lines,
            "--native-pair-hmm-use-double-precision",
            self.native_pair_hmm_use_double_precision,
        );
        value(&mut lines, "--normal-lod", &self.normal_lod);
        value(&mut lines, "--normal-sample", &self.normal_sample);
        value(&mut lines, "--num-pruning-samples", &self.num_pruning_samples);
        value(
            &mut lines,
            "--pair-hmm-gap-continuation-penalty",
            &self.pair_hmm_gap_continuation_penalty,
        );
        value(
            &mut lines,
            "--pair-hmm-implementation",
            &self.pair_hmm_implementation,
        );
        value(&mut lines, "--panel-of-normals", &self.panel_of_normals);
        value(&mut lines, "--pcr-indel-model", &self.pcr_indel_model);
        value(&mut lines, "--pcr-indel-qual", &self.pcr_indel_qual);
        value(&mut lines, "--pcr-snv-qual", &self.pcr_snv_qual);
        value(&mut lines, "--pedigree", &self.pedigree);
        value(
            &mut lines,
            "--phred-scaled-global-read-mismapping-rate",
            &self.phred_scaled_global_read_mismapping_rate,
        );
        value(
            &mut lines,
            "--pruning-lod-threshold",
            &self.pruning_lod_threshold,
        );
        flag(
            &mut lines,
            "--recover-all-dangling-branches",
            self.recover_all_dangling_branches,
        );
        flag(&mut lines, "--showHidden", self.show_hidden);
        flag(
            &mut lines,
            "--sites-only-vcf-output",
            self.sites_only_vcf_output,
        );
        value(&mut lines, "--smith-waterman", &self.smith_waterman);
        value(&mut lines, "--tumor-lod-to-emit", &self.tumor_lod_to_emit);

        lines
    }

    /// Write the newline-delimited argument file and return its absolute path
    ///
    /// Built once per run and shared read-only by every per-region job.
    pub fn write_arguments_file(&self, path: &Path) -> Result<PathBuf> {
        let mut contents = self.argument_lines().join("\n");
        contents.push('\n');
        std::fs::write(path, contents)?;
        Ok(std::path::absolute(path)?)
    }
}

fn value(lines: &mut Vec<String>, name: &str, opt: &Option<String>) {
    if let Some(v) = opt {
        lines.push(format!("{name} {v}"));
    }
}

fn flag(lines: &mut Vec<String>, name: &str, set: bool) {
    if set {
        lines.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_unset_options_are_omitted() {
        let options = Mutect2Options {
            input: vec!["tumor.bam".to_string()],
            reference: Some("grch38.fa".to_string()),
            ..Default::default()
        };

        assert_eq!(
            options.argument_lines(),
            vec!["--input tumor.bam", "--reference grch38.fa"]
        );
    }

    #[test]
    fn test_repeated_inputs_and_flag_styles() {
        let options = Mutect2Options {
            input: vec!["tumor.bam".to_string(), "normal.bam".to_string()],
            reference: Some("grch38.fa".to_string()),
            callable_depth: Some("10".to_string()),
            mitochondria_mode: true,
            show_hidden: true,
            ..Default::default()
        };

        let lines = options.argument_lines();
        assert_eq!(lines[0], "--input tumor.bam");
        assert_eq!(lines[1], "--input normal.bam");
        assert!(lines.contains(&"--callable-depth 10".to_string()));
        // Boolean flags emit with no value, and the one camelCase engine flag
        // keeps its spelling
        assert!(lines.contains(&"--mitochondria-mode".to_string()));
        assert!(lines.contains(&"--showHidden".to_string()));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let options = Mutect2Options {
            input: vec!["t.bam".to_string()],
            reference: Some("ref.fa".to_string()),
            tumor_lod_to_emit: Some("3.0".to_string()),
            active_probability_threshold: Some("0.002".to_string()),
            ..Default::default()
        };

        let lines = options.argument_lines();
        assert_eq!(
            lines,
            vec![
                "--input t.bam",
                "--reference ref.fa",
                "--active-probability-threshold 0.002",
                "--tumor-lod-to-emit 3.0",
            ]
        );
    }

    #[test]
    fn test_arguments_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.args");

        let options = Mutect2Options {
            input: vec!["tumor.bam".to_string()],
            reference: Some("grch38.fa".to_string()),
            panel_of_normals: Some("pon.vcf.gz".to_string()),
            ..Default::default()
        };

        let written = options.write_arguments_file(&path).unwrap();
        assert!(written.is_absolute());

        let contents = std::fs::read_to_string(&written).unwrap();
        assert_eq!(
            contents,
            "--input tumor.bam\n--reference grch38.fa\n--panel-of-normals pon.vcf.gz\n"
        );
    }
}
