use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mutect2_scatter::mutect2::Mutect2Options;
use mutect2_scatter::runner::{ScatterArgs, run_scatter};
use mutect2_scatter::vcf;

#[derive(Parser)]
#[command(name = "mutect2-scatter", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run Mutect2 concurrently over every interval in an interval list
    Run(RunArgs),

    /// Rewrite a VCF's sample header columns to TUMOR/NORMAL and re-index
    RenameSamples(RenameSamplesArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Interval list over which to operate; one sub-job per record
    #[arg(long)]
    intervals: PathBuf,

    /// Output prefix on files to which variants should be written
    #[arg(short = 'O', long)]
    output: PathBuf,

    /// JVM heap for the engine (e.g. 4G). This is NOT a GATK parameter.
    #[arg(long)]
    java_heap: String,

    /// Number of worker threads used by this wrapper. This is NOT a GATK parameter.
    #[arg(long)]
    nthreads: usize,

    /// GATK4 executable path
    #[arg(long, default_value = "/usr/local/bin/gatk")]
    gatk4_path: PathBuf,

    /// Max time for each job to run, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// If specified, collect F1R2 counts into per-region tar.gz archives
    #[arg(long)]
    f1r2_tar_gz: bool,

    /// If specified, assembled haplotypes will be written to per-region bams
    #[arg(long)]
    bam_output: bool,

    /// Quiet mode - minimal output, no progress display
    #[arg(short, long)]
    quiet: bool,

    #[command(flatten)]
    mutect2: Mutect2Options,
}

#[derive(clap::Args)]
struct RenameSamplesArgs {
    /// Tumor BAM; its @RG SM name is replaced with TUMOR
    #[arg(long)]
    tumor_bam: PathBuf,

    /// Block-compressed VCF to rewrite
    #[arg(long)]
    vcf: PathBuf,

    /// Output path for the rewritten, re-indexed VCF
    #[arg(long)]
    output: PathBuf,

    /// Normal BAM, if any; its @RG SM name is replaced with NORMAL
    #[arg(long)]
    normal_bam: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Run(run) => {
            init_tracing(run.quiet);
            run_scatter_command(run).await
        }
        Command::RenameSamples(rename) => {
            init_tracing(false);
            rename_samples_command(rename)
        }
    }
}

fn init_tracing(quiet: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter = if quiet {
        EnvFilter::new("mutect2_scatter=warn")
    } else {
        EnvFilter::new("mutect2_scatter=info")
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run_scatter_command(args: RunArgs) -> anyhow::Result<()> {
    let quiet = args.quiet;

    let summary = run_scatter(ScatterArgs {
        intervals: args.intervals,
        output_prefix: args.output,
        engine_path: args.gatk4_path,
        java_heap: args.java_heap,
        nthreads: args.nthreads,
        timeout: args.timeout,
        f1r2_tar_gz: args.f1r2_tar_gz,
        bam_output: args.bam_output,
        quiet,
        mutect2: args.mutect2,
    })
    .await?;

    if !quiet {
        println!();
        println!("Scatter Summary");
        println!("===============");
        println!("Run ID: {}", summary.run_id);
        println!("Jobs completed: {}", summary.total);
        println!(
            "Outputs found: {}/{}",
            summary.completeness.found, summary.completeness.expected
        );
        println!("Duration: {:.2}s", summary.duration.as_secs_f64());
    }

    Ok(())
}

fn rename_samples_command(args: RenameSamplesArgs) -> anyhow::Result<()> {
    let tumor_sample = vcf::read_sample_name(&args.tumor_bam)?;
    tracing::info!("Tumor sample: {}", tumor_sample);

    let normal_sample = args
        .normal_bam
        .as_ref()
        .map(vcf::read_sample_name)
        .transpose()?;
    if let Some(ref normal) = normal_sample {
        tracing::info!("Normal sample: {}", normal);
    }

    vcf::rename_samples(
        &args.vcf,
        &args.output,
        &tumor_sample,
        normal_sample.as_deref(),
    )?;

    tracing::info!("Rewrote {} -> {}", args.vcf.display(), args.output.display());
    Ok(())
}
