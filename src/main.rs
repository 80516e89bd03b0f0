use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use varscore::{
    BamReadEvidence, CallStream, IndelCall, ModelRegistry, OverlapTracker, Released, Settings,
    SiteCall, DEFAULT_MODEL_NAME,
};

#[derive(Parser, Debug)]
#[command(name = "varscore", about = "Calibrated scoring and block phasing of small-variant calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List and validate the models in a parameter file.
    Models {
        /// Parameter file (JSON).
        params: PathBuf,
    },
    /// Score a JSON-lines stream of site and indel calls.
    Classify {
        /// Input calls, one `{"site": ...}` or `{"indel": ...}` object per line (`-` for stdin).
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Parameter file with calibrated models.
        #[arg(long)]
        models: Option<PathBuf>,
        /// Name of the model to apply.
        #[arg(long, default_value = DEFAULT_MODEL_NAME)]
        model: String,
        /// Chromosome depth table (`chrom<TAB>avg[<TAB>median]`).
        #[arg(long)]
        depth: Option<PathBuf>,
        /// Indexed BAM supplying reads for phasing; phasing is skipped without it.
        #[arg(long)]
        bam: Option<PathBuf>,
        /// Settings file overriding filter and phasing options (JSON).
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum CallLine {
    Site(SiteCall),
    Indel(IndelCall),
}

#[derive(Debug, Serialize)]
struct Emitted<'a> {
    #[serde(flatten)]
    call: &'a CallLine,
    gt: &'static str,
    filter: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Models { params } => run_models(&params)?,
        Commands::Classify {
            input,
            models,
            model,
            depth,
            bam,
            settings,
        } => run_classify(ClassifyArgs {
            input,
            models,
            model,
            depth,
            bam,
            settings,
        })?,
    }

    Ok(())
}

fn run_models(params: &Path) -> Result<()> {
    let mut registry = ModelRegistry::default();
    registry
        .load_models(params)
        .with_context(|| format!("failed to load models from {}", params.display()))?;

    for model in registry.models() {
        let cases: Vec<&str> = model.cases().map(|case| case.label()).collect();
        println!(
            "{}\t{}\t{}\t{}",
            model.name(),
            model.kind(),
            cases.join(","),
            model.fingerprint()
        );
    }
    Ok(())
}

struct ClassifyArgs {
    input: PathBuf,
    models: Option<PathBuf>,
    model: String,
    depth: Option<PathBuf>,
    bam: Option<PathBuf>,
    settings: Option<PathBuf>,
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    let settings = match &args.settings {
        Some(path) => Settings::from_path(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let mut registry = ModelRegistry::new(settings.gvcf.clone());
    if let Some(path) = &args.models {
        registry
            .load_models(path)
            .with_context(|| format!("failed to load models from {}", path.display()))?;
    }
    registry
        .set_model(&args.model)
        .context("failed to select scoring model")?;
    if let Some(path) = &args.depth {
        registry
            .load_chr_depth_stats(path)
            .with_context(|| format!("failed to load chromosome depths from {}", path.display()))?;
    }

    let mut evidence = match &args.bam {
        Some(path) => Some(
            BamReadEvidence::from_path(path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => {
            warn!("no BAM given, sites are emitted unphased");
            None
        }
    };

    let reader: Box<dyn BufRead> = if args.input == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input).with_context(|| {
            format!("failed to open calls file {}", args.input.display())
        })?))
    };
    let mut out = BufWriter::new(io::stdout().lock());

    let mut stream = CallStream::new(&registry, settings.phasing.clone());
    let mut tracker = OverlapTracker::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let call: CallLine = serde_json::from_str(&line)
            .with_context(|| format!("invalid call record on line {}", line_no + 1))?;

        let released = match call {
            CallLine::Indel(indel) => tracker.push_indel(indel, &mut stream),
            CallLine::Site(site) => tracker.push_site(site, &mut stream),
        }
        .with_context(|| format!("call record on line {}", line_no + 1))?;
        forward(released, &mut stream, evidence.as_mut(), &mut out)?;
    }

    let released = tracker.finish(&mut stream)?;
    forward(released, &mut stream, evidence.as_mut(), &mut out)?;
    if let Some(bam) = evidence.as_mut() {
        for site in stream.finish(bam)? {
            emit(&mut out, CallLine::Site(site))?;
        }
    }
    out.flush()?;

    let (sites, indels) = stream.counts();
    info!(sites, indels, model = registry.model_name(), "classification complete");
    Ok(())
}

/// Classify and emit released calls, phasing sites when reads are available.
fn forward(
    released: Vec<Released>,
    stream: &mut CallStream<'_>,
    mut evidence: Option<&mut BamReadEvidence>,
    out: &mut impl Write,
) -> Result<()> {
    for call in released {
        match call {
            Released::Indel(indel) => emit(out, CallLine::Indel(indel))?,
            Released::Site(site) => {
                let ready = match evidence.as_deref_mut() {
                    Some(bam) => stream.push_site(site, bam)?,
                    None => vec![stream.classify_site(site)?],
                };
                for site in ready {
                    emit(out, CallLine::Site(site))?;
                }
            }
        }
    }
    Ok(())
}

fn emit(out: &mut impl Write, call: CallLine) -> Result<()> {
    let (gt, filter) = match &call {
        CallLine::Site(site) => (site.genotype()?, site.smod.shared.filters.render()),
        CallLine::Indel(indel) => (indel.genotype()?, indel.imod.shared.filters.render()),
    };
    let record = Emitted {
        call: &call,
        gt,
        filter,
    };
    serde_json::to_writer(&mut *out, &record)?;
    writeln!(out)?;
    Ok(())
}
