//! Sprite shattering CLI
//!
//! Slices an image with transparency into Voronoi pieces and writes one PNG
//! per piece plus a `manifest.yaml` describing where each piece goes.
//!
//! ## YAML config file
//!
//! ```yaml
//! pieces: 40
//! seed: 0
//! alpha_threshold: 8
//! mode: pivot          # or ratio
//! min_opaque_ratio: 0.01
//! sampling: biased     # or uniform
//! pixels_per_unit: 100
//! auto_trim: true
//! ```
//!
//! Run with: `shatter -i sprite.png -o out/ --config slice.yaml`
//!
//! Flags given on the command line override the config file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use shatter_core::export::Naming;
use shatter_core::{
    ExtractionStrategy, Sampling, Session, SliceConfig, Source, DEFAULT_ALPHA_THRESHOLD,
    DEFAULT_MIN_OPAQUE_RATIO, DEFAULT_PIXELS_PER_UNIT,
};

/// Piece counts the tool accepts
const MIN_PIECES: u64 = 5;
const MAX_PIECES: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    /// Trim and recenter so the pivot is the image centre; keeps every piece
    Pivot,
    /// Keep raw bounding boxes, drop pieces below --min-opaque-ratio
    Ratio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SamplingArg {
    Biased,
    Uniform,
}

impl From<SamplingArg> for Sampling {
    fn from(s: SamplingArg) -> Self {
        match s {
            SamplingArg::Biased => Sampling::AlphaBiased,
            SamplingArg::Uniform => Sampling::Uniform,
        }
    }
}

/// YAML config file format
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SliceSpec {
    #[serde(default)]
    pieces: Option<usize>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    alpha_threshold: Option<u8>,
    #[serde(default)]
    mode: Option<Mode>,
    #[serde(default)]
    min_opaque_ratio: Option<f64>,
    #[serde(default)]
    sampling: Option<SamplingArg>,
    #[serde(default)]
    pixels_per_unit: Option<f64>,
    #[serde(default)]
    auto_trim: Option<bool>,
    #[serde(default)]
    outline: Option<bool>,
}

fn load_spec(path: &PathBuf) -> anyhow::Result<SliceSpec> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {:?}", path))
}

#[derive(Parser, Debug)]
#[command(name = "shatter")]
#[command(about = "Slice a sprite into pivot-centred Voronoi pieces", long_about = None)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Input image path
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for piece PNGs and manifest.yaml
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of pieces to request (default 40)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(MIN_PIECES..=MAX_PIECES))]
    pieces: Option<u64>,

    /// Random seed for reproducibility (default 0)
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum alpha (0-255) for a pixel to count as opaque
    #[arg(long)]
    threshold: Option<u8>,

    /// Post-processing policy
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Opaque fraction below which ratio mode drops a piece
    #[arg(long)]
    min_opaque_ratio: Option<f64>,

    /// Seed placement
    #[arg(long, value_enum)]
    sampling: Option<SamplingArg>,

    /// Pixels per world unit for world-space centres
    #[arg(long)]
    ppu: Option<f64>,

    /// Slice the image as-is instead of cropping to its opaque bounds first
    #[arg(long)]
    no_auto_trim: bool,

    /// Write a reassembled preview PNG
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Draw cell outlines on the preview
    #[arg(long)]
    outline: bool,

    /// File name prefix for pieces
    #[arg(long, default_value = "piece")]
    prefix: String,

    /// YAML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Parameters after merging CLI flags over the config file
#[derive(Debug)]
struct Resolved {
    pieces: usize,
    seed: u64,
    config: SliceConfig,
}

fn resolve(args: &Args, spec: &SliceSpec) -> anyhow::Result<Resolved> {
    let pieces = args
        .pieces
        .map(|n| n as usize)
        .or(spec.pieces)
        .unwrap_or(40);
    if !(MIN_PIECES as usize..=MAX_PIECES as usize).contains(&pieces) {
        anyhow::bail!("piece count {} outside {}..={}", pieces, MIN_PIECES, MAX_PIECES);
    }

    let min_opaque_ratio = args
        .min_opaque_ratio
        .or(spec.min_opaque_ratio)
        .unwrap_or(DEFAULT_MIN_OPAQUE_RATIO);
    if !(0.0..=1.0).contains(&min_opaque_ratio) {
        anyhow::bail!("min opaque ratio {} outside 0..=1", min_opaque_ratio);
    }
    let strategy = match args.mode.or(spec.mode).unwrap_or(Mode::Pivot) {
        Mode::Pivot => ExtractionStrategy::PivotCentered,
        Mode::Ratio => ExtractionStrategy::RatioFilter { min_opaque_ratio },
    };

    let pixels_per_unit = args.ppu.or(spec.pixels_per_unit).unwrap_or(DEFAULT_PIXELS_PER_UNIT);
    if !(pixels_per_unit > 0.0 && pixels_per_unit.is_finite()) {
        anyhow::bail!("pixels per unit must be positive, got {}", pixels_per_unit);
    }

    let config = SliceConfig {
        alpha_threshold: args
            .threshold
            .or(spec.alpha_threshold)
            .unwrap_or(DEFAULT_ALPHA_THRESHOLD),
        strategy,
        sampling: args
            .sampling
            .or(spec.sampling)
            .map(Sampling::from)
            .unwrap_or_default(),
        auto_trim: !args.no_auto_trim && spec.auto_trim.unwrap_or(true),
        include_outline: args.outline || spec.outline.unwrap_or(false),
        pixels_per_unit,
    };

    Ok(Resolved {
        pieces,
        seed: args.seed.or(spec.seed).unwrap_or(0),
        config,
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let spec = args.config.as_ref().map(load_spec).transpose()?.unwrap_or_default();
    let resolved = resolve(&args, &spec)?;

    println!("Loading image: {:?}", args.input);
    let image = image::open(&args.input)
        .with_context(|| format!("failed to decode {:?}", args.input))?
        .to_rgba8();
    let (orig_w, orig_h) = image.dimensions();

    let source = Source::prepare(
        image,
        resolved.config.alpha_threshold,
        resolved.config.auto_trim,
    )?;
    let (width, height) = source.image().dimensions();
    if (width, height) != (orig_w, orig_h) {
        let (ox, oy) = source.trim_offset();
        println!(
            "Trimmed {}x{} -> {}x{} at ({}, {})",
            orig_w, orig_h, width, height, ox, oy
        );
    } else {
        println!("Image size: {}x{}", width, height);
    }

    let mut session = Session::new(source, resolved.config);
    println!(
        "Slicing into {} pieces (seed: {}, {:?})",
        resolved.pieces, resolved.seed, resolved.config.strategy
    );
    let result = session.slice(resolved.pieces, resolved.seed);
    let pieces = &result.sliced.pieces;
    if pieces.len() < resolved.pieces {
        println!(
            "  {} of {} cells produced no piece",
            resolved.pieces - pieces.len(),
            resolved.pieces
        );
    }

    if let Some(preview_path) = &args.preview {
        session
            .preview(&result)
            .save(preview_path)
            .with_context(|| format!("failed to write preview {:?}", preview_path))?;
        println!("Preview saved to: {:?}", preview_path);
    }

    let Some(output_dir) = args.output_dir.as_ref() else {
        if args.preview.is_none() {
            anyhow::bail!("nothing to do: pass -o/--output-dir and/or --preview");
        }
        return Ok(());
    };

    let naming = Naming {
        prefix: args.prefix.clone(),
    };
    let bundle = session.export(&result, &naming);
    write_bundle(output_dir, &bundle)?;

    println!(
        "Output saved to: {:?} ({} pieces, {} failed)",
        output_dir,
        bundle.files.len(),
        bundle.failures.len()
    );
    if !bundle.failures.is_empty() {
        for failure in &bundle.failures {
            eprintln!("  {}", failure);
        }
        anyhow::bail!("{} pieces failed to encode", bundle.failures.len());
    }
    Ok(())
}

/// Write every encoded piece and then the manifest
fn write_bundle(dir: &Path, bundle: &shatter_core::export::ExportBundle) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {:?}", dir))?;

    let progress = ProgressBar::new(bundle.files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    for file in &bundle.files {
        let path = dir.join(&file.file_name);
        std::fs::write(&path, &file.png).with_context(|| format!("failed to write {:?}", path))?;
        progress.set_message(file.file_name.clone());
        progress.inc(1);
    }
    progress.finish_with_message("pieces written");

    let manifest_path = dir.join("manifest.yaml");
    let yaml = serde_yaml::to_string(&bundle.manifest).context("failed to serialize manifest")?;
    std::fs::write(&manifest_path, yaml)
        .with_context(|| format!("failed to write {:?}", manifest_path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["shatter", "-i", "in.png"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_without_config() {
        let r = resolve(&args(&[]), &SliceSpec::default()).unwrap();
        assert_eq!(r.pieces, 40);
        assert_eq!(r.seed, 0);
        assert_eq!(r.config, SliceConfig::default());
    }

    #[test]
    fn flags_override_config() {
        let spec: SliceSpec = serde_yaml::from_str(
            "pieces: 12\nseed: 3\nmode: ratio\nmin_opaque_ratio: 0.2\nsampling: uniform\n",
        )
        .unwrap();
        let r = resolve(&args(&["-n", "20"]), &spec).unwrap();
        assert_eq!(r.pieces, 20);
        assert_eq!(r.seed, 3);
        assert_eq!(r.config.strategy, ExtractionStrategy::RatioFilter { min_opaque_ratio: 0.2 });
        assert_eq!(r.config.sampling, Sampling::Uniform);

        let r = resolve(&args(&["--mode", "pivot"]), &spec).unwrap();
        assert_eq!(r.config.strategy, ExtractionStrategy::PivotCentered);
    }

    #[test]
    fn piece_count_is_range_checked() {
        assert!(Args::try_parse_from(["shatter", "-i", "a.png", "-n", "4"]).is_err());
        assert!(Args::try_parse_from(["shatter", "-i", "a.png", "-n", "301"]).is_err());
        let spec: SliceSpec = serde_yaml::from_str("pieces: 1000").unwrap();
        assert!(resolve(&args(&[]), &spec).is_err());
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(serde_yaml::from_str::<SliceSpec>("piece_count: 5").is_err());
    }
}
