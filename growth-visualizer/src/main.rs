use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use image::{ImageBuffer, Rgb, RgbImage};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, info, warn, LevelFilter};
use palette::{FromColor, Hsv, Srgb};
use plotters::prelude::*;
use rayon::prelude::*;
use growth_common::Snapshot;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input snapshot stream (.bin written with format = "bincode")
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving one PNG per snapshot
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// Which field to draw for 2-D and 3-D lattices
    #[arg(long, value_enum, default_value_t = FieldChoice::Phi)]
    field: FieldChoice,

    /// Width of each frame in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Height of 1-D profile frames in pixels
    #[arg(long, default_value_t = 400)]
    height: u32,

    /// Lower end of the color scale (defaults to the minimum over all snapshots)
    #[arg(long)]
    min: Option<f64>,

    /// Upper end of the color scale (defaults to the maximum over all snapshots)
    #[arg(long)]
    max: Option<f64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FieldChoice {
    Phi,
    Nutrient,
}

impl FieldChoice {
    fn values(self, snapshot: &Snapshot) -> &[f64] {
        match self {
            FieldChoice::Phi => &snapshot.phi,
            FieldChoice::Nutrient => &snapshot.nutrient,
        }
    }
}

/// Blue (low) to red (high) through the HSV hue circle.
fn heat_color(t: f64) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
    let hsv = Hsv::new(240.0 * (1.0 - t as f32), 0.85, 0.95);
    let rgb: Srgb<u8> = Srgb::<f32>::from_color(hsv).into_format();
    Rgb([rgb.red, rgb.green, rgb.blue])
}

/// Finite min/max of `values`, or `None` if there are none.
fn value_range<'a>(values: impl Iterator<Item = &'a f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// The 2-D plane drawn for a snapshot: the whole field in 2-D, the central
/// slice along axis 0 in 3-D. Returns `(rows, cols, values)`.
fn plane(snapshot: &Snapshot, field: FieldChoice) -> Option<(usize, usize, &[f64])> {
    let values = field.values(snapshot);
    match snapshot.shape.as_slice() {
        &[rows, cols] if values.len() == rows * cols => Some((rows, cols, values)),
        &[depth, rows, cols] => {
            let offset = (depth / 2) * rows * cols;
            values.get(offset..offset + rows * cols).map(|slice| (rows, cols, slice))
        }
        _ => None,
    }
}

/// Heat map of a 2-D plane, scaled to `width` pixels across.
fn draw_heatmap(rows: usize, cols: usize, values: &[f64], width: u32, range: (f64, f64)) -> RgbImage {
    let cell_px = (width as usize / cols.max(1)).max(1) as u32;
    let (lo, hi) = range;
    let span = if hi > lo { hi - lo } else { 1.0 };
    ImageBuffer::from_fn(cols as u32 * cell_px, rows as u32 * cell_px, |x, y| {
        let row = (y / cell_px) as usize;
        let col = (x / cell_px) as usize;
        heat_color((values[row * cols + col] - lo) / span)
    })
}

/// Line chart of both fields along a 1-D lattice.
fn draw_profile(snapshot: &Snapshot, path: &Path, width: u32, height: u32, range: (f64, f64)) -> Result<()> {
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow::anyhow!("Failed to clear frame: {:?}", e))?;

    let n = snapshot.phi.len().max(2);
    let (lo, hi) = range;
    let hi = if hi > lo { hi } else { lo + 1.0 };
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(0f64..(n - 1) as f64, lo..hi)
        .map_err(|e| anyhow::anyhow!("Failed to build chart: {:?}", e))?;

    for (values, color) in [(&snapshot.phi, &RED), (&snapshot.nutrient, &BLUE)] {
        chart
            .draw_series(LineSeries::new(values.iter().enumerate().map(|(i, &v)| (i as f64, v)), color))
            .map_err(|e| anyhow::anyhow!("Failed to draw profile: {:?}", e))?;
    }
    root.present().map_err(|e| anyhow::anyhow!("Failed to write {}: {:?}", path.display(), e))?;
    Ok(())
}

/// Reads the `u32` count header followed by that many snapshots.
fn read_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let input_file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let mut reader = BufReader::new(input_file);

    let snapshot_count: u32 = bincode::deserialize_from(&mut reader)
        .context("Failed to read snapshot count from header")?;
    info!("Found {} snapshots in the file", snapshot_count);

    let mut snapshots = Vec::with_capacity(snapshot_count as usize);
    for i in 0..snapshot_count {
        match bincode::deserialize_from::<_, Snapshot>(&mut reader) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                warn!("Stopped reading at snapshot {} of {}: {}", i, snapshot_count, e);
                break;
            }
        }
    }
    Ok(snapshots)
}

fn render_frame(snapshot: &Snapshot, index: usize, args: &Args, range: (f64, f64)) -> Result<PathBuf> {
    let path = args.output.join(format!("frame_{:05}.png", index));
    if snapshot.ndim() == 1 {
        draw_profile(snapshot, &path, args.width, args.height, range)?;
    } else {
        let (rows, cols, values) = plane(snapshot, args.field)
            .with_context(|| format!("Snapshot {} has unsupported shape {:?}", index, snapshot.shape))?;
        draw_heatmap(rows, cols, values, args.width, range)
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(path)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    Builder::from_default_env()
    .filter(None, LevelFilter::Info)
    .init();

    info!("Starting Tumor Growth Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Output directory: {}", args.output.display());

    let snapshots = read_snapshots(&args.input)?;
    if snapshots.is_empty() {
        warn!("Input file contains no snapshots. Exiting.");
        return Ok(());
    }
    let first = &snapshots[0];
    info!("Lattice shape: {:?} ({} snapshots, t = {:.4} .. {:.4})",
        first.shape, snapshots.len(), first.time, snapshots[snapshots.len() - 1].time);

    // 1-D profiles share one axis for both fields; heat maps use the selected field.
    let data_range = value_range(snapshots.iter().flat_map(|s| {
        if s.ndim() == 1 {
            s.phi.iter().chain(s.nutrient.iter())
        } else {
            args.field.values(s).iter().chain([].iter())
        }
    }))
    .unwrap_or((0.0, 1.0));
    let range = (args.min.unwrap_or(data_range.0), args.max.unwrap_or(data_range.1));
    info!("Color scale: [{:.4}, {:.4}]", range.0, range.1);

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {}", args.output.display()))?;

    let progress_bar = ProgressBar::new(snapshots.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let written: Vec<PathBuf> = snapshots
        .par_iter()
        .enumerate()
        .progress_with(progress_bar.clone())
        .map(|(i, snapshot)| render_frame(snapshot, i, &args, range))
        .collect::<Result<_>>()?;
    progress_bar.finish();

    debug!("Frames: {:?}", written);
    info!(
        "Rendered {} frames in {:.2} s to {}",
        written.len(),
        start_time.elapsed().as_secs_f64(),
        args.output.display()
    );

    Ok(())
}
