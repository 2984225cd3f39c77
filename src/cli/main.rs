#![warn(clippy::all, clippy::pedantic)]

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use csv::{Reader, Writer};
use gridcut::{segment, RegionStats};
use itertools::Itertools;
use log::LevelFilter;
use serde::Deserialize;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Row of the input intensity table, pixels in row-major order.
#[derive(Clone, Copy, Debug, Deserialize)]
struct PixelRow {
    intensity: f32,
}

/// A rectangular seed region, parsed from `x,y,w,h`.
#[derive(Clone, Copy, Debug)]
struct Roi {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

impl FromStr for Roi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Result<Vec<usize>, _> = s
            .split(',')
            .map(|field| field.trim().parse::<usize>())
            .collect();
        match fields.map_err(|e| format!("invalid rectangle `{s}`: {e}"))?[..] {
            [x, y, w, h] => Ok(Self { x, y, w, h }),
            _ => Err(format!("invalid rectangle `{s}`: expected x,y,w,h")),
        }
    }
}

/// Binary image segmentation by graph minimum cut.
#[derive(Parser, Debug)]
#[command(name = "gridcut-cli")]
struct Args {
    /// CSV file with an `intensity` column, pixels in row-major order
    input: PathBuf,

    /// Output CSV of per-pixel labels
    output: PathBuf,

    /// Row width of the image in pixels
    #[arg(long)]
    width: usize,

    /// Object seed rectangle, `x,y,w,h`
    #[arg(long)]
    object: Roi,

    /// Background seed rectangle, `x,y,w,h`
    #[arg(long)]
    background: Roi,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn read_intensities_csv(path: &Path) -> Result<Vec<f32>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = Reader::from_reader(file);
    let rows: Result<Vec<PixelRow>, _> = reader.deserialize().collect();
    Ok(rows?.iter().map(|row| row.intensity).collect())
}

fn write_labels_csv(labels: &[bool], path: &Path) -> Result<(), Box<dyn Error>> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["pixel", "label"])?;
    for (pixel, label) in labels.iter().enumerate() {
        let pixel = pixel.to_string();
        let value = if *label { "1" } else { "0" };
        writer.write_record([pixel.as_str(), value])?;
    }
    writer.flush()?;
    Ok(())
}

fn roi_stats(
    intensities: &[f32],
    width: usize,
    roi: Roi,
) -> Result<RegionStats<f32>, Box<dyn Error>> {
    let height = intensities.len() / width;
    if roi.w == 0 || roi.h == 0 || roi.x + roi.w > width || roi.y + roi.h > height {
        return Err(format!(
            "seed rectangle {},{},{},{} leaves the {width}x{height} image",
            roi.x, roi.y, roi.w, roi.h
        )
        .into());
    }
    let samples = (roi.y..roi.y + roi.h)
        .cartesian_product(roi.x..roi.x + roi.w)
        .map(|(y, x)| intensities[y * width + x]);
    Ok(RegionStats::from_samples(samples))
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let intensities = read_intensities_csv(&args.input)?;
    if args.width == 0 || intensities.len() % args.width != 0 {
        return Err(format!(
            "{} pixels do not form a grid of row width {}",
            intensities.len(),
            args.width
        )
        .into());
    }

    let object = roi_stats(&intensities, args.width, args.object)?;
    let background = roi_stats(&intensities, args.width, args.background)?;
    log::info!(
        "object seed: mean {:.3} stdev {:.3}",
        object.mean,
        object.std_dev
    );
    log::info!(
        "background seed: mean {:.3} stdev {:.3}",
        background.mean,
        background.std_dev
    );

    let result =
        segment(&intensities, args.width, &object, &background).map_err(|e| e.to_string())?;
    log::info!(
        "max flow {:.3} after {} augmentations",
        result.max_flow,
        result.augmentations
    );

    write_labels_csv(&result.labels, &args.output)?;
    Ok(())
}
