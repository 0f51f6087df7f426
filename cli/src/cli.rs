use std::path::PathBuf;

use chrono::NaiveDate;

/// Street-level imagery coverage tools
#[derive(clap::Parser, Debug)]
#[command(name = "imagery-coverage", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON config file; missing fields take their defaults
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// List the tiles covering a bounding box
    Tiles(TilesArgs),

    /// Load one coverage layer for a bounding box and print it as JSON
    Coverage(CoverageArgs),

    /// Open the imagery nearest to a point
    Nearest(NearestArgs),
}

#[derive(clap::Args, Debug)]
pub struct TilesArgs {
    /// min_lon,min_lat,max_lon,max_lat
    #[arg(long, value_delimiter = ',', num_args = 4, allow_negative_numbers = true)]
    pub bbox: Vec<f64>,

    /// Tile zoom, defaults to the configured tile zoom
    #[arg(short, long)]
    pub zoom: Option<u8>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    Signs,
    Objects,
    Turbo,
}

#[derive(clap::Args, Debug)]
pub struct CoverageArgs {
    /// Coverage layer to load
    #[arg(short, long, value_enum, default_value = "turbo")]
    pub kind: KindArg,

    /// min_lon,min_lat,max_lon,max_lat
    #[arg(long, value_delimiter = ',', num_args = 4, allow_negative_numbers = true)]
    pub bbox: Vec<f64>,

    /// Map zoom the viewport is shown at
    #[arg(long, default_value_t = 16.0)]
    pub map_zoom: f64,

    /// Only images by this creator
    #[arg(long)]
    pub creator: Option<String>,

    /// Only images captured on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Only images captured on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Only panoramas (true) or only flat images (false)
    #[arg(long)]
    pub pano: Option<bool>,

    /// Bucket images by capture year
    #[arg(long)]
    pub color_by_date: bool,
}

#[derive(clap::Args, Debug)]
pub struct NearestArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// File the opened sequence is saved to and restored from
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub session: Option<PathBuf>,
}
