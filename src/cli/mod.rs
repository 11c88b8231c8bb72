//! Command-line interface definitions.

pub mod catalog;
pub mod compute;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::warn;

use crate::domain::{Coordinates, Crop, GeoCatalog, DEFAULT_CITY};

/// Mandi Arbitrage - find the market that pays the most after transport.
#[derive(Parser, Debug)]
#[command(name = "mandi-arbitrage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to the per-user config location)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank nearby mandis by net profit for a consignment
    Compute(ComputeArgs),
    /// List the markets closest to a location
    Nearest(NearestArgs),
    /// List catalog crops
    Crops(CropsArgs),
    /// List transport vehicle profiles
    Vehicles,
    /// List catalog cities
    Cities,
    /// Show a synthetic recent price trend for a crop
    Trend(TrendArgs),
    /// Name the catalog city closest to a coordinate
    Locate(LocateArgs),
}

/// Where the farmer starts from: a catalog city or a raw coordinate.
#[derive(Args, Debug, Clone)]
pub struct OriginArgs {
    /// Origin city from the market catalog
    #[arg(long, conflicts_with_all = ["lat", "lon"], required_unless_present_all = ["lat", "lon"])]
    pub city: Option<String>,

    /// Origin latitude in decimal degrees
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Origin longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

/// Arguments for the `compute` subcommand.
#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Crop name or local alias (e.g. "mugfali")
    #[arg(long)]
    pub crop: String,

    #[command(flatten)]
    pub origin: OriginArgs,

    /// Quantity in quintals
    #[arg(short, long)]
    pub quantity: f64,

    /// Vehicle profile label (see `vehicles`)
    #[arg(long, conflicts_with = "rate", required_unless_present = "rate")]
    pub vehicle: Option<String>,

    /// Custom transport rate in rupees per km
    #[arg(long)]
    pub rate: Option<f64>,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `nearest` subcommand.
#[derive(Args, Debug)]
pub struct NearestArgs {
    #[command(flatten)]
    pub origin: OriginArgs,

    /// Number of markets to show
    #[arg(short, long, default_value_t = 12)]
    pub limit: usize,
}

/// Arguments for the `crops` subcommand.
#[derive(Args, Debug)]
pub struct CropsArgs {
    /// Only show crops in this category (e.g. "Spice")
    #[arg(long)]
    pub category: Option<String>,
}

/// Arguments for the `trend` subcommand.
#[derive(Args, Debug)]
pub struct TrendArgs {
    /// Crop name or local alias
    #[arg(long)]
    pub crop: String,

    /// Number of past days to show
    #[arg(long, default_value_t = 7)]
    pub days: u16,
}

/// Arguments for the `locate` subcommand.
#[derive(Args, Debug)]
pub struct LocateArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

impl OriginArgs {
    /// Coordinates to search from. Unknown cities fall back to the default city.
    pub fn resolve(&self, catalog: &GeoCatalog) -> Coordinates {
        match (&self.city, self.lat, self.lon) {
            (_, Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            (Some(city), _, _) => {
                if catalog.find_market(city).is_none() {
                    warn!(city = %city, fallback = DEFAULT_CITY, "unknown city");
                }
                (&catalog.lookup_coordinates(city)).into()
            }
            _ => (&catalog.lookup_coordinates(DEFAULT_CITY)).into(),
        }
    }
}

/// Matches free text against the catalog, or prices an unknown crop at the default.
pub(crate) fn resolve_crop(catalog: &GeoCatalog, text: &str) -> Crop {
    match catalog.match_crop(text) {
        Some(crop) => crop.clone(),
        None => {
            warn!(crop = text, "crop not in catalog; using default reference price");
            catalog.crop_or_default(text.trim())
        }
    }
}

/// Prints a rendered table indented under the command output.
pub(crate) fn print_table(table: &str) {
    for line in table.lines() {
        println!("  {line}");
    }
}
