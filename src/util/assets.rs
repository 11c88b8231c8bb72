use std::borrow::Cow;

use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Embed the reference catalogs under `assets/` into the binary.
#[derive(RustEmbed)]
#[folder = "assets"]
struct EmbeddedAssets;

pub const MARKETS_PATH: &str = "/assets/catalog/markets.json";
pub const CROPS_PATH: &str = "/assets/catalog/crops.json";
pub const VEHICLES_PATH: &str = "/assets/catalog/vehicles.json";
pub const CROP_ALIASES_PATH: &str = "/assets/catalog/crop_aliases.json";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("embedded asset not found: {0}")]
    Missing(String),
    #[error("embedded asset {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes an embedded JSON asset.
pub fn load_json<T>(path: &str) -> Result<T, AssetError>
where
    T: DeserializeOwned,
{
    let asset = load_asset(path)?;
    serde_json::from_slice(asset.as_ref()).map_err(|source| AssetError::Parse {
        path: path.to_string(),
        source,
    })
}

fn load_asset(path: &str) -> Result<Cow<'static, [u8]>, AssetError> {
    let canonical = canonical_asset_path(path);
    EmbeddedAssets::get(&canonical)
        .map(|file| file.data)
        .ok_or_else(|| AssetError::Missing(path.to_string()))
}

fn canonical_asset_path(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if let Some(rest) = trimmed.strip_prefix("assets/") {
        rest.to_string()
    } else {
        trimmed.to_string()
    }
}
