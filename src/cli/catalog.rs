//! Catalog listings: markets, crops, vehicles and price trends.

use anyhow::bail;
use tabled::{Table, Tabled};
use time::OffsetDateTime;

use super::{print_table, resolve_crop, CropsArgs, LocateArgs, NearestArgs, TrendArgs};
use crate::domain::{format_rupees, price_trend, Coordinates, Crop, GeoCatalog, TrendPoint};

#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "Mandi")]
    name: String,
    #[tabled(rename = "District")]
    district: String,
    #[tabled(rename = "Straight-line")]
    distance: String,
}

#[derive(Tabled)]
struct CropRow {
    #[tabled(rename = "Crop")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Season")]
    season: &'static str,
    #[tabled(rename = "Base Price/qtl")]
    base_price: String,
}

impl From<&Crop> for CropRow {
    fn from(crop: &Crop) -> Self {
        Self {
            name: crop.name.clone(),
            category: crop.category.clone(),
            season: crop.season.label(),
            base_price: format!("₹{}", format_rupees(crop.base_price)),
        }
    }
}

#[derive(Tabled)]
struct VehicleRow {
    #[tabled(rename = "Vehicle")]
    label: String,
    #[tabled(rename = "Rate")]
    rate: String,
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Price/qtl")]
    price: String,
}

impl From<&TrendPoint> for TrendRow {
    fn from(point: &TrendPoint) -> Self {
        Self {
            date: point.date.to_string(),
            price: format!("₹{}", format_rupees(point.price)),
        }
    }
}

fn nearest_rows(catalog: &GeoCatalog, origin: Coordinates, limit: usize) -> Vec<MarketRow> {
    catalog
        .nearest_with_distance(origin, limit)
        .into_iter()
        .map(|(market, km)| MarketRow {
            name: market.name.clone(),
            district: market.district.clone(),
            distance: format!("{km:.1} km"),
        })
        .collect()
}

fn crop_rows(catalog: &GeoCatalog, category: Option<&str>) -> Vec<CropRow> {
    let mut crops: Vec<&Crop> = match category {
        Some(category) => catalog.crops_by_category(category),
        None => catalog.crops().iter().collect(),
    };
    crops.sort_by(|a, b| a.name.cmp(&b.name));
    crops.into_iter().map(CropRow::from).collect()
}

pub fn nearest(catalog: &GeoCatalog, args: &NearestArgs) -> anyhow::Result<()> {
    let origin = args.origin.resolve(catalog);
    println!();
    print_table(&Table::new(nearest_rows(catalog, origin, args.limit)).to_string());
    println!();
    Ok(())
}

pub fn crops(catalog: &GeoCatalog, args: &CropsArgs) -> anyhow::Result<()> {
    let rows = crop_rows(catalog, args.category.as_deref());
    if rows.is_empty() {
        bail!(
            "no crops in category {:?}",
            args.category.as_deref().unwrap_or_default()
        );
    }
    println!();
    print_table(&Table::new(rows).to_string());
    println!();
    Ok(())
}

pub fn vehicles(catalog: &GeoCatalog) -> anyhow::Result<()> {
    let rows: Vec<VehicleRow> = catalog
        .vehicles()
        .iter()
        .map(|vehicle| VehicleRow {
            label: vehicle.label.clone(),
            rate: format!("₹{}/km", vehicle.rate_per_km.normalize()),
        })
        .collect();
    println!();
    print_table(&Table::new(rows).to_string());
    println!();
    Ok(())
}

pub fn cities(catalog: &GeoCatalog) -> anyhow::Result<()> {
    for city in catalog.all_cities() {
        println!("{city}");
    }
    Ok(())
}

pub fn trend(catalog: &GeoCatalog, args: &TrendArgs) -> anyhow::Result<()> {
    let crop = resolve_crop(catalog, &args.crop);
    let today = OffsetDateTime::now_utc().date();
    let points = price_trend(&crop, args.days, today, &mut rand::thread_rng());

    println!();
    println!("  {} (estimated, ±10% around ₹{})", crop.name, format_rupees(crop.base_price));
    println!();
    print_table(&Table::new(points.iter().map(TrendRow::from)).to_string());
    println!();
    Ok(())
}

pub fn locate(catalog: &GeoCatalog, args: &LocateArgs) -> anyhow::Result<()> {
    match catalog.nearest_city(Coordinates::new(args.lat, args.lon)) {
        Some(market) => {
            println!("{} ({})", market.name, market.district);
            Ok(())
        }
        None => bail!("market catalog is empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn catalog() -> GeoCatalog {
        GeoCatalog::embedded().unwrap()
    }

    #[test]
    fn nearest_rows_start_at_origin() {
        let rows = nearest_rows(&catalog(), Coordinates::new(22.3039, 70.8022), 3);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "Rajkot");
        assert_eq!(rows[0].distance, "0.0 km");
    }

    #[test]
    fn crop_rows_filter_by_category() {
        let catalog = catalog();
        let spices = crop_rows(&catalog, Some("spice"));
        assert!(!spices.is_empty());
        assert!(spices.iter().all(|row| row.category == "Spice"));
        assert!(spices.iter().any(|row| row.name == "Cumin (Jeera)"));

        let all = crop_rows(&catalog, None);
        assert_eq!(all.len(), catalog.crops().len());
        assert!(all.windows(2).all(|pair| pair[0].name <= pair[1].name));
    }

    #[test]
    fn trend_rows_render_dates_and_prices() {
        let point = TrendPoint {
            date: date!(2024 - 03 - 05),
            price: rust_decimal_macros::dec!(28450),
        };
        let row = TrendRow::from(&point);
        assert_eq!(row.date, "2024-03-05");
        assert_eq!(row.price, "₹28,450");
    }
}
