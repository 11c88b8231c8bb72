//! `compute`: rank markets for one consignment.

use anyhow::Context;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use tabled::{Table, Tabled};
use tracing::info;

use super::{print_table, resolve_crop, ComputeArgs};
use crate::app::ArbitrageEngine;
use crate::domain::{format_rupees, ArbitrageResult, GeoCatalog, MandiOption, VehicleProfile};
use crate::error::ValidationError;

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Mandi")]
    market: String,
    #[tabled(rename = "District")]
    district: String,
    #[tabled(rename = "Price/qtl")]
    price: String,
    #[tabled(rename = "Source")]
    badge: &'static str,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Transport")]
    transport: String,
    #[tabled(rename = "Net Profit")]
    net_profit: String,
}

impl OptionRow {
    fn new(rank: usize, option: &MandiOption) -> Self {
        Self {
            rank,
            market: option.market.name.clone(),
            district: option.market.district.clone(),
            price: format!("₹{}", format_rupees(option.price.amount)),
            badge: option.price.badge(),
            distance: format!("{:.1} km ({})", option.distance.km, option.distance.source.label()),
            transport: format!("₹{}", format_rupees(option.transport_cost)),
            net_profit: format!("₹{}", format_rupees(option.net_profit)),
        }
    }
}

/// Looks up a vehicle by label (or label prefix), or builds one from a raw rate.
pub fn resolve_vehicle(
    catalog: &GeoCatalog,
    label: Option<&str>,
    rate: Option<f64>,
) -> Result<VehicleProfile, ValidationError> {
    if let Some(rate) = rate {
        let rate_per_km = Decimal::from_f64(rate)
            .filter(|rate| *rate >= Decimal::ZERO)
            .ok_or_else(|| ValidationError::InvalidRate(rate.to_string()))?;
        return Ok(VehicleProfile::new("Custom", rate_per_km));
    }

    let label = label.unwrap_or_default().trim();
    if let Some(vehicle) = catalog.vehicle(label) {
        return Ok(vehicle.clone());
    }

    let needle = label.to_lowercase();
    catalog
        .vehicles()
        .iter()
        .find(|vehicle| !needle.is_empty() && vehicle.label.to_lowercase().starts_with(&needle))
        .cloned()
        .ok_or_else(|| ValidationError::UnknownVehicle(label.to_string()))
}

pub async fn run(engine: &ArbitrageEngine, args: &ComputeArgs) -> anyhow::Result<()> {
    let catalog = engine.catalog();
    let crop = resolve_crop(catalog, &args.crop);
    let origin = args.origin.resolve(catalog);
    let vehicle = resolve_vehicle(catalog, args.vehicle.as_deref(), args.rate)?;

    info!(crop = %crop.name, vehicle = %vehicle.label, quantity = args.quantity, "computing arbitrage");
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let result = engine
        .compute_cancellable(&crop, origin, args.quantity, &vehicle, cancel)
        .await?;

    if args.json {
        let json = serde_json::to_string_pretty(&result.report())
            .context("failed to serialize report")?;
        println!("{json}");
    } else {
        render(&crop.name, &vehicle, &result);
    }
    Ok(())
}

fn render(crop: &str, vehicle: &VehicleProfile, result: &ArbitrageResult) {
    println!();
    println!(
        "  {crop} via {} (₹{}/km)",
        vehicle.label,
        vehicle.rate_per_km.normalize()
    );
    println!();

    if result.is_empty() {
        println!("  {}", result.recommendation_text);
        println!();
        return;
    }

    print_table(&Table::new(rows(result)).to_string());
    println!();
    println!("  {}", result.recommendation_text);
    println!();
}

fn rows(result: &ArbitrageResult) -> Vec<OptionRow> {
    result
        .all_options
        .iter()
        .enumerate()
        .map(|(idx, option)| OptionRow::new(idx + 1, option))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DistanceEstimate, DistanceSource, Market, PriceQuote};
    use rust_decimal_macros::dec;

    fn catalog() -> GeoCatalog {
        GeoCatalog::embedded().unwrap()
    }

    #[test]
    fn vehicle_by_label_prefix_or_rate() {
        let catalog = catalog();
        let tractor = resolve_vehicle(&catalog, Some("tractor"), None).unwrap();
        assert_eq!(tractor.rate_per_km, dec!(25));

        let exact = resolve_vehicle(&catalog, Some("Heavy Truck (10T+)"), None).unwrap();
        assert_eq!(exact.rate_per_km, dec!(50));

        let custom = resolve_vehicle(&catalog, None, Some(21.5)).unwrap();
        assert_eq!(custom.label, "Custom");
        assert_eq!(custom.rate_per_km, dec!(21.5));
    }

    #[test]
    fn bad_vehicle_inputs_are_rejected() {
        let catalog = catalog();
        assert_eq!(
            resolve_vehicle(&catalog, Some("Bullock cart"), None),
            Err(ValidationError::UnknownVehicle("Bullock cart".into()))
        );
        assert!(matches!(
            resolve_vehicle(&catalog, None, Some(-3.0)),
            Err(ValidationError::InvalidRate(_))
        ));
        assert!(matches!(
            resolve_vehicle(&catalog, None, Some(f64::NAN)),
            Err(ValidationError::InvalidRate(_))
        ));
        assert!(matches!(
            resolve_vehicle(&catalog, None, None),
            Err(ValidationError::UnknownVehicle(_))
        ));
    }

    #[test]
    fn rows_show_badges_and_rank() {
        let option = MandiOption {
            market: Market {
                name: "Gondal".into(),
                lat: 21.9606,
                lon: 70.7958,
                district: "Rajkot".into(),
            },
            price: PriceQuote::synthetic(dec!(7150)),
            distance: DistanceEstimate {
                km: 49.62,
                source: DistanceSource::LinearFallback,
            },
            transport_cost: dec!(893),
            net_profit: dec!(70607),
        };
        let result = ArbitrageResult {
            best_option: Some(option.clone()),
            all_options: vec![option],
            recommendation_text: "Sell at Gondal. Save ₹0 vs Gondal.".into(),
        };

        let rows = rows(&result);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].badge, "Estimated");
        assert_eq!(rows[0].price, "₹7,150");
        assert_eq!(rows[0].distance, "49.6 km (Linear)");

        let table = Table::new(rows).to_string();
        assert!(table.contains("Net Profit"));
        assert!(table.contains("₹70,607"));
    }
}
