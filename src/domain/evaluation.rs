use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use time::{Date, Duration};

use super::entities::{
    ArbitrageResult, Crop, DistanceEstimate, Market, MandiOption, PriceQuote, TrendPoint,
    VehicleProfile,
};

/// Recommendation text used when no candidate survived.
pub const NO_DATA_TEXT: &str = "no market data available";

/// Daily swing of the synthetic trend series around the base price.
const TREND_SWING: f64 = 0.10;

/// A cost or profit figure that cannot be represented as a `Decimal`.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("cost of selling at {market} is out of range")]
pub struct CostOverflow {
    pub market: String,
}

/// `distance_km * rate_per_km`, or `None` if the distance is not a valid
/// length or the product overflows.
pub fn transport_cost(distance_km: f64, vehicle: &VehicleProfile) -> Option<Decimal> {
    km_to_decimal(distance_km)?.checked_mul(vehicle.rate_per_km)
}

/// `price * quantity - transport_cost`, or `None` on overflow.
pub fn net_profit(price: Decimal, quantity: Decimal, transport_cost: Decimal) -> Option<Decimal> {
    price.checked_mul(quantity)?.checked_sub(transport_cost)
}

/// Distance as a decimal. Negative or non-finite distances have no value.
pub fn km_to_decimal(km: f64) -> Option<Decimal> {
    if !km.is_finite() || km < 0.0 {
        return None;
    }
    Decimal::from_f64(km)
}

/// Builds the option for one candidate. `Ok(None)` when the price is not positive.
pub fn evaluate_option(
    market: Market,
    price: PriceQuote,
    distance: DistanceEstimate,
    quantity: Decimal,
    vehicle: &VehicleProfile,
) -> Result<Option<MandiOption>, CostOverflow> {
    if price.amount <= Decimal::ZERO {
        return Ok(None);
    }

    let overflow = || CostOverflow {
        market: market.name.clone(),
    };
    let transport_cost = transport_cost(distance.km, vehicle).ok_or_else(overflow)?;
    let net_profit = net_profit(price.amount, quantity, transport_cost).ok_or_else(overflow)?;

    Ok(Some(MandiOption {
        market,
        price,
        distance,
        transport_cost,
        net_profit,
    }))
}

/// Sorts descending by net profit. Stable: equal profits keep input order.
pub fn rank_options(options: &mut [MandiOption]) {
    options.sort_by(|a, b| b.net_profit.cmp(&a.net_profit));
}

/// Turns ranked options into the final result with a recommendation.
pub fn summarize(mut options: Vec<MandiOption>) -> ArbitrageResult {
    rank_options(&mut options);

    let (Some(best), Some(worst)) = (options.first(), options.last()) else {
        return ArbitrageResult {
            best_option: None,
            all_options: Vec::new(),
            recommendation_text: NO_DATA_TEXT.to_string(),
        };
    };

    let savings = best.net_profit - worst.net_profit;
    let recommendation_text = format!(
        "Sell at {}. Save ₹{} vs {}.",
        best.market.name,
        format_rupees(savings),
        worst.market.name
    );

    ArbitrageResult {
        best_option: Some(best.clone()),
        all_options: options,
        recommendation_text,
    }
}

/// Whole rupees with thousands separators, e.g. `12,345`.
pub fn format_rupees(amount: Decimal) -> String {
    let rounded = amount.round();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Synthetic daily prices for the `days` days before `today`, oldest first.
pub fn price_trend<R: Rng + ?Sized>(
    crop: &Crop,
    days: u16,
    today: Date,
    rng: &mut R,
) -> Vec<TrendPoint> {
    (0..days)
        .filter_map(|offset| {
            let back = i64::from(days - offset);
            let date = today.checked_sub(Duration::days(back))?;
            let factor = rng.gen_range((1.0 - TREND_SWING)..=(1.0 + TREND_SWING));
            let price = (crop.base_price * Decimal::from_f64(factor)?).round();
            Some(TrendPoint { date, price })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DistanceSource, Season};
    use rand::{rngs::StdRng, SeedableRng};
    use rust_decimal_macros::dec;
    use time::macros::date;

    fn market(name: &str) -> Market {
        Market {
            name: name.to_string(),
            lat: 22.0,
            lon: 70.0,
            district: "Rajkot".to_string(),
        }
    }

    fn pickup() -> VehicleProfile {
        VehicleProfile::new("Pickup", dec!(18))
    }

    fn option(name: &str, price: Decimal, km: f64) -> MandiOption {
        evaluate_option(
            market(name),
            PriceQuote::synthetic(price),
            DistanceEstimate {
                km,
                source: DistanceSource::LinearFallback,
            },
            dec!(10),
            &pickup(),
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn transport_cost_is_distance_times_rate() {
        assert_eq!(transport_cost(100.0, &pickup()), Some(dec!(1800)));
        assert_eq!(transport_cost(12.5, &pickup()), Some(dec!(225)));
        assert_eq!(transport_cost(0.0, &pickup()), Some(Decimal::ZERO));
    }

    #[test]
    fn net_profit_matches_formula() {
        let cases = [
            (dec!(7100), dec!(10), 45.2, dec!(18)),
            (dec!(2400), dec!(2.5), 130.0, dec!(50)),
            (dec!(350), dec!(100), 0.0, dec!(25)),
            (dec!(1), dec!(1), 999.9, dec!(30)),
        ];
        for (price, quantity, km, rate) in cases {
            let vehicle = VehicleProfile::new("v", rate);
            let cost = transport_cost(km, &vehicle).unwrap();
            assert_eq!(
                net_profit(price, quantity, cost),
                Some(price * quantity - km_to_decimal(km).unwrap() * rate)
            );
        }
    }

    #[test]
    fn zero_price_candidates_are_dropped() {
        let dropped = evaluate_option(
            market("Gondal"),
            PriceQuote::synthetic(Decimal::ZERO),
            DistanceEstimate {
                km: 10.0,
                source: DistanceSource::Road,
            },
            dec!(10),
            &pickup(),
        );
        assert_eq!(dropped, Ok(None));
    }

    #[test]
    fn invalid_distances_have_no_cost() {
        assert_eq!(km_to_decimal(f64::NAN), None);
        assert_eq!(km_to_decimal(f64::INFINITY), None);
        assert_eq!(km_to_decimal(-1.0), None);
        assert_eq!(transport_cost(f64::NAN, &pickup()), None);
    }

    #[test]
    fn overflowing_figures_are_reported() {
        let huge_rate = VehicleProfile::new("Rocket", Decimal::MAX);
        assert_eq!(transport_cost(10.0, &huge_rate), None);
        assert_eq!(net_profit(Decimal::MAX, dec!(2), Decimal::ZERO), None);
        assert_eq!(net_profit(Decimal::MIN, Decimal::ONE, Decimal::MAX), None);

        let result = evaluate_option(
            market("Gondal"),
            PriceQuote::authoritative(Decimal::MAX),
            DistanceEstimate {
                km: 10.0,
                source: DistanceSource::Road,
            },
            dec!(10),
            &pickup(),
        );
        assert_eq!(
            result,
            Err(CostOverflow {
                market: "Gondal".into()
            })
        );
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let mut options = vec![
            option("A", dec!(7000), 10.0),
            option("B", dec!(7200), 10.0),
            option("C", dec!(7000), 10.0),
            option("D", dec!(6000), 50.0),
        ];
        rank_options(&mut options);
        let names: Vec<&str> = options.iter().map(|o| o.market.name.as_str()).collect();
        assert_eq!(names, ["B", "A", "C", "D"]);
        assert!(options
            .windows(2)
            .all(|pair| pair[0].net_profit >= pair[1].net_profit));
    }

    #[test]
    fn summary_names_best_and_worst() {
        let result = summarize(vec![
            option("Amreli", dec!(6980), 100.0),
            option("Gondal", dec!(7240), 40.0),
            option("Jasdan", dec!(6850), 60.0),
        ]);
        let best = result.best_option.as_ref().unwrap();
        assert_eq!(best.market.name, "Gondal");
        assert_eq!(result.all_options[0], *best);
        // Gondal 72400 - 720 = 71680, Jasdan 68500 - 1080 = 67420
        assert_eq!(result.all_options.last().unwrap().market.name, "Jasdan");
        assert_eq!(result.recommendation_text, "Sell at Gondal. Save ₹4,260 vs Jasdan.");
    }

    #[test]
    fn single_option_saves_nothing() {
        let result = summarize(vec![option("Gondal", dec!(7240), 40.0)]);
        assert_eq!(result.recommendation_text, "Sell at Gondal. Save ₹0 vs Gondal.");
    }

    #[test]
    fn empty_summary_reports_no_data() {
        let result = summarize(Vec::new());
        assert!(result.best_option.is_none());
        assert!(result.all_options.is_empty());
        assert_eq!(result.recommendation_text, NO_DATA_TEXT);

        let report = result.report();
        assert_eq!(report.best_market_name, "N/A");
        assert_eq!(report.best_net_profit, Decimal::ZERO);
        assert!(report.options.is_empty());
    }

    #[test]
    fn rupee_formatting_groups_thousands() {
        assert_eq!(format_rupees(dec!(0)), "0");
        assert_eq!(format_rupees(dec!(999)), "999");
        assert_eq!(format_rupees(dec!(1000)), "1,000");
        assert_eq!(format_rupees(dec!(1234567.6)), "1,234,568");
        assert_eq!(format_rupees(dec!(-4260)), "-4,260");
    }

    #[test]
    fn trend_stays_within_swing() {
        let crop = Crop {
            name: "Wheat".to_string(),
            base_price: dec!(2400),
            season: Season::Rabi,
            category: "Cereal".to_string(),
        };
        let mut rng = StdRng::seed_from_u64(7);
        let points = price_trend(&crop, 30, date!(2024 - 03 - 31), &mut rng);
        assert_eq!(points.len(), 30);
        assert_eq!(points[0].date, date!(2024 - 03 - 01));
        assert_eq!(points[29].date, date!(2024 - 03 - 30));
        for point in &points {
            assert!(point.price >= dec!(2160) && point.price <= dec!(2640));
        }
    }
}
