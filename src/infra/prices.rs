//! Mandi prices from the data.gov.in daily commodity feed, with a synthetic fallback.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use reqwest::{Client, Url};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::Deserialize;
use time::{macros::format_description, Date};
use tracing::debug;

use super::ProviderError;
use crate::domain::{Crop, PriceQuote};
use crate::util::{config::PriceFeedConfig, version::user_agent};

/// One record of the government feed.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedRecord {
    pub max_price: Decimal,
    pub market: Option<String>,
    pub arrival_date: Option<Date>,
}

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Most recent record for a crop in a district.
    async fn latest(&self, crop: &str, district: &str) -> Result<FeedRecord, ProviderError>;
}

#[derive(Clone)]
pub struct DataGovClient {
    http: Client,
    base_url: Url,
    resource_id: String,
    state: String,
    api_key: Option<String>,
}

impl DataGovClient {
    pub fn new(config: &PriceFeedConfig) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&config.base_url)?;
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url,
            resource_id: config.resource_id.clone(),
            state: config.state.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, api_key: &str, crop: &str, district: &str) -> Result<Url, ProviderError> {
        let mut url = self
            .base_url
            .join(&format!("resource/{}", self.resource_id))?;
        url.query_pairs_mut()
            .append_pair("api-key", api_key)
            .append_pair("format", "json")
            .append_pair("filters[state]", &self.state)
            .append_pair("filters[district]", district)
            .append_pair("filters[commodity]", crop)
            .append_pair("limit", "1");
        Ok(url)
    }
}

#[async_trait]
impl PriceFeed for DataGovClient {
    async fn latest(&self, crop: &str, district: &str) -> Result<FeedRecord, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::NotConfigured);
        };

        let url = self.url(api_key, crop, district)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let payload: serde_json::Value = response.json().await?;
        parse_records(payload)
    }
}

/// Resolves a per-quintal price for a crop in a district.
pub struct PriceResolver {
    feed: Arc<dyn PriceFeed>,
    deadline: Duration,
    jitter: f64,
    rng: Mutex<StdRng>,
}

impl PriceResolver {
    pub fn new(feed: Arc<dyn PriceFeed>, config: &PriceFeedConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            feed,
            deadline: config.timeout(),
            jitter: config.jitter,
            rng: Mutex::new(rng),
        }
    }

    /// Never fails: without a positive official price the quote is synthetic.
    pub async fn resolve(&self, crop: &Crop, district: &str) -> PriceQuote {
        match self.authoritative(&crop.name, district).await {
            Ok(quote) => quote,
            Err(err) => {
                debug!(crop = %crop.name, district, error = %err, "official price unavailable; estimating");
                self.synthetic(crop)
            }
        }
    }

    /// Official quote, bounded by the feed deadline. Non-positive prices count as no data.
    pub async fn authoritative(
        &self,
        crop: &str,
        district: &str,
    ) -> Result<PriceQuote, ProviderError> {
        let record = tokio::time::timeout(self.deadline, self.feed.latest(crop, district))
            .await
            .map_err(|_| ProviderError::Timeout)??;
        if record.max_price <= Decimal::ZERO {
            return Err(ProviderError::NoData);
        }

        Ok(PriceQuote {
            amount: record.max_price,
            is_authoritative: true,
            reported_on: record.arrival_date,
            reported_market: record.market,
        })
    }

    /// Base price perturbed uniformly within `±jitter`, in whole rupees.
    pub fn synthetic(&self, crop: &Crop) -> PriceQuote {
        let factor = self
            .rng
            .lock()
            .gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        let amount = Decimal::from_f64(factor)
            .map(|factor| (crop.base_price * factor).round())
            .unwrap_or(crop.base_price);
        PriceQuote::synthetic(amount)
    }
}

#[derive(Debug, Deserialize)]
struct RecordsEnvelope {
    #[serde(default)]
    records: Vec<RecordDto>,
}

#[derive(Debug, Deserialize)]
struct RecordDto {
    #[serde(default, deserialize_with = "decimal_from_json")]
    max_price: Option<Decimal>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    arrival_date: Option<String>,
}

fn parse_records(payload: serde_json::Value) -> Result<FeedRecord, ProviderError> {
    let envelope: RecordsEnvelope = serde_json::from_value(payload)
        .map_err(|err| ProviderError::Malformed(err.to_string()))?;
    let record = envelope
        .records
        .into_iter()
        .next()
        .ok_or(ProviderError::NoData)?;
    let max_price = record
        .max_price
        .ok_or_else(|| ProviderError::Malformed("record missing max_price".into()))?;

    Ok(FeedRecord {
        max_price,
        market: record.market.filter(|name| !name.trim().is_empty()),
        arrival_date: record.arrival_date.as_deref().and_then(parse_arrival_date),
    })
}

fn parse_arrival_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[day]/[month]/[year]")).ok()
}

/// The feed serves numbers as strings ("7240") or plain JSON numbers.
fn decimal_from_json<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> serde::de::Visitor<'de> for StringOrNumber {
        type Value = Option<Decimal>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a decimal string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().parse::<Decimal>().ok())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(Decimal::from(value)))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(Decimal::from(value)))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Decimal::from_f64(value))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
