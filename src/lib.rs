use clap::Parser;
use futures::future::join_all;
use jiff::{ToSpan, Zoned};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::error;

const P24_BASE_URL: &str = "https://api.privatbank.ua/p24api/exchange_rates?json&date=";

/// Get EUR and USD exchange rates from PrivatBank's public archive for recent days.
///
/// Queries one day per request, all requests in parallel, and prints the
/// collected sale/purchase rates as JSON. Days whose request fails are skipped.
#[derive(Parser)]
pub struct Cli {
    /// Number of past days to fetch, including today (format: integer, 1-10)
    #[arg(value_name = "DAYS", value_parser = clap::value_parser!(u8).range(1..=10))]
    pub days: u8,
}

/// Archive date keys for the last `days` days, today first, formatted the way
/// the archive endpoint expects (`DD.MM.YYYY`).
pub fn request_dates(days: u8) -> Vec<String> {
    let today = Zoned::now().date();
    (0..i64::from(days))
        .map(|offset| (today - offset.days()).strftime("%d.%m.%Y").to_string())
        .collect()
}

/// Archive client, one per batch. Holds the pooled HTTP client shared by all
/// requests of the batch.
pub struct RateClient {
    http: Client,
    base_url: String,
}

impl RateClient {
    pub fn new() -> Self {
        Self::with_base_url(P24_BASE_URL.to_string())
    }

    /// Client against a non-default endpoint (local test servers).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Fetch every date concurrently. The result has the same length and order
    /// as `dates`; a failed request leaves `None` in its slot and does not
    /// affect the other requests.
    pub async fn fetch_all(&self, dates: &[String]) -> Vec<Option<RawRateEntry>> {
        join_all(dates.iter().map(|date| self.fetch_day(date))).await
    }

    async fn fetch_day(&self, date: &str) -> Option<RawRateEntry> {
        match self.request_day(date).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!("failed to fetch rates for {date}: {e}");
                None
            }
        }
    }

    async fn request_day(&self, date: &str) -> Result<RawRateEntry, reqwest::Error> {
        self.http
            .get(format!("{}{date}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

impl Default for RateClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Reshape raw archive payloads into per-date EUR/USD records.
///
/// `None` slots (failed fetches) are skipped; the surviving records keep the
/// slot order of `raw`. A present entry without its `date` or `exchangeRate`
/// field violates the archive contract and fails the whole batch.
pub fn format_rates(raw: &[Option<RawRateEntry>]) -> Result<Vec<FormattedRecord>, FormatError> {
    let mut records = Vec::with_capacity(raw.len());

    for entry in raw.iter().flatten() {
        let date = entry.date.clone().ok_or(FormatError::MissingDate)?;
        let listed = entry
            .exchange_rate
            .as_ref()
            .ok_or_else(|| FormatError::MissingRateList { date: date.clone() })?;

        let mut rates = DayRates { eur: None, usd: None };
        for listing in listed {
            let pair = RatePair {
                sale: listing.sale_rate.into(),
                purchase: listing.purchase_rate.into(),
            };
            // Repeated codes overwrite: the last listing wins.
            match listing.currency.as_str() {
                "EUR" => rates.eur = Some(pair),
                "USD" => rates.usd = Some(pair),
                _ => {}
            }
        }

        records.push(FormattedRecord { date, rates });
    }

    Ok(records)
}

/// Contract violations in an archive payload that was otherwise fetched fine.
#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("rate entry is missing its date field")]
    MissingDate,
    #[error("rate entry for {date} is missing its exchangeRate list")]
    MissingRateList { date: String },
}

/// One day's payload from the archive endpoint.
///
/// The two fields the formatter requires stay `Option` here so their absence
/// surfaces as a [`FormatError`] instead of a deserialization failure, which
/// would be indistinguishable from a transport problem.
#[derive(Clone, Debug, Deserialize)]
pub struct RawRateEntry {
    pub date: Option<String>,
    #[serde(rename = "exchangeRate")]
    pub exchange_rate: Option<Vec<CurrencyRate>>,
}

/// One currency listing inside a day's payload. Other provider fields
/// (`baseCurrency`, NBU reference rates) are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct CurrencyRate {
    pub currency: String,
    #[serde(rename = "saleRate")]
    pub sale_rate: Option<Decimal>,
    #[serde(rename = "purchaseRate")]
    pub purchase_rate: Option<Decimal>,
}

/// Output record, serialized as a single-key map: `{"DD.MM.YYYY": {...}}`.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedRecord {
    pub date: String,
    pub rates: DayRates,
}

impl Serialize for FormattedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.date, &self.rates)?;
        map.end()
    }
}

/// The two tracked currencies for one date. A currency the archive did not
/// list serializes as `null`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DayRates {
    #[serde(rename = "EUR")]
    pub eur: Option<RatePair>,
    #[serde(rename = "USD")]
    pub usd: Option<RatePair>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RatePair {
    pub sale: RateValue,
    pub purchase: RateValue,
}

/// A rate the archive reported, or `"N/A"` when the listing omitted the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RateValue {
    Rate(Decimal),
    NotAvailable,
}

impl From<Option<Decimal>> for RateValue {
    fn from(rate: Option<Decimal>) -> Self {
        match rate {
            Some(rate) => Self::Rate(rate),
            None => Self::NotAvailable,
        }
    }
}

impl Serialize for RateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Rate(rate) => Serialize::serialize(rate, serializer),
            Self::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}
