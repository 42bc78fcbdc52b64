use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::{
    records_to_frame, PeriodGranularity, ProviderError, ReportProvider, ReportQuery,
    ReportSource, PERIOD_COLUMN,
};

pub const DEFAULT_BASE_URL: &str = "https://apipubaws.tcbs.com.vn";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// TCBS public analysis API: financial statements, ratios and daily bars.
#[derive(Debug, Clone)]
pub struct TcbsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl TcbsProvider {
    pub fn new(base_url: Option<&str>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn url_for(&self, query: &ReportQuery) -> Result<String, ProviderError> {
        let ticker = &query.ticker;
        let invalid = |message: &str| ProviderError::InvalidQuery {
            ticker: ticker.clone(),
            message: message.to_string(),
        };

        match query.source {
            ReportSource::FinancialFlow(report) => Ok(format!(
                "{}/tcanalysis/v1/finance/{ticker}/{}?yearly={}&isAll=true",
                self.base_url,
                report.endpoint(),
                yearly_flag(query.period)
                    .ok_or_else(|| invalid("financial flow needs quarterly or yearly periods"))?,
            )),
            ReportSource::FinancialRatio => Ok(format!(
                "{}/tcanalysis/v1/finance/{ticker}/financialratio?yearly={}&isAll=true",
                self.base_url,
                yearly_flag(query.period)
                    .ok_or_else(|| invalid("financial ratio needs quarterly or yearly periods"))?,
            )),
            ReportSource::PriceHistory => {
                let range = query
                    .history
                    .ok_or_else(|| invalid("price history needs a date range"))?;
                let from = start_of_day(range.start);
                let to = start_of_day(range.end) + 86_399;
                Ok(format!(
                    "{}/stock-insight/v1/stock/bars-long-term?ticker={ticker}&type=stock&resolution=D&from={from}&to={to}",
                    self.base_url,
                ))
            }
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| ProviderError::Transport {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl ReportProvider for TcbsProvider {
    fn name(&self) -> &'static str {
        "tcbs"
    }

    async fn fetch(&self, query: &ReportQuery) -> Result<DataFrame, ProviderError> {
        let url = self.url_for(query)?;
        debug!(ticker = %query.ticker, %url, "requesting report");
        let payload = self.get_json(&url).await?;
        trace!(ticker = %query.ticker, "report payload received");

        match query.source {
            ReportSource::PriceHistory => price_frame(&query.ticker, payload),
            _ => period_frame(&query.ticker, query.period, payload),
        }
    }
}

fn yearly_flag(period: PeriodGranularity) -> Option<u8> {
    match period {
        PeriodGranularity::Quarterly => Some(0),
        PeriodGranularity::Yearly => Some(1),
        PeriodGranularity::Daily => None,
    }
}

fn start_of_day(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Converts a statement or ratio payload (an array of per-period objects carrying
/// `ticker`, `year` and `quarter`) into a frame led by the `period` label column.
pub fn period_frame(
    ticker: &str,
    period: PeriodGranularity,
    payload: Value,
) -> Result<DataFrame, ProviderError> {
    let malformed = |message: String| ProviderError::Malformed {
        ticker: ticker.to_string(),
        message,
    };

    let Value::Array(items) = payload else {
        return Err(malformed("expected a JSON array of periods".into()));
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(mut fields) = item else {
            return Err(malformed(format!("period {index} is not an object")));
        };

        let year = fields
            .shift_remove("year")
            .as_ref()
            .and_then(integer_field)
            .ok_or_else(|| malformed(format!("period {index} has no year")))?;
        let quarter = fields.shift_remove("quarter").as_ref().and_then(integer_field);
        fields.shift_remove("ticker");

        let label = match (period, quarter) {
            (PeriodGranularity::Quarterly, Some(quarter)) => format!("{year}-Q{quarter}"),
            (PeriodGranularity::Quarterly, None) => {
                return Err(malformed(format!("period {index} has no quarter")));
            }
            _ => year.to_string(),
        };

        let mut row = Map::with_capacity(fields.len() + 1);
        row.insert(PERIOD_COLUMN.to_string(), Value::String(label));
        row.extend(fields);
        rows.push(row);
    }

    records_to_frame(ticker, &rows)
}

/// Converts a daily-bar payload (`{"data": [{"tradingDate", "open", ...}]}`) into a
/// frame with `time, open, high, low, close, volume`.
pub fn price_frame(ticker: &str, payload: Value) -> Result<DataFrame, ProviderError> {
    let malformed = |message: String| ProviderError::Malformed {
        ticker: ticker.to_string(),
        message,
    };

    let bars = match payload.get("data") {
        Some(Value::Array(bars)) => bars,
        Some(Value::Null) | None => {
            return Err(ProviderError::Empty {
                ticker: ticker.to_string(),
            })
        }
        Some(_) => return Err(malformed("`data` is not an array".into())),
    };

    let mut rows = Vec::with_capacity(bars.len());
    for (index, bar) in bars.iter().enumerate() {
        let trading_date = bar
            .get("tradingDate")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(format!("bar {index} has no tradingDate")))?;
        let day = trading_date.get(..10).unwrap_or(trading_date);

        let mut row = Map::with_capacity(PRICE_COLUMNS.len() + 1);
        row.insert("time".to_string(), Value::String(day.to_string()));
        for column in PRICE_COLUMNS {
            row.insert(
                column.to_string(),
                bar.get(column).cloned().unwrap_or(Value::Null),
            );
        }
        rows.push(row);
    }

    records_to_frame(ticker, &rows)
}

fn integer_field(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::DataType;
    use serde_json::json;

    use super::*;
    use crate::provider::{DateRange, FlowReport};

    fn query(source: ReportSource, period: PeriodGranularity) -> ReportQuery {
        ReportQuery {
            ticker: "FPT".to_string(),
            source,
            period,
            history: None,
        }
    }

    #[test]
    fn builds_statement_and_ratio_urls() {
        let provider = TcbsProvider::new(Some("http://localhost:8080/")).unwrap();

        let balance = query(
            ReportSource::FinancialFlow(FlowReport::BalanceSheet),
            PeriodGranularity::Quarterly,
        );
        assert_eq!(
            provider.url_for(&balance).unwrap(),
            "http://localhost:8080/tcanalysis/v1/finance/FPT/balancesheet?yearly=0&isAll=true"
        );

        let income = query(
            ReportSource::FinancialFlow(FlowReport::IncomeStatement),
            PeriodGranularity::Yearly,
        );
        assert_eq!(
            provider.url_for(&income).unwrap(),
            "http://localhost:8080/tcanalysis/v1/finance/FPT/incomestatement?yearly=1&isAll=true"
        );

        let ratio = query(ReportSource::FinancialRatio, PeriodGranularity::Quarterly);
        assert!(provider
            .url_for(&ratio)
            .unwrap()
            .ends_with("/finance/FPT/financialratio?yearly=0&isAll=true"));
    }

    #[test]
    fn price_url_requires_range() {
        let provider = TcbsProvider::new(None).unwrap();
        let mut price = query(ReportSource::PriceHistory, PeriodGranularity::Daily);
        assert!(matches!(
            provider.url_for(&price),
            Err(ProviderError::InvalidQuery { .. })
        ));

        price.history = Some(DateRange {
            start: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2010, 1, 2).unwrap(),
        });
        assert_eq!(
            provider.url_for(&price).unwrap(),
            "https://apipubaws.tcbs.com.vn/stock-insight/v1/stock/bars-long-term?ticker=FPT&type=stock&resolution=D&from=1262304000&to=1262476799"
        );
    }

    #[test]
    fn period_frame_builds_quarter_labels() {
        let payload = json!([
            {"ticker": "FPT", "quarter": 4, "year": 2023, "asset": 100, "debt": null},
            {"ticker": "FPT", "quarter": 3, "year": 2023, "asset": 90, "debt": 5},
        ]);

        let df = period_frame("FPT", PeriodGranularity::Quarterly, payload).unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.column("ticker").is_err());
        assert!(df.column("year").is_err());

        let labels: Vec<Option<&str>> = df
            .column(PERIOD_COLUMN)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(labels, vec![Some("2023-Q4"), Some("2023-Q3")]);
        assert_eq!(df.get_column_names()[0].as_str(), PERIOD_COLUMN);
    }

    #[test]
    fn period_frame_uses_year_for_yearly_reports() {
        let payload = json!([{"ticker": "FPT", "quarter": 5, "year": "2022", "revenue": 1.5}]);
        let df = period_frame("FPT", PeriodGranularity::Yearly, payload).unwrap();
        let label = df.column(PERIOD_COLUMN).unwrap().str().unwrap().get(0);
        assert_eq!(label, Some("2022"));
    }

    #[test]
    fn period_frame_rejects_non_arrays_and_empty_arrays() {
        assert!(matches!(
            period_frame("FPT", PeriodGranularity::Yearly, json!({"error": "nope"})),
            Err(ProviderError::Malformed { .. })
        ));
        assert!(matches!(
            period_frame("FPT", PeriodGranularity::Yearly, json!([])),
            Err(ProviderError::Empty { .. })
        ));
    }

    #[test]
    fn price_frame_truncates_trading_date() {
        let payload = json!({
            "ticker": "FPT",
            "data": [
                {"open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 1000, "tradingDate": "2024-01-02T00:00:00.000Z"},
                {"open": 1.5, "high": 2.5, "low": 1.0, "close": null, "volume": 1200, "tradingDate": "2024-01-03T00:00:00.000Z"}
            ]
        });

        let df = price_frame("FPT", payload).unwrap();
        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["time", "open", "high", "low", "close", "volume"]);
        assert_eq!(df.column("time").unwrap().str().unwrap().get(1), Some("2024-01-03"));
        assert_eq!(df.column("volume").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("close").unwrap().null_count(), 1);
    }

    #[test]
    fn price_frame_without_data_is_empty() {
        assert!(matches!(
            price_frame("ZZZ", json!({"ticker": "ZZZ", "data": null})),
            Err(ProviderError::Empty { .. })
        ));
    }
}
