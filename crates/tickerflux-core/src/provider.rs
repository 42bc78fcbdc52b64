//! The external financial-data provider: query shapes, the provider seam, and the
//! conversion from JSON records into a polars frame.

mod tcbs;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, PolarsError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use tcbs::{period_frame, price_frame, TcbsProvider, DEFAULT_BASE_URL};

/// Label column carried by period-keyed reports (`"2024-Q1"` or `"2024"`).
pub const PERIOD_COLUMN: &str = "period";

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowReport {
    BalanceSheet,
    CashFlow,
    IncomeStatement,
}

impl FlowReport {
    pub fn endpoint(&self) -> &'static str {
        match self {
            FlowReport::BalanceSheet => "balancesheet",
            FlowReport::CashFlow => "cashflow",
            FlowReport::IncomeStatement => "incomestatement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    FinancialFlow(FlowReport),
    FinancialRatio,
    PriceHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodGranularity {
    Quarterly,
    Yearly,
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub ticker: String,
    pub source: ReportSource,
    pub period: PeriodGranularity,
    pub history: Option<DateRange>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response for {ticker}: {message}")]
    Malformed { ticker: String, message: String },
    #[error("no data returned for {ticker}")]
    Empty { ticker: String },
    #[error("invalid query for {ticker}: {message}")]
    InvalidQuery { ticker: String, message: String },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[async_trait]
pub trait ReportProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, query: &ReportQuery) -> Result<DataFrame, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Text,
}

impl ColumnKind {
    fn widen(self, value: &Value) -> Self {
        match (self, value) {
            (kind, Value::Null) => kind,
            (ColumnKind::Int, Value::Number(n)) if n.as_i64().is_some() => ColumnKind::Int,
            (ColumnKind::Int | ColumnKind::Float, Value::Number(_)) => ColumnKind::Float,
            _ => ColumnKind::Text,
        }
    }
}

/// Builds a frame from JSON objects. Columns keep first-seen order; a column whose
/// non-null values are all integers becomes `Int64`, all numbers `Float64`, anything
/// else `String`. Absent keys and JSON nulls stay null.
pub fn records_to_frame(
    ticker: &str,
    rows: &[Map<String, Value>],
) -> Result<DataFrame, ProviderError> {
    if rows.is_empty() {
        return Err(ProviderError::Empty {
            ticker: ticker.to_string(),
        });
    }

    let mut names: Vec<&str> = Vec::new();
    let mut kinds: HashMap<&str, ColumnKind> = HashMap::new();
    for row in rows {
        for (name, value) in row {
            let kind = kinds.entry(name.as_str()).or_insert_with(|| {
                names.push(name.as_str());
                ColumnKind::Int
            });
            *kind = kind.widen(value);
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let values = rows.iter().map(|row| row.get(name).unwrap_or(&NULL));
        let column = match kinds[name] {
            ColumnKind::Int => Column::new(
                name.into(),
                values.map(Value::as_i64).collect::<Vec<Option<i64>>>(),
            ),
            ColumnKind::Float => Column::new(
                name.into(),
                values.map(Value::as_f64).collect::<Vec<Option<f64>>>(),
            ),
            ColumnKind::Text => Column::new(
                name.into(),
                values.map(value_to_text).collect::<Vec<Option<String>>>(),
            ),
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Serves canned records per ticker regardless of the report requested. Tickers
/// without records fail the way the live provider does for unknown symbols.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    records: HashMap<String, Vec<Map<String, Value>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rows` for `ticker`; non-object values are ignored.
    pub fn with_records(mut self, ticker: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.records.insert(ticker.to_string(), rows);
        self
    }

    /// Tickers requested so far, in request order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReportProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, query: &ReportQuery) -> Result<DataFrame, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.ticker.clone());
        }

        let rows = self
            .records
            .get(&query.ticker)
            .map(Vec::as_slice)
            .unwrap_or_default();
        records_to_frame(&query.ticker, rows)
    }
}
