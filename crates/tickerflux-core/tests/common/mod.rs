#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tickerflux_core::provider::StaticProvider;

pub fn invoked_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 2).unwrap()
}

pub fn quarterly_rows() -> Vec<Value> {
    vec![
        json!({"period": "2024-Q4", "asset": 1200, "cash": 310.5, "debt": null}),
        json!({"period": "2024-Q3", "asset": 1100, "cash": null, "debt": 42}),
    ]
}

pub fn yearly_rows() -> Vec<Value> {
    vec![
        json!({"period": "2024", "revenue": 52.0, "netProfit": null}),
        json!({"period": "2023", "revenue": 44.5, "netProfit": 7.25}),
        json!({"period": "2022", "revenue": null, "netProfit": 6.0}),
    ]
}

pub fn ratio_rows() -> Vec<Value> {
    vec![
        json!({"period": "2024-Q4", "pe": 18.2, "roe": 0.27, "note": "audited"}),
        json!({"period": "2024-Q3", "pe": null, "roe": 0.25, "note": null}),
    ]
}

pub fn price_rows() -> Vec<Value> {
    vec![
        json!({"time": "2025-03-05", "open": 120.0, "high": 122.5, "low": 119.0, "close": 121.0, "volume": 1500}),
        json!({"time": "2025-03-06", "open": 121.0, "high": 123.0, "low": null, "close": 122.0, "volume": 900}),
    ]
}

/// Provider that knows `tickers` with the given rows; everything else is unknown.
pub fn provider_with(tickers: &[&str], rows: fn() -> Vec<Value>) -> StaticProvider {
    tickers
        .iter()
        .fold(StaticProvider::new(), |provider, ticker| {
            provider.with_records(ticker, rows())
        })
}
