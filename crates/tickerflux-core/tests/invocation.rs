mod common;

use anyhow::Result;
use tickerflux_core::{
    bucket::MemoryBucketStore,
    config::Settings,
    invocation::{handle, InvocationEvent},
    jobs::JobKind,
    pipeline::TickerOutcome,
};

use common::{price_rows, provider_with, ratio_rows};

#[tokio::test]
async fn rejected_ticker_still_answers_200() -> Result<()> {
    let provider = provider_with(&["FPT"], ratio_rows);
    let store = MemoryBucketStore::new();
    let event = InvocationEvent::from_json(br#"{"tickers": ["FPT", "NOPE"]}"#)?;

    let response = handle(JobKind::Ratio, &event, &Settings::default(), &provider, &store).await?;
    assert_eq!(response.status_code, 200);

    let summary = response.summary()?;
    assert_eq!(summary.processed_tickers, 2);
    assert_eq!(summary.failed, 1);
    match &summary.details[1] {
        TickerOutcome::Error { ticker, error } => {
            assert_eq!(ticker, "NOPE");
            assert!(!error.is_empty());
        }
        other => panic!("expected failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn all_failures_are_still_a_successful_invocation() -> Result<()> {
    let provider = provider_with(&[], ratio_rows);
    let store = MemoryBucketStore::new();
    let event = InvocationEvent::from_json(br#"{"tickers": ["AAA", "BBB"]}"#)?;

    let response = handle(JobKind::Cashflow, &event, &Settings::default(), &provider, &store).await?;
    assert_eq!(response.status_code, 200);
    let summary = response.summary()?;
    assert_eq!((summary.successful, summary.failed), (0, 2));
    assert!(store.is_empty());
    Ok(())
}

#[tokio::test]
async fn event_overrides_bucket_and_prefix() -> Result<()> {
    let provider = provider_with(&["VTC"], price_rows);
    let store = MemoryBucketStore::new();
    let event = InvocationEvent::from_json(
        br#"{"tickers": ["vtc"], "bucket": "scratch", "prefix": "tmp/prices/"}"#,
    )?;

    let response =
        handle(JobKind::PriceStock, &event, &Settings::default(), &provider, &store).await?;
    let summary = response.summary()?;
    assert_eq!(summary.successful, 1);

    let keys = store.keys("scratch");
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("tmp/prices/price_stock_VTC_"), "{}", keys[0]);
    assert!(keys[0].ends_with(".json"));
    assert!(store.keys("dat-lt").is_empty());

    let stored = store.get("scratch", &keys[0]).expect("price artifact");
    let records: Vec<serde_json::Value> = serde_json::from_slice(&stored.bytes)?;
    assert!(records.iter().all(|r| r["Ticker"] == "VTC"));
    assert_eq!(records[1]["low"], 0.0);
    Ok(())
}

#[tokio::test]
async fn settings_supply_defaults_below_the_event() -> Result<()> {
    let settings = Settings::from_toml_str(
        r#"
        bucket = "lake"

        [jobs.ratio]
        tickers = ["FPT"]
        "#,
    )?;
    let provider = provider_with(&["FPT"], ratio_rows);
    let store = MemoryBucketStore::new();

    let response =
        handle(JobKind::Ratio, &InvocationEvent::default(), &settings, &provider, &store).await?;
    assert_eq!(response.summary()?.successful, 1);
    assert_eq!(provider.calls(), vec!["FPT".to_string()]);
    assert_eq!(store.keys("lake").len(), 1);
    Ok(())
}
