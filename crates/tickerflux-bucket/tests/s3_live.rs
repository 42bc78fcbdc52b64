use std::env;

use bytes::Bytes;
use tickerflux_bucket::{BucketStore, S3BucketStore, S3Config};

const REQUIRED_VARS: &[&str] = &[
    "TICKERFLUX_TEST_S3_BUCKET",
    "TICKERFLUX_TEST_S3_ENDPOINT",
    "TICKERFLUX_TEST_S3_ACCESS_KEY_ID",
    "TICKERFLUX_TEST_S3_SECRET_ACCESS_KEY",
];

#[tokio::test]
async fn s3_store_accepts_upload() {
    let values: Vec<Option<String>> = REQUIRED_VARS
        .iter()
        .map(|key| env::var(key).ok())
        .collect();
    let [Some(bucket), Some(endpoint), Some(access_key_id), Some(secret_access_key)] =
        <[Option<String>; 4]>::try_from(values).expect("four variables")
    else {
        eprintln!(
            "Skipping S3 bucket test; set {} to enable",
            REQUIRED_VARS.join(", ")
        );
        return;
    };

    let config = S3Config {
        region: env::var("TICKERFLUX_TEST_S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
        endpoint: Some(endpoint),
        access_key_id: Some(access_key_id),
        secret_access_key: Some(secret_access_key),
        session_token: None,
        force_path_style: true,
    };

    let store = S3BucketStore::new(config).await.expect("build S3 store");
    store
        .put_object(
            &bucket,
            "tickerflux-tests/ping.json",
            Bytes::from_static(b"[]"),
            "application/json",
        )
        .await
        .expect("upload to S3");
}
