//! Tests for the pool stream

use super::*;
use crate::decode::Record;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use crate::pagination::{PaginationConfig, Paginated};
use crate::pool::{BundlePage, PoolApi};
use crate::state::{CursorState, StatefulCursor};
use crate::storage::{sha256_hex, ContentFetcher, StorageEndpoints};
use crate::types::FetchFailurePolicy;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POOL: u64 = 1;
const LISTING: &str = "/kyve/v1/bundles/1";

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn payload(keys: &[i64]) -> Vec<u8> {
    let items: Vec<Value> = keys
        .iter()
        .map(|k| json!({"key": k.to_string(), "value": {"height": k}}))
        .collect();
    gzip(Value::Array(items).to_string().as_bytes())
}

fn bundle_json(id: &str, storage_id: &str, provider: &str, raw: &[u8]) -> Value {
    json!({
        "id": id,
        "storage_id": storage_id,
        "storage_provider_id": provider,
        "data_hash": sha256_hex(raw)
    })
}

async fn mount_blob(server: &MockServer, storage_id: &str, raw: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/{storage_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(raw))
        .mount(server)
        .await;
}

fn pool_stream(server: &MockServer, pagination: PaginationConfig) -> PoolStream {
    pool_stream_with_policy(server, pagination, FetchFailurePolicy::Abort)
}

fn pool_stream_with_policy(
    server: &MockServer,
    pagination: PaginationConfig,
    policy: FetchFailurePolicy,
) -> PoolStream {
    let http = HttpClientConfig::builder()
        .max_retries(0)
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(http).unwrap();
    let api = PoolApi::new(client.clone(), server.uri());
    let fetcher = ContentFetcher::new(client, StorageEndpoints::new(server.uri(), server.uri()));
    let config = PoolStreamConfig::new(POOL)
        .with_runtime("@kyvejs/tendermint")
        .with_pagination(pagination)
        .with_fetch_policy(policy);
    PoolStream::new(config, api, fetcher)
}

async fn drain(stream: &mut PoolStream) -> Vec<Record> {
    let mut records = Vec::new();
    while let Some(record) = stream.next_record().await.unwrap() {
        records.push(record);
    }
    records
}

async fn listing_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == LISTING)
        .count()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_stream_name() {
    assert_eq!(stream_name(7), "pool_7");
    assert_eq!(PoolStreamConfig::new(0).name(), "pool_0");
}

#[test]
fn test_stream_config_defaults() {
    let config = PoolStreamConfig::new(2);
    assert_eq!(config.pagination.page_size, 100);
    assert!(config.pagination.max_pages.is_none());
    assert_eq!(config.on_fetch_error, FetchFailurePolicy::Abort);
    assert!(config.runtime.is_none());
}

// ============================================================================
// Read Tests
// ============================================================================

#[tokio::test]
async fn test_two_pages_with_malformed_bundle() {
    let server = MockServer::start().await;

    let a = payload(&[1, 2]);
    let b = b"definitely not gzip".to_vec();
    let c = payload(&[5]);

    Mock::given(method("GET"))
        .and(path(LISTING))
        .and(query_param("pagination.limit", "2"))
        .and(query_param("pagination.offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [
                bundle_json("0", "bundle_a", "3", &a),
                bundle_json("1", "bundle_b", "1", &b)
            ],
            "pagination": {"next_key": "x"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING))
        .and(query_param("pagination.offset", "2"))
        .and(query_param("next_page_token", "x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [bundle_json("2", "bundle_c", "2", &c)],
            "pagination": {"next_key": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_blob(&server, "bundle_a", a).await;
    mount_blob(&server, "bundle_b", b).await;
    mount_blob(&server, "bundle_c", c).await;

    let mut stream = pool_stream(&server, PaginationConfig::new(2));
    let records = drain(&mut stream).await;

    let keys: Vec<i64> = records.iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![1, 2, 5]);
    assert_eq!(records[2].value, json!({"height": 5}));
    assert_eq!(stream.state(), CursorState::BundleId("2".to_string()));
    assert_eq!(listing_requests(&server).await, 2);
    assert!(stream.is_finished());

    let stats = stream.stats();
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.bundles_processed, 2);
    assert_eq!(stats.bundles_skipped, 1);
    assert_eq!(stats.records_emitted, 3);
}

#[tokio::test]
async fn test_hash_mismatch_aborts() {
    let server = MockServer::start().await;
    let a = payload(&[1]);

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [{
                "id": "0",
                "storage_id": "bundle_a",
                "storage_provider_id": "1",
                "data_hash": sha256_hex(b"something else")
            }],
            "pagination": {"next_key": "more"}
        })))
        .mount(&server)
        .await;
    mount_blob(&server, "bundle_a", a).await;

    let mut stream = pool_stream(&server, PaginationConfig::new(1));
    let err = stream.next_record().await.unwrap_err();

    assert!(matches!(err, Error::Integrity { ref bundle_id, .. } if bundle_id == "0"));
    assert!(stream.is_finished());
    assert!(stream.next_record().await.unwrap().is_none());
    assert_eq!(stream.stats().records_emitted, 0);
    assert_eq!(stream.state(), CursorState::Offset(0));
    assert_eq!(listing_requests(&server).await, 1);
}

#[tokio::test]
async fn test_state_offset_before_bundle_id_after() {
    let server = MockServer::start().await;
    let a = payload(&[10, 11]);

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [bundle_json("10", "bundle_a", "3", &a)],
            "pagination": {}
        })))
        .mount(&server)
        .await;
    mount_blob(&server, "bundle_a", a).await;

    let mut stream = pool_stream(&server, PaginationConfig::new(5).with_start_offset(10));
    assert_eq!(stream.state(), CursorState::Offset(10));

    // Mid-page the cursor has not moved yet
    let first = stream.next_event().await.unwrap();
    assert!(matches!(first, Some(StreamEvent::Record(_))));
    assert_eq!(stream.state(), CursorState::Offset(10));

    let second = stream.next_event().await.unwrap();
    assert!(matches!(second, Some(StreamEvent::Record(_))));

    let boundary = stream.next_event().await.unwrap();
    assert_eq!(
        boundary,
        Some(StreamEvent::PageComplete(CursorState::BundleId("10".to_string())))
    );
    assert_eq!(stream.state(), CursorState::BundleId("10".to_string()));
    assert!(stream.next_event().await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_page_leaves_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [],
            "pagination": {"next_key": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = pool_stream(&server, PaginationConfig::new(100).with_start_offset(300));
    assert!(stream.next_event().await.unwrap().is_none());
    assert_eq!(stream.state(), CursorState::Offset(300));
    assert_eq!(stream.stats().pages_fetched, 1);
}

#[tokio::test]
async fn test_resume_from_bundle_id() {
    let server = MockServer::start().await;
    let a = payload(&[42]);

    Mock::given(method("GET"))
        .and(path(LISTING))
        .and(query_param("pagination.offset", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [bundle_json("42", "bundle_a", "1", &a)],
            "pagination": {"next_key": ""}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_blob(&server, "bundle_a", a).await;

    let mut stream = pool_stream(&server, PaginationConfig::new(10).with_start_offset(0));
    stream.set_state(CursorState::BundleId("41".to_string())).unwrap();
    assert_eq!(stream.state(), CursorState::BundleId("41".to_string()));
    assert_eq!(stream.next_request_params()["pagination.offset"], "42");

    let records = drain(&mut stream).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, 42);
}

#[tokio::test]
async fn test_restored_bundle_id_state_continues_like_live_stream() {
    let server = MockServer::start().await;
    let a = payload(&[1]);
    let b = payload(&[2]);

    Mock::given(method("GET"))
        .and(path(LISTING))
        .and(query_param("pagination.offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [
                bundle_json("0", "bundle_a", "1", &a),
                bundle_json("1", "bundle_b", "1", &b)
            ],
            "pagination": {"next_key": "x"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING))
        .and(query_param("pagination.offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [],
            "pagination": {"next_key": null}
        })))
        .expect(2)
        .mount(&server)
        .await;
    mount_blob(&server, "bundle_a", a).await;
    mount_blob(&server, "bundle_b", b).await;

    let mut live = pool_stream(&server, PaginationConfig::new(2));
    loop {
        match live.next_event().await.unwrap() {
            Some(StreamEvent::PageComplete(_)) => break,
            Some(StreamEvent::Record(_)) => continue,
            None => panic!("stream ended before the first page completed"),
        }
    }
    let saved = live.state();
    assert_eq!(saved, CursorState::BundleId("1".to_string()));

    let mut resumed = pool_stream(&server, PaginationConfig::new(2));
    resumed.set_state(saved.clone()).unwrap();
    assert_eq!(
        resumed.next_request_params()["pagination.offset"],
        live.next_request_params()["pagination.offset"]
    );
    assert_eq!(resumed.state(), saved);

    assert!(drain(&mut live).await.is_empty());
    assert!(drain(&mut resumed).await.is_empty());
}

#[tokio::test]
async fn test_restored_offset_state_continues_like_live_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING))
        .and(query_param("pagination.offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [],
            "pagination": {"next_key": "x"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING))
        .and(query_param("pagination.offset", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [],
            "pagination": {"next_key": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut live = pool_stream(&server, PaginationConfig::new(2).with_start_offset(4));
    assert!(drain(&mut live).await.is_empty());
    let saved = live.state();
    assert_eq!(saved, CursorState::Offset(6));

    let mut resumed = pool_stream(&server, PaginationConfig::new(2));
    resumed.set_state(saved.clone()).unwrap();
    assert_eq!(
        resumed.next_request_params()["pagination.offset"],
        live.next_request_params()["pagination.offset"]
    );
    assert_eq!(resumed.state(), saved);
}

#[tokio::test]
async fn test_set_state_rejects_non_numeric_id() {
    let server = MockServer::start().await;
    let mut stream = pool_stream(&server, PaginationConfig::default());
    let err = stream
        .set_state(CursorState::BundleId("abc".to_string()))
        .unwrap_err();
    assert!(matches!(err, Error::State { .. }));
    assert_eq!(stream.state(), CursorState::Offset(0));
}

#[tokio::test]
async fn test_page_ceiling_stops_despite_next_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [],
            "pagination": {"next_key": "always"}
        })))
        .mount(&server)
        .await;

    let mut stream = pool_stream(&server, PaginationConfig::new(100).with_max_pages(Some(3)));
    assert!(stream.next_record().await.unwrap().is_none());

    let offsets: Vec<u64> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "pagination.offset")
                .and_then(|(_, v)| v.parse().ok())
        })
        .collect();
    assert_eq!(offsets, vec![0, 100, 200, 300]);
}

#[tokio::test]
async fn test_fetch_failure_skip_policy() {
    let server = MockServer::start().await;
    let b = payload(&[2]);

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [
                {"id": "0", "storage_id": "gone", "storage_provider_id": "1", "data_hash": "00"},
                bundle_json("1", "bundle_b", "1", &b)
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_blob(&server, "bundle_b", b).await;

    let mut stream =
        pool_stream_with_policy(&server, PaginationConfig::new(2), FetchFailurePolicy::Skip);
    let records = drain(&mut stream).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, 2);
    assert_eq!(stream.stats().bundles_skipped, 1);
    assert_eq!(stream.state(), CursorState::BundleId("1".to_string()));
}

#[tokio::test]
async fn test_fetch_failure_abort_policy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [
                {"id": "0", "storage_id": "gone", "storage_provider_id": "3", "data_hash": "00"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut stream = pool_stream(&server, PaginationConfig::new(2));
    let err = stream.next_record().await.unwrap_err();

    assert!(matches!(err, Error::Fetch { status: Some(404), .. }));
    assert!(stream.is_finished());
}

#[tokio::test]
async fn test_listing_failure_ends_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let mut stream = pool_stream(&server, PaginationConfig::default());
    let err = stream.next_record().await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 400, .. }));
    assert!(stream.next_record().await.unwrap().is_none());
}

#[tokio::test]
async fn test_into_records_stream() {
    let server = MockServer::start().await;
    let a = payload(&[1, 2, 3]);

    Mock::given(method("GET"))
        .and(path(LISTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "finalized_bundles": [bundle_json("0", "bundle_a", "3", &a)]
        })))
        .mount(&server)
        .await;
    mount_blob(&server, "bundle_a", a).await;

    let records: Vec<Record> = pool_stream(&server, PaginationConfig::default())
        .into_records()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(records.len(), 3);
}

// ============================================================================
// Capability Tests
// ============================================================================

#[tokio::test]
async fn test_paginated_capability() {
    let server = MockServer::start().await;
    let mut stream = pool_stream(&server, PaginationConfig::new(50).with_max_pages(Some(2)));

    let params = stream.next_request_params();
    assert_eq!(params["pagination.limit"], "50");
    assert_eq!(params["pagination.offset"], "0");
    assert!(!params.contains_key("next_page_token"));

    let page: BundlePage =
        serde_json::from_value(json!({"pagination": {"next_key": "k1"}})).unwrap();
    assert!(stream.next_page_token(&page).is_continue());
    assert_eq!(stream.next_request_params()["next_page_token"], "k1");
    assert!(stream.next_page_token(&page).is_continue());
    assert!(stream.next_page_token(&page).is_done());
    assert_eq!(stream.state(), CursorState::Offset(100));
}
