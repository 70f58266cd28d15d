//! End-to-end queries against an in-memory gateway.

use std::sync::Arc;

use serde_json::json;

use opp_exporter::core::{merkle_root, MessageVariant};
use opp_exporter::gateway::{BundleHeaders, MemoryGateway};
use opp_exporter::{ExportError, Exporter, ExporterConfig};
use opp_exporter_testkit::{
    key_set, lineage_chain, two_step_chain, ChainFixture, TestSigner, TRACE_ID,
    TWO_STEP_CHAIN_CID,
};

fn exporter(gateway: &Arc<MemoryGateway>) -> Exporter<MemoryGateway> {
    Exporter::new(Arc::clone(gateway), ExporterConfig::default())
}

#[tokio::test]
async fn graph_of_two_step_chain() {
    let gateway = MemoryGateway::new();
    gateway
        .put_bundle(TRACE_ID, &two_step_chain(), BundleHeaders::default())
        .await;

    let view = exporter(&gateway).graph(TRACE_ID, None).await.unwrap();

    assert_eq!(view.trace_id, "t1");
    assert_eq!(view.count, 2);
    assert_eq!(view.nodes[0].id.as_deref(), Some("r1"));
    assert_eq!(view.nodes[1].ts.as_deref(), Some("2024-01-01T00:00:10Z"));
    assert_eq!(view.nodes[1].step.as_deref(), Some("train.v1"));
    assert_eq!(view.edges.len(), 1);
    assert_eq!(view.edges[0].from.as_deref(), Some("r1"));
    assert_eq!(view.edges[0].to.as_deref(), Some("r2"));
}

#[tokio::test]
async fn validate_unsigned_two_step_chain() {
    let gateway = MemoryGateway::new();
    let headers = BundleHeaders {
        cid: Some(TWO_STEP_CHAIN_CID.to_string()),
        ..Default::default()
    };
    gateway.put_bundle(TRACE_ID, &two_step_chain(), headers).await;
    gateway.put_key_set(Default::default()).await;

    let report = exporter(&gateway)
        .validate(TRACE_ID, None, None)
        .await
        .unwrap();

    assert!(report.chain_ok);
    assert!(report.cid_match);
    assert!(!report.sig_ok);
    assert!(!report.ok);
    assert_eq!(report.sig_variant, None);
    assert_eq!(report.bundle_cid.to_string(), TWO_STEP_CHAIN_CID);
}

#[tokio::test]
async fn validate_signed_with_each_variant() {
    let signer = TestSigner::from_seed("k1", [3; 32]);
    let fixture = lineage_chain("t-signed");

    for variant in MessageVariant::PRIORITY {
        let gateway = MemoryGateway::new();
        fixture
            .publish(&gateway, fixture.signed_headers(&signer, variant))
            .await;
        gateway.put_key_set(key_set(&[&signer])).await;

        let report = exporter(&gateway)
            .validate("t-signed", None, None)
            .await
            .unwrap();

        assert!(report.ok, "{variant:?}: {report:?}");
        assert_eq!(report.sig_variant, Some(variant));
        assert_eq!(report.kid.as_deref(), Some("k1"));
    }
}

#[tokio::test]
async fn validate_tries_every_candidate_key() {
    let other = TestSigner::from_seed("k0", [1; 32]);
    let signer = TestSigner::from_seed("k1", [2; 32]);
    let fixture = lineage_chain("t-keys");

    let mut headers = fixture.signed_headers(&signer, MessageVariant::CidTraceTs);
    headers.kid = None;

    let gateway = MemoryGateway::new();
    fixture.publish(&gateway, headers).await;
    gateway.put_key_set(key_set(&[&other, &signer])).await;

    let report = exporter(&gateway)
        .validate("t-keys", None, None)
        .await
        .unwrap();
    assert!(report.sig_ok);
    assert_eq!(report.kid, None);
}

#[tokio::test]
async fn validate_kid_filter_and_header_precedence() {
    let signer = TestSigner::from_seed("k1", [2; 32]);
    let fixture = lineage_chain("t-kid");
    let gateway = MemoryGateway::new();
    gateway.put_key_set(key_set(&[&signer])).await;
    let exporter = exporter(&gateway);

    // No header kid: the caller's filter excludes the only signing key.
    let mut headers = fixture.signed_headers(&signer, MessageVariant::Cid);
    headers.kid = None;
    fixture.publish(&gateway, headers.clone()).await;

    let report = exporter.validate("t-kid", None, Some("k9")).await.unwrap();
    assert!(!report.sig_ok);
    assert_eq!(report.kid.as_deref(), Some("k9"));

    // Header kid wins over the caller's filter.
    headers.kid = Some("k1".into());
    fixture.publish(&gateway, headers).await;

    let report = exporter.validate("t-kid", None, Some("k9")).await.unwrap();
    assert!(report.sig_ok);
    assert_eq!(report.kid.as_deref(), Some("k1"));
}

#[tokio::test]
async fn validate_tampered_bundle() {
    let signer = TestSigner::from_seed("k1", [4; 32]);
    let fixture = lineage_chain("t-tamper");
    let headers = fixture.signed_headers(&signer, MessageVariant::CidTraceTs);

    // Serve a different document under the untampered headers.
    let tampered = fixture.clone().relink(1, "sha256:forged");
    let gateway = MemoryGateway::new();
    tampered.publish(&gateway, headers).await;
    gateway.put_key_set(key_set(&[&signer])).await;

    let report = exporter(&gateway)
        .validate("t-tamper", None, None)
        .await
        .unwrap();

    assert!(!report.chain_ok);
    assert!(!report.cid_match);
    assert!(!report.sig_ok);
    assert!(!report.ok);
    assert_eq!(report.bundle_cid, tampered.bundle_cid());
}

#[tokio::test]
async fn validate_uses_bundle_ts_for_empty_chain() {
    let signer = TestSigner::from_seed("k1", [5; 32]);
    let fixture = ChainFixture::new("t-empty").with_bundle_ts("2024-02-02T00:00:00Z");
    let headers = fixture.signed_headers(&signer, MessageVariant::CidTraceTs);

    let gateway = MemoryGateway::new();
    fixture.publish(&gateway, headers).await;
    gateway.put_key_set(key_set(&[&signer])).await;

    let report = exporter(&gateway)
        .validate("t-empty", None, None)
        .await
        .unwrap();
    assert!(report.ok);
    assert_eq!(report.sig_variant, Some(MessageVariant::CidTraceTs));
}

#[tokio::test]
async fn passport_and_policy() {
    let gateway = MemoryGateway::new();
    let fixture = lineage_chain("t-lineage");
    fixture.publish(&gateway, fixture.unsigned_headers()).await;
    let exporter = exporter(&gateway);

    let passport = exporter.passport("t-lineage", None).await.unwrap();
    assert_eq!(passport.trace_id.as_deref(), Some("t-lineage"));
    assert_eq!(
        passport.dataset_roots,
        vec![merkle_root(["c1", "c2"]), merkle_root(["c3", "c4"])]
    );
    assert_eq!(passport.safety_flags.get("nsfw"), Some(&true));
    assert_eq!(passport.metrics.get("loss"), Some(&json!(0.1)));

    let policy = exporter.policy("t-lineage", None).await.unwrap();
    assert_eq!(policy.trace_id.as_deref(), Some("t-lineage"));
    assert_eq!(policy.engines, vec!["opa".to_string()]);
    assert_eq!(policy.decisions.len(), 2);
    assert_eq!(policy.breach_count, 1);
}

#[tokio::test]
async fn fetch_failure_is_an_error_not_a_verdict() {
    let gateway = MemoryGateway::new();
    let exporter = exporter(&gateway);

    let err = exporter.graph("unknown", None).await.unwrap_err();
    assert!(matches!(err, ExportError::Fetch(_)));

    // Bundle present but key-set missing.
    gateway
        .put_bundle(TRACE_ID, &two_step_chain(), BundleHeaders::default())
        .await;
    let err = exporter.validate(TRACE_ID, None, None).await.unwrap_err();
    assert!(matches!(err, ExportError::Fetch(_)));
}

#[tokio::test]
async fn malformed_bundle_is_an_error() {
    let gateway = MemoryGateway::new();
    gateway
        .put_raw_bundle("t-bad", "not json".into(), BundleHeaders::default())
        .await;
    gateway
        .put_bundle("t-array", &json!([1, 2, 3]), BundleHeaders::default())
        .await;
    let exporter = exporter(&gateway);

    for trace in ["t-bad", "t-array"] {
        let err = exporter.passport(trace, None).await.unwrap_err();
        assert!(matches!(err, ExportError::MalformedBundle(_)), "{trace}");
    }
}

#[tokio::test]
async fn gateway_override_and_default() {
    let gateway = MemoryGateway::new();
    gateway
        .put_bundle(TRACE_ID, &two_step_chain(), BundleHeaders::default())
        .await;
    let exporter = exporter(&gateway);

    exporter.graph(TRACE_ID, None).await.unwrap();
    exporter
        .graph(TRACE_ID, Some("http://other-gw:9000/"))
        .await
        .unwrap();
    exporter.graph(TRACE_ID, Some("")).await.unwrap();

    let requests = gateway.requests().await;
    assert_eq!(requests[0].base_url, "http://127.0.0.1:8080");
    assert_eq!(requests[1].base_url, "http://other-gw:9000/");
    assert_eq!(requests[1].path, "/v1/receipts/export/t1");
    assert_eq!(requests[2].base_url, "http://127.0.0.1:8080");
}

#[test]
fn health() {
    let gateway = MemoryGateway::new();
    let health = exporter(&gateway).health();
    assert!(health.ok);
    assert_eq!(health.service, "opp-exporter");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}
