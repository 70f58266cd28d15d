//! The exporter service: fetch a bundle, then derive a view of it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use opp_exporter_core::{
    build_graph, check_chain, extract_policy, to_passport, verify_detached, ContentId, Edge,
    ExportedBundle, MessageVariant, Node, Passport, PolicyReport, SignatureRequest,
};
use opp_exporter_gateway::{BundleHeaders, Gateway, DEFAULT_TIMEOUT};

use crate::error::{ExportError, Result};

/// Environment variable overriding [`ExporterConfig::default_gateway`].
pub const ENV_GATEWAY_URL: &str = "OPP_GATEWAY_URL";
/// Environment variable overriding [`ExporterConfig::fetch_timeout`], in seconds.
pub const ENV_FETCH_TIMEOUT_SECS: &str = "OPP_FETCH_TIMEOUT_SECS";
/// Environment variable overriding [`ExporterConfig::bind_addr`].
pub const ENV_EXPORTER_ADDR: &str = "OPP_EXPORTER_ADDR";

/// Configuration for the exporter.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Gateway used when a query does not name one.
    pub default_gateway: String,
    /// Per-request fetch timeout.
    pub fetch_timeout: Duration,
    /// Listen address of the server binary.
    pub bind_addr: SocketAddr,
    /// Reported by the liveness query.
    pub service_name: String,
    pub version: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            default_gateway: "http://127.0.0.1:8080".to_string(),
            fetch_timeout: DEFAULT_TIMEOUT,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            service_name: "opp-exporter".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ExporterConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`. Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_GATEWAY_URL) {
            config.default_gateway = url.trim().to_string();
        }
        if let Some(secs) = get(ENV_FETCH_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ExportError::Config(format!(
                    "{ENV_FETCH_TIMEOUT_SECS}={secs} is not a number of seconds"
                ))
            })?;
            if secs == 0 {
                return Err(ExportError::Config(format!(
                    "{ENV_FETCH_TIMEOUT_SECS} must be positive"
                )));
            }
            config.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(addr) = get(ENV_EXPORTER_ADDR) {
            config.bind_addr = addr.trim().parse().map_err(|_| {
                ExportError::Config(format!(
                    "{ENV_EXPORTER_ADDR}={addr} is not a socket address"
                ))
            })?;
        }

        Ok(config)
    }
}

/// Graph query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub trace_id: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub count: usize,
}

/// Validate query result.
///
/// The three checks stay separate so a caller can tell which one failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// `chain_ok && cid_match && sig_ok`
    pub ok: bool,
    pub chain_ok: bool,
    pub cid_match: bool,
    pub sig_ok: bool,
    pub sig_variant: Option<MessageVariant>,
    /// Locally recomputed content id of the bundle.
    pub bundle_cid: ContentId,
    /// Key id used to select candidate keys.
    pub kid: Option<String>,
}

/// Liveness query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

/// Read-only queries over bundles served by a gateway.
///
/// Every query fetches fresh data; nothing is cached between requests.
pub struct Exporter<G: Gateway> {
    gateway: Arc<G>,
    config: ExporterConfig,
}

impl<G: Gateway> Exporter<G> {
    /// Create a new exporter.
    pub fn new(gateway: Arc<G>, config: ExporterConfig) -> Self {
        Self { gateway, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Get the gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Resolve the gateway base URL for a query.
    fn base_url<'a>(&'a self, gateway: Option<&'a str>) -> &'a str {
        gateway
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(self.config.default_gateway.as_str())
    }

    async fn load(
        &self,
        trace_id: &str,
        gateway: Option<&str>,
    ) -> Result<(ExportedBundle, BundleHeaders)> {
        let response = self
            .gateway
            .fetch_bundle(self.base_url(gateway), trace_id)
            .await?;
        let bundle = ExportedBundle::from_slice(&response.body)?;
        Ok((bundle, response.headers))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Provenance graph of a trace.
    pub async fn graph(&self, trace_id: &str, gateway: Option<&str>) -> Result<GraphView> {
        let (bundle, _) = self.load(trace_id, gateway).await?;
        let graph = build_graph(bundle.chain());
        let count = graph.count();

        info!(trace_id, nodes = count, edges = graph.edges.len(), "graph query");

        Ok(GraphView {
            trace_id: trace_id.to_string(),
            nodes: graph.nodes,
            edges: graph.edges,
            count,
        })
    }

    /// Verify chain integrity, the advertised content id, and the detached
    /// signature of a trace's bundle.
    ///
    /// The bundle and the key-set are fetched concurrently. The key id sent
    /// by the gateway takes precedence over `kid`.
    pub async fn validate(
        &self,
        trace_id: &str,
        gateway: Option<&str>,
        kid: Option<&str>,
    ) -> Result<ValidationReport> {
        let base_url = self.base_url(gateway);
        let (response, keys) = tokio::try_join!(
            self.gateway.fetch_bundle(base_url, trace_id),
            self.gateway.fetch_key_set(base_url),
        )?;
        let bundle = ExportedBundle::from_slice(&response.body)?;
        let headers = response.headers;

        let check = check_chain(&bundle, headers.cid.as_deref());

        let kid = headers
            .kid
            .clone()
            .or_else(|| kid.filter(|k| !k.is_empty()).map(str::to_string));

        let verdict = verify_detached(
            &SignatureRequest {
                signature: headers.signature.as_deref(),
                bundle_cid: &check.bundle_cid,
                trace_id,
                timestamp: bundle.bundle().representative_ts(),
                kid: kid.as_deref(),
            },
            &keys,
        );

        let report = ValidationReport {
            ok: check.chain_ok && check.cid_match && verdict.verified,
            chain_ok: check.chain_ok,
            cid_match: check.cid_match,
            sig_ok: verdict.verified,
            sig_variant: verdict.variant,
            bundle_cid: check.bundle_cid,
            kid,
        };

        info!(
            trace_id,
            ok = report.ok,
            chain_ok = report.chain_ok,
            first_break = ?check.first_break,
            cid_match = report.cid_match,
            sig_ok = report.sig_ok,
            sig_variant = verdict.variant.map(|v| v.as_str()),
            verified_kid = verdict.kid.as_deref(),
            "validate query"
        );

        Ok(report)
    }

    /// Lineage passport of a trace.
    pub async fn passport(&self, trace_id: &str, gateway: Option<&str>) -> Result<Passport> {
        let (bundle, _) = self.load(trace_id, gateway).await?;
        let passport = to_passport(bundle.bundle(), Some(trace_id));

        info!(
            trace_id,
            dataset_roots = passport.dataset_roots.len(),
            safety_flags = passport.safety_flags.len(),
            "passport query"
        );

        Ok(passport)
    }

    /// Policy decisions and breaches of a trace.
    pub async fn policy(&self, trace_id: &str, gateway: Option<&str>) -> Result<PolicyReport> {
        let (bundle, _) = self.load(trace_id, gateway).await?;
        let report = extract_policy(bundle.bundle(), Some(trace_id));

        info!(
            trace_id,
            engines = report.engines.len(),
            decisions = report.decisions.len(),
            breach_count = report.breach_count,
            "policy query"
        );

        Ok(report)
    }

    /// Liveness.
    pub fn health(&self) -> Health {
        Health {
            ok: true,
            service: self.config.service_name.clone(),
            version: self.config.version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ExporterConfig::default();
        assert_eq!(config.default_gateway, "http://127.0.0.1:8080");
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.service_name, "opp-exporter");
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ExporterConfig::from_lookup(lookup(&[
            (ENV_GATEWAY_URL, "https://gw.example/"),
            (ENV_FETCH_TIMEOUT_SECS, "3"),
            (ENV_EXPORTER_ADDR, "0.0.0.0:9000"),
        ]))
        .unwrap();

        assert_eq!(config.default_gateway, "https://gw.example/");
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let config = ExporterConfig::from_lookup(lookup(&[(ENV_GATEWAY_URL, "  ")])).unwrap();
        assert_eq!(config.default_gateway, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_bad_env_values() {
        for (key, value) in [
            (ENV_FETCH_TIMEOUT_SECS, "soon"),
            (ENV_FETCH_TIMEOUT_SECS, "0"),
            (ENV_EXPORTER_ADDR, "localhost"),
        ] {
            let result = ExporterConfig::from_lookup(lookup(&[(key, value)]));
            assert!(matches!(result, Err(ExportError::Config(_))), "{key}={value}");
        }
    }
}
