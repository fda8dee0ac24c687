// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Prometheus counters for the proxy and target roles.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters owned by the server state. Each instance has its own registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub target_queries: IntCounter,
    pub target_valid_queries: IntCounterVec,
    pub target_errors: IntCounterVec,
    pub proxy_queries: IntCounter,
    pub proxy_valid_queries: IntCounter,
    pub proxy_errors: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let target_queries = IntCounter::with_opts(Opts::new(
            "odohd_target_queries_total",
            "Total queries as a target",
        ))?;
        let target_valid_queries = IntCounterVec::new(
            Opts::new(
                "odohd_target_valid_queries_total",
                "Total valid queries as a target",
            ),
            &["protocol"],
        )?;
        let target_errors = IntCounterVec::new(
            Opts::new("odohd_target_errors_total", "Failed target queries by status"),
            &["status"],
        )?;
        let proxy_queries = IntCounter::with_opts(Opts::new(
            "odohd_proxy_queries_total",
            "Total queries as a proxy",
        ))?;
        let proxy_valid_queries = IntCounter::with_opts(Opts::new(
            "odohd_proxy_valid_queries_total",
            "Total valid queries as a proxy",
        ))?;
        let proxy_errors = IntCounterVec::new(
            Opts::new("odohd_proxy_errors_total", "Failed proxy relays by reason"),
            &["reason"],
        )?;

        registry.register(Box::new(target_queries.clone()))?;
        registry.register(Box::new(target_valid_queries.clone()))?;
        registry.register(Box::new(target_errors.clone()))?;
        registry.register(Box::new(proxy_queries.clone()))?;
        registry.register(Box::new(proxy_valid_queries.clone()))?;
        registry.register(Box::new(proxy_errors.clone()))?;

        Ok(Self {
            registry,
            target_queries,
            target_valid_queries,
            target_errors,
            proxy_queries,
            proxy_valid_queries,
            proxy_errors,
        })
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render() {
        let metrics = Metrics::new().unwrap();
        metrics.target_queries.inc();
        metrics
            .target_valid_queries
            .with_label_values(&["oblivious"])
            .inc();
        metrics.proxy_errors.with_label_values(&["transport"]).inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("odohd_target_queries_total 1"));
        assert!(text.contains("odohd_target_valid_queries_total{protocol=\"oblivious\"} 1"));
        assert!(text.contains("odohd_proxy_errors_total{reason=\"transport\"} 1"));
    }

    #[test]
    fn registries_are_independent() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.proxy_valid_queries.inc();
        assert_eq!(a.proxy_valid_queries.get(), 1);
        assert_eq!(b.proxy_valid_queries.get(), 0);
    }
}
