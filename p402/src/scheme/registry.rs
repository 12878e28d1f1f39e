//! Registry of active scheme handlers.
//!
//! Maps `(chain, scheme)` combinations to handler instances and implements
//! [`Facilitator`] by dispatching to them, so a registry can stand wherever
//! a single handler would.

use std::collections::HashMap;
use std::fmt;
use std::fmt::{Debug, Formatter};

use super::SchemeSlug;
use crate::chain::{ChainId, ChainIdPattern};
use crate::facilitator::{BoxFuture, Facilitator, FacilitatorError};
use crate::proto;
use crate::proto::ErrorReason;

/// Registry of active scheme handlers.
///
/// Lookup is two-phase: an exact match on `namespace:reference:scheme`
/// first, then a wildcard fallback on `namespace:*:scheme`, so one handler
/// can serve an entire chain namespace.
///
/// A request for an unregistered combination is answered with an ordinary
/// `unsupported_scheme` / `unsupported_network` response rather than an
/// error; missing handlers are a routine condition, not a fault.
#[derive(Default)]
pub struct SchemeRegistry(HashMap<SchemeSlug, Box<dyn Facilitator>>);

impl Debug for SchemeRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let slugs: Vec<String> = self.0.keys().map(ToString::to_string).collect();
        f.debug_tuple("SchemeRegistry").field(&slugs).finish()
    }
}

impl SchemeRegistry {
    /// Creates an empty scheme registry.
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Registers a handler for an exact chain+scheme combination.
    ///
    /// Registering the same combination twice replaces the earlier handler.
    pub fn register(
        &mut self,
        chain_id: ChainId,
        scheme: impl Into<String>,
        handler: Box<dyn Facilitator>,
    ) {
        self.0.insert(SchemeSlug::new(chain_id, scheme.into()), handler);
    }

    /// Registers a handler for an entire namespace.
    ///
    /// The handler matches any chain within the namespace when no exact
    /// chain registration exists.
    pub fn register_for_namespace(
        &mut self,
        namespace: impl Into<String>,
        scheme: impl Into<String>,
        handler: Box<dyn Facilitator>,
    ) {
        let slug = SchemeSlug::new(ChainIdPattern::wildcard(namespace), scheme.into());
        self.0.insert(slug, handler);
    }

    /// Gets a handler by its slug.
    ///
    /// An exact key wins; otherwise any registered pattern covering the
    /// slug's chain (the namespace wildcard) serves it.
    #[must_use]
    pub fn by_slug(&self, slug: &SchemeSlug) -> Option<&dyn Facilitator> {
        if let Some(handler) = self.0.get(slug) {
            return Some(&**handler);
        }
        let ChainIdPattern::Exact(chain_id) = &slug.chain else {
            return None;
        };
        self.0
            .iter()
            .find(|(key, _)| key.name == slug.name && key.matches(chain_id))
            .map(|(_, handler)| &**handler)
    }

    /// Returns an iterator over all registered handlers.
    pub fn values(&self) -> impl Iterator<Item = &dyn Facilitator> {
        self.0.values().map(|v| &**v)
    }

    /// Resolves the handler for a request, or the reason no handler exists.
    ///
    /// A scheme name no registration carries at all is `unsupported_scheme`;
    /// a known scheme on an unregistered network is `unsupported_network`.
    fn route(
        &self,
        requirements: &proto::PaymentRequirements,
    ) -> Result<&dyn Facilitator, ErrorReason> {
        let slug = SchemeSlug::new(requirements.network.clone(), requirements.scheme.clone());
        if let Some(handler) = self.by_slug(&slug) {
            return Ok(handler);
        }
        if self.0.keys().any(|k| k.name == requirements.scheme) {
            Err(ErrorReason::UnsupportedNetwork)
        } else {
            Err(ErrorReason::UnsupportedScheme)
        }
    }
}

impl Facilitator for SchemeRegistry {
    fn verify(
        &self,
        request: proto::VerifyRequest,
    ) -> BoxFuture<'_, Result<proto::VerifyResponse, FacilitatorError>> {
        Box::pin(async move {
            match self.route(&request.payment_requirements) {
                Ok(handler) => {
                    tracing::debug!(
                        scheme = %request.payment_requirements.scheme,
                        network = %request.payment_requirements.network,
                        "dispatching verify"
                    );
                    handler.verify(request).await
                }
                Err(reason) => {
                    tracing::debug!(
                        scheme = %request.payment_requirements.scheme,
                        network = %request.payment_requirements.network,
                        reason = reason.as_str(),
                        "no handler for verify request"
                    );
                    Ok(proto::VerifyResponse::invalid(reason.as_str()))
                }
            }
        })
    }

    fn settle(
        &self,
        request: proto::SettleRequest,
    ) -> BoxFuture<'_, Result<proto::SettleResponse, FacilitatorError>> {
        Box::pin(async move {
            match self.route(&request.payment_requirements) {
                Ok(handler) => {
                    tracing::debug!(
                        scheme = %request.payment_requirements.scheme,
                        network = %request.payment_requirements.network,
                        "dispatching settle"
                    );
                    handler.settle(request).await
                }
                Err(reason) => {
                    tracing::debug!(
                        scheme = %request.payment_requirements.scheme,
                        network = %request.payment_requirements.network,
                        reason = reason.as_str(),
                        "no handler for settle request"
                    );
                    Ok(proto::SettleResponse::error(
                        reason.as_str(),
                        request.payment_requirements.network.to_string(),
                    ))
                }
            }
        })
    }

    fn supported(&self) -> BoxFuture<'_, Result<proto::SupportedResponse, FacilitatorError>> {
        Box::pin(async move {
            let mut kinds = Vec::new();
            for handler in self.values() {
                let mut response = handler.supported().await?;
                kinds.append(&mut response.kinds);
            }
            kinds.sort_by(|a, b| {
                (a.network.as_str(), a.scheme.as_str()).cmp(&(b.network.as_str(), b.scheme.as_str()))
            });
            Ok(proto::SupportedResponse { kinds })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{PaymentPayload, PaymentRequirements, VerifyRequest, VerifyResponse};

    struct StubHandler {
        network: String,
    }

    impl Facilitator for StubHandler {
        fn verify(
            &self,
            _request: proto::VerifyRequest,
        ) -> BoxFuture<'_, Result<proto::VerifyResponse, FacilitatorError>> {
            Box::pin(async { Ok(VerifyResponse::valid("0.0.9001")) })
        }

        fn settle(
            &self,
            _request: proto::SettleRequest,
        ) -> BoxFuture<'_, Result<proto::SettleResponse, FacilitatorError>> {
            let network = self.network.clone();
            Box::pin(async move {
                Ok(proto::SettleResponse::Success {
                    payer: Some("0.0.9001".into()),
                    transaction: "txn".into(),
                    network,
                })
            })
        }

        fn supported(&self) -> BoxFuture<'_, Result<proto::SupportedResponse, FacilitatorError>> {
            let network = self.network.clone();
            Box::pin(async move {
                Ok(proto::SupportedResponse {
                    kinds: vec![proto::SupportedPaymentKind {
                        x402_version: 2,
                        scheme: "exact".into(),
                        network,
                        extra: None,
                    }],
                })
            })
        }
    }

    fn request_for(network: ChainId, scheme: &str) -> VerifyRequest {
        let requirements = PaymentRequirements {
            scheme: scheme.into(),
            network,
            asset: "0.0.6001".into(),
            amount: "1000".into(),
            pay_to: "0.0.7001".into(),
            max_timeout_seconds: 300,
            extra: serde_json::json!({}),
        };
        VerifyRequest {
            payment_payload: PaymentPayload {
                x402_version: proto::V2,
                payload: serde_json::json!({}),
                accepted: requirements.clone(),
                resource: None,
            },
            payment_requirements: requirements,
        }
    }

    fn registry_with_hedera_testnet() -> SchemeRegistry {
        let mut registry = SchemeRegistry::new();
        registry.register(
            ChainId::new("hedera", "testnet"),
            "exact",
            Box::new(StubHandler {
                network: "hedera:testnet".into(),
            }),
        );
        registry
    }

    #[tokio::test]
    async fn dispatches_to_exact_match() {
        let registry = registry_with_hedera_testnet();
        let response = registry
            .verify(request_for(ChainId::new("hedera", "testnet"), "exact"))
            .await
            .unwrap();
        assert!(response.is_valid());
    }

    #[tokio::test]
    async fn unknown_scheme_is_unsupported_scheme() {
        let registry = registry_with_hedera_testnet();
        let response = registry
            .verify(request_for(ChainId::new("hedera", "testnet"), "upto"))
            .await
            .unwrap();
        assert_eq!(response.invalid_reason(), Some("unsupported_scheme"));
    }

    #[tokio::test]
    async fn known_scheme_on_unknown_network_is_unsupported_network() {
        let registry = registry_with_hedera_testnet();
        let response = registry
            .verify(request_for(ChainId::new("hedera", "mainnet"), "exact"))
            .await
            .unwrap();
        assert_eq!(response.invalid_reason(), Some("unsupported_network"));
    }

    #[tokio::test]
    async fn wildcard_serves_whole_namespace() {
        let mut registry = SchemeRegistry::new();
        registry.register_for_namespace(
            "ton",
            "exact",
            Box::new(StubHandler {
                network: "ton:*".into(),
            }),
        );
        let response = registry
            .verify(request_for(ChainId::new("ton", "mainnet"), "exact"))
            .await
            .unwrap();
        assert!(response.is_valid());
    }

    #[tokio::test]
    async fn exact_registration_wins_over_namespace_wildcard() {
        let mut registry = SchemeRegistry::new();
        registry.register_for_namespace(
            "ton",
            "exact",
            Box::new(StubHandler {
                network: "ton:*".into(),
            }),
        );
        registry.register(
            ChainId::new("ton", "mainnet"),
            "exact",
            Box::new(StubHandler {
                network: "ton:mainnet".into(),
            }),
        );
        let response = registry
            .settle(request_for(ChainId::new("ton", "mainnet"), "exact").into())
            .await
            .unwrap();
        match response {
            proto::SettleResponse::Success { network, .. } => assert_eq!(network, "ton:mainnet"),
            proto::SettleResponse::Error { .. } => panic!("expected the exact handler"),
        }
    }

    #[tokio::test]
    async fn settle_routing_failure_names_the_network() {
        let registry = SchemeRegistry::new();
        let response = registry
            .settle(request_for(ChainId::new("ton", "mainnet"), "exact").into())
            .await
            .unwrap();
        match response {
            proto::SettleResponse::Error { reason, network, .. } => {
                assert_eq!(reason, "unsupported_scheme");
                assert_eq!(network, "ton:mainnet");
            }
            proto::SettleResponse::Success { .. } => panic!("expected routing failure"),
        }
    }

    #[tokio::test]
    async fn supported_aggregates_all_handlers() {
        let mut registry = registry_with_hedera_testnet();
        registry.register(
            ChainId::new("ton", "mainnet"),
            "exact",
            Box::new(StubHandler {
                network: "ton:mainnet".into(),
            }),
        );
        let supported = registry.supported().await.unwrap();
        assert_eq!(supported.kinds.len(), 2);
        assert_eq!(supported.kinds[0].network, "hedera:testnet");
        assert_eq!(supported.kinds[1].network, "ton:mainnet");
    }
}
