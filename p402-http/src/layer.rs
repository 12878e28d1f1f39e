//! Tower layer enforcing x402 payments on protected routes.
//!
//! [`PaymentGate`] is built once per application around a [`Facilitator`]
//! (usually a [`crate::client::FacilitatorClient`] pointing at a remote
//! facilitator) and stamped onto routes with one or more accepted payment
//! options. Settlement runs after the origin responds successfully unless
//! [`PaymentGate::settle_before_execution`] is enabled.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum_core::extract::Request;
use axum_core::response::Response;
use p402::facilitator::Facilitator;
use p402::proto::PaymentRequirements;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};
use url::Url;

use crate::paygate::{Paygate, ResourceInfoBuilder};

/// Entry point for building payment-enforcing route layers.
pub struct PaymentGate<F> {
    facilitator: F,
    base_url: Option<Url>,
    settle_before_execution: bool,
}

impl<F: Clone> Clone for PaymentGate<F> {
    fn clone(&self) -> Self {
        Self {
            facilitator: self.facilitator.clone(),
            base_url: self.base_url.clone(),
            settle_before_execution: self.settle_before_execution,
        }
    }
}

impl<F> PaymentGate<F> {
    /// Creates a gate around the given facilitator.
    pub fn new(facilitator: F) -> Self {
        Self {
            facilitator,
            base_url: None,
            settle_before_execution: false,
        }
    }

    /// Returns a reference to the underlying facilitator.
    pub const fn facilitator(&self) -> &F {
        &self.facilitator
    }
}

impl<F: Clone> PaymentGate<F> {
    /// Sets the base URL used to derive resource URLs from request paths.
    #[must_use]
    pub fn with_base_url(&self, base_url: Url) -> Self {
        let mut this = self.clone();
        this.base_url = Some(base_url);
        this
    }

    /// Settles the payment before calling the protected service.
    ///
    /// The default is to settle only after the origin responded with a
    /// success status, so a failed request never commits a payment.
    #[must_use]
    pub fn settle_before_execution(&self) -> Self {
        let mut this = self.clone();
        this.settle_before_execution = true;
        this
    }

    /// Builds a layer accepting the given payment option.
    ///
    /// Further options and resource metadata can be added on the returned
    /// builder.
    #[must_use]
    pub fn with_payment_option(&self, requirements: PaymentRequirements) -> PaymentGateLayer<F> {
        PaymentGateLayer {
            facilitator: self.facilitator.clone(),
            accepts: vec![requirements],
            base_url: self.base_url.clone().map(Arc::new),
            resource: ResourceInfoBuilder::default(),
            settle_before_execution: self.settle_before_execution,
        }
    }
}

/// Route-level layer builder: accepted options plus resource metadata.
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct PaymentGateLayer<F> {
    facilitator: F,
    accepts: Vec<PaymentRequirements>,
    base_url: Option<Arc<Url>>,
    resource: ResourceInfoBuilder,
    settle_before_execution: bool,
}

impl<F> PaymentGateLayer<F> {
    /// Adds another accepted payment option, e.g. a second network.
    #[must_use]
    pub fn with_payment_option(mut self, requirements: PaymentRequirements) -> Self {
        self.accepts.push(requirements);
        self
    }

    /// Sets a description of what the payment grants access to.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.resource.description = Some(description.into());
        self
    }

    /// Sets the MIME type of the protected resource.
    #[must_use]
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.resource.mime_type = Some(mime.into());
        self
    }

    /// Sets the full URL of the protected resource explicitly.
    #[must_use]
    pub fn with_resource(mut self, resource: &Url) -> Self {
        self.resource.url = Some(resource.to_string());
        self
    }
}

impl<S, F> Layer<S> for PaymentGateLayer<F>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    F: Facilitator + Clone,
{
    type Service = PaymentGateService<F>;

    fn layer(&self, inner: S) -> Self::Service {
        PaymentGateService {
            facilitator: self.facilitator.clone(),
            accepts: Arc::new(self.accepts.clone()),
            base_url: self.base_url.clone(),
            resource: Arc::new(self.resource.clone()),
            settle_before_execution: self.settle_before_execution,
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// The wrapped service produced by [`PaymentGateLayer`].
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct PaymentGateService<F> {
    facilitator: F,
    accepts: Arc<Vec<PaymentRequirements>>,
    base_url: Option<Arc<Url>>,
    resource: Arc<ResourceInfoBuilder>,
    settle_before_execution: bool,
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl<F> Service<Request> for PaymentGateService<F>
where
    F: Facilitator + Clone + Send + Sync + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let facilitator = self.facilitator.clone();
        let accepts = Arc::clone(&self.accepts);
        let base_url = self.base_url.clone();
        let resource_builder = Arc::clone(&self.resource);
        let settle_before_execution = self.settle_before_execution;
        let inner = self.inner.clone();

        Box::pin(async move {
            let resource = resource_builder.as_resource_info(base_url.as_deref(), &req);
            let gate = {
                let mut gate = Paygate {
                    facilitator,
                    settle_before_execution,
                    accepts,
                    resource,
                };
                gate.enrich_accepts().await;
                gate
            };
            gate.handle_request(inner, req).await
        })
    }
}
