//! Request identity carried through logs, spans, and error reports.
//!
//! An incoming `x-request-id` is kept (or minted) by the tower-http layers below, and
//! the HTTP surface then scopes a [`RequestContext`] around each handler so code deep
//! in the call chain can tag its log lines without threading ids through arguments.

use std::future::Future;
use std::sync::Arc;

use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{Span, span::Entered};

use crate::init::build_sha;

tokio::task_local! {
    static ACTIVE: RequestContext;
}

/// Identity of the request currently being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

impl RequestContext {
    /// Context for one request; `route` should be the matched template, not the raw path.
    #[must_use]
    pub fn new(request_id: impl Into<Arc<str>>, route: impl Into<Arc<str>>) -> Self {
        Self {
            request_id: request_id.into(),
            route: route.into(),
        }
    }

    /// Value of `x-request-id`, empty when the client sent none and no layer minted one.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Matched route template.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Context of the request running on this task, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        ACTIVE.try_with(Self::clone).ok()
    }

    /// Run `fut` with this context visible through [`RequestContext::current`].
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        ACTIVE.scope(self, fut).await
    }
}

/// Mints a UUID `x-request-id` for requests that arrive without one.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Echoes the request's `x-request-id` onto the response.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Keeps the process-wide `app` span entered; every event logged afterwards carries
/// the service instance and build identifier.
pub struct AppSpan {
    _entered: Entered<'static>,
}

impl AppSpan {
    /// Enter the `app` span for `instance` until the guard drops.
    #[must_use]
    pub fn enter(instance: &str) -> Self {
        // Leaked once per process so the entered guard can outlive this frame.
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "app",
            instance = %instance,
            build_sha = %build_sha()
        )));
        Self {
            _entered: span.enter(),
        }
    }
}
