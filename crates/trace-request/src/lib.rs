//! Request ids and per-request tracing spans.

use std::time::Instant;

use rocket::{
    Data, Response,
    fairing::{Fairing, Info, Kind},
    http::Status,
    request::{self, FromRequest, Request},
};
use sentry::configure_scope;
use tracing::{Span, info};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// A request's ID: the one the client sent us, or a fresh one.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl RequestId {
    fn of_request(request: &Request<'_>) -> RequestId {
        // `local_cache` runs the closure at most once per request, so both
        // fairing hooks see the same ID.
        request
            .local_cache(|| {
                RequestId(
                    request
                        .headers()
                        .get_one(REQUEST_ID_HEADER)
                        .filter(|id| !id.is_empty() && id.len() <= 128)
                        .map(ToString::to_string)
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                )
            })
            .clone()
    }
}

/// The span opened for the current request by [`RequestTracing`].
///
/// Handlers use it to instrument work they hand off to the database pool.
pub struct TracingSpan(pub Span);

struct RequestStart {
    span: Option<Span>,
    at: Instant,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TracingSpan {
    type Error = ();

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, ()> {
        match request.local_cache(|| None::<RequestStart>) {
            Some(RequestStart {
                span: Some(span), ..
            }) => request::Outcome::Success(TracingSpan(span.clone())),
            _ => request::Outcome::Error((Status::InternalServerError, ())),
        }
    }
}

/// Opens a span for every request, tags the Sentry scope with the request
/// ID and echoes the ID back in the response headers.
pub struct RequestTracing;

#[rocket::async_trait]
impl Fairing for RequestTracing {
    fn info(&self) -> Info {
        Info {
            name: "Request tracing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let request_id = RequestId::of_request(req);
        let user_agent = req.headers().get_one("User-Agent").unwrap_or("");

        let span = tracing::info_span!(
            "request",
            http.method = %req.method(),
            http.uri = %req.uri().path(),
            http.user_agent = %user_agent,
            http.status_code = tracing::field::Empty,
            http.request_id = %request_id,
        );
        span.in_scope(|| {
            info!("received request");
            configure_scope(|scope| {
                scope.set_tag("request_id", &request_id);
            });
        });

        req.local_cache(|| {
            Some(RequestStart {
                span: Some(span),
                at: Instant::now(),
            })
        });
    }

    async fn on_response<'r>(
        &self,
        req: &'r Request<'_>,
        res: &mut Response<'r>,
    ) {
        let request_id = RequestId::of_request(req);

        if let Some(RequestStart { span: Some(span), at }) =
            req.local_cache(|| None::<RequestStart>)
        {
            span.record("http.status_code", res.status().code);
            span.in_scope(|| {
                info!(
                    elapsed_ms = at.elapsed().as_millis() as u64,
                    "returning {} for request {}",
                    res.status(),
                    request_id
                );
            });
        }

        res.set_raw_header(REQUEST_ID_HEADER, request_id.0);
    }
}
