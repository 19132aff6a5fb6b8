//! HTTP boundary
//!
//! Path dispatch, CORS and 404 handling around the aggregators. Routing
//! mirrors the public contract: `/resources` lists registered sources,
//! `/{name}` dispatches to a registered feed, `/{YYYYMMDD}` and `/` hit the
//! topic aggregator, everything else is 404. Aggregation errors degrade to
//! an empty JSON array; no request fails because one upstream did.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::aggregator::TopicAggregator;
use crate::clock;
use crate::metrics;
use crate::model::NewsItem;
use crate::registry::Registry;

pub struct AppState {
    pub registry: Registry,
    pub topics: TopicAggregator,
}

/// Where a request path resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Root,
    Resources,
    Metrics,
    Named(String),
    Date(String),
    Preflight,
    NotFound,
}

/// Resolves method and path to a route. Registered names win over date
/// keys; anything that is neither never reaches an aggregator.
fn classify(method: &Method, path: &str, registry: &Registry) -> Route {
    if method == Method::OPTIONS {
        return Route::Preflight;
    }
    if method != Method::GET {
        return Route::NotFound;
    }

    match path {
        "/" => Route::Root,
        "/resources" => Route::Resources,
        "/metrics" => Route::Metrics,
        _ => {
            let segment = &path[1..];
            if segment.contains('/') {
                Route::NotFound
            } else if registry.find(segment).is_some() {
                Route::Named(segment.to_string())
            } else if clock::is_valid_date_key(segment) {
                Route::Date(segment.to_string())
            } else {
                Route::NotFound
            }
        }
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let route = classify(req.method(), &path, &state.registry);

    let response = match &route {
        Route::Preflight => preflight_response(),
        Route::Resources => json_response(StatusCode::OK, &state.registry.resources()),
        Route::Metrics => text_response(StatusCode::OK, metrics::gather_metrics()),
        Route::Root => {
            let items = items_or_empty(state.topics.for_today().await, "today");
            json_response(StatusCode::OK, &items)
        }
        Route::Date(date) => {
            let items = items_or_empty(state.topics.for_date(date).await, date);
            json_response(StatusCode::OK, &items)
        }
        Route::Named(name) => match state.registry.find(name) {
            Some(handler) => {
                let items = items_or_empty(handler.news().await, name);
                json_response(StatusCode::OK, &items)
            }
            // Registry is static; classify already resolved the name
            None => not_found(),
        },
        Route::NotFound => not_found(),
    };

    metrics::record_http_request(route_label(&route), response.status().as_u16());
    Ok(response)
}

fn route_label(route: &Route) -> &'static str {
    match route {
        Route::Root => "/",
        Route::Resources => "/resources",
        Route::Metrics => "/metrics",
        Route::Named(_) => "/:source",
        Route::Date(_) => "/:date",
        Route::Preflight => "preflight",
        Route::NotFound => "not_found",
    }
}

fn items_or_empty(result: crate::error::Result<Vec<NewsItem>>, what: &str) -> Vec<NewsItem> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(target = what, error = %e, "Aggregation failed, returning empty result");
            vec![]
        }
    }
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"[]".to_vec());
    base_response(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .expect("static response headers are valid")
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    base_response(status)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(body)))
        .expect("static response headers are valid")
}

fn not_found() -> Response<Full<Bytes>> {
    base_response(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from_static(b"404 Not Found")))
        .expect("static response headers are valid")
}

fn preflight_response() -> Response<Full<Bytes>> {
    base_response(StatusCode::NO_CONTENT)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "*")
        .body(Full::new(Bytes::new()))
        .expect("static response headers are valid")
}

fn base_response(status: StatusCode) -> hyper::http::response::Builder {
    Response::builder()
        .status(status)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
}

/// Runs the HTTP boundary until the shutdown signal arrives.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP boundary listening");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Shutdown signal received, closing listener");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, _) = accepted?;
                let io = TokioIo::new(stream);
                let state = state.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req| handle(req, state.clone()));
                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        error!(error = %e, "Error serving connection");
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http_client::ResilientHttpClient;
    use crate::registry::default_registry;
    use crate::store::MemoryStore;

    fn registry() -> Registry {
        let http = Arc::new(ResilientHttpClient::with_defaults().unwrap());
        let store = Arc::new(MemoryStore::new());
        default_registry(http, store, &Config::default())
    }

    #[test]
    fn test_classify_fixed_routes() {
        let registry = registry();
        assert_eq!(classify(&Method::GET, "/", &registry), Route::Root);
        assert_eq!(classify(&Method::GET, "/resources", &registry), Route::Resources);
        assert_eq!(classify(&Method::GET, "/metrics", &registry), Route::Metrics);
        assert_eq!(classify(&Method::OPTIONS, "/", &registry), Route::Preflight);
    }

    #[test]
    fn test_classify_named_source_wins_over_date() {
        let registry = registry();
        assert_eq!(
            classify(&Method::GET, "/nhk", &registry),
            Route::Named("nhk".to_string())
        );
        assert_eq!(
            classify(&Method::GET, "/20240101", &registry),
            Route::Date("20240101".to_string())
        );
    }

    #[test]
    fn test_classify_rejects_malformed_paths() {
        let registry = registry();
        // Not 8 digits, not a registered name
        assert_eq!(classify(&Method::GET, "/abc", &registry), Route::NotFound);
        assert_eq!(classify(&Method::GET, "/2024010", &registry), Route::NotFound);
        assert_eq!(classify(&Method::GET, "/202401011", &registry), Route::NotFound);
        assert_eq!(classify(&Method::GET, "/a/b", &registry), Route::NotFound);
        assert_eq!(classify(&Method::POST, "/20240101", &registry), Route::NotFound);
    }
}
