//! Loopback listener that receives the login redirect.
//!
//! The API finishes the provider login by redirecting the browser to
//! `http://localhost:<port>/?access_token=...`. This listener plays the part of
//! that page: it captures the callback URL and hands it to the token store.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::core::errors::{ClientError, ClientResult};
use crate::session::token_store::TOKEN_PARAM;

const LOGIN_COMPLETE_PAGE: &str = "<!doctype html><html><body>\
<h2>Login complete</h2><p>You can close this tab and return to the terminal.</p>\
</body></html>";

struct CallbackState {
    origin: String,
    sender: Mutex<Option<oneshot::Sender<Url>>>,
}

/// Build the callback router. The first request carrying a token resolves `sender`.
fn callback_router(origin: String, sender: oneshot::Sender<Url>) -> Router {
    let state = Arc::new(CallbackState {
        origin,
        sender: Mutex::new(Some(sender)),
    });

    Router::new()
        .route("/", get(receive_redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn receive_redirect(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    if params.get(TOKEN_PARAM).is_none_or(String::is_empty) {
        return (StatusCode::BAD_REQUEST, "missing access_token").into_response();
    }

    let full = format!("{}{}", state.origin, uri);
    let Ok(location) = Url::parse(&full) else {
        return (StatusCode::BAD_REQUEST, "malformed callback").into_response();
    };

    let sender = state
        .sender
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(sender) = sender {
        // Receiver gone means the wait already timed out.
        let _ = sender.send(location);
    }

    Html(LOGIN_COMPLETE_PAGE).into_response()
}

/// Listen on `127.0.0.1:port` until a login redirect arrives or `timeout` elapses.
///
/// Returns the full callback URL, credential included; pass it to
/// [`crate::session::TokenStore::accept_redirect`].
///
/// # Errors
/// Returns an error if the port cannot be bound, the wait times out, or the
/// listener stops early.
pub async fn wait_for_redirect(port: u16, timeout: Duration) -> ClientResult<Url> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let origin = format!("http://localhost:{port}");
    tracing::info!("waiting for login redirect on http://{addr}");

    let (url_tx, url_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = callback_router(origin, url_tx);

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let outcome = tokio::time::timeout(timeout, url_rx).await;
    let _ = stop_tx.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!("login redirect listener error: {err}"),
        Err(err) => tracing::warn!("login redirect listener task failed: {err}"),
    }

    match outcome {
        Ok(Ok(url)) => Ok(url),
        Ok(Err(_)) => Err(ClientError::RedirectListener(
            "listener dropped before a token arrived".to_string(),
        )),
        Err(_) => Err(ClientError::RedirectTimeout),
    }
}
