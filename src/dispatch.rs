use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::handlers;
use crate::AppState;

/// The verbs the server maps to filesystem operations.
#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Put,
    Delete,
    Mkcol,
    Other,
}

impl Verb {
    fn from_method(method: &Method) -> Self {
        match method.as_str() {
            "GET" => Verb::Get,
            "PUT" => Verb::Put,
            "DELETE" => Verb::Delete,
            "MKCOL" => Verb::Mkcol,
            _ => Verb::Other,
        }
    }
}

/// Build the application router: every method on every path lands in
/// [`dispatch`].
pub fn app(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Single entry point for every request.
///
/// Resolves the URL onto the filesystem, runs the matching handler and turns
/// its result into wire output. Errors are finalized here and nowhere else:
/// `Forbidden` keeps its 403, anything else becomes a 500 whose body is the
/// error text. An escaping path is rejected before the method is even looked
/// at, so traversal attempts get a 403 regardless of verb.
async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Body,
) -> Response {
    let path = match crate::path::resolve(&state.root_dir, uri.path()) {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };

    debug!("{} {} -> {}", method, uri.path(), path.display());

    let result = match Verb::from_method(&method) {
        Verb::Get => handlers::get(path).await,
        Verb::Put => handlers::put(path, body).await,
        Verb::Delete => handlers::delete(path).await,
        Verb::Mkcol => Ok(handlers::mkcol(path).await),
        Verb::Other => return handlers::not_allowed(&method).into_response(),
    };

    match result {
        Ok(reply) => reply.into_response(),
        Err(err) => err.into_response(),
    }
}
