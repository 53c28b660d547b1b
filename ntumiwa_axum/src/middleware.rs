use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderName, HeaderValue, VARY};
use http::{HeaderMap, StatusCode};
use std::sync::Arc;

use ntumiwa::session::{
    form_csrf_token, requires_csrf, submitted_csrf_token, verify_csrf_token,
};
use ntumiwa::{SessionContext, SessionError, SessionManager, authorize};

use crate::error::{auth_error, internal_error};
use crate::session::{AuthUser, CurrentSession};
use crate::state::AppState;

const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");

/// Form bodies larger than this are not inspected for a CSRF token.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Resolves the session for every request, enforces CSRF on state-changing methods and
/// persists the session on the way out.
///
/// Install with `axum::middleware::from_fn_with_state(manager, session_layer)`.
pub async fn session_layer(
    State(manager): State<Arc<SessionManager>>,
    req: Request,
    next: Next,
) -> Response {
    let context = match manager.start(req.headers()).await {
        Ok(context) => context,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start session");
            return internal_error().into_response();
        }
    };

    let (mut parts, body) = req.into_parts();
    parts
        .extensions
        .insert(CurrentSession::new(manager.clone(), context.clone()));

    let mut response = if requires_csrf(&parts.method) {
        match buffer_form_token(&parts.headers, body).await {
            Ok((form_token, body)) => {
                let submitted = submitted_csrf_token(form_token, &parts.headers);
                let verified = verify_csrf_token(&*context.lock().await, submitted.as_deref());

                if verified {
                    next.run(Request::from_parts(parts, body)).await
                } else {
                    tracing::warn!(
                        method = %parts.method,
                        path = %parts.uri.path(),
                        "CSRF token mismatch"
                    );
                    (StatusCode::FORBIDDEN, "CSRF token mismatch").into_response()
                }
            }
            Err(rejection) => rejection.into_response(),
        }
    } else {
        next.run(Request::from_parts(parts, body)).await
    };

    if let Err(e) = finalize(&manager, &context, response.headers_mut()).await {
        tracing::error!(error = %e, "Failed to finalize session");
        return internal_error().into_response();
    }
    response
}

/// Reads the `csrf_token` field of a urlencoded form and hands back an equivalent body.
///
/// A form body that is too large or cannot be read is refused outright, never passed on
/// truncated.
async fn buffer_form_token(
    headers: &HeaderMap,
    body: Body,
) -> Result<(Option<String>, Body), (StatusCode, &'static str)> {
    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return Ok((None, body));
    }

    match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => Ok((form_csrf_token(&bytes), Body::from(bytes))),
        Err(e) => {
            tracing::warn!(error = %e, limit = MAX_FORM_BYTES, "Rejected form body");
            Err((
                StatusCode::PAYLOAD_TOO_LARGE,
                "Form body too large or unreadable",
            ))
        }
    }
}

async fn finalize(
    manager: &SessionManager,
    context: &SessionContext,
    headers: &mut HeaderMap,
) -> Result<(), SessionError> {
    headers.append(VARY, HeaderValue::from_static("Cookie"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let token = context.lock().await.csrf_token()?.to_string();
    match HeaderValue::from_str(&token) {
        Ok(value) => {
            headers.insert(X_CSRF_TOKEN, value);
        }
        Err(_) => tracing::error!("CSRF token is not a valid header value"),
    }

    if let Err(e) = manager.save(context).await {
        tracing::error!(error = %e, "Failed to save session");
    }
    manager.write_cookie_once(context, headers).await?;
    Ok(())
}

/// Lets the request through only for a logged-in user that still exists, and makes
/// [`AuthUser`] available to the handler.
///
/// Must run inside [`session_layer`].
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(session) = req.extensions().get::<CurrentSession>().cloned() else {
        tracing::error!("require_auth used without the session layer");
        return internal_error().into_response();
    };

    match authorize(&state.sessions, session.context(), state.users.as_ref()).await {
        Ok(username) => {
            req.extensions_mut().insert(AuthUser { username });
            next.run(req).await
        }
        Err(e) => auth_error(e).into_response(),
    }
}
