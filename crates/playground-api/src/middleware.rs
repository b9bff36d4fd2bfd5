//! Identify → Refresh → Require, composed per route group through [`Guard`].

use std::convert::Infallible;

use axum::{
    Router,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use playground_types::api::Claims;

use crate::error::ApiError;
use crate::response::found;
use crate::session::{TOKEN_COOKIE, session_cookie};
use crate::state::AppState;

/// Where unauthenticated page requests are sent.
pub const LOGIN_PAGE: &str = "/login";

/// Attaches the verified claim, if any. Never rejects.
async fn identify(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        match state.sessions.verify(cookie.value()) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(e) => debug!("Ignoring session cookie: {}", e),
        }
    }
    next.run(req).await
}

/// Reissues a claim that is close to expiry.
async fn refresh(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(claims) = req.extensions().get::<Claims>().cloned() else {
        return next.run(req).await;
    };

    match state.sessions.refresh(&claims) {
        Ok(Some((token, renewed))) => {
            debug!("Refreshed session for {}", renewed.username);
            req.extensions_mut().insert(renewed);
            let res = next.run(req).await;
            (CookieJar::new().add(session_cookie(token)), res).into_response()
        }
        Ok(None) => next.run(req).await,
        Err(e) => {
            warn!("Couldn't refresh session for {}: {}", claims.username, e);
            next.run(req).await
        }
    }
}

async fn require_api(req: Request, next: Next) -> Response {
    if req.extensions().get::<Claims>().is_none() {
        return ApiError::Unauthenticated.into_response();
    }
    next.run(req).await
}

async fn require_page(req: Request, next: Next) -> Response {
    if req.extensions().get::<Claims>().is_none() {
        return found(LOGIN_PAGE);
    }
    next.run(req).await
}

/// Named middleware chains. Require always runs after Identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Identify.
    IsLogged,
    /// Identify, Refresh.
    Refresh,
    /// Identify, Refresh, Require with a 401.
    Authorized,
    /// Identify, Refresh, Require with a redirect to the login page.
    AuthorizedPage,
}

impl Guard {
    /// Wraps every route of `routes`. Layers added last run first.
    pub fn apply(self, routes: Router<AppState>, state: &AppState) -> Router<AppState> {
        let routes = match self {
            Guard::Authorized => routes.route_layer(middleware::from_fn(require_api)),
            Guard::AuthorizedPage => routes.route_layer(middleware::from_fn(require_page)),
            Guard::IsLogged | Guard::Refresh => routes,
        };
        let routes = match self {
            Guard::IsLogged => routes,
            _ => routes.route_layer(middleware::from_fn_with_state(state.clone(), refresh)),
        };
        routes.route_layer(middleware::from_fn_with_state(state.clone(), identify))
    }
}

/// The authenticated caller; 401 without one.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

impl CurrentUser {
    pub fn username(&self) -> &str {
        &self.0.username
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// The caller, when known.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Claims>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Claims>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::routing::get;
    use tower::ServiceExt;

    use playground_db::JsonStore;
    use playground_geo::{Coordinates, GeocodeError, Geocoder};

    use crate::session::SessionKeys;
    use crate::state::AppStateInner;

    struct NoGeocoder;

    #[async_trait]
    impl Geocoder for NoGeocoder {
        async fn resolve(&self, _address: &str) -> Result<Coordinates, GeocodeError> {
            Err(GeocodeError::NoMatch)
        }
    }

    fn state() -> AppState {
        Arc::new(AppStateInner {
            store: Arc::new(JsonStore::in_memory()),
            geocoder: Arc::new(NoGeocoder),
            sessions: SessionKeys::new("middleware-test-secret"),
            dev_login: false,
        })
    }

    async fn whoami(MaybeUser(user): MaybeUser) -> String {
        user.map(|c| c.username).unwrap_or_default()
    }

    fn app(guard: Guard, state: &AppState) -> axum::Router {
        guard
            .apply(Router::new().route("/page", get(whoami)), state)
            .with_state(state.clone())
    }

    fn request(cookie: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/page");
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("{TOKEN_COOKIE}={token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn page_guard_redirects_to_login() {
        let state = state();
        let res = app(Guard::AuthorizedPage, &state)
            .oneshot(request(None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()[header::LOCATION], LOGIN_PAGE);

        let (token, _) = state.sessions.issue("alice").unwrap();
        let res = app(Guard::AuthorizedPage, &state)
            .oneshot(request(Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn is_logged_never_refreshes() {
        let state = state();
        let (token, _) = state.sessions.issue_with_ttl("alice", 60).unwrap();
        let res = app(Guard::IsLogged, &state)
            .oneshot(request(Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::SET_COOKIE).is_none());

        let res = app(Guard::Refresh, &state)
            .oneshot(request(Some(&token)))
            .await
            .unwrap();
        assert!(res.headers().get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn invalid_cookie_is_anonymous() {
        let state = state();
        let res = app(Guard::Authorized, &state)
            .oneshot(request(Some("garbage")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app(Guard::Refresh, &state)
            .oneshot(request(Some("garbage")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::SET_COOKIE).is_none());
    }
}
