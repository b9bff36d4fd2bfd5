pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod playgrounds;
pub mod response;
pub mod session;
pub mod state;
pub mod submitted;

use axum::{
    Router,
    routing::{get, post, put},
};

pub use error::ApiError;
pub use middleware::{CurrentUser, Guard, MaybeUser};
pub use session::SessionKeys;
pub use state::{AppState, AppStateInner};

/// Every route of the service, state attached. Transport layers (CORS,
/// tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let reads = Router::new()
        .route("/api/playgrounds", get(playgrounds::list_playgrounds))
        .route("/api/playgrounds/", get(playgrounds::list_playgrounds))
        .route("/api/playgrounds/{id}", get(playgrounds::get_playground))
        .route("/api/nearestPlaygrounds", get(playgrounds::nearest_playgrounds))
        .route("/api/submittedPlaygrounds", get(submitted::list_submitted))
        .route("/api/submittedPlaygrounds/{id}", get(submitted::get_submitted))
        .route("/api/playgrounds/{id}/comments", get(comments::list_comments))
        .route(
            "/api/playgrounds/{id}/comments/{comment_id}",
            get(comments::get_comment),
        );

    let writes = Router::new()
        .route("/api/playgrounds", post(playgrounds::promote_playground))
        .route("/api/submittedPlaygrounds", post(submitted::submit_playground))
        .route("/api/submittedPlaygrounds/{id}", post(submitted::delete_submitted))
        .route("/api/playgrounds/{id}/comments", post(comments::add_comment))
        .route(
            "/api/playgrounds/{id}/comments/{comment_id}",
            put(comments::modify_comment).delete(comments::delete_comment),
        );

    let identity = Router::new().route("/api/me", get(auth::whoami));

    let mut public = Router::new()
        .route("/logout", get(auth::logout))
        .route("/health", get(auth::health));
    if state.dev_login {
        public = public.route("/auth/dev/{username}", get(auth::dev_login));
    }

    Router::new()
        .merge(Guard::Refresh.apply(reads, &state))
        .merge(Guard::Authorized.apply(writes, &state))
        .merge(Guard::IsLogged.apply(identity, &state))
        .merge(public)
        .with_state(state)
}
