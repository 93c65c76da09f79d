use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use tracing::debug;

use shared_models::error::AppError;
use sync_cell::ClinicContext;

// Middleware for routes that need a logged-in desk user
pub async fn require_session(
    State(ctx): State<Arc<ClinicContext>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = ctx
        .current_user()
        .ok_or_else(|| AppError::Auth("Not logged in".to_string()))?;

    debug!("{} {} as {}", request.method(), request.uri(), user.username);

    // Add user to request extensions
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        http::StatusCode,
        middleware,
        routing::get,
        Extension, Router,
    };
    use shared_models::auth::SessionUser;
    use tower::ServiceExt;

    use super::*;
    use crate::test_utils::{TestClinic, TestUser};

    fn whoami_router(ctx: Arc<ClinicContext>) -> Router {
        Router::new()
            .route("/", get(|Extension(user): Extension<SessionUser>| async move { user.username }))
            .layer(middleware::from_fn_with_state(ctx.clone(), require_session))
            .with_state(ctx)
    }

    #[tokio::test]
    async fn test_session_user_reaches_handler() {
        let clinic = TestClinic::new().await;
        let router = whoami_router(clinic.ctx.clone());

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        clinic.login_as(&TestUser::doctor(4));
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"doctor4");
    }
}
