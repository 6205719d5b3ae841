use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
        .headers_mut()
        .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring malformed CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middlewares::request_id::REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config.cors_origins);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/course-meta", course_meta_routes(app_state.clone()))
        .nest("/courses", course_routes(app_state.clone()))
        .route("/teachers", get(handlers::teachers::list_teachers))
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            middlewares::request_id::request_id_middleware,
        ))
}

/// Every course-meta route requires a valid token; structural edits need
/// admin or teacher, deleting the aggregate needs admin.
fn course_meta_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::course_meta as h;
    use middlewares::auth::{admin_guard_middleware, staff_guard_middleware};

    let staff = || middleware::from_fn(staff_guard_middleware);
    let admin = || middleware::from_fn(admin_guard_middleware);

    Router::new()
        .route(
            "/",
            get(h::list_course_metas).merge(post(h::create_course_meta).layer(staff())),
        )
        .route("/course/{course_id}", get(h::get_course_meta_by_course))
        .route(
            "/{id}",
            get(h::get_course_meta)
                .merge(put(h::update_course_meta).layer(staff()))
                .merge(delete(h::delete_course_meta).layer(admin())),
        )
        .route("/{id}/weeks", post(h::add_week).layer(staff()))
        .route(
            "/{id}/weeks/{week_id}",
            put(h::update_week)
                .delete(h::delete_week)
                .layer(staff()),
        )
        .route(
            "/{id}/weeks/{week_id}/subtopics/{subtopic_id}/complete",
            patch(h::set_subtopic_completed),
        )
        .route(
            "/{id}/weeks/{week_id}/assignments/{assignment_id}/submit",
            patch(h::set_assignment_submitted),
        )
        .route("/{id}/publish", patch(h::publish_course_meta).layer(staff()))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}

/// Reads are public; writes need an admin token.
fn course_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    use handlers::courses as h;

    let admin_only = || {
        tower::ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            ))
            .layer(middleware::from_fn(
                middlewares::auth::admin_guard_middleware,
            ))
    };

    Router::new()
        .route(
            "/",
            get(h::list_courses).merge(post(h::create_course).layer(admin_only())),
        )
        .route(
            "/{id}",
            get(h::get_course).merge(
                put(h::update_course)
                    .delete(h::delete_course)
                    .layer(admin_only()),
            ),
        )
}
