use axum::{
    routing::{get, post},
    Extension, Router,
};
use sea_orm::{Database, DatabaseConnection};
use std::net::SocketAddr;
use stillpoint_server::{api, elevenlabs::ElevenLabsClient, migrator, openai::OpenAiClient};

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    stillpoint_server::telemetry::init_telemetry("stillpoint-server");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    // Database Connection
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    stillpoint_server::metrics::init_metrics(&db).await;

    // Adapter clients; either degrades gracefully when unconfigured
    let ai = OpenAiClient::from_env();
    let tts = ElevenLabsClient::from_env();

    let app = app(db, ai, tts, prometheus_layer, metric_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health_check() -> &'static str {
    "OK"
}

fn app(
    db: DatabaseConnection,
    ai: OpenAiClient,
    tts: ElevenLabsClient,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(api::auth::signup))
        .route("/login", post(api::auth::login));

    let protected_routes = Router::new()
        .route("/logout", get(api::auth::logout))
        .route(
            "/check-in",
            get(api::check_in::check_in_status).post(api::check_in::submit_check_in),
        )
        .route("/already-checked-in", get(api::check_in::already_checked_in))
        .route("/practice", get(api::practice::get_practice))
        .route("/practice/:id/audio", get(api::practice::serve_practice_audio))
        .route(
            "/reflect",
            get(api::journal::get_reflection).post(api::journal::submit_reflection),
        )
        .route(
            "/feedback",
            get(api::feedback::get_feedback).post(api::feedback::submit_feedback),
        )
        .route("/thank", get(api::feedback::thank_you))
        .route("/internal/reset_data", post(api::admin::reset_data))
        .route_layer(axum::middleware::from_fn(api::middleware::auth_middleware));

    let frontend_origin =
        std::env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(Extension(db))
        .layer(Extension(ai))
        .layer(Extension(tts))
        .layer(tower_cookies::CookieManagerLayer::new())
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // Span name "METHOD /path" so traces group by route
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    // Fields are Empty here; handlers record them
                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        check_in_id = tracing::field::Empty,
                        practice_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(
                    |_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                        // Quiet; one line per request on response is enough
                    },
                )
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));

                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(
                    frontend_origin
                        .parse::<axum::http::HeaderValue>()
                        .expect("FRONTEND_ORIGIN must be a valid origin"),
                )
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
}
