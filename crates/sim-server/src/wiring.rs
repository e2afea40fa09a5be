use axum::{
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use runtime::SimHandle;

pub fn build_app(sim: SimHandle) -> Router {
    api::app(sim)
        .route("/", get(index))
        .route("/static/styles.css", get(styles))
        .route("/static/app.js", get(script))
        .route("/health", get(healthcheck))
}

async fn index() -> Html<&'static str> {
    Html(ui::index_html())
}

async fn styles() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        ui::styles_css(),
    )
}

async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        ui::app_js(),
    )
}

async fn healthcheck() -> &'static str {
    "ok"
}
