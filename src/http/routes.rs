use crate::http;
use actix_web::web;

/// Mount every HTTP sub-module under `/api/v1`.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(http::auth::init_routes)
            .configure(http::clubs::init_routes)
            .configure(http::users::init_routes)
            .configure(http::admin::init_routes),
    )
    .configure(http::health::init_routes);
}
