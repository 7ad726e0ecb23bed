//! Simple liveness / readiness probe

use actix_web::{get, web, HttpResponse, Responder};

use crate::engine::ClubEngine;

#[get("/healthz")]
pub async fn healthz(engine: web::Data<ClubEngine>) -> impl Responder {
    if let Err(e) = engine.ping().await {
        log::warn!("health check failed: {e}");
        return HttpResponse::ServiceUnavailable().body("store");
    }
    HttpResponse::Ok().body("ok")
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz);
}
