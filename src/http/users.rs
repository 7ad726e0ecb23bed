//! User directory: list, profile, memberships.

use actix_web::{get, web, HttpResponse};
use uuid::Uuid;

use crate::engine::ClubEngine;
use crate::error::EngineError;
use crate::http::auth::JwtAuth;

/// GET /api/v1/users
#[get("/users")]
pub async fn list(
    JwtAuth(caller): JwtAuth,
    engine: web::Data<ClubEngine>,
) -> Result<HttpResponse, EngineError> {
    Ok(HttpResponse::Ok().json(engine.list_users(&caller).await?))
}

/// GET /api/v1/users/{user_id}
#[get("/users/{user_id}")]
pub async fn profile(
    _auth: JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Result<HttpResponse, EngineError> {
    Ok(HttpResponse::Ok().json(engine.get_user(path.into_inner()).await?))
}

/// GET /api/v1/users/{user_id}/clubs
#[get("/users/{user_id}/clubs")]
pub async fn clubs(
    _auth: JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Result<HttpResponse, EngineError> {
    Ok(HttpResponse::Ok().json(engine.user_clubs(path.into_inner()).await?))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list).service(profile).service(clubs);
}
