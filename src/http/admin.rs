//! Platform administration. Every handler here needs a global ADMIN caller;
//! the engine enforces it.

use actix_web::{delete, get, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::engine::ClubEngine;
use crate::error::EngineError;
use crate::http::auth::JwtAuth;

/// GET /api/v1/admin/users
#[get("/admin/users")]
pub async fn users(
    JwtAuth(caller): JwtAuth,
    engine: web::Data<ClubEngine>,
) -> Result<HttpResponse, EngineError> {
    Ok(HttpResponse::Ok().json(engine.admin_list_users(&caller).await?))
}

/// DELETE /api/v1/admin/users/{user_id}
#[delete("/admin/users/{user_id}")]
pub async fn delete_user(
    JwtAuth(caller): JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Result<HttpResponse, EngineError> {
    engine.admin_delete_user(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "user deleted successfully" })))
}

/// DELETE /api/v1/admin/clubs/{club_id}
#[delete("/admin/clubs/{club_id}")]
pub async fn delete_club(
    JwtAuth(caller): JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Result<HttpResponse, EngineError> {
    engine.delete_club(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "club deleted successfully" })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(users).service(delete_user).service(delete_club);
}
