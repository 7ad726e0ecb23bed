//! Club management (create / list / info / update / delete / join / leave /
//! members / promote / remove)

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::engine::{ClubEngine, ClubPatch, NewClub};
use crate::error::EngineError;
use crate::http::auth::JwtAuth;

type Reply = Result<HttpResponse, EngineError>;

//////////////////////////////////////////////////
// Handlers
//////////////////////////////////////////////////

/// POST /api/v1/clubs
#[post("/clubs")]
pub async fn create(
    JwtAuth(caller): JwtAuth,
    info: web::Json<NewClub>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    let club = engine.create_club(&caller, info.into_inner()).await?;
    Ok(HttpResponse::Created().json(club))
}

/// GET /api/v1/clubs
#[get("/clubs")]
pub async fn list(_auth: JwtAuth, engine: web::Data<ClubEngine>) -> Reply {
    Ok(HttpResponse::Ok().json(engine.list_clubs().await?))
}

/// GET /api/v1/clubs/{club_id}
#[get("/clubs/{club_id}")]
pub async fn show(
    _auth: JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    Ok(HttpResponse::Ok().json(engine.get_club(path.into_inner()).await?))
}

/// PUT /api/v1/clubs/{club_id}
#[put("/clubs/{club_id}")]
pub async fn update(
    JwtAuth(caller): JwtAuth,
    path: web::Path<Uuid>,
    info: web::Json<ClubPatch>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    let club = engine
        .update_club(path.into_inner(), info.into_inner(), &caller)
        .await?;
    Ok(HttpResponse::Ok().json(club))
}

/// DELETE /api/v1/clubs/{club_id}
#[delete("/clubs/{club_id}")]
pub async fn remove(
    JwtAuth(caller): JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    engine.delete_club(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "club deleted successfully" })))
}

/// POST /api/v1/clubs/{club_id}/join
#[post("/clubs/{club_id}/join")]
pub async fn join(
    JwtAuth(caller): JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    let membership = engine.join_club(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "successfully joined the club",
        "membership": membership,
    })))
}

/// DELETE /api/v1/clubs/{club_id}/leave
#[delete("/clubs/{club_id}/leave")]
pub async fn leave(
    JwtAuth(caller): JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    engine.leave_club(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "successfully left the club" })))
}

/// GET /api/v1/clubs/{club_id}/members
#[get("/clubs/{club_id}/members")]
pub async fn members(
    _auth: JwtAuth,
    path: web::Path<Uuid>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    Ok(HttpResponse::Ok().json(engine.list_members(path.into_inner()).await?))
}

/// PUT /api/v1/clubs/{club_id}/members/{user_id}/promote
#[put("/clubs/{club_id}/members/{user_id}/promote")]
pub async fn promote(
    JwtAuth(caller): JwtAuth,
    path: web::Path<(Uuid, Uuid)>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    let (club_id, user_id) = path.into_inner();
    engine.promote_member(club_id, user_id, &caller).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "member promoted to admin successfully" })))
}

/// DELETE /api/v1/clubs/{club_id}/members/{user_id}
#[delete("/clubs/{club_id}/members/{user_id}")]
pub async fn kick(
    JwtAuth(caller): JwtAuth,
    path: web::Path<(Uuid, Uuid)>,
    engine: web::Data<ClubEngine>,
) -> Reply {
    let (club_id, user_id) = path.into_inner();
    engine.remove_member(club_id, user_id, &caller).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "member removed successfully" })))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create)
        .service(list)
        .service(show)
        .service(update)
        .service(remove)
        .service(join)
        .service(leave)
        .service(members)
        .service(promote)
        .service(kick);
}
