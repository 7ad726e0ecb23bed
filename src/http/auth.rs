//! Username/password authentication (JWT bearer tokens)

use actix_web::{post, web, HttpResponse};
use serde::Deserialize;

use crate::engine::{ClubEngine, Registration};
use crate::error::EngineError;

//////////////////////////////////////////////////
// Data structs
//////////////////////////////////////////////////

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

//////////////////////////////////////////////////
// ─────────────  JwtAuth extractor  ─────────────
//////////////////////////////////////////////////

pub mod extractor {
    use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
    use futures_util::future::LocalBoxFuture;

    use crate::auth::Caller;
    use crate::engine::ClubEngine;
    use crate::error::EngineError;

    /// Extracts a Bearer token and resolves it to the calling user.
    #[derive(Debug, Clone)]
    pub struct JwtAuth(pub Caller);

    fn bearer(req: &HttpRequest) -> Result<String, EngineError> {
        // Expect:  Authorization: Bearer <JWT>
        let hdr = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| EngineError::unauthenticated("missing Authorization header"))?;

        hdr.strip_prefix("Bearer ")
            .map(str::to_owned)
            .ok_or_else(|| EngineError::unauthenticated("malformed Authorization header"))
    }

    impl FromRequest for JwtAuth {
        type Error = EngineError;
        type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
            let token = bearer(req);
            let engine = req.app_data::<web::Data<ClubEngine>>().cloned();

            Box::pin(async move {
                let token = token?;
                let engine = engine
                    .ok_or_else(|| EngineError::Internal("engine not configured".into()))?;
                engine.resolve_caller(&token).await.map(JwtAuth)
            })
        }
    }
}
pub use extractor::JwtAuth;

//////////////////////////////////////////////////
// POST /api/v1/auth/register
//////////////////////////////////////////////////
#[post("/auth/register")]
pub async fn register(
    info: web::Json<Registration>,
    engine: web::Data<ClubEngine>,
) -> Result<HttpResponse, EngineError> {
    let user = engine.register(info.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "user registered successfully",
        "user": user,
    })))
}

//////////////////////////////////////////////////
// POST /api/v1/auth/login
//////////////////////////////////////////////////
#[post("/auth/login")]
pub async fn login(
    info: web::Json<LoginRequest>,
    engine: web::Data<ClubEngine>,
) -> Result<HttpResponse, EngineError> {
    let token = engine.login(&info.username, &info.password).await?;
    Ok(HttpResponse::Ok().json(token))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login);
}
