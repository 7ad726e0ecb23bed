//! Accounts: registration, login, identity resolution and user management.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clubs::detail;
use super::policy::{self, Action};
use super::ClubEngine;
use crate::auth::{password, Caller};
use crate::db::{ClubRole, GlobalRole, UnitOfWork, User, UserClub, UserView};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<GlobalRole>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthToken {
    pub token: String,
    pub expires_in: i64,
    pub user: UserView,
}

impl Registration {
    fn validate(&self) -> EngineResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("username", &self.username),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::invalid(format!("{field} is required")));
            }
        }
        if !self.email.contains('@') {
            return Err(EngineError::invalid("email is invalid"));
        }
        Ok(())
    }
}

fn hashing_failed(e: password::PasswordError) -> EngineError {
    log::error!("{e}");
    EngineError::Internal("credential could not be processed".into())
}

/// Run an argon2 hash or verify on the blocking pool.
async fn off_worker<T, F>(work: F) -> EngineResult<T>
where
    F: FnOnce() -> Result<T, password::PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| {
            log::error!("password task failed: {e}");
            EngineError::Internal("credential could not be processed".into())
        })?
        .map_err(hashing_failed)
}

async fn load_user(uow: &mut dyn UnitOfWork, user_id: Uuid) -> EngineResult<User> {
    uow.user_by_id(user_id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("user {user_id} not found")))
}

impl ClubEngine {
    pub async fn register(&self, reg: Registration) -> EngineResult<UserView> {
        reg.validate()?;
        let role = reg.role.unwrap_or(GlobalRole::User);
        if role == GlobalRole::Admin && !self.rules.allow_admin_signup {
            return Err(EngineError::unauthorized(
                "administrator accounts cannot be self-registered",
            ));
        }

        let plain = reg.password.clone();
        let password_hash = off_worker(move || password::hash_password(&plain)).await?;
        let user = User {
            id: Uuid::new_v4(),
            username: reg.username.trim().to_owned(),
            password_hash,
            name: reg.name,
            email: reg.email,
            role,
            created_at: Utc::now(),
        };

        let user = &user;
        self.atomically("register", move || self.register_once(user))
            .await?;

        log::info!("registered {} ({})", user.username, user.role);
        Ok(UserView::from(user))
    }

    async fn register_once(&self, user: &User) -> EngineResult<()> {
        let mut uow = self.store.begin().await?;
        uow.insert_user(user).await.map_err(|e| match EngineError::from(e) {
            EngineError::Conflict(_) => EngineError::conflict("username already exists"),
            other => other,
        })?;
        uow.commit().await?;
        Ok(())
    }

    /// Check credentials and issue an access token. Unknown user and wrong
    /// password are indistinguishable to the caller.
    pub async fn login(&self, username: &str, plain: &str) -> EngineResult<AuthToken> {
        let mut uow = self.store.begin().await?;
        let user = uow.user_by_username(username.trim()).await?;
        drop(uow);

        let verified = match &user {
            Some(u) => {
                let (plain, hash) = (plain.to_owned(), u.password_hash.clone());
                off_worker(move || password::verify_password(&plain, &hash)).await?
            }
            None => false,
        };
        let user = match user {
            Some(u) if verified => u,
            _ => {
                log::warn!("failed login for {username}");
                return Err(EngineError::unauthenticated("invalid credentials"));
            }
        };

        let token = self.tokens.issue(&user.username, user.role).map_err(|e| {
            log::error!("token issue failed: {e}");
            EngineError::unauthenticated("could not issue token")
        })?;

        Ok(AuthToken {
            token,
            expires_in: self.tokens.ttl_secs(),
            user: UserView::from(&user),
        })
    }

    /// Resolve a bearer token to a caller. The stored user, not the token,
    /// is authoritative for the global role.
    pub async fn resolve_caller(&self, token: &str) -> EngineResult<Caller> {
        let claims = self
            .tokens
            .verify(token)
            .map_err(|e| EngineError::unauthenticated(e.to_string()))?;

        let mut uow = self.store.begin().await?;
        let user = uow
            .user_by_username(&claims.sub)
            .await?
            .ok_or_else(|| EngineError::unauthenticated("account no longer exists"))?;
        Ok(Caller::from(&user))
    }

    /// Directory of every other user.
    pub async fn list_users(&self, caller: &Caller) -> EngineResult<Vec<UserView>> {
        let mut uow = self.store.begin().await?;
        let users = uow.list_users().await?;
        Ok(users
            .iter()
            .filter(|u| u.id != caller.user_id)
            .map(UserView::from)
            .collect())
    }

    pub async fn get_user(&self, user_id: Uuid) -> EngineResult<UserView> {
        let mut uow = self.store.begin().await?;
        let user = load_user(&mut *uow, user_id).await?;
        Ok(UserView::from(&user))
    }

    /// Clubs `user_id` belongs to, with their role in each.
    pub async fn user_clubs(&self, user_id: Uuid) -> EngineResult<Vec<UserClub>> {
        let mut uow = self.store.begin().await?;
        load_user(&mut *uow, user_id).await?;

        let memberships = uow.memberships_of_user(user_id).await?;
        let mut out = Vec::with_capacity(memberships.len());
        for m in memberships {
            let Some(club) = uow.club_by_id(m.club_id).await? else {
                continue;
            };
            let d = detail(&mut *uow, club).await?;
            out.push(UserClub {
                club: d.club,
                club_role: m.role,
                member_count: d.member_count,
            });
        }
        Ok(out)
    }

    /// Every account, for platform administrators.
    pub async fn admin_list_users(&self, caller: &Caller) -> EngineResult<Vec<UserView>> {
        if !policy::is_allowed(Action::ManageUsers, caller.role, None) {
            return Err(EngineError::unauthorized(
                "only system administrators can access this resource",
            ));
        }
        let mut uow = self.store.begin().await?;
        let users = uow.list_users().await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    /// Delete an account. Global admins only, never their own.
    ///
    /// The user's memberships go with them. Any club where they were the
    /// only admin gets its longest-standing remaining member promoted in
    /// the same unit of work, so no club is left without an admin.
    pub async fn admin_delete_user(&self, target: Uuid, caller: &Caller) -> EngineResult<()> {
        if !policy::is_allowed(Action::ManageUsers, caller.role, None) {
            return Err(EngineError::unauthorized(
                "only system administrators can delete users",
            ));
        }
        if target == caller.user_id {
            return Err(EngineError::conflict("cannot delete your own account"));
        }

        self.atomically("admin_delete_user", move || {
            self.admin_delete_user_once(target)
        })
        .await?;
        log::info!("user {target} deleted by {}", caller.username);
        Ok(())
    }

    async fn admin_delete_user_once(&self, target: Uuid) -> EngineResult<()> {
        let mut uow = self.store.begin().await?;
        load_user(&mut *uow, target).await?;

        for m in uow.memberships_of_user(target).await? {
            if m.role == ClubRole::Admin && uow.count_admins(m.club_id).await? == 1 {
                let successor = uow
                    .members_of_club(m.club_id)
                    .await?
                    .into_iter()
                    .find(|row| row.user_id != target);
                if let Some(row) = successor {
                    if let Some(next) = uow.membership(m.club_id, row.user_id).await? {
                        uow.set_club_role(next.id, ClubRole::Admin).await?;
                        log::info!("{} promoted to admin of club {}", row.username, m.club_id);
                    }
                }
            }
            uow.delete_membership(m.id).await?;
        }

        uow.delete_user(target).await?;
        uow.commit().await?;
        Ok(())
    }
}
