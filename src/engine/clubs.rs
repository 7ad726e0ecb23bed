//! Club registry operations: create, read, patch, delete.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::policy::{self, Action};
use super::ClubEngine;
use crate::auth::Caller;
use crate::db::{Club, ClubDetail, ClubRole, Membership, UnitOfWork};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Deserialize)]
pub struct NewClub {
    pub name: String,
    pub description: String,
    pub category: String,
    pub free: bool,
    #[serde(default)]
    pub price_cents: Option<i64>,
}

/// Partial update: `None` leaves the field as it is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClubPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub free: Option<bool>,
    pub price_cents: Option<i64>,
}

fn require_text(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::invalid(format!("{field} is required")));
    }
    Ok(())
}

/// Free clubs carry no price; paid clubs carry a positive one.
fn check_pricing(free: bool, price_cents: Option<i64>) -> EngineResult<()> {
    match (free, price_cents) {
        (true, Some(_)) => Err(EngineError::invalid("a free club cannot have a price")),
        (false, None) => Err(EngineError::invalid("a paid club needs a price")),
        (false, Some(p)) if p <= 0 => Err(EngineError::invalid("price must be positive")),
        _ => Ok(()),
    }
}

impl ClubPatch {
    fn apply(self, club: &mut Club, strict_pricing: bool) -> EngineResult<()> {
        if let Some(name) = self.name {
            require_text("name", &name)?;
            club.name = name;
        }
        if let Some(description) = self.description {
            require_text("description", &description)?;
            club.description = description;
        }
        if let Some(category) = self.category {
            require_text("category", &category)?;
            club.category = category;
        }
        if let Some(free) = self.free {
            club.free = free;
            // switching to free drops a stale price unless one was sent
            if strict_pricing && free && self.price_cents.is_none() {
                club.price_cents = None;
            }
        }
        if let Some(price) = self.price_cents {
            club.price_cents = Some(price);
        }
        if strict_pricing {
            check_pricing(club.free, club.price_cents)?;
        }
        Ok(())
    }
}

pub(super) async fn detail(uow: &mut dyn UnitOfWork, club: Club) -> EngineResult<ClubDetail> {
    let member_count = uow.count_members(club.id).await?;
    Ok(ClubDetail { club, member_count })
}

pub(super) async fn load_club(uow: &mut dyn UnitOfWork, club_id: Uuid) -> EngineResult<Club> {
    uow.club_by_id(club_id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("club {club_id} not found")))
}

impl ClubEngine {
    /// Create a club with `caller` enrolled as its first admin. Both rows
    /// land in the same unit of work.
    pub async fn create_club(&self, caller: &Caller, new: NewClub) -> EngineResult<ClubDetail> {
        require_text("name", &new.name)?;
        require_text("description", &new.description)?;
        require_text("category", &new.category)?;
        if self.rules.strict_pricing {
            check_pricing(new.free, new.price_cents)?;
        }

        let new = &new;
        let out = self
            .atomically("create_club", move || self.create_club_once(caller, new))
            .await?;
        log::info!("club {} created by {}", out.club.id, caller.username);
        Ok(out)
    }

    async fn create_club_once(&self, caller: &Caller, new: &NewClub) -> EngineResult<ClubDetail> {
        let mut uow = self.store.begin().await?;
        let now = Utc::now();
        let club = Club {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            description: new.description.clone(),
            category: new.category.clone(),
            free: new.free,
            price_cents: new.price_cents,
            creator_id: Some(caller.user_id),
            created_at: now,
        };
        uow.save_club(&club).await?;
        uow.insert_membership(&Membership {
            id: Uuid::new_v4(),
            user_id: caller.user_id,
            club_id: club.id,
            role: ClubRole::Admin,
            joined_at: now,
        })
        .await?;
        let out = detail(&mut *uow, club).await?;
        uow.commit().await?;
        Ok(out)
    }

    pub async fn list_clubs(&self) -> EngineResult<Vec<ClubDetail>> {
        let mut uow = self.store.begin().await?;
        let clubs = uow.list_clubs().await?;
        let mut out = Vec::with_capacity(clubs.len());
        for club in clubs {
            out.push(detail(&mut *uow, club).await?);
        }
        Ok(out)
    }

    pub async fn get_club(&self, club_id: Uuid) -> EngineResult<ClubDetail> {
        let mut uow = self.store.begin().await?;
        let club = load_club(&mut *uow, club_id).await?;
        detail(&mut *uow, club).await
    }

    /// Patch a club. Requires an admin membership in that club; the global
    /// role plays no part.
    pub async fn update_club(
        &self,
        club_id: Uuid,
        patch: ClubPatch,
        caller: &Caller,
    ) -> EngineResult<ClubDetail> {
        let patch = &patch;
        let out = self
            .atomically("update_club", move || {
                self.update_club_once(club_id, patch, caller)
            })
            .await?;
        log::info!("club {club_id} updated by {}", caller.username);
        Ok(out)
    }

    async fn update_club_once(
        &self,
        club_id: Uuid,
        patch: &ClubPatch,
        caller: &Caller,
    ) -> EngineResult<ClubDetail> {
        let mut uow = self.store.begin().await?;
        let mut club = load_club(&mut *uow, club_id).await?;

        let role = uow.membership(club_id, caller.user_id).await?.map(|m| m.role);
        if !policy::is_allowed(Action::UpdateClub, caller.role, role) {
            log::warn!(
                "{} tried to update club {club_id} without admin role",
                caller.username
            );
            return Err(EngineError::unauthorized(
                "only club admins can update club details",
            ));
        }

        patch.clone().apply(&mut club, self.rules.strict_pricing)?;
        uow.save_club(&club).await?;
        let out = detail(&mut *uow, club).await?;
        uow.commit().await?;
        Ok(out)
    }

    /// Delete a club and every membership in it. Global admins only; this
    /// also backs the admin force-delete endpoint.
    ///
    /// The role is checked before the lookup so non-admins cannot tell
    /// existing clubs from missing ones.
    pub async fn delete_club(&self, club_id: Uuid, caller: &Caller) -> EngineResult<()> {
        if !policy::is_allowed(Action::DeleteClub, caller.role, None) {
            log::warn!("{} tried to delete club {club_id}", caller.username);
            return Err(EngineError::unauthorized(
                "only system administrators can delete clubs",
            ));
        }

        self.atomically("delete_club", move || self.delete_club_once(club_id))
            .await?;
        log::info!("club {club_id} deleted by {}", caller.username);
        Ok(())
    }

    async fn delete_club_once(&self, club_id: Uuid) -> EngineResult<()> {
        let mut uow = self.store.begin().await?;
        load_club(&mut *uow, club_id).await?;
        uow.delete_club(club_id).await?;
        uow.commit().await?;
        Ok(())
    }
}
