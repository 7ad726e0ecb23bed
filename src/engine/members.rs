//! Membership ledger operations: join, leave, promote, remove, list.
//!
//! Invariant: a club with at least one membership has at least one admin.
//! Only leave and remove can shrink the admin set, and both check it against
//! the admin rows read in their own unit of work.

use chrono::Utc;
use uuid::Uuid;

use super::clubs::load_club;
use super::policy::{self, Action};
use super::ClubEngine;
use crate::auth::Caller;
use crate::db::{ClubRole, MemberRow, Membership, UnitOfWork};
use crate::error::{EngineError, EngineResult};

/// Caller must hold an admin membership in `club_id`.
async fn require_club_admin(
    uow: &mut dyn UnitOfWork,
    action: Action,
    club_id: Uuid,
    caller: &Caller,
) -> EngineResult<()> {
    let role = uow.membership(club_id, caller.user_id).await?.map(|m| m.role);
    if policy::is_allowed(action, caller.role, role) {
        return Ok(());
    }
    log::warn!("{} denied {action:?} in club {club_id}", caller.username);
    let verb = match action {
        Action::PromoteMember => "promote",
        _ => "remove",
    };
    Err(EngineError::unauthorized(format!(
        "only club admins can {verb} members"
    )))
}

impl ClubEngine {
    /// Enrol `caller` as a plain member. Paid clubs are expected to have
    /// cleared payment before this is called.
    pub async fn join_club(&self, club_id: Uuid, caller: &Caller) -> EngineResult<Membership> {
        let m = self
            .atomically("join_club", move || self.join_club_once(club_id, caller))
            .await?;
        log::info!("{} joined club {club_id}", caller.username);
        Ok(m)
    }

    async fn join_club_once(&self, club_id: Uuid, caller: &Caller) -> EngineResult<Membership> {
        let mut uow = self.store.begin().await?;
        load_club(&mut *uow, club_id).await?;

        if uow.membership(club_id, caller.user_id).await?.is_some() {
            return Err(EngineError::conflict("already a member of this club"));
        }

        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: caller.user_id,
            club_id,
            role: ClubRole::Member,
            joined_at: Utc::now(),
        };
        uow.insert_membership(&membership).await?;
        uow.commit().await?;
        Ok(membership)
    }

    /// Drop `caller`'s membership unless they are the club's last admin.
    pub async fn leave_club(&self, club_id: Uuid, caller: &Caller) -> EngineResult<()> {
        self.atomically("leave_club", move || self.leave_club_once(club_id, caller))
            .await?;
        log::info!("{} left club {club_id}", caller.username);
        Ok(())
    }

    async fn leave_club_once(&self, club_id: Uuid, caller: &Caller) -> EngineResult<()> {
        let mut uow = self.store.begin().await?;
        let membership = uow
            .membership(club_id, caller.user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("not a member of this club"))?;

        let admins = uow.admins_of_club(club_id).await?;
        if policy::strands_club(&admins, &membership) {
            log::warn!("{} refused: last admin of club {club_id}", caller.username);
            return Err(EngineError::conflict(
                "cannot leave club: you are the last admin; promote another member first or delete the club",
            ));
        }

        uow.delete_membership(membership.id).await?;
        uow.commit().await?;
        Ok(())
    }

    /// Members of a club with their user details, oldest first.
    pub async fn list_members(&self, club_id: Uuid) -> EngineResult<Vec<MemberRow>> {
        let mut uow = self.store.begin().await?;
        load_club(&mut *uow, club_id).await?;
        Ok(uow.members_of_club(club_id).await?)
    }

    /// Make `target` an admin. Promoting an admin is a conflict, not a no-op.
    pub async fn promote_member(
        &self,
        club_id: Uuid,
        target: Uuid,
        caller: &Caller,
    ) -> EngineResult<()> {
        self.atomically("promote_member", move || {
            self.promote_member_once(club_id, target, caller)
        })
        .await?;
        log::info!("{} promoted {target} in club {club_id}", caller.username);
        Ok(())
    }

    async fn promote_member_once(
        &self,
        club_id: Uuid,
        target: Uuid,
        caller: &Caller,
    ) -> EngineResult<()> {
        let mut uow = self.store.begin().await?;
        require_club_admin(&mut *uow, Action::PromoteMember, club_id, caller).await?;

        let membership = uow
            .membership(club_id, target)
            .await?
            .ok_or_else(|| EngineError::not_found("user is not a member of this club"))?;

        if membership.role == ClubRole::Admin {
            return Err(EngineError::conflict("user is already a club admin"));
        }

        uow.set_club_role(membership.id, ClubRole::Admin).await?;
        uow.commit().await?;
        Ok(())
    }

    /// Remove another member. Self-removal is refused outright (use leave),
    /// as is removing the last admin.
    pub async fn remove_member(
        &self,
        club_id: Uuid,
        target: Uuid,
        caller: &Caller,
    ) -> EngineResult<()> {
        self.atomically("remove_member", move || {
            self.remove_member_once(club_id, target, caller)
        })
        .await?;
        log::info!("{} removed {target} from club {club_id}", caller.username);
        Ok(())
    }

    async fn remove_member_once(
        &self,
        club_id: Uuid,
        target: Uuid,
        caller: &Caller,
    ) -> EngineResult<()> {
        if target == caller.user_id {
            return Err(EngineError::conflict(
                "cannot remove yourself; use leave instead",
            ));
        }

        let mut uow = self.store.begin().await?;
        require_club_admin(&mut *uow, Action::RemoveMember, club_id, caller).await?;

        let membership = uow
            .membership(club_id, target)
            .await?
            .ok_or_else(|| EngineError::not_found("user is not a member of this club"))?;

        if membership.role == ClubRole::Admin {
            let admins = uow.admins_of_club(club_id).await?;
            if policy::strands_club(&admins, &membership) {
                return Err(EngineError::conflict(
                    "cannot remove the last admin; promote another member first",
                ));
            }
        }

        uow.delete_membership(membership.id).await?;
        uow.commit().await?;
        Ok(())
    }
}
