//! In-memory store used by tests and by local runs without `DATABASE_URL`.
//!
//! A unit of work holds the store mutex for its whole lifetime and edits a
//! private copy of the tables; commit swaps the copy in. Units are therefore
//! fully serialized and nobody observes a half-applied operation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Club, ClubRole, MemberRow, Membership, Store, StoreError, UnitOfWork, User};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    clubs: HashMap<Uuid, Club>,
    memberships: HashMap<Uuid, Membership>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

impl MemoryTx {
    fn memberships_where<P>(&self, pred: P) -> Vec<Membership>
    where
        P: Fn(&Membership) -> bool,
    {
        let mut out: Vec<Membership> = self
            .work
            .memberships
            .values()
            .filter(|m| pred(*m))
            .cloned()
            .collect();
        out.sort_by_key(|m| (m.joined_at, m.id));
        out
    }
}

#[async_trait]
impl UnitOfWork for MemoryTx {
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self.work.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username"));
        }
        self.work.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.work.users.get(&id).cloned())
    }

    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .work
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&mut self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.work.users.values().cloned().collect();
        users.sort_by(|a, b| (a.created_at, &a.username).cmp(&(b.created_at, &b.username)));
        Ok(users)
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, StoreError> {
        if self.work.users.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.memberships.retain(|_, m| m.user_id != id);
        for club in self.work.clubs.values_mut() {
            if club.creator_id == Some(id) {
                club.creator_id = None;
            }
        }
        Ok(true)
    }

    async fn club_by_id(&mut self, id: Uuid) -> Result<Option<Club>, StoreError> {
        Ok(self.work.clubs.get(&id).cloned())
    }

    async fn list_clubs(&mut self) -> Result<Vec<Club>, StoreError> {
        let mut clubs: Vec<Club> = self.work.clubs.values().cloned().collect();
        clubs.sort_by_key(|c| (c.created_at, c.id));
        Ok(clubs)
    }

    async fn save_club(&mut self, club: &Club) -> Result<(), StoreError> {
        self.work.clubs.insert(club.id, club.clone());
        Ok(())
    }

    async fn delete_club(&mut self, id: Uuid) -> Result<bool, StoreError> {
        if self.work.clubs.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.memberships.retain(|_, m| m.club_id != id);
        Ok(true)
    }

    async fn membership(
        &mut self,
        club_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self
            .work
            .memberships
            .values()
            .find(|m| m.club_id == club_id && m.user_id == user_id)
            .cloned())
    }

    async fn members_of_club(&mut self, club_id: Uuid) -> Result<Vec<MemberRow>, StoreError> {
        let rows = self
            .memberships_where(|m| m.club_id == club_id)
            .into_iter()
            .filter_map(|m| {
                let user = self.work.users.get(&m.user_id)?;
                Some(MemberRow {
                    user_id: user.id,
                    name: user.name.clone(),
                    username: user.username.clone(),
                    email: user.email.clone(),
                    role: m.role,
                    joined_at: m.joined_at,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn memberships_of_user(&mut self, user_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        Ok(self.memberships_where(|m| m.user_id == user_id))
    }

    async fn count_members(&mut self, club_id: Uuid) -> Result<i64, StoreError> {
        let n = self
            .work
            .memberships
            .values()
            .filter(|m| m.club_id == club_id)
            .count();
        Ok(n as i64)
    }

    async fn count_admins(&mut self, club_id: Uuid) -> Result<i64, StoreError> {
        let n = self
            .work
            .memberships
            .values()
            .filter(|m| m.club_id == club_id && m.role == ClubRole::Admin)
            .count();
        Ok(n as i64)
    }

    async fn admins_of_club(&mut self, club_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        Ok(self.memberships_where(|m| m.club_id == club_id && m.role == ClubRole::Admin))
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError> {
        let taken = self
            .work
            .memberships
            .values()
            .any(|m| m.club_id == membership.club_id && m.user_id == membership.user_id);
        if taken {
            return Err(StoreError::Duplicate("membership"));
        }
        self.work.memberships.insert(membership.id, membership.clone());
        Ok(())
    }

    async fn set_club_role(
        &mut self,
        membership_id: Uuid,
        role: ClubRole,
    ) -> Result<(), StoreError> {
        if let Some(m) = self.work.memberships.get_mut(&membership_id) {
            m.role = role;
        }
        Ok(())
    }

    async fn delete_membership(&mut self, membership_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.work.memberships.remove(&membership_id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
