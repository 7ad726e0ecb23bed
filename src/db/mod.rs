//! Persistence contract for users, clubs and memberships.
//!
//! Every engine operation runs inside one [`UnitOfWork`] obtained from
//! [`Store::begin`]. Work becomes visible only on [`UnitOfWork::commit`];
//! dropping an uncommitted unit rolls it back.

use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod models;
pub mod pg;

pub use memory::MemoryStore;
pub use models::*;
pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0} already exists")]
    Duplicate(&'static str),
    /// The transaction lost a serialization race and may be retried.
    #[error("transaction contention: {0}")]
    Contention(String),
    /// A stored value could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a serializable unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    // ---------- users ----------
    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;
    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&mut self) -> Result<Vec<User>, StoreError>;
    /// Deletes the user, their memberships, and clears `creator_id` on the
    /// clubs they created. Returns whether a row was removed.
    async fn delete_user(&mut self, id: Uuid) -> Result<bool, StoreError>;

    // ---------- clubs ----------
    async fn club_by_id(&mut self, id: Uuid) -> Result<Option<Club>, StoreError>;
    async fn list_clubs(&mut self) -> Result<Vec<Club>, StoreError>;
    /// Insert-or-update keyed by `club.id`.
    async fn save_club(&mut self, club: &Club) -> Result<(), StoreError>;
    /// Deletes the club and every membership in it.
    async fn delete_club(&mut self, id: Uuid) -> Result<bool, StoreError>;

    // ---------- memberships ----------
    async fn membership(
        &mut self,
        club_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError>;
    async fn members_of_club(&mut self, club_id: Uuid) -> Result<Vec<MemberRow>, StoreError>;
    async fn memberships_of_user(&mut self, user_id: Uuid) -> Result<Vec<Membership>, StoreError>;
    async fn count_members(&mut self, club_id: Uuid) -> Result<i64, StoreError>;
    async fn count_admins(&mut self, club_id: Uuid) -> Result<i64, StoreError>;
    /// Admin memberships of a club, oldest first. Backends that lock lock
    /// these rows until the unit of work ends.
    async fn admins_of_club(&mut self, club_id: Uuid) -> Result<Vec<Membership>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the (user, club) pair exists.
    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError>;
    async fn set_club_role(&mut self, membership_id: Uuid, role: ClubRole)
        -> Result<(), StoreError>;
    async fn delete_membership(&mut self, membership_id: Uuid) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
