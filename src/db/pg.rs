//! Postgres implementation of the store contract.
//!
//! Each unit of work is a `SERIALIZABLE` transaction. Serialization failures
//! and deadlocks come back as [`StoreError::Contention`] so the engine can
//! retry the whole operation.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use super::{Club, ClubRole, MemberRow, Membership, Store, StoreError, UnitOfWork, User};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("connecting to Postgres")?;
        Ok(PgStore { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("running migrations")?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// Map driver errors onto the store taxonomy by SQLSTATE.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::Duplicate(unique_subject(db_err.constraint())),
            Some("40001") | Some("40P01") => {
                return StoreError::Contention(db_err.message().to_owned())
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

fn unique_subject(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_username_key") => "username",
        Some("memberships_user_club_key") => "membership",
        _ => "record",
    }
}

//////////////////////////////////////////////////
// Row types
//////////////////////////////////////////////////

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ClubRow {
    id: Uuid,
    name: String,
    description: String,
    category: String,
    free: bool,
    price_cents: Option<i64>,
    creator_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MembershipRow {
    id: Uuid,
    user_id: Uuid,
    club_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MemberListRow {
    user_id: Uuid,
    name: String,
    username: String,
    email: String,
    role: String,
    joined_at: DateTime<Utc>,
}

fn club_role(raw: &str) -> Result<ClubRole, StoreError> {
    raw.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = r
            .role
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{e}")))?;
        Ok(User {
            id: r.id,
            username: r.username,
            password_hash: r.password_hash,
            name: r.name,
            email: r.email,
            role,
            created_at: r.created_at,
        })
    }
}

impl From<ClubRow> for Club {
    fn from(r: ClubRow) -> Self {
        Club {
            id: r.id,
            name: r.name,
            description: r.description,
            category: r.category,
            free: r.free,
            price_cents: r.price_cents,
            creator_id: r.creator_id,
            created_at: r.created_at,
        }
    }
}

impl TryFrom<MembershipRow> for Membership {
    type Error = StoreError;

    fn try_from(r: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            id: r.id,
            user_id: r.user_id,
            club_id: r.club_id,
            role: club_role(&r.role)?,
            joined_at: r.joined_at,
        })
    }
}

impl TryFrom<MemberListRow> for MemberRow {
    type Error = StoreError;

    fn try_from(r: MemberListRow) -> Result<Self, Self::Error> {
        Ok(MemberRow {
            user_id: r.user_id,
            name: r.name,
            username: r.username,
            email: r.email,
            role: club_role(&r.role)?,
            joined_at: r.joined_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

//////////////////////////////////////////////////
// Unit of work
//////////////////////////////////////////////////

const USER_COLS: &str = "id, username, password_hash, name, email, role, created_at";
const CLUB_COLS: &str =
    "id, name, description, category, free, price_cents, creator_id, created_at";
const MEMBERSHIP_COLS: &str = "id, user_id, club_id, role, joined_at";

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgTx {
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO users (id, username, password_hash, name, email, role, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&mut self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLS} FROM users ORDER BY created_at, username"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)?;
        convert_all(rows)
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, StoreError> {
        // memberships cascade, clubs.creator_id is set to NULL
        let rows = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn club_by_id(&mut self, id: Uuid) -> Result<Option<Club>, StoreError> {
        let row = sqlx::query_as::<_, ClubRow>(&format!(
            "SELECT {CLUB_COLS} FROM clubs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(row.map(Club::from))
    }

    async fn list_clubs(&mut self) -> Result<Vec<Club>, StoreError> {
        let rows = sqlx::query_as::<_, ClubRow>(&format!(
            "SELECT {CLUB_COLS} FROM clubs ORDER BY created_at, id"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(rows.into_iter().map(Club::from).collect())
    }

    async fn save_club(&mut self, club: &Club) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO clubs (id, name, description, category, free,
                               price_cents, creator_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id)
            DO UPDATE SET name        = EXCLUDED.name,
                          description = EXCLUDED.description,
                          category    = EXCLUDED.category,
                          free        = EXCLUDED.free,
                          price_cents = EXCLUDED.price_cents
            "#,
        )
        .bind(club.id)
        .bind(&club.name)
        .bind(&club.description)
        .bind(&club.category)
        .bind(club.free)
        .bind(club.price_cents)
        .bind(club.creator_id)
        .bind(club.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn delete_club(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let rows = sqlx::query("DELETE FROM clubs WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn membership(
        &mut self,
        club_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {MEMBERSHIP_COLS} FROM memberships WHERE club_id = $1 AND user_id = $2"
        ))
        .bind(club_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(classify)?;
        row.map(Membership::try_from).transpose()
    }

    async fn members_of_club(&mut self, club_id: Uuid) -> Result<Vec<MemberRow>, StoreError> {
        let rows = sqlx::query_as::<_, MemberListRow>(
            r#"SELECT m.user_id, u.name, u.username, u.email, m.role, m.joined_at
                 FROM memberships m
                 JOIN users u ON u.id = m.user_id
                WHERE m.club_id = $1
                ORDER BY m.joined_at, m.id"#,
        )
        .bind(club_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)?;
        convert_all(rows)
    }

    async fn memberships_of_user(&mut self, user_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        let rows = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {MEMBERSHIP_COLS} FROM memberships WHERE user_id = $1 ORDER BY joined_at, id"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)?;
        convert_all(rows)
    }

    async fn count_members(&mut self, club_id: Uuid) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM memberships WHERE club_id = $1")
            .bind(club_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(classify)
    }

    async fn count_admins(&mut self, club_id: Uuid) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM memberships WHERE club_id = $1 AND role = 'ADMIN'",
        )
        .bind(club_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(classify)
    }

    async fn admins_of_club(&mut self, club_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        let rows = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {MEMBERSHIP_COLS} FROM memberships
              WHERE club_id = $1 AND role = 'ADMIN'
              ORDER BY joined_at, id
                FOR UPDATE"
        ))
        .bind(club_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(classify)?;
        convert_all(rows)
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO memberships (id, user_id, club_id, role, joined_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(membership.id)
        .bind(membership.user_id)
        .bind(membership.club_id)
        .bind(membership.role.as_str())
        .bind(membership.joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn set_club_role(
        &mut self,
        membership_id: Uuid,
        role: ClubRole,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE memberships SET role = $2 WHERE id = $1")
            .bind(membership_id)
            .bind(role.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn delete_membership(&mut self, membership_id: Uuid) -> Result<bool, StoreError> {
        let rows = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(membership_id)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgTx { tx } = *self;
        tx.commit().await.map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_constraints_name_their_subject() {
        assert_eq!(unique_subject(Some("users_username_key")), "username");
        assert_eq!(unique_subject(Some("memberships_user_club_key")), "membership");
        assert_eq!(unique_subject(None), "record");
    }

    #[test]
    fn non_database_errors_pass_through() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound),
            StoreError::Database(sqlx::Error::RowNotFound)
        ));
    }
}
