use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Platform-wide privilege level, independent of any club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GlobalRole {
    User,
    Admin,
}

/// Privilege level inside one club, carried by a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClubRole {
    Member,
    Admin,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl GlobalRole {
    pub fn as_str(self) -> &'static str {
        match self {
            GlobalRole::User => "USER",
            GlobalRole::Admin => "ADMIN",
        }
    }
}

impl ClubRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ClubRole::Member => "MEMBER",
            ClubRole::Admin => "ADMIN",
        }
    }
}

impl FromStr for GlobalRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(GlobalRole::User),
            "ADMIN" => Ok(GlobalRole::Admin),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

impl FromStr for ClubRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEMBER" => Ok(ClubRole::Member),
            "ADMIN" => Ok(ClubRole::Admin),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

impl fmt::Display for GlobalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ClubRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub role: GlobalRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub free: bool,
    /// Membership price in minor currency units; `None` for free clubs.
    pub price_cents: Option<i64>,
    /// Weak reference: cleared when the creator's account is deleted.
    pub creator_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub club_id: Uuid,
    pub role: ClubRole,
    pub joined_at: DateTime<Utc>,
}

/// One row of a club's member list, with the user fields denormalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberRow {
    pub user_id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: ClubRole,
    pub joined_at: DateTime<Utc>,
}

/// Public projection of a user; never carries the credential hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: GlobalRole,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        UserView {
            id: u.id,
            name: u.name.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubDetail {
    #[serde(flatten)]
    pub club: Club,
    pub member_count: i64,
}

/// A club as seen from one of its members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserClub {
    #[serde(flatten)]
    pub club: Club,
    pub club_role: ClubRole,
    pub member_count: i64,
}
