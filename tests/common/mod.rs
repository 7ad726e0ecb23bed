//! Shared fixtures: an engine over a fresh in-memory store, plus direct
//! store access for seeding users and inspecting the ledger.

#![allow(dead_code)]

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use clubhouse_server::auth::{Caller, TokenService};
use clubhouse_server::db::{GlobalRole, MemoryStore, Membership, Store, User};
use clubhouse_server::engine::{ClubEngine, EngineRules, NewClub};

pub const SECRET: &[u8] = b"test-secret-test-secret-test-sec";

pub struct Harness {
    pub engine: ClubEngine,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_rules(EngineRules::default())
    }

    pub fn with_rules(rules: EngineRules) -> Self {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenService::new(SECRET, 3_600).expect("token service");
        let engine = ClubEngine::new(store.clone(), tokens, rules);
        Harness { engine, store }
    }

    /// Insert a user without going through password hashing.
    pub async fn user(&self, username: &str, role: GlobalRole) -> Caller {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_owned(),
            password_hash: "$argon2id$unused".to_owned(),
            name: username.to_uppercase(),
            email: format!("{username}@example.com"),
            role,
            created_at: Utc::now(),
        };
        let mut uow = self.store.begin().await.expect("begin");
        uow.insert_user(&user).await.expect("insert user");
        uow.commit().await.expect("commit");
        Caller::from(&user)
    }

    pub async fn member(&self, username: &str) -> Caller {
        self.user(username, GlobalRole::User).await
    }

    pub async fn club_by(&self, owner: &Caller, name: &str) -> Uuid {
        self.engine
            .create_club(owner, free_club(name))
            .await
            .expect("create club")
            .club
            .id
    }

    pub async fn membership(&self, club: Uuid, user: Uuid) -> Option<Membership> {
        let mut uow = self.store.begin().await.expect("begin");
        uow.membership(club, user).await.expect("membership")
    }

    pub async fn admin_count(&self, club: Uuid) -> i64 {
        let mut uow = self.store.begin().await.expect("begin");
        uow.count_admins(club).await.expect("count admins")
    }

    pub async fn member_count(&self, club: Uuid) -> i64 {
        let mut uow = self.store.begin().await.expect("begin");
        uow.count_members(club).await.expect("count members")
    }
}

pub fn free_club(name: &str) -> NewClub {
    NewClub {
        name: name.to_owned(),
        description: format!("{name} enthusiasts"),
        category: "hobby".to_owned(),
        free: true,
        price_cents: None,
    }
}
