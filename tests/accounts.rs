// tests/accounts.rs

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use clubhouse_server::db::{ClubRole, GlobalRole};
use clubhouse_server::engine::{EngineRules, Registration};
use clubhouse_server::error::EngineError;
use common::Harness;

fn registration(username: &str, role: Option<GlobalRole>) -> Registration {
    Registration {
        name: username.to_uppercase(),
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        password: "correct horse battery".to_owned(),
        role,
    }
}

#[tokio::test]
async fn register_login_and_resolve() {
    let h = Harness::new();
    let view = h.engine.register(registration("ann", None)).await.unwrap();
    assert_eq!(view.role, GlobalRole::User);

    let token = h
        .engine
        .login("ann", "correct horse battery")
        .await
        .unwrap();
    assert_eq!(token.user.id, view.id);
    assert_eq!(token.expires_in, 3_600);

    let caller = h.engine.resolve_caller(&token.token).await.unwrap();
    assert_eq!(caller.user_id, view.id);
    assert_eq!(caller.role, GlobalRole::User);
}

#[tokio::test]
async fn bad_credentials_look_the_same() {
    let h = Harness::new();
    h.engine.register(registration("ann", None)).await.unwrap();

    let wrong_password = h.engine.login("ann", "nope").await.unwrap_err();
    let unknown_user = h.engine.login("zed", "nope").await.unwrap_err();
    assert!(matches!(wrong_password, EngineError::Unauthenticated(_)));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let h = Harness::new();
    h.engine.register(registration("ann", None)).await.unwrap();
    let res = h.engine.register(registration("ann", None)).await;
    assert!(matches!(res, Err(EngineError::Conflict(_))));
}

#[tokio::test]
async fn admin_self_signup_is_gated() {
    let h = Harness::new();
    let res = h
        .engine
        .register(registration("root", Some(GlobalRole::Admin)))
        .await;
    assert!(matches!(res, Err(EngineError::Unauthorized(_))));

    let open = Harness::with_rules(EngineRules {
        allow_admin_signup: true,
        ..EngineRules::default()
    });
    let view = open
        .engine
        .register(registration("root", Some(GlobalRole::Admin)))
        .await
        .unwrap();
    assert_eq!(view.role, GlobalRole::Admin);
}

#[tokio::test]
async fn garbage_token_is_unauthenticated() {
    let h = Harness::new();
    let res = h.engine.resolve_caller("not.a.jwt").await;
    assert!(matches!(res, Err(EngineError::Unauthenticated(_))));
}

#[tokio::test]
async fn token_for_deleted_account_is_rejected() {
    let h = Harness::new();
    let root = h.user("root", GlobalRole::Admin).await;
    let view = h.engine.register(registration("ann", None)).await.unwrap();
    let token = h
        .engine
        .login("ann", "correct horse battery")
        .await
        .unwrap();

    h.engine.admin_delete_user(view.id, &root).await.unwrap();
    let res = h.engine.resolve_caller(&token.token).await;
    assert!(matches!(res, Err(EngineError::Unauthenticated(_))));
}

#[tokio::test]
async fn user_directory_excludes_the_caller() {
    let h = Harness::new();
    let ann = h.member("ann").await;
    h.member("bob").await;

    let users = h.engine.list_users(&ann).await.unwrap();
    let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["bob"]);
}

#[tokio::test]
async fn admin_listing_needs_global_admin() {
    let h = Harness::new();
    let ann = h.member("ann").await;
    let root = h.user("root", GlobalRole::Admin).await;

    assert!(matches!(
        h.engine.admin_list_users(&ann).await,
        Err(EngineError::Unauthorized(_))
    ));
    assert_eq!(h.engine.admin_list_users(&root).await.unwrap().len(), 2);
}

#[tokio::test]
async fn user_clubs_lists_role_per_club() {
    let h = Harness::new();
    let ann = h.member("ann").await;
    let bob = h.member("bob").await;
    let chess = h.club_by(&ann, "Chess").await;
    let golf = h.club_by(&bob, "Golf").await;
    h.engine.join_club(chess, &bob).await.unwrap();

    let mut clubs = h.engine.user_clubs(bob.user_id).await.unwrap();
    clubs.sort_by(|a, b| a.club.name.cmp(&b.club.name));
    let roles: Vec<_> = clubs
        .iter()
        .map(|c| (c.club.id, c.club_role, c.member_count))
        .collect();
    assert_eq!(
        roles,
        vec![(chess, ClubRole::Member, 2), (golf, ClubRole::Admin, 1)]
    );

    assert!(matches!(
        h.engine.user_clubs(uuid::Uuid::new_v4()).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_sole_admin_promotes_the_oldest_member() {
    let h = Harness::new();
    let root = h.user("root", GlobalRole::Admin).await;
    let ann = h.member("ann").await;
    let bob = h.member("bob").await;
    let cat = h.member("cat").await;
    let club = h.club_by(&ann, "Chess").await;
    h.engine.join_club(club, &bob).await.unwrap();
    h.engine.join_club(club, &cat).await.unwrap();

    h.engine.admin_delete_user(ann.user_id, &root).await.unwrap();

    assert!(h.membership(club, ann.user_id).await.is_none());
    assert_eq!(
        h.membership(club, bob.user_id).await.unwrap().role,
        ClubRole::Admin
    );
    assert_eq!(
        h.membership(club, cat.user_id).await.unwrap().role,
        ClubRole::Member
    );

    let detail = h.engine.get_club(club).await.unwrap();
    assert_eq!(detail.club.creator_id, None);
    assert_eq!(detail.member_count, 2);
    assert!(matches!(
        h.engine.get_user(ann.user_id).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_lone_admin_leaves_an_empty_club() {
    let h = Harness::new();
    let root = h.user("root", GlobalRole::Admin).await;
    let ann = h.member("ann").await;
    let club = h.club_by(&ann, "Solo").await;

    h.engine.admin_delete_user(ann.user_id, &root).await.unwrap();

    assert_eq!(h.member_count(club).await, 0);
    assert_eq!(h.admin_count(club).await, 0);
}

#[tokio::test]
async fn user_deletion_rules() {
    let h = Harness::new();
    let root = h.user("root", GlobalRole::Admin).await;
    let ann = h.member("ann").await;

    assert!(matches!(
        h.engine.admin_delete_user(root.user_id, &ann).await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        h.engine.admin_delete_user(root.user_id, &root).await,
        Err(EngineError::Conflict(_))
    ));
    assert!(matches!(
        h.engine.admin_delete_user(uuid::Uuid::new_v4(), &root).await,
        Err(EngineError::NotFound(_))
    ));
}

// single-threaded runtime: the ticker only advances if hashing is off-thread
#[tokio::test]
async fn password_hashing_does_not_hold_the_runtime() {
    let h = Harness::new();
    let done = AtomicBool::new(false);
    let ticks = AtomicUsize::new(0);

    let register = async {
        let res = h.engine.register(registration("ann", None)).await;
        done.store(true, Ordering::SeqCst);
        res
    };
    let ticker = async {
        while !done.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
            ticks.fetch_add(1, Ordering::SeqCst);
        }
    };

    let (res, ()) = tokio::join!(register, ticker);
    res.unwrap();
    assert!(ticks.load(Ordering::SeqCst) > 0);
}
