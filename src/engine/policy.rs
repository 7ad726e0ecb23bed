//! Authorization predicates and the last-admin invariant.
//!
//! Every predicate takes the global role and the club role as separate
//! arguments. Neither is ever derived from the other: a platform admin has
//! no authority inside a club unless they also hold an admin membership.

use crate::db::{ClubRole, GlobalRole, Membership};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdateClub,
    DeleteClub,
    PromoteMember,
    RemoveMember,
    ManageUsers,
}

pub fn is_allowed(action: Action, global: GlobalRole, club: Option<ClubRole>) -> bool {
    match action {
        Action::UpdateClub | Action::PromoteMember | Action::RemoveMember => {
            club == Some(ClubRole::Admin)
        }
        Action::DeleteClub | Action::ManageUsers => global == GlobalRole::Admin,
    }
}

/// Would removing `leaving` leave its club without an admin?
///
/// `admins` is the club's full admin set, read inside the same unit of work.
pub fn strands_club(admins: &[Membership], leaving: &Membership) -> bool {
    match admins {
        [only] => only.id == leaving.id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn admin(club: Uuid) -> Membership {
        Membership {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            club_id: club,
            role: ClubRole::Admin,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn global_admin_gains_nothing_inside_a_club() {
        for action in [Action::UpdateClub, Action::PromoteMember, Action::RemoveMember] {
            assert!(!is_allowed(action, GlobalRole::Admin, None));
            assert!(!is_allowed(action, GlobalRole::Admin, Some(ClubRole::Member)));
            assert!(is_allowed(action, GlobalRole::User, Some(ClubRole::Admin)));
        }
    }

    #[test]
    fn club_admin_cannot_delete_or_manage_users() {
        for action in [Action::DeleteClub, Action::ManageUsers] {
            assert!(!is_allowed(action, GlobalRole::User, Some(ClubRole::Admin)));
            assert!(is_allowed(action, GlobalRole::Admin, None));
        }
    }

    #[test]
    fn sole_admin_strands_club() {
        let club = Uuid::new_v4();
        let a = admin(club);
        let b = admin(club);
        assert!(strands_club(&[a.clone()], &a));
        assert!(!strands_club(&[a.clone(), b.clone()], &a));
        assert!(!strands_club(&[b], &a));
        assert!(!strands_club(&[], &a));
    }
}
