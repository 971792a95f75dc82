//! Who may act on which member account.
//!
//! Every rule compares the acting user's role flags and gym with the target
//! user's. The functions here are pure: callers load both users and their
//! profiles, then turn a [`Decision`] into an HTTP response.

use serde::Serialize;

use crate::models::{Permission, User};

/// Operations on another user's account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    View,
    Edit,
    Activate,
    Deactivate,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No authenticated caller; the HTTP layer points the client at the login URL
    Unauthenticated,
    Forbidden(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// A user together with the gym their profile belongs to
#[derive(Debug, Clone, Copy)]
pub struct Principal<'a> {
    pub user: &'a User,
    pub gym_id: Option<i64>,
}

impl<'a> Principal<'a> {
    pub fn new(user: &'a User, gym_id: Option<i64>) -> Self {
        Self { user, gym_id }
    }

    fn manages_all_gyms(&self) -> bool {
        self.user.has_perm(Permission::ManageGyms)
    }

    fn manages_own_gym(&self) -> bool {
        self.user.has_perm(Permission::ManageGym)
    }

    fn is_trainer(&self) -> bool {
        self.user.has_perm(Permission::GymTrainer)
    }

    /// Both users belong to the same, known gym
    fn shares_gym_with(&self, other: &Principal<'_>) -> bool {
        matches!((self.gym_id, other.gym_id), (Some(a), Some(b)) if a == b)
    }
}

/// Decide whether `actor` may perform `action` on `target`
pub fn authorize(actor: Option<&Principal<'_>>, target: &Principal<'_>, action: UserAction) -> Decision {
    let Some(actor) = actor else {
        return Decision::Unauthenticated;
    };

    if actor.manages_all_gyms() {
        return Decision::Allow;
    }

    match action {
        UserAction::View | UserAction::Activate | UserAction::Deactivate => {
            if !actor.manages_own_gym() && !actor.is_trainer() {
                return Decision::Forbidden("You need trainer or manager rights for this gym");
            }
            if !actor.shares_gym_with(target) {
                return Decision::Forbidden("The user belongs to a different gym");
            }
            // Trainers may only act on regular members
            if !actor.manages_own_gym() && target.user.is_staff_member() {
                return Decision::Forbidden("Trainers cannot manage other staff members");
            }
            Decision::Allow
        }
        UserAction::Edit => {
            if !actor.manages_own_gym() {
                return Decision::Forbidden("Only gym managers can edit members");
            }
            if !actor.shares_gym_with(target) {
                return Decision::Forbidden("The user belongs to a different gym");
            }
            Decision::Allow
        }
        UserAction::Delete => {
            if !actor.manages_own_gym() {
                return Decision::Forbidden("Only gym managers can delete members");
            }
            if !actor.shares_gym_with(target) {
                return Decision::Forbidden("The user belongs to a different gym");
            }
            if target.user.is_staff_member() {
                return Decision::Forbidden("Staff accounts cannot be deleted by a gym manager");
            }
            Decision::Allow
        }
    }
}

/// Only users who manage all gyms may see the full user list
pub fn authorize_user_list(actor: Option<&User>) -> Decision {
    match actor {
        None => Decision::Unauthenticated,
        Some(user) if user.has_perm(Permission::ManageGyms) => Decision::Allow,
        Some(_) => Decision::Forbidden("You need to manage all gyms to list users"),
    }
}

/// Decide whether `actor` may switch into `target`'s account.
///
/// `trainer_identity` is the id of the trainer the current session was
/// started from, if the caller is already logged in as a member.
pub fn authorize_trainer_login(
    actor: Option<&Principal<'_>>,
    target: &Principal<'_>,
    trainer_identity: Option<i64>,
) -> Decision {
    let Some(actor) = actor else {
        return Decision::Unauthenticated;
    };

    if actor.is_trainer() {
        if target.user.is_staff_member() {
            return Decision::Forbidden("Trainers cannot log in as other staff members");
        }
    } else {
        match trainer_identity {
            Some(original) if original == target.user.id => {}
            _ => return Decision::Forbidden("Only trainers can log in as other users"),
        }
    }

    if !actor.shares_gym_with(target) {
        return Decision::Forbidden("The user belongs to a different gym");
    }

    Decision::Allow
}
