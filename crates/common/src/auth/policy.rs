//! Per-resource permission policies
//!
//! Each policy is a pure function of who is asking, which HTTP method is
//! used and, for owned resources, whether the caller wrote the resource.

use crate::db::models::User;
use crate::errors::AppError;
use axum::http::Method;

/// Who is making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User,
    Moderator,
    /// Admin role or staff account
    Admin,
}

impl Actor {
    pub fn of(user: Option<&User>) -> Self {
        match user {
            None => Actor::Anonymous,
            Some(u) if u.is_admin() => Actor::Admin,
            Some(u) if u.is_moderator() => Actor::Moderator,
            Some(_) => Actor::User,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Actor::Anonymous)
    }

    /// Moderator or admin
    pub fn is_privileged(&self) -> bool {
        matches!(self, Actor::Moderator | Actor::Admin)
    }
}

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Authenticated but not permitted (403)
    Deny,
    /// Credentials required (401)
    Unauthenticated,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Turn a refusal into the matching error
    pub fn require(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AppError::Forbidden {
                message: "You do not have permission to perform this action".to_string(),
            }),
            Decision::Unauthenticated => Err(AppError::Unauthorized {
                message: "Authentication credentials were not provided".to_string(),
            }),
        }
    }
}

/// GET, HEAD and OPTIONS
pub fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Categories, genres, titles: anyone reads, only admins write.
///
/// An anonymous write is answered with 401 so the client knows to log in.
pub fn admin_or_read_only(actor: Actor, method: &Method) -> Decision {
    if is_safe(method) {
        return Decision::Allow;
    }
    match actor {
        Actor::Admin => Decision::Allow,
        Actor::Anonymous => Decision::Unauthenticated,
        _ => Decision::Deny,
    }
}

/// Reviews and comments.
///
/// `is_author` is only consulted for object-level methods; pass `false`
/// when checking a create.
pub fn author_or_staff(actor: Actor, method: &Method, is_author: bool) -> Decision {
    if is_safe(method) {
        return Decision::Allow;
    }
    if actor == Actor::Anonymous {
        return Decision::Unauthenticated;
    }
    if *method == Method::POST || is_author || actor.is_privileged() {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// `users/` and `users/{username}`
pub fn user_admin(actor: Actor) -> Decision {
    match actor {
        Actor::Admin => Decision::Allow,
        Actor::Anonymous => Decision::Unauthenticated,
        _ => Decision::Deny,
    }
}

/// `users/me`: read your own profile; edit it with elevated privilege.
///
/// Changing the role field also requires admin.
pub fn self_service(actor: Actor, method: &Method, changes_role: bool) -> Decision {
    if actor == Actor::Anonymous {
        return Decision::Unauthenticated;
    }
    if is_safe(method) {
        return Decision::Allow;
    }
    if changes_role && actor != Actor::Admin {
        return Decision::Deny;
    }
    if actor.is_privileged() {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AuthState, Role};
    use Actor::{Admin, Anonymous, Moderator};
    use Decision::*;

    fn user_with(role: Role, is_staff: bool) -> User {
        User {
            id: 1,
            username: "u".to_string(),
            email: "u@example.com".to_string(),
            role,
            bio: None,
            first_name: String::new(),
            last_name: String::new(),
            is_staff,
            auth_state: AuthState::Confirmed,
            last_login: None,
            date_joined: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_actor_of() {
        assert_eq!(Actor::of(None), Anonymous);
        assert_eq!(Actor::of(Some(&user_with(Role::User, false))), Actor::User);
        assert_eq!(Actor::of(Some(&user_with(Role::Moderator, false))), Moderator);
        assert_eq!(Actor::of(Some(&user_with(Role::Admin, false))), Admin);
        // Staff collapses to admin whatever the role
        assert_eq!(Actor::of(Some(&user_with(Role::User, true))), Admin);
    }

    #[test]
    fn test_admin_or_read_only_table() {
        let cases = [
            (Anonymous, Method::GET, Allow),
            (Actor::User, Method::GET, Allow),
            (Anonymous, Method::POST, Unauthenticated),
            (Anonymous, Method::DELETE, Unauthenticated),
            (Actor::User, Method::POST, Deny),
            (Moderator, Method::PATCH, Deny),
            (Moderator, Method::DELETE, Deny),
            (Admin, Method::POST, Allow),
            (Admin, Method::DELETE, Allow),
        ];
        for (actor, method, expected) in cases {
            assert_eq!(admin_or_read_only(actor, &method), expected, "{:?} {}", actor, method);
        }
    }

    #[test]
    fn test_author_or_staff_table() {
        let cases = [
            (Anonymous, Method::GET, false, Allow),
            (Anonymous, Method::POST, false, Unauthenticated),
            (Anonymous, Method::PATCH, false, Unauthenticated),
            (Actor::User, Method::POST, false, Allow),
            (Actor::User, Method::PATCH, true, Allow),
            (Actor::User, Method::PATCH, false, Deny),
            (Actor::User, Method::DELETE, false, Deny),
            (Moderator, Method::DELETE, false, Allow),
            (Admin, Method::PATCH, false, Allow),
        ];
        for (actor, method, is_author, expected) in cases {
            assert_eq!(
                author_or_staff(actor, &method, is_author),
                expected,
                "{:?} {} author={}",
                actor,
                method,
                is_author
            );
        }
    }

    #[test]
    fn test_user_admin() {
        assert_eq!(user_admin(Anonymous), Unauthenticated);
        assert_eq!(user_admin(Actor::User), Deny);
        assert_eq!(user_admin(Moderator), Deny);
        assert_eq!(user_admin(Admin), Allow);
    }

    #[test]
    fn test_self_service_table() {
        let cases = [
            (Anonymous, Method::GET, false, Unauthenticated),
            (Actor::User, Method::GET, false, Allow),
            (Actor::User, Method::PATCH, false, Deny),
            (Moderator, Method::PATCH, false, Allow),
            (Moderator, Method::PATCH, true, Deny),
            (Admin, Method::PATCH, true, Allow),
        ];
        for (actor, method, changes_role, expected) in cases {
            assert_eq!(self_service(actor, &method, changes_role), expected);
        }
    }

    #[test]
    fn test_decision_errors() {
        assert!(Allow.require().is_ok());
        assert!(matches!(Deny.require(), Err(AppError::Forbidden { .. })));
        assert!(matches!(
            Unauthenticated.require(),
            Err(AppError::Unauthorized { .. })
        ));
    }
}
