//! Capability checks guarding gated commands.

use crate::session::{Role, Session};

/// Capability a gated command requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Any authenticated session.
    User,
    /// An authenticated session carrying the admin role.
    Admin,
}

/// Outcome of evaluating a gate against the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The guarded command may run.
    Granted,
    /// No session: send the user to login.
    RedirectToLogin,
    /// Authenticated but insufficient role: send the user to the
    /// default authenticated view.
    RedirectToDashboard,
}

impl Gate {
    /// Evaluate this gate against the session as it is right now. The
    /// decision is a pure function of the arguments; nothing is cached,
    /// so a logout between calls changes the outcome immediately.
    pub fn check(self, session: Option<&Session>) -> Access {
        let Some(session) = session else {
            return Access::RedirectToLogin;
        };
        match self {
            Gate::User => Access::Granted,
            Gate::Admin => {
                if session.role() == Role::Admin {
                    Access::Granted
                } else {
                    Access::RedirectToDashboard
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;

    fn session(roles: &[&str]) -> Session {
        Session {
            token: "jwt-token".into(),
            user: User {
                id: 1,
                name: "Dev Patel".into(),
                email: "dev@college.edu".into(),
                mobile_number: "9000000000".into(),
                department: "ECE".into(),
                registration_number: "21EC007".into(),
                year: 2,
                gender: "Male".into(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        }
    }

    #[test]
    fn unauthenticated_is_sent_to_login() {
        assert_eq!(Gate::User.check(None), Access::RedirectToLogin);
        assert_eq!(Gate::Admin.check(None), Access::RedirectToLogin);
    }

    #[test]
    fn user_gate_admits_any_session() {
        let user = session(&["ROLE_USER"]);
        let admin = session(&["ROLE_ADMIN"]);
        assert_eq!(Gate::User.check(Some(&user)), Access::Granted);
        assert_eq!(Gate::User.check(Some(&admin)), Access::Granted);
    }

    #[test]
    fn admin_gate_redirects_plain_users() {
        let user = session(&["ROLE_USER"]);
        assert_eq!(
            Gate::Admin.check(Some(&user)),
            Access::RedirectToDashboard
        );
    }

    #[test]
    fn admin_gate_admits_admins() {
        let admin = session(&["ROLE_USER", "ROLE_ADMIN"]);
        assert_eq!(Gate::Admin.check(Some(&admin)), Access::Granted);
    }

    #[test]
    fn decision_follows_session_state() {
        // simulate logout while "on" an admin page: the next evaluation
        // must redirect, no stale grant survives
        let admin = session(&["ROLE_ADMIN"]);
        assert_eq!(Gate::Admin.check(Some(&admin)), Access::Granted);
        assert_eq!(Gate::Admin.check(None), Access::RedirectToLogin);
    }
}
