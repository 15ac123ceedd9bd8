use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{models::Role, session::SessionRecord};

/// Where unauthenticated navigation is sent.
pub const LOGIN_PATH: &str = "/login";

/// Generic "no access" landing for signed-in users lacking the required role.
pub const DEFAULT_AREA_PATH: &str = "/dashboard";

/// Decision
///
/// The outcome of evaluating a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// RequiredRoles
///
/// The role restriction attached to a navigation target.
///
/// Role names that are not part of [`Role`] are remembered as unmatchable
/// entries: they still make the set non-empty, so a set made only of unknown
/// names excludes every session instead of degrading to "no restriction".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequiredRoles {
    roles: Vec<Role>,
    unknown: Vec<String>,
}

impl RequiredRoles {
    pub fn of(roles: &[Role]) -> Self {
        Self {
            roles: roles.to_vec(),
            unknown: Vec::new(),
        }
    }

    pub fn admin_only() -> Self {
        Self::of(&[Role::Admin])
    }

    /// Builds a set from role names as they appear in route declarations.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            match name.as_ref().parse::<Role>() {
                Ok(role) => set.roles.push(role),
                Err(_) => set.unknown.push(name.as_ref().to_string()),
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.unknown.is_empty()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// authorize
///
/// Decides whether a navigation target may be rendered.
///
/// - no session: redirect to [`LOGIN_PATH`]
/// - a non-empty `required` set that does not contain the session role:
///   redirect to [`DEFAULT_AREA_PATH`]
/// - otherwise: allow
///
/// There is no role hierarchy; an admin passes only where `Admin` is listed.
pub fn authorize(session: Option<&SessionRecord>, required: Option<&RequiredRoles>) -> Decision {
    let Some(session) = session else {
        return Decision::Redirect(LOGIN_PATH);
    };

    match required {
        Some(required) if !required.is_empty() && !required.contains(session.role) => {
            Decision::Redirect(DEFAULT_AREA_PATH)
        }
        _ => Decision::Allow,
    }
}

// --- Navigation Menu ---

/// NavEntry
///
/// One entry of the dashboard sidebar, tagged with the roles allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NavEntry {
    pub path: String,
    pub label: String,
    pub allowed_roles: Vec<Role>,
}

impl NavEntry {
    fn new(path: &str, label: &str, allowed_roles: &[Role]) -> Self {
        Self {
            path: path.to_string(),
            label: label.to_string(),
            allowed_roles: allowed_roles.to_vec(),
        }
    }
}

/// The full sidebar, in display order.
pub fn nav_entries() -> Vec<NavEntry> {
    const EVERYONE: &[Role] = &[Role::User, Role::Admin];
    const ADMIN: &[Role] = &[Role::Admin];

    vec![
        NavEntry::new("/dashboard/posts", "My posts", EVERYONE),
        NavEntry::new("/dashboard/create-post", "Create post", EVERYONE),
        NavEntry::new("/dashboard/profile", "Profile", EVERYONE),
        NavEntry::new("/dashboard/users", "User management", ADMIN),
        NavEntry::new("/dashboard/post-approval", "Post approval", ADMIN),
    ]
}

/// filter_menu
///
/// Keeps the entries whose allowed roles include the session role, in their
/// original order. Without a session nothing is shown.
pub fn filter_menu(entries: &[NavEntry], session: Option<&SessionRecord>) -> Vec<NavEntry> {
    let Some(session) = session else {
        return Vec::new();
    };
    entries
        .iter()
        .filter(|entry| entry.allowed_roles.contains(&session.role))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> SessionRecord {
        SessionRecord {
            id: "1".to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
            is_active: None,
            avatar: None,
        }
    }

    #[test]
    fn absent_session_always_goes_to_login() {
        let sets = [
            None,
            Some(RequiredRoles::default()),
            Some(RequiredRoles::admin_only()),
            Some(RequiredRoles::of(&Role::ALL)),
            Some(RequiredRoles::from_names(["editor"])),
        ];
        for set in &sets {
            assert_eq!(authorize(None, set.as_ref()), Decision::Redirect("/login"));
        }
    }

    #[test]
    fn user_on_admin_target_goes_to_dashboard() {
        let user = session(Role::User);
        assert_eq!(
            authorize(Some(&user), Some(&RequiredRoles::from_names(["admin"]))),
            Decision::Redirect("/dashboard")
        );
    }

    #[test]
    fn member_role_is_allowed() {
        let admin = session(Role::Admin);
        let both = RequiredRoles::from_names(["admin", "user"]);
        assert_eq!(authorize(Some(&admin), Some(&both)), Decision::Allow);
        assert!(authorize(Some(&session(Role::User)), Some(&both)).is_allowed());
    }

    #[test]
    fn empty_or_missing_restriction_allows_any_session() {
        for role in Role::ALL {
            let s = session(role);
            assert_eq!(authorize(Some(&s), None), Decision::Allow);
            assert_eq!(
                authorize(Some(&s), Some(&RequiredRoles::default())),
                Decision::Allow
            );
        }
    }

    #[test]
    fn unknown_role_names_still_restrict() {
        let only_unknown = RequiredRoles::from_names(["moderator"]);
        assert!(!only_unknown.is_empty());
        for role in Role::ALL {
            assert_eq!(
                authorize(Some(&session(role)), Some(&only_unknown)),
                Decision::Redirect("/dashboard")
            );
        }

        let mixed = RequiredRoles::from_names(["moderator", "user"]);
        assert_eq!(authorize(Some(&session(Role::User)), Some(&mixed)), Decision::Allow);
        assert_eq!(
            authorize(Some(&session(Role::Admin)), Some(&mixed)),
            Decision::Redirect("/dashboard")
        );
    }

    #[test]
    fn menu_for_user_hides_admin_entries() {
        let menu = filter_menu(&nav_entries(), Some(&session(Role::User)));
        let paths: Vec<_> = menu.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            ["/dashboard/posts", "/dashboard/create-post", "/dashboard/profile"]
        );
    }

    #[test]
    fn menu_for_admin_keeps_declaration_order() {
        let all = nav_entries();
        let menu = filter_menu(&all, Some(&session(Role::Admin)));
        assert_eq!(menu, all);
    }

    #[test]
    fn menu_filter_is_idempotent() {
        for role in Role::ALL {
            let s = session(role);
            let once = filter_menu(&nav_entries(), Some(&s));
            let twice = filter_menu(&once, Some(&s));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn menu_without_session_is_empty() {
        assert!(filter_menu(&nav_entries(), None).is_empty());
    }
}
