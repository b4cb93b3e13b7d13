//! Roles and the acting user.

use serde::{Deserialize, Serialize};

/// Role of the user performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Property agent: creates jobs, answers quotes, uploads payments.
    Agent,
    /// Maintenance worker: inspects, quotes, does the work, documents it.
    Worker,
    /// Administrative staff.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::Worker => "worker",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "agent" => Some(Role::Agent),
            "worker" => Some(Role::Worker),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user behind a request, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn agent(username: impl Into<String>) -> Self {
        Self::new(username, Role::Agent)
    }

    pub fn worker(username: impl Into<String>) -> Self {
        Self::new(username, Role::Worker)
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(username, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::Worker).unwrap();
        assert_eq!(json, "\"worker\"");
        let role: Role = serde_json::from_str("\"agent\"").unwrap();
        assert_eq!(role, Role::Agent);
    }

    #[test]
    fn test_actor_display() {
        let actor = Actor::agent("alice");
        assert_eq!(actor.to_string(), "alice (agent)");
        assert!(!actor.is_admin());
        assert!(Actor::admin("root").is_admin());
    }
}
