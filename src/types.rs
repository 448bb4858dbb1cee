//! Domain Types
//!
//! TigerStyle: Plain values. Every accessor in the crate hands out owned
//! clones of these, so nobody can reach canonical state through a result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role identifier
pub type RoleId = String;

/// Permission identifier
pub type PermissionId = String;

// =============================================================================
// Permission
// =============================================================================

/// A single grantable permission. Identity is the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission ID
    pub id: PermissionId,
    /// Display name
    pub name: String,
}

impl Permission {
    /// Create a new permission
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Role
// =============================================================================

/// A role and the permissions granted to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role ID
    pub id: RoleId,
    /// Display name
    pub name: String,
    /// Granted permissions, all of which exist in the catalog
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Create a role with no permissions
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    /// Ids of the granted permissions, as a set
    pub fn permission_ids(&self) -> BTreeSet<&str> {
        self.permissions.iter().map(|p| p.id.as_str()).collect()
    }

    /// Check whether a permission is granted
    pub fn has_permission(&self, permission_id: &str) -> bool {
        self.permissions.iter().any(|p| p.id == permission_id)
    }
}

// =============================================================================
// User
// =============================================================================

/// The currently logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name
    pub username: String,
    /// Role the user is bound to
    pub role: RoleId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permission_helpers() {
        let mut role = Role::new("r1", "Admin");
        assert!(role.permission_ids().is_empty());

        role.permissions = vec![Permission::new("p2", "Write"), Permission::new("p1", "Read")];
        assert!(role.has_permission("p1"));
        assert!(!role.has_permission("p3"));
        assert_eq!(role.permission_ids().into_iter().collect::<Vec<_>>(), vec!["p1", "p2"]);
    }

    #[test]
    fn test_user_serializes_role_as_id() {
        let user = User {
            username: "admin".to_string(),
            role: "346a3cce-49d4-4e3c-bade-a16ed44b98bb".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"username": "admin", "role": "346a3cce-49d4-4e3c-bade-a16ed44b98bb"})
        );
    }
}
