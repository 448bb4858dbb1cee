//! Resource Store
//!
//! TigerStyle: Canonical in-memory roles and permissions.
//!
//! The store is the single owner of role/permission state. Reads return
//! clones. The only write is a wholesale replacement of one role's
//! permission set, validated against the catalog before anything changes.
//!
//! There is no version check on writes: two replacements of the same role
//! race, and whichever reaches the store last is what remains.

use crate::types::{Permission, Role};
use std::sync::Arc;
use tokio::sync::RwLock;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Seed roles: (id, name)
pub const DEMO_ROLES: [(&str, &str); 3] = [
    ("9faaf9ba-464e-4c68-a901-630fc4de123b", "User"),
    ("346a3cce-49d4-4e3c-bade-a16ed44b98bb", "Administrator"),
    ("6f25f789-72f3-41e2-9561-b30ca19aa225", "Auditor"),
];

/// Seed permission catalog: (id, name)
pub const DEMO_PERMISSIONS: [(&str, &str); 3] = [
    ("706ee8e3-6034-4f27-ab20-4397ad874a09", "Read Data"),
    ("72e1c7be-4c2f-4ed1-bc7b-41519b35e429", "Write Data"),
    ("3add53a6-ede2-4760-8942-dbd08d209d2c", "Delete Data"),
];

// =============================================================================
// Resource Store
// =============================================================================

/// In-memory role and permission store
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    /// Roles in seed order
    roles: Vec<Role>,
    /// Permission catalog in seed order
    permissions: Vec<Permission>,
}

impl ResourceStore {
    /// Create a store seeded with the demo roles and permissions
    pub fn seeded() -> Self {
        let roles = DEMO_ROLES
            .iter()
            .map(|(id, name)| Role::new(*id, *name))
            .collect();
        let permissions = DEMO_PERMISSIONS
            .iter()
            .map(|(id, name)| Permission::new(*id, *name))
            .collect();
        Self::with_catalog(roles, permissions)
    }

    /// Create a store from an explicit catalog
    ///
    /// # Panics
    /// Panics if a seed role grants a permission missing from the catalog.
    pub fn with_catalog(roles: Vec<Role>, permissions: Vec<Permission>) -> Self {
        let store = Self { roles, permissions };
        for role in &store.roles {
            assert!(
                store.unknown_permission_ids(&role.permissions).is_empty(),
                "seed role {} references permissions outside the catalog",
                role.id
            );
        }
        store
    }

    /// All roles, in stable order
    pub fn list_roles(&self) -> Vec<Role> {
        self.roles.clone()
    }

    /// The whole permission catalog, in stable order
    pub fn list_permissions(&self) -> Vec<Permission> {
        self.permissions.clone()
    }

    /// Look up a single role
    pub fn role(&self, role_id: &str) -> Option<Role> {
        self.roles.iter().find(|r| r.id == role_id).cloned()
    }

    /// Replace a role's permission set
    ///
    /// Both the role lookup and the catalog check happen before the write,
    /// so a failed call leaves the store untouched.
    pub fn assign_permissions(
        &mut self,
        role_id: &str,
        permissions: &[Permission],
    ) -> Result<Role, StoreError> {
        let index = self
            .roles
            .iter()
            .position(|r| r.id == role_id)
            .ok_or_else(|| StoreError::RoleNotFound(role_id.to_string()))?;

        let unknown = self.unknown_permission_ids(permissions);
        if !unknown.is_empty() {
            return Err(StoreError::InvalidPermissions { ids: unknown });
        }

        let role = &mut self.roles[index];
        role.permissions = permissions.to_vec();

        tracing::info!(
            role_id = %role.id,
            permission_count = role.permissions.len(),
            "Replaced role permissions"
        );

        Ok(role.clone())
    }

    /// Ids from `permissions` that are not in the catalog
    fn unknown_permission_ids(&self, permissions: &[Permission]) -> Vec<String> {
        permissions
            .iter()
            .filter(|p| !self.permissions.iter().any(|known| known.id == p.id))
            .map(|p| p.id.clone())
            .collect()
    }
}

/// Thread-safe resource store
pub type SharedResourceStore = Arc<RwLock<ResourceStore>>;

/// Create a new shared store seeded with the demo data
pub fn new_shared_store() -> SharedResourceStore {
    Arc::new(RwLock::new(ResourceStore::seeded()))
}

// =============================================================================
// Errors
// =============================================================================

/// Store validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("role not found: {0}")]
    RoleNotFound(String),

    #[error("invalid permissions: {}", ids.join(", "))]
    InvalidPermissions { ids: Vec<String> },
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_store_matches_demo_set() {
        let store = ResourceStore::seeded();

        let roles = store.list_roles();
        let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Administrator", "Auditor"]);
        assert!(roles.iter().all(|r| r.permissions.is_empty()));

        let permissions = store.list_permissions();
        let names: Vec<_> = permissions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Read Data", "Write Data", "Delete Data"]);
    }

    #[test]
    fn test_reads_are_independent_copies() {
        let store = ResourceStore::seeded();

        let mut first = store.list_roles();
        let second = store.list_roles();
        assert_eq!(first, second);

        first[0].permissions.push(Permission::new("x", "Injected"));
        first.pop();
        assert_eq!(store.list_roles(), second);
    }

    #[test]
    fn test_assign_replaces_wholesale() {
        let mut store = ResourceStore::seeded();
        let catalog = store.list_permissions();
        let role_id = DEMO_ROLES[1].0;

        store.assign_permissions(role_id, &catalog).unwrap();
        let updated = store
            .assign_permissions(role_id, &catalog[2..])
            .unwrap();

        assert_eq!(updated.permissions, vec![catalog[2].clone()]);
        assert_eq!(store.role(role_id).unwrap(), updated);
    }

    #[test]
    fn test_assign_empty_set() {
        let mut store = ResourceStore::seeded();
        let catalog = store.list_permissions();
        let role_id = DEMO_ROLES[0].0;

        store.assign_permissions(role_id, &catalog).unwrap();
        let updated = store.assign_permissions(role_id, &[]).unwrap();
        assert!(updated.permissions.is_empty());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let mut store = ResourceStore::seeded();
        let catalog = store.list_permissions();

        let err = store.assign_permissions("non-existent-id", &catalog).unwrap_err();
        assert_eq!(err, StoreError::RoleNotFound("non-existent-id".to_string()));
    }

    #[test]
    fn test_invalid_permissions_leave_role_unchanged() {
        let mut store = ResourceStore::seeded();
        let catalog = store.list_permissions();
        let role_id = DEMO_ROLES[2].0;
        store.assign_permissions(role_id, &catalog[..1]).unwrap();

        let mut input = catalog.clone();
        input.push(Permission::new("invalid-id", "Invalid"));

        let err = store.assign_permissions(role_id, &input).unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidPermissions {
                ids: vec!["invalid-id".to_string()]
            }
        );
        assert_eq!(store.role(role_id).unwrap().permissions, catalog[..1].to_vec());
    }

    #[test]
    fn test_unknown_role_checked_before_permissions() {
        let mut store = ResourceStore::seeded();
        let bogus = [Permission::new("invalid-id", "Invalid")];

        assert!(matches!(
            store.assign_permissions("missing", &bogus),
            Err(StoreError::RoleNotFound(_))
        ));
    }

    #[test]
    #[should_panic(expected = "outside the catalog")]
    fn test_catalog_rejects_dangling_seed() {
        let mut role = Role::new("r1", "Admin");
        role.permissions.push(Permission::new("p9", "Ghost"));
        let _ = ResourceStore::with_catalog(vec![role], vec![Permission::new("p1", "Read")]);
    }
}
