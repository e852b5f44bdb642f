use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::result::DomainError;

/// Closed catalog of permissions a user can hold within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    NormalUser,
    ApproveCivilian,
    ApproveSoldier,
    ApproveCar,
    EditWorkflow,
    EditUserPermissions,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::NormalUser,
        Permission::ApproveCivilian,
        Permission::ApproveSoldier,
        Permission::ApproveCar,
        Permission::EditWorkflow,
        Permission::EditUserPermissions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::NormalUser => "NORMAL_USER",
            Permission::ApproveCivilian => "APPROVE_CIVILIAN",
            Permission::ApproveSoldier => "APPROVE_SOLDIER",
            Permission::ApproveCar => "APPROVE_CAR",
            Permission::EditWorkflow => "EDIT_WORKFLOW",
            Permission::EditUserPermissions => "EDIT_USER_PERMISSIONS",
        }
    }

    /// Whether holding this permission lets a user act on some workflow step
    pub fn is_approval_permission(&self) -> bool {
        match self {
            Permission::ApproveCivilian | Permission::ApproveSoldier | Permission::ApproveCar => {
                true
            }
            Permission::NormalUser | Permission::EditWorkflow | Permission::EditUserPermissions => {
                false
            }
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DomainError::UnknownPermission(s.to_string()))
    }
}

/// How a set of required permissions is matched against the held set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// Every required permission must be held
    #[default]
    All,
    /// At least one required permission must be held
    Any,
}

/// Fixed-size set of permissions, one bit per catalog entry
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Permission>", from = "Vec<Permission>")]
pub struct PermissionSet(u8);

impl PermissionSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission.bit();
    }

    pub fn remove(&mut self, permission: Permission) {
        self.0 &= !permission.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(&self, other: &PermissionSet) -> PermissionSet {
        PermissionSet(self.0 | other.0)
    }

    pub fn is_superset(&self, other: &PermissionSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(&self, other: &PermissionSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// Parse permission names, rejecting anything outside the catalog
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, DomainError> {
        names
            .iter()
            .map(|name| name.as_ref().parse::<Permission>())
            .collect()
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<Permission> for PermissionSet {
    fn from(permission: Permission) -> Self {
        PermissionSet(permission.bit())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(permissions: [Permission; N]) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(permissions: Vec<Permission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.iter().collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = PermissionSet::empty();
        set.extend(iter);
        set
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        for permission in iter {
            self.insert(permission);
        }
    }
}
