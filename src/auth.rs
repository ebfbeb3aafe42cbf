//! Admin rights lookup injected into the application state.

use std::collections::HashSet;

use crate::dao::models::ExternalId;

/// Decides whether an external user may run admin actions.
pub trait AdminAuthority: Send + Sync {
    /// `true` when `external_id` is an admin.
    fn is_admin(&self, external_id: ExternalId) -> bool;
}

/// Fixed allow-list of admin ids, built from configuration at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticAdminList {
    ids: HashSet<ExternalId>,
}

impl StaticAdminList {
    /// Allow-list containing `ids`.
    pub fn new(ids: impl IntoIterator<Item = ExternalId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Number of admins.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nobody can administrate.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl AdminAuthority for StaticAdminList {
    fn is_admin(&self, external_id: ExternalId) -> bool {
        self.ids.contains(&external_id)
    }
}

impl<F> AdminAuthority for F
where
    F: Fn(ExternalId) -> bool + Send + Sync,
{
    fn is_admin(&self, external_id: ExternalId) -> bool {
        self(external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_list_checks_membership() {
        let admins = StaticAdminList::new([1, 2]);
        assert!(admins.is_admin(1));
        assert!(!admins.is_admin(3));
        assert_eq!(admins.len(), 2);
    }

    #[test]
    fn closures_can_act_as_authority() {
        let authority = |id: ExternalId| id > 100;
        assert!(authority.is_admin(101));
        assert!(!AdminAuthority::is_admin(&authority, 5));
    }
}
