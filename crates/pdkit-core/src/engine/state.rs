/// Validity of a cached view of the database.
///
/// The revision is the [`Database::revision`] the view was built from.
///
/// [`Database::revision`]: crate::core::models::database::Database::revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingState {
    #[default]
    Unbound,
    Fresh {
        revision: u64,
    },
    Stale {
        revision: u64,
    },
}

impl BindingState {
    pub fn is_fresh(&self) -> bool {
        matches!(self, BindingState::Fresh { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, BindingState::Stale { .. })
    }

    pub fn revision(&self) -> Option<u64> {
        match self {
            BindingState::Unbound => None,
            BindingState::Fresh { revision } | BindingState::Stale { revision } => Some(*revision),
        }
    }

    /// A fresh binding becomes stale; other states are unchanged.
    pub fn invalidated(self) -> Self {
        match self {
            BindingState::Fresh { revision } => BindingState::Stale { revision },
            other => other,
        }
    }
}
