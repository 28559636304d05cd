//! Operation kinds and the per-request set of kinds a transport permits.
//!
//! # Design Decisions
//! - Mutations never travel over GET, a safe method
//! - Subscriptions are never executed by the HTTP layer; a streaming
//!   transport owns them
//! - Queries over GET can be switched off, which leaves GET with nothing
//!   executable

use std::fmt;

use http::Method;

/// Kind of a GraphQL operation, as declared by the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub const ALL: [OperationType; 3] = [
        OperationType::Query,
        OperationType::Mutation,
        OperationType::Subscription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        }
    }

    /// Plural form used in client facing error messages.
    pub fn plural(&self) -> &'static str {
        match self {
            OperationType::Query => "queries",
            OperationType::Mutation => "mutations",
            OperationType::Subscription => "subscriptions",
        }
    }

    fn bit(self) -> u8 {
        match self {
            OperationType::Query => 1,
            OperationType::Mutation => 1 << 1,
            OperationType::Subscription => 1 << 2,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subset of [`OperationType`].
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationTypes(u8);

impl OperationTypes {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        OperationType::ALL.into_iter().collect()
    }

    /// Kinds a method can carry at all, before configuration applies.
    pub fn from_http(method: &Method) -> Self {
        if method == Method::GET {
            [OperationType::Query].into_iter().collect()
        } else if method == Method::POST {
            [OperationType::Query, OperationType::Mutation]
                .into_iter()
                .collect()
        } else {
            Self::empty()
        }
    }

    pub fn contains(&self, operation_type: OperationType) -> bool {
        self.0 & operation_type.bit() != 0
    }

    pub fn insert(&mut self, operation_type: OperationType) {
        self.0 |= operation_type.bit();
    }

    pub fn remove(&mut self, operation_type: OperationType) {
        self.0 &= !operation_type.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = OperationType> + '_ {
        OperationType::ALL
            .into_iter()
            .filter(move |operation_type| self.contains(*operation_type))
    }
}

impl FromIterator<OperationType> for OperationTypes {
    fn from_iter<I: IntoIterator<Item = OperationType>>(iter: I) -> Self {
        let mut set = Self::empty();
        for operation_type in iter {
            set.insert(operation_type);
        }
        set
    }
}

impl fmt::Debug for OperationTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Operation kinds that may execute for a request with this method.
pub fn allowed_types(method: &Method, allow_queries_via_get: bool) -> OperationTypes {
    let mut allowed = OperationTypes::from_http(method);

    if !allow_queries_via_get && method == Method::GET {
        allowed.remove(OperationType::Query);
    }

    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_only_carries_queries() {
        let allowed = allowed_types(&Method::GET, true);
        assert!(allowed.contains(OperationType::Query));
        assert!(!allowed.contains(OperationType::Mutation));
        assert!(!allowed.contains(OperationType::Subscription));
    }

    #[test]
    fn test_post_carries_queries_and_mutations() {
        for allow_get in [true, false] {
            let allowed = allowed_types(&Method::POST, allow_get);
            assert_eq!(
                allowed.iter().collect::<Vec<_>>(),
                vec![OperationType::Query, OperationType::Mutation]
            );
        }
    }

    #[test]
    fn test_disabling_get_queries_empties_the_set() {
        assert!(allowed_types(&Method::GET, false).is_empty());
    }

    #[test]
    fn test_other_methods_allow_nothing() {
        assert!(allowed_types(&Method::PUT, true).is_empty());
        assert!(allowed_types(&Method::DELETE, true).is_empty());
    }

    #[test]
    fn test_set_operations() {
        let mut set = OperationTypes::all();
        set.remove(OperationType::Mutation);
        assert_eq!(format!("{:?}", set), "{Query, Subscription}");
        assert_eq!(OperationType::Subscription.plural(), "subscriptions");
    }
}
