//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`RepositoryOwner`] with a [`RepositoryName`] even though both are strings
//! under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

/// Identifies a pull request within its repository.
///
/// Wraps the number GitHub assigns (`#42`). Pull requests share the issue
/// number space, so the same value addresses both the `pulls` and the
/// `issues` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Creates a new identifier from a raw integer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PullRequestNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed
// ---------------------------------------------------------------------------

/// Identifies a single webhook delivery.
///
/// GitHub sends a GUID in the `X-GitHub-Delivery` header; redeliveries of the
/// same event reuse it. Deliveries without a usable header get a random id so
/// every record can still be correlated across log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(Uuid);

impl DeliveryId {
    /// Generates a new random delivery identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`DeliveryId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parses a header value, returning `None` when it is not a UUID.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (GitHub / Git names)
// ---------------------------------------------------------------------------

string_id! {
    /// A Git branch name (e.g. `"master"`, `"feature/widgets"`).
    BranchName
}

impl BranchName {
    /// Creates a branch name from a non-empty compile-time constant.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(!value.is_empty());
        Self(value.to_string())
    }
}

string_id! {
    /// The login of the user or organisation owning a repository.
    RepositoryOwner
}

string_id! {
    /// The name of a repository, without its owner.
    RepositoryName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_identifiers_reject_empty_values() {
        assert!(BranchName::new("").is_none());
        assert_eq!(
            BranchName::new("master").map(|b| b.to_string()),
            Some("master".to_string())
        );
    }

    #[test]
    fn delivery_id_parses_github_guid_header() {
        let parsed = DeliveryId::parse(" 72d3162e-cc78-11e3-81ab-4c9367dc0958 ").expect("uuid");
        assert_eq!(
            parsed.to_string(),
            "72d3162e-cc78-11e3-81ab-4c9367dc0958"
        );
        assert!(DeliveryId::parse("not-a-guid").is_none());
    }
}
