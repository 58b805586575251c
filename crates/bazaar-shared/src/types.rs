use serde::{Deserialize, Serialize};

use crate::constants::SHORT_ID_LEN;
use crate::error::SharedError;

/// Characters the document store refuses inside a path segment, besides
/// control characters.
const FORBIDDEN: [char; 6] = ['/', '.', '#', '$', '[', ']'];

fn validate_key(raw: &str) -> Result<(), SharedError> {
    if raw.is_empty() {
        return Err(SharedError::EmptyId);
    }
    match raw.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
        Some(c) => Err(SharedError::ForbiddenChar(c)),
        None => Ok(()),
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw key, rejecting values that cannot be used as a path segment.
            pub fn new(raw: impl Into<String>) -> Result<Self, SharedError> {
                let raw = raw.into();
                validate_key(&raw)?;
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = SharedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = SharedError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Opaque user identifier issued by the authentication layer.
    UserId
);
string_id!(
    /// Store-generated category identifier.
    CategoryId
);
string_id!(
    /// Store-generated item identifier.
    ItemId
);
string_id!(
    /// Store-generated transaction identifier.
    TransactionId
);

impl UserId {
    /// Short rendering used as a last-resort display name.
    pub fn short(&self) -> String {
        self.0.chars().take(SHORT_ID_LEN).collect()
    }
}

/// The identity on whose behalf an operation runs.
///
/// Passed explicitly into every market operation instead of being read from
/// ambient authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    /// Display name cached from the user's profile, if the caller has one.
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.display_name = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
        self
    }
}
