//! Newtype identifiers.
//!
//! Org/user/server/queue ids are all plain strings on the wire and on disk,
//! but mixing them up at a call boundary is a real failure mode (an org id
//! passed where a user id is expected fails silently as a lookup miss rather
//! than a compile error). Wrapping each in its own type turns that class of
//! bug into a type error.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(OrgId);
string_id!(UserId);
string_id!(ServerId);
string_id!(QueueId);
