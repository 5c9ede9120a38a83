use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create from a raw store-assigned value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw numeric value.
            pub const fn get(&self) -> u64 {
                self.0
            }

            /// The identity that follows this one in allocation order.
            pub const fn next(&self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $label, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }

        /// Accepts `12` and `#12`. Zero is rejected: identities start at 1.
        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.trim().strip_prefix('#').unwrap_or(s.trim());
                let raw: u64 = digits
                    .parse()
                    .map_err(|_| TypeError::InvalidId(s.to_string()))?;
                if raw == 0 {
                    return Err(TypeError::InvalidId(s.to_string()));
                }
                Ok(Self(raw))
            }
        }
    };
}

numeric_id!(
    /// Identity of a persisted category, assigned by the store on insert.
    CategoryId,
    "CategoryId"
);

numeric_id!(
    /// Identity of a persisted post, assigned by the store on insert.
    PostId,
    "PostId"
);
