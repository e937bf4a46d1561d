use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from a raw snowflake value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw snowflake value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> AppResult<Self> {
                parse_snowflake(value, $label).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AppError;

            fn try_from(value: String) -> AppResult<Self> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }
    };
}

snowflake_id!(
    /// Community (guild) partition key for every notification and record.
    GuildId,
    "guild"
);
snowflake_id!(
    /// Identifier of a watched entity (channel or member).
    EntityId,
    "entity"
);
snowflake_id!(
    /// Identifier of a user acting on the platform.
    UserId,
    "user"
);
snowflake_id!(
    /// Identifier of a guild role.
    RoleId,
    "role"
);
snowflake_id!(
    /// Identifier of a permission overwrite subject (a role or a member).
    SubjectId,
    "subject"
);

fn parse_snowflake(value: &str, label: &str) -> AppResult<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{label} id must not be empty")));
    }

    trimmed
        .parse::<u64>()
        .map_err(|error| AppError::Validation(format!("invalid {label} id '{value}': {error}")))
}
