//! Identity newtypes for users, channels and messages.
//!
//! Platform snowflakes fit in 63 bits, so they are stored as SQLite
//! `INTEGER` (i64) and converted at the column boundary.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map($name)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                $name(v)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0 as i64))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(|v| $name(v as u64))
            }
        }
    };
}

snowflake!(
    /// A platform user.
    UserId
);
snowflake!(
    /// A text channel (also used as the session ledger's channel key).
    ChannelId
);
snowflake!(
    /// A posted message.
    MessageId
);

impl UserId {
    /// Platform mention markup, e.g. `<@42>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl ChannelId {
    pub fn mention(&self) -> String {
        format!("<#{}>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let user: UserId = " 1234 ".parse().unwrap();
        assert_eq!(user, UserId(1234));
        assert_eq!(user.to_string(), "1234");
        assert_eq!(user.mention(), "<@1234>");
        assert_eq!(ChannelId(9).mention(), "<#9>");
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&MessageId(77)).unwrap();
        assert_eq!(json, "77");
        let back: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MessageId(77));
    }

    #[test]
    fn large_snowflakes_survive_sqlite() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let id = UserId(1_098_765_432_109_876_543);
        let back: UserId = conn
            .query_row("SELECT ?1", [id], |row| row.get(0))
            .unwrap();
        assert_eq!(back, id);
    }
}
