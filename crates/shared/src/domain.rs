use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(GuildId);
id_newtype!(ChannelId);
id_newtype!(MessageId);

/// Milliseconds between the Unix epoch and the platform snowflake epoch
/// (2015-01-01T00:00:00Z).
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_420_070_400_000;

impl MessageId {
    /// Creation instant encoded in the snowflake's upper 42 bits.
    pub fn timestamp(self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis((self.0 >> 22) + SNOWFLAKE_EPOCH_MS)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Synthetic identifier for a given instant. Sorts before every real
    /// identifier generated at or after `at`, which makes it usable as a
    /// pagination anchor.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self((at.timestamp_millis() - SNOWFLAKE_EPOCH_MS) << 22)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Voice,
}

/// Relative ordering of requested entries with respect to an anchor
/// identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Before,
    After,
}

/// Per-query setting controlling whether a paginated read may fall back to
/// the historical-fetch collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    AllowDownload,
    CacheOnly,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snowflake_timestamp_round_trips_to_millisecond_precision() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 45).unwrap();
        let id = MessageId::from_timestamp(at);
        assert_eq!(id.timestamp(), at);
    }

    #[test]
    fn synthetic_anchor_sorts_before_real_ids_from_the_same_instant() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 45).unwrap();
        let anchor = MessageId::from_timestamp(at);
        // Real ids carry worker/sequence bits below the timestamp.
        let real = MessageId(anchor.0 | 0x3F_FFFF);
        assert!(anchor <= real);
        assert_eq!(real.timestamp(), at);
    }
}
