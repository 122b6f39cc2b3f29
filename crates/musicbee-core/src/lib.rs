#[macro_use]
mod macros;

pub mod entity;
pub mod id;
pub mod relay;

use std::time::{SystemTime, UNIX_EPOCH};

array_type_define!(
    /// Identifier of an event
    ///
    /// 16 random bytes, so collisions are not a practical concern, displayed
    /// as unpadded base32. There is no content hashing anywhere in the
    /// system, so ids carry no structure.
    struct EventId, 16
);
array_type_impl_base32_str!(EventId);
array_type_impl_serde_str!(EventId);
array_type_impl_zero_default!(EventId, 16);

array_type_define!(
    /// Identifier of a story
    struct StoryId, 16
);
array_type_impl_base32_str!(StoryId);
array_type_impl_serde_str!(StoryId);
array_type_impl_zero_default!(StoryId, 16);

array_type_define!(
    /// Identifier of a single comment
    struct CommentId, 16
);
array_type_impl_base32_str!(CommentId);
array_type_impl_serde_str!(CommentId);
array_type_impl_zero_default!(CommentId, 16);

array_type_define!(
    /// Identifier of an uploaded image
    struct ImageId, 16
);
array_type_impl_base32_str!(ImageId);
array_type_impl_serde_str!(ImageId);
array_type_impl_zero_default!(ImageId, 16);

#[cfg(feature = "rand")]
macro_rules! array_type_impl_generate {
    ($t:tt) => {
        impl $t {
            pub fn generate() -> Self {
                Self(::rand::random())
            }
        }
    };
}

#[cfg(feature = "rand")]
array_type_impl_generate!(EventId);
#[cfg(feature = "rand")]
array_type_impl_generate!(StoryId);
#[cfg(feature = "rand")]
array_type_impl_generate!(CommentId);
#[cfg(feature = "rand")]
array_type_impl_generate!(ImageId);

/// Seconds since the unix epoch
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    pub fn now() -> Self {
        Self(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("Clock before unix epoch")
                .as_secs(),
        )
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for u64 {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn event_id_base32_round_trip() {
        let id = EventId::from_bytes([7u8; 16]);
        let s = id.to_string();
        assert_eq!(EventId::from_str(&s).expect("Valid encoding"), id);
    }

    #[test]
    fn event_id_rejects_wrong_length() {
        assert!(EventId::from_str("AAAA").is_err());
    }
}
