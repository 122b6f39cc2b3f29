use std::fmt;
use std::str::FromStr;

use snafu::Snafu;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum UsernameError {
    #[snafu(display("Username must be between {MIN_LEN} and {MAX_LEN} characters"))]
    Length,
    #[snafu(display("Username may only contain lowercase letters, digits and underscores"))]
    Charset,
}

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 32;

/// The natural key of a user account
///
/// Assigned by the identity provider at first sign-in and never changed
/// afterwards, which is what makes it usable as a store key.
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bounds for range scans over username-keyed composite store keys
    ///
    /// Not valid usernames themselves: every valid username sorts strictly
    /// between them (valid chars are all below DEL, and valid lengths below
    /// the sentinel's).
    pub fn range_min() -> Self {
        Self(String::new())
    }

    pub fn range_max() -> Self {
        Self("\u{7f}".repeat(MAX_LEN))
    }
}

impl FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !(MIN_LEN..=MAX_LEN).contains(&s.len()) {
            return Err(UsernameError::Length);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(UsernameError::Charset);
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

#[cfg(feature = "serde")]
impl ::serde::Serialize for Username {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: ::serde::Serializer,
    {
        s.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> ::serde::de::Deserialize<'de> for Username {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: ::serde::Deserializer<'de>,
    {
        let str = <String>::deserialize(d)?;
        Self::from_str(&str).map_err(::serde::de::Error::custom)
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("Genre ids are non-empty lowercase slugs"))]
pub struct GenreIdError;

/// Key of a genre, a short slug like `drum-and-bass`
///
/// Genres are static reference data; the slugs are fixed at seeding time.
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct GenreId(String);

impl GenreId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for GenreId {
    type Err = GenreIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty()
            || !s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(GenreIdError);
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for GenreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for GenreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

#[cfg(feature = "serde")]
impl ::serde::Serialize for GenreId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: ::serde::Serializer,
    {
        s.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> ::serde::de::Deserialize<'de> for GenreId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: ::serde::Deserializer<'de>,
    {
        let str = <String>::deserialize(d)?;
        Self::from_str(&str).map_err(::serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn username_validation() {
        assert!(Username::from_str("dj_bee_99").is_ok());
        assert_eq!(Username::from_str("ab"), Err(UsernameError::Length));
        assert_eq!(Username::from_str("No-Caps"), Err(UsernameError::Charset));
    }

    #[test]
    fn genre_id_validation() {
        assert!(GenreId::from_str("drum-and-bass").is_ok());
        assert!(GenreId::from_str("").is_err());
        assert!(GenreId::from_str("Not A Slug").is_err());
    }
}
