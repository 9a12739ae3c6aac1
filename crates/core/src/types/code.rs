//! Business code type.
//!
//! Retailers, stores, tags and market areas are addressed externally by a
//! human-readable code rather than their database ID.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing a [`Code`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The input is empty or only whitespace.
    #[error("code cannot be blank")]
    Blank,
    /// The input is too long.
    #[error("code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A business code.
///
/// Codes are stored trimmed. Entities saved without a code receive a
/// generated one (a random UUID), see [`Code::or_generate`].
///
/// ## Examples
///
/// ```
/// use teco_core::Code;
///
/// assert_eq!(Code::parse("  PARIS-01 ").unwrap().as_str(), "PARIS-01");
/// assert!(Code::parse("   ").is_err());
///
/// let generated = Code::or_generate(None);
/// assert_eq!(generated.as_str().len(), 36);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Maximum length of a code (matches the `VARCHAR(255)` columns).
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `Code`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than 255 characters.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CodeError::Blank);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(CodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Generate a fresh random code.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Use the given code when it is present and valid, otherwise generate one.
    #[must_use]
    pub fn or_generate(s: Option<&str>) -> Self {
        s.and_then(|value| Self::parse(value).ok())
            .unwrap_or_else(Self::generate)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Code` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Code {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Code {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Code {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Code {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
