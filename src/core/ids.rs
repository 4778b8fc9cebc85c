//! Identifier types for documents, questions and notices.
//!
//! Document ids are issued by the server and kept opaque. Question and notice ids
//! are generated locally as random UUIDs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Declare a UUID newtype with a consistent API.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// Create a new random identifier.
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_uuid_id!(
    /// Correlates an optimistic user message with the answer that settles it.
    QuestionId
);

define_uuid_id!(
    /// Identifier of a user-visible notice.
    NoticeId
);

/// Server-issued document identifier.
///
/// The API serializes ids as integers; the client treats them as opaque strings
/// and writes integer-looking ids back as numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Serialize for DocumentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match WireId::deserialize(deserializer)? {
            WireId::Text(text) => Self(text),
            WireId::Signed(n) => Self(n.to_string()),
            WireId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_accepts_integers_and_strings() {
        let from_int: DocumentId = serde_json::from_str("42").unwrap();
        let from_text: DocumentId = serde_json::from_str("\"d1\"").unwrap();
        assert_eq!(from_int.as_str(), "42");
        assert_eq!(from_text, DocumentId::from("d1"));
    }

    #[test]
    fn numeric_document_ids_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&DocumentId::new("7")).unwrap(), "7");
        assert_eq!(serde_json::to_string(&DocumentId::new("d1")).unwrap(), "\"d1\"");
    }

    #[test]
    fn question_ids_are_unique_and_parse_back() {
        let a = QuestionId::new();
        let b = QuestionId::new();
        assert_ne!(a, b);
        let parsed: QuestionId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }
}
