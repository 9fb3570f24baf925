//! Strongly-typed identifiers for evaluation entities.
//!
//! Every identifier is assigned by the evaluation service and treated as an
//! opaque string. Wrapping each kind in its own newtype keeps a topic id from
//! being passed where a child-item id is expected:
//!
//! ```rust
//! use evalform_core::id::{ChildItemId, TopicId};
//!
//! let topic = TopicId::new("topic-1");
//! let child = ChildItemId::new("child-1");
//!
//! // Different types - this won't compile:
//! // let wrong: TopicId = child;
//! # let _ = (topic, child);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a top-level evaluation form.
    FormId
);

string_id!(
    /// Identifier of the entity under evaluation (e.g. a farmer record).
    SubjectId
);

string_id!(
    /// Identifier of a topic grouping child items.
    TopicId
);

string_id!(
    /// Identifier of a single checklist line.
    ///
    /// Also serves as the row id of the reconciled row built for the item.
    ChildItemId
);

string_id!(
    /// Identifier of a persisted per-item decision record.
    ListEntryId
);

string_id!(
    /// Identifier of a user account.
    UserId
);

/// Address of one form: the subject being evaluated plus the form id.
///
/// This is the cache key of [`crate::source::FormSource`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormKey {
    /// Subject the form belongs to.
    pub subject_id: SubjectId,
    /// The form itself.
    pub form_id: FormId,
}

impl FormKey {
    /// Creates a key for the given subject and form.
    #[must_use]
    pub fn new(subject_id: impl Into<SubjectId>, form_id: impl Into<FormId>) -> Self {
        Self {
            subject_id: subject_id.into(),
            form_id: form_id.into(),
        }
    }
}

impl fmt::Display for FormKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subject={}/form={}", self.subject_id, self.form_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = ChildItemId::new("c-42");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"c-42\"");

        let parsed: ChildItemId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_form_key_display() {
        let key = FormKey::new("farmer-7", "form-1");
        assert_eq!(key.to_string(), "subject=farmer-7/form=form-1");
    }
}
