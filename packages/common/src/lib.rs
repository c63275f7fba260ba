pub mod listing_kind;
pub mod role;
pub mod status;
pub mod tags;

pub use listing_kind::ListingKind;
pub use role::{MemberRole, UserRole};
pub use status::{MentorshipStatus, SessionStatus};

use thiserror::Error;

/// Error when parsing an invalid enum string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field} '{invalid}'. Valid values: {valid}")]
pub struct ParseEnumError {
    field: &'static str,
    invalid: String,
    valid: String,
}

impl ParseEnumError {
    pub(crate) fn new<'a>(
        field: &'static str,
        invalid: &str,
        valid: impl Iterator<Item = &'a str>,
    ) -> Self {
        Self {
            field,
            invalid: invalid.to_string(),
            valid: valid.collect::<Vec<_>>().join(", "),
        }
    }
}
