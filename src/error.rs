use thiserror::Error;

use chrono::NaiveDate;

use crate::schema::{FixtureId, RoleCode};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: url::Url,
    },
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Failed to encode the request body: {0}")]
    Encode(#[from] serde_html_form::ser::Error),
    /// Raised by test doubles of the remote service.
    #[error("{0}")]
    Other(String),
}

/// Login was refused.  Fatal for the whole run.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Login failed, redirected to unexpected url: {0}")]
    UnexpectedRedirect(String),
    #[error("Login failed, the response did not contain a redirect target")]
    MissingRedirect,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A fragment did not have the expected shape.  The affected record is
/// skipped and the enumeration goes on.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("{context}: {reason}")]
pub struct ParseAnomaly {
    pub context: &'static str,
    pub reason: String,
}

impl ParseAnomaly {
    pub fn new(context: &'static str, reason: impl Into<String>) -> Self {
        Self {
            context,
            reason: reason.into(),
        }
    }
}

/// No known official matches the requested name.  Aborts only the
/// reconciliation of the fixture that asked for this official.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("Person {name:?} not found")]
pub struct PersonNotFound {
    pub name: String,
}

/// The server signalled that an edit could not be closed cleanly.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum RemoteRejection {
    #[error("Bad close of fixture {fixture}: server asked for {function}")]
    BadClose {
        fixture: FixtureId,
        function: String,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Parse(#[from] ParseAnomaly),
    #[error(transparent)]
    PersonNotFound(#[from] PersonNotFound),
    #[error(transparent)]
    RemoteRejection(#[from] RemoteRejection),
    #[error("Panel {0:?} is not offered for this fixture")]
    PanelNotFound(String),
    #[error("Official {0:?} is not listed on any panel of this fixture")]
    UnknownOfficial(String),
    #[error("Fixture offers no appointment type for role {0}")]
    MissingAppointmentType(RoleCode),
    #[error("More than one official requested as {0}")]
    DuplicateRole(RoleCode),
    #[error("Official {0:?} requested more than once")]
    DuplicateOfficial(String),
    #[error("Official {0:?} has no appoint handle on the page")]
    NoAppointHandle(String),
    #[error("{days} day(s) from {start} is past the last representable date")]
    WindowOutOfRange { start: NaiveDate, days: u64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
