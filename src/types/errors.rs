use thiserror::Error;

// === ValidationError ===

/// A form field of the add-bookmark action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Url,
    Title,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Url => "url",
            Field::Title => "title",
        }
    }
}

/// Field-level validation failures reported inline next to the form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was missing or blank.
    #[error("Both fields are required")]
    Required(Field),
    /// The url field is not an absolute URI.
    #[error("Please enter a valid URL")]
    InvalidUrl,
}

impl ValidationError {
    /// The field the message should be shown next to.
    pub fn field(&self) -> Field {
        match self {
            ValidationError::Required(field) => *field,
            ValidationError::InvalidUrl => Field::Url,
        }
    }
}

// === StoreError ===

/// Errors surfaced by the bookmark persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Bookmark database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

// === ActionError ===

/// Errors returned by user-submitted add/delete actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The persistence collaborator rejected the write; local state is unchanged.
    #[error("{0}")]
    Persistence(String),
    /// No signed-in user; the caller should redirect to the landing page.
    #[error("Not signed in")]
    Unauthenticated,
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        ActionError::Persistence(err.to_string())
    }
}

// === AuthError ===

/// Errors related to sign-in and access token issuance.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Auth database error: {0}")]
    Database(String),
    #[error("Access token error: {0}")]
    Token(String),
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}

// === FeedError ===

/// Errors related to change-feed subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The access token is unknown or has been revoked.
    #[error("Change feed rejected the access token")]
    Unauthorized,
    /// Another subscription already uses this channel name.
    #[error("Change feed channel already in use: {0}")]
    ChannelInUse(String),
    /// There is no runtime or transport to deliver events on.
    #[error("Change feed unavailable: {0}")]
    Unavailable(String),
}

// === DashboardError ===

/// Errors raised while mounting or refreshing the dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// No signed-in user; the caller should redirect to the landing page.
    #[error("Not signed in")]
    Unauthenticated,
    #[error(transparent)]
    Store(#[from] StoreError),
}

// === ConfigError ===

/// Errors related to reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
