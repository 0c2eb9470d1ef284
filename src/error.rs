//! Error types.

use log::{error, warn};

use rocket::http::Status;
use rocket::response::Responder;
use rocket::Request;

use rocket_contrib::json::Json;

use derive_more::{Display, From};

use serde::Serialize;

use crate::models::{BlogId, PostId};
use crate::validators::{FieldError, ValidationErrors};

/// Our error type.
#[derive(Debug, Display, From)]
pub enum Error {
    #[display(fmt = "You need to be signed in to do that")]
    NotAuthenticated,
    #[display(fmt = "Invalid email or password")]
    InvalidCredentials,
    #[display(fmt = "Missing session cookie")]
    MissingSessionCookie,
    #[display(fmt = "Invalid session cookie")]
    InvalidSessionCookie,
    #[display(fmt = "Session expired")]
    ExpiredSession,
    #[display(fmt = "Subscribe to d/{} to post", slug)]
    SubscriptionRequired { slug: String },
    #[display(fmt = "You are not subscribed to d/{}", slug)]
    NotSubscribed { slug: String },
    #[display(fmt = "You can't unsubscribe from d/{}, you created it", slug)]
    CreatorCannotUnsubscribe { slug: String },
    #[display(fmt = "You are already subscribed to d/{}", slug)]
    AlreadySubscribed { slug: String },
    #[display(fmt = "Community '{}' not found", slug)]
    CommunityNotFound { slug: String },
    #[display(fmt = "Post #{} not found", post_id)]
    PostNotFound { post_id: PostId },
    #[display(fmt = "User '{}' not found", user)]
    UserNotFound { user: String },
    #[display(fmt = "Blog #{} not found", blog_id)]
    BlogNotFound { blog_id: BlogId },
    #[display(fmt = "Community '{}' already exists", name)]
    CommunityExists { name: String },
    #[display(fmt = "User with this email already exists")]
    EmailTaken { email: String },
    #[display(fmt = "User with this username already exists")]
    UsernameTaken { username: String },
    #[display(fmt = "{} account '{}' is already linked", provider, account)]
    AccountAlreadyLinked { provider: String, account: String },
    #[display(fmt = "Post #{} is being voted on, try again", post_id)]
    VoteConflict { post_id: PostId },
    #[display(fmt = "Invalid input: {}", _0)]
    #[from]
    Invalid(ValidationErrors),
    #[display(fmt = "Unknown vote type '{}'", vote_type)]
    UnknownVoteType { vote_type: String },
    #[display(fmt = "Unknown log level '{}'", level)]
    UnknownLogLevel { level: String },
    #[display(fmt = "The database pool isn't managed by the server")]
    DatabaseNotManaged,
    #[display(fmt = "The configuration isn't managed by the server")]
    ConfigNotManaged,
    #[display(fmt = "Couldn't hash password: {}", _0)]
    #[from]
    HashError(argon2::Error),
    #[display(fmt = "JSON error: {}", _0)]
    #[from]
    JsonError(serde_json::error::Error),
    #[display(fmt = "YAML error: {}", _0)]
    #[from]
    YamlError(serde_yaml::Error),
    #[display(fmt = "Couldn't initialize logging: {}", _0)]
    #[from]
    LogError(log::SetLoggerError),
    #[display(fmt = "Invalid server configuration: {}", _0)]
    #[from]
    RocketConfigError(rocket::config::ConfigError),
    #[display(fmt = "Couldn't launch the server: {}", _0)]
    #[from]
    LaunchError(rocket::error::LaunchError),
    #[display(fmt = "Database connection pool error: {}", _0)]
    #[from]
    R2d2Error(r2d2::Error),
    #[display(fmt = "Database error: {}", _0)]
    #[from]
    DatabaseError(diesel::result::Error),
    #[display(fmt = "Database migration error: {}", _0)]
    #[from]
    DatabaseMigrationError(diesel_migrations::RunMigrationsError),
    #[display(fmt = "I/O error: {}", _0)]
    #[from]
    IoError(std::io::Error),
    #[display(fmt = "I/O error: {}: {}", msg, cause)]
    IoErrorMsg { cause: std::io::Error, msg: String },
    #[display(fmt = "Error parsing duration: {}", _0)]
    #[from]
    DurationParseError(parse_duration::parse::Error),
}

impl Error {
    pub fn from_io_error<S>(cause: std::io::Error, msg: S) -> Error
    where
        S: Into<String>,
    {
        Error::IoErrorMsg {
            cause,
            msg: msg.into(),
        }
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Error::NotSubscribed { .. }
            | Error::CreatorCannotUnsubscribe { .. }
            | Error::UnknownVoteType { .. } => Status::BadRequest,

            Error::NotAuthenticated
            | Error::InvalidCredentials
            | Error::MissingSessionCookie
            | Error::InvalidSessionCookie
            | Error::ExpiredSession => Status::Unauthorized,

            Error::SubscriptionRequired { .. } => Status::Forbidden,

            Error::CommunityNotFound { .. }
            | Error::PostNotFound { .. }
            | Error::UserNotFound { .. }
            | Error::BlogNotFound { .. } => Status::NotFound,

            Error::CommunityExists { .. }
            | Error::EmailTaken { .. }
            | Error::UsernameTaken { .. }
            | Error::AlreadySubscribed { .. }
            | Error::AccountAlreadyLinked { .. }
            | Error::VoteConflict { .. } => Status::Conflict,

            Error::Invalid(..) => Status::UnprocessableEntity,

            _ => Status::InternalServerError,
        }
    }

    /// The per-field validation failures, if this is a validation error.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Error::Invalid(errors) => errors.as_slice(),
            _ => &[],
        }
    }

    /// Write this error to the log at a level matching its status.
    pub fn log(&self) {
        if self.status().code >= 500 {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
    }
}

/// The JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ErrorBody {
    pub fn new<S>(message: S) -> ErrorBody
    where
        S: Into<String>,
    {
        ErrorBody {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn from_error(err: &Error) -> ErrorBody {
        // Don't leak the details of internal failures to clients.
        let message = if err.status() == Status::InternalServerError {
            "Internal server error".to_string()
        } else {
            err.to_string()
        };

        ErrorBody {
            message,
            errors: err.field_errors().to_vec(),
        }
    }
}

impl<'r> Responder<'r> for Error {
    fn respond_to(self, req: &Request) -> rocket::response::Result<'r> {
        self.log();

        let mut res = Json(ErrorBody::from_error(&self)).respond_to(req)?;
        res.set_status(self.status());

        Ok(res)
    }
}

impl std::error::Error for Error {}

/// Our result type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    use crate::validators::{CreateCommunity, Validate};

    #[test]
    fn conflicts_map_to_409() {
        let err = Error::CommunityExists { name: "rust".into() };
        assert_eq!(err.status(), Status::Conflict);

        let err = Error::EmailTaken {
            email: "a@b.co".into(),
        };
        assert_eq!(err.status(), Status::Conflict);
        assert!(err.to_string().contains("email"));

        let err = Error::UsernameTaken {
            username: "alice".into(),
        };
        assert!(err.to_string().contains("username"));

        assert_eq!(Error::VoteConflict { post_id: 3 }.status(), Status::Conflict);
    }

    #[test]
    fn validation_maps_to_422_with_fields() {
        let payload = CreateCommunity { name: "ab".into() };
        let err: Error = payload.validate().unwrap_err().into();

        assert_eq!(err.status(), Status::UnprocessableEntity);
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].field, "name");
    }

    #[test]
    fn unauthenticated_maps_to_401() {
        assert_eq!(Error::NotAuthenticated.status(), Status::Unauthorized);
        assert_eq!(Error::ExpiredSession.status(), Status::Unauthorized);
    }

    #[test]
    fn internal_errors_are_hidden() {
        let err = Error::from(diesel::result::Error::RollbackTransaction);
        let body = ErrorBody::from_error(&err);

        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(body.message, "Internal server error");
    }

    #[test]
    fn error_body_serializes_field_errors() -> Result<()> {
        let payload = CreateCommunity { name: "".into() };
        let err: Error = payload.validate().unwrap_err().into();

        let value = serde_json::to_value(ErrorBody::from_error(&err))?;

        assert_eq!(value["errors"][0]["field"], "name");

        let value = serde_json::to_value(ErrorBody::new("nope"))?;
        assert!(value.get("errors").is_none());

        Ok(())
    }
}
