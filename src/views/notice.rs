//! Notices shown at the top of a page after an action.

use rocket::http::Status;

use serde::Serialize;

use crate::Error;

/// Whether a notice reports a success or a failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A message shown to the user after they did something.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Notice {
    pub fn success<S>(title: S) -> Notice
    where
        S: Into<String>,
    {
        Notice {
            kind: NoticeKind::Success,
            title: title.into(),
            description: None,
        }
    }

    pub fn error<S1, S2>(title: S1, description: S2) -> Notice
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Notice {
            kind: NoticeKind::Error,
            title: title.into(),
            description: Some(description.into()),
        }
    }

    /// Rebuild a notice from a flash cookie.
    pub fn from_flash<S1, S2>(name: S1, msg: S2) -> Notice
    where
        S1: AsRef<str>,
        S2: Into<String>,
    {
        let kind = match name.as_ref() {
            "success" => NoticeKind::Success,
            _ => NoticeKind::Error,
        };

        Notice {
            kind,
            title: msg.into(),
            description: None,
        }
    }

    pub fn community_created<S>(name: S) -> Notice
    where
        S: AsRef<str>,
    {
        Notice::success(format!("{} community was successfully created.", name.as_ref()))
    }

    /// What to tell a user whose community couldn't be created.
    pub fn community_error(err: &Error) -> Notice {
        match err.status() {
            Status::Conflict => Notice::error(
                "This community already exists.",
                "Please choose a different name.",
            ),
            Status::UnprocessableEntity => Notice::error(
                "Invalid community name.",
                "Please choose a name between 3 and 21 letters.",
            ),
            Status::Unauthorized => Notice::error(
                "Login required.",
                "You need to be logged in to do that.",
            ),
            _ => Notice::error("There was an error.", "Could not create community."),
        }
    }

    pub fn user_created() -> Notice {
        Notice::success("Create user successfully")
    }

    /// What to tell a user whose sign up failed.
    pub fn sign_up_error(err: &Error) -> Notice {
        match err {
            Error::EmailTaken { .. } | Error::UsernameTaken { .. } => {
                Notice::error(err.to_string(), "Please sign in or pick another.")
            }
            Error::Invalid(errors) => Notice::error("Invalid sign up details.", errors.to_string()),
            _ => Notice::error("Could not create user", "Please try again later."),
        }
    }

    /// What to tell a user whose sign in failed.
    pub fn sign_in_error(err: &Error) -> Notice {
        match err.status() {
            Status::Unauthorized | Status::UnprocessableEntity => Notice::error(
                "Could not sign in.",
                "Check your email and password and try again.",
            ),
            _ => Notice::error("There was an error.", "Could not sign in."),
        }
    }

    /// What to tell a user whose post couldn't be created.
    pub fn post_error(err: &Error) -> Notice {
        match err {
            Error::SubscriptionRequired { .. } => Notice::error(
                "Subscription required.",
                "Subscribe to this community to post in it.",
            ),
            Error::Invalid(errors) => Notice::error("Invalid post.", errors.to_string()),
            Error::NotAuthenticated => Notice::error(
                "Login required.",
                "You need to be logged in to do that.",
            ),
            _ => Notice::error("There was an error.", "Could not create post."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::validators::{CreateCommunity, Validate};

    #[test]
    fn community_conflict() {
        let notice = Notice::community_error(&Error::CommunityExists { name: "rust".into() });

        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.title, "This community already exists.");
        assert_eq!(
            notice.description.as_ref().map(String::as_str),
            Some("Please choose a different name.")
        );
    }

    #[test]
    fn community_invalid_name() {
        let err: Error = CreateCommunity { name: "x".into() }
            .validate()
            .unwrap_err()
            .into();

        assert_eq!(Notice::community_error(&err).title, "Invalid community name.");
    }

    #[test]
    fn community_login_required() {
        let notice = Notice::community_error(&Error::NotAuthenticated);

        assert_eq!(notice.title, "Login required.");
    }

    #[test]
    fn community_other_error() {
        let err = Error::from(diesel::result::Error::RollbackTransaction);
        let notice = Notice::community_error(&err);

        assert_eq!(notice.title, "There was an error.");
        assert_eq!(
            notice.description.as_ref().map(String::as_str),
            Some("Could not create community.")
        );
    }

    #[test]
    fn community_created() {
        let notice = Notice::community_created("Rust");

        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.title, "Rust community was successfully created.");
    }

    #[test]
    fn user_created() {
        let notice = Notice::user_created();

        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.title, "Create user successfully");
    }

    #[test]
    fn sign_up_conflicts_name_the_field() {
        let email = Notice::sign_up_error(&Error::EmailTaken {
            email: "a@b.co".into(),
        });
        let username = Notice::sign_up_error(&Error::UsernameTaken {
            username: "alice".into(),
        });

        assert_eq!(email.title, "User with this email already exists");
        assert_eq!(username.title, "User with this username already exists");
        assert_eq!(
            Notice::sign_up_error(&Error::ExpiredSession).title,
            "Could not create user"
        );
    }

    #[test]
    fn flash() {
        assert_eq!(Notice::from_flash("success", "ok").kind, NoticeKind::Success);
        assert_eq!(Notice::from_flash("error", "no").kind, NoticeKind::Error);
    }

    #[test]
    fn serialized() -> crate::Result<()> {
        let value = serde_json::to_value(Notice::success("done"))?;

        assert_eq!(value["kind"], "success");
        assert!(value.get("description").is_none());

        Ok(())
    }
}
