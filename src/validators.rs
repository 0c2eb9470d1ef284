//! Request payloads and the rules they're checked against.
//!
//! Every payload can be read either from a JSON body or from an HTML form, and
//! has to pass `Validate::validate` before it reaches the database.

use std::fmt;

use lazy_static::lazy_static;

use regex::Regex;

use rocket::request::FromForm;

use serde::{Deserialize, Serialize};

use crate::models::VoteType;

/// Bounds for a community name.
pub const COMMUNITY_NAME_LEN: (usize, usize) = (3, 21);
/// Bounds for a username.
pub const USERNAME_LEN: (usize, usize) = (3, 32);
/// Bounds for a password.
pub const PASSWORD_LEN: (usize, usize) = (8, 128);
/// Bounds for the title of a post.
pub const POST_TITLE_LEN: (usize, usize) = (3, 128);
/// Bounds for the title of a blog.
pub const BLOG_TITLE_LEN: (usize, usize) = (3, 100);

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// A single field that failed validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All of the fields of a payload that failed validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `field` is among the failed fields.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|err| err.field == field)
    }

    fn add<S>(&mut self, field: &'static str, message: S)
    where
        S: Into<String>,
    {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Check that a trimmed string is within `(min, max)` characters.
    fn length(&mut self, field: &'static str, value: &str, bounds: (usize, usize)) {
        self.char_count(field, value.trim(), bounds);
    }

    /// Check that a string, whitespace included, is within `(min, max)`
    /// characters.
    fn char_count(&mut self, field: &'static str, value: &str, bounds: (usize, usize)) {
        let (min, max) = bounds;
        let len = value.chars().count();

        if len < min {
            self.add(
                field,
                format!("must contain at least {} character(s)", min),
            );
        } else if len > max {
            self.add(field, format!("must contain at most {} character(s)", max));
        }
    }

    fn required(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;

        for err in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{} {}", err.field, err.message)?;
            first = false;
        }

        Ok(())
    }
}

/// A payload that can be checked for validity.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Turn a community name into the slug used in its URL.
///
/// Runs of anything other than ASCII letters and digits become a single dash.
pub fn generate_slug<S>(name: S) -> String
where
    S: AsRef<str>,
{
    let mut slug = String::with_capacity(name.as_ref().len());
    let mut pending_dash = false;

    for c in name.as_ref().trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// A request to create a community.
#[derive(Clone, Debug, Deserialize, FromForm)]
pub struct CreateCommunity {
    pub name: String,
}

impl Validate for CreateCommunity {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        errors.length("name", &self.name, COMMUNITY_NAME_LEN);

        if !errors.has("name") && generate_slug(&self.name).is_empty() {
            errors.add("name", "must contain at least one letter or digit");
        }

        errors.finish()
    }
}

/// A request to register a new user.
#[derive(Clone, Debug, Deserialize, FromForm)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl CreateUser {
    /// The email address in the form it's stored in.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        errors.length("username", &self.username, USERNAME_LEN);
        if !errors.has("username") && !USERNAME_REGEX.is_match(self.username.trim())
        {
            errors.add(
                "username",
                "may only contain letters, digits and underscores",
            );
        }

        errors.required("email", &self.email);
        if !errors.has("email") && !EMAIL_REGEX.is_match(self.email.trim()) {
            errors.add("email", "is not a valid email address");
        }

        let password_len = self.password.chars().count();
        if password_len < PASSWORD_LEN.0 {
            errors.add(
                "password",
                format!("must contain at least {} character(s)", PASSWORD_LEN.0),
            );
        } else if password_len > PASSWORD_LEN.1 {
            errors.add(
                "password",
                format!("must contain at most {} character(s)", PASSWORD_LEN.1),
            );
        }

        if self.password != self.confirm_password {
            errors.add("confirmPassword", "passwords do not match");
        }

        errors.finish()
    }
}

/// A request to sign in.
#[derive(Clone, Debug, Deserialize, FromForm)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

impl Validate for SignIn {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        errors.required("email", &self.email);
        if self.password.is_empty() {
            errors.add("password", "is required");
        }

        errors.finish()
    }
}

/// A request to create a post in a community.
#[derive(Clone, Debug, Deserialize, FromForm)]
pub struct CreatePost {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl Validate for CreatePost {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        errors.length("title", &self.title, POST_TITLE_LEN);

        errors.finish()
    }
}

/// A blog post.
///
/// Every field is required to be present; only the title has a length
/// constraint, counted as written. `tags` is a comma separated list.
#[derive(Clone, Debug, Deserialize, FromForm)]
#[serde(rename_all = "camelCase")]
pub struct BlogPayload {
    pub title: String,
    pub content: String,
    pub cover_image: String,
    pub tags: String,
}

impl Validate for BlogPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        errors.char_count("title", &self.title, BLOG_TITLE_LEN);

        errors.finish()
    }
}

/// A vote on a post.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    pub vote_type: VoteType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, email: &str, pass: &str, confirm: &str) -> CreateUser {
        CreateUser {
            username: username.into(),
            email: email.into(),
            password: pass.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn slug() {
        assert_eq!(generate_slug("Rust Lang"), "rust-lang");
        assert_eq!(generate_slug("  C++ & Friends!  "), "c-friends");
        assert_eq!(generate_slug("already-a-slug"), "already-a-slug");
        assert_eq!(generate_slug("__init__"), "init");
        assert_eq!(generate_slug("日本"), "");
    }

    #[test]
    fn community_name_bounds() {
        let ok = |name: &str| CreateCommunity { name: name.into() }.validate().is_ok();

        assert!(!ok(""));
        assert!(!ok("ab"));
        assert!(!ok("   ab   "));
        assert!(ok("abc"));
        assert!(ok(&"a".repeat(21)));
        assert!(!ok(&"a".repeat(22)));
        assert!(!ok("!!!!"));
    }

    #[test]
    fn valid_user() {
        let payload = user("john_doe", "John@Example.com", "hunter22", "hunter22");

        assert!(payload.validate().is_ok());
        assert_eq!(payload.normalized_email(), "john@example.com");
    }

    #[test]
    fn invalid_user_reports_every_field() {
        let payload = user("j d", "not-an-email", "short", "other");

        let errors = payload.validate().unwrap_err();

        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(errors.has("password"));
        assert!(errors.has("confirmPassword"));
    }

    #[test]
    fn mismatched_passwords() {
        let payload = user("jane", "jane@example.com", "correct horse", "correct hose");

        let errors = payload.validate().unwrap_err();

        assert_eq!(errors.as_slice().len(), 1);
        assert_eq!(errors.as_slice()[0].field, "confirmPassword");
    }

    #[test]
    fn empty_sign_in() {
        let errors = SignIn {
            email: " ".into(),
            password: "".into(),
        }
        .validate()
        .unwrap_err();

        assert!(errors.has("email"));
        assert!(errors.has("password"));
    }

    #[test]
    fn post_title_bounds() {
        let post = |title: &str| CreatePost {
            title: title.into(),
            content: String::new(),
        };

        assert!(post("hi").validate().is_err());
        assert!(post("hey").validate().is_ok());
        assert!(post(&"x".repeat(129)).validate().is_err());
    }

    #[test]
    fn blog_title_bounds() {
        let blog = |title: &str| BlogPayload {
            title: title.into(),
            content: "Some *markdown*".into(),
            cover_image: String::new(),
            tags: "rust, web".into(),
        };

        assert!(blog("ab").validate().is_err());
        assert!(blog("abc").validate().is_ok());
        assert!(blog(&"b".repeat(100)).validate().is_ok());
        assert!(blog(&"b".repeat(101)).validate().is_err());

        // Blog titles count surrounding whitespace.
        assert!(blog("  ab  ").validate().is_ok());
        assert!(blog(" ab").validate().is_ok());
        assert!(blog(&format!(" {}", "b".repeat(100))).validate().is_err());
    }

    #[test]
    fn blog_payload_requires_every_field() {
        let json = r#"{"title": "Hello there", "content": "", "tags": ""}"#;
        assert!(serde_json::from_str::<BlogPayload>(json).is_err());

        let json = r#"{"title": "Hello there", "content": "", "coverImage": "", "tags": ""}"#;
        assert!(serde_json::from_str::<BlogPayload>(json).is_ok());
    }

    #[test]
    fn display_joins_fields() {
        let errors = CreateCommunity { name: "a".into() }.validate().unwrap_err();

        assert_eq!(errors.to_string(), "name must contain at least 3 character(s)");
    }
}
