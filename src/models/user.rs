//! Types for users, their linked accounts and their sessions.

use argon2::{hash_encoded, verify_encoded};

use chrono::{DateTime, Duration, Utc};

use diesel::prelude::*;
use diesel::{delete, insert_into};

use log::{debug, info};

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use serde::Serialize;

use crate::models::{unique_violation, Connection};
use crate::schema::{account, app_user, session};
use crate::validators::{CreateUser, Validate};
use crate::{Error, Result};

/// A user ID.
pub type UserId = i32;

/// A registered user.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct User {
    /// The user's ID in the database.
    pub id: UserId,
    /// The unique name the user is shown as.
    pub username: String,
    /// The unique e-mail address the user signs in with.
    pub email: String,
    /// The argon2 hash of the user's password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
}

/// A new user to insert into the database.
#[derive(Debug, Insertable)]
#[table_name = "app_user"]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Build a user from a registration request, hashing the password.
    ///
    /// The request must already be validated.
    pub fn from_payload(payload: &CreateUser) -> Result<NewUser> {
        Ok(NewUser {
            username: payload.username.trim().to_string(),
            email: payload.normalized_email(),
            password_hash: hash_password(&payload.password)?,
        })
    }
}

/// Hash a password with a random salt.
pub fn hash_password<S>(password: S) -> Result<String>
where
    S: AsRef<str>,
{
    let salt: [u8; 20] = thread_rng().gen();
    let conf = argon2::Config::default();

    Ok(hash_encoded(password.as_ref().as_bytes(), &salt, &conf)?)
}

/// An external sign-in account linked to a user.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct Account {
    pub id: i32,
    pub user_id: UserId,
    /// The name of the provider, e.g. "google".
    pub provider: String,
    /// The ID of the user at the provider.
    pub provider_account_id: String,
}

#[derive(Debug, Insertable)]
#[table_name = "account"]
pub struct NewAccount {
    pub user_id: UserId,
    pub provider: String,
    pub provider_account_id: String,
}

/// A signed in user's session.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub expires: DateTime<Utc>,
    pub user: User,
}

impl Session {
    /// Start a new session for a user that lasts for `length`.
    pub fn start(user: User, length: Duration) -> Session {
        let id: String = thread_rng().sample_iter(&Alphanumeric).take(42).collect();

        Session {
            id,
            expires: Utc::now() + length,
            user,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires < Utc::now()
    }
}

/// The database model for a session.
#[derive(Debug, Queryable, Insertable)]
#[table_name = "session"]
struct DbSession {
    id: String,
    expires: DateTime<Utc>,
    user_id: UserId,
}

impl Connection {
    /// Get a user.
    pub fn user(&self, user_id: UserId) -> Result<User> {
        use crate::schema::app_user::columns::id;
        use crate::schema::app_user::dsl::app_user;

        app_user
            .filter(id.eq(user_id))
            .first(&self.inner)
            .optional()?
            .ok_or_else(|| Error::UserNotFound {
                user: user_id.to_string(),
            })
    }

    /// Get a user by their e-mail address.
    pub fn user_by_email<S>(&self, user_email: S) -> Result<Option<User>>
    where
        S: AsRef<str>,
    {
        use crate::schema::app_user::columns::email;
        use crate::schema::app_user::dsl::app_user;

        let user_email = user_email.as_ref().trim().to_lowercase();

        Ok(app_user
            .filter(email.eq(user_email))
            .first(&self.inner)
            .optional()?)
    }

    /// Get a user by their username.
    pub fn user_by_username<S>(&self, name: S) -> Result<Option<User>>
    where
        S: AsRef<str>,
    {
        use crate::schema::app_user::columns::username;
        use crate::schema::app_user::dsl::app_user;

        Ok(app_user
            .filter(username.eq(name.as_ref().trim()))
            .first(&self.inner)
            .optional()?)
    }

    /// Register a new user.
    ///
    /// Fails with a conflict if the e-mail address or the username is already
    /// in use.
    pub fn register_user(&self, payload: &CreateUser) -> Result<User> {
        use crate::schema::app_user::dsl::app_user;

        payload.validate()?;

        let new_user = NewUser::from_payload(payload)?;

        if self.user_by_email(&new_user.email)?.is_some() {
            return Err(Error::EmailTaken {
                email: new_user.email,
            });
        }

        if self.user_by_username(&new_user.username)?.is_some() {
            return Err(Error::UsernameTaken {
                username: new_user.username,
            });
        }

        let user: User = insert_into(app_user)
            .values(&new_user)
            .get_result(&self.inner)
            .map_err(|err| match unique_violation(&err) {
                Some(constraint) if constraint.contains("email") => {
                    Error::EmailTaken {
                        email: new_user.email.clone(),
                    }
                }
                Some(_) => Error::UsernameTaken {
                    username: new_user.username.clone(),
                },
                None => Error::from(err),
            })?;

        info!("Registered user {} ({})", user.username, user.id);

        Ok(user)
    }

    /// Check a user's credentials.
    pub fn authenticate<S1, S2>(&self, user_email: S1, password: S2) -> Result<User>
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let user = self
            .user_by_email(user_email)?
            .ok_or(Error::InvalidCredentials)?;

        if !verify_encoded(&user.password_hash, password.as_ref().as_bytes())? {
            debug!("Bad password for user {}", user.id);
            return Err(Error::InvalidCredentials);
        }

        Ok(user)
    }

    /// Delete a user.
    ///
    /// Everything the user owns goes with them, except communities they
    /// created, which are kept without a creator.
    pub fn delete_user(&self, user_id: UserId) -> Result<()> {
        use crate::schema::app_user::columns::id;
        use crate::schema::app_user::dsl::app_user;

        let count = delete(app_user.filter(id.eq(user_id))).execute(&self.inner)?;

        if count == 0 {
            return Err(Error::UserNotFound {
                user: user_id.to_string(),
            });
        }

        Ok(())
    }

    /// Link an external account to a user.
    pub fn link_account(&self, new_account: NewAccount) -> Result<Account> {
        use crate::schema::account::dsl::account;

        insert_into(account)
            .values(&new_account)
            .get_result(&self.inner)
            .map_err(|err| match unique_violation(&err) {
                Some(_) => Error::AccountAlreadyLinked {
                    provider: new_account.provider.clone(),
                    account: new_account.provider_account_id.clone(),
                },
                None => Error::from(err),
            })
    }

    /// Get all of the external accounts linked to a user.
    pub fn accounts_for_user(&self, uid: UserId) -> Result<Vec<Account>> {
        use crate::schema::account::columns::{id, user_id};
        use crate::schema::account::dsl::account;

        Ok(account
            .filter(user_id.eq(uid))
            .order(id.asc())
            .load(&self.inner)?)
    }

    /// Get a session.
    ///
    /// Expired sessions are deleted when they're found.
    pub fn session<S>(&self, session_id: S) -> Result<Session>
    where
        S: AsRef<str>,
    {
        use crate::schema::session::columns::id;
        use crate::schema::session::dsl::session as session_table;

        let db_session: DbSession = session_table
            .filter(id.eq(session_id.as_ref()))
            .first(&self.inner)
            .optional()?
            .ok_or(Error::InvalidSessionCookie)?;

        let found = Session {
            user: self.user(db_session.user_id)?,
            id: db_session.id,
            expires: db_session.expires,
        };

        if found.is_expired() {
            self.delete_session(&found.id)?;
            return Err(Error::ExpiredSession);
        }

        Ok(found)
    }

    /// Insert a session.
    pub fn insert_session(&self, new_session: &Session) -> Result<()> {
        use crate::schema::session::dsl::session;

        let new_session = DbSession {
            id: new_session.id.clone(),
            expires: new_session.expires,
            user_id: new_session.user.id,
        };

        insert_into(session)
            .values(&new_session)
            .execute(&self.inner)?;

        Ok(())
    }

    /// Delete a session.
    pub fn delete_session<S>(&self, session_id: S) -> Result<()>
    where
        S: AsRef<str>,
    {
        use crate::schema::session::columns::id;
        use crate::schema::session::dsl::session;

        delete(session.filter(id.eq(session_id.as_ref()))).execute(&self.inner)?;

        Ok(())
    }

    /// Delete every expired session. Returns how many were deleted.
    pub fn delete_expired_sessions(&self) -> Result<usize> {
        use crate::schema::session::columns::expires;
        use crate::schema::session::dsl::session;

        use diesel::dsl::now;

        Ok(delete(session.filter(expires.lt(now))).execute(&self.inner)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_roundtrip() -> Result<()> {
        let hash = hash_password("hunter22")?;

        assert!(verify_encoded(&hash, b"hunter22")?);
        assert!(!verify_encoded(&hash, b"hunter23")?);

        Ok(())
    }

    #[test]
    fn new_user_from_payload() -> Result<()> {
        let payload = CreateUser {
            username: " bob ".into(),
            email: "Bob@Example.COM".into(),
            password: "12345678".into(),
            confirm_password: "12345678".into(),
        };

        let new_user = NewUser::from_payload(&payload)?;

        assert_eq!(new_user.username, "bob");
        assert_eq!(new_user.email, "bob@example.com");
        assert_ne!(new_user.password_hash, "12345678");

        Ok(())
    }

    #[test]
    fn session_ids() {
        let a = Session::start(user(), Duration::weeks(1));
        let b = Session::start(user(), Duration::weeks(1));

        assert_eq!(a.id.len(), 42);
        assert!(a.id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a.id, b.id);
        assert!(!a.is_expired());
        assert!(Session::start(user(), Duration::seconds(-1)).is_expired());
    }

    #[test]
    fn password_hash_is_not_serialized() -> Result<()> {
        let mut u = user();
        u.password_hash = "secret".into();

        let value = serde_json::to_value(&u)?;

        assert!(value.get("password_hash").is_none());
        assert_eq!(value["username"], "alice");

        Ok(())
    }
}
