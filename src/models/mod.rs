//! Models and types related to the database.

use std::fmt::Debug;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use log::info;

use rocket::http::Status;
use rocket::request::{self, FromRequest};
use rocket::{Outcome, Request, State};

use crate::{Error, Result};

pub mod blog;
pub mod community;
pub mod post;
pub mod user;

pub use blog::*;
pub use community::*;
pub use post::*;
pub use user::*;

embed_migrations!();

/// A page location for a paginated resource, for example a page of posts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// The page number.
    pub num: u32,
    /// How many items can fit in a page.
    pub width: u32,
}

impl Page {
    /// Create a page location. Page numbers start at 1; anything lower is
    /// treated as the first page.
    pub fn new(num: u32, width: u32) -> Page {
        Page {
            num: num.max(1),
            width,
        }
    }

    /// The offset in items to the start of the page.
    ///
    /// The offset to page 1 is 0.
    pub fn offset(&self) -> i64 {
        (i64::from(self.num.max(1)) - 1) * i64::from(self.width)
    }

    /// How many pages `item_count` items take up.
    pub fn count(item_count: i64, width: u32) -> u32 {
        if width == 0 {
            return 0;
        }

        (item_count.max(0) as f64 / f64::from(width)).ceil() as u32
    }
}

/// A pool of connections to the database.
pub struct Database {
    pub pool: Pool<ConnectionManager<PgConnection>>,
}

impl Debug for Database {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let state = self.pool.state();

        write!(
            fmt,
            "<#Database connections={} idle_connections={}>",
            state.connections, state.idle_connections,
        )?;

        Ok(())
    }
}

impl Database {
    /// Open a connection pool to the database and run any pending migrations.
    pub fn open<S>(url: S) -> Result<Database>
    where
        S: AsRef<str>,
    {
        let pool = Pool::new(ConnectionManager::new(url.as_ref()))?;

        embedded_migrations::run(&pool.get()?)?;
        info!("Database migrations are up to date");

        Ok(Database { pool })
    }

    /// Get a connection from the pool.
    pub fn get(&self) -> Result<Connection> {
        Ok(Connection {
            inner: self.pool.get()?,
        })
    }
}

/// A connection to the database. Used for creating and retrieving data.
pub struct Connection {
    pub(crate) inner: PooledConnection<ConnectionManager<PgConnection>>,
}

impl<'a, 'r> FromRequest<'a, 'r> for Connection {
    type Error = Error;

    fn from_request(request: &'a Request<'r>) -> request::Outcome<Self, Error> {
        let db = match request.guard::<State<Database>>() {
            Outcome::Success(db) => db,
            _ => {
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::DatabaseNotManaged,
                ))
            }
        };

        match db.get() {
            Ok(conn) => Outcome::Success(conn),
            Err(err) => {
                err.log();
                Outcome::Failure((Status::ServiceUnavailable, err))
            }
        }
    }
}

/// Whether a database error is a violation of a unique constraint, and if so
/// the name of the constraint.
pub(crate) fn unique_violation(err: &DieselError) -> Option<&str> {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            Some(info.constraint_name().unwrap_or(""))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offsets() {
        assert_eq!(Page::new(1, 20).offset(), 0);
        assert_eq!(Page::new(3, 20).offset(), 40);
        assert_eq!(Page::new(0, 20), Page::new(1, 20));
        assert_eq!(Page { num: 0, width: 20 }.offset(), 0);
    }

    #[test]
    fn last_page_offset_does_not_overflow() {
        let page = Page::new(u32::MAX, 10);

        assert_eq!(page.offset(), (i64::from(u32::MAX) - 1) * 10);
        assert!(page.offset() > i64::from(u32::MAX));
    }

    #[test]
    fn page_count() {
        assert_eq!(Page::count(0, 10), 0);
        assert_eq!(Page::count(10, 10), 1);
        assert_eq!(Page::count(11, 10), 2);
        assert_eq!(Page::count(5, 0), 0);
    }
}
