//! Rocket HTTP routes.

use std::path::PathBuf;

use rocket::http::{Cookie, Cookies, Status};
use rocket::request::{self, FlashMessage, FromRequest};
use rocket::response::{NamedFile, Redirect};
use rocket::{catch, get, routes, Outcome, Request, Route, State};

use rocket_contrib::json::Json;

use crate::error::ErrorBody;
use crate::models::*;
use crate::views::*;
use crate::{config::Config, Error, Result};

pub mod api;
pub mod forms;

/// The name of the cookie that holds the session ID.
pub const SESSION_COOKIE: &str = "session";

/// Get all routes.
pub fn routes() -> Vec<Route> {
    routes![
        crate::routes::home,
        crate::routes::feed,
        crate::routes::static_file,
        crate::routes::community,
        crate::routes::create_post_page,
        crate::routes::forms::sign_up_page,
        crate::routes::forms::sign_up,
        crate::routes::forms::sign_in_page,
        crate::routes::forms::sign_in,
        crate::routes::forms::sign_out,
        crate::routes::forms::create_community_page,
        crate::routes::forms::create_community,
        crate::routes::forms::create_post,
        crate::routes::api::create_user,
        crate::routes::api::get_user,
        crate::routes::api::sign_in,
        crate::routes::api::sign_out,
        crate::routes::api::current_session,
        crate::routes::api::communities,
        crate::routes::api::create_community,
        crate::routes::api::community,
        crate::routes::api::subscribe,
        crate::routes::api::unsubscribe,
        crate::routes::api::create_post,
        crate::routes::api::feed,
        crate::routes::api::get_post,
        crate::routes::api::vote_post,
        crate::routes::api::create_blog,
        crate::routes::api::blogs,
        crate::routes::api::get_blog,
    ]
}

impl<'a, 'r> FromRequest<'a, 'r> for Session {
    type Error = Error;

    fn from_request(request: &'a Request<'r>) -> request::Outcome<Self, Self::Error> {
        let conn = match request.guard::<Connection>() {
            Outcome::Success(conn) => conn,
            Outcome::Failure(failure) => return Outcome::Failure(failure),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let session_id = match request.cookies().get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => return Outcome::Failure((Status::Unauthorized, Error::MissingSessionCookie)),
        };

        match conn.session(session_id) {
            Ok(session) => Outcome::Success(session),
            Err(err) => Outcome::Failure((err.status(), err)),
        }
    }
}

impl<'a, 'r> FromRequest<'a, 'r> for Context {
    type Error = Error;

    fn from_request(request: &'a Request<'r>) -> request::Outcome<Self, Self::Error> {
        let config = match request.guard::<State<Config>>() {
            Outcome::Success(config) => config,
            _ => {
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::ConfigNotManaged,
                ))
            }
        };

        let session = match request.guard::<Option<Session>>() {
            Outcome::Success(session) => session,
            _ => None,
        };

        let notice = match request.guard::<Option<FlashMessage>>() {
            Outcome::Success(Some(flash)) => Some(Notice::from_flash(flash.name(), flash.msg())),
            _ => None,
        };

        Outcome::Success(Context {
            site_name: config.site_name.clone(),
            session,
            notice,
        })
    }
}

/// Start a session for a user and hand its cookie to the client.
pub(crate) fn start_session(
    conn: &Connection,
    config: &Config,
    user: User,
    cookies: &mut Cookies,
) -> Result<Session> {
    let session = Session::start(user, config.session_length()?);

    conn.insert_session(&session)?;

    let session_cookie = Cookie::build(SESSION_COOKIE, session.id.clone())
        .path("/")
        .http_only(true)
        .finish();

    cookies.add(session_cookie);

    Ok(session)
}

/// End a session and take its cookie away from the client.
pub(crate) fn end_session(conn: &Connection, session: &Session, cookies: &mut Cookies) -> Result<()> {
    cookies.remove(Cookie::build(SESSION_COOKIE, "").path("/").finish());

    conn.delete_session(&session.id)
}

/// Serve the home page.
#[get("/?<page>")]
pub fn home(
    page: Option<u32>,
    context: Context,
    config: State<Config>,
    conn: Connection,
) -> std::result::Result<HomePage, ErrorPage> {
    HomePage::new(&conn, &config, &context, page.unwrap_or(1))
        .map_err(|err| ErrorPage::new(err, &context))
}

/// The feed is the home page.
#[get("/feed")]
pub fn feed() -> Redirect {
    Redirect::to("/")
}

/// Serve a static file.
#[get("/static/<file..>")]
pub fn static_file(file: PathBuf, config: State<Config>) -> Option<NamedFile> {
    NamedFile::open(config.static_dir.join(file)).ok()
}

/// Serve a community.
#[get("/community/<slug>?<page>", rank = 2)]
pub fn community(
    slug: String,
    page: Option<u32>,
    context: Context,
    config: State<Config>,
    conn: Connection,
) -> std::result::Result<CommunityPage, ErrorPage> {
    CommunityPage::new(&conn, &config, &context, &slug, page.unwrap_or(1))
        .map_err(|err| ErrorPage::new(err, &context))
}

/// Serve the form for creating a post in a community.
#[get("/community/<slug>/create-post")]
pub fn create_post_page(
    slug: String,
    context: Context,
    conn: Connection,
) -> std::result::Result<CreatePostPage, ErrorPage> {
    CreatePostPage::new(&conn, &context, &slug).map_err(|err| ErrorPage::new(err, &context))
}

#[catch(400)]
pub fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("Bad request"))
}

#[catch(401)]
pub fn unauthorized() -> Json<ErrorBody> {
    Json(ErrorBody::new(Error::NotAuthenticated.to_string()))
}

#[catch(404)]
pub fn not_found(req: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new(format!("Nothing found at {}", req.uri().path())))
}

#[catch(422)]
pub fn unprocessable_entity() -> Json<ErrorBody> {
    Json(ErrorBody::new("The request body couldn't be understood"))
}

#[catch(500)]
pub fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new("Internal server error"))
}
