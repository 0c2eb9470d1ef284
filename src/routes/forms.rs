//! Routes for the HTML forms: signing up and in, and creating communities and
//! posts.
//!
//! A successful submission redirects with a flash notice. A failed one shows
//! the form again with a notice explaining what went wrong.

use log::warn;

use rocket::http::uri::Origin;
use rocket::http::{Cookies, Status};
use rocket::request::{Form, Request};
use rocket::response::{self, Flash, Redirect, Responder};
use rocket::{get, post, State};

use crate::models::*;
use crate::routes::{end_session, start_session};
use crate::validators::{CreateCommunity, CreatePost, CreateUser, SignIn, Validate};
use crate::views::*;
use crate::{config::Config, Error};

/// Why a form submission didn't redirect.
#[derive(Debug)]
pub enum FormFailure<P> {
    /// Show the form again, with this status.
    Retry(Status, P),
    /// The page the form is on couldn't be shown at all.
    Error(ErrorPage),
}

impl<'r, P> Responder<'r> for FormFailure<P>
where
    P: Responder<'r>,
{
    fn respond_to(self, req: &Request) -> response::Result<'r> {
        match self {
            FormFailure::Retry(status, page) => {
                let mut res = page.respond_to(req)?;
                res.set_status(status);
                Ok(res)
            }
            FormFailure::Error(page) => page.respond_to(req),
        }
    }
}

type FormResult<P> = std::result::Result<Flash<Redirect>, FormFailure<P>>;

/// Redirect to a path we built ourselves.
fn redirect_to(path: String) -> Redirect {
    match Origin::parse_owned(path) {
        Ok(origin) => Redirect::to(origin),
        Err(err) => {
            warn!("Couldn't redirect to an invalid path: {}", err);
            Redirect::to("/")
        }
    }
}

/// Serve the sign up form.
#[get("/user/sign-up")]
pub fn sign_up_page(context: Context) -> SignUpPage {
    SignUpPage::new(&context)
}

/// Sign up.
#[post("/user/sign-up", data = "<form>")]
pub fn sign_up(form: Form<CreateUser>, context: Context, conn: Connection) -> FormResult<SignUpPage> {
    match conn.register_user(&form) {
        Ok(_) => Ok(Flash::success(
            Redirect::to("/user/sign-in"),
            Notice::user_created().title,
        )),
        Err(err) => {
            err.log();
            let page = SignUpPage::retry(
                &context,
                Notice::sign_up_error(&err),
                form.username.clone(),
                form.email.clone(),
            );
            Err(FormFailure::Retry(err.status(), page))
        }
    }
}

/// Serve the sign in form.
#[get("/user/sign-in")]
pub fn sign_in_page(context: Context) -> SignInPage {
    SignInPage::new(&context)
}

/// Sign in.
#[post("/user/sign-in", data = "<form>")]
pub fn sign_in(
    form: Form<SignIn>,
    context: Context,
    config: State<Config>,
    conn: Connection,
    mut cookies: Cookies,
) -> FormResult<SignInPage> {
    let result = form
        .validate()
        .map_err(Error::from)
        .and_then(|_| conn.authenticate(&form.email, &form.password))
        .and_then(|user| start_session(&conn, &config, user, &mut cookies));

    match result {
        Ok(session) => Ok(Flash::success(
            Redirect::to("/"),
            format!("Signed in as {}.", session.user.username),
        )),
        Err(err) => {
            err.log();
            let page = SignInPage::retry(&context, Notice::sign_in_error(&err), form.email.clone());
            Err(FormFailure::Retry(err.status(), page))
        }
    }
}

/// Sign out.
#[get("/user/sign-out")]
pub fn sign_out(session: Option<Session>, conn: Connection, mut cookies: Cookies) -> Flash<Redirect> {
    if let Some(session) = session {
        if let Err(err) = end_session(&conn, &session, &mut cookies) {
            err.log();
            return Flash::error(Redirect::to("/"), "Could not sign out.");
        }
    }

    Flash::success(Redirect::to("/"), "Signed out.")
}

/// Serve the form for creating a community.
#[get("/community/create", rank = 1)]
pub fn create_community_page(context: Context) -> CreateCommunityPage {
    CreateCommunityPage::new(&context)
}

/// Create a community.
#[post("/community/create", data = "<form>")]
pub fn create_community(
    form: Form<CreateCommunity>,
    context: Context,
    conn: Connection,
) -> FormResult<CreateCommunityPage> {
    let result = context
        .require_user()
        .and_then(|user| conn.create_community(user, &form));

    match result {
        Ok(community) => Ok(Flash::success(
            redirect_to(community.uri()),
            Notice::community_created(&community.name).title,
        )),
        Err(err) => {
            err.log();
            let page = CreateCommunityPage::retry(
                &context,
                Notice::community_error(&err),
                form.name.clone(),
            );
            Err(FormFailure::Retry(err.status(), page))
        }
    }
}

/// Create a post in a community.
#[post("/community/<slug>/create-post", data = "<form>")]
pub fn create_post(
    slug: String,
    form: Form<CreatePost>,
    context: Context,
    conn: Connection,
) -> FormResult<CreatePostPage> {
    let community = match conn.community_by_slug(&slug) {
        Ok(community) => community,
        Err(err) => return Err(FormFailure::Error(ErrorPage::new(err, &context))),
    };

    let result = context
        .require_user()
        .and_then(|user| conn.create_post(user, &community, &form));

    match result {
        Ok(_) => Ok(Flash::success(redirect_to(community.uri()), "Your post was published.")),
        Err(err) => {
            err.log();
            let notice = Notice::post_error(&err);
            let page = match CreatePostPage::new(&conn, &context, &slug) {
                Ok(page) => page,
                Err(err) => return Err(FormFailure::Error(ErrorPage::new(err, &context))),
            };
            let page = page.retry(notice, form.title.clone(), form.content.clone());
            Err(FormFailure::Retry(err.status(), page))
        }
    }
}

