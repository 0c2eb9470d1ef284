//! The JSON API.
//!
//! Failures are reported as JSON bodies by `Error`'s responder.

use chrono::{DateTime, Utc};

use rocket::http::Cookies;
use rocket::response::status::{Created, NoContent};
use rocket::{get, patch, post, uri, State};

use rocket_contrib::json::Json;

use serde::Serialize;

use crate::models::*;
use crate::routes::{end_session, start_session};
use crate::validators::{BlogPayload, CreateCommunity, CreatePost, CreateUser, SignIn, Validate, VotePayload};
use crate::views::{feed_scope, BlogView, CommunityAbout, PostView};
use crate::{config::Config, Error, Result};

/// The signed in user, or an error if nobody is signed in.
fn require_session(session: Option<Session>) -> Result<Session> {
    session.ok_or(Error::NotAuthenticated)
}

/// Register a user.
#[post("/api/user", data = "<payload>")]
pub fn create_user(payload: Json<CreateUser>, conn: Connection) -> Result<Created<Json<User>>> {
    let user = conn.register_user(&payload)?;
    let location = uri!(crate::routes::api::get_user: user.username.as_str()).to_string();

    Ok(Created(location, Some(Json(user))))
}

/// Get a user by their username.
#[get("/api/users/<username>")]
pub fn get_user(username: String, conn: Connection) -> Result<Json<User>> {
    conn.user_by_username(&username)?
        .map(Json)
        .ok_or(Error::UserNotFound { user: username })
}

/// The signed in user and when their session ends.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: User,
    pub expires: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> SessionInfo {
        SessionInfo {
            user: session.user,
            expires: session.expires,
        }
    }
}

/// Sign in.
#[post("/api/auth/sign-in", data = "<payload>")]
pub fn sign_in(
    payload: Json<SignIn>,
    config: State<Config>,
    conn: Connection,
    mut cookies: Cookies,
) -> Result<Json<SessionInfo>> {
    payload.validate()?;

    let user = conn.authenticate(&payload.email, &payload.password)?;
    let session = start_session(&conn, &config, user, &mut cookies)?;

    Ok(Json(SessionInfo::from(session)))
}

/// Sign out.
#[post("/api/auth/sign-out")]
pub fn sign_out(session: Option<Session>, conn: Connection, mut cookies: Cookies) -> Result<NoContent> {
    let session = require_session(session)?;

    end_session(&conn, &session, &mut cookies)?;

    Ok(NoContent)
}

/// Get the current session.
#[get("/api/auth/session")]
pub fn current_session(session: Option<Session>) -> Result<Json<SessionInfo>> {
    Ok(Json(SessionInfo::from(require_session(session)?)))
}

/// Get every community.
#[get("/api/communities")]
pub fn communities(conn: Connection) -> Result<Json<Vec<Community>>> {
    Ok(Json(conn.all_communities()?))
}

/// Create a community. Responds with the name of the new community.
#[post("/api/communities", data = "<payload>")]
pub fn create_community(
    payload: Json<CreateCommunity>,
    session: Option<Session>,
    conn: Connection,
) -> Result<Json<String>> {
    let session = require_session(session)?;
    let community = conn.create_community(&session.user, &payload)?;

    Ok(Json(community.name))
}

/// Get a community with its sidebar information and a page of its posts.
#[get("/api/communities/<slug>?<page>")]
pub fn community(
    slug: String,
    page: Option<u32>,
    session: Option<Session>,
    config: State<Config>,
    conn: Connection,
) -> Result<Json<CommunityAbout>> {
    let viewer = session.as_ref().map(|s| &s.user);
    let community = conn.community_by_slug(&slug)?;
    let page = Page::new(page.unwrap_or(1), config.page_width);

    Ok(Json(CommunityAbout::new(&conn, community, viewer, page)?))
}

/// Whether the user is subscribed to a community after a change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub slug: String,
    pub subscribed: bool,
    pub member_count: i64,
}

/// Subscribe to a community.
#[post("/api/communities/<slug>/subscribe")]
pub fn subscribe(slug: String, session: Option<Session>, conn: Connection) -> Result<Json<SubscriptionStatus>> {
    let session = require_session(session)?;
    let community = conn.community_by_slug(&slug)?;

    conn.subscribe(&session.user, &community)?;

    Ok(Json(SubscriptionStatus {
        member_count: conn.member_count(community.id)?,
        subscribed: true,
        slug: community.slug,
    }))
}

/// Unsubscribe from a community.
#[post("/api/communities/<slug>/unsubscribe")]
pub fn unsubscribe(slug: String, session: Option<Session>, conn: Connection) -> Result<Json<SubscriptionStatus>> {
    let session = require_session(session)?;
    let community = conn.community_by_slug(&slug)?;

    conn.unsubscribe(&session.user, &community)?;

    Ok(Json(SubscriptionStatus {
        member_count: conn.member_count(community.id)?,
        subscribed: false,
        slug: community.slug,
    }))
}

/// Create a post in a community.
#[post("/api/communities/<slug>/posts", data = "<payload>")]
pub fn create_post(
    slug: String,
    payload: Json<CreatePost>,
    session: Option<Session>,
    conn: Connection,
) -> Result<Created<Json<PostView>>> {
    let session = require_session(session)?;
    let community = conn.community_by_slug(&slug)?;
    let post = conn.create_post(&session.user, &community, &payload)?;

    let detail = conn.post_detail(post.id)?;
    let location = uri!(crate::routes::api::get_post: post.id).to_string();

    Ok(Created(location, Some(Json(PostView::new(&detail, Some(&session.user))))))
}

/// A page of a feed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub page: u32,
    pub page_count: u32,
}

/// Get the viewer's feed.
#[get("/api/posts?<page>&<limit>")]
pub fn feed(
    page: Option<u32>,
    limit: Option<u32>,
    session: Option<Session>,
    config: State<Config>,
    conn: Connection,
) -> Result<Json<FeedPage>> {
    let viewer = session.as_ref().map(|s| &s.user);
    let scope = feed_scope(&conn, viewer)?;
    let page = Page::new(page.unwrap_or(1), config.page_width(limit));

    Ok(Json(FeedPage {
        posts: PostView::list(&conn.feed(&scope, page)?, viewer),
        page: page.num,
        page_count: conn.feed_page_count(&scope, page.width)?,
    }))
}

/// Get a post.
#[get("/api/posts/<post_id>")]
pub fn get_post(post_id: PostId, session: Option<Session>, conn: Connection) -> Result<Json<PostView>> {
    let viewer = session.as_ref().map(|s| &s.user);

    Ok(Json(PostView::new(&conn.post_detail(post_id)?, viewer)))
}

/// Vote on a post. Voting the same way twice takes the vote back.
#[patch("/api/posts/<post_id>/vote", data = "<payload>")]
pub fn vote_post(
    post_id: PostId,
    payload: Json<VotePayload>,
    session: Option<Session>,
    conn: Connection,
) -> Result<Json<VoteOutcome>> {
    let session = require_session(session)?;

    Ok(Json(conn.vote(&session.user, post_id, payload.vote_type)?))
}

/// Write a blog.
#[post("/api/blogs", data = "<payload>")]
pub fn create_blog(
    payload: Json<BlogPayload>,
    session: Option<Session>,
    conn: Connection,
) -> Result<Created<Json<BlogView>>> {
    let session = require_session(session)?;
    let blog = conn.create_blog(&session.user, &payload)?;
    let location = uri!(crate::routes::api::get_blog: blog.id).to_string();

    Ok(Created(location, Some(Json(BlogView::from(blog)))))
}

/// Get a page of blogs, newest first.
#[get("/api/blogs?<page>")]
pub fn blogs(page: Option<u32>, config: State<Config>, conn: Connection) -> Result<Json<Vec<BlogView>>> {
    let page = Page::new(page.unwrap_or(1), config.page_width);

    Ok(Json(conn.blog_page(page)?.into_iter().map(BlogView::from).collect()))
}

/// Get a blog.
#[get("/api/blogs/<blog_id>")]
pub fn get_blog(blog_id: BlogId, conn: Connection) -> Result<Json<BlogView>> {
    Ok(Json(BlogView::from(conn.blog(blog_id)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn requires_a_session() {
        match require_session(None) {
            Err(Error::NotAuthenticated) => (),
            other => panic!("unexpected result {:?}", other),
        }

        let session = Session::start(user(), chrono::Duration::hours(1));
        assert_eq!(require_session(Some(session)).map(|s| s.user.id).ok(), Some(1));
    }

    #[test]
    fn session_info_hides_the_password_hash() -> Result<()> {
        let info = SessionInfo::from(Session::start(user(), chrono::Duration::hours(1)));
        let value = serde_json::to_value(&info)?;

        assert_eq!(value["user"]["username"], "alice");
        assert!(value["user"].get("password_hash").is_none());
        assert!(value.get("id").is_none());

        Ok(())
    }

    #[test]
    fn uris() {
        assert_eq!(uri!(crate::routes::api::get_user: "alice").to_string(), "/api/users/alice");
        assert_eq!(uri!(crate::routes::api::get_post: 3).to_string(), "/api/posts/3");
        assert_eq!(uri!(crate::routes::api::get_blog: 3).to_string(), "/api/blogs/3");
    }

    #[test]
    fn subscription_status() -> Result<()> {
        let value = serde_json::to_value(SubscriptionStatus {
            slug: "rust".into(),
            subscribed: true,
            member_count: 2,
        })?;

        assert_eq!(value["memberCount"], 2);

        Ok(())
    }
}
