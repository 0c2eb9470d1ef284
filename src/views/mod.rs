//! Views, types to generate layouts.
//!
//! Most of these types are meant to be returned from a route.

use chrono::{DateTime, Utc};

use serde::Serialize;

use rocket::uri;

use crate::models::*;
use crate::render::render_content;
use crate::{config::Config, Error, Result};

pub mod error;
pub mod notice;

pub use error::ErrorPage;
pub use notice::{Notice, NoticeKind};

#[macro_export]
macro_rules! impl_template_responder {
    ($t:ty, $template:expr) => {
        impl<'r> ::rocket::response::Responder<'r> for $t {
            fn respond_to(
                self,
                req: &::rocket::request::Request,
            ) -> ::rocket::response::Result<'r> {
                let data = ::serde_json::value::to_value(self).map_err(|err| {
                    log::error!("Couldn't serialize template data for {}: {}", $template, err);
                    ::rocket::http::Status::InternalServerError
                })?;
                let template = ::rocket_contrib::templates::Template::render($template, data);

                log::trace!("Rendering template at {}", $template);

                template.respond_to(req)
            }
        }
    };
}

/// Per-request information every page needs.
#[derive(Debug)]
pub struct Context {
    /// The name of the site.
    pub site_name: String,
    /// The session of the signed in user.
    pub session: Option<Session>,
    /// A notice carried over from the previous request.
    pub notice: Option<Notice>,
}

impl Context {
    /// The signed in user.
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }

    /// The signed in user, or an error if nobody is signed in.
    pub fn require_user(&self) -> Result<&User> {
        self.user().ok_or(Error::NotAuthenticated)
    }
}

/// Format a date the way it's shown to users, e.g. "October 19, 2026".
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Format a time stamp the way it's shown next to posts.
pub fn format_time_stamp(date: &DateTime<Utc>) -> String {
    date.format("%F %R").to_string()
}

/// A link in the navigation bar.
#[derive(Debug, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub uri: String,
}

/// The navigation bar at the top of every page.
#[derive(Debug, Serialize)]
pub struct NavBar {
    pub site_name: String,
    pub home_uri: String,
    /// The name of the signed in user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub links: Vec<NavLink>,
}

impl NavBar {
    pub fn new<S>(site_name: S, user: Option<&User>) -> NavBar
    where
        S: Into<String>,
    {
        let mut links = vec![NavLink {
            label: "Feed",
            uri: uri!(crate::routes::feed).to_string(),
        }];

        if user.is_some() {
            links.extend(vec![
                NavLink {
                    label: "Create Community",
                    uri: uri!(crate::routes::forms::create_community_page).to_string(),
                },
                NavLink {
                    label: "Sign Out",
                    uri: uri!(crate::routes::forms::sign_out).to_string(),
                },
            ]);
        } else {
            links.extend(vec![
                NavLink {
                    label: "Sign In",
                    uri: uri!(crate::routes::forms::sign_in_page).to_string(),
                },
                NavLink {
                    label: "Sign Up",
                    uri: uri!(crate::routes::forms::sign_up_page).to_string(),
                },
            ]);
        }

        NavBar {
            site_name: site_name.into(),
            home_uri: "/".into(),
            username: user.map(|u| u.username.clone()),
            links,
        }
    }
}

/// Display information for a page.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    /// The title of the page.
    pub title: String,
    pub nav: NavBar,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    /// The verson of the agora server.
    pub version: &'static str,
}

impl PageInfo {
    pub fn new<S>(title: S, context: &Context) -> PageInfo
    where
        S: AsRef<str>,
    {
        PageInfo {
            title: format!("{} - {}", title.as_ref(), context.site_name),
            nav: NavBar::new(context.site_name.clone(), context.user()),
            notice: context.notice.clone(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Show this notice instead of any carried over one.
    pub fn with_notice(mut self, notice: Notice) -> PageInfo {
        self.notice = Some(notice);
        self
    }
}

/// Links to the pages before and after the current one.
#[derive(Debug, Serialize)]
pub struct PageNav {
    pub num: u32,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_uri: Option<String>,
}

impl PageNav {
    pub fn new<S>(base_uri: S, page: Page, count: u32) -> PageNav
    where
        S: AsRef<str>,
    {
        let link = |num: u32| format!("{}?page={}", base_uri.as_ref(), num);

        PageNav {
            num: page.num,
            count,
            prev_uri: if page.num > 1 { Some(link(page.num - 1)) } else { None },
            next_uri: if page.num < count { Some(link(page.num + 1)) } else { None },
        }
    }
}

/// A post as it's shown in a list.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub title: String,
    pub content_html: String,
    pub author: String,
    pub community_name: String,
    pub community_uri: String,
    pub created_at: DateTime<Utc>,
    pub time_stamp: String,
    pub score: i64,
    /// How the viewer voted on the post.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<VoteType>,
    pub vote_uri: String,
}

impl PostView {
    pub fn new(detail: &PostDetail, viewer: Option<&User>) -> PostView {
        PostView {
            id: detail.post.id,
            title: detail.post.title.clone(),
            content_html: render_content(&detail.post.content),
            author: detail.author.username.clone(),
            community_name: detail.community.name.clone(),
            community_uri: detail.community.uri(),
            created_at: detail.post.created_at,
            time_stamp: format_time_stamp(&detail.post.created_at),
            score: detail.score(),
            user_vote: detail.vote_of(viewer),
            vote_uri: uri!(crate::routes::api::vote_post: detail.post.id).to_string(),
        }
    }

    pub fn list(details: &[PostDetail], viewer: Option<&User>) -> Vec<PostView> {
        details.iter().map(|d| PostView::new(d, viewer)).collect()
    }
}

/// A blog as it's shown to readers.
#[derive(Debug, Serialize)]
pub struct BlogView {
    pub id: BlogId,
    pub title: String,
    pub content_html: String,
    pub cover_image: String,
    pub tags: Vec<String>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<Blog> for BlogView {
    fn from(blog: Blog) -> BlogView {
        BlogView {
            id: blog.id,
            content_html: render_content(&blog.content),
            tags: blog.tag_list(),
            title: blog.title,
            cover_image: blog.cover_image,
            author_id: blog.author_id,
            created_at: blog.created_at,
        }
    }
}

/// A link to a community.
#[derive(Debug, Serialize)]
pub struct CommunityLink {
    pub name: String,
    pub uri: String,
}

impl From<&Community> for CommunityLink {
    fn from(community: &Community) -> CommunityLink {
        CommunityLink {
            name: community.name.clone(),
            uri: community.uri(),
        }
    }
}

/// The "About Community" sidebar.
#[derive(Debug, Serialize)]
pub struct CommunitySidebar {
    pub name: String,
    pub slug: String,
    pub uri: String,
    pub create_post_uri: String,
    /// When the community was created, e.g. "October 19, 2026".
    pub created: String,
    pub member_count: i64,
    /// Whether the viewer created the community.
    pub is_creator: bool,
    pub is_subscribed: bool,
}

impl CommunitySidebar {
    pub fn new(conn: &Connection, community: &Community, viewer: Option<&User>) -> Result<CommunitySidebar> {
        let member_count = conn.member_count(community.id)?;
        let is_subscribed = match viewer {
            Some(user) => conn.is_subscribed(user.id, community.id)?,
            None => false,
        };

        Ok(CommunitySidebar::from_parts(
            community,
            member_count,
            viewer,
            is_subscribed,
        ))
    }

    pub fn from_parts(
        community: &Community,
        member_count: i64,
        viewer: Option<&User>,
        is_subscribed: bool,
    ) -> CommunitySidebar {
        CommunitySidebar {
            name: community.name.clone(),
            slug: community.slug.clone(),
            uri: community.uri(),
            create_post_uri: uri!(crate::routes::create_post_page: community.slug.as_str()).to_string(),
            created: format_date(&community.created_at),
            member_count,
            is_creator: community.is_creator(viewer),
            is_subscribed,
        }
    }
}

/// A community with its sidebar information and posts, for the JSON API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityAbout {
    pub community: Community,
    pub created: String,
    pub member_count: i64,
    pub is_creator: bool,
    pub is_subscribed: bool,
    pub posts: Vec<PostView>,
}

impl CommunityAbout {
    pub fn new(conn: &Connection, community: Community, viewer: Option<&User>, page: Page) -> Result<CommunityAbout> {
        let sidebar = CommunitySidebar::new(conn, &community, viewer)?;
        let posts = PostView::list(&conn.community_posts(&community, page)?, viewer);

        Ok(CommunityAbout {
            community,
            created: sidebar.created,
            member_count: sidebar.member_count,
            is_creator: sidebar.is_creator,
            is_subscribed: sidebar.is_subscribed,
            posts,
        })
    }
}

/// The feed the viewer sees on the home page.
pub fn feed_scope(conn: &Connection, viewer: Option<&User>) -> Result<FeedScope> {
    match viewer {
        Some(user) => Ok(FeedScope::for_subscriptions(
            conn.subscribed_community_ids(user.id)?,
        )),
        None => Ok(FeedScope::All),
    }
}

/// The home page.
#[derive(Debug, Serialize)]
pub struct HomePage {
    pub page_info: PageInfo,
    pub posts: Vec<PostView>,
    pub communities: Vec<CommunityLink>,
    pub page_nav: PageNav,
}

impl HomePage {
    pub fn new(conn: &Connection, config: &Config, context: &Context, page_num: u32) -> Result<HomePage> {
        let viewer = context.user();
        let scope = feed_scope(conn, viewer)?;
        let page = Page::new(page_num, config.page_width);
        let page_count = conn.feed_page_count(&scope, page.width)?;

        Ok(HomePage {
            page_info: PageInfo::new("Home", context),
            posts: PostView::list(&conn.feed(&scope, page)?, viewer),
            communities: conn.all_communities()?.iter().map(CommunityLink::from).collect(),
            page_nav: PageNav::new("/", page, page_count),
        })
    }
}

impl_template_responder!(HomePage, "pages/home");

/// The page of a community.
#[derive(Debug, Serialize)]
pub struct CommunityPage {
    pub page_info: PageInfo,
    pub sidebar: CommunitySidebar,
    pub posts: Vec<PostView>,
    pub page_nav: PageNav,
}

impl CommunityPage {
    pub fn new<S>(conn: &Connection, config: &Config, context: &Context, slug: S, page_num: u32) -> Result<CommunityPage>
    where
        S: AsRef<str>,
    {
        let viewer = context.user();
        let community = conn.community_by_slug(slug)?;
        let page = Page::new(page_num, config.page_width);
        let scope = FeedScope::Communities(vec![community.id]);
        let page_count = conn.feed_page_count(&scope, page.width)?;

        Ok(CommunityPage {
            page_info: PageInfo::new(&community.name, context),
            sidebar: CommunitySidebar::new(conn, &community, viewer)?,
            posts: PostView::list(&conn.community_posts(&community, page)?, viewer),
            page_nav: PageNav::new(community.uri(), page, page_count),
        })
    }
}

impl_template_responder!(CommunityPage, "pages/community");

/// The form for creating a post in a community.
#[derive(Debug, Serialize)]
pub struct CreatePostPage {
    pub page_info: PageInfo,
    pub sidebar: CommunitySidebar,
    /// The title to fill the form with.
    pub title: String,
    /// The content to fill the form with.
    pub content: String,
}

impl CreatePostPage {
    pub fn new<S>(conn: &Connection, context: &Context, slug: S) -> Result<CreatePostPage>
    where
        S: AsRef<str>,
    {
        let community = conn.community_by_slug(slug)?;

        Ok(CreatePostPage {
            page_info: PageInfo::new(format!("Create Post in {}", community.name), context),
            sidebar: CommunitySidebar::new(conn, &community, context.user())?,
            title: String::new(),
            content: String::new(),
        })
    }

    /// Show the form again after a failed attempt.
    pub fn retry(mut self, notice: Notice, title: String, content: String) -> CreatePostPage {
        self.page_info = self.page_info.with_notice(notice);
        self.title = title;
        self.content = content;
        self
    }
}

impl_template_responder!(CreatePostPage, "pages/create-post");

/// The form for creating a community.
#[derive(Debug, Serialize)]
pub struct CreateCommunityPage {
    pub page_info: PageInfo,
    /// The name to fill the form with.
    pub name: String,
}

impl CreateCommunityPage {
    pub fn new(context: &Context) -> CreateCommunityPage {
        CreateCommunityPage {
            page_info: PageInfo::new("Create Community", context),
            name: String::new(),
        }
    }

    pub fn retry(context: &Context, notice: Notice, name: String) -> CreateCommunityPage {
        CreateCommunityPage {
            page_info: PageInfo::new("Create Community", context).with_notice(notice),
            name,
        }
    }
}

impl_template_responder!(CreateCommunityPage, "pages/create-community");

/// The sign up form.
#[derive(Debug, Serialize)]
pub struct SignUpPage {
    pub page_info: PageInfo,
    pub username: String,
    pub email: String,
}

impl SignUpPage {
    pub fn new(context: &Context) -> SignUpPage {
        SignUpPage {
            page_info: PageInfo::new("Sign Up", context),
            username: String::new(),
            email: String::new(),
        }
    }

    pub fn retry(context: &Context, notice: Notice, username: String, email: String) -> SignUpPage {
        SignUpPage {
            page_info: PageInfo::new("Sign Up", context).with_notice(notice),
            username,
            email,
        }
    }
}

impl_template_responder!(SignUpPage, "pages/sign-up");

/// The sign in form.
#[derive(Debug, Serialize)]
pub struct SignInPage {
    pub page_info: PageInfo,
    pub email: String,
}

impl SignInPage {
    pub fn new(context: &Context) -> SignInPage {
        SignInPage {
            page_info: PageInfo::new("Sign In", context),
            email: String::new(),
        }
    }

    pub fn retry(context: &Context, notice: Notice, email: String) -> SignInPage {
        SignInPage {
            page_info: PageInfo::new("Sign In", context).with_notice(notice),
            email,
        }
    }
}

impl_template_responder!(SignInPage, "pages/sign-in");

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn user(id: UserId) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn community() -> Community {
        Community {
            id: 4,
            name: "Rust Lang".into(),
            slug: "rust-lang".into(),
            created_at: Utc.ymd(2026, 10, 9).and_hms(12, 0, 0),
            updated_at: Utc.ymd(2026, 10, 9).and_hms(12, 0, 0),
            creator_id: Some(1),
        }
    }

    fn context(user: Option<User>) -> Context {
        Context {
            site_name: "agora".into(),
            session: user.map(|u| Session::start(u, chrono::Duration::hours(1))),
            notice: None,
        }
    }

    #[test]
    fn dates() {
        assert_eq!(format_date(&Utc.ymd(2026, 10, 9).and_hms(0, 0, 0)), "October 9, 2026");
        assert_eq!(format_date(&Utc.ymd(2023, 1, 31).and_hms(23, 59, 0)), "January 31, 2023");
    }

    #[test]
    fn nav_bar_signed_out() {
        let nav = NavBar::new("agora", None);
        let labels: Vec<&str> = nav.links.iter().map(|l| l.label).collect();

        assert_eq!(labels, vec!["Feed", "Sign In", "Sign Up"]);
        assert_eq!(nav.links[0].uri, "/feed");
        assert_eq!(nav.links[1].uri, "/user/sign-in");
        assert_eq!(nav.links[2].uri, "/user/sign-up");
        assert!(nav.username.is_none());
        assert_eq!(nav.home_uri, "/");
    }

    #[test]
    fn nav_bar_signed_in() {
        let u = user(3);
        let nav = NavBar::new("agora", Some(&u));
        let labels: Vec<&str> = nav.links.iter().map(|l| l.label).collect();

        assert_eq!(labels, vec!["Feed", "Create Community", "Sign Out"]);
        assert_eq!(nav.links[0].uri, "/feed");
        assert_eq!(nav.links[1].uri, "/community/create");
        assert_eq!(nav.links[2].uri, "/user/sign-out");
        assert_eq!(nav.username.as_ref().map(String::as_str), Some("user3"));
    }

    #[test]
    fn sidebar() {
        let c = community();

        let creator = user(1);
        let sidebar = CommunitySidebar::from_parts(&c, 12, Some(&creator), true);
        assert_eq!(sidebar.created, "October 9, 2026");
        assert_eq!(sidebar.member_count, 12);
        assert!(sidebar.is_creator);
        assert_eq!(sidebar.uri, "/community/rust-lang");
        assert_eq!(sidebar.create_post_uri, "/community/rust-lang/create-post");

        let other = user(2);
        assert!(!CommunitySidebar::from_parts(&c, 12, Some(&other), false).is_creator);
        assert!(!CommunitySidebar::from_parts(&c, 12, None, false).is_creator);
    }

    #[test]
    fn page_info() {
        let info = PageInfo::new("Home", &context(None));
        assert_eq!(info.title, "Home - agora");
        assert!(info.notice.is_none());

        let info = info.with_notice(Notice::success("hi"));
        assert_eq!(info.notice, Some(Notice::success("hi")));
    }

    #[test]
    fn require_user() {
        assert!(context(None).require_user().is_err());
        assert_eq!(context(Some(user(5))).require_user().map(|u| u.id).ok(), Some(5));
    }

    #[test]
    fn page_nav() {
        let nav = PageNav::new("/", Page::new(1, 10), 3);
        assert!(nav.prev_uri.is_none());
        assert_eq!(nav.next_uri.as_ref().map(String::as_str), Some("/?page=2"));

        let nav = PageNav::new("/community/rust", Page::new(3, 10), 3);
        assert_eq!(
            nav.prev_uri.as_ref().map(String::as_str),
            Some("/community/rust?page=2")
        );
        assert!(nav.next_uri.is_none());

        let nav = PageNav::new("/", Page::new(1, 10), 0);
        assert!(nav.prev_uri.is_none() && nav.next_uri.is_none());
    }

    #[test]
    fn post_view() {
        let c = community();
        let detail = PostDetail {
            post: Post {
                id: 8,
                title: "Hello".into(),
                content: "**hi**".into(),
                created_at: Utc.ymd(2026, 10, 19).and_hms(9, 30, 0),
                updated_at: Utc.ymd(2026, 10, 19).and_hms(9, 30, 0),
                author_id: 2,
                community_id: c.id,
            },
            author: user(2),
            community: c,
            votes: vec![
                Vote {
                    user_id: 1,
                    post_id: 8,
                    vote_type: VoteType::Up,
                },
                Vote {
                    user_id: 2,
                    post_id: 8,
                    vote_type: VoteType::Up,
                },
            ],
        };

        let viewer = user(1);
        let view = PostView::new(&detail, Some(&viewer));

        assert_eq!(view.score, 2);
        assert_eq!(view.user_vote, Some(VoteType::Up));
        assert_eq!(view.content_html, "<p><strong>hi</strong></p>\n");
        assert_eq!(view.time_stamp, "2026-10-19 09:30");
        assert_eq!(view.community_uri, "/community/rust-lang");
        assert_eq!(view.vote_uri, "/api/posts/8/vote");
        assert_eq!(PostView::new(&detail, None).user_vote, None);
    }

    #[test]
    fn blog_view() {
        let view = BlogView::from(Blog {
            id: 1,
            title: "Title".into(),
            content: "# Head".into(),
            cover_image: "https://example.com/a.png".into(),
            tags: "rust, web".into(),
            author_id: 1,
            created_at: Utc::now(),
        });

        assert_eq!(view.tags, vec!["rust", "web"]);
        assert_eq!(view.content_html, "<h1>Head</h1>\n");
    }
}
