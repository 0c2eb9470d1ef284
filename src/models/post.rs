//! Types related to posts and votes.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use derive_more::Display;

use diesel::prelude::*;
use diesel::Connection as _;
use diesel::{delete, insert_into, update};

use log::debug;

use serde::{Deserialize, Serialize};

use crate::models::{Community, CommunityId, Connection, Page, User, UserId};
use crate::schema::{post, vote};
use crate::validators::{CreatePost, Validate};
use crate::{Error, Result};

/// A post ID.
pub type PostId = i32;

/// User-authored content within a community.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct Post {
    /// The ID of the post.
    pub id: PostId,
    /// The title of the post.
    pub title: String,
    /// The Markdown source of the post.
    pub content: String,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// When the post was last edited.
    pub updated_at: DateTime<Utc>,
    /// The user that wrote the post.
    pub author_id: UserId,
    /// The community the post was posted in.
    pub community_id: CommunityId,
}

/// A new post to be inserted in the database.
#[derive(Debug, Insertable)]
#[table_name = "post"]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    pub community_id: CommunityId,
}

/// Which way a vote goes.
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
)]
#[sql_type = "sql_types::VoteType"]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteType {
    #[display(fmt = "UP")]
    Up,
    #[display(fmt = "DOWN")]
    Down,
}

impl VoteType {
    /// What this vote adds to a post's score.
    pub fn weight(self) -> i64 {
        match self {
            VoteType::Up => 1,
            VoteType::Down => -1,
        }
    }
}

impl FromStr for VoteType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            _ => Err(Error::UnknownVoteType {
                vote_type: s.to_string(),
            }),
        }
    }
}

pub mod sql_types {
    //! Boilerplate for dealing with PostgreSQL enums with diesel.

    use std::io::Write;

    use diesel::deserialize::{Result as DeserializeResult, *};
    use diesel::pg::Pg;
    use diesel::serialize::{Result as SerializeResult, *};

    #[derive(SqlType, QueryId)]
    #[postgres(type_name = "vote_type")]
    pub struct VoteType;

    impl ToSql<VoteType, Pg> for super::VoteType {
        fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> SerializeResult {
            out.write_all(self.to_string().to_lowercase().as_bytes())?;
            Ok(IsNull::No)
        }
    }

    impl FromSql<VoteType, Pg> for super::VoteType {
        fn from_sql(bytes: Option<&[u8]>) -> DeserializeResult<Self> {
            std::str::from_utf8(not_none!(bytes))?
                .parse::<super::VoteType>()
                .map_err(|err| err.to_string().into())
        }
    }
}

/// A user's vote on a post.
#[derive(Clone, Debug, Queryable, Insertable, Serialize)]
#[table_name = "vote"]
pub struct Vote {
    pub user_id: UserId,
    pub post_id: PostId,
    pub vote_type: VoteType,
}

/// What to do with a user's vote on a post when they vote again.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoteChange {
    /// There was no vote, add one.
    Insert(VoteType),
    /// The user voted the other way, flip the vote.
    Update(VoteType),
    /// The user voted the same way twice, take the vote back.
    Remove,
}

impl VoteChange {
    /// Decide what a new vote does given the user's existing vote.
    pub fn resolve(existing: Option<VoteType>, requested: VoteType) -> VoteChange {
        match existing {
            None => VoteChange::Insert(requested),
            Some(current) if current == requested => VoteChange::Remove,
            Some(_) => VoteChange::Update(requested),
        }
    }

    /// The user's vote after the change.
    pub fn result(self) -> Option<VoteType> {
        match self {
            VoteChange::Insert(vote_type) | VoteChange::Update(vote_type) => Some(vote_type),
            VoteChange::Remove => None,
        }
    }
}

/// The score of a post from its votes.
pub fn score<'a, I>(votes: I) -> i64
where
    I: IntoIterator<Item = &'a Vote>,
{
    votes.into_iter().map(|v| v.vote_type.weight()).sum()
}

/// A post with its author, community and votes.
#[derive(Clone, Debug)]
pub struct PostDetail {
    pub post: Post,
    pub author: User,
    pub community: Community,
    pub votes: Vec<Vote>,
}

impl PostDetail {
    pub fn score(&self) -> i64 {
        score(&self.votes)
    }

    /// The vote a user cast on this post, if any.
    pub fn vote_of(&self, user: Option<&User>) -> Option<VoteType> {
        let user = user?;

        self.votes
            .iter()
            .find(|v| v.user_id == user.id)
            .map(|v| v.vote_type)
    }
}

/// The result of voting on a post.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub post_id: PostId,
    pub score: i64,
    pub vote_type: Option<VoteType>,
}

/// Which posts a feed is made of.
#[derive(Clone, Debug, PartialEq)]
pub enum FeedScope {
    /// Posts from every community.
    All,
    /// Posts from these communities.
    Communities(Vec<CommunityId>),
}

impl FeedScope {
    /// The feed for a signed in user is their subscriptions, unless they
    /// haven't subscribed to anything.
    pub fn for_subscriptions(subscriptions: Vec<CommunityId>) -> FeedScope {
        if subscriptions.is_empty() {
            FeedScope::All
        } else {
            FeedScope::Communities(subscriptions)
        }
    }
}

/// Convert diesel's not-found error into ours, when we're querying for a post.
fn conv_post_error(post_id: PostId) -> impl FnOnce(diesel::result::Error) -> Error {
    move |e: diesel::result::Error| match e {
        diesel::result::Error::NotFound => Error::PostNotFound { post_id },
        _ => Error::from(e),
    }
}

/// How many times a vote is resolved before giving up on a post that keeps
/// changing under it.
const VOTE_ATTEMPTS: usize = 3;

/// Resolve and write a vote.
///
/// `read` gets the user's current vote and `write` applies a change,
/// returning `false` when an insert found a vote the same user made at the
/// same time. The vote is then resolved again against that vote.
fn apply_vote<R, W>(target: PostId, requested: VoteType, mut read: R, mut write: W) -> Result<VoteChange>
where
    R: FnMut() -> Result<Option<VoteType>>,
    W: FnMut(VoteChange) -> Result<bool>,
{
    for _ in 0..VOTE_ATTEMPTS {
        let change = VoteChange::resolve(read()?, requested);

        if write(change)? {
            return Ok(change);
        }

        debug!("Vote on post #{} raced another vote, resolving again", target);
    }

    Err(Error::VoteConflict { post_id: target })
}

impl Connection {
    /// Get a post.
    pub fn post(&self, post_id: PostId) -> Result<Post> {
        use crate::schema::post::dsl::post;

        post.find(post_id)
            .first(&self.inner)
            .map_err(conv_post_error(post_id))
    }

    /// Get a post with its author, community and votes.
    pub fn post_detail(&self, post_id: PostId) -> Result<PostDetail> {
        let post = self.post(post_id)?;
        let author = self.user(post.author_id)?;
        let community = self.community(post.community_id)?;
        let votes = self
            .votes_for_posts(&[post_id])?
            .remove(&post_id)
            .unwrap_or_default();

        Ok(PostDetail {
            post,
            author,
            community,
            votes,
        })
    }

    /// Create a post in a community.
    ///
    /// Only subscribers of a community can post in it.
    pub fn create_post(&self, author: &User, target: &Community, payload: &CreatePost) -> Result<Post> {
        use crate::schema::post::dsl::post;

        payload.validate()?;

        if !self.is_subscribed(author.id, target.id)? {
            return Err(Error::SubscriptionRequired {
                slug: target.slug.clone(),
            });
        }

        let new_post = NewPost {
            title: payload.title.trim().to_string(),
            content: payload.content.clone(),
            author_id: author.id,
            community_id: target.id,
        };

        let created: Post = insert_into(post).values(&new_post).get_result(&self.inner)?;

        debug!("User {} posted #{} in {}", author.id, created.id, target.slug);

        Ok(created)
    }

    /// Get a page of posts in a community, newest first.
    pub fn community_posts(&self, target: &Community, page: Page) -> Result<Vec<PostDetail>> {
        self.feed(&FeedScope::Communities(vec![target.id]), page)
    }

    /// How many pages of posts a feed has.
    pub fn feed_page_count(&self, scope: &FeedScope, page_width: u32) -> Result<u32> {
        use crate::schema::post::columns::community_id;
        use crate::schema::post::dsl::post;

        let count: i64 = match scope {
            FeedScope::All => post.count().get_result(&self.inner)?,
            FeedScope::Communities(ids) => post
                .filter(community_id.eq_any(ids))
                .count()
                .get_result(&self.inner)?,
        };

        Ok(Page::count(count, page_width))
    }

    /// Get a page of posts, newest first.
    pub fn feed(&self, scope: &FeedScope, page: Page) -> Result<Vec<PostDetail>> {
        use crate::schema::app_user::dsl::app_user;
        use crate::schema::community::dsl::community;
        use crate::schema::post::columns::{community_id, created_at, id};
        use crate::schema::post::dsl::post;

        let query = post
            .inner_join(app_user)
            .inner_join(community)
            .order((created_at.desc(), id.desc()))
            .limit(i64::from(page.width))
            .offset(page.offset())
            .into_boxed();

        let query = match scope {
            FeedScope::All => query,
            FeedScope::Communities(ids) => query.filter(community_id.eq_any(ids.clone())),
        };

        let rows: Vec<(Post, User, Community)> = query.load(&self.inner)?;

        let post_ids: Vec<PostId> = rows.iter().map(|(p, _, _)| p.id).collect();
        let mut votes = self.votes_for_posts(&post_ids)?;

        Ok(rows
            .into_iter()
            .map(|(post_row, author, post_community)| PostDetail {
                votes: votes.remove(&post_row.id).unwrap_or_default(),
                post: post_row,
                author,
                community: post_community,
            })
            .collect())
    }

    /// Get every vote on the given posts, grouped by post.
    pub fn votes_for_posts(&self, post_ids: &[PostId]) -> Result<HashMap<PostId, Vec<Vote>>> {
        use crate::schema::vote::columns::post_id;
        use crate::schema::vote::dsl::vote;

        let mut grouped: HashMap<PostId, Vec<Vote>> = HashMap::new();

        if post_ids.is_empty() {
            return Ok(grouped);
        }

        let votes: Vec<Vote> = vote
            .filter(post_id.eq_any(post_ids))
            .load(&self.inner)?;

        for v in votes {
            grouped.entry(v.post_id).or_insert_with(Vec::new).push(v);
        }

        Ok(grouped)
    }

    /// Vote on a post.
    ///
    /// Voting the same way twice takes the vote back.
    pub fn vote(&self, user: &User, target: PostId, vote_type: VoteType) -> Result<VoteOutcome> {
        use crate::schema::vote::columns::{post_id, user_id, vote_type as column_vote_type};
        use crate::schema::vote::dsl::vote;

        self.post(target)?;

        let change = self.inner.transaction::<_, Error, _>(|| {
            apply_vote(
                target,
                vote_type,
                || {
                    vote.find((user.id, target))
                        .select(column_vote_type)
                        .first(&self.inner)
                        .optional()
                        .map_err(Error::from)
                },
                |change| match change {
                    VoteChange::Insert(new_type) => {
                        let inserted = insert_into(vote)
                            .values(&Vote {
                                user_id: user.id,
                                post_id: target,
                                vote_type: new_type,
                            })
                            .on_conflict_do_nothing()
                            .execute(&self.inner)?;

                        Ok(inserted > 0)
                    }
                    VoteChange::Update(new_type) => {
                        update(vote.find((user.id, target)))
                            .set(column_vote_type.eq(new_type))
                            .execute(&self.inner)?;

                        Ok(true)
                    }
                    VoteChange::Remove => {
                        delete(vote.filter(user_id.eq(user.id)).filter(post_id.eq(target)))
                            .execute(&self.inner)?;

                        Ok(true)
                    }
                },
            )
        })?;

        let votes = self
            .votes_for_posts(&[target])?
            .remove(&target)
            .unwrap_or_default();

        Ok(VoteOutcome {
            post_id: target,
            score: score(&votes),
            vote_type: change.result(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(user_id: UserId, vote_type: VoteType) -> Vote {
        Vote {
            user_id,
            post_id: 1,
            vote_type,
        }
    }

    #[test]
    fn vote_that_loses_an_insert_race_is_resolved_again() -> Result<()> {
        // Another request inserts an up vote between our read and our insert.
        let mut stored = vec![None, Some(VoteType::Up)].into_iter();
        let mut writes = Vec::new();

        let change = apply_vote(
            1,
            VoteType::Up,
            || Ok(stored.next().unwrap_or(None)),
            |change| {
                writes.push(change);
                Ok(change != VoteChange::Insert(VoteType::Up))
            },
        )?;

        assert_eq!(change, VoteChange::Remove);
        assert_eq!(writes, vec![VoteChange::Insert(VoteType::Up), VoteChange::Remove]);

        Ok(())
    }

    #[test]
    fn vote_gives_up_after_repeated_races() {
        let result = apply_vote(7, VoteType::Down, || Ok(None), |_| Ok(false));

        match result {
            Err(Error::VoteConflict { post_id: 7 }) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn vote_resolution() {
        use VoteType::*;

        assert_eq!(VoteChange::resolve(None, Up), VoteChange::Insert(Up));
        assert_eq!(VoteChange::resolve(Some(Up), Up), VoteChange::Remove);
        assert_eq!(VoteChange::resolve(Some(Up), Down), VoteChange::Update(Down));
        assert_eq!(VoteChange::resolve(Some(Down), Down), VoteChange::Remove);

        assert_eq!(VoteChange::Remove.result(), None);
        assert_eq!(VoteChange::Update(Down).result(), Some(Down));
    }

    #[test]
    fn scores() {
        let votes = vec![
            vote(1, VoteType::Up),
            vote(2, VoteType::Up),
            vote(3, VoteType::Down),
        ];

        assert_eq!(score(&votes), 1);
        assert_eq!(score(&Vec::new()), 0);
    }

    #[test]
    fn vote_type_names() -> Result<()> {
        assert_eq!("UP".parse::<VoteType>()?, VoteType::Up);
        assert_eq!("down".parse::<VoteType>()?, VoteType::Down);
        assert!("sideways".parse::<VoteType>().is_err());

        assert_eq!(serde_json::to_string(&VoteType::Down)?, "\"DOWN\"");
        assert_eq!(serde_json::from_str::<VoteType>("\"UP\"")?, VoteType::Up);

        Ok(())
    }

    #[test]
    fn feed_scope() {
        assert_eq!(FeedScope::for_subscriptions(vec![]), FeedScope::All);
        assert_eq!(
            FeedScope::for_subscriptions(vec![3, 4]),
            FeedScope::Communities(vec![3, 4])
        );
    }

    #[test]
    fn post_not_found_is_converted() {
        match conv_post_error(9)(diesel::result::Error::NotFound) {
            Error::PostNotFound { post_id } => assert_eq!(post_id, 9),
            other => panic!("unexpected error {}", other),
        }
    }
}
