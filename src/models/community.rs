//! Types related to communities and subscriptions.

use chrono::{DateTime, Utc};

use diesel::prelude::*;
use diesel::Connection as _;
use diesel::{delete, insert_into};

use log::info;

use serde::Serialize;

use crate::models::{unique_violation, Connection, User, UserId};
use crate::schema::{community, subscription};
use crate::validators::{generate_slug, CreateCommunity, Validate};
use crate::{Error, Result};

/// A community ID.
pub type CommunityId = i32;

/// A named discussion group users can subscribe to and post within.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct Community {
    /// The ID of the community.
    pub id: CommunityId,
    /// The unique name of the community.
    pub name: String,
    /// The unique URL-safe form of the name.
    pub slug: String,
    /// When the community was created.
    pub created_at: DateTime<Utc>,
    /// When the community was last changed.
    pub updated_at: DateTime<Utc>,
    /// The user that created the community, if they still exist.
    pub creator_id: Option<UserId>,
}

impl Community {
    /// The URI of the community page.
    pub fn uri(&self) -> String {
        community_uri(&self.slug)
    }

    /// Whether `user` created this community.
    pub fn is_creator(&self, user: Option<&User>) -> bool {
        match (self.creator_id, user) {
            (Some(creator_id), Some(user)) => creator_id == user.id,
            _ => false,
        }
    }
}

/// The URI of the page for the community with this slug.
pub fn community_uri<S>(slug: S) -> String
where
    S: AsRef<str>,
{
    format!("/community/{}", slug.as_ref())
}

/// A new community to be inserted in the database.
#[derive(Debug, Insertable)]
#[table_name = "community"]
pub struct NewCommunity {
    pub name: String,
    pub slug: String,
    pub creator_id: Option<UserId>,
}

/// Membership of a user in a community.
#[derive(Debug, Queryable, Insertable, Serialize)]
#[table_name = "subscription"]
pub struct Subscription {
    pub user_id: UserId,
    pub community_id: CommunityId,
}

/// Convert diesel's not-found error into ours, when we're querying for a
/// community.
fn conv_community_error<S>(slug: S) -> impl FnOnce(diesel::result::Error) -> Error
where
    S: Into<String>,
{
    move |e: diesel::result::Error| match e {
        diesel::result::Error::NotFound => Error::CommunityNotFound { slug: slug.into() },
        _ => Error::from(e),
    }
}

impl Connection {
    /// Get all communities, alphabetically.
    pub fn all_communities(&self) -> Result<Vec<Community>> {
        use crate::schema::community::columns::name;
        use crate::schema::community::dsl::community;

        Ok(community.order(name.asc()).load(&self.inner)?)
    }

    /// Get a community by its slug.
    pub fn community_by_slug<S>(&self, community_slug: S) -> Result<Community>
    where
        S: AsRef<str>,
    {
        use crate::schema::community::columns::slug;
        use crate::schema::community::dsl::community;

        let community_slug = community_slug.as_ref();

        community
            .filter(slug.eq(community_slug))
            .first(&self.inner)
            .map_err(conv_community_error(community_slug))
    }

    /// Get a community by its ID.
    pub fn community(&self, community_id: CommunityId) -> Result<Community> {
        use crate::schema::community::columns::id;
        use crate::schema::community::dsl::community;

        community
            .filter(id.eq(community_id))
            .first(&self.inner)
            .map_err(conv_community_error(community_id.to_string()))
    }

    /// Create a community.
    ///
    /// The creator is subscribed to the new community.
    pub fn create_community(&self, creator: &User, payload: &CreateCommunity) -> Result<Community> {
        payload.validate()?;

        let name = payload.name.trim().to_string();
        let new_community = NewCommunity {
            slug: generate_slug(&name),
            name,
            creator_id: Some(creator.id),
        };

        let created = self.inner.transaction::<_, Error, _>(|| {
            use crate::schema::community::columns as c;
            use crate::schema::community::dsl::community;

            let existing: i64 = community
                .filter(c::name.eq(&new_community.name))
                .or_filter(c::slug.eq(&new_community.slug))
                .count()
                .get_result(&self.inner)?;

            if existing > 0 {
                return Err(Error::CommunityExists {
                    name: new_community.name.clone(),
                });
            }

            let created: Community = insert_into(community)
                .values(&new_community)
                .get_result(&self.inner)
                .map_err(|err| match unique_violation(&err) {
                    Some(_) => Error::CommunityExists {
                        name: new_community.name.clone(),
                    },
                    None => Error::from(err),
                })?;

            self.insert_subscription(creator.id, created.id)?;

            Ok(created)
        })?;

        info!(
            "User {} created community {} ({})",
            creator.id, created.name, created.slug
        );

        Ok(created)
    }

    /// Delete a community with all of its posts and subscriptions.
    pub fn delete_community<S>(&self, community_slug: S) -> Result<()>
    where
        S: AsRef<str>,
    {
        let target = self.community_by_slug(community_slug)?;

        self.inner.transaction::<_, Error, _>(|| {
            use crate::schema::community::dsl::community;
            use crate::schema::post::columns::community_id as post_community;
            use crate::schema::post::dsl::post;
            use crate::schema::subscription::columns::community_id as sub_community;
            use crate::schema::subscription::dsl::subscription;

            // Votes go with their posts.
            delete(post.filter(post_community.eq(target.id))).execute(&self.inner)?;
            delete(subscription.filter(sub_community.eq(target.id))).execute(&self.inner)?;
            delete(community.find(target.id)).execute(&self.inner)?;

            Ok(())
        })?;

        info!("Deleted community {}", target.slug);

        Ok(())
    }

    /// How many users are subscribed to a community.
    pub fn member_count(&self, cid: CommunityId) -> Result<i64> {
        use crate::schema::subscription::columns::community_id;
        use crate::schema::subscription::dsl::subscription;

        Ok(subscription
            .filter(community_id.eq(cid))
            .count()
            .get_result(&self.inner)?)
    }

    /// Whether a user is subscribed to a community.
    pub fn is_subscribed(&self, uid: UserId, cid: CommunityId) -> Result<bool> {
        use crate::schema::subscription::dsl::subscription;

        let count: i64 = subscription
            .find((uid, cid))
            .count()
            .get_result(&self.inner)?;

        Ok(count > 0)
    }

    /// The IDs of every community a user is subscribed to.
    pub fn subscribed_community_ids(&self, uid: UserId) -> Result<Vec<CommunityId>> {
        use crate::schema::subscription::columns::{community_id, user_id};
        use crate::schema::subscription::dsl::subscription;

        Ok(subscription
            .filter(user_id.eq(uid))
            .select(community_id)
            .load(&self.inner)?)
    }

    fn insert_subscription(&self, uid: UserId, cid: CommunityId) -> Result<()> {
        use crate::schema::subscription::dsl::subscription;

        insert_into(subscription)
            .values(&Subscription {
                user_id: uid,
                community_id: cid,
            })
            .execute(&self.inner)?;

        Ok(())
    }

    /// Subscribe a user to a community.
    pub fn subscribe(&self, user: &User, target: &Community) -> Result<()> {
        if self.is_subscribed(user.id, target.id)? {
            return Err(Error::AlreadySubscribed {
                slug: target.slug.clone(),
            });
        }

        self.insert_subscription(user.id, target.id)
            .map_err(|err| match err {
                Error::DatabaseError(ref e) if unique_violation(e).is_some() => {
                    Error::AlreadySubscribed {
                        slug: target.slug.clone(),
                    }
                }
                _ => err,
            })
    }

    /// Unsubscribe a user from a community.
    ///
    /// The creator of a community can't unsubscribe from it.
    pub fn unsubscribe(&self, user: &User, target: &Community) -> Result<()> {
        use crate::schema::subscription::dsl::subscription;

        if target.is_creator(Some(user)) {
            return Err(Error::CreatorCannotUnsubscribe {
                slug: target.slug.clone(),
            });
        }

        let count = delete(subscription.find((user.id, target.id))).execute(&self.inner)?;

        if count == 0 {
            return Err(Error::NotSubscribed {
                slug: target.slug.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn community(creator_id: Option<UserId>) -> Community {
        Community {
            id: 1,
            name: "Rust Lang".into(),
            slug: "rust-lang".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            creator_id,
        }
    }

    #[test]
    fn creator() {
        let c = community(Some(1));

        assert!(c.is_creator(Some(&user(1))));
        assert!(!c.is_creator(Some(&user(2))));
        assert!(!c.is_creator(None));
        assert!(!community(None).is_creator(Some(&user(1))));
    }

    #[test]
    fn uri() {
        assert_eq!(community(None).uri(), "/community/rust-lang");
        assert_eq!(community_uri("abc"), "/community/abc");
    }

    #[test]
    fn not_found_is_converted() {
        let err = conv_community_error("nope")(diesel::result::Error::NotFound);

        match err {
            Error::CommunityNotFound { slug } => assert_eq!(slug, "nope"),
            other => panic!("unexpected error {}", other),
        }
    }
}
