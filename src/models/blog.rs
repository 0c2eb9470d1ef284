//! Types related to blogs.

use chrono::{DateTime, Utc};

use diesel::insert_into;
use diesel::prelude::*;

use serde::Serialize;

use crate::models::{Connection, Page, User, UserId};
use crate::schema::blog;
use crate::validators::{BlogPayload, Validate};
use crate::{Error, Result};

/// A blog ID.
pub type BlogId = i32;

/// A long-form article written by a user.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct Blog {
    pub id: BlogId,
    pub title: String,
    /// The Markdown source of the blog.
    pub content: String,
    /// The URL of the cover image.
    pub cover_image: String,
    /// A comma separated list of tags.
    pub tags: String,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Blog {
    /// The tags of the blog, without blanks.
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }
}

/// Split a comma separated list of tags.
pub fn split_tags<S>(tags: S) -> Vec<String>
where
    S: AsRef<str>,
{
    tags.as_ref()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug, Insertable)]
#[table_name = "blog"]
pub struct NewBlog {
    pub title: String,
    pub content: String,
    pub cover_image: String,
    pub tags: String,
    pub author_id: UserId,
}

impl Connection {
    /// Create a blog.
    pub fn create_blog(&self, author: &User, payload: &BlogPayload) -> Result<Blog> {
        use crate::schema::blog::dsl::blog;

        payload.validate()?;

        let new_blog = NewBlog {
            title: payload.title.clone(),
            content: payload.content.clone(),
            cover_image: payload.cover_image.trim().to_string(),
            tags: split_tags(&payload.tags).join(", "),
            author_id: author.id,
        };

        Ok(insert_into(blog).values(&new_blog).get_result(&self.inner)?)
    }

    /// Get a blog.
    pub fn blog(&self, blog_id: BlogId) -> Result<Blog> {
        use crate::schema::blog::dsl::blog;

        blog.find(blog_id)
            .first(&self.inner)
            .optional()?
            .ok_or(Error::BlogNotFound { blog_id })
    }

    /// Get a page of blogs, newest first.
    pub fn blog_page(&self, page: Page) -> Result<Vec<Blog>> {
        use crate::schema::blog::columns::{created_at, id};
        use crate::schema::blog::dsl::blog;

        Ok(blog
            .order((created_at.desc(), id.desc()))
            .limit(i64::from(page.width))
            .offset(page.offset())
            .load(&self.inner)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags() {
        assert_eq!(split_tags("rust, web ,, databases "), vec!["rust", "web", "databases"]);
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ").is_empty());
    }
}
