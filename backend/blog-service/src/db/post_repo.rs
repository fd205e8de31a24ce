use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::{PostFilter, PostRepository};
use crate::models::{ImageChange, NewPost, Post, PostChanges, PostView};

const POST_VIEW_COLUMNS: &str = r#"
    p.id, p.text, p.pub_date, p.image,
    p.author_id, u.username AS author,
    p.group_id, g.slug AS group_slug, g.title AS group_title
"#;

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// WHERE clause for a feed filter; every clause binds exactly one `$1`
fn filter_clause(filter: PostFilter) -> (&'static str, Option<i64>) {
    match filter {
        PostFilter::All => ("$1::BIGINT IS NULL", None),
        PostFilter::Group(group_id) => ("p.group_id = $1", Some(group_id)),
        PostFilter::Author(author_id) => ("p.author_id = $1", Some(author_id)),
        PostFilter::FollowedBy(user_id) => (
            "p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1)",
            Some(user_id),
        ),
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create_post(&self, post: NewPost) -> Result<Post> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (text, author_id, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, text, pub_date, author_id, group_id, image
            "#,
        )
        .bind(&post.text)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create post")
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let (touch_image, image) = match changes.image {
            ImageChange::Keep => (false, None),
            ImageChange::Replace(path) => (true, Some(path)),
            ImageChange::Clear => (true, None),
        };

        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET text = $2,
                group_id = $3,
                image = CASE WHEN $4 THEN $5 ELSE image END
            WHERE id = $1
            RETURNING id, text, pub_date, author_id, group_id, image
            "#,
        )
        .bind(id)
        .bind(&changes.text)
        .bind(changes.group_id)
        .bind(touch_image)
        .bind(image)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update post {}", id))?;

        Ok(post)
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete post {}", id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostView>> {
        let query = format!(
            r#"
            SELECT {}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN post_groups g ON g.id = p.group_id
            WHERE p.id = $1
            "#,
            POST_VIEW_COLUMNS
        );

        let post = sqlx::query_as::<_, PostView>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch post")?;

        Ok(post)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<usize> {
        let (clause, value) = filter_clause(filter);
        let query = format!("SELECT COUNT(*) FROM posts p WHERE {}", clause);

        let count: i64 = sqlx::query_scalar(&query)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")?;

        Ok(count.max(0) as usize)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostView>> {
        let (clause, value) = filter_clause(filter);
        let query = format!(
            r#"
            SELECT {}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN post_groups g ON g.id = p.group_id
            WHERE {}
            ORDER BY p.pub_date DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#,
            POST_VIEW_COLUMNS, clause
        );

        let posts = sqlx::query_as::<_, PostView>(&query)
            .bind(value)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list posts for {:?}", filter))?;

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_filter_binds_a_single_parameter() {
        for filter in [
            PostFilter::All,
            PostFilter::Group(1),
            PostFilter::Author(2),
            PostFilter::FollowedBy(3),
        ] {
            let (clause, _) = filter_clause(filter);
            assert!(clause.contains("$1"));
            assert!(!clause.contains("$2"));
        }
    }

    #[test]
    fn global_feed_binds_null() {
        assert_eq!(filter_clause(PostFilter::All).1, None);
        assert_eq!(filter_clause(PostFilter::Group(7)).1, Some(7));
    }
}
