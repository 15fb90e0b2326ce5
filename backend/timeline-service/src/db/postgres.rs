use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{FeedStore, PostFilter};
use crate::error::Result;
use crate::models::{
    Comment, Follow, Like, NewComment, NewNotification, Notification, Post, PostChanges,
    SavedPost, User,
};

const POST_COLUMNS: &str =
    "p.id, p.user_id, p.image_url, p.caption, p.location, p.created_at, p.updated_at";

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.full_name, u.avatar_url, u.bio, \
     u.is_private, u.is_verified, u.created_at";

const COMMENT_COLUMNS: &str = "id, post_id, user_id, content, parent_id, created_at";

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, actor_id, kind, post_id, message, is_read, created_at";

/// Insert a notification on a connection the caller already holds, so it
/// shares the caller's transaction.
async fn insert_notification(conn: &mut PgConnection, notification: &NewNotification) -> Result<()> {
    sqlx::query(
        "INSERT INTO notifications (recipient_id, actor_id, kind, post_id, message) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(notification.recipient_id)
    .bind(notification.actor_id)
    .bind(notification.kind.as_str())
    .bind(notification.post_id)
    .bind(notification.message.as_deref())
    .execute(conn)
    .await?;

    Ok(())
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Append the WHERE clause for `filter` to a query selecting from
/// `posts p JOIN users u ON u.id = p.user_id`.
fn push_post_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::AuthorIn(ids) => {
            builder.push(" WHERE p.user_id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }
        PostFilter::AuthorNotIn(ids) => {
            builder.push(" WHERE p.user_id <> ALL(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }
        PostFilter::SavedBy(user_id) => {
            builder.push(
                " WHERE EXISTS (SELECT 1 FROM saved_posts s WHERE s.post_id = p.id AND s.user_id = ",
            );
            builder.push_bind(*user_id);
            builder.push(")");
        }
        PostFilter::Search(term) => {
            // strpos is case-sensitive and treats the term literally (no LIKE wildcards)
            builder.push(" WHERE (strpos(COALESCE(p.caption, ''), ");
            builder.push_bind(term.clone());
            builder.push(") > 0 OR strpos(COALESCE(p.location, ''), ");
            builder.push_bind(term.clone());
            builder.push(") > 0 OR strpos(u.username, ");
            builder.push_bind(term.clone());
            builder.push(") > 0 OR strpos(COALESCE(u.full_name, ''), ");
            builder.push_bind(term.clone());
            builder.push(") > 0)");
        }
    }
}

fn posts_query(filter: &PostFilter, limit: i64, offset: i64) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.user_id"
    ));
    push_post_filter(&mut builder, filter);
    // seq is the insertion order; ties on created_at fall back to it
    builder.push(" ORDER BY p.created_at DESC, p.seq LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);
    builder
}

fn count_query(filter: &PostFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder =
        QueryBuilder::new("SELECT COUNT(*) FROM posts p JOIN users u ON u.id = p.user_id");
    push_post_filter(&mut builder, filter);
    builder
}

async fn counts_by_key(
    pool: &PgPool,
    sql: &str,
    keys: &[Uuid],
) -> Result<HashMap<Uuid, i64>> {
    if keys.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, i64)> = sqlx::query_as(sql).bind(keys).fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

#[async_trait]
impl FeedStore for PgStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> Result<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = ANY($1)"
        ))
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn query_posts(&self, filter: &PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let posts = posts_query(filter, limit, offset)
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        let total = count_query(filter)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts p
            SET caption = COALESCE($2, p.caption),
                location = COALESCE($3, p.location),
                updated_at = NOW()
            WHERE p.id = $1
            RETURNING p.id, p.user_id, p.image_url, p.caption, p.location, p.created_at, p.updated_at
            "#,
        )
        .bind(post_id)
        .bind(changes.caption.as_deref())
        .bind(changes.location.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT following_id FROM follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }

    async fn create_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        notification: Option<&NewNotification>,
    ) -> Result<Option<Follow>> {
        let mut tx = self.pool.begin().await?;

        let follow = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            RETURNING id, follower_id, following_id, created_at
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let (Some(_), Some(notification)) = (&follow, notification) {
            insert_notification(&mut *tx, notification).await?;
        }
        tx.commit().await?;

        Ok(follow)
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(following_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM follows
                WHERE follower_id = $1 AND following_id = $2
            )
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM follows f JOIN users u ON u.id = f.follower_id \
             WHERE f.following_id = $1 ORDER BY f.created_at DESC, f.id LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total))
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM follows f JOIN users u ON u.id = f.following_id \
             WHERE f.follower_id = $1 ORDER BY f.created_at DESC, f.id LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total))
    }

    async fn count_follows(&self, user_id: Uuid) -> Result<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = $1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn create_like(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        notification: Option<&NewNotification>,
    ) -> Result<Option<Like>> {
        let mut tx = self.pool.begin().await?;

        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            RETURNING id, user_id, post_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let (Some(_), Some(notification)) = (&like, notification) {
            insert_notification(&mut *tx, notification).await?;
        }
        tx.commit().await?;

        Ok(like)
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn liked_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let liked: Vec<Uuid> = sqlx::query_scalar(
            "SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(liked.into_iter().collect())
    }

    async fn count_likes_batch(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        counts_by_key(
            &self.pool,
            "SELECT post_id, COUNT(*) FROM likes WHERE post_id = ANY($1) GROUP BY post_id",
            post_ids,
        )
        .await
    }

    async fn create_saved_post(
        &self,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<Option<SavedPost>> {
        let saved = sqlx::query_as::<_, SavedPost>(
            r#"
            INSERT INTO saved_posts (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            RETURNING id, user_id, post_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn delete_saved_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_posts WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn saved_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let saved: Vec<Uuid> = sqlx::query_scalar(
            "SELECT post_id FROM saved_posts WHERE user_id = $1 AND post_id = ANY($2)",
        )
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(saved.into_iter().collect())
    }

    async fn create_comment(
        &self,
        comment: &NewComment,
        notification: Option<&NewNotification>,
    ) -> Result<Comment> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments (post_id, user_id, content, parent_id) \
             VALUES ($1, $2, $3, $4) RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .bind(comment.parent_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(notification) = notification {
            insert_notification(&mut *tx, notification).await?;
        }
        tx.commit().await?;

        Ok(created)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn list_top_level_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE post_id = $1 AND parent_id IS NULL \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        ))
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn count_top_level_comments(&self, post_id: Uuid) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE post_id = $1 AND parent_id IS NULL",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn list_replies(&self, parent_ids: &[Uuid], per_parent: i64) -> Result<Vec<Comment>> {
        if parent_ids.is_empty() || per_parent <= 0 {
            return Ok(Vec::new());
        }

        let replies = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM (
                SELECT {COMMENT_COLUMNS},
                       ROW_NUMBER() OVER (PARTITION BY parent_id ORDER BY created_at ASC, id) AS rn
                FROM comments
                WHERE parent_id = ANY($1)
            ) ranked
            WHERE rn <= $2
            ORDER BY parent_id, created_at ASC, id
            "#
        ))
        .bind(parent_ids)
        .bind(per_parent)
        .fetch_all(&self.pool)
        .await?;

        Ok(replies)
    }

    async fn count_replies_batch(&self, parent_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        counts_by_key(
            &self.pool,
            "SELECT parent_id, COUNT(*) FROM comments WHERE parent_id = ANY($1) GROUP BY parent_id",
            parent_ids,
        )
        .await
    }

    async fn count_comments_batch(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        counts_by_key(
            &self.pool,
            "SELECT post_id, COUNT(*) FROM comments WHERE post_id = ANY($1) GROUP BY post_id",
            post_ids,
        )
        .await
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = $1 \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        ))
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn count_notifications(&self, recipient_id: Uuid) -> Result<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE NOT is_read)
            FROM notifications
            WHERE recipient_id = $1
            "#,
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn mark_notifications_read(&self, recipient_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
