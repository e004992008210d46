use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// One row of the channel-profile aggregation: the user's public projection
/// plus the subscriber counts computed store-side.
#[derive(Debug, Clone, FromRow)]
pub struct ChannelProfileRow {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

pub async fn channel_profile(
    db: &PgPool,
    username: &str,
    requester_id: Uuid,
) -> anyhow::Result<Option<ChannelProfileRow>> {
    let row = sqlx::query_as::<_, ChannelProfileRow>(
        r#"
        SELECT u.full_name,
               u.username,
               u.email,
               u.avatar_url,
               u.cover_image_url,
               (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id)
                   AS subscribers_count,
               (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id)
                   AS channels_subscribed_to_count,
               EXISTS(SELECT 1 FROM subscriptions s
                       WHERE s.channel_id = u.id AND s.subscriber_id = $2)
                   AS is_subscribed
        FROM users u
        WHERE u.username = $1
        "#,
    )
    .bind(username)
    .bind(requester_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// One watched video joined with its owner's public projection.
#[derive(Debug, Clone, FromRow)]
pub struct WatchHistoryRow {
    pub id: Uuid,
    pub title: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: i32,
    pub views: i64,
    pub created_at: OffsetDateTime,
    pub owner_full_name: String,
    pub owner_username: String,
    pub owner_avatar_url: String,
}

pub async fn watch_history(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<WatchHistoryRow>> {
    let rows = sqlx::query_as::<_, WatchHistoryRow>(
        r#"
        SELECT v.id,
               v.title,
               v.video_url,
               v.thumbnail_url,
               v.duration_secs,
               v.views,
               v.created_at,
               o.full_name AS owner_full_name,
               o.username AS owner_username,
               o.avatar_url AS owner_avatar_url
        FROM watch_history wh
        JOIN videos v ON v.id = wh.video_id
        JOIN users o ON o.id = v.owner_id
        WHERE wh.user_id = $1
        ORDER BY wh.watched_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
