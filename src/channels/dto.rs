use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::channels::repo::{ChannelProfileRow, WatchHistoryRow};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

impl From<ChannelProfileRow> for ChannelProfile {
    fn from(r: ChannelProfileRow) -> Self {
        Self {
            full_name: r.full_name,
            username: r.username,
            email: r.email,
            avatar_url: r.avatar_url,
            cover_image_url: r.cover_image_url,
            subscribers_count: r.subscribers_count,
            channels_subscribed_to_count: r.channels_subscribed_to_count,
            is_subscribed: r.is_subscribed,
        }
    }
}

/// Owner projection nested in each history entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub full_name: String,
    pub username: String,
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub id: Uuid,
    pub title: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: i32,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub owner: VideoOwner,
}

impl From<WatchHistoryRow> for WatchedVideo {
    fn from(r: WatchHistoryRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            video_url: r.video_url,
            thumbnail_url: r.thumbnail_url,
            duration_secs: r.duration_secs,
            views: r.views,
            created_at: r.created_at,
            owner: VideoOwner {
                full_name: r.owner_full_name,
                username: r.owner_username,
                avatar_url: r.owner_avatar_url,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_profile_serializes_camel_case() {
        let profile: ChannelProfile = ChannelProfileRow {
            full_name: "Alice A".into(),
            username: "alice".into(),
            email: "a@x.com".into(),
            avatar_url: "https://m/a.png".into(),
            cover_image_url: None,
            subscribers_count: 0,
            channels_subscribed_to_count: 3,
            is_subscribed: false,
        }
        .into();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["subscribersCount"], 0);
        assert_eq!(json["channelsSubscribedToCount"], 3);
        assert_eq!(json["isSubscribed"], false);
        assert_eq!(json["fullName"], "Alice A");
    }

    #[test]
    fn watched_video_nests_owner_projection() {
        let video: WatchedVideo = WatchHistoryRow {
            id: Uuid::new_v4(),
            title: "intro".into(),
            video_url: "https://m/v.mp4".into(),
            thumbnail_url: Some("https://m/t.jpg".into()),
            duration_secs: 120,
            views: 42,
            created_at: OffsetDateTime::now_utc(),
            owner_full_name: "Bob B".into(),
            owner_username: "bob".into(),
            owner_avatar_url: "https://m/b.png".into(),
        }
        .into();
        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["owner"]["username"], "bob");
        assert_eq!(json["owner"]["fullName"], "Bob B");
        assert_eq!(json["owner"]["avatarUrl"], "https://m/b.png");
        // only the three public fields
        assert_eq!(json["owner"].as_object().unwrap().len(), 3);
    }
}
