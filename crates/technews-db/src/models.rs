//! Database row types. These map directly to SQLite rows and stay distinct
//! from the technews-types API models; the `From` impls below are the bridge.
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use technews_types::models::{
    Author, Comment, Post, PostComment, PostDetail, PostSummary, PostTitle, ProfileComment,
    User, UserProfile,
};

// -- Rows --

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string, never plaintext.
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub post_url: String,
    pub user_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A post joined with its author's username and the live vote count.
#[derive(Debug, Clone)]
pub struct PostSummaryRow {
    pub id: i64,
    pub post_url: String,
    pub title: String,
    pub created_at: String,
    pub vote_count: i64,
    pub author_username: String,
}

#[derive(Debug, Clone)]
pub struct PostDetailRow {
    pub summary: PostSummaryRow,
    pub comments: Vec<PostCommentRow>,
}

#[derive(Debug, Clone)]
pub struct PostCommentRow {
    pub id: i64,
    pub comment_text: String,
    pub post_id: i64,
    pub user_id: i64,
    pub created_at: String,
    pub author_username: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub comment_text: String,
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct ProfileCommentRow {
    pub id: i64,
    pub comment_text: String,
    pub created_at: String,
    pub post_title: String,
}

#[derive(Debug, Clone)]
pub struct UserProfileRow {
    pub user: UserRow,
    pub posts: Vec<PostRow>,
    pub comments: Vec<ProfileCommentRow>,
    pub voted_posts: Vec<PostRow>,
}

#[derive(Debug, Clone)]
pub struct VoteRow {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
}

// -- Write inputs --
// Fields mirror the request payload; `None` means the caller omitted it.

#[derive(Debug, Default, Clone)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Partial user update. The outer `Option` says whether the field was sent,
/// the inner one whether it was sent as `null`. Absent fields are not written;
/// a `null` fails the required-column check.
#[derive(Debug, Default, Clone)]
pub struct UserChanges {
    pub username: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub password: Option<Option<String>>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }
}

#[derive(Debug, Default, Clone)]
pub struct NewPost {
    pub title: Option<String>,
    pub post_url: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Default, Clone)]
pub struct NewComment {
    pub comment_text: Option<String>,
    pub user_id: Option<i64>,
    pub post_id: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewVote {
    pub user_id: i64,
    pub post_id: i64,
}

/// Result of checking login credentials.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Carries the full row, hash included. Redact before exposing it.
    Verified(UserRow),
    UnknownEmail,
    PasswordMismatch,
}

// -- Row -> API model --

/// Parse a stored timestamp. Rows written by the schema defaults are RFC 3339;
/// plain `YYYY-MM-DD HH:MM:SS` is accepted as naive UTC.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            post_url: row.post_url,
            user_id: row.user_id,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

impl From<PostSummaryRow> for PostSummary {
    fn from(row: PostSummaryRow) -> Self {
        PostSummary {
            id: row.id,
            post_url: row.post_url,
            title: row.title,
            created_at: parse_timestamp(&row.created_at),
            vote_count: row.vote_count,
            user: Author {
                username: row.author_username,
            },
        }
    }
}

impl From<PostCommentRow> for PostComment {
    fn from(row: PostCommentRow) -> Self {
        PostComment {
            id: row.id,
            comment_text: row.comment_text,
            post_id: row.post_id,
            user_id: row.user_id,
            created_at: parse_timestamp(&row.created_at),
            user: Author {
                username: row.author_username,
            },
        }
    }
}

impl From<PostDetailRow> for PostDetail {
    fn from(row: PostDetailRow) -> Self {
        let PostDetailRow { summary, comments } = row;
        PostDetail {
            id: summary.id,
            post_url: summary.post_url,
            title: summary.title,
            created_at: parse_timestamp(&summary.created_at),
            vote_count: summary.vote_count,
            user: Author {
                username: summary.author_username,
            },
            comments: comments.into_iter().map(PostComment::from).collect(),
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            comment_text: row.comment_text,
            user_id: row.user_id,
            post_id: row.post_id,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

impl From<ProfileCommentRow> for ProfileComment {
    fn from(row: ProfileCommentRow) -> Self {
        ProfileComment {
            id: row.id,
            comment_text: row.comment_text,
            created_at: parse_timestamp(&row.created_at),
            post: PostTitle {
                title: row.post_title,
            },
        }
    }
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        UserProfile {
            id: row.user.id,
            username: row.user.username,
            email: row.user.email,
            posts: row.posts.into_iter().map(Post::from).collect(),
            comments: row.comments.into_iter().map(ProfileComment::from).collect(),
            voted_posts: row.voted_posts.into_iter().map(Post::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_both_timestamp_shapes() {
        let rfc = parse_timestamp("2024-03-01T12:30:45.123Z");
        assert_eq!((rfc.year(), rfc.month(), rfc.day()), (2024, 3, 1));
        assert_eq!(rfc.timestamp_subsec_millis(), 123);

        let naive = parse_timestamp("2024-03-01 12:30:45");
        assert_eq!((naive.hour(), naive.minute(), naive.second()), (12, 30, 45));
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::default());
    }

    #[test]
    fn user_view_drops_password_hash() {
        let user = User::from(UserRow {
            id: 7,
            username: "Ana".into(),
            email: "ana@x.com".into(),
            password: "$argon2id$v=19$...".into(),
        });
        assert_eq!(user.id, 7);
        assert!(!format!("{:?}", user).contains("argon2"));
    }
}
