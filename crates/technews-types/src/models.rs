use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as exposed over HTTP. The password hash never leaves the store
/// through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// The `user` projection nested inside posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
}

/// A post row exactly as stored, returned from create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub post_url: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post listing entry: columns plus the live vote count and author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub post_url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub vote_count: i64,
    pub user: Author,
}

/// Single-post view used by `GET /posts/:id` and the upvote flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: i64,
    pub post_url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub vote_count: i64,
    pub user: Author,
    pub comments: Vec<PostComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostComment {
    pub id: i64,
    pub comment_text: String,
    pub post_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub user: Author,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub comment_text: String,
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTitle {
    pub title: String,
}

/// A comment as listed on its author's profile, with the commented post's title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileComment {
    pub id: i64,
    pub comment_text: String,
    pub created_at: DateTime<Utc>,
    pub post: PostTitle,
}

/// `GET /users/:id`: the user with owned posts, comments and the posts they voted on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub posts: Vec<Post>,
    pub comments: Vec<ProfileComment>,
    pub voted_posts: Vec<Post>,
}
