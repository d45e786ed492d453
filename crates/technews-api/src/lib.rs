pub mod auth;
pub mod comments;
pub mod error;
pub mod posts;
pub mod state;
pub mod users;

use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post, put},
};

pub use error::{ApiError, ApiResult};
pub use state::{AppState, AppStateInner};

/// All JSON routes, nested under `/api`. Anything else is a bare 404.
pub fn router(state: AppState) -> Router {
    // Static segments ("upvote", "login") win over the `{id}` captures.
    let api = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/login", post(auth::login))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/upvote", put(posts::upvote))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/comments/{id}", delete(comments::delete_comment))
        // A known path with the wrong method is still an unmatched route.
        .method_not_allowed_fallback(not_found);

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use technews_db::Database;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let state = AppStateInner::new(Database::open_in_memory().unwrap());
        (router(state.clone()), state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_user(app: &Router, name: &str) -> i64 {
        let (status, body) = send(
            app,
            "POST",
            "/api/users",
            Some(json!({
                "username": name,
                "email": format!("{}@x.com", name.to_lowercase()),
                "password": "pass1",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn create_post(app: &Router, user_id: i64, title: &str) -> i64 {
        let (status, body) = send(
            app,
            "POST",
            "/api/posts",
            Some(json!({
                "title": title,
                "post_url": "https://taskmaster.com/press",
                "user_id": user_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_user_hides_password_and_stores_hash() {
        let (app, state) = app();
        let id = create_user(&app, "Ana").await;

        let (_, users) = send(&app, "GET", "/api/users", None).await;
        assert_eq!(users[0]["username"], "Ana");
        assert!(users[0].get("password").is_none());

        let stored = state.db.get_user(id).unwrap().unwrap();
        assert_ne!(stored.password, "pass1");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_server_error_with_kind() {
        let (app, _) = app();
        create_user(&app, "Ana").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/users",
            Some(json!({ "username": "Other", "email": "ana@x.com", "password": "pass1" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["name"], "UniqueConstraintError");
        assert_eq!(body["field"], "email");

        let (_, users) = send(&app, "GET", "/api/users", None).await;
        assert_eq!(users.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn login_succeeds_and_fails_generically() {
        let (app, _) = app();
        create_user(&app, "Ana").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/users/login",
            Some(json!({ "email": "ana@x.com", "password": "pass1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "You are now logged in!");
        assert_eq!(body["user"]["email"], "ana@x.com");
        assert!(body["user"].get("password").is_none());

        let (wrong_pw, wrong_pw_body) = send(
            &app,
            "POST",
            "/api/users/login",
            Some(json!({ "email": "ana@x.com", "password": "nope" })),
        )
        .await;
        let (no_user, no_user_body) = send(
            &app,
            "POST",
            "/api/users/login",
            Some(json!({ "email": "nobody@x.com", "password": "pass1" })),
        )
        .await;
        assert_eq!(wrong_pw, StatusCode::BAD_REQUEST);
        assert_eq!(no_user, StatusCode::BAD_REQUEST);
        assert_eq!(wrong_pw_body, no_user_body);
    }

    #[tokio::test]
    async fn upvote_returns_post_with_incremented_count() {
        let (app, _) = app();
        let author = create_user(&app, "Ana").await;
        let post_id = create_post(&app, author, "Taskmaster goes public!").await;

        for voter in ["Bo", "Cy", "Di"] {
            let voter_id = create_user(&app, voter).await;
            let (status, _) = send(
                &app,
                "PUT",
                "/api/posts/upvote",
                Some(json!({ "user_id": voter_id, "post_id": post_id })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &app,
            "PUT",
            "/api/posts/upvote",
            Some(json!({ "user_id": author, "post_id": post_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], post_id);
        assert_eq!(body["vote_count"], 4);
        assert_eq!(body["user"]["username"], "Ana");
        assert!(body["comments"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upvote_on_missing_post_reports_insert_failure() {
        let (app, _) = app();
        let user = create_user(&app, "Ana").await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/posts/upvote",
            Some(json!({ "user_id": user, "post_id": 404 })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["name"], "ForeignKeyConstraintError");
    }

    #[tokio::test]
    async fn post_reads_include_vote_count_and_comments() {
        let (app, _) = app();
        let ana = create_user(&app, "Ana").await;
        let post_id = create_post(&app, ana, "Fresh").await;

        let (_, listed) = send(&app, "GET", "/api/posts", None).await;
        assert_eq!(listed[0]["vote_count"], 0);
        assert_eq!(listed[0]["user"]["username"], "Ana");

        let (status, _) = send(
            &app,
            "POST",
            "/api/comments",
            Some(json!({ "comment_text": "First!", "user_id": ana, "post_id": post_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, detail) = send(&app, "GET", &format!("/api/posts/{post_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["vote_count"], 0);
        assert_eq!(detail["comments"][0]["comment_text"], "First!");
        assert_eq!(detail["comments"][0]["user"]["username"], "Ana");
    }

    #[tokio::test]
    async fn invalid_post_url_is_rejected() {
        let (app, _) = app();
        let ana = create_user(&app, "Ana").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/posts",
            Some(json!({ "title": "Bad", "post_url": "not a url", "user_id": ana })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["name"], "ValidationError");
        assert_eq!(body["field"], "post_url");

        let (_, listed) = send(&app, "GET", "/api/posts", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_post_title_and_missing_ids() {
        let (app, _) = app();
        let ana = create_user(&app, "Ana").await;
        let post_id = create_post(&app, ana, "Old").await;

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/posts/{post_id}"),
            Some(json!({ "title": "New" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([1]));

        let (_, detail) = send(&app, "GET", &format!("/api/posts/{post_id}"), None).await;
        assert_eq!(detail["title"], "New");

        let (status, body) =
            send(&app, "PUT", "/api/posts/999", Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No post found with this id");

        let (status, _) = send(&app, "GET", "/api/posts/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_missing_rows_is_not_found() {
        let (app, _) = app();

        let (status, body) = send(&app, "DELETE", "/api/users/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No user found with this id");

        let (status, _) = send(&app, "DELETE", "/api/posts/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/api/comments/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_user_returns_count() {
        let (app, _) = app();
        let ana = create_user(&app, "Ana").await;

        let (status, body) = send(&app, "DELETE", &format!("/api/users/{ana}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(1));

        let (status, _) = send(&app, "GET", &format!("/api/users/{ana}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn user_update_without_password_keeps_login_working() {
        let (app, state) = app();
        let ana = create_user(&app, "Ana").await;
        let before = state.db.get_user(ana).unwrap().unwrap().password;

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/users/{ana}"),
            Some(json!({ "username": "Ana B" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([1]));

        let after = state.db.get_user(ana).unwrap().unwrap().password;
        assert_eq!(before, after);

        let (status, _) = send(
            &app,
            "POST",
            "/api/users/login",
            Some(json!({ "email": "ana@x.com", "password": "pass1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn user_profile_lists_posts_and_votes() {
        let (app, _) = app();
        let ana = create_user(&app, "Ana").await;
        let post_id = create_post(&app, ana, "Mine").await;
        send(
            &app,
            "PUT",
            "/api/posts/upvote",
            Some(json!({ "user_id": ana, "post_id": post_id })),
        )
        .await;

        let (status, profile) = send(&app, "GET", &format!("/api/users/{ana}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(profile.get("password").is_none());
        assert_eq!(profile["posts"][0]["id"], post_id);
        assert_eq!(profile["voted_posts"][0]["title"], "Mine");
    }

    #[tokio::test]
    async fn null_user_field_is_rejected_and_row_kept() {
        let (app, state) = app();
        let ana = create_user(&app, "Ana").await;

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/users/{ana}"),
            Some(json!({ "username": null })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["name"], "ValidationError");
        assert_eq!(body["message"], "user.username cannot be null");
        assert_eq!(state.db.get_user(ana).unwrap().unwrap().username, "Ana");

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/users/{ana}"),
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["field"], "email");
    }

    #[tokio::test]
    async fn null_post_title_is_rejected() {
        let (app, _) = app();
        let ana = create_user(&app, "Ana").await;
        let post_id = create_post(&app, ana, "Keep").await;

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/posts/{post_id}"),
            Some(json!({ "title": null })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "post.title cannot be null");
    }

    #[tokio::test]
    async fn login_with_missing_field_is_a_login_failure() {
        let (app, _) = app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/users/login",
            Some(json!({ "email": "ana@x.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Incorrect email or password");
    }

    #[tokio::test]
    async fn wrong_method_on_known_path_is_not_found() {
        let (app, _) = app();

        for (method, uri) in [
            ("GET", "/api/posts/upvote"),
            ("DELETE", "/api/posts/upvote"),
            ("GET", "/api/users/login"),
            ("POST", "/api/posts/1"),
        ] {
            let (status, body) = send(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(body, Value::Null);
        }
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (app, _) = app();
        let (status, body) = send(&app, "GET", "/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, Value::Null);

        let (status, _) = send(&app, "GET", "/api/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
