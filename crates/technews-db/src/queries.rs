use rusqlite::types::ToSql;
use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::models::{
    CommentRow, LoginOutcome, NewComment, NewPost, NewUser, NewVote, PostCommentRow,
    PostDetailRow, PostRow, PostSummaryRow, ProfileCommentRow, UserChanges, UserProfileRow,
    UserRow, VoteRow,
};
use crate::password::{self, HashedPassword};
use crate::{Database, StoreResult, validate};

const MIN_PASSWORD_LEN: usize = 4;
const MIN_COMMENT_LEN: usize = 1;

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Post columns plus author username and the correlated vote count.
/// The count is recomputed on every read.
const POST_SUMMARY_SELECT: &str = "
    SELECT p.id, p.post_url, p.title, p.created_at,
           (SELECT COUNT(*) FROM votes v WHERE v.post_id = p.id) AS vote_count,
           u.username
    FROM posts p
    JOIN users u ON u.id = p.user_id";

const POST_COLUMNS: &str = "p.id, p.title, p.post_url, p.user_id, p.created_at, p.updated_at";

impl Database {
    // -- Users --

    /// Validate, hash the password, then insert.
    pub fn create_user(&self, new: NewUser) -> StoreResult<UserRow> {
        let username = validate::required("user", "username", new.username.as_deref())?;
        let email = validate::required("user", "email", new.email.as_deref())?;
        let plaintext = validate::required("user", "password", new.password.as_deref())?;
        validate::email("email", email)?;
        validate::min_len("password", plaintext, MIN_PASSWORD_LEN)?;

        // Hash before taking the connection lock.
        let hashed = password::hash(plaintext)?;

        let row = self.with_conn(|conn| insert_user(conn, username, email, &hashed))?;
        debug!("Created user {} <{}>", row.id, row.email);
        Ok(row)
    }

    pub fn list_users(&self) -> StoreResult<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username, email, password FROM users ORDER BY id")?;
            let rows = stmt
                .query_map([], user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_user(&self, id: i64) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// The user with owned posts, comments and voted-on posts.
    pub fn get_user_profile(&self, id: i64) -> StoreResult<Option<UserProfileRow>> {
        self.with_conn(|conn| {
            let Some(user) = query_user_by_id(conn, id)? else {
                return Ok(None);
            };

            Ok(Some(UserProfileRow {
                posts: query_posts_by_author(conn, id)?,
                comments: query_comments_by_author(conn, id)?,
                voted_posts: query_voted_posts(conn, id)?,
                user,
            }))
        })
    }

    /// Apply a partial update. Returns the number of matched rows.
    ///
    /// The password is re-hashed only when a new plaintext is supplied; an
    /// update without one leaves the stored hash untouched.
    pub fn update_user(&self, id: i64, changes: UserChanges) -> StoreResult<usize> {
        let username = sent_user_field("username", &changes.username)?;
        let email = sent_user_field("email", &changes.email)?;
        let plaintext = sent_user_field("password", &changes.password)?;

        if let Some(email) = email {
            validate::email("email", email)?;
        }
        let hashed = plaintext
            .map(|plaintext| -> StoreResult<HashedPassword> {
                validate::min_len("password", plaintext, MIN_PASSWORD_LEN)?;
                password::hash(plaintext)
            })
            .transpose()?;

        self.with_conn(|conn| {
            if changes.is_empty() {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE id = ?1",
                    [id],
                    |r| r.get(0),
                )?;
                return Ok(count as usize);
            }

            let mut columns: Vec<&str> = Vec::new();
            let mut values: Vec<&dyn ToSql> = Vec::new();

            if let Some(username) = &username {
                columns.push("username");
                values.push(username);
            }
            if let Some(email) = &email {
                columns.push("email");
                values.push(email);
            }
            if let Some(hash) = &hashed {
                columns.push("password");
                values.push(hash);
            }

            let assignments: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, col)| format!("{} = ?{}", col, i + 1))
                .collect();
            let sql = format!(
                "UPDATE users SET {} WHERE id = ?{}",
                assignments.join(", "),
                values.len() + 1
            );
            values.push(&id);

            Ok(conn.execute(&sql, values.as_slice())?)
        })
    }

    pub fn delete_user(&self, id: i64) -> StoreResult<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])?))
    }

    /// Look up by exact email and verify the password against the stored hash.
    pub fn authenticate(&self, email: &str, candidate: &str) -> StoreResult<LoginOutcome> {
        let Some(user) = self.with_conn(|conn| query_user_by_email(conn, email))? else {
            return Ok(LoginOutcome::UnknownEmail);
        };

        if password::verify(candidate, &user.password) {
            Ok(LoginOutcome::Verified(user))
        } else {
            Ok(LoginOutcome::PasswordMismatch)
        }
    }

    // -- Posts --

    pub fn create_post(&self, new: NewPost) -> StoreResult<PostRow> {
        let title = validate::required("post", "title", new.title.as_deref())?;
        let post_url = validate::required("post", "post_url", new.post_url.as_deref())?;
        let user_id = *validate::required("post", "user_id", new.user_id.as_ref())?;
        validate::url("post_url", post_url)?;

        self.with_conn(|conn| {
            let row = conn.query_row(
                "INSERT INTO posts (title, post_url, user_id) VALUES (?1, ?2, ?3)
                 RETURNING id, title, post_url, user_id, created_at, updated_at",
                params![title, post_url, user_id],
                post_row,
            )?;
            Ok(row)
        })
    }

    /// All posts, newest first.
    pub fn list_posts(&self) -> StoreResult<Vec<PostSummaryRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} ORDER BY p.created_at DESC, p.id DESC", POST_SUMMARY_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], post_summary_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One post with author, vote count and comments (each with its author).
    pub fn get_post(&self, id: i64) -> StoreResult<Option<PostDetailRow>> {
        self.with_conn(|conn| query_post_detail(conn, id))
    }

    pub fn update_post_title(&self, id: i64, title: Option<&str>) -> StoreResult<usize> {
        let title = validate::required("post", "title", title)?;
        self.with_conn(|conn| {
            let sql = format!("UPDATE posts SET title = ?1, updated_at = {} WHERE id = ?2", NOW);
            Ok(conn.execute(&sql, params![title, id])?)
        })
    }

    pub fn delete_post(&self, id: i64) -> StoreResult<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM posts WHERE id = ?1", [id])?))
    }

    /// Record a vote, then read the post back.
    ///
    /// The read starts only after the insert has returned, and the two steps
    /// are separate statements: a failed insert is returned without reading,
    /// and a vote stays recorded even if the read fails.
    pub fn upvote(&self, vote: NewVote) -> StoreResult<Option<PostDetailRow>> {
        let vote = self.with_conn(|conn| insert_vote(conn, vote))?;
        debug!("User {} voted on post {} (vote {})", vote.user_id, vote.post_id, vote.id);

        self.get_post(vote.post_id)
    }

    /// Number of votes currently recorded for a post.
    pub fn vote_count(&self, post_id: i64) -> StoreResult<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM votes WHERE post_id = ?1",
                [post_id],
                |r| r.get(0),
            )?)
        })
    }

    // -- Comments --

    pub fn create_comment(&self, new: NewComment) -> StoreResult<CommentRow> {
        let text = validate::required("comment", "comment_text", new.comment_text.as_deref())?;
        let user_id = *validate::required("comment", "user_id", new.user_id.as_ref())?;
        let post_id = *validate::required("comment", "post_id", new.post_id.as_ref())?;
        validate::min_len("comment_text", text, MIN_COMMENT_LEN)?;

        self.with_conn(|conn| {
            let row = conn.query_row(
                "INSERT INTO comments (comment_text, user_id, post_id) VALUES (?1, ?2, ?3)
                 RETURNING id, comment_text, user_id, post_id, created_at, updated_at",
                params![text, user_id, post_id],
                comment_row,
            )?;
            Ok(row)
        })
    }

    pub fn list_comments(&self) -> StoreResult<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, comment_text, user_id, post_id, created_at, updated_at
                 FROM comments ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_comment(&self, id: i64) -> StoreResult<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM comments WHERE id = ?1", [id])?))
    }
}

// -- Writes --

/// `None` when the field was left out; a field sent as `null` is rejected.
fn sent_user_field<'a>(
    field: &str,
    value: &'a Option<Option<String>>,
) -> StoreResult<Option<&'a str>> {
    value
        .as_ref()
        .map(|v| validate::required("user", field, v.as_deref()))
        .transpose()
}

/// Takes a `HashedPassword`, so the password column can only receive a hash.
fn insert_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password: &HashedPassword,
) -> StoreResult<UserRow> {
    let row = conn.query_row(
        "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)
         RETURNING id, username, email, password",
        params![username, email, password],
        user_row,
    )?;
    Ok(row)
}

fn insert_vote(conn: &Connection, vote: NewVote) -> StoreResult<VoteRow> {
    let row = conn.query_row(
        "INSERT INTO votes (user_id, post_id) VALUES (?1, ?2) RETURNING id, user_id, post_id",
        params![vote.user_id, vote.post_id],
        |row| {
            Ok(VoteRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                post_id: row.get(2)?,
            })
        },
    )?;
    Ok(row)
}

// -- Reads --

fn query_user_by_id(conn: &Connection, id: i64) -> StoreResult<Option<UserRow>> {
    let mut stmt = conn.prepare("SELECT id, username, email, password FROM users WHERE id = ?1")?;
    stmt.query_row([id], user_row).optional()
}

fn query_user_by_email(conn: &Connection, email: &str) -> StoreResult<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, email, password FROM users WHERE email = ?1")?;
    stmt.query_row([email], user_row).optional()
}

fn query_post_detail(conn: &Connection, id: i64) -> StoreResult<Option<PostDetailRow>> {
    let sql = format!("{} WHERE p.id = ?1", POST_SUMMARY_SELECT);
    let Some(summary) = conn.query_row(&sql, [id], post_summary_row).optional()? else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT c.id, c.comment_text, c.post_id, c.user_id, c.created_at, u.username
         FROM comments c
         JOIN users u ON u.id = c.user_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at, c.id",
    )?;
    let comments = stmt
        .query_map([id], |row| {
            Ok(PostCommentRow {
                id: row.get(0)?,
                comment_text: row.get(1)?,
                post_id: row.get(2)?,
                user_id: row.get(3)?,
                created_at: row.get(4)?,
                author_username: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(PostDetailRow { summary, comments }))
}

fn query_posts_by_author(conn: &Connection, user_id: i64) -> StoreResult<Vec<PostRow>> {
    let sql = format!(
        "SELECT {} FROM posts p WHERE p.user_id = ?1 ORDER BY p.created_at DESC, p.id DESC",
        POST_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_comments_by_author(
    conn: &Connection,
    user_id: i64,
) -> StoreResult<Vec<ProfileCommentRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.comment_text, c.created_at, p.title
         FROM comments c
         JOIN posts p ON p.id = c.post_id
         WHERE c.user_id = ?1
         ORDER BY c.created_at DESC, c.id DESC",
    )?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(ProfileCommentRow {
                id: row.get(0)?,
                comment_text: row.get(1)?,
                created_at: row.get(2)?,
                post_title: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Posts reached through the votes join table.
fn query_voted_posts(conn: &Connection, user_id: i64) -> StoreResult<Vec<PostRow>> {
    let sql = format!(
        "SELECT {} FROM votes v JOIN posts p ON p.id = v.post_id
         WHERE v.user_id = ?1 ORDER BY v.id",
        POST_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Row mappers --

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
    })
}

fn post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        post_url: row.get(2)?,
        user_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn post_summary_row(row: &Row<'_>) -> rusqlite::Result<PostSummaryRow> {
    Ok(PostSummaryRow {
        id: row.get(0)?,
        post_url: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
        vote_count: row.get(4)?,
        author_username: row.get(5)?,
    })
}

fn comment_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        comment_text: row.get(1)?,
        user_id: row.get(2)?,
        post_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
