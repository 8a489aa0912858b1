use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Which columns of which table an entity is read from.
///
/// The column list doubles as the `SELECT` list, and is checked against the live table when the
/// Postgres store starts up.
#[derive(Debug)]
pub struct RowMapping {
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

impl RowMapping {
    pub fn select_list(&self) -> String {
        self.columns.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    pub const MAPPING: RowMapping = RowMapping {
        table: "users",
        columns: &["id", "username", "first_name", "last_name"],
    };

    /// First and last name joined by a space, skipping missing or empty parts.
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Task {
    pub id: i32,
    pub content: String,
    /// Comma separated.
    pub tags: String,
    pub user_id: i32,
    pub is_private: bool,
    pub approach_count: i32,
    pub created_at: NaiveDateTime,
}

impl Task {
    pub const MAPPING: RowMapping = RowMapping {
        table: "tasks",
        columns: &[
            "id",
            "content",
            "tags",
            "user_id",
            "is_private",
            "approach_count",
            "created_at",
        ],
    };

    /// The stored tags split on `,`, as is.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags.split(',').map(String::from).collect()
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Approach {
    pub id: i32,
    pub content: String,
    pub user_id: i32,
    pub task_id: i32,
    pub vote_count: i32,
    pub created_at: NaiveDateTime,
}

impl Approach {
    pub const MAPPING: RowMapping = RowMapping {
        table: "approaches",
        columns: &[
            "id",
            "content",
            "user_id",
            "task_id",
            "vote_count",
            "created_at",
        ],
    };
}

/// Renders a stored timestamp the way clients expect it: ISO-8601, UTC, millisecond precision.
pub fn iso_timestamp(ts: &NaiveDateTime) -> String {
    ts.and_utc()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
