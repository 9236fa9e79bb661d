use chrono::Utc;
use common::{TaskDto, TaskPatch, TaskPayload};

use crate::db::DbPool;

pub const DEFAULT_PRIORITY: i64 = 3;

const TASK_COLUMNS: &str =
    "id, title, description, completed, priority, user_id, created_at, updated_at";

/// Which slice of a user's tasks to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    /// Open tasks, most urgent first.
    Pending,
    Completed,
}

impl TaskFilter {
    fn clause(&self) -> &'static str {
        match self {
            TaskFilter::All => "WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            TaskFilter::Pending => {
                "WHERE user_id = $1 AND completed = FALSE ORDER BY priority DESC, created_at DESC, id DESC"
            }
            TaskFilter::Completed => {
                "WHERE user_id = $1 AND completed = TRUE ORDER BY created_at DESC, id DESC"
            }
        }
    }
}

/// A fully resolved set of mutable task fields, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: i64,
}

impl From<TaskPayload> for TaskFields {
    fn from(payload: TaskPayload) -> Self {
        Self {
            title: payload.title,
            description: payload.description,
            completed: payload.completed.unwrap_or(false),
            priority: payload.priority.unwrap_or(DEFAULT_PRIORITY),
        }
    }
}

impl TaskFields {
    pub fn of(task: &TaskDto) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            completed: task.completed,
            priority: task.priority,
        }
    }

    /// PUT body over the stored task: the title is replaced, omitted optional
    /// fields keep their stored values.
    pub fn replace_with(self, payload: TaskPayload) -> Self {
        Self {
            title: payload.title,
            description: payload.description.or(self.description),
            completed: payload.completed.unwrap_or(self.completed),
            priority: payload.priority.unwrap_or(self.priority),
        }
    }

    /// Overlays the fields present in `patch`; an empty description clears it.
    pub fn apply(mut self, patch: TaskPatch) -> Self {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self
    }
}

pub async fn create(
    pool: &DbPool,
    fields: &TaskFields,
    user_id: Option<i64>,
) -> Result<TaskDto, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, TaskDto>(&format!(
        r#"
        INSERT INTO tasks (title, description, completed, priority, user_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.completed)
    .bind(fields.priority)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<TaskDto>, sqlx::Error> {
    sqlx::query_as::<_, TaskDto>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_user(
    pool: &DbPool,
    user_id: i64,
    filter: TaskFilter,
) -> Result<Vec<TaskDto>, sqlx::Error> {
    sqlx::query_as::<_, TaskDto>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks {}",
        filter.clause()
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Writes every mutable field and bumps `updated_at`.
pub async fn update(
    pool: &DbPool,
    id: i64,
    fields: &TaskFields,
) -> Result<Option<TaskDto>, sqlx::Error> {
    sqlx::query_as::<_, TaskDto>(&format!(
        r#"
        UPDATE tasks
        SET title = $1, description = $2, completed = $3, priority = $4, updated_at = $5
        WHERE id = $6
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.completed)
    .bind(fields.priority)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &DbPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> TaskFields {
        TaskFields {
            title: "Write report".into(),
            description: Some("quarterly".into()),
            completed: false,
            priority: 2,
        }
    }

    #[test]
    fn payload_defaults() {
        let fields = TaskFields::from(TaskPayload {
            title: "Buy milk".into(),
            ..Default::default()
        });
        assert!(!fields.completed);
        assert_eq!(fields.priority, DEFAULT_PRIORITY);
        assert_eq!(fields.description, None);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let patched = base().apply(TaskPatch {
            completed: Some(true),
            ..Default::default()
        });
        assert_eq!(
            patched,
            TaskFields {
                completed: true,
                ..base()
            }
        );
    }

    #[test]
    fn put_keeps_omitted_fields() {
        let replaced = base().replace_with(TaskPayload {
            title: "Final report".into(),
            completed: Some(true),
            ..Default::default()
        });
        assert_eq!(
            replaced,
            TaskFields {
                title: "Final report".into(),
                completed: true,
                ..base()
            }
        );
    }

    #[test]
    fn empty_description_in_patch_clears_it() {
        let patched = base().apply(TaskPatch {
            description: Some(String::new()),
            priority: Some(5),
            ..Default::default()
        });
        assert_eq!(patched.description, None);
        assert_eq!(patched.priority, 5);
        assert_eq!(patched.title, "Write report");
    }
}
