use serde::{Deserialize, Serialize};

#[cfg(not(target_arch = "wasm32"))]
use sqlx::FromRow;

use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use validator::Validate;

pub mod role;
pub mod utils;

pub use role::Role;

use utils::validate_title;

// --- Users ---

/// Public view of an account. The password hash never leaves the backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row of the admin listing: a user plus how many tasks they own.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryDto {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub task_count: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Please provide a valid email address")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    /// Requested role; `user` when omitted.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Validate, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserDto,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct MeResponse {
    pub user: UserDto,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct UserListResponse {
    pub count: usize,
    pub users: Vec<UserSummaryDto>,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardResponse {
    pub message: String,
    pub total_users: usize,
    pub users: Vec<UserDto>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct DeletedUser {
    pub id: i64,
    pub email: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub message: String,
    pub deleted_user: DeletedUser,
}

// --- Tasks ---

#[cfg_attr(not(target_arch = "wasm32"), derive(FromRow))]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: i64,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/tasks` and `PUT /api/tasks/{id}`. Omitted optional
/// fields fall back to their defaults on create and are left as stored on PUT.
#[derive(Serialize, Deserialize, Clone, Debug, Default, Validate, ToSchema)]
pub struct TaskPayload {
    #[serde(default)]
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[serde(default, alias = "done")]
    pub completed: Option<bool>,
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: Option<i64>,
}

impl TaskPayload {
    /// Trims text fields; an all-whitespace description counts as absent.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: utils::trim_optional(self.description),
            ..self
        }
    }
}

/// Body of `PATCH /api/tasks/{id}`: only the fields present are changed.
#[derive(Serialize, Deserialize, Clone, Debug, Default, Validate, ToSchema)]
pub struct TaskPatch {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[serde(alias = "done")]
    pub completed: Option<bool>,
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: Option<i64>,
}

impl TaskPatch {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct TaskListResponse {
    pub count: usize,
    pub tasks: Vec<TaskDto>,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct TaskResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub task: TaskDto,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct DeletedTask {
    pub id: i64,
    pub title: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskResponse {
    pub message: String,
    pub deleted_task: DeletedTask,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_request_rejects_bad_email_and_short_password() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            role: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn register_request_missing_fields_deserialize_as_empty() {
        let req: RegisterRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.validate().is_err());
        assert!(req.role.is_none());
    }

    #[test]
    fn task_payload_requires_title() {
        let payload: TaskPayload = serde_json::from_value(json!({ "priority": 2 })).unwrap();
        let errors = payload.normalized().validate().unwrap_err();
        let title_errors = errors.field_errors();
        let title = title_errors.get("title").expect("title error");
        assert_eq!(title[0].code, "required");
    }

    #[test]
    fn task_payload_bounds() {
        let payload = TaskPayload {
            title: "ab".into(),
            description: Some("x".repeat(501)),
            completed: None,
            priority: Some(6),
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("description"));
        assert!(fields.contains_key("priority"));
    }

    #[test]
    fn task_payload_accepts_done_alias_and_trims() {
        let payload: TaskPayload =
            serde_json::from_value(json!({ "title": "  Buy milk  ", "done": true, "description": "   " }))
                .unwrap();
        let payload = payload.normalized();
        assert_eq!(payload.title, "Buy milk");
        assert_eq!(payload.completed, Some(true));
        assert_eq!(payload.description, None);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn task_patch_validates_only_present_fields() {
        let patch: TaskPatch = serde_json::from_value(json!({ "completed": true })).unwrap();
        assert!(patch.validate().is_ok());
        assert!(!patch.is_empty());

        let patch: TaskPatch = serde_json::from_value(json!({ "title": "  x " })).unwrap();
        assert!(patch.normalized().validate().is_err());

        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn task_dto_serializes_camel_case() {
        let now = Utc::now();
        let task = TaskDto {
            id: 7,
            title: "Write docs".into(),
            description: None,
            completed: false,
            priority: 3,
            user_id: Some(1),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["userId"], 1);
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
    }
}
