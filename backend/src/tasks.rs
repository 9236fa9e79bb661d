//! Task CRUD. Every route here runs behind `auth_middleware`; tasks are
//! created for the caller and only their owner may change them, while admins
//! may also read and delete them.

use axum::{extract::State, http::StatusCode, Json};
use common::{
    DeleteTaskResponse, DeletedTask, TaskDto, TaskListResponse, TaskPatch, TaskPayload,
    TaskResponse,
};
use validator::Validate;

use crate::error::AppError;
use crate::extractors::{AppJson, AuthUser, ResourceId};
use crate::models::task::{self, TaskFields, TaskFilter};
use crate::models::User;
use crate::web_server::AppState;

async fn load_task(state: &AppState, id: i64) -> Result<TaskDto, AppError> {
    task::find_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

fn ensure_owner(user: &AuthUser, task: &TaskDto, action: &str) -> Result<(), AppError> {
    if task.user_id != Some(user.user_id) {
        return Err(AppError::Forbidden(format!(
            "You do not have permission to {action} this task"
        )));
    }
    Ok(())
}

async fn list_filtered(
    state: &AppState,
    user: &AuthUser,
    filter: TaskFilter,
) -> Result<Json<TaskListResponse>, AppError> {
    let tasks = task::list_for_user(&state.db_pool, user.user_id, filter).await?;
    tracing::info!("Fetched {} {:?} tasks for user {}", tasks.len(), filter, user.user_id);

    Ok(Json(TaskListResponse {
        count: tasks.len(),
        tasks,
    }))
}

#[utoipa::path(
    get,
    path = "/api/tasks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's tasks, newest first", body = TaskListResponse),
        (status = 401, description = "Authentication required"),
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TaskListResponse>, AppError> {
    list_filtered(&state, &user, TaskFilter::All).await
}

#[utoipa::path(
    get,
    path = "/api/tasks/filter/pending",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Open tasks, highest priority first", body = TaskListResponse),
    ),
    tag = "tasks"
)]
pub async fn pending_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TaskListResponse>, AppError> {
    list_filtered(&state, &user, TaskFilter::Pending).await
}

#[utoipa::path(
    get,
    path = "/api/tasks/filter/completed",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Completed tasks", body = TaskListResponse),
    ),
    tag = "tasks"
)]
pub async fn completed_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TaskListResponse>, AppError> {
    list_filtered(&state, &user, TaskFilter::Completed).await
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = TaskPayload,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Validation failed"),
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<TaskPayload>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    // A still-valid token can outlive its account.
    if User::find_by_id(&state.db_pool, user.user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("Creating task {:?} for user {}", payload.title, user.user_id);
    let created = task::create(&state.db_pool, &TaskFields::from(payload), Some(user.user_id)).await?;

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            message: Some("Task created successfully".to_string()),
            task: created,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The task", body = TaskResponse),
        (status = 400, description = "Malformed id"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Task not found"),
    ),
    tag = "tasks"
)]
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    ResourceId(id): ResourceId,
) -> Result<Json<TaskResponse>, AppError> {
    tracing::info!("Fetching task {}", id);
    let found = load_task(&state, id).await?;

    if !user.owns_or_admin(found.user_id) {
        return Err(AppError::Forbidden(
            "You do not have permission to view this task".to_string(),
        ));
    }

    Ok(Json(TaskResponse {
        message: None,
        task: found,
    }))
}

/// Title is required; omitted optional fields keep their stored values.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    request_body = TaskPayload,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Task replaced", body = TaskResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Task not found"),
    ),
    tag = "tasks"
)]
pub async fn replace_task(
    State(state): State<AppState>,
    user: AuthUser,
    ResourceId(id): ResourceId,
    AppJson(payload): AppJson<TaskPayload>,
) -> Result<Json<TaskResponse>, AppError> {
    let existing = load_task(&state, id).await?;
    ensure_owner(&user, &existing, "update")?;

    let payload = payload.normalized();
    payload.validate()?;

    tracing::info!("Replacing task {}", id);
    write_update(&state, id, TaskFields::of(&existing).replace_with(payload)).await
}

#[utoipa::path(
    patch,
    path = "/api/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    request_body = TaskPatch,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Validation failed or nothing to update"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Task not found"),
    ),
    tag = "tasks"
)]
pub async fn patch_task(
    State(state): State<AppState>,
    user: AuthUser,
    ResourceId(id): ResourceId,
    AppJson(patch): AppJson<TaskPatch>,
) -> Result<Json<TaskResponse>, AppError> {
    let existing = load_task(&state, id).await?;
    ensure_owner(&user, &existing, "update")?;

    let patch = patch.normalized();
    if patch.is_empty() {
        return Err(AppError::BadRequest(
            "No updatable fields provided (title, description, completed, priority)".to_string(),
        ));
    }
    patch.validate()?;

    tracing::info!("Patching task {}", id);
    write_update(&state, id, TaskFields::of(&existing).apply(patch)).await
}

async fn write_update(
    state: &AppState,
    id: i64,
    fields: TaskFields,
) -> Result<Json<TaskResponse>, AppError> {
    let updated = task::update(&state.db_pool, id, &fields)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskResponse {
        message: Some("Task updated successfully".to_string()),
        task: updated,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Task deleted", body = DeleteTaskResponse),
        (status = 400, description = "Malformed id"),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Task not found"),
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    ResourceId(id): ResourceId,
) -> Result<Json<DeleteTaskResponse>, AppError> {
    let existing = load_task(&state, id).await?;

    if !user.owns_or_admin(existing.user_id) {
        return Err(AppError::Forbidden(
            "You do not have permission to delete this task".to_string(),
        ));
    }

    tracing::info!("Deleting task {}", id);
    if !task::delete(&state.db_pool, id).await? {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    Ok(Json(DeleteTaskResponse {
        message: "Task deleted successfully".to_string(),
        deleted_task: DeletedTask {
            id: existing.id,
            title: existing.title,
        },
    }))
}
