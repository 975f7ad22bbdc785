use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Todo, TodoInput, TodoUpdate},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Loads a todo and checks that `user` owns it.
///
/// Missing todos are `NotFound`; todos owned by someone else are `Forbidden`, which is
/// reported to the client as 401.
async fn owned_todo(
    state: &AppState,
    todo_id: Uuid,
    user: AuthenticatedUser,
    action: &str,
) -> Result<Todo, AppError> {
    let todo = state
        .todos
        .find_todo(todo_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Todo not found".into()))?;

    if todo.user_id != user.id() {
        return Err(AppError::Forbidden(format!(
            "Not authorized to {} this todo",
            action
        )));
    }
    Ok(todo)
}

/// Retrieves all todos of the authenticated user, newest first.
///
/// ## Responses:
/// - `200 OK`: `{ success, count, data: [Todo] }`.
/// - `401 Unauthorized`: missing or invalid bearer token.
#[get("")]
pub async fn get_todos(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let todos = state.todos.list_todos(user.id()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": todos.len(),
        "data": todos,
    })))
}

/// Creates a todo owned by the authenticated user.
///
/// ## Responses:
/// - `201 Created`: `{ success, data: Todo }`.
/// - `400 Bad Request`: invalid title or description.
/// - `401 Unauthorized`: missing or invalid bearer token.
#[post("")]
pub async fn create_todo(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    todo_data: web::Json<TodoInput>,
) -> Result<impl Responder, AppError> {
    todo_data.validate()?;

    let todo = state
        .todos
        .insert_todo(Todo::new(todo_data.into_inner(), user.id()))
        .await?;

    Ok(HttpResponse::Created().json(json!({ "success": true, "data": todo })))
}

/// Updates a todo the authenticated user owns.
///
/// ## Responses:
/// - `200 OK`: `{ success, data: Todo }`.
/// - `400 Bad Request`: invalid fields.
/// - `401 Unauthorized`: missing token, or the todo belongs to another user.
/// - `404 Not Found`: no such todo, or the id is not a valid UUID.
#[put("/{id}")]
pub async fn update_todo(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    todo_id: web::Path<Uuid>,
    todo_data: web::Json<TodoUpdate>,
) -> Result<impl Responder, AppError> {
    todo_data.validate()?;
    let todo_id = todo_id.into_inner();
    owned_todo(&state, todo_id, user, "update").await?;

    let todo = state
        .todos
        .update_todo(todo_id, todo_data.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Todo not found".into()))?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": todo })))
}

/// Deletes a todo the authenticated user owns.
///
/// ## Responses:
/// - `200 OK`: `{ success, message }`.
/// - `401 Unauthorized`: missing token, or the todo belongs to another user.
/// - `404 Not Found`: no such todo, or the id is not a valid UUID.
#[delete("/{id}")]
pub async fn delete_todo(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    todo_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let todo_id = todo_id.into_inner();
    owned_todo(&state, todo_id, user, "delete").await?;

    if !state.todos.delete_todo(todo_id).await? {
        return Err(AppError::NotFound("Todo not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Todo deleted successfully",
    })))
}
