//! User account endpoints.
//!
//! Flow Overview:
//! 1) Write bodies pass the Validation Gate ([`Validated`]) before the handler runs.
//! 2) The handler evaluates its guard checks in order; the first failure is returned.
//! 3) The store is only mutated once every guard has passed.

use crate::{
    api::{
        error::{ApiError, ErrorResponse},
        validation::{Operation, Schema, Validated},
    },
    store::{SharedStore, User},
};
use axum::{
    extract::{Extension, Path},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};
use utoipa::ToSchema;

const PASSWORDS_DID_NOT_MATCH: &str = "Passwords did not match";

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Schema for CreateUserRequest {
    const OPERATION: Operation = Operation::CreateUser;
}

/// Name and email are replaced; the password only when both password fields are sent.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl Schema for UpdateUserRequest {
    const OPERATION: Operation = Operation::UpdateUser;
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordPatchRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

impl Schema for PasswordPatchRequest {
    const OPERATION: Operation = Operation::PatchPassword;
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("confirm_password", &"***")
            .finish()
    }
}

impl fmt::Debug for UpdateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateUserRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field(
                "confirm_password",
                &self.confirm_password.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

impl fmt::Debug for PasswordPatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordPatchRequest")
            .field("old_password", &"***")
            .field("new_password", &"***")
            .field("confirm_new_password", &"***")
            .finish()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedUser {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserId {
    pub id: String,
}

fn ensure_match(password: &str, confirmation: &str) -> Result<(), ApiError> {
    if password == confirmation {
        Ok(())
    } else {
        Err(ApiError::InvalidPassword(PASSWORDS_DID_NOT_MATCH))
    }
}

/// Both fields or neither; a lone field counts as a mismatch.
fn password_change(
    password: Option<String>,
    confirmation: Option<String>,
) -> Result<Option<SecretString>, ApiError> {
    match (password, confirmation) {
        (None, None) => Ok(None),
        (Some(password), Some(confirmation)) => {
            ensure_match(&password, &confirmation)?;
            Ok(Some(SecretString::from(password)))
        }
        _ => Err(ApiError::InvalidPassword(PASSWORDS_DID_NOT_MATCH)),
    }
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All user accounts.", body = [User]),
        (status = 500, description = "Store failure.", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn list_users(
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(store.list_users().await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User account.", body = User),
        (status = 422, description = "Unknown user.", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(user.id = %id))]
pub async fn get_user(
    Path(id): Path<String>,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<User>, ApiError> {
    store
        .get_user(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::UnprocessableEntity("Unknown user"))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created.", body = CreatedUser),
        (status = 400, description = "Passwords did not match.", body = ErrorResponse),
        (status = 409, description = "Email already taken.", body = ErrorResponse),
        (status = 422, description = "Invalid body or the store refused the account.", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(user.email = %request.email))]
pub async fn create_user(
    Extension(store): Extension<SharedStore>,
    Validated(request): Validated<CreateUserRequest>,
) -> Result<Json<CreatedUser>, ApiError> {
    ensure_match(&request.password, &request.confirm_password)?;

    if store.email_taken(&request.email, None).await? {
        return Err(ApiError::EmailAlreadyTaken);
    }

    let password = SecretString::from(request.password);
    if !store
        .create_user(&request.name, &request.email, &password)
        .await?
    {
        return Err(ApiError::UnprocessableEntity("Could not create user"));
    }

    info!("User created");

    Ok(Json(CreatedUser {
        name: request.name,
        email: request.email,
    }))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated.", body = UserId),
        (status = 400, description = "Passwords did not match.", body = ErrorResponse),
        (status = 409, description = "Email already taken.", body = ErrorResponse),
        (status = 422, description = "Invalid body, unknown user or the store refused the change.", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(user.id = %id))]
pub async fn update_user(
    Path(id): Path<String>,
    Extension(store): Extension<SharedStore>,
    Validated(request): Validated<UpdateUserRequest>,
) -> Result<Json<UserId>, ApiError> {
    let password = password_change(request.password, request.confirm_password)?;

    if store.email_taken(&request.email, Some(&id)).await? {
        return Err(ApiError::EmailAlreadyTaken);
    }

    if !store
        .update_user(&id, &request.name, &request.email, password.as_ref())
        .await?
    {
        return Err(ApiError::UnprocessableEntity("Could not update user"));
    }

    info!("User updated");

    Ok(Json(UserId { id }))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    request_body = PasswordPatchRequest,
    responses(
        (status = 200, description = "Password changed.", body = UserId),
        (status = 400, description = "Wrong current password or confirmation mismatch.", body = ErrorResponse),
        (status = 401, description = "The store refused the password change.", body = ErrorResponse),
        (status = 422, description = "Invalid body or new password equals the old one.", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(user.id = %id))]
pub async fn patch_user_password(
    Path(id): Path<String>,
    Extension(store): Extension<SharedStore>,
    Validated(request): Validated<PasswordPatchRequest>,
) -> Result<Json<UserId>, ApiError> {
    let old_password = SecretString::from(request.old_password);
    if !store.verify_credential(&id, &old_password).await? {
        return Err(ApiError::InvalidPassword("Wrong password!"));
    }

    ensure_match(&request.new_password, &request.confirm_new_password)?;

    if request.new_password == old_password.expose_secret() {
        return Err(ApiError::UnprocessableEntity(
            "New password cannot equal old password",
        ));
    }

    let new_password = SecretString::from(request.new_password);
    if !store
        .patch_password(&id, &old_password, &new_password)
        .await?
    {
        return Err(ApiError::InvalidCredentials);
    }

    info!("Password changed");

    Ok(Json(UserId { id }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User deleted.", body = UserId),
        (status = 422, description = "Unknown user or the store refused the deletion.", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(user.id = %id))]
pub async fn delete_user(
    Path(id): Path<String>,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<UserId>, ApiError> {
    if !store.delete_user(&id).await? {
        return Err(ApiError::UnprocessableEntity("Could not delete user"));
    }

    info!("User deleted");

    Ok(Json(UserId { id }))
}
