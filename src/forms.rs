use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use regex::Regex;
use std::collections::BTreeMap;

use crate::models::{UpdatePostRequest, UpdateProfileRequest};

/// Field-level validation errors, keyed by field name. BTreeMap keeps the
/// serialized order deterministic for clients and tests.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

/// Maximum length of a post title (matches the `title` column).
pub const MAX_TITLE_LEN: usize = 256;
/// Maximum length of a username (matches the `username` column).
pub const MAX_USERNAME_LEN: usize = 150;

/// Appends a message to a field's error list.
pub fn add_error(errors: &mut FieldErrors, field: &'static str, message: &str) {
    errors.entry(field).or_default().push(message.to_string());
}

/// validation_response
///
/// Renders a set of field errors as the standard validation-failure response:
/// 422 with a field → messages JSON body. No state change accompanies it; the
/// client re-renders its form from this payload.
pub fn validation_response(errors: FieldErrors) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
}

fn looks_like_email(email: &str) -> bool {
    let re = Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").unwrap();
    re.is_match(email)
}

fn valid_username(username: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z0-9@.+_-]+$").unwrap();
    !username.is_empty() && username.len() <= MAX_USERNAME_LEN && re.is_match(username)
}

fn check_title(errors: &mut FieldErrors, title: &str) {
    if title.trim().is_empty() {
        add_error(errors, "title", "title must not be empty");
    } else if title.len() > MAX_TITLE_LEN {
        add_error(errors, "title", "title must be at most 256 characters");
    }
}

fn check_text(errors: &mut FieldErrors, text: &str) {
    if text.trim().is_empty() {
        add_error(errors, "text", "text must not be empty");
    }
}

/// validate_post
///
/// Field checks for a new post submission. Category existence is checked
/// separately by the handler against the repository.
pub fn validate_post(title: &str, text: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_title(&mut errors, title);
    check_text(&mut errors, text);
    errors
}

/// validate_post_update
///
/// Field checks for a partial post update: only the provided fields are
/// validated, absent fields keep their stored values.
pub fn validate_post_update(req: &UpdatePostRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if let Some(title) = &req.title {
        check_title(&mut errors, title);
    }
    if let Some(text) = &req.text {
        check_text(&mut errors, text);
    }
    errors
}

/// validate_comment
///
/// An empty or whitespace-only comment is a validation failure, surfaced to
/// the submitter rather than silently dropped.
pub fn validate_comment(text: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_text(&mut errors, text);
    errors
}

/// validate_profile
///
/// Field checks for the profile self-edit payload (username, email and the
/// optional display names).
pub fn validate_profile(req: &UpdateProfileRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !valid_username(&req.username) {
        add_error(
            &mut errors,
            "username",
            "username must be 1-150 characters of letters, digits or @.+-_",
        );
    }
    if !looks_like_email(&req.email) {
        add_error(&mut errors, "email", "email address is not valid");
    }
    errors
}

/// validate_registration
///
/// Checks the local fields of a registration payload. The password policy is
/// owned by the external auth provider and not duplicated here.
pub fn validate_registration(username: &str, email: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !valid_username(username) {
        add_error(
            &mut errors,
            "username",
            "username must be 1-150 characters of letters, digits or @.+-_",
        );
    }
    if !looks_like_email(email) {
        add_error(&mut errors, "email", "email address is not valid");
    }
    errors
}
