use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use super::error::ApiError;
use super::middleware::CurrentStudent;
use crate::models::*;
use crate::registrar::Registrar;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Credentials
// ============================================================

pub async fn register(
    State(registrar): State<Registrar>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let student = registrar.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Student registered successfully".to_string(),
            student,
        }),
    ))
}

pub async fn login(
    State(registrar): State<Registrar>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginResponse>, ApiError> {
    registrar.login(input).await.map(Json).map_err(ApiError::from)
}

// ============================================================
// Courses
// ============================================================

pub async fn list_courses(
    State(registrar): State<Registrar>,
) -> Result<Json<CoursesResponse>, ApiError> {
    let courses = registrar.list_courses().await?;
    Ok(Json(CoursesResponse { courses }))
}

// ============================================================
// Enrollments
// ============================================================

pub async fn enroll(
    State(registrar): State<Registrar>,
    Extension(CurrentStudent(student_id)): Extension<CurrentStudent>,
    Json(input): Json<EnrollInput>,
) -> Result<(StatusCode, Json<EnrollResponse>), ApiError> {
    let enrollment = registrar.enroll(student_id, input.course_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            message: "Enrolled successfully".to_string(),
            enrollment,
        }),
    ))
}

pub async fn list_enrollments(
    State(registrar): State<Registrar>,
    Extension(CurrentStudent(student_id)): Extension<CurrentStudent>,
) -> Result<Json<EnrollmentsResponse>, ApiError> {
    let enrollments = registrar.list_enrollments(student_id).await?;
    Ok(Json(EnrollmentsResponse { enrollments }))
}

// ============================================================
// Ratings
// ============================================================

pub async fn rate(
    State(registrar): State<Registrar>,
    Extension(CurrentStudent(student_id)): Extension<CurrentStudent>,
    Json(input): Json<RateInput>,
) -> Result<Json<RateResponse>, ApiError> {
    let outcome = registrar
        .rate(student_id, input.course_id, input.rating)
        .await?;
    Ok(Json(RateResponse {
        message: "Course rated successfully".to_string(),
        outcome,
    }))
}
