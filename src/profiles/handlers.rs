use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    auth::jwt::AuthUser,
    bio::BioInput,
    error::ApiError,
    profiles::{
        dto::{PatchProfileRequest, UpsertProfileRequest},
        repo::{NewProfile, Profile, ProfilePatch},
    },
    state::AppState,
    users::dto::MessageResponse,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/profiles",
        get(get_profile)
            .post(upsert_profile)
            .patch(patch_profile)
            .delete(delete_profile),
    )
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .profiles
        .find_by_user(user_id)
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;
    Ok(Json(profile))
}

/// Create-or-update, with the bio written by the generation collaborator
/// before anything is stored. A writer failure is reported to the caller
/// and leaves the stored record untouched.
#[instrument(skip(state, payload))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let bio = state
        .bio
        .write_bio(&BioInput {
            name: user.name,
            skills: payload.skills.clone(),
            experience: payload.experience.clone(),
            education: payload.education.clone(),
            interests: payload.interests,
        })
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "bio writer failed");
            ApiError::Dependency("Profile generator")
        })?;

    let profile = if state.profiles.find_by_user(user_id).await?.is_some() {
        state
            .profiles
            .update(
                user_id,
                ProfilePatch {
                    title: payload.title,
                    bio: Some(bio),
                    skills: Some(payload.skills),
                    experience: Some(payload.experience),
                    education: Some(payload.education),
                },
            )
            .await?
            .ok_or(ApiError::NotFound("Profile"))?
    } else {
        state
            .profiles
            .create(
                user_id,
                NewProfile {
                    title: payload.title,
                    bio: Some(bio),
                    skills: payload.skills,
                    experience: payload.experience,
                    education: payload.education,
                },
            )
            .await?
    };

    info!(user_id, profile_id = profile.id, "profile upserted");
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn patch_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<PatchProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .profiles
        .update(
            user_id,
            ProfilePatch {
                title: payload.title,
                bio: payload.bio,
                skills: payload.skills,
                experience: payload.experience,
                education: payload.education,
            },
        )
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;
    Ok(Json(profile))
}

#[instrument(skip(state))]
pub async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.profiles.delete(user_id).await? {
        return Err(ApiError::NotFound("Profile"));
    }
    info!(user_id, "profile deleted");
    Ok(Json(MessageResponse {
        message: "Profile deleted successfully".into(),
    }))
}
