use anyhow::{Context, Result};
use data_encoding::BASE32_NOPAD;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rand::RngCore;
use std::time::{Duration, SystemTime};

use crate::models::{Session, User};

use super::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: ObjectId,
    pub email: String,
    pub secret: String,
    pub display_name: Option<String>,
}

impl TryFrom<User> for AuthUser {
    type Error = anyhow::Error;

    fn try_from(user: User) -> Result<Self> {
        Ok(AuthUser {
            id: user.id.context("user missing _id")?,
            email: user.email,
            secret: user.secret,
            display_name: user.display_name,
        })
    }
}

pub async fn find_user(state: &AppState, email: &str) -> Result<Option<AuthUser>> {
    let email = email.trim().to_lowercase();
    match state.users.find_one(doc! { "email": email }).await? {
        Some(user) => AuthUser::try_from(user).map(Some),
        None => Ok(None),
    }
}

pub async fn create_user(
    state: &AppState,
    email: &str,
    secret: &str,
    display_name: Option<String>,
) -> Result<ObjectId> {
    let res = state
        .users
        .insert_one(User {
            id: None,
            email: email.trim().to_lowercase(),
            secret: secret.to_string(),
            display_name,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("user insert missing _id")
}

/// Replaces any existing session for the user and returns the new token.
pub async fn create_session(state: &AppState, email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let _ = state
        .sessions
        .delete_many(doc! { "user_email": &email })
        .await;

    let mut token_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut token_bytes);
    let token = BASE32_NOPAD.encode(&token_bytes);

    let expires_at = DateTime::from_system_time(
        SystemTime::now() + Duration::from_secs(state.settings.session_ttl_seconds),
    );

    state
        .sessions
        .insert_one(Session {
            id: None,
            token: token.clone(),
            user_email: email,
            expires_at,
        })
        .await?;

    Ok(token)
}

pub async fn find_user_by_session(state: &AppState, token: &str) -> Result<Option<AuthUser>> {
    let Some(session) = state.sessions.find_one(doc! { "token": token }).await? else {
        return Ok(None);
    };
    if session.expires_at.to_system_time() <= SystemTime::now() {
        let _ = state.sessions.delete_one(doc! { "token": token }).await;
        return Ok(None);
    }
    find_user(state, &session.user_email).await
}

pub async fn delete_session(state: &AppState, token: &str) -> Result<()> {
    state.sessions.delete_one(doc! { "token": token }).await?;
    Ok(())
}
