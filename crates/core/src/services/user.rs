//! User service: accounts, tokens and the administrator check.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use resource_common::{AppError, AppResult, IdGenerator, id::PAIR_KEY_SEPARATOR};
use resource_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for email/password sign-up.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpInput {
    #[validate(email, length(max = 320))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(min = 1, max = 256))]
    pub display_name: String,
}

/// Identity asserted by a trusted external provider.
#[derive(Debug, Deserialize, Validate)]
pub struct SyncIdentityInput {
    /// Provider-issued user id. Falls back to the email match when absent.
    #[validate(length(min = 1, max = 128))]
    pub uid: Option<String>,

    #[validate(email, length(max = 320))]
    pub email: String,

    #[validate(length(max = 256))]
    pub display_name: Option<String>,

    #[validate(url, length(max = 1024))]
    pub photo_url: Option<String>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account and issue its first token.
    pub async fn sign_up(&self, input: SignUpInput) -> AppResult<user::Model> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            display_name: Set(Some(input.display_name.trim().to_string())),
            photo_url: Set(None),
            password_hash: Set(Some(password_hash)),
            token: Set(Some(self.id_gen.generate_token())),
            is_admin: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Verify credentials. The returned model carries the current token.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password_hash = user.password_hash.as_deref().ok_or(AppError::Unauthorized)?;
        if !verify_password(password, password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if user.token.is_some() {
            return Ok(user);
        }

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(self.id_gen.generate_token()));
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await
    }

    /// Invalidate the user's current token.
    pub async fn sign_out(&self, user_id: &str) -> AppResult<()> {
        self.regenerate_token(user_id).await?;
        info!(user_id = %user_id, "User signed out");
        Ok(())
    }

    /// Replace the user's token with a fresh one.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await?;

        Ok(new_token)
    }

    /// Create or merge the profile of a federated identity.
    ///
    /// Existing non-empty fields are kept; only missing ones are filled in.
    /// The administrator flag is never touched.
    pub async fn sync_identity(&self, input: SyncIdentityInput) -> AppResult<user::Model> {
        input.validate()?;
        if input
            .uid
            .as_deref()
            .is_some_and(|uid| uid.contains(PAIR_KEY_SEPARATOR))
        {
            return Err(AppError::Validation(format!(
                "uid must not contain '{PAIR_KEY_SEPARATOR}'"
            )));
        }

        let email = input.email.trim().to_lowercase();
        let existing = match &input.uid {
            Some(uid) => self.user_repo.find_by_id(uid).await?,
            None => self.user_repo.find_by_email(&email).await?,
        };

        let Some(user) = existing else {
            if input.uid.is_some() && self.user_repo.find_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict(
                    "Email belongs to another account".to_string(),
                ));
            }
            let model = user::ActiveModel {
                id: Set(input.uid.unwrap_or_else(|| self.id_gen.generate())),
                email: Set(email),
                display_name: Set(input.display_name),
                photo_url: Set(input.photo_url),
                password_hash: Set(None),
                token: Set(Some(self.id_gen.generate_token())),
                is_admin: Set(false),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            };
            let user = self.user_repo.create(model).await?;
            info!(user_id = %user.id, "User created from identity provider");
            return Ok(user);
        };

        let fill_name = user.display_name.is_none() && input.display_name.is_some();
        let fill_photo = user.photo_url.is_none() && input.photo_url.is_some();
        let fill_token = user.token.is_none();
        if !(fill_name || fill_photo || fill_token) {
            return Ok(user);
        }

        let mut active: user::ActiveModel = user.into();
        if fill_name {
            active.display_name = Set(input.display_name);
        }
        if fill_photo {
            active.photo_url = Set(input.photo_url);
        }
        if fill_token {
            active.token = Set(Some(self.id_gen.generate_token()));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Get a user by ID.
    pub async fn get_profile(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Whether the user holds the administrator role.
    ///
    /// Unknown users are not administrators.
    pub async fn is_administrator(&self, user_id: &str) -> AppResult<bool> {
        Ok(self
            .user_repo
            .find_by_id(user_id)
            .await?
            .is_some_and(|user| user.is_admin))
    }

    /// Fail with `Forbidden` unless the user is an administrator.
    pub async fn require_administrator(&self, user_id: &str) -> AppResult<()> {
        if self.is_administrator(user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Administrator access required".to_string(),
            ))
        }
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
