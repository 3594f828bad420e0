//! Registration and password sign-in.

use std::sync::Arc;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use thiserror::Error;
use tracing::info;

use crate::application::forms::FieldErrors;
use crate::application::repos::{AuthorsRepo, CreateAuthorParams, RepoError};
use crate::config::AuthSettings;
use crate::domain::entities::AuthorRecord;
use crate::domain::rules::{MIN_PASSWORD_LEN, validate_username};

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl From<&AuthSettings> for HashingCost {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            memory_kib: settings.password_memory_kib.get(),
            iterations: settings.password_iterations.get(),
            parallelism: settings.password_parallelism.get(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid input: {0}")]
    Invalid(FieldErrors),
    #[error("username or password is incorrect")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AccountService {
    authors: Arc<dyn AuthorsRepo>,
    params: Params,
}

impl AccountService {
    pub fn new(authors: Arc<dyn AuthorsRepo>, cost: HashingCost) -> Result<Self, AccountError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|err| AccountError::Hashing(err.to_string()))?;
        Ok(Self { authors, params })
    }

    pub async fn signup(&self, form: SignupForm) -> Result<AuthorRecord, AccountError> {
        let mut errors = FieldErrors::new();

        let username = match validate_username(&form.username) {
            Ok(username) => Some(username),
            Err(err) => {
                errors.push_domain("username", &err);
                None
            }
        };
        if let Some(username) = &username
            && self.authors.find_by_username(username).await?.is_some()
        {
            errors.push("username", "A user with that username already exists.");
        }

        let email = form.email.trim().to_string();
        if !email.is_empty() && !email.contains('@') {
            errors.push("email", "Enter a valid email address.");
        }

        if form.password1.chars().count() < MIN_PASSWORD_LEN {
            errors.push(
                "password1",
                format!("This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."),
            );
        }
        if form.password1 != form.password2 {
            errors.push("password2", "The two password fields didn't match.");
        }

        errors.into_result().map_err(AccountError::Invalid)?;
        let Some(username) = username else {
            return Err(AccountError::Invalid(FieldErrors::single(
                "username",
                "This field is required.",
            )));
        };

        let password_hash = self.hash_password(form.password1).await?;
        let author = self
            .authors
            .create_author(CreateAuthorParams {
                username,
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                email,
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::Invalid(FieldErrors::single(
                    "username",
                    "A user with that username already exists.",
                )),
                other => AccountError::Repo(other),
            })?;

        info!(
            target = "blogroll::accounts",
            author_id = author.id,
            username = %author.username,
            "author registered"
        );
        Ok(author)
    }

    pub async fn login(&self, form: LoginForm) -> Result<AuthorRecord, AccountError> {
        let username = form.username.trim();
        let Some(credentials) = self.authors.find_credentials(username).await? else {
            return Err(AccountError::InvalidCredentials);
        };

        let hash = credentials.password_hash;
        let password = form.password;
        let matches = tokio::task::spawn_blocking(move || {
            PasswordHash::new(&hash)
                .map(|parsed| {
                    Argon2::default()
                        .verify_password(password.as_bytes(), &parsed)
                        .is_ok()
                })
                .unwrap_or(false)
        })
        .await
        .map_err(|err| AccountError::Hashing(err.to_string()))?;

        if matches {
            Ok(credentials.author)
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AccountError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| AccountError::Hashing(err.to_string()))
        })
        .await
        .map_err(|err| AccountError::Hashing(err.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryRepositories;

    const CHEAP: HashingCost = HashingCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };

    fn service() -> AccountService {
        AccountService::new(Arc::new(MemoryRepositories::new()), CHEAP).unwrap()
    }

    fn signup_form(username: &str, password: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            password1: password.to_string(),
            password2: password.to_string(),
            ..SignupForm::default()
        }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let accounts = service();
        let author = accounts
            .signup(signup_form("leo", "war-and-peace"))
            .await
            .unwrap();

        let signed_in = accounts
            .login(LoginForm {
                username: "leo".to_string(),
                password: "war-and-peace".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(signed_in.id, author.id);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let accounts = service();
        accounts
            .signup(signup_form("leo", "war-and-peace"))
            .await
            .unwrap();

        for (username, password) in [("leo", "anna-karenina"), ("nobody", "war-and-peace")] {
            let err = accounts
                .login(LoginForm {
                    username: username.to_string(),
                    password: password.to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AccountError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn signup_reports_every_field_problem() {
        let accounts = service();
        let form = SignupForm {
            username: "bad name".to_string(),
            email: "nope".to_string(),
            password1: "short".to_string(),
            password2: "other".to_string(),
            ..SignupForm::default()
        };

        let Err(AccountError::Invalid(errors)) = accounts.signup(form).await else {
            panic!("expected validation errors");
        };
        assert!(errors.get("username").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("password1").is_some());
        assert!(errors.get("password2").is_some());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_field_error() {
        let accounts = service();
        accounts
            .signup(signup_form("leo", "war-and-peace"))
            .await
            .unwrap();

        let Err(AccountError::Invalid(errors)) =
            accounts.signup(signup_form("leo", "another-pass")).await
        else {
            panic!("expected duplicate username error");
        };
        assert_eq!(
            errors.get("username"),
            Some("A user with that username already exists.")
        );
    }
}
