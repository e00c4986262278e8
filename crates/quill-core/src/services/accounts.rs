//! Registration and credential checks.

use crate::domain::{Account, Role, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{PasswordService, Transaction, UserStore};
use crate::validation::{self, ValidationErrors};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Input for registering a new author account.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.add("name", validation::required("name"));
        }

        if self.username.is_empty() {
            errors.add("username", validation::required("username"));
        } else if !is_alpha_dash(&self.username) {
            errors.add(
                "username",
                "The username field must only contain letters, numbers, dashes, and underscores.",
            );
        }

        if self.email.is_empty() {
            errors.add("email", validation::required("email"));
        } else if !is_email(&self.email) {
            errors.add("email", "The email field must be a valid email address.");
        }

        if self.password.is_empty() {
            errors.add("password", validation::required("password"));
        } else if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.add(
                "password",
                format!("The password field must be at least {MIN_PASSWORD_CHARS} characters."),
            );
        }

        errors.into_result()
    }
}

/// Credentials submitted at login.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.email.is_empty() {
            errors.add("email", validation::required("email"));
        } else if !is_email(&self.email) {
            errors.add("email", "The email field must be a valid email address.");
        }
        if self.password.is_empty() {
            errors.add("password", validation::required("password"));
        }

        errors.into_result()
    }
}

/// Create an author account and its profile.
pub async fn register(
    tx: &dyn Transaction,
    passwords: &dyn PasswordService,
    input: RegisterInput,
) -> Result<Account, DomainError> {
    input.validate()?;
    create_account(tx, passwords, input, Role::Author).await
}

/// Create an account with an explicit role; used by registration and seeding.
pub async fn create_account(
    tx: &dyn Transaction,
    passwords: &dyn PasswordService,
    input: RegisterInput,
    role: Role,
) -> Result<Account, DomainError> {
    let users = tx.users();

    if users.find_by_email(&input.email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = passwords
        .hash(&input.password)
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    let user = User::new(input.username, input.email, password_hash, role);
    users
        .create(user, input.name.trim().to_string())
        .await
        .map_err(|err| match err {
            RepoError::Duplicate(_) => email_taken(),
            other => other.into(),
        })
}

/// Check an email/password pair and return the matching user.
pub async fn authenticate(
    users: &dyn UserStore,
    passwords: &dyn PasswordService,
    email: &str,
    password: &str,
) -> Result<User, DomainError> {
    let user = users
        .find_by_email(email)
        .await?
        .ok_or(DomainError::InvalidCredentials)?;

    let valid = passwords
        .verify(password, &user.password_hash)
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    if !valid {
        return Err(DomainError::InvalidCredentials);
    }

    Ok(user)
}

fn email_taken() -> DomainError {
    ValidationErrors::single("email", validation::taken("email")).into()
}

fn is_alpha_dash(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.split('.').all(|part| !part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RegisterInput {
        RegisterInput {
            name: "Author One".to_string(),
            username: "author_1".to_string(),
            email: "author1@example.com".to_string(),
            password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_username_must_be_alpha_dash() {
        let mut bad = input();
        bad.username = "author one!".to_string();
        let errors = bad.validate().unwrap_err();
        assert!(errors.contains("username"));
    }

    #[test]
    fn test_email_format() {
        assert!(is_email("a@b.co"));
        assert!(is_email("admin@localhost"));
        assert!(!is_email("missing-at.example.com"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a@b@c.com"));
        assert!(!is_email("a@example..com"));
        assert!(!is_email("a b@example.com"));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let login = LoginInput {
            email: "not-an-email".to_string(),
            password: String::new(),
        };
        let errors = login.validate().unwrap_err();
        assert_eq!(
            errors.messages("email"),
            ["The email field must be a valid email address."]
        );
        assert_eq!(errors.messages("password"), ["The password field is required."]);
    }

    #[test]
    fn test_short_password_and_missing_name() {
        let mut bad = input();
        bad.password = "12345".to_string();
        bad.name = " ".to_string();
        let errors = bad.validate().unwrap_err();
        assert_eq!(
            errors.messages("password"),
            ["The password field must be at least 6 characters."]
        );
        assert_eq!(errors.messages("name"), ["The name field is required."]);
    }
}
