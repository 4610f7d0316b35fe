//! Credential form checks run before a login reaches the store.

use std::sync::OnceLock;

use regex::Regex;
use store_core::error::StoreError;

pub const EMAIL_REQUIRED: &str = "Please input your email!";
pub const EMAIL_INVALID: &str = "Please enter a valid email!";
pub const PASSWORD_REQUIRED: &str = "Please input your password!";

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("regex is valid"))
}

/// Field-level messages; `None` means the field passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }

    /// All messages joined for display.
    pub fn summary(&self) -> String {
        [self.email, self.password]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn errors(&self) -> FormErrors {
        let email = if self.email.is_empty() {
            Some(EMAIL_REQUIRED)
        } else if !email_pattern().is_match(&self.email) {
            Some(EMAIL_INVALID)
        } else {
            None
        };
        let password = self.password.is_empty().then_some(PASSWORD_REQUIRED);
        FormErrors { email, password }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(errors.summary()))
        }
    }
}
