use log::*;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::client::{ApiClient, Body};
use crate::error::{http_error, response_error, Error, HttpErrorKind, ResponseErrorKind};

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

impl UserCredentials {
    /// Parse `email:password`. The password may itself contain colons.
    pub fn parse(input: &str) -> Result<Self, Error> {
        match input.split_once(':') {
            Some((email, password)) if !email.is_empty() && !password.is_empty() => Ok(Self {
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err(http_error(
                HttpErrorKind::BuilderFailed,
                "Invalid credentials format. Expected email:password",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Open a staff session. The session cookie stays in the client's cookie jar;
/// use [`ApiClient::cookie_header`] to forward it elsewhere.
pub async fn login(
    client: &ApiClient,
    login_path: &str,
    credentials: &UserCredentials,
) -> Result<AuthenticatedUser, Error> {
    let data = client
        .mutate(
            Method::POST,
            login_path,
            &[],
            Body::Json(json!({
                "email": credentials.email,
                "password": credentials.password,
            })),
        )
        .await?;

    let user: AuthenticatedUser = serde_json::from_value(data)
        .map_err(|e| response_error(ResponseErrorKind::Malformed, &e.to_string()))?;
    info!("Logged in as user {}", user.user_id);

    // PHP regenerates the session id on login; the old token belongs to the old session.
    client.csrf().invalidate().await;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_parse_email_and_password() {
        let creds = UserCredentials::parse("staff@shop.test:s3cr:et").unwrap();
        assert_eq!(creds.email, "staff@shop.test");
        assert_eq!(creds.password, "s3cr:et");
    }

    #[test]
    fn credentials_without_separator_are_rejected() {
        assert!(UserCredentials::parse("staff@shop.test").is_err());
        assert!(UserCredentials::parse(":password").is_err());
    }
}
