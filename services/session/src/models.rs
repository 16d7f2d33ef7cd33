//! Auth service request and response bodies

use serde::{Deserialize, Deserializer, Serialize};

/// Request for user login
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Response for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Numeric for therapists (`-1` for the admin account)
    #[serde(deserialize_with = "id_as_string")]
    pub therapist_id: String,
    pub full_name: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Request for token refresh
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response for token refresh
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Number(i64),
        Text(String),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Number(n) => n.to_string(),
        IdRepr::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_numeric_id() {
        let body = r#"{
            "therapist_id": 17,
            "access_token": "a",
            "refresh_token": "r",
            "full_name": "Dana Levi",
            "token_type": "bearer"
        }"#;
        let response: LoginResponse = serde_json::from_str(body).expect("valid body");
        assert_eq!(response.therapist_id, "17");
        assert_eq!(response.token_type.as_deref(), Some("bearer"));
    }

    #[test]
    fn test_login_response_admin_id() {
        let body = r#"{"therapist_id": -1, "access_token": "a", "refresh_token": "r", "full_name": "Admin"}"#;
        let response: LoginResponse = serde_json::from_str(body).expect("valid body");
        assert_eq!(response.therapist_id, "-1");
        assert!(response.token_type.is_none());
    }

    #[test]
    fn test_refresh_response_without_refresh_token() {
        let response: RefreshTokenResponse =
            serde_json::from_str(r#"{"access_token": "a2"}"#).expect("valid body");
        assert_eq!(response.access_token, "a2");
        assert!(response.refresh_token.is_none());
    }
}
