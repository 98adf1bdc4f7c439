//! Bearer tokens for the remote list-store.
//!
//! Two flows against `{authority_host}/{tenant}/oauth2/v2.0`:
//! - client credentials (service principal with a secret)
//! - device code (interactive user sign-in from a terminal)

use anyhow::{Context, Result};
use extrato_core::ExtratoError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// What the user must do to finish a device-code sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
    pub message: Option<String>,
}

fn default_interval() -> u64 {
    5
}

pub fn authority_url(authority_host: &str, tenant_id: &str) -> String {
    format!("{}/{}", authority_host.trim_end_matches('/'), tenant_id)
}

pub fn token_endpoint(authority: &str) -> String {
    format!("{authority}/oauth2/v2.0/token")
}

pub fn device_code_endpoint(authority: &str) -> String {
    format!("{authority}/oauth2/v2.0/devicecode")
}

/// Turn a token endpoint response into a token, or an error carrying the
/// response body when no `access_token` is present.
pub fn parse_token_response(body: &str) -> Result<AccessToken> {
    let resp: TokenResponse = serde_json::from_str(body)
        .map_err(|_| ExtratoError::Token(body.to_string()))?;
    match resp.access_token {
        Some(token) if !token.is_empty() => Ok(AccessToken {
            token,
            expires_in: resp.expires_in,
        }),
        _ => Err(ExtratoError::Token(body.to_string()).into()),
    }
}

pub async fn client_credentials_token(
    http: &reqwest::Client,
    authority: &str,
    creds: &ClientCredentials,
    scope: &str,
) -> Result<AccessToken> {
    let url = token_endpoint(authority);
    debug!(%url, "requesting client-credentials token");

    let resp = http
        .post(&url)
        .form(&[
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ])
        .send()
        .await
        .context("token request")?;

    let body = resp.text().await.context("reading token response")?;
    let token = parse_token_response(&body)?;
    info!("token acquired");
    Ok(token)
}

/// Interactive sign-in. `on_prompt` receives the code the user must enter;
/// polling then continues at the issued interval until the user finishes,
/// declines, or the code expires.
pub async fn device_code_token(
    http: &reqwest::Client,
    authority: &str,
    client_id: &str,
    scope: &str,
    mut on_prompt: impl FnMut(&DeviceCode),
) -> Result<AccessToken> {
    let resp = http
        .post(device_code_endpoint(authority))
        .form(&[("client_id", client_id), ("scope", scope)])
        .send()
        .await
        .context("device code request")?;

    let status = resp.status();
    let body = resp.text().await.context("reading device code response")?;
    if !status.is_success() {
        return Err(ExtratoError::Token(format!("{status} {body}")).into());
    }
    let code: DeviceCode = serde_json::from_str(&body).context("parse device code response")?;
    on_prompt(&code);

    let url = token_endpoint(authority);
    let mut interval = code.interval;
    let mut waited = 0;

    loop {
        tokio::time::sleep(Duration::from_secs(interval)).await;
        waited += interval;

        let resp = http
            .post(&url)
            .form(&[
                ("client_id", client_id),
                ("grant_type", DEVICE_CODE_GRANT),
                ("device_code", code.device_code.as_str()),
            ])
            .send()
            .await
            .context("token poll")?;
        let body = resp.text().await.context("reading token response")?;

        match poll_outcome(&body) {
            PollOutcome::Pending => {}
            PollOutcome::SlowDown => interval += 5,
            PollOutcome::Done => return parse_token_response(&body),
            PollOutcome::Failed => return Err(ExtratoError::Token(body).into()),
        }

        if waited >= code.expires_in {
            return Err(ExtratoError::Token("device code expired before sign-in completed".into()).into());
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Pending,
    SlowDown,
    Done,
    Failed,
}

fn poll_outcome(body: &str) -> PollOutcome {
    let Ok(resp) = serde_json::from_str::<TokenResponse>(body) else {
        return PollOutcome::Failed;
    };
    if resp.access_token.is_some() {
        return PollOutcome::Done;
    }
    match resp.error.as_deref() {
        Some("authorization_pending") => PollOutcome::Pending,
        Some("slow_down") => PollOutcome::SlowDown,
        _ => {
            debug!(error = ?resp.error, description = ?resp.error_description, "device code poll failed");
            PollOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let a = authority_url("https://login.microsoftonline.com/", "tenant-1");
        assert_eq!(a, "https://login.microsoftonline.com/tenant-1");
        assert_eq!(
            token_endpoint(&a),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
        assert_eq!(
            device_code_endpoint(&a),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/devicecode"
        );
    }

    #[test]
    fn test_parse_token_ok() {
        let t = parse_token_response(r#"{"token_type":"Bearer","expires_in":3599,"access_token":"eyJ0"}"#).unwrap();
        assert_eq!(t.token, "eyJ0");
        assert_eq!(t.expires_in, Some(3599));
    }

    #[test]
    fn test_parse_token_error_carries_body() {
        let body = r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret"}"#;
        let err = parse_token_response(body).unwrap_err();
        assert!(err.to_string().contains("AADSTS7000215"));

        let err = parse_token_response("<html>bad gateway</html>").unwrap_err();
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_poll_outcomes() {
        assert_eq!(poll_outcome(r#"{"error":"authorization_pending"}"#), PollOutcome::Pending);
        assert_eq!(poll_outcome(r#"{"error":"slow_down"}"#), PollOutcome::SlowDown);
        assert_eq!(poll_outcome(r#"{"access_token":"x"}"#), PollOutcome::Done);
        assert_eq!(poll_outcome(r#"{"error":"expired_token"}"#), PollOutcome::Failed);
        assert_eq!(poll_outcome("nope"), PollOutcome::Failed);
    }

    #[test]
    fn test_device_code_defaults_interval() {
        let code: DeviceCode = serde_json::from_str(
            r#"{"device_code":"d","user_code":"ABCD-EFGH","verification_uri":"https://microsoft.com/devicelogin","expires_in":900}"#,
        )
        .unwrap();
        assert_eq!(code.interval, 5);
        assert!(code.message.is_none());
    }
}
