// OAuth2 credentials for the Smart Device Management API
//
// Installed-app flow: client secrets come from a downloaded credentials.json,
// the token is cached next to it and refreshed shortly before it expires.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use url::Url;

use super::error::{SdmError, SdmResult};

pub const SDM_SCOPE: &str = "https://www.googleapis.com/auth/sdm.service";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";

/// Tokens are refreshed this long before their recorded expiry
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Credential collaborator: yields a valid bearer token on demand
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> SdmResult<String>;
}

/// Client secrets of an installed application
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct CredentialsFile {
    installed: ClientSecrets,
}

impl ClientSecrets {
    /// Load the `installed` section of a credentials.json file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SdmResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SdmError::credentials(path, e.to_string()))?;
        let file: CredentialsFile =
            serde_json::from_str(&content).map_err(|e| SdmError::credentials(path, e.to_string()))?;
        Ok(file.installed)
    }

    /// Consent page URL for the authorization code flow
    pub fn authorization_url(&self, redirect_uri: &str) -> SdmResult<Url> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", SDM_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", "state-token"),
            ],
        )
        .map_err(|e| SdmError::authorization(format!("invalid auth URI {}: {}", self.auth_uri, e)))
    }
}

/// Cached token, stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Whether the token must be refreshed before use at `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_MARGIN_SECS) <= now,
            None => false,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SdmResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SdmError::token_store(path, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SdmError::token_store(path, e.to_string()))
    }

    /// Write the token, readable by the owner only
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SdmResult<()> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(self).map_err(|e| SdmError::token_store(path, e.to_string()))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path).map_err(|e| SdmError::token_store(path, e.to_string()))?;
        file.write_all(content.as_bytes())
            .map_err(|e| SdmError::token_store(path, e.to_string()))?;
        Ok(())
    }

    fn from_response(response: TokenResponse, previous_refresh: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: response.refresh_token.or(previous_refresh),
            expiry: response.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Pull the authorization code out of either a bare code or a redirect URL
pub fn extract_auth_code(input: &str) -> SdmResult<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SdmError::authorization("no authorization code entered"));
    }
    if !input.starts_with("http") {
        return Ok(input.to_string());
    }

    let url = Url::parse(input)
        .map_err(|e| SdmError::authorization(format!("failed to parse redirect URL: {}", e)))?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| SdmError::authorization("no authorization code found in redirect URL"))
}

/// Token provider backed by a token file and Google's OAuth2 endpoints
pub struct OAuthTokenProvider {
    secrets: ClientSecrets,
    token_file: PathBuf,
    redirect_uri: String,
    http: reqwest::Client,
    token: Mutex<Option<StoredToken>>,
}

impl OAuthTokenProvider {
    pub fn new(credentials_file: impl AsRef<Path>, token_file: impl Into<PathBuf>) -> SdmResult<Self> {
        let secrets = ClientSecrets::load_from_file(credentials_file)?;
        Ok(Self::with_secrets(secrets, token_file))
    }

    pub fn with_secrets(secrets: ClientSecrets, token_file: impl Into<PathBuf>) -> Self {
        Self {
            secrets,
            token_file: token_file.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            http: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    fn persist(&self, token: &StoredToken) {
        if let Err(e) = token.save_to_file(&self.token_file) {
            log::warn!("Failed to save token: {}", e);
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> SdmResult<TokenResponse> {
        let response = self
            .http
            .post(&self.secrets.token_uri)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<TokenResponse>()
                .await
                .map_err(|e| SdmError::invalid_response(format!("token response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) if err.error == "invalid_grant" => Err(SdmError::InvalidGrant(
                err.error_description.unwrap_or(err.error),
            )),
            Ok(err) => Err(SdmError::Api {
                endpoint: self.secrets.token_uri.clone(),
                status: status.as_u16(),
                message: match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
            }),
            Err(_) => Err(SdmError::Api {
                endpoint: self.secrets.token_uri.clone(),
                status: status.as_u16(),
                message: body,
            }),
        }
    }

    async fn refresh(&self, token: &StoredToken) -> SdmResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| SdmError::InvalidGrant("cached token has no refresh token".to_string()))?;

        log::debug!("Refreshing access token");
        let response = self
            .request_token(&[
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        Ok(StoredToken::from_response(
            response,
            token.refresh_token.clone(),
            Utc::now(),
        ))
    }

    async fn authorize_interactively(&self) -> SdmResult<StoredToken> {
        let auth_url = self.secrets.authorization_url(&self.redirect_uri)?;
        println!("Go to the following link in your browser:\n{}", auth_url);
        print!("Enter the authorization code or redirect URL: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        let code = extract_auth_code(&line)?;

        let response = self
            .request_token(&[
                ("code", code.as_str()),
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await
            .map_err(|e| SdmError::authorization(format!("failed to exchange code for token: {}", e)))?;
        log::info!("Authorization complete");
        Ok(StoredToken::from_response(response, None, Utc::now()))
    }

    async fn current_token(&self, cached: Option<StoredToken>) -> SdmResult<StoredToken> {
        let token = match cached {
            Some(token) => token,
            None => match StoredToken::load_from_file(&self.token_file) {
                Ok(token) => token,
                Err(e) => {
                    log::info!("No usable cached token ({}), starting authorization", e);
                    let token = self.authorize_interactively().await?;
                    self.persist(&token);
                    return Ok(token);
                }
            },
        };

        if !token.needs_refresh(Utc::now()) {
            return Ok(token);
        }

        match self.refresh(&token).await {
            Ok(refreshed) => {
                self.persist(&refreshed);
                Ok(refreshed)
            }
            Err(SdmError::InvalidGrant(reason)) => {
                log::warn!("Cached token rejected ({}), re-authorizing", reason);
                if let Err(e) = fs::remove_file(&self.token_file) {
                    log::warn!("Failed to remove expired token file: {}", e);
                }
                let token = self.authorize_interactively().await?;
                self.persist(&token);
                Ok(token)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn access_token(&self) -> SdmResult<String> {
        let mut guard = self.token.lock().await;
        let token = self.current_token(guard.take()).await?;
        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }
}

/// Fixed token, for tests and pre-authorized environments
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> SdmResult<String> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::{NamedTempFile, TempDir};

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "client-123.apps.googleusercontent.com".to_string(),
            client_secret: "shh".to_string(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        }
    }

    #[test]
    fn test_load_installed_credentials() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"{"installed":{"client_id":"abc","client_secret":"def","project_id":"p","redirect_uris":["http://localhost"]}}"#,
        )
        .unwrap();

        let loaded = ClientSecrets::load_from_file(file.path()).unwrap();
        assert_eq!(loaded.client_id, "abc");
        assert_eq!(loaded.client_secret, "def");
        assert_eq!(loaded.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_missing_credentials_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        let err = ClientSecrets::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("credentials.json"));
    }

    #[test]
    fn test_authorization_url_requests_offline_sdm_scope() {
        let url = secrets().authorization_url(DEFAULT_REDIRECT_URI).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("scope".to_string(), SDM_SCOPE.to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
        assert!(pairs.contains(&("redirect_uri".to_string(), DEFAULT_REDIRECT_URI.to_string())));
        assert!(url.as_str().starts_with(DEFAULT_AUTH_URI));
    }

    #[test]
    fn test_extract_auth_code() {
        assert_eq!(extract_auth_code("4/0Abc\n").unwrap(), "4/0Abc");
        assert_eq!(
            extract_auth_code("http://localhost:8080/?state=state-token&code=4%2F0Xyz&scope=x").unwrap(),
            "4/0Xyz"
        );
        assert!(extract_auth_code("http://localhost:8080/?state=state-token").is_err());
        assert!(extract_auth_code("   ").is_err());
    }

    #[test]
    fn test_needs_refresh_margin() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let mut token = StoredToken {
            access_token: "ya29.token".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expiry: Some(now + Duration::seconds(300)),
        };
        assert!(!token.needs_refresh(now));

        token.expiry = Some(now + Duration::seconds(30));
        assert!(token.needs_refresh(now));

        token.expiry = None;
        assert!(!token.needs_refresh(now));

        token.access_token.clear();
        assert!(token.needs_refresh(now));
    }

    #[test]
    fn test_token_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        let token = StoredToken {
            access_token: "ya29.token".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expiry: Some(Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()),
        };

        token.save_to_file(&path).unwrap();
        assert_eq!(StoredToken::load_from_file(&path).unwrap(), token);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_reads_token_with_offset_expiry() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"{"access_token":"a","token_type":"Bearer","refresh_token":"r","expiry":"2024-03-20T14:30:00.123456-07:00"}"#,
        )
        .unwrap();

        let token = StoredToken::load_from_file(file.path()).unwrap();
        assert_eq!(
            token.expiry.unwrap().timestamp(),
            Utc.with_ymd_and_hms(2024, 3, 20, 21, 30, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn test_refreshed_token_keeps_refresh_token() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let response = TokenResponse {
            access_token: "new".to_string(),
            token_type: None,
            refresh_token: None,
            expires_in: Some(3599),
        };
        let token = StoredToken::from_response(response, Some("1//refresh".to_string()), now);
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expiry, Some(now + Duration::seconds(3599)));
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticTokenProvider("token".to_string());
        assert_eq!(provider.access_token().await.unwrap(), "token");
    }
}
