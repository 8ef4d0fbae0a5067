use crate::MovesError;
use secrecy::SecretString;

pub const DEFAULT_BASE_URL: &str = "https://api.moves-app.com";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/auth";

/// An already-resolved OAuth credential. Acquiring it happens out of band.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub access_token: SecretString,
    pub base_url: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, MovesError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads credential values using the provided
    /// function. The application layers its config file under the process
    /// environment by passing a chained lookup here.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, MovesError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut non_empty = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        let access_token = non_empty("MOVES_ACCESS_TOKEN")
            .ok_or_else(|| MovesError::Config("MOVES_ACCESS_TOKEN missing".into()))?;
        let client_id = non_empty("MOVES_CLIENT_ID").unwrap_or_default();
        let client_secret = non_empty("MOVES_CLIENT_SECRET").unwrap_or_default();
        let redirect_uri =
            non_empty("MOVES_REDIRECT_URI").unwrap_or_else(|| DEFAULT_REDIRECT_URI.into());
        let base_url = non_empty("MOVES_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Ok(Self {
            client_id,
            client_secret: SecretString::new(client_secret.into()),
            redirect_uri,
            access_token: SecretString::new(access_token.into()),
            base_url,
        })
    }
}
