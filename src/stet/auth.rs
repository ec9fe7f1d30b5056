use crate::core::errors::{AuthError, Dsp2Error};
use crate::core::kernel::RestClient;
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

pub const GRANT_TYPE: &str = "password";
pub const SCOPE: &str = "stet";

/// OAuth2 password-grant authenticator
///
/// Holds the credentials and the last token obtained. The token slot is guarded by
/// an async mutex held for the whole grant, so concurrent callers never run two
/// grants at once.
pub struct Authenticator {
    username: Secret<String>,
    password: Secret<String>,
    token_endpoint: String,
    token: Mutex<Option<Secret<String>>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token_endpoint", &self.token_endpoint)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Fails with `ConstructionError` if either credential is empty.
    pub fn new(
        username: Secret<String>,
        password: Secret<String>,
        token_endpoint: String,
    ) -> Result<Self, Dsp2Error> {
        if username.expose_secret().is_empty() || password.expose_secret().is_empty() {
            return Err(Dsp2Error::ConstructionError(
                "Username and password must be provided".to_string(),
            ));
        }

        Ok(Self {
            username,
            password,
            token_endpoint,
            token: Mutex::new(None),
        })
    }

    pub async fn has_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    /// Current token, if one has been obtained (use carefully - exposes secret)
    pub async fn token(&self) -> Option<String> {
        self.token
            .lock()
            .await
            .as_ref()
            .map(|t| t.expose_secret().clone())
    }

    /// Run the password grant, store the resulting token and hand it to `rest`
    ///
    /// A failed grant leaves no token stored.
    pub async fn authenticate<R: RestClient>(&self, rest: &R) -> Result<String, Dsp2Error> {
        let mut slot = self.token.lock().await;
        let result = self.request_token(rest).await;
        if let Ok(token) = &result {
            rest.set_token(token).await;
        }
        *slot = result.as_ref().ok().map(|t| Secret::new(t.clone()));
        result
    }

    /// Authenticate only if no token is held, then hand the fresh token to `rest`
    ///
    /// The gateway is updated before the lock is released, so a caller that waited
    /// on an in-flight grant finds both the token and the header in place.
    pub async fn ensure_authenticated<R: RestClient>(&self, rest: &R) -> Result<(), Dsp2Error> {
        let mut slot = self.token.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let token = self.request_token(rest).await?;
        rest.set_token(&token).await;
        *slot = Some(Secret::new(token));
        Ok(())
    }

    #[instrument(skip(self, rest), fields(endpoint = %self.token_endpoint))]
    async fn request_token<R: RestClient>(&self, rest: &R) -> Result<String, Dsp2Error> {
        let form = [
            ("grant_type", GRANT_TYPE),
            ("username", self.username.expose_secret().as_str()),
            ("password", self.password.expose_secret().as_str()),
            ("scope", SCOPE),
        ];

        let body = rest
            .post_form(&self.token_endpoint, &form)
            .await
            .map_err(|e| {
                error!(error = %e, "Token request failed");
                Dsp2Error::AuthenticationError(AuthError::TokenRequest(Box::new(e)))
            })?;

        match body.get("access_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => {
                info!("Authentication successful");
                Ok(token.to_string())
            }
            _ => {
                error!("Token response did not contain an access token");
                Err(Dsp2Error::AuthenticationError(AuthError::MissingToken))
            }
        }
    }
}
