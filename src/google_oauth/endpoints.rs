use crate::config::YOUTUBE_SCOPE;
use crate::error::DeckError;
use crate::google_oauth::client_secrets::ClientSecrets;
use crate::google_oauth::credentials::Credential;

use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EmptyExtraTokenFields, EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, RefreshToken, Scope, StandardRevocableToken, StandardTokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use tracing::info;
use url::Url;

/// Stateless Google OAuth endpoints.
pub(crate) struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Consent page URL plus the CSRF token the callback must echo back.
    pub(crate) fn build_authorize_url(
        secrets: &ClientSecrets,
        redirect_uri: &Url,
        challenge: PkceCodeChallenge,
    ) -> Result<(Url, CsrfToken), DeckError> {
        let client = build_login_client(secrets, redirect_uri)?;
        Ok(client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(YOUTUBE_SCOPE.to_string()))
            .set_pkce_challenge(challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("include_granted_scopes", "true")
            .add_extra_param("prompt", "consent")
            .url())
    }

    pub(crate) async fn exchange_authorization_code(
        secrets: &ClientSecrets,
        redirect_uri: &Url,
        code: AuthorizationCode,
        verifier: PkceCodeVerifier,
        http_client: &reqwest::Client,
    ) -> Result<GoogleTokenResponse, DeckError> {
        let client = build_login_client(secrets, redirect_uri)?;
        let token = client
            .exchange_code(code)
            .set_pkce_verifier(verifier)
            .request_async(http_client)
            .await?;
        info!("Authorization code exchanged successfully");
        Ok(token)
    }

    /// Exchange the credential's refresh token at its own token endpoint.
    pub(crate) async fn refresh_access_token(
        creds: &Credential,
        refresh_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<GoogleTokenResponse, DeckError> {
        let client_id = creds
            .client_id
            .clone()
            .ok_or_else(|| DeckError::Oauth2Token("credential has no client_id".to_string()))?;
        let mut client = OAuth2Client::new(ClientId::new(client_id))
            .set_token_uri(TokenUrl::from_url(creds.token_uri.clone()));
        if let Some(secret) = creds.client_secret.clone() {
            client = client.set_client_secret(ClientSecret::new(secret));
        }
        let client: GoogleRefreshClient = client;
        let token = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http_client)
            .await?;
        info!(token_uri = %creds.token_uri, "Access token refreshed successfully");
        Ok(token)
    }
}

fn build_login_client(
    secrets: &ClientSecrets,
    redirect_uri: &Url,
) -> Result<GoogleOauth2Client, DeckError> {
    let client = OAuth2Client::new(ClientId::new(secrets.client_id.clone()))
        .set_client_secret(ClientSecret::new(secrets.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(secrets.auth_uri.clone())?)
        .set_token_uri(TokenUrl::new(secrets.token_uri.clone())?)
        .set_redirect_uri(RedirectUrl::from_url(redirect_uri.clone()));
    Ok(client)
}

pub(crate) type GoogleTokenResponse = StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>;

pub(crate) type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

type GoogleRefreshClient = OAuth2Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
