use kunai_core::types::{AuthScheme, ProviderServerInfo};
use kunai_rfc::rfc::dav::owa_auth_url;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use tokio::sync::Mutex;
use url::Url;

use crate::error::{ServiceError, ServiceResult};

/// Outlook Web Access answers this when the form session has expired.
const OWA_SESSION_EXPIRED: u16 = 440;

fn session_expired(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status.as_u16() == OWA_SESSION_EXPIRED
}

/// HTTP session against one Exchange server.
///
/// Form logins keep their session in the client's cookie store and are
/// repeated once when the server reports the session as expired.
pub struct ExchangeHttp {
    client: reqwest::Client,
    logged_in: Mutex<bool>,
}

impl ExchangeHttp {
    /// ## Errors
    /// Returns `ServiceError::HttpError` if the client cannot be built.
    pub fn new() -> ServiceResult<Self> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(client))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            logged_in: Mutex::new(false),
        }
    }

    /// Sends one request and returns the body of a successful answer.
    ///
    /// ## Errors
    /// Returns `ServiceError::TransportFailure` for non-success statuses and
    /// `ServiceError::HttpError` when the request could not be sent.
    #[tracing::instrument(skip_all, fields(%method, %url))]
    pub async fn send(
        &self,
        info: &ProviderServerInfo,
        method: Method,
        url: Url,
        content_type: &str,
        body: Option<String>,
    ) -> ServiceResult<String> {
        let form = info.auth_scheme == AuthScheme::Form;
        if form {
            self.login(info, false).await?;
        }

        let mut response = self
            .request(info, method.clone(), url.clone(), content_type, body.clone())
            .send()
            .await?;
        if form && session_expired(response.status()) {
            tracing::debug!("Form session expired, logging in again");
            self.login(info, true).await?;
            response = self
                .request(info, method.clone(), url.clone(), content_type, body)
                .send()
                .await?;
        }

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(%status, "Exchange request failed");
            return Err(ServiceError::TransportFailure(format!(
                "{method} {url} answered {status}"
            )));
        }
        Ok(text)
    }

    fn request(
        &self,
        info: &ProviderServerInfo,
        method: Method,
        url: Url,
        content_type: &str,
        body: Option<String>,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, content_type);
        if info.auth_scheme == AuthScheme::Basic {
            request = request.basic_auth(&info.username, Some(&info.password));
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        request
    }

    async fn login(&self, info: &ProviderServerInfo, force: bool) -> ServiceResult<()> {
        let mut logged_in = self.logged_in.lock().await;
        if *logged_in && !force {
            return Ok(());
        }

        let destination = format!("{}/exchange/", info.url.trim_end_matches('/'));
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("destination", &destination)
            .append_pair("flags", "0")
            .append_pair("username", &info.username)
            .append_pair("password", &info.password)
            .finish();
        let response = self
            .client
            .post(owa_auth_url(&info.url)?)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            *logged_in = false;
            return Err(ServiceError::TransportFailure(format!(
                "form login to {} answered {status}",
                info.url
            )));
        }
        tracing::debug!(server = %info.url, "Form login succeeded");
        *logged_in = true;
        Ok(())
    }
}
