use log::{debug, info};
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

use crate::{
    config::SessionConfig,
    error::{AuthError, TransportError},
    parser::xjx_response,
    schema::FixtureId,
    xjx::{self, XjxCall},
};
use schedula_utils::credentials::Credentials;

const ADMIN_PAGE: &str = "index.php?action=admin/appointments/appoint_by_week";
const DASHBOARD: &str = "index.php?action=dashboard";

/// Raw HTTP access to the site.  Responses are returned as text whatever
/// their content; the site reports failures inside the body.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get(&self, url: Url) -> Result<String, TransportError>;
    async fn post(&self, url: Url, form_body: String) -> Result<String, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    origin: HeaderValue,
}

impl ReqwestTransport {
    pub fn new(config: &SessionConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)?;
        let origin = HeaderValue::from_str(&base_url.origin().ascii_serialization())
            .map_err(|e| TransportError::Other(format!("Invalid origin header: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers);
        if let Some(proxy) = &config.proxy {
            info!("Routing requests through proxy {proxy}");
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        Ok(Self {
            client: builder.build()?,
            origin,
        })
    }

    async fn text(response: reqwest::Response) -> Result<String, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                url: response.url().clone(),
            });
        }
        Ok(response.text().await?)
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: Url) -> Result<String, TransportError> {
        Self::text(self.client.get(url).send().await?).await
    }

    async fn post(&self, url: Url, form_body: String) -> Result<String, TransportError> {
        let response = self
            .client
            .post(url)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .header(header::ORIGIN, self.origin.clone())
            .body(form_body)
            .send()
            .await?;
        Self::text(response).await
    }
}

/// An authenticated session with the site.
///
/// Every request is awaited before the next one is issued; the server keeps
/// per-fixture edit state in the session, so requests must never overlap.
/// An expired session is not detected: later pages simply fail to parse.
pub struct SchedulaClient<T> {
    transport: T,
    base_url: Url,
}

impl<T: Transport> SchedulaClient<T> {
    pub fn new(transport: T, base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            transport,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches the landing page for the session cookie, then submits the
    /// login call.  The site answers with a redirect script; only a redirect
    /// to the dashboard means success.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        info!("Trying to log in as {}.", credentials.username);
        self.transport.get(self.base_url.clone()).await?;
        let response = self
            .call(self.base_url.clone(), xjx::login(credentials))
            .await?;
        let dashboard = self.base_url.join(DASHBOARD).map_err(TransportError::from)?;
        match xjx_response::login_redirect(&response) {
            Some(target) if target == dashboard.as_str() => {
                info!("Successfully logged in.");
                Ok(())
            }
            Some(target) => Err(AuthError::UnexpectedRedirect(target.to_owned())),
            None => Err(AuthError::MissingRedirect),
        }
    }

    pub fn admin_page_url(&self) -> Result<Url, TransportError> {
        Ok(self.base_url.join(ADMIN_PAGE)?)
    }

    pub fn fixture_page_url(&self, fixture: &FixtureId) -> Result<Url, TransportError> {
        Ok(self.base_url.join(&format!(
            "index.php?action=admin/appointments/appoint_match&fixtureid={fixture}&skeleton=true"
        ))?)
    }

    pub async fn get(&self, url: Url) -> Result<String, TransportError> {
        debug!("GET {url}");
        self.transport.get(url).await
    }

    pub async fn call(&self, url: Url, call: XjxCall) -> Result<String, TransportError> {
        debug!("{call}");
        let response = self.transport.post(url, call.body()?).await?;
        debug!("{} returned {} bytes", call.function(), response.len());
        Ok(response)
    }

    /// Calls registered on the appoint-by-week admin page.
    pub async fn call_admin(&self, call: XjxCall) -> Result<String, TransportError> {
        self.call(self.admin_page_url()?, call).await
    }

    /// Calls registered on the appointment page of `fixture`.
    pub async fn call_fixture(
        &self,
        fixture: &FixtureId,
        call: XjxCall,
    ) -> Result<String, TransportError> {
        self.call(self.fixture_page_url(fixture)?, call).await
    }
}
