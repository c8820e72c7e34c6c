//! REST client for the game panel: socket credentials (client API) and
//! server/user listings (application API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::PanelError;
use crate::tls::CaBundle;
use crate::types::{Credential, CredentialResponse, ListPage, ServerInfo, UserInfo};

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Anything that can hand out socket credentials for a server.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn websocket_credentials(
        &self,
        server_id: &str,
        api_key: &str,
    ) -> Result<Credential, PanelError>;
}

#[derive(Debug, Clone)]
pub struct PanelClient {
    base: Url,
    http: Client,
}

impl PanelClient {
    pub fn new(base_url: &str, ca: Option<&CaBundle>) -> Result<Self, PanelError> {
        // Url::join drops the last path segment unless the base ends in '/'
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base =
            Url::parse(&normalized).map_err(|e| PanelError::InvalidUrl(base_url.to_string(), e))?;

        let mut builder = Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(concat!("panelwatch/", env!("CARGO_PKG_VERSION")));
        if let Some(ca) = ca {
            for cert in ca.reqwest_certificates()? {
                builder = builder.add_root_certificate(cert);
            }
        }
        Ok(Self {
            base,
            http: builder.build()?,
        })
    }

    /// Panel origin (scheme://host[:port]) as wings expects in the Origin header.
    pub fn origin(&self) -> String {
        self.base.origin().ascii_serialization()
    }

    fn endpoint(&self, path: &str) -> Result<Url, PanelError> {
        self.base
            .join(path)
            .map_err(|e| PanelError::InvalidUrl(path.to_string(), e))
    }

    fn authorized(&self, url: Url, api_key: &str) -> RequestBuilder {
        self.http
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .header(header::ACCEPT, "application/json")
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        api_key: &str,
    ) -> Result<T, PanelError> {
        debug!(%url, "panel request");
        let resp = self.authorized(url, api_key).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PanelError::Status { status, body });
        }
        Ok(resp.json::<T>().await?)
    }

    // Walks `?page=1..total_pages` and flattens the attributes.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: &str,
    ) -> Result<Vec<T>, PanelError> {
        if api_key.trim().is_empty() {
            return Err(PanelError::MissingApiKey);
        }
        let mut out = Vec::new();
        let mut page = 1u32;
        loop {
            let mut url = self.endpoint(path)?;
            url.query_pairs_mut().append_pair("page", &page.to_string());
            let list: ListPage<T> = self.get_json(url, api_key).await?;
            out.extend(list.data.into_iter().map(|i| i.attributes));
            match list.meta.pagination {
                Some(p) if page < p.total_pages => page += 1,
                _ => break,
            }
        }
        Ok(out)
    }

    pub async fn list_servers(&self, admin_key: &str) -> Result<Vec<ServerInfo>, PanelError> {
        self.get_all("api/application/servers", admin_key).await
    }

    pub async fn list_users(&self, admin_key: &str) -> Result<Vec<UserInfo>, PanelError> {
        self.get_all("api/application/users", admin_key).await
    }
}

#[async_trait]
impl CredentialSource for PanelClient {
    async fn websocket_credentials(
        &self,
        server_id: &str,
        api_key: &str,
    ) -> Result<Credential, PanelError> {
        if api_key.trim().is_empty() {
            return Err(PanelError::MissingApiKey);
        }
        // The id is one percent-encoded segment, never URL syntax
        let mut url = self.endpoint("api/client/servers/")?;
        url.path_segments_mut()
            .map_err(|_| {
                PanelError::InvalidUrl(
                    self.base.to_string(),
                    url::ParseError::RelativeUrlWithCannotBeABaseBase,
                )
            })?
            .pop_if_empty()
            .push(server_id)
            .push("websocket");
        let resp: CredentialResponse = self.get_json(url, api_key).await?;
        Ok(resp.data)
    }
}
