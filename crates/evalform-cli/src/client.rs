//! HTTP client for the evaluation API.

use std::time::Duration;

use async_trait::async_trait;
use evalform_core::error::{Error, Result};
use evalform_core::{
    CreateListEntryRequest, FormKey, FormService, FormSnapshot, ListEntry, ListEntryId,
    UpdateFormRequest, UpdateListEntryRequest, User,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::Config;

/// API client for the evaluation endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a new API client from configuration.
    ///
    /// Requests have no timeout unless `timeout_secs` is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::transport_with_source("failed to create HTTP client", e))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    fn form_url(&self, key: &FormKey) -> String {
        format!("{}/form-evaluations/{}", self.base_url, key.form_id)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| Error::transport_with_source(format!("failed to send request: {e}"), e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), %body, "API request rejected");
            Err(Error::Api {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        self.send(req)
            .await?
            .json()
            .await
            .map_err(|e| Error::Serialization {
                message: format!("failed to parse response: {e}"),
            })
    }
}

#[async_trait]
impl FormService for ApiClient {
    async fn fetch_form(&self, key: &FormKey) -> Result<FormSnapshot> {
        let req = self
            .client
            .get(self.form_url(key))
            .query(&[("farmerId", key.subject_id.as_str())]);
        self.send_json(req).await
    }

    async fn update_form(&self, key: &FormKey, request: &UpdateFormRequest) -> Result<()> {
        let req = self
            .client
            .put(self.form_url(key))
            .query(&[("farmerId", key.subject_id.as_str())])
            .json(request);
        self.send(req).await.map(|_| ())
    }

    async fn create_list_entry(&self, request: &CreateListEntryRequest) -> Result<ListEntry> {
        let url = format!("{}/list-form-evaluations", self.base_url);
        self.send_json(self.client.post(url).json(request)).await
    }

    async fn update_list_entry(
        &self,
        id: &ListEntryId,
        request: &UpdateListEntryRequest,
    ) -> Result<()> {
        let url = format!("{}/list-form-evaluations/{id}", self.base_url);
        self.send(self.client.put(url).json(request)).await.map(|_| ())
    }

    async fn current_user(&self) -> Result<User> {
        let url = format!("{}/users/me", self.base_url);
        self.send_json(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = Config {
            api_url: "http://localhost:3000/api/".to_string(),
            ..Config::default()
        };
        let client = ApiClient::new(&config).expect("client");
        let key = FormKey::new("farmer-1", "form-9");

        assert_eq!(
            client.form_url(&key),
            "http://localhost:3000/api/form-evaluations/form-9"
        );
    }
}
