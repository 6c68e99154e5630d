//! HTTP client for the Resend API: template management and sending.

use super::classify::error_from_response;
use super::types::{
    MailSender, NewTemplate, SendEmail, SentEmail, TemplatePage, TemplateRecord, TemplateStore,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct ResendClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for ResendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Error body returned by the API.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ResendClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = body.message.unwrap_or_else(|| {
                if text.is_empty() {
                    status.to_string()
                } else {
                    text.clone()
                }
            });
            return Err(error_from_response(
                status.as_u16(),
                body.name.as_deref(),
                message,
            ));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl TemplateStore for ResendClient {
    async fn list_templates(&self, limit: u32, after: Option<&str>) -> Result<TemplatePage> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }
        debug!("Listing templates (limit {limit}, after {after:?})");
        self.execute(self.client.get(self.url("/templates")).query(&query))
            .await
    }

    async fn create_template(&self, template: &NewTemplate) -> Result<TemplateRecord> {
        let mut record: TemplateRecord = self
            .execute(self.client.post(self.url("/templates")).json(template))
            .await?;
        if record.id.is_empty() {
            return Err(Error::TemplateStore {
                status: 200,
                message: format!("template \"{}\" created without an id", template.name),
            });
        }
        if record.name.is_empty() {
            record.name = template.name.clone();
        }
        Ok(record)
    }

    async fn publish_template(&self, id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .execute(self.client.post(self.url(&format!("/templates/{id}/publish"))))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MailSender for ResendClient {
    async fn send_email(&self, email: &SendEmail) -> Result<SentEmail> {
        email.validate()?;
        self.execute(self.client.post(self.url("/emails")).json(email))
            .await
    }
}
