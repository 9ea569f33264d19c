use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;

/// Call metadata attached to each request. Deployments vary: the hosted
/// service authenticates with query parameters, some gateways expect a
/// header-based key, and public mirrors take none.
#[derive(Debug, Clone, Default)]
pub enum Authorization {
    QueryParams {
        customer_id: String,
        api_key: String,
    },
    HeaderKey {
        header: String,
        key: String,
    },
    #[default]
    Public,
}

/// The remote procedure call boundary: one text span in, one raw JSON
/// document out. Implementations may fail transiently; retry policy lives in
/// [`RetryingInvoker`](crate::RetryingInvoker), not here.
#[async_trait]
pub trait DisambiguationTransport: Send + Sync {
    async fn call(&self, auth: &Authorization, text: &str) -> Result<String>;
}

/// Production transport: POST the text span to the disambiguation endpoint.
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DisambiguationTransport for HttpTransport {
    async fn call(&self, auth: &Authorization, text: &str) -> Result<String> {
        let mut request = self.client.post(&self.url).body(text.to_string());
        match auth {
            Authorization::QueryParams {
                customer_id,
                api_key,
            } => {
                request = request.query(&[("customerId", customer_id), ("apiKey", api_key)]);
            }
            Authorization::HeaderKey { header, key } => {
                request = request.header(header.as_str(), key.as_str());
            }
            Authorization::Public => {}
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
