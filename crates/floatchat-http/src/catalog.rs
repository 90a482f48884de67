// ABOUTME: Product catalog client for the Product Info flow
// ABOUTME: Fetches segments, products per segment, and product details over HTTP

use crate::client::{map_reqwest_error, HttpClient};
use async_trait::async_trait;
use floatchat_core::{Catalog, EndpointConfig, Product, TransportError};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Characters escaped when a product code becomes a path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Deserialize)]
struct DetailBody {
    details: String,
}

/// Catalog served under `{base_url}/products`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: HttpClient,
}

impl HttpCatalog {
    pub fn new(config: &EndpointConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: HttpClient::new(config)?,
        })
    }

    pub fn from_client(client: HttpClient) -> Self {
        Self { client }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        label: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .execute(label, || Ok(self.client.get(path).query(query)))
            .await?;
        let body = response.text().await.map_err(map_reqwest_error)?;
        serde_json::from_str(&body).map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

/// Detail endpoints answer either `{"details": "..."}` or plain text.
pub fn parse_detail(body: &str) -> Result<String, TransportError> {
    let text = match serde_json::from_str::<DetailBody>(body) {
        Ok(detail) => detail.details,
        Err(_) => body.to_string(),
    };
    if text.trim().is_empty() {
        return Err(TransportError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn fetch_segments(&self) -> Result<Vec<String>, TransportError> {
        let segments: Vec<String> = self.get_json("segments", "products/segments", &[]).await?;
        debug!(count = segments.len(), "Fetched product segments");
        Ok(segments)
    }

    async fn fetch_products(&self, segment: &str) -> Result<Vec<Product>, TransportError> {
        let products: Vec<Product> = self
            .get_json("products", "products", &[("segment", segment)])
            .await?;
        debug!(segment = %segment, count = products.len(), "Fetched products");
        Ok(products)
    }

    async fn fetch_product_detail(&self, code: &str) -> Result<String, TransportError> {
        let path = format!("products/{}", utf8_percent_encode(code, PATH_SEGMENT));
        let response = self
            .client
            .execute("product_detail", || Ok(self.client.get(&path)))
            .await?;
        let body = response.text().await.map_err(map_reqwest_error)?;
        parse_detail(&body)
    }
}
