//! HTTP access to the portal API.

use common::{
    document_summary::{DocumentDetail, DocumentListItem},
    processed_document::ProcessedDocument,
    review_session::FetchOutcome,
};
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::{ApiEndpoints, ClientConfig};
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct PortalApiClient {
    http: Client,
    endpoints: ApiEndpoints,
}

impl PortalApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, endpoints: config.endpoints() })
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    pub async fn health_check(&self) -> Result<(), ClientError> {
        let url = self.endpoints.health();
        checked(self.http.get(&url).send().await?, &url).await?;
        Ok(())
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentListItem>, ClientError> {
        let url = self.endpoints.documents();
        decode(checked(self.http.get(&url).send().await?, &url).await?).await
    }

    pub async fn get_document(&self, doc_id: &str) -> Result<DocumentDetail, ClientError> {
        let url = self.endpoints.document(doc_id);
        decode(checked(self.http.get(&url).send().await?, &url).await?).await
    }

    /// The pipeline's result, as last saved. `NotFound` while none exists.
    pub async fn get_processed_document(&self, doc_id: &str) -> Result<ProcessedDocument, ClientError> {
        let url = self.endpoints.result_json(doc_id);
        debug!("fetching result for {}", doc_id);
        decode(checked(self.http.get(&url).send().await?, &url).await?).await
    }

    /// Fetch mapped onto the session's outcome kinds.
    pub async fn fetch_outcome(&self, doc_id: &str) -> FetchOutcome {
        match self.get_processed_document(doc_id).await {
            Ok(document) => FetchOutcome::Loaded(document),
            Err(e) if e.is_not_found() => FetchOutcome::NotFound,
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }

    pub async fn save_processed_document(&self, doc_id: &str, document: &ProcessedDocument) -> Result<(), ClientError> {
        let url = self.endpoints.save_results(doc_id);
        checked(self.http.put(&url).json(document).send().await?, &url).await?;
        info!("saved results for {}", doc_id);
        Ok(())
    }

    pub async fn approve_document(&self, doc_id: &str) -> Result<DocumentDetail, ClientError> {
        let url = self.endpoints.approve(doc_id);
        let detail = decode(checked(self.http.post(&url).send().await?, &url).await?).await?;
        info!("approved {}", doc_id);
        Ok(detail)
    }

    pub async fn upload_document(
        &self,
        filename: &str,
        doc_type: Option<&str>,
        content: Vec<u8>,
    ) -> Result<DocumentDetail, ClientError> {
        let url = self.endpoints.upload();
        let mut form = Form::new().part("file", Part::bytes(content).file_name(filename.to_string()));
        if let Some(doc_type) = doc_type {
            form = form.text("type", doc_type.to_string());
        }
        decode(checked(self.http.post(&url).multipart(form).send().await?, &url).await?).await
    }
}

async fn checked(response: Response, url: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_status(status, url, body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
}
