//! `reqwest` implementation of the remote API.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::core::config::ClientConfig;
use crate::core::document::{Document, UploadFile};
use crate::core::errors::ClientResult;
use crate::core::ids::DocumentId;
use crate::gateway::api::{ApiFuture, AskRequest, AskResponse, CleanupReport, RemoteApi};
use crate::gateway::error::RemoteFailure;

/// HTTP client for the PDF Q&A API.
pub struct HttpApi {
    client: Client,
    base: Url,
}

impl HttpApi {
    /// Build a client for the configured API.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base: config.api_base()?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteFailure> {
        self.base
            .join(path)
            .map_err(|e| RemoteFailure::Request(e.to_string()))
    }

    fn document_endpoint(&self, id: &DocumentId) -> Result<Url, RemoteFailure> {
        let mut url = self.endpoint("documents/")?;
        url.path_segments_mut()
            .map_err(|()| RemoteFailure::Request("base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }
}

async fn send(request: RequestBuilder, token: &str) -> Result<Response, RemoteFailure> {
    let response = request
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| RemoteFailure::Network(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::debug!(status = status.as_u16(), url = %response.url(), "api error status");
        Err(RemoteFailure::Status(status.as_u16()))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteFailure> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteFailure::Decode(e.to_string()))
}

impl RemoteApi for HttpApi {
    fn list_documents<'a>(&'a self, token: &'a str) -> ApiFuture<'a, Vec<Document>> {
        Box::pin(async move {
            let url = self.endpoint("documents/")?;
            let response = send(self.client.get(url), token).await?;
            read_json(response).await
        })
    }

    fn upload_document<'a>(&'a self, token: &'a str, file: UploadFile) -> ApiFuture<'a, Document> {
        Box::pin(async move {
            let url = self.endpoint("upload/")?;
            let part = Part::bytes(file.bytes)
                .file_name(file.filename)
                .mime_str(&file.content_type)
                .map_err(|e| RemoteFailure::Request(e.to_string()))?;
            let form = Form::new().part("file", part);

            let response = send(self.client.post(url).multipart(form), token).await?;
            read_json(response).await
        })
    }

    fn delete_document<'a>(&'a self, token: &'a str, id: &'a DocumentId) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.document_endpoint(id)?;
            send(self.client.delete(url), token).await?;
            Ok(())
        })
    }

    fn ask<'a>(&'a self, token: &'a str, request: &'a AskRequest) -> ApiFuture<'a, AskResponse> {
        Box::pin(async move {
            let url = self.endpoint("ask/")?;
            let response = send(self.client.post(url).json(request), token).await?;
            read_json(response).await
        })
    }

    fn cleanup_documents<'a>(&'a self, token: &'a str) -> ApiFuture<'a, CleanupReport> {
        Box::pin(async move {
            let url = self.endpoint("documents/cleanup/")?;
            let response = send(self.client.delete(url), token).await?;
            read_json(response).await
        })
    }
}
