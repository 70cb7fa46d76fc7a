use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::gateway::{AuthContext, GatewayError, ResumePersistenceGateway};
use crate::models::resume::ResumeDocument;

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Gateway backed by the remote résumé REST API.
#[derive(Clone)]
pub struct HttpResumeGateway {
    client: Client,
    base_url: String,
    auth: AuthContext,
}

impl HttpResumeGateway {
    pub fn new(
        base_url: impl Into<String>,
        auth: AuthContext,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and turns any non-success status into a `GatewayError`.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, GatewayError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            warn!("Resume API {what} failed before a response: {e}");
            GatewayError::Http(e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("Resume API {what} succeeded ({status})");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        warn!("Resume API {what} returned {status}: {message}");
        Err(classify(status, message))
    }
}

fn classify(status: StatusCode, message: String) -> GatewayError {
    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized(message),
        _ => GatewayError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Finds the id in a create response; the API answers with the stored
/// document, either bare or wrapped in `resume`/`data`.
fn extract_id(body: &Value) -> Option<String> {
    let direct = ["_id", "id"].iter().find_map(|key| match body.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    direct.or_else(|| {
        ["resume", "data"]
            .iter()
            .find_map(|key| body.get(key).and_then(extract_id))
    })
}

#[async_trait]
impl ResumePersistenceGateway for HttpResumeGateway {
    async fn fetch_by_id(&self, id: &str) -> Result<ResumeDocument, GatewayError> {
        let request = self.client.get(self.url(&format!("/resumes/by-id/{id}")));
        let response = self.send(request, "fetch").await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn create(&self, doc: &ResumeDocument) -> Result<String, GatewayError> {
        let request = self.client.post(self.url("/resumes")).json(doc);
        let response = self.send(request, "create").await?;
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)?;
        extract_id(&body).ok_or_else(|| GatewayError::Api {
            status: 200,
            message: "create response carried no resume id".to_string(),
        })
    }

    async fn update(&self, id: &str, doc: &ResumeDocument) -> Result<(), GatewayError> {
        let request = self.client.put(self.url(&format!("/resumes/{id}"))).json(doc);
        self.send(request, "update").await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ResumeDocument>, GatewayError> {
        let request = self.client.get(self.url("/resumes/user"));
        let response = self.send(request, "list").await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let request = self.client.delete(self.url(&format!("/resumes/{id}")));
        self.send(request, "delete").await?;
        Ok(())
    }

    async fn download_pdf(&self, id: &str) -> Result<Bytes, GatewayError> {
        let request = self.client.get(self.url(&format!("/resumes/{id}/pdf")));
        let response = self.send(request, "pdf download").await?;
        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_statuses() {
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, "gone".into()),
            GatewayError::NotFound(_)
        ));
        assert!(matches!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, "bad".into()),
            GatewayError::Validation(_)
        ));
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, "who".into()),
            GatewayError::Unauthorized(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, "oops".into()),
            GatewayError::Api { status: 502, .. }
        ));
    }

    #[test]
    fn test_extract_id_shapes() {
        assert_eq!(extract_id(&json!({ "_id": "a1" })).as_deref(), Some("a1"));
        assert_eq!(extract_id(&json!({ "id": 7 })).as_deref(), Some("7"));
        assert_eq!(
            extract_id(&json!({ "message": "ok", "resume": { "_id": "b2" } })).as_deref(),
            Some("b2")
        );
        assert_eq!(extract_id(&json!({ "message": "ok" })), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = HttpResumeGateway::new(
            "http://api.local/",
            AuthContext::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(gateway.url("/resumes"), "http://api.local/resumes");
    }
}
