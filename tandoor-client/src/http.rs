//! HTTP client for network-based API calls

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{CashPaymentRequest, Order, TableSession};
use shared::request::{
    CreatePaymentRequest, CreateSessionRequest, OrderPatch, PaymentAck, SubmitOrderRequest,
    SubmitOrderResponse,
};

use crate::{ClientConfig, ClientError, ClientResult, OrderApi};

/// HTTP client for making network requests to the order API
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Build authorization header value
    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_header() {
            Some(auth) => request.header(reqwest::header::AUTHORIZATION, auth),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.authorize(self.client.get(self.url(path)));
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request without body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.authorize(self.client.post(self.url(path)));
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a PATCH request with JSON body
    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        let request = self.authorize(self.client.patch(self.url(path)).json(body));
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return Err(Self::classify(status, text));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(error = %e, "Order API returned an unexpected body");
            ClientError::InvalidResponse(e.to_string())
        })
    }

    fn classify(status: StatusCode, text: String) -> ClientError {
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(text),
            StatusCode::NOT_FOUND => ClientError::NotFound(text),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Validation(text)
            }
            StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS => ClientError::Unavailable(text),
            _ => ClientError::Internal(text),
        }
    }
}

#[async_trait]
impl OrderApi for HttpClient {
    async fn find_session(&self, table_number: u32) -> ClientResult<Option<TableSession>> {
        match self
            .get::<TableSession>(&format!("/sessions/table/{}", table_number))
            .await
        {
            Ok(session) => Ok(Some(session)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> ClientResult<TableSession> {
        self.post("/sessions", request).await
    }

    async fn submit_order(
        &self,
        session_id: &str,
        request: &SubmitOrderRequest,
    ) -> ClientResult<SubmitOrderResponse> {
        self.post(&format!("/sessions/{}/orders", session_id), request)
            .await
    }

    async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> ClientResult<Order> {
        self.patch(&format!("/orders/{}", order_id), patch).await
    }

    async fn create_payment_request(
        &self,
        request: &CreatePaymentRequest,
    ) -> ClientResult<CashPaymentRequest> {
        self.post("/payment-requests", request).await
    }

    async fn confirm_payment(&self, request_id: &str) -> ClientResult<PaymentAck> {
        self.post_empty(&format!("/payment-requests/{}/confirm", request_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpClient {
        HttpClient::new(&ClientConfig::new(base)).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let c = client("http://localhost:5000/api/");
        assert_eq!(c.url("/sessions"), "http://localhost:5000/api/sessions");
        assert_eq!(c.url("orders/7"), "http://localhost:5000/api/orders/7");
    }

    #[test]
    fn test_auth_header() {
        let c = client("http://localhost").with_token("abc");
        assert_eq!(c.token(), Some("abc"));
        assert_eq!(c.auth_header().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            HttpClient::classify(StatusCode::NOT_FOUND, "gone".into()),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            HttpClient::classify(StatusCode::UNPROCESSABLE_ENTITY, "bad status".into()),
            ClientError::Validation(_)
        ));
        let unavailable = HttpClient::classify(StatusCode::SERVICE_UNAVAILABLE, String::new());
        assert!(unavailable.is_transient());
        assert!(!HttpClient::classify(StatusCode::UNAUTHORIZED, String::new()).is_transient());
    }
}
