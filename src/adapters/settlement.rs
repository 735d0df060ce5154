use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::adapters::traits::{Invoice, Limits, SettlementApi};
use crate::error::{AppError, AppResult, ProviderError};

const API_KEY_HEADER: &str = "X-AUTH-API-KEY";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceRequest<'a> {
    external_id: String,
    chan_points: &'a [String],
}

#[derive(Debug, Deserialize)]
struct Address {
    address: String,
}

/// Settlement API over JSON/HTTP
pub struct SettlementRestClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl SettlementRestClient {
    pub fn new(api_url: &str, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        // Relative paths only resolve under the base when it ends with a slash
        let normalized = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{}/", api_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| AppError::Config(format!("Invalid api url {:?}: {}", api_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Unable to build settlement HTTP client: {}", e)))?;

        Ok(Self { client, base_url, api_key })
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("{} on parsing request path {}", e, path)))?;

        let mut request = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }
            .into());
        }

        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::Settlement(format!("{} on reading response", e)))?;

        // The API reports failures in the body even with a 200
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            if !message.is_empty() {
                return Err(ProviderError::Remote(message.to_string()).into());
            }
        }

        serde_json::from_value(value)
            .map_err(|e| ProviderError::Settlement(format!("{} on decoding response", e)).into())
    }
}

#[async_trait]
impl SettlementApi for SettlementRestClient {
    #[instrument(skip(self))]
    async fn issue_invoices(&self, account_id: i64, channel_points: &[String]) -> AppResult<Vec<Invoice>> {
        let request = InvoiceRequest {
            external_id: Uuid::new_v4().to_string(),
            chan_points: channel_points,
        };
        let invoices: Vec<Invoice> = self
            .call(Method::POST, &format!("accounts/{}/invoices", account_id), Some(&request))
            .await?;

        info!("📄 Issued {} invoices for account {}", invoices.len(), account_id);
        Ok(invoices)
    }

    async fn limits(&self) -> AppResult<Limits> {
        self.call::<(), _>(Method::GET, "limits", None).await
    }

    async fn remote_addresses(&self) -> AppResult<Vec<String>> {
        let addresses: Vec<Address> = self.call::<(), _>(Method::GET, "addresses", None).await?;
        Ok(addresses.into_iter().map(|a| a.address).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::HeaderMap, routing::{get, post}, Json, Router};
    use rust_decimal_macros::dec;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/daccs", addr)
    }

    fn client(base_url: &str) -> SettlementRestClient {
        SettlementRestClient::new(base_url, Some("key-1".to_string()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_limits() {
        let app = Router::new().route(
            "/daccs/limits",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "key-1");
                Json(serde_json::json!({
                    "minChannelCapacity": "0.002",
                    "minPaymentAmount": "0.00006",
                    "channelReserveMultiplier": "2"
                }))
            }),
        );
        let base_url = spawn(app).await;

        let limits = client(&base_url).limits().await.unwrap();

        assert_eq!(limits.min_payment_amount, dec!(0.00006));
        assert_eq!(limits.min_channel_capacity, dec!(0.002));
        assert_eq!(limits.channel_reserve_multiplier, dec!(2));
    }

    #[tokio::test]
    async fn test_issue_invoices() {
        let app = Router::new().route(
            "/daccs/accounts/:id/invoices",
            post(|Path(id): Path<i64>, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(id, 17);
                assert!(!body["externalId"].as_str().unwrap().is_empty());
                let invoices: Vec<_> = body["chanPoints"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "nodeId": "02remote",
                            "paymentRequest": format!("lnbc-{}", p.as_str().unwrap()),
                            "chanPoint": p,
                        })
                    })
                    .collect();
                Json(serde_json::Value::Array(invoices))
            }),
        );
        let base_url = spawn(app).await;

        let points = vec!["aa:0".to_string(), "bb:1".to_string()];
        let invoices = client(&base_url).issue_invoices(17, &points).await.unwrap();

        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[1].chan_point, "bb:1");
        assert_eq!(invoices[1].payment_request, "lnbc-bb:1");
    }

    #[tokio::test]
    async fn test_remote_addresses() {
        let app = Router::new().route(
            "/daccs/addresses",
            get(|| async { Json(serde_json::json!([{ "address": "02remote@10.0.0.1:9735" }])) }),
        );
        let base_url = spawn(app).await;

        let addresses = client(&base_url).remote_addresses().await.unwrap();
        assert_eq!(addresses, vec!["02remote@10.0.0.1:9735".to_string()]);
    }

    #[tokio::test]
    async fn test_error_body_with_ok_status() {
        let app = Router::new().route(
            "/daccs/limits",
            get(|| async { Json(serde_json::json!({ "error": "invalid api key" })) }),
        );
        let base_url = spawn(app).await;

        let err = client(&base_url).limits().await.unwrap_err();
        match err {
            AppError::Provider(ProviderError::Remote(message)) => assert_eq!(message, "invalid api key"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_api_url() {
        let err = SettlementRestClient::new("not a url", None, Duration::from_secs(1)).err();
        assert!(matches!(err, Some(AppError::Config(_))));
    }
}
