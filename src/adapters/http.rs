use std::time::Duration;

use reqwest::{Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::ports::{ApiError, TimerApi};
use crate::types::push::Subscription;
use crate::types::timer::{HealthReport, ServerMessage, StartTimerRequest, StartedTimer, Timer};

/// `TimerApi` over HTTP. Endpoint paths are resolved against `base`, which
/// must end with a slash.
#[derive(Debug, Clone)]
pub struct HttpTimerApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpTimerApi {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::Network(format!("invalid url for {path}: {err}")))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, ApiError> {
        let url = self.url(path)?;
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }

    async fn get(&self, url: Url) -> Result<Response, ApiError> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        check_status(response).await
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServerMessage>(&body)
        .ok()
        .and_then(ServerMessage::into_text);
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json().await.map_err(|err| ApiError::Decode(err.to_string()))
}

impl TimerApi for HttpTimerApi {
    async fn register_subscription(&self, subscription: &Subscription) -> Result<(), ApiError> {
        self.post("subscribe", &json!({ "subscription": subscription }))
            .await?;
        Ok(())
    }

    async fn start_timer(&self, request: &StartTimerRequest) -> Result<StartedTimer, ApiError> {
        let response = self.post("start_timer", request).await?;
        decode(response).await
    }

    async fn list_timers(&self, endpoint: &str) -> Result<Vec<Timer>, ApiError> {
        let mut url = self.url("api/timers")?;
        url.query_pairs_mut().append_pair("endpoint", endpoint);
        let response = self.get(url).await?;
        decode(response).await
    }

    async fn cancel_timer(&self, timer_id: i64) -> Result<(), ApiError> {
        self.post("api/timers/cancel", &json!({ "timer_id": timer_id }))
            .await?;
        Ok(())
    }

    async fn cancel_all(&self, subscription: &Subscription) -> Result<(), ApiError> {
        self.post(
            "api/timers/cancel_all",
            &json!({ "subscription": subscription }),
        )
        .await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        let url = self.url("health")?;
        let response = self.get(url).await?;
        decode(response).await
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::testing::subscription;
    use crate::types::timer::TimerStatus;
    use mockito::{Matcher, Server};

    fn api_for(server: &Server) -> HttpTimerApi {
        let base = Url::parse(&format!("{}/", server.url())).expect("server url");
        HttpTimerApi::new(base, Duration::from_secs(5)).expect("http client")
    }

    #[tokio::test]
    async fn register_subscription__should_wrap_subscription_in_body() {
        // Given
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/subscribe")
            .match_body(Matcher::PartialJson(json!({
                "subscription": {
                    "endpoint": "https://push.example/1",
                    "keys": { "p256dh": "p256dh-key", "auth": "auth-secret" }
                }
            })))
            .with_status(201)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;
        let api = api_for(&server);

        // When
        let result = api
            .register_subscription(&subscription("https://push.example/1"))
            .await;

        // Then
        assert_eq!(result, Ok(()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn start_timer__should_post_request_and_parse_timer_id() {
        // Given
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/start_timer")
            .match_body(Matcher::PartialJson(json!({
                "minutes": 60,
                "client_id": "dough_1",
                "message": "Dough is ready"
            })))
            .with_status(200)
            .with_body(r#"{"status":"success","timer_id":42}"#)
            .create_async()
            .await;
        let api = api_for(&server);
        let request = StartTimerRequest {
            minutes: 60,
            client_id: "dough_1".to_string(),
            message: "Dough is ready".to_string(),
            subscription: subscription("https://push.example/1"),
        };

        // When
        let started = api.start_timer(&request).await.expect("start timer");

        // Then
        assert_eq!(started.timer_id, 42);
        assert_eq!(started.expiry_time, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn start_timer__should_surface_server_message_on_rejection() {
        // Given
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/start_timer")
            .with_status(404)
            .with_body(r#"{"status":"error","message":"Subscription not found"}"#)
            .create_async()
            .await;
        let api = api_for(&server);
        let request = StartTimerRequest {
            minutes: 1,
            client_id: "test_1".to_string(),
            message: "done".to_string(),
            subscription: subscription("https://push.example/1"),
        };

        // When
        let result = api.start_timer(&request).await;

        // Then
        assert_eq!(
            result,
            Err(ApiError::Status {
                status: 404,
                message: Some("Subscription not found".to_string())
            })
        );
    }

    #[tokio::test]
    async fn list_timers__should_url_encode_endpoint() {
        // Given
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/timers")
            .match_query(Matcher::UrlEncoded(
                "endpoint".to_string(),
                "https://push.example/sub?id=1&x=2".to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"[{"id":7,"client_id":"dough_1","expiry_time":"2025-01-12T10:30:00.123456Z","status":"running"}]"#,
            )
            .create_async()
            .await;
        let api = api_for(&server);

        // When
        let timers = api
            .list_timers("https://push.example/sub?id=1&x=2")
            .await
            .expect("list timers");

        // Then
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].status, TimerStatus::Running);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_timers__should_report_decode_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/timers")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;
        let api = api_for(&server);

        let result = api.list_timers("https://push.example/1").await;

        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn cancel_timer__should_report_status_without_message() {
        // Given
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/timers/cancel")
            .match_body(Matcher::Json(json!({ "timer_id": 9 })))
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;
        let api = api_for(&server);

        // When
        let result = api.cancel_timer(9).await;

        // Then
        assert_eq!(
            result,
            Err(ApiError::Status {
                status: 500,
                message: None
            })
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cancel_all__should_post_subscription() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/timers/cancel_all")
            .match_body(Matcher::PartialJson(json!({
                "subscription": { "endpoint": "https://push.example/1" }
            })))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;
        let api = api_for(&server);

        api.cancel_all(&subscription("https://push.example/1"))
            .await
            .expect("cancel all");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn health__should_parse_report_under_base_path() {
        // Given
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/timers/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy","database_connected":true,"vapid_configured":false}"#)
            .create_async()
            .await;
        let base = Url::parse(&format!("{}/timers/", server.url())).expect("server url");
        let api = HttpTimerApi::new(base, Duration::from_secs(5)).expect("http client");

        // When
        let report = api.health().await.expect("health");

        // Then
        assert_eq!(report.status, "healthy");
        assert!(report.database_connected);
        assert!(!report.vapid_configured);
    }
}
