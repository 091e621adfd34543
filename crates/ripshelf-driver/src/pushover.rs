use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// Outcome of a notification attempt. Delivery is always best effort, so
/// this is plain data rather than an error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyReceipt {
    pub delivered: bool,
    /// Request id returned by the service, when it answered at all.
    pub request_id: Option<String>,
}

impl NotifyReceipt {
    pub fn failed() -> Self {
        Self {
            delivered: false,
            request_id: None,
        }
    }
}

/// Operator notifications. Priorities follow the Pushover convention,
/// -2 (silent) through 2 (emergency).
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(
        &self,
        title: &str,
        message: &str,
        priority: i8,
        url: Option<&str>,
    ) -> NotifyReceipt;
}

/// Pushover-backed notifier. Constructed from optional credentials; when
/// either is missing every call returns a failed receipt without touching
/// the network.
pub struct PushoverNotifier {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl PushoverNotifier {
    pub fn new(user: Option<String>, token: Option<String>) -> Self {
        Self::with_base_url(user, token, "https://api.pushover.net")
    }

    pub fn with_base_url(
        user: Option<String>,
        token: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            credentials: user.zip(token),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: i32,
    #[serde(default)]
    request: Option<String>,
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(
        &self,
        title: &str,
        message: &str,
        priority: i8,
        url: Option<&str>,
    ) -> NotifyReceipt {
        let Some((user, token)) = &self.credentials else {
            return NotifyReceipt::failed();
        };

        let mut form = vec![
            ("token", token.clone()),
            ("user", user.clone()),
            ("title", title.to_string()),
            ("message", message.to_string()),
            ("priority", priority.to_string()),
        ];
        if let Some(url) = url {
            form.push(("url", url.to_string()));
        }

        let response = self
            .client
            .post(format!("{}/1/messages.json", self.base_url))
            .form(&form)
            .send()
            .await;

        match response {
            Ok(response) => match response.json::<PushoverResponse>().await {
                Ok(body) => NotifyReceipt {
                    delivered: body.status == 1,
                    request_id: body.request,
                },
                Err(e) => {
                    warn!(error = %e, "notification response unreadable");
                    NotifyReceipt::failed()
                }
            },
            Err(e) => {
                warn!(error = %e, "notification send failed");
                NotifyReceipt::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn unconfigured_notifier_fails_without_network() {
        let notifier = PushoverNotifier::new(None, None);
        let receipt = notifier.notify("t", "m", 0, None).await;
        assert_eq!(receipt, NotifyReceipt::failed());

        let half = PushoverNotifier::new(Some("user".into()), None);
        assert_eq!(half.notify("t", "m", 0, None).await, NotifyReceipt::failed());
    }

    #[tokio::test]
    async fn delivers_and_returns_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .and(body_string_contains("title=Disc+inserted"))
            .and(body_string_contains("priority=1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 1,
                "request": "abc-123"
            })))
            .mount(&server)
            .await;

        let notifier = PushoverNotifier::with_base_url(
            Some("u".into()),
            Some("t".into()),
            server.uri(),
        );
        let receipt = notifier
            .notify("Disc inserted", "drive 1: THE_MATRIX", 1, None)
            .await;
        assert!(receipt.delivered);
        assert_eq!(receipt.request_id.as_deref(), Some("abc-123"));
    }

    #[tokio::test]
    async fn service_rejection_is_a_failed_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 0,
                "errors": ["user identifier is invalid"]
            })))
            .mount(&server)
            .await;

        let notifier = PushoverNotifier::with_base_url(
            Some("bad".into()),
            Some("t".into()),
            server.uri(),
        );
        let receipt = notifier.notify("t", "m", 0, None).await;
        assert!(!receipt.delivered);
    }
}
