use crate::core::moderation::{AgentConfig, AgentError, AgentMessage, AgentProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Upper bound for a whole agent call, connect and read included.
pub const AGENT_TIMEOUT: Duration = Duration::from_secs(12);

/// Chat-completion client for the hosted Timeweb moderation agent.
pub struct TimewebAgentClient {
    client: Client,
}

impl TimewebAgentClient {
    pub fn new() -> Result<Self, AgentError> {
        Self::with_timeout(AGENT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AgentProvider for TimewebAgentClient {
    async fn chat_complete(
        &self,
        messages: &[AgentMessage],
        config: &AgentConfig,
    ) -> Result<Value, AgentError> {
        let payload = json!({
            "messages": messages,
            "max_tokens": config.max_tokens,
        });

        let mut request = self
            .client
            .post(&config.url)
            .header(
                "Authorization",
                format!("Bearer {}", config.api_key().unwrap_or_default()),
            )
            .header("Content-Type", "application/json")
            .json(&payload);

        if let Some(access_id) = config.access_id() {
            request = request.header("X-Access-Id", access_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Status { status, body });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AgentError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{build_messages, ModerationService, ReportPacket};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, access_id: Option<&str>) -> AgentConfig {
        AgentConfig {
            url: format!("{}/agent/v1", server.uri()),
            api_key: Some("test-key".to_string()),
            access_id: access_id.map(str::to_string),
            max_tokens: 200,
        }
    }

    fn report() -> ReportPacket {
        ReportPacket {
            report_id: "rep-1".to_string(),
            reporter_user_id: "u-1".to_string(),
            reported_user_id: "u-2".to_string(),
            reason: "spam".to_string(),
            message_text: None,
        }
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_sends_auth_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/agent/v1"))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("X-Access-Id", "access-7"))
            .and(header("Content-Type", "application/json"))
            .and(body_partial_json(json!({"max_tokens": 200})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = TimewebAgentClient::new().unwrap();
        let body = client
            .chat_complete(&build_messages(&report()), &config_for(&server, Some("access-7")))
            .await
            .unwrap();

        assert_eq!(body["choices"][0]["message"]["content"], "{}");

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["messages"].as_array().unwrap().len(), 2);
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn test_access_id_omitted_when_not_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
            .mount(&server)
            .await;

        let client = TimewebAgentClient::new().unwrap();
        client
            .chat_complete(&build_messages(&report()), &config_for(&server, None))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("x-access-id").is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = TimewebAgentClient::new().unwrap();
        let err = client
            .chat_complete(&build_messages(&report()), &config_for(&server, None))
            .await
            .unwrap_err();

        match err {
            AgentError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = TimewebAgentClient::new().unwrap();
        let err = client
            .chat_complete(&build_messages(&report()), &config_for(&server, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_agent_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("{}"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = TimewebAgentClient::with_timeout(Duration::from_millis(100)).unwrap();
        let err = client
            .chat_complete(&build_messages(&report()), &config_for(&server, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Transport(_)));
    }

    #[tokio::test]
    async fn test_service_falls_back_on_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let service =
            ModerationService::new(TimewebAgentClient::new().unwrap(), config_for(&server, None));
        let decision = service.analyze(&report()).await.unwrap();

        assert_eq!(decision.report_id, "rep-1");
        assert_eq!(decision.verdict, "needs_review");
        assert_eq!(decision.confidence, 0.2);
        assert_eq!(decision.notes.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_service_reads_fenced_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "```json\n{\"verdict\":\"ban_suspected\",\"category\":\"fraud\",\"confidence\":0.8,\"notes\":\"scam link\"}\n```",
            )))
            .mount(&server)
            .await;

        let service =
            ModerationService::new(TimewebAgentClient::new().unwrap(), config_for(&server, None));
        let decision = service.analyze(&report()).await.unwrap();

        assert_eq!(decision.verdict, "ban_suspected");
        assert_eq!(decision.category.as_deref(), Some("fraud"));
        assert_eq!(decision.confidence, 0.8);
        assert_eq!(decision.notes.as_deref(), Some("scam link"));
    }

    #[tokio::test]
    async fn test_service_unreachable_agent_falls_back() {
        // Grab a free port, then release it so connections are refused
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = AgentConfig {
            url: format!("http://127.0.0.1:{}/agent/v1", port),
            api_key: Some("test-key".to_string()),
            access_id: None,
            max_tokens: 200,
        };

        let service = ModerationService::new(TimewebAgentClient::new().unwrap(), config);
        let decision = service.analyze(&report()).await.unwrap();

        assert_eq!(decision.notes.as_deref(), Some("fallback"));
    }
}
