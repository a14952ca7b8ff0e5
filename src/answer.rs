use crate::config::Config;
use crate::error::AnswerError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Duration;
use tracing::debug;

/// Anything that can turn a question into an answer.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, AnswerError>;
}

/// Request body sent to the answering service
#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

/// HTTP client for the answering service
#[derive(Clone)]
pub struct AnswerClient {
    endpoint: String,
    client: reqwest::Client,
}

impl AnswerClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        // No timeout unless configured: a slow service keeps the session pending.
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnswerService for AnswerClient {
    async fn ask(&self, question: &str) -> Result<String, AnswerError> {
        debug!(endpoint = %self.endpoint, "sending question");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&AskRequest { question })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AnswerError::Status { status, body });
        }

        parse_answer(&body)
    }
}

/// Extract the `answer` string from a success body.
///
/// The body must be a JSON object; arrays and scalars are rejected even when
/// their first element happens to be a string.
fn parse_answer(body: &str) -> Result<String, AnswerError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| AnswerError::MalformedResponse(e.to_string()))?;

    let object = value.as_object().ok_or_else(|| {
        AnswerError::MalformedResponse("response body is not a JSON object".to_string())
    })?;

    object
        .get("answer")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AnswerError::MalformedResponse("missing string field `answer`".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Message;
    use crate::orchestrator::{AnswerOrchestrator, SubmitOutcome};
    use crate::storage::{MemoryBackend, PersistenceAdapter};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_answer_accepts_extra_fields() {
        let answer = parse_answer(r#"{"answer":"I am GarAi.","sources":[]}"#).unwrap();
        assert_eq!(answer, "I am GarAi.");
    }

    #[test]
    fn test_parse_answer_rejects_wrong_shapes() {
        for body in [
            "",
            "<html>oops</html>",
            "{}",
            r#"{"answer":42}"#,
            r#"{"answer":null}"#,
            r#"["I am GarAi."]"#,
            r#""I am GarAi.""#,
            r#"{"reply":{"answer":"nested"}}"#,
        ] {
            assert!(
                matches!(parse_answer(body), Err(AnswerError::MalformedResponse(_))),
                "body: {:?}",
                body
            );
        }
    }

    /// Read one HTTP request off `stream`, returning its head and body.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> (String, String) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            let read = stream.read(&mut chunk).await.unwrap();
            assert!(read > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..read]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        while buf.len() < head_end + content_length {
            let read = stream.read(&mut chunk).await.unwrap();
            assert!(read > 0, "client closed before sending body");
            buf.extend_from_slice(&chunk[..read]);
        }

        let body = String::from_utf8_lossy(&buf[head_end..head_end + content_length]).to_string();
        (head, body)
    }

    /// Serve one canned response and hand back what the client sent.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request
        });

        (format!("http://{}/ask-ai", addr), server)
    }

    fn client_for(endpoint: String) -> AnswerClient {
        let config = Config {
            endpoint,
            request_timeout_secs: Some(5),
            ..Config::default()
        };
        AnswerClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_ask_posts_raw_question_as_json() {
        let (endpoint, server) = serve_once("200 OK", r#"{"answer":"I am GarAi."}"#).await;
        let client = client_for(endpoint);

        let answer = client.ask("  What is GarAi? ").await.unwrap();
        let (head, body) = server.await.unwrap();

        assert_eq!(answer, "I am GarAi.");
        assert!(head.starts_with("POST /ask-ai HTTP/1.1\r\n"));
        assert!(head.to_ascii_lowercase().contains("content-type: application/json"));
        let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sent, serde_json::json!({ "question": "  What is GarAi? " }));
    }

    #[tokio::test]
    async fn test_ask_treats_non_success_status_as_failure() {
        let (endpoint, server) =
            serve_once("500 Internal Server Error", r#"{"answer":"ignored"}"#).await;
        let client = client_for(endpoint);

        let result = client.ask("hi").await;
        server.await.unwrap();

        match result {
            Err(AnswerError::Status { status, body }) => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, r#"{"answer":"ignored"}"#);
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ask_reports_missing_answer_field() {
        let (endpoint, server) = serve_once("200 OK", r#"{"error":"no model"}"#).await;
        let client = client_for(endpoint);

        let result = client.ask("hi").await;
        server.await.unwrap();

        assert!(matches!(result, Err(AnswerError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_ask_reports_unreachable_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/ask-ai", addr));
        let result = client.ask("hi").await;

        assert!(matches!(result, Err(AnswerError::Transport(_))));
    }

    /// Accept connections and hold them open without ever responding.
    async fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        format!("http://{}/ask-ai", addr)
    }

    #[tokio::test]
    async fn test_ask_times_out_as_transport_failure() {
        let config = Config {
            endpoint: serve_silence().await,
            request_timeout_secs: Some(1),
            ..Config::default()
        };
        let client = AnswerClient::new(&config).unwrap();

        match client.ask("hi").await {
            Err(AnswerError::Transport(err)) => assert!(err.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }

        let persistence = PersistenceAdapter::new(Box::new(MemoryBackend::new()), "hello");
        let mut orchestrator =
            AnswerOrchestrator::restore(persistence, config.failure_message.clone());

        let outcome = orchestrator.submit(&client, "still there?").await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert!(!orchestrator.is_pending());
        assert_eq!(orchestrator.transcript().len(), 3);
        assert_eq!(
            orchestrator.transcript().last(),
            Some(&Message::assistant("Sorry, something went wrong."))
        );
    }
}
