use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Serialize;
use stepsync_core::config::RemoteConfig;
use tracing::{debug, info, warn};

use crate::classify::{classify, RemoteResponse};
use crate::truncate::{truncate_chars, MAX_RAW_CHARS};

/// Outcome of one outbound submission. Transport failures are folded in
/// with `status_code: None` rather than returned as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
    pub status_code: Option<u16>,
    /// Response body, at most [`MAX_RAW_CHARS`] characters.
    pub raw: String,
}

impl SubmissionResult {
    fn transport_failure(err: &reqwest::Error) -> Self {
        Self {
            success: false,
            message: format!("request failed: {err}"),
            status_code: None,
            raw: String::new(),
        }
    }
}

/// Something that can push a step count to the remote site.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, login: &str, secret: &str, steps: u32) -> SubmissionResult;
}

/// Form-post submitter driven entirely by [`RemoteConfig`].
pub struct RemoteSubmitter {
    config: RemoteConfig,
}

impl RemoteSubmitter {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// A fresh client per submission, so each one gets its own cookie jar.
    fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        reqwest::Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .cookie_store(self.config.use_session)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
    }

    async fn post_form(&self, login: &str, secret: &str, steps: u32) -> reqwest::Result<(u16, String)> {
        let client = self.build_client()?;

        if self.config.use_session {
            // Only here to collect cookies; the outcome does not matter.
            if let Err(e) = client.get(&self.config.base_url).send().await {
                debug!(error = %e, "warm-up GET failed, posting anyway");
            }
        }

        let steps = steps.to_string();
        let form = [
            (self.config.field_account.as_str(), login),
            (self.config.field_password.as_str(), secret),
            (self.config.field_steps.as_str(), steps.as_str()),
        ];

        let resp = client
            .post(self.config.post_url())
            .form(&form)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl Submitter for RemoteSubmitter {
    async fn submit(&self, login: &str, secret: &str, steps: u32) -> SubmissionResult {
        let (status, body) = match self.post_form(login, secret, steps).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, url = %self.config.post_url(), "submission transport error");
                return SubmissionResult::transport_failure(&e);
            }
        };

        let matched = classify(&RemoteResponse::new(status, &body));
        let success = matched.is_some();
        if let Some(check) = matched {
            debug!(check, "success check matched");
        }
        info!(status, success, "remote submission finished");

        SubmissionResult {
            success,
            message: if success {
                "submitted successfully".to_string()
            } else {
                format!("remote returned status {status} without a success signal")
            },
            status_code: Some(status),
            raw: truncate_chars(&body, MAX_RAW_CHARS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, HeaderMap as AxumHeaders, StatusCode},
        routing::{get, post},
        Form, Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn config_for(base_url: String) -> RemoteConfig {
        RemoteConfig {
            base_url,
            use_session: false,
            timeout_secs: 5,
            ..RemoteConfig::default()
        }
    }

    #[tokio::test]
    async fn json_success_flag_is_success() {
        let url = serve(Router::new().route(
            "/",
            post(|| async { Json(json!({"success": true})) }),
        ))
        .await;

        let result = RemoteSubmitter::new(config_for(url)).submit("u", "p", 1).await;
        assert!(result.success);
        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.message, "submitted successfully");
    }

    #[tokio::test]
    async fn html_success_text_is_success() {
        let url = serve(Router::new().route(
            "/",
            post(|| async { axum::response::Html("<html>提交成功</html>") }),
        ))
        .await;

        let result = RemoteSubmitter::new(config_for(url)).submit("u", "p", 1).await;
        assert!(result.success);
        assert_eq!(result.raw, "<html>提交成功</html>");
    }

    #[tokio::test]
    async fn json_error_code_is_failure() {
        let url = serve(Router::new().route("/", post(|| async { Json(json!({"code": 500})) })))
            .await;

        let result = RemoteSubmitter::new(config_for(url)).submit("u", "p", 1).await;
        assert!(!result.success);
        assert_eq!(result.status_code, Some(200));
        assert!(result.message.contains("200"));
    }

    #[tokio::test]
    async fn configured_field_names_are_posted() {
        let url = serve(Router::new().route(
            "/",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                let ok = form.get("phone").map(String::as_str) == Some("user@example.com")
                    && form.get("pwd").map(String::as_str) == Some("secret")
                    && form.get("bushu").map(String::as_str) == Some("89888");
                if ok {
                    (StatusCode::OK, "success")
                } else {
                    (StatusCode::BAD_REQUEST, "bad form")
                }
            }),
        ))
        .await;

        let config = RemoteConfig {
            field_account: "phone".to_string(),
            field_password: "pwd".to_string(),
            field_steps: "bushu".to_string(),
            ..config_for(url)
        };
        let result = RemoteSubmitter::new(config)
            .submit("user@example.com", "secret", 89_888)
            .await;
        assert!(result.success, "{result:?}");
    }

    fn cookie_gated_router() -> Router {
        Router::new()
            .route(
                "/",
                get(|| async { ([(header::SET_COOKIE, "sid=warm; Path=/")], "form page") }),
            )
            .route(
                "/submit",
                post(|headers: AxumHeaders| async move {
                    let has_cookie = headers
                        .get(header::COOKIE)
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|v| v.contains("sid=warm"));
                    if has_cookie {
                        "提交成功"
                    } else {
                        "missing session"
                    }
                }),
            )
    }

    #[tokio::test]
    async fn warm_up_get_supplies_session_cookie() {
        let base = serve(cookie_gated_router()).await;
        let config = RemoteConfig {
            post_url: Some(format!("{base}submit")),
            use_session: true,
            ..config_for(base)
        };

        let result = RemoteSubmitter::new(config).submit("u", "p", 1).await;
        assert!(result.success, "{result:?}");
    }

    #[tokio::test]
    async fn without_session_cookie_gated_remote_fails() {
        let base = serve(cookie_gated_router()).await;
        let config = RemoteConfig {
            post_url: Some(format!("{base}submit")),
            ..config_for(base)
        };

        let result = RemoteSubmitter::new(config).submit("u", "p", 1).await;
        assert!(!result.success);
        assert_eq!(result.raw, "missing session");
    }

    #[tokio::test]
    async fn failing_warm_up_does_not_block_post() {
        let base = serve(Router::new().route("/submit", post(|| async { "success" }))).await;
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed_addr = closed.local_addr().unwrap();
        drop(closed);

        let config = RemoteConfig {
            base_url: format!("http://{closed_addr}/"),
            post_url: Some(format!("{base}submit")),
            use_session: true,
            ..config_for(base)
        };

        let result = RemoteSubmitter::new(config).submit("u", "p", 1).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn connection_refused_is_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = RemoteSubmitter::new(config_for(format!("http://{addr}/")))
            .submit("u", "p", 1)
            .await;
        assert!(!result.success);
        assert_eq!(result.status_code, None);
        assert_eq!(result.raw, "");
        assert!(result.message.starts_with("request failed"));
    }

    #[tokio::test]
    async fn slow_remote_times_out() {
        let url = serve(Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "success"
            }),
        ))
        .await;
        let config = RemoteConfig {
            timeout_secs: 1,
            ..config_for(url)
        };

        let result = RemoteSubmitter::new(config).submit("u", "p", 1).await;
        assert!(!result.success);
        assert_eq!(result.status_code, None);
    }

    #[tokio::test]
    async fn stalled_body_is_transport_failure() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let config = RemoteConfig {
            timeout_secs: 1,
            ..config_for(format!("http://{addr}/"))
        };

        let result = RemoteSubmitter::new(config).submit("u", "p", 1).await;
        assert!(!result.success);
        assert_eq!(result.status_code, None);
        assert_eq!(result.raw, "");
        assert!(result.message.starts_with("request failed"), "{}", result.message);
    }

    #[tokio::test]
    async fn long_body_is_truncated() {
        let url = serve(Router::new().route(
            "/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "e".repeat(5_000)) }),
        ))
        .await;

        let result = RemoteSubmitter::new(config_for(url)).submit("u", "p", 1).await;
        assert!(!result.success);
        assert_eq!(result.status_code, Some(500));
        assert_eq!(result.raw.chars().count(), MAX_RAW_CHARS);
    }
}
