use std::time::Duration;

use log::debug;
use reqwest::{blocking::Client, Url};
use serde_json::Value;

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::platform::Platform;

// Something that can report the current view count of an identifier
pub trait ViewSource {
    fn platform(&self) -> Platform;

    fn views(&self, id: &str) -> Result<u64>;
}

/// Fetches view counts from a platform's public API, one request per call.
pub struct HttpSource {
    platform: Platform,
    credentials: Credentials,
    client: Client,
    timeout: Duration,
    base: String,
}

impl HttpSource {
    pub fn new(platform: Platform, credentials: Credentials, timeout: Duration) -> Result<Self> {
        Self::with_base(platform, credentials, timeout, platform.default_base())
    }

    pub fn with_base(
        platform: Platform,
        credentials: Credentials,
        timeout: Duration,
        base: &str,
    ) -> Result<Self> {
        credentials.check(platform)?;
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            platform,
            credentials,
            client,
            timeout,
            base: base.to_string(),
        })
    }

    fn request_error(&self, id: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                platform: self.platform,
                id: id.to_string(),
                after: self.timeout,
            }
        } else {
            // reqwest errors carry the url, which may hold a secret
            self.platform.retrieval_error(id, err.without_url().to_string())
        }
    }
}

impl ViewSource for HttpSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn views(&self, id: &str) -> Result<u64> {
        let url = self.platform.endpoint(&self.base, id, &self.credentials)?;
        debug!("GET {}", redact(&url, self.platform));

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| self.request_error(id, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(self
                .platform
                .retrieval_error(id, format!("http status {status}")));
        }

        let body: Value = resp.json().map_err(|e| {
            if e.is_timeout() {
                self.request_error(id, e)
            } else {
                self.platform
                    .retrieval_error(id, format!("response is not valid json: {}", e.without_url()))
            }
        })?;

        self.platform
            .extract_views(&body)
            .map_err(|reason| self.platform.retrieval_error(id, reason))
    }
}

// Url with the secret query value swapped for `***`, for logging
pub fn redact(url: &Url, platform: Platform) -> String {
    let Some(param) = platform.secret_param() else {
        return url.to_string();
    };
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == param { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    let mut shown = url.clone();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        sync::mpsc,
        thread,
    };

    // Serves one canned reply on a loopback port and hands back the request line.
    fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                    break;
                }
            }
            let _ = tx.send(request_line.trim_end().to_string());

            let mut stream = reader.into_inner();
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).unwrap();
        });

        (format!("http://{addr}/"), rx)
    }

    // Points a source at a loopback server, bypassing any proxy from the environment.
    fn local(platform: Platform, creds: Credentials, timeout: Duration, base: &str) -> HttpSource {
        let mut source = HttpSource::with_base(platform, creds, timeout, base).unwrap();
        source.client = Client::builder().timeout(timeout).no_proxy().build().unwrap();
        source
    }

    fn source(platform: Platform, base: &str) -> HttpSource {
        let creds = Credentials::from_lookup(|_| Some("a+b&c".into()));
        local(platform, creds, Duration::from_secs(2), base)
    }

    #[test]
    fn reads_views_from_a_good_reply() {
        let (base, requests) = serve_once(
            "200 OK",
            r#"{"itemInfo":{"itemStruct":{"stats":{"playCount":77}}}}"#,
        );
        let views = source(Platform::TikTok, &base).views("v1&evil=1").unwrap();
        assert_eq!(views, 77);
        assert_eq!(
            requests.recv().unwrap(),
            "GET /?video_id=v1%26evil%3D1 HTTP/1.1"
        );
    }

    #[test]
    fn instagram_request_carries_encoded_id_and_token() {
        let (base, requests) = serve_once("200 OK", r#"{"video_views":5}"#);
        assert_eq!(source(Platform::Instagram, &base).views("p/1").unwrap(), 5);
        assert_eq!(
            requests.recv().unwrap(),
            "GET /p%2F1?fields=video_views&access_token=a%2Bb%26c HTTP/1.1"
        );
    }

    #[test]
    fn error_status_is_a_retrieval_error() {
        let (base, _requests) = serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#);
        match source(Platform::TikTok, &base).views("x") {
            Err(Error::Retrieval { reason, .. }) => assert!(reason.contains("http status 429"), "{reason}"),
            other => panic!("expected retrieval error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_a_retrieval_error() {
        let (base, _requests) = serve_once("200 OK", "not json");
        match source(Platform::YouTube, &base).views("x") {
            Err(Error::Retrieval { reason, .. }) => assert!(reason.contains("not valid json"), "{reason}"),
            other => panic!("expected retrieval error, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_a_retrieval_error() {
        let (base, _requests) = serve_once("200 OK", r#"{"items":[]}"#);
        assert!(matches!(
            source(Platform::YouTube, &base).views("x"),
            Err(Error::Retrieval { .. })
        ));
    }

    #[test]
    fn hung_server_is_a_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/", listener.local_addr().unwrap());
        thread::spawn(move || {
            // accept and never answer
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(10));
        });

        let source = local(
            Platform::TikTok,
            Credentials::default(),
            Duration::from_secs(1),
            &base,
        );
        match source.views("x") {
            Err(Error::Timeout { after, .. }) => assert_eq!(after, Duration::from_secs(1)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn refused_connection_is_a_retrieval_error() {
        // bind then drop, so nothing is listening on the port
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let result = source(Platform::TikTok, &format!("http://{addr}/")).views("x");
        assert!(matches!(result, Err(Error::Retrieval { .. })));
    }

    #[test]
    fn redact_hides_the_secret() {
        let creds = Credentials::from_lookup(|_| Some("s3cr3t+&".into()));
        let url = Platform::YouTube
            .endpoint(Platform::YouTube.default_base(), "abc", &creds)
            .unwrap();
        let shown = redact(&url, Platform::YouTube);
        assert!(!shown.contains("s3cr3t"));
        assert!(shown.ends_with("id=abc&key=***"), "{shown}");
    }

    #[test]
    fn redact_leaves_tiktok_alone() {
        let creds = Credentials::default();
        let url = Platform::TikTok
            .endpoint(Platform::TikTok.default_base(), "abc", &creds)
            .unwrap();
        assert_eq!(redact(&url, Platform::TikTok), url.to_string());
    }

    #[test]
    fn missing_secret_fails_before_any_request() {
        let err = HttpSource::new(Platform::Instagram, Credentials::default(), Duration::from_secs(1));
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
