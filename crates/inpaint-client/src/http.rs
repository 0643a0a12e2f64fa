use app_settings::AppSettings;
use core_types::Provider;
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};

use crate::{EditRequest, Payload, RawResponse, Transport, TransportError};

const USER_AGENT: &str = concat!("retouch/", env!("CARGO_PKG_VERSION"));

/// `reqwest`-backed transport for the hosted inpainting service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    provider: Provider,
    token: Option<String>,
    output_format: Option<String>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, provider: Provider) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            provider,
            token: None,
            output_format: None,
        })
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            provider: settings.provider,
            token: settings.api_token(),
            output_format: settings.output_format.clone(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn multipart_form(&self, request: &EditRequest) -> Result<Form, TransportError> {
        let mut form = Form::new()
            .part("image", file_part(&request.image)?)
            .part("mask", file_part(&request.mask)?)
            .text("prompt", request.prompt.clone());
        if let Some(format) = &self.output_format {
            form = form.text("output_format", format.clone());
        }
        Ok(form)
    }
}

fn file_part(payload: &Payload) -> Result<Part, TransportError> {
    Part::bytes(payload.bytes.to_vec())
        .file_name(payload.file_name.clone())
        .mime_str(&payload.mime)
        .map_err(|e| TransportError(format!("invalid content type {}: {e}", payload.mime)))
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a EditRequest,
    ) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self.client.post(&self.endpoint).header(ACCEPT, "image/*");
            if let Some(token) = &self.token {
                builder = builder.bearer_auth(token);
            }
            builder = match self.provider {
                Provider::Multipart => builder.multipart(self.multipart_form(request)?),
                Provider::JsonBase64 => builder.json(&request.json_body()),
            };

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError(e.to_string()))?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError(e.to_string()))?
                .to_vec();

            Ok(RawResponse {
                status,
                content_type,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EDIT_PROMPT;
    use std::io::Read;
    use std::sync::mpsc;
    use std::sync::Arc;
    use tiny_http::{Header, Response, Server};

    struct Captured {
        content_type: String,
        authorization: Option<String>,
        body: Vec<u8>,
    }

    /// Serve exactly one request with the given reply and report what arrived.
    fn serve_once(
        status: u16,
        content_type: &'static str,
        reply: &'static [u8],
    ) -> (String, mpsc::Receiver<Captured>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let header = |name: &'static str| {
                request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv(name))
                    .map(|h| h.value.as_str().to_string())
            };
            let content_type_in = header("Content-Type").unwrap_or_default();
            let authorization = header("Authorization");

            let mut body = Vec::new();
            request.as_reader().read_to_end(&mut body).unwrap();

            let response = Response::from_data(reply.to_vec())
                .with_status_code(status)
                .with_header(
                    Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()).unwrap(),
                );
            request.respond(response).unwrap();

            tx.send(Captured {
                content_type: content_type_in,
                authorization,
                body,
            })
            .unwrap();
        });

        (format!("http://{addr}/v2/inpaint"), rx)
    }

    fn request() -> EditRequest {
        EditRequest {
            image: Payload {
                bytes: Arc::from(&b"original-bytes"[..]),
                file_name: "photo.jpg".into(),
                mime: "image/jpeg".into(),
            },
            mask: Payload {
                bytes: Arc::from(&b"mask-bytes"[..]),
                file_name: "mask.png".into(),
                mime: "image/png".into(),
            },
            prompt: EDIT_PROMPT.to_string(),
        }
    }

    #[tokio::test]
    async fn multipart_request_carries_all_fields() {
        let (url, rx) = serve_once(200, "image/png", b"result-bytes");
        let transport = HttpTransport::new(url, Provider::Multipart)
            .unwrap()
            .with_token("test-token")
            .with_output_format("png");

        let response = transport.send(&request()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.media_type().as_deref(), Some("image/png"));
        assert_eq!(response.body, b"result-bytes");

        let captured = rx.recv().unwrap();
        assert!(captured.content_type.starts_with("multipart/form-data"));
        assert_eq!(captured.authorization.as_deref(), Some("Bearer test-token"));

        let body = String::from_utf8_lossy(&captured.body);
        assert!(body.contains(r#"name="image"; filename="photo.jpg""#));
        assert!(body.contains(r#"name="mask"; filename="mask.png""#));
        assert!(body.contains("original-bytes"));
        assert!(body.contains("mask-bytes"));
        assert!(body.contains(EDIT_PROMPT));
        assert!(body.contains(r#"name="output_format""#));
    }

    #[tokio::test]
    async fn json_request_sends_data_urls() {
        let (url, rx) = serve_once(200, "image/jpeg", b"jpeg");
        let transport = HttpTransport::new(url, Provider::JsonBase64).unwrap();

        transport.send(&request()).await.unwrap();

        let captured = rx.recv().unwrap();
        assert!(captured.content_type.starts_with("application/json"));
        assert!(captured.authorization.is_none());

        let body: serde_json::Value = serde_json::from_slice(&captured.body).unwrap();
        assert!(body["image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert_eq!(body["prompt"], EDIT_PROMPT);
    }

    #[tokio::test]
    async fn error_status_is_returned_not_raised() {
        let (url, _rx) = serve_once(422, "application/json", br#"{"errors":["bad mask"]}"#);
        let transport = HttpTransport::new(url, Provider::Multipart).unwrap();

        let response = transport.send(&request()).await.unwrap();
        assert_eq!(response.status, 422);
        assert!(!response.is_success());
        assert_eq!(response.body, br#"{"errors":["bad mask"]}"#);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport =
            HttpTransport::new(format!("http://127.0.0.1:{port}/"), Provider::Multipart).unwrap();

        assert!(transport.send(&request()).await.is_err());
    }
}
