//! Shared fixtures for the integration tests: a ureq-backed transport, a
//! scripted in-memory transport, and the contact schema the mock server
//! implements.

#![allow(dead_code)]

use std::cell::RefCell;

use wiremodel_core::{
    EnvelopeConfig, FieldDef, FieldType, HttpMethod, HttpRequest, HttpResponse, ResourceSchema,
    Transport, TransportFailure,
};

/// Executes requests over real HTTP with ureq.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses come back as data and the adapter does the classification.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let sent = match (req.method, req.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&req.url), &req.headers).call(),
            (HttpMethod::Delete, _) => {
                with_headers(self.agent.delete(&req.url), &req.headers).call()
            }
            (HttpMethod::Post, body) => with_headers(self.agent.post(&req.url), &req.headers)
                .send(body.unwrap_or_default().as_bytes()),
            (HttpMethod::Put, body) => with_headers(self.agent.put(&req.url), &req.headers)
                .send(body.unwrap_or_default().as_bytes()),
            (HttpMethod::Patch, body) => with_headers(self.agent.patch(&req.url), &req.headers)
                .send(body.unwrap_or_default().as_bytes()),
        };
        let mut response = sent.map_err(|e| TransportFailure::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string().unwrap_or_default();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Replays a scripted sequence of responses and records every request.
pub struct ScriptedTransport {
    responses: RefCell<Vec<Result<HttpResponse, TransportFailure>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<HttpResponse, TransportFailure>>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: RefCell::new(responses),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| panic!("no scripted response left for {}", request.url))
    }
}

pub fn json_response(status: u16, body: &str) -> Result<HttpResponse, TransportFailure> {
    Ok(HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    })
}

/// The contact resource as the mock server serves it.
pub fn contact_schema() -> ResourceSchema {
    ResourceSchema::new("contact", "contacts")
        .field(FieldDef::new("id", FieldType::Int))
        .field(FieldDef::new("name", FieldType::Str))
        .field(FieldDef::new("email", FieldType::Str))
        .field(FieldDef::new("age", FieldType::Int))
        .field(FieldDef::new("signup_date", FieldType::Timestamp))
        .field(FieldDef::new("active", FieldType::Bool))
        .with_envelope(EnvelopeConfig {
            records_key: "results".to_string(),
            next_key: "next".to_string(),
            total_key: Some("count".to_string()),
        })
}

/// Start the mock server on a random port; returns its base URL.
pub fn start_mock_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}
