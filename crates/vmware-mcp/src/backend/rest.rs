//! REST backend
//!
//! Talks to the Workstation REST API (vmrest). Every request is a method,
//! a path under `/api`, optional query pairs and an optional JSON body.
//! A non-2xx status becomes `HttpError` carrying the response body.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use vmware_core::RestConfig;

use super::Payload;
use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A fully built REST call
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    /// Path below the `/api` base, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Payload reported when the server answers 2xx with no content
    pub on_empty: Option<Value>,
}

impl RestRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            on_empty: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::Post, path)
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::Put, path)
        }
    }

    /// DELETE; an empty reply reads as `{"status": "deleted"}`
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            on_empty: Some(json!({"status": "deleted"})),
            ..Self::new(Method::Delete, path)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// PUT without a body
    pub fn put_empty(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }
}

/// Raw HTTP answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RestResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a request and returns the status and body
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn send(&self, request: &RestRequest) -> Result<RestResponse, DispatchError>;
}

/// reqwest-based transport
///
/// vmrest serves a self-signed certificate, so certificate checks are
/// off. Idle connections are not kept; each call opens its own.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, credentials: Option<(String, String)>) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn from_config(config: &RestConfig) -> Result<Self, DispatchError> {
        Self::new(config.base_url(), config.credentials())
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn send(&self, request: &RestRequest) -> Result<RestResponse, DispatchError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.method.as_str(), url);

        let mut builder = self.client.request(Self::method(request.method), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        Ok(RestResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Issues REST calls and normalizes their responses
#[derive(Clone)]
pub struct RestBackend {
    transport: Arc<dyn RestTransport>,
}

impl RestBackend {
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &RestConfig) -> Result<Self, DispatchError> {
        Ok(Self::new(Arc::new(HttpTransport::from_config(config)?)))
    }

    pub async fn execute(&self, request: &RestRequest) -> Result<Payload, DispatchError> {
        let response = self.transport.send(request).await?;
        normalize_response(request, response)
    }

    /// `GET /vms`
    pub async fn list_vms(&self) -> Result<Payload, DispatchError> {
        self.execute(&list_vms()).await
    }
}

/// Map an HTTP answer onto a payload or a failure
pub fn normalize_response(request: &RestRequest, response: RestResponse) -> Result<Payload, DispatchError> {
    if !response.is_success() {
        let body = String::from_utf8_lossy(&response.body).trim().to_string();
        warn!("{} {} returned {}", request.method.as_str(), request.path, response.status);
        return Err(DispatchError::HttpError {
            status: response.status,
            body,
        });
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(match &request.on_empty {
            Some(value) => Payload::Json(value.clone()),
            None => Payload::Empty,
        });
    }

    serde_json::from_slice(&response.body)
        .map(Payload::Json)
        .map_err(|e| DispatchError::InvalidResponse(e.to_string()))
}

// Request builders, one per vmrest endpoint

pub fn list_vms() -> RestRequest {
    RestRequest::get("/vms")
}

pub fn get_vm(vm_id: &str) -> RestRequest {
    RestRequest::get(format!("/vms/{}", vm_id))
}

/// Clone `vm_id` into a new VM called `name`
pub fn create_vm(vm_id: &str, name: &str) -> RestRequest {
    RestRequest::post(format!("/vms/{}", vm_id), json!({ "name": name }))
}

pub fn delete_vm(vm_id: &str) -> RestRequest {
    RestRequest::delete(format!("/vms/{}", vm_id))
}

pub fn update_vm(vm_id: &str, settings: Value) -> RestRequest {
    RestRequest::put(format!("/vms/{}", vm_id), settings)
}

pub fn get_power_state(vm_id: &str) -> RestRequest {
    RestRequest::get(format!("/vms/{}/power", vm_id))
}

pub fn change_power_state(vm_id: &str, state: &str) -> RestRequest {
    RestRequest::put_empty(format!("/vms/{}/power", vm_id)).query("state", state)
}

pub fn list_nics(vm_id: &str) -> RestRequest {
    RestRequest::get(format!("/vms/{}/nic", vm_id))
}

pub fn create_nic(vm_id: &str, config: Value) -> RestRequest {
    RestRequest::post(format!("/vms/{}/nic", vm_id), config)
}

pub fn update_nic(vm_id: &str, index: i64, config: Value) -> RestRequest {
    RestRequest::put(format!("/vms/{}/nic/{}", vm_id, index), config)
}

pub fn delete_nic(vm_id: &str, index: i64) -> RestRequest {
    RestRequest::delete(format!("/vms/{}/nic/{}", vm_id, index))
}

pub fn get_vm_ip(vm_id: &str) -> RestRequest {
    RestRequest::get(format!("/vms/{}/ip", vm_id))
}

pub fn list_shared_folders(vm_id: &str) -> RestRequest {
    RestRequest::get(format!("/vms/{}/sharedfolders", vm_id))
}

pub fn create_shared_folder(vm_id: &str, config: Value) -> RestRequest {
    RestRequest::post(format!("/vms/{}/sharedfolders", vm_id), config)
}

pub fn update_shared_folder(vm_id: &str, folder_id: &str, config: Value) -> RestRequest {
    RestRequest::put(format!("/vms/{}/sharedfolders/{}", vm_id, folder_id), config)
}

pub fn delete_shared_folder(vm_id: &str, folder_id: &str) -> RestRequest {
    RestRequest::delete(format!("/vms/{}/sharedfolders/{}", vm_id, folder_id))
}

pub fn list_networks() -> RestRequest {
    RestRequest::get("/vmnet")
}

pub fn create_network(config: Value) -> RestRequest {
    RestRequest::post("/vmnets", config)
}

pub fn get_mac_to_ips(vmnet: &str) -> RestRequest {
    RestRequest::get(format!("/vmnet/{}/mactoip", vmnet))
}

pub fn update_mac_to_ip(vmnet: &str, mac: &str, ip: &str) -> RestRequest {
    RestRequest::put(format!("/vmnet/{}/mactoip/{}", vmnet, mac), json!({ "ip": ip }))
}

pub fn get_portforwards(vmnet: &str) -> RestRequest {
    RestRequest::get(format!("/vmnet/{}/portforward", vmnet))
}

pub fn update_portforward(vmnet: &str, protocol: &str, port: i64, config: Value) -> RestRequest {
    RestRequest::put(format!("/vmnet/{}/portforward/{}/{}", vmnet, protocol, port), config)
}

pub fn delete_portforward(vmnet: &str, protocol: &str, port: i64) -> RestRequest {
    RestRequest::delete(format!("/vmnet/{}/portforward/{}/{}", vmnet, protocol, port))
}
