//! REST implementation of [`RemoteClient`]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, ClientBuilder, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use super::{
    AuthHandler, AuthMethod, ClientError, JobRef, JobState, JobStatus, RemoteClient,
    RemoteResponse,
};
use crate::config::ConnectionConfig;
use crate::reconcile::comparator::values_equal;
use crate::resources::{HttpVerb, LookupStyle, ResourceType};
use crate::state::ConfigurationObject;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("Invalid placeholder regex"));

/// Where the supported vendors put a human-readable error.
const ERROR_POINTERS: &[&str] = &[
    "/error/message",
    "/cli_error",
    "/errorMessage",
    "/errors/0/message",
    "/message",
    "/error",
];

pub struct RestClient {
    client: Client,
    base: Url,
    auth: AuthMethod,
    headers: HashMap<String, String>,
}

impl RestClient {
    pub fn new(config: &ConnectionConfig) -> Result<Self, ClientError> {
        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone());

        if !config.validate_certs {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        if let Some(ca_cert_path) = &config.ca_cert {
            let ca_cert = std::fs::read(ca_cert_path).map_err(|e| {
                ClientError::Request(format!(
                    "Failed to read CA certificate {}: {e}",
                    ca_cert_path.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&ca_cert).map_err(|e| {
                ClientError::Request(format!("Failed to load CA certificate: {e}"))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build()?;
        let base = Url::parse(&config.endpoint)?;

        Ok(Self {
            client,
            base,
            auth: config.auth.clone(),
            headers: config.headers.clone(),
        })
    }

    /// Renders `template` against `values` into an absolute URL.
    ///
    /// Placeholder values are percent-encoded as single path segments, so a
    /// name containing `/` cannot escape its segment.
    pub fn url(
        &self,
        template: &str,
        extra_params: &[(String, String)],
        values: &ConfigurationObject,
    ) -> Result<Url, ClientError> {
        let (path, query) = template.split_once('?').unwrap_or((template, ""));

        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::Request(format!("{} cannot be a base URL", self.base)))?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(&substitute(segment, values)?);
            }
        }

        let mut pairs = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            pairs.push((key.to_string(), substitute(value, values)?));
        }
        for (key, value) in extra_params {
            pairs.push((key.clone(), substitute(value, values)?));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<(u16, Value), ClientError> {
        let mut headers = self.headers.clone();
        AuthHandler::apply_auth(&mut headers, &self.auth)
            .map_err(|e| ClientError::Request(e.to_string()))?;

        debug!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        for (key, value) in &headers {
            request = request.header(key, value);
        }
        if let Some(body) = body {
            trace!("Request body: {}", body);
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let payload = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if !(200..300).contains(&status) {
            let message = vendor_message(&payload)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return Err(ClientError::Application {
                status,
                message,
                payload,
            });
        }

        Ok((status, payload))
    }

    fn records(&self, resource: &ResourceType, payload: &Value) -> Vec<ConfigurationObject> {
        let target = resource
            .records_key
            .as_ref()
            .and_then(|key| payload.get(key))
            .unwrap_or(payload);

        let objects: Vec<&serde_json::Map<String, Value>> = match target {
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            Value::Object(map) => vec![map],
            _ => Vec::new(),
        };

        objects
            .into_iter()
            .map(|object| resource.naming.from_wire(object))
            .collect()
    }

    fn body(&self, resource: &ResourceType, object: &ConfigurationObject) -> Value {
        let stripped: ConfigurationObject = object
            .iter()
            .filter(|(k, _)| !resource.is_path_field(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(resource.naming.to_wire(&stripped))
    }

    fn response(&self, resource: &ResourceType, status: u16, payload: Value) -> RemoteResponse {
        let job = resource.job.as_ref().and_then(|endpoint| {
            let id = match payload.pointer(&endpoint.id_pointer)? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let node = endpoint
                .node_pointer
                .as_ref()
                .and_then(|p| payload.pointer(p))
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(JobRef { id, node })
        });

        RemoteResponse {
            status,
            response: payload,
            job,
        }
    }
}

#[async_trait]
impl RemoteClient for RestClient {
    async fn get(
        &self,
        resource: &ResourceType,
        identity: &ConfigurationObject,
    ) -> Result<Vec<ConfigurationObject>, ClientError> {
        let url = match resource.lookup {
            LookupStyle::Item => self.url(&resource.item_path, &[], identity)?,
            LookupStyle::Query => {
                self.url(&resource.collection_path, &resource.lookup_params, identity)?
            }
            LookupStyle::List => self.url(&resource.collection_path, &[], identity)?,
        };

        let payload = match self.send(Method::GET, url, None).await {
            Ok((_, payload)) => payload,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut records = self.records(resource, &payload);
        if resource.lookup == LookupStyle::List {
            records.retain(|record| {
                identity
                    .iter()
                    .filter(|(field, _)| !resource.is_path_field(field))
                    .all(|(field, wanted)| {
                        let spec = resource.schema.field(field);
                        record
                            .get(field)
                            .is_some_and(|actual| values_equal(spec, wanted, actual))
                    })
            });
        }
        Ok(records)
    }

    async fn create(
        &self,
        resource: &ResourceType,
        identity: &ConfigurationObject,
        payload: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        let mut values = payload.clone();
        values.extend(identity.clone());
        let url = self.url(&resource.create_path, &[], &values)?;
        let body = self.body(resource, payload);
        let (status, response) = self.send(Method::POST, url, Some(&body)).await?;
        Ok(self.response(resource, status, response))
    }

    async fn update(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
        body: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        let method = match resource.update_verb {
            HttpVerb::Post => Method::POST,
            HttpVerb::Put => Method::PUT,
            HttpVerb::Patch => Method::PATCH,
        };
        let url = self.url(&resource.item_path, &[], locator)?;
        let body = self.body(resource, body);
        let (status, response) = self.send(method, url, Some(&body)).await?;
        Ok(self.response(resource, status, response))
    }

    async fn delete(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        let url = self.url(&resource.item_path, &[], locator)?;
        let (status, response) = self.send(Method::DELETE, url, None).await?;
        Ok(self.response(resource, status, response))
    }

    async fn get_job(
        &self,
        resource: &ResourceType,
        job: &JobRef,
    ) -> Result<Option<JobStatus>, ClientError> {
        let endpoint = resource.job.as_ref().ok_or_else(|| {
            ClientError::Request(format!("{} does not report asynchronous jobs", resource.name))
        })?;

        let mut values = ConfigurationObject::new();
        values.insert("id".to_string(), Value::String(job.id.clone()));
        let template = match (&job.node, &endpoint.node_path) {
            (Some(node), Some(node_path)) => {
                values.insert("node".to_string(), Value::String(node.clone()));
                node_path
            }
            _ => &endpoint.path,
        };
        let url = self.url(template, &[], &values)?;

        let payload = match self.send(Method::GET, url, None).await {
            Ok((_, payload)) => payload,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let state = payload
            .pointer(&endpoint.state_pointer)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::Decode(format!("job {job} response has no state: {payload}"))
            })?;
        let detail = payload
            .pointer(&endpoint.message_pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Some(JobStatus {
            state: JobState::parse(state),
            detail,
        }))
    }
}

/// Names of the `{field}` placeholders in a path template.
pub fn template_fields(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn substitute(text: &str, values: &ConfigurationObject) -> Result<String, ClientError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        let value = match values.get(name.as_str()) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => {
                return Err(ClientError::Request(format!(
                    "no value for '{}' in path template",
                    name.as_str()
                )))
            }
        };
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn vendor_message(payload: &Value) -> Option<String> {
    if let Value::String(text) = payload {
        return Some(text.clone());
    }
    ERROR_POINTERS
        .iter()
        .filter_map(|p| payload.pointer(p))
        .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::builtin;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use serde_json::json;

    fn object(value: Value) -> ConfigurationObject {
        value.as_object().cloned().unwrap()
    }

    fn client_for(server: &MockServer, auth: AuthMethod) -> RestClient {
        RestClient::new(&ConnectionConfig {
            endpoint: server.base_url(),
            auth,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_rendering_encodes_segments_and_query() {
        let client = RestClient::new(&ConnectionConfig {
            endpoint: "https://fb.example.com".to_string(),
            ..Default::default()
        })
        .unwrap();

        let url = client
            .url(
                "/api/v2/cmdb/firewall/address/{name}",
                &[],
                &object(json!({"name": "net a/b"})),
            )
            .unwrap();
        assert_eq!(url.path(), "/api/v2/cmdb/firewall/address/net%20a%2Fb");

        let url = client
            .url(
                "/api/2.12/nfs-export-policies?names={name}",
                &[],
                &object(json!({"name": "export1"})),
            )
            .unwrap();
        assert_eq!(url.query(), Some("names=export1"));

        let err = client
            .url("/api/storage/volumes/{uuid}", &[], &object(json!({"name": "v"})))
            .unwrap_err();
        assert!(err.to_string().contains("uuid"));
    }

    #[test]
    fn test_template_fields() {
        assert_eq!(
            template_fields("/devmgr/v2/storage-systems/{ssid}/hosts/{id}"),
            vec!["ssid".to_string(), "id".to_string()]
        );
        assert!(template_fields("/api/storage/volumes").is_empty());
    }

    #[tokio::test]
    async fn test_query_lookup_translates_wire_names() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/storage/flexcache/flexcaches")
                    .query_param("name", "cache1")
                    .query_param("svm.name", "vs1")
                    .query_param("fields", "*")
                    .header("authorization", "Bearer secret");
                then.status(200).json_body(json!({
                    "records": [{
                        "uuid": "u-1",
                        "name": "cache1",
                        "svm": {"name": "vs1"},
                        "origins": [{"volume": {"name": "vol1"}, "svm": {"name": "vs0"}}],
                        "path": "/cache1",
                        "size": 1048576
                    }],
                    "num_records": 1
                }));
            })
            .await;

        let client = client_for(
            &server,
            AuthMethod::Bearer {
                token: "secret".to_string(),
            },
        );
        let resource = builtin::flexcache();
        let records = client
            .get(&resource, &object(json!({"name": "cache1", "vserver": "vs1"})))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["vserver"], "vs1");
        assert_eq!(records[0]["origin_volume"], "vol1");
        assert_eq!(records[0]["origin_vserver"], "vs0");
        assert_eq!(records[0]["junction_path"], "/cache1");
        assert_eq!(records[0]["uuid"], "u-1");
    }

    #[tokio::test]
    async fn test_item_lookup_not_found_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/cmdb/firewall/address/web01");
                then.status(404).json_body(json!({"status": "error", "http_status": 404}));
            })
            .await;

        let client = client_for(&server, AuthMethod::None);
        let records = client
            .get(&builtin::firewall_address(), &object(json!({"name": "web01"})))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_list_lookup_filters_locally() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/devmgr/v2/storage-systems/1/hosts");
                then.status(200).json_body(json!([
                    {"id": "84000000600A", "label": "host1", "hostType": {"index": 28}},
                    {"id": "84000000600B", "label": "host2", "hostType": {"index": 28}}
                ]));
            })
            .await;

        let client = client_for(&server, AuthMethod::None);
        let records = client
            .get(
                &builtin::santricity_host(),
                &object(json!({"ssid": "1", "name": "host2"})),
            )
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], "84000000600B");
        assert_eq!(records[0]["host_type"], 28);
    }

    #[tokio::test]
    async fn test_create_returns_job_handle() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/storage/flexcache/flexcaches")
                    .json_body(json!({
                        "name": "cache1",
                        "svm": {"name": "vs1"},
                        "origins": [{"volume": {"name": "vol1"}, "svm": {"name": "vs0"}}]
                    }));
                then.status(202)
                    .json_body(json!({"job": {"uuid": "job-7", "_links": {}}}));
            })
            .await;

        let client = client_for(&server, AuthMethod::None);
        let payload = object(json!({
            "name": "cache1",
            "vserver": "vs1",
            "origin_volume": "vol1",
            "origin_vserver": "vs0"
        }));
        let identity = object(json!({"name": "cache1", "vserver": "vs1"}));
        let response = client
            .create(&builtin::flexcache(), &identity, &payload)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 202);
        assert_eq!(response.job, Some(JobRef::new("job-7")));
    }

    #[tokio::test]
    async fn test_path_fields_stay_out_of_the_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/devmgr/v2/storage-systems/1/hosts")
                    .json_body(json!({"label": "host1", "hostType": {"index": 28}}));
                then.status(201).json_body(json!({"id": "84000000600A"}));
            })
            .await;

        let client = client_for(&server, AuthMethod::None);
        let identity = object(json!({"ssid": "1", "name": "host1"}));
        let payload = object(json!({"ssid": "1", "name": "host1", "host_type": 28}));
        let response = client
            .create(&builtin::santricity_host(), &identity, &payload)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(response.job.is_none());
    }

    #[tokio::test]
    async fn test_update_uses_locator_and_verb() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/api/storage/volumes/u-9")
                    .json_body(json!({"comment": "archive"}));
                then.status(200).json_body(json!({}));
            })
            .await;

        let client = client_for(&server, AuthMethod::None);
        let locator = object(json!({"uuid": "u-9", "name": "vol9", "vserver": "vs1"}));
        client
            .update(
                &builtin::ontap_volume(),
                &locator,
                &object(json!({"comment": "archive"})),
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_vendor_error_text_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/storage/volumes/u-9");
                then.status(400).json_body(json!({
                    "error": {"message": "Volume is mounted", "code": "917536"}
                }));
            })
            .await;

        let client = client_for(&server, AuthMethod::None);
        let err = client
            .delete(&builtin::ontap_volume(), &object(json!({"uuid": "u-9"})))
            .await
            .unwrap_err();

        match err {
            ClientError::Application {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Volume is mounted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_job_status_lookup() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/cluster/jobs/job-7");
                then.status(200).json_body(json!({
                    "uuid": "job-7",
                    "state": "failure",
                    "message": "Origin volume vol1 not found"
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/cluster/jobs/job-8");
                then.status(404).json_body(json!({"error": {"message": "entry doesn't exist"}}));
            })
            .await;

        let client = client_for(&server, AuthMethod::None);
        let resource = builtin::flexcache();

        let status = client
            .get_job(&resource, &JobRef::new("job-7"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.state, JobState::Failure);
        assert_eq!(status.detail.as_deref(), Some("Origin volume vol1 not found"));

        let missing = client.get_job(&resource, &JobRef::new("job-8")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let client = RestClient::new(&ConnectionConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap();

        let err = client
            .get(&builtin::firewall_address(), &object(json!({"name": "web01"})))
            .await
            .unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err:?}");
    }
}
