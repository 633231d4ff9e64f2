//! Reconciliation through the REST client against a mock management API

use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;

use converge::client::{AuthMethod, RestClient};
use converge::config::ConnectionConfig;
use converge::{Action, DesiredState, ExecutionOptions, Reconciler};

fn reconciler(server: &MockServer) -> Reconciler<RestClient> {
    let client = RestClient::new(&ConnectionConfig {
        endpoint: server.base_url(),
        auth: AuthMethod::Bearer {
            token: "fgt-token".to_string(),
        },
        ..Default::default()
    })
    .unwrap();
    Reconciler::with_builtin_resources(client)
}

#[tokio::test]
async fn test_fortios_create_sends_kebab_case() {
    let server = MockServer::start_async().await;
    let lookup = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/cmdb/firewall/address/web01");
            then.status(404)
                .json_body(json!({"http_status": 404, "status": "error"}));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v2/cmdb/firewall/address")
                .header("authorization", "Bearer fgt-token")
                .json_body(json!({
                    "name": "web01",
                    "type": "iprange",
                    "start-ip": "10.0.0.10",
                    "end-ip": "10.0.0.20",
                    "allow-routing": "enable"
                }));
            then.status(200)
                .json_body(json!({"http_status": 200, "status": "success", "mkey": "web01"}));
        })
        .await;

    let desired = DesiredState::present(
        "firewall_address",
        json!({
            "name": "web01",
            "type": "iprange",
            "start_ip": "10.0.0.10",
            "end_ip": "10.0.0.20",
            "allow_routing": "enable",
            "comment": null
        })
        .as_object()
        .cloned()
        .unwrap(),
    );
    let result = reconciler(&server).reconcile(&desired).await.unwrap();

    lookup.assert_async().await;
    create.assert_async().await;
    assert_eq!(result.action, Action::Create);
    assert_eq!(result.response["mkey"], "web01");
}

#[tokio::test]
async fn test_fortios_update_sends_only_changed_fields() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/cmdb/firewall/address/web01");
            then.status(200).json_body(json!({
                "results": [{
                    "name": "web01",
                    "uuid": "7c3c4f8a-0000-0000-0000-000000000001",
                    "type": "ipmask",
                    "subnet": "10.0.0.1 255.255.255.255",
                    "color": "0",
                    "comment": ""
                }]
            }));
        })
        .await;
    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/v2/cmdb/firewall/address/web01")
                .json_body(json!({"comment": "web tier"}));
            then.status(200).json_body(json!({"status": "success"}));
        })
        .await;

    let desired = DesiredState::present(
        "firewall_address",
        json!({"name": "web01", "color": 0, "comment": "web tier"})
            .as_object()
            .cloned()
            .unwrap(),
    );
    let result = reconciler(&server).reconcile(&desired).await.unwrap();

    update.assert_async().await;
    assert_eq!(result.action, Action::Update);
}

#[tokio::test]
async fn test_ontap_delete_waits_for_job() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/storage/flexcache/flexcaches")
                .query_param("name", "cache1")
                .query_param("svm.name", "vs1");
            then.status(200).json_body(json!({
                "records": [{"uuid": "fc-1", "name": "cache1", "svm": {"name": "vs1"}, "path": "/cache1"}],
                "num_records": 1
            }));
        })
        .await;
    let unmount = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/api/storage/flexcache/flexcaches/fc-1")
                .json_body(json!({"path": ""}));
            then.status(202).json_body(json!({"job": {"uuid": "job-u"}}));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/storage/flexcache/flexcaches/fc-1");
            then.status(202).json_body(json!({"job": {"uuid": "job-d"}}));
        })
        .await;
    let jobs = server
        .mock_async(|when, then| {
            when.method(GET).path_matches(regex::Regex::new(r"^/api/cluster/jobs/job-[ud]$").unwrap());
            then.status(200)
                .json_body(json!({"state": "success", "message": "success"}));
        })
        .await;

    let options = ExecutionOptions {
        force_unmount: true,
        ..Default::default()
    };
    let desired = DesiredState::absent(
        "flexcache",
        json!({"name": "cache1", "vserver": "vs1"})
            .as_object()
            .cloned()
            .unwrap(),
    )
    .with_options(options);
    let result = reconciler(&server).run(&desired).await;

    assert!(result.changed, "{}", result.message);
    unmount.assert_async().await;
    delete.assert_async().await;
    jobs.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_vendor_error_is_reported_verbatim() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/cmdb/firewall/address/web01");
            then.status(404).json_body(json!({"status": "error"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2/cmdb/firewall/address");
            then.status(500).json_body(json!({
                "status": "error",
                "error": -7,
                "cli_error": "Invalid IP address"
            }));
        })
        .await;

    let desired = DesiredState::present(
        "firewall_address",
        json!({"name": "web01", "subnet": "10.0.0.300/32"})
            .as_object()
            .cloned()
            .unwrap(),
    );
    let result = reconciler(&server).run(&desired).await;

    assert!(result.failed);
    assert_eq!(
        result.message,
        "Error on create of firewall_address name=web01: Invalid IP address"
    );
    assert_eq!(result.response["error"], -7);
}
