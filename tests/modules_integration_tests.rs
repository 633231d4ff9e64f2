//! Integration tests for resource modules

use serde_json::{json, Value};

use converge::client::InMemoryClient;
use converge::modules::{ExecutionContext, ModuleArgs, ModuleRegistry, SpecialParameters};
use converge::{Action, ExecutionOptions};

fn args(value: Value) -> ModuleArgs {
    ModuleArgs::new(value.as_object().cloned().unwrap())
}

#[tokio::test]
async fn test_firewall_address_present_then_absent() {
    let client = InMemoryClient::new();
    let registry = ModuleRegistry::for_client(client.clone());
    let context = ExecutionContext::default();

    let created = registry
        .execute_module(
            "fortios_firewall_address",
            &args(json!({"name": "web01", "subnet": "10.0.0.1 255.255.255.255", "color": "5"})),
            &context,
        )
        .await
        .unwrap();
    assert!(created.changed);
    assert!(!created.failed);
    assert_eq!(created.action, Action::Create);
    assert_eq!(client.records("firewall_address")[0]["color"], 5);

    let removed = registry
        .execute_module(
            "fortios_firewall_address",
            &args(json!({"state": "absent", "name": "web01"})),
            &context,
        )
        .await
        .unwrap();
    assert!(removed.changed);
    assert_eq!(removed.action, Action::Delete);
    assert!(client.records("firewall_address").is_empty());
}

#[tokio::test]
async fn test_check_mode_from_context_and_task() {
    let client = InMemoryClient::new();
    let registry = ModuleRegistry::for_client(client.clone());

    let context = ExecutionContext {
        check_mode: true,
        ..Default::default()
    };
    let result = registry
        .execute_module(
            "purefb_policy",
            &args(json!({"name": "export1"})),
            &context,
        )
        .await
        .unwrap();
    assert!(result.changed);
    assert_eq!(result.msg.as_deref(), Some("Would create nfs_export_policy name=export1"));

    let mut task_args = args(json!({"name": "export1"}));
    task_args.special = SpecialParameters {
        check_mode: true,
        diff: true,
    };
    let result = registry
        .execute_module("purefb_policy", &task_args, &ExecutionContext::default())
        .await
        .unwrap();
    assert!(result.changed);
    let diff = result.diff.unwrap();
    assert_eq!(diff.after["enabled"], true);

    assert!(client.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_options_reach_the_job_watcher() {
    let client = InMemoryClient::new().with_async_jobs(100);
    let registry = ModuleRegistry::for_client(client.clone());
    let context = ExecutionContext {
        defaults: ExecutionOptions {
            timeout_secs: 600,
            ..Default::default()
        },
        ..Default::default()
    };

    let result = registry
        .execute_module(
            "na_ontap_volume",
            &args(json!({"name": "vol1", "vserver": "vs1", "time_out": 10, "poll_interval": 5})),
            &context,
        )
        .await
        .unwrap();

    assert!(result.failed);
    let msg = result.msg.unwrap();
    assert!(msg.contains("still running after 10s"), "{msg}");
}

#[tokio::test]
async fn test_failure_result_serializes_for_the_operator() {
    let client = InMemoryClient::new().with_record(
        "flexcache",
        json!({"uuid": "u-1", "name": "cache1", "vserver": "vs1", "origin_volume": "vol1"}),
    );
    let registry = ModuleRegistry::for_client(client.clone());

    let result = registry
        .execute_module(
            "na_ontap_flexcache",
            &args(json!({"name": "cache1", "vserver": "vs1", "origin_volume": "vol9"})),
            &ExecutionContext::default(),
        )
        .await
        .unwrap();

    assert!(result.failed);
    let rendered = serde_json::to_value(&result).unwrap();
    assert_eq!(rendered["failed"], true);
    assert_eq!(rendered["changed"], false);
    assert_eq!(
        rendered["msg"],
        "flexcache name=cache1,vserver=vs1: modifying origin_volume is not supported"
    );
    assert!(rendered.get("diff").is_none());
    assert!(client.mutations().is_empty());
}
