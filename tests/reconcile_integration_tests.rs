//! End-to-end reconciliation against the in-memory client

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use converge::client::{Call, CallKind, InMemoryClient, JobState, JobStatus};
use converge::reconcile::{JobError, ReconcileError, Reconciler};
use converge::{Action, ConfigurationObject, DesiredState, ExecutionOptions};

fn object(value: Value) -> ConfigurationObject {
    value.as_object().cloned().unwrap()
}

fn desired_for(resource: &str) -> ConfigurationObject {
    match resource {
        "firewall_address" => object(json!({
            "name": "web01", "type": "ipmask", "subnet": "10.0.0.1 255.255.255.255", "color": 3
        })),
        "flexcache" => object(json!({
            "name": "cache1", "vserver": "vs1", "origin_volume": "vol1",
            "origin_vserver": "vs0", "aggr_list": ["aggr1", "aggr2"], "junction_path": "/cache1"
        })),
        "volume" => object(json!({
            "name": "vol1", "vserver": "vs1", "aggregate_name": "aggr1", "size": 1073741824
        })),
        "santricity_host" => object(json!({"ssid": "1", "name": "host1", "host_type": 28})),
        "santricity_ldap" => object(json!({
            "ssid": "1", "id": "default", "server_url": "ldaps://dc1.example.com",
            "bind_password": "secret", "names": ["example.com"]
        })),
        "nfs_export_policy" => object(json!({
            "name": "export1", "rules": [{"client": "*", "access": "root-squash"}]
        })),
        other => panic!("no fixture for {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_every_builtin_resource_is_idempotent() {
    let client = InMemoryClient::new().with_async_jobs(1);
    let reconciler = Reconciler::with_builtin_resources(client.clone());
    let names: Vec<String> = reconciler
        .registry()
        .list()
        .iter()
        .map(|r| r.name.clone())
        .collect();

    for name in names {
        let desired = DesiredState::present(name.as_str(), desired_for(&name));

        let first = reconciler.reconcile(&desired).await.unwrap();
        assert!(first.changed, "{name} was not created");
        assert_eq!(first.action, Action::Create);

        let before = client.mutations().len();
        let second = reconciler.reconcile(&desired).await.unwrap();
        assert!(!second.changed, "{name} changed on the second run: {}", second.message);
        assert_eq!(client.mutations().len(), before, "{name} mutated on the second run");
    }
}

#[tokio::test(start_paused = true)]
async fn test_flexcache_lifecycle() {
    let client = InMemoryClient::new().with_async_jobs(2);
    let reconciler = Reconciler::with_builtin_resources(Arc::new(client.clone()));
    let identity = object(json!({"name": "cache1", "vserver": "vs1"}));

    let created = reconciler
        .run(&DesiredState::present("flexcache", desired_for("flexcache")))
        .await;
    assert!(created.changed && !created.failed, "{}", created.message);
    assert_eq!(client.records("flexcache")[0]["junction_path"], "/cache1");

    let mut resized = desired_for("flexcache");
    resized.insert("size".to_string(), json!("2147483648"));
    resized.insert("aggr_list".to_string(), json!(["aggr2", "aggr1"]));
    let updated = reconciler
        .run(&DesiredState::present("flexcache", resized))
        .await;
    assert_eq!(updated.action, Action::Update);
    let Some(Call::Update { body, .. }) = client.mutations().last().cloned() else {
        panic!("expected an update");
    };
    assert_eq!(body, object(json!({"size": 2147483648u64})));

    let options = ExecutionOptions {
        force_unmount: true,
        force_offline: true,
        ..Default::default()
    };
    let deleted = reconciler
        .run(&DesiredState::absent("flexcache", identity.clone()).with_options(options.clone()))
        .await;
    assert_eq!(deleted.action, Action::Delete);
    assert!(client.records("flexcache").is_empty());

    let again = reconciler
        .run(&DesiredState::absent("flexcache", identity).with_options(options))
        .await;
    assert!(!again.changed && !again.failed);
}

#[tokio::test(start_paused = true)]
async fn test_job_timeout_is_reported_with_context() {
    let client = InMemoryClient::new().with_async_jobs(0);
    client.script_job("job-1", vec![Some(JobStatus::new(JobState::Running))]);
    let reconciler = Reconciler::with_builtin_resources(client.clone());

    let options = ExecutionOptions {
        timeout_secs: 30,
        poll_interval_secs: 10,
        ..Default::default()
    };
    let start = Instant::now();
    let err = reconciler
        .reconcile(
            &DesiredState::present("volume", desired_for("volume")).with_options(options),
        )
        .await
        .unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(30));
    assert!(matches!(
        err.job_error(),
        Some(JobError::Timeout { timeout_secs: 30, .. })
    ));
    assert!(err.to_string().contains("volume name=vol1,vserver=vs1"));
    // the record exists remotely; only the wait was abandoned
    assert_eq!(client.records("volume").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_does_not_poll() {
    let client = InMemoryClient::new().with_async_jobs(3);
    let reconciler = Reconciler::with_builtin_resources(client.clone());
    let options = ExecutionOptions {
        timeout_secs: 0,
        ..Default::default()
    };

    let result = reconciler
        .reconcile(&DesiredState::present("volume", desired_for("volume")).with_options(options))
        .await;
    tokio_test::assert_ok!(result);
    assert!(!client
        .calls()
        .iter()
        .any(|c| c.kind() == CallKind::GetJob));
}

#[tokio::test]
async fn test_transport_failure_fails_fast() {
    let client = InMemoryClient::new();
    client.fail_next(
        CallKind::Get,
        converge::client::ClientError::Transport("connection refused".to_string()),
    );
    let reconciler = Reconciler::with_builtin_resources(client.clone());

    let err = reconciler
        .reconcile(&DesiredState::present(
            "firewall_address",
            desired_for("firewall_address"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::RemoteTransport { .. }));
    assert!(client.mutations().is_empty());
}

#[tokio::test]
async fn test_unmounted_resource_skips_unmount() {
    let client = InMemoryClient::new().with_record(
        "volume",
        json!({"uuid": "u-1", "name": "vol1", "vserver": "vs1", "junction_path": "", "volume_state": "offline"}),
    );
    let reconciler = Reconciler::with_builtin_resources(client.clone());
    let options = ExecutionOptions {
        force_unmount: true,
        force_offline: true,
        ..Default::default()
    };

    let result = reconciler
        .run(
            &DesiredState::absent("volume", object(json!({"name": "vol1", "vserver": "vs1"})))
                .with_options(options),
        )
        .await;
    assert!(result.changed);
    let kinds: Vec<CallKind> = client.mutations().iter().map(Call::kind).collect();
    assert_eq!(kinds, vec![CallKind::Delete]);
}
