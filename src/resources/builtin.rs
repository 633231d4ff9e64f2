//! Built-in resource types

use serde_json::json;

use super::{FieldSetting, HttpVerb, JobEndpoint, LookupStyle, ResourceType, UpdateMode};
use crate::naming::{KeyMapper, NamingConvention};
use crate::schema::{FieldSpec, FieldType, ResourceSchema};

pub fn all() -> Vec<ResourceType> {
    vec![
        firewall_address(),
        flexcache(),
        ontap_volume(),
        santricity_host(),
        santricity_ldap_domain(),
        nfs_export_policy(),
    ]
}

/// FortiOS `firewall address` objects.
pub fn firewall_address() -> ResourceType {
    ResourceType {
        name: "firewall_address".to_string(),
        module_name: "fortios_firewall_address".to_string(),
        description: "Configure IPv4 addresses in Fortinet's FortiOS and FortiGate".to_string(),
        collection_path: "/api/v2/cmdb/firewall/address".to_string(),
        create_path: "/api/v2/cmdb/firewall/address".to_string(),
        item_path: "/api/v2/cmdb/firewall/address/{name}".to_string(),
        identity: vec!["name".to_string()],
        path_fields: Vec::new(),
        immutable: vec!["uuid".to_string()],
        deferred: Vec::new(),
        lookup: LookupStyle::Item,
        lookup_params: Vec::new(),
        records_key: Some("results".to_string()),
        update_mode: UpdateMode::Patch,
        update_verb: HttpVerb::Put,
        naming: KeyMapper::new(NamingConvention::Kebab),
        unmount: None,
        offline: None,
        job: None,
        schema: ResourceSchema::new(vec![
            FieldSpec::str("name").required().describe("Address name"),
            FieldSpec::str("type")
                .choices(&[
                    "ipmask",
                    "iprange",
                    "fqdn",
                    "geography",
                    "wildcard",
                    "dynamic",
                    "interface-subnet",
                    "mac",
                ])
                .describe("Type of address"),
            FieldSpec::str("uuid").describe("Universally Unique Identifier"),
            FieldSpec::str("subnet").describe("IP address and subnet mask of address"),
            FieldSpec::str("start_ip").describe("First IP address (inclusive) in the range"),
            FieldSpec::str("end_ip").describe("Final IP address (inclusive) in the range"),
            FieldSpec::str("fqdn").describe("Fully Qualified Domain Name address"),
            FieldSpec::str("country").describe("IP addresses associated to a specific country"),
            FieldSpec::str("associated_interface")
                .describe("Network interface associated with address"),
            FieldSpec::int("color").describe("Color of icon on the GUI"),
            FieldSpec::str("comment").describe("Comment"),
            FieldSpec::str("visibility").choices(&["enable", "disable"]),
            FieldSpec::str("allow_routing").choices(&["enable", "disable"]),
            FieldSpec::list("tagging", FieldType::Dict).describe("Config object tagging"),
        ]),
    }
}

/// ONTAP FlexCache relationships.
pub fn flexcache() -> ResourceType {
    ResourceType {
        name: "flexcache".to_string(),
        module_name: "na_ontap_flexcache".to_string(),
        description: "Create/Delete FlexCache volumes".to_string(),
        collection_path: "/api/storage/flexcache/flexcaches".to_string(),
        create_path: "/api/storage/flexcache/flexcaches".to_string(),
        item_path: "/api/storage/flexcache/flexcaches/{uuid}".to_string(),
        identity: vec!["name".to_string(), "vserver".to_string()],
        path_fields: Vec::new(),
        immutable: vec![
            "origin_volume".to_string(),
            "origin_vserver".to_string(),
            "origin_cluster".to_string(),
            "aggr_list".to_string(),
            "aggr_list_multiplier".to_string(),
        ],
        deferred: vec!["junction_path".to_string()],
        lookup: LookupStyle::Query,
        lookup_params: vec![
            ("name".to_string(), "{name}".to_string()),
            ("svm.name".to_string(), "{vserver}".to_string()),
            ("fields".to_string(), "*".to_string()),
        ],
        records_key: Some("records".to_string()),
        update_mode: UpdateMode::Patch,
        update_verb: HttpVerb::Patch,
        naming: KeyMapper::new(NamingConvention::Snake)
            .rename("vserver", "svm.name")
            .rename("origin_volume", "origins.0.volume.name")
            .rename("origin_vserver", "origins.0.svm.name")
            .rename("origin_cluster", "origins.0.cluster.name")
            .rename("junction_path", "path")
            .rename("aggr_list", "aggregates")
            .rename("aggr_list_multiplier", "constituents_per_aggregate")
            .rename("volume_state", "state"),
        unmount: Some(FieldSetting::new("junction_path", json!(""))),
        offline: Some(FieldSetting::new("volume_state", json!("offline"))),
        job: Some(JobEndpoint::ontap()),
        schema: ResourceSchema::new(vec![
            FieldSpec::str("name").required().describe("Name of the FlexCache volume"),
            FieldSpec::str("vserver").required().describe("Name of the vserver for the cache"),
            FieldSpec::str("origin_volume").describe("Name of the origin volume"),
            FieldSpec::str("origin_vserver").describe("Name of the origin vserver"),
            FieldSpec::str("origin_cluster").describe("Name of the origin cluster"),
            FieldSpec::list("aggr_list", FieldType::Str)
                .unordered()
                .describe("List of aggregates to host the FlexCache volume"),
            FieldSpec::int("aggr_list_multiplier")
                .describe("Number of FlexVol constituents per aggregate"),
            FieldSpec::int("size").describe("Size of cache volume in bytes"),
            FieldSpec::str("junction_path").describe("Junction path of the cache volume"),
            FieldSpec::str("volume_state").choices(&["online", "offline"]),
        ]),
    }
}

/// ONTAP FlexVol volumes.
pub fn ontap_volume() -> ResourceType {
    ResourceType {
        name: "volume".to_string(),
        module_name: "na_ontap_volume".to_string(),
        description: "Manage NetApp ONTAP volumes".to_string(),
        collection_path: "/api/storage/volumes".to_string(),
        create_path: "/api/storage/volumes".to_string(),
        item_path: "/api/storage/volumes/{uuid}".to_string(),
        identity: vec!["name".to_string(), "vserver".to_string()],
        path_fields: Vec::new(),
        immutable: vec!["type".to_string(), "language".to_string()],
        deferred: Vec::new(),
        lookup: LookupStyle::Query,
        lookup_params: vec![
            ("name".to_string(), "{name}".to_string()),
            ("svm.name".to_string(), "{vserver}".to_string()),
            ("fields".to_string(), "*".to_string()),
        ],
        records_key: Some("records".to_string()),
        update_mode: UpdateMode::Patch,
        update_verb: HttpVerb::Patch,
        naming: KeyMapper::new(NamingConvention::Snake)
            .rename("vserver", "svm.name")
            .rename("aggregate_name", "aggregates.0.name")
            .rename("junction_path", "nas.path")
            .rename("snapshot_policy", "snapshot_policy.name")
            .rename("volume_state", "state"),
        unmount: Some(FieldSetting::new("junction_path", json!(""))),
        offline: Some(FieldSetting::new("volume_state", json!("offline"))),
        job: Some(JobEndpoint::ontap()),
        schema: ResourceSchema::new(vec![
            FieldSpec::str("name").required(),
            FieldSpec::str("vserver").required(),
            FieldSpec::str("aggregate_name"),
            FieldSpec::int("size"),
            FieldSpec::str("type").choices(&["rw", "dp"]),
            FieldSpec::str("language"),
            FieldSpec::str("junction_path"),
            FieldSpec::str("comment"),
            FieldSpec::str("snapshot_policy"),
            FieldSpec::str("volume_state").choices(&["online", "offline", "restricted"]),
        ]),
    }
}

/// E-Series SANtricity hosts.
pub fn santricity_host() -> ResourceType {
    ResourceType {
        name: "santricity_host".to_string(),
        module_name: "na_santricity_host".to_string(),
        description: "Manage E-Series hosts".to_string(),
        collection_path: "/devmgr/v2/storage-systems/{ssid}/hosts".to_string(),
        create_path: "/devmgr/v2/storage-systems/{ssid}/hosts".to_string(),
        item_path: "/devmgr/v2/storage-systems/{ssid}/hosts/{id}".to_string(),
        identity: vec!["ssid".to_string(), "name".to_string()],
        path_fields: vec!["ssid".to_string()],
        immutable: Vec::new(),
        deferred: Vec::new(),
        lookup: LookupStyle::List,
        lookup_params: Vec::new(),
        records_key: None,
        update_mode: UpdateMode::Patch,
        update_verb: HttpVerb::Post,
        naming: KeyMapper::new(NamingConvention::Camel)
            .rename("name", "label")
            .rename("host_type", "hostType.index")
            .rename("group", "clusterRef"),
        unmount: None,
        offline: None,
        job: None,
        schema: ResourceSchema::new(vec![
            FieldSpec::str("ssid").required().describe("Storage array identifier"),
            FieldSpec::str("name").required().describe("Host label"),
            FieldSpec::int("host_type").describe("Host type index"),
            FieldSpec::str("group").describe("Cluster reference of the host group"),
            FieldSpec::list("ports", FieldType::Dict)
                .unordered()
                .describe("Host port definitions"),
        ]),
    }
}

/// E-Series LDAP domains.
pub fn santricity_ldap_domain() -> ResourceType {
    ResourceType {
        name: "santricity_ldap".to_string(),
        module_name: "na_santricity_ldap".to_string(),
        description: "Manage E-Series LDAP domain configuration".to_string(),
        collection_path: "/devmgr/v2/storage-systems/{ssid}/ldap".to_string(),
        create_path: "/devmgr/v2/storage-systems/{ssid}/ldap".to_string(),
        item_path: "/devmgr/v2/storage-systems/{ssid}/ldap/{id}".to_string(),
        identity: vec!["ssid".to_string(), "id".to_string()],
        path_fields: vec!["ssid".to_string()],
        immutable: Vec::new(),
        deferred: Vec::new(),
        lookup: LookupStyle::List,
        lookup_params: Vec::new(),
        records_key: Some("ldapDomains".to_string()),
        update_mode: UpdateMode::Put,
        update_verb: HttpVerb::Post,
        naming: KeyMapper::new(NamingConvention::Camel)
            .rename("server_url", "ldapUrl")
            .rename("bind_user", "bindLookupUser.user")
            .rename("bind_password", "bindLookupUser.password")
            .rename("search_base", "searchBase"),
        unmount: None,
        offline: None,
        job: None,
        schema: ResourceSchema::new(vec![
            FieldSpec::str("ssid").required(),
            FieldSpec::str("id").required().describe("Domain identifier"),
            FieldSpec::str("server_url").describe("ldap:// or ldaps:// URL of the server"),
            FieldSpec::str("bind_user"),
            FieldSpec::str("bind_password").no_log(),
            FieldSpec::str("search_base"),
            FieldSpec::str("user_attribute").default_value(json!("sAMAccountName")),
            FieldSpec::list("names", FieldType::Str).unordered(),
        ]),
    }
}

/// FlashBlade NFS export policies.
pub fn nfs_export_policy() -> ResourceType {
    ResourceType {
        name: "nfs_export_policy".to_string(),
        module_name: "purefb_policy".to_string(),
        description: "Manage FlashBlade NFS export policies".to_string(),
        collection_path: "/api/2.12/nfs-export-policies".to_string(),
        create_path: "/api/2.12/nfs-export-policies?names={name}".to_string(),
        item_path: "/api/2.12/nfs-export-policies?names={name}".to_string(),
        identity: vec!["name".to_string()],
        path_fields: vec!["name".to_string()],
        immutable: Vec::new(),
        deferred: Vec::new(),
        lookup: LookupStyle::Query,
        lookup_params: vec![("names".to_string(), "{name}".to_string())],
        records_key: Some("items".to_string()),
        update_mode: UpdateMode::Patch,
        update_verb: HttpVerb::Patch,
        naming: KeyMapper::new(NamingConvention::Snake),
        unmount: None,
        offline: None,
        job: None,
        schema: ResourceSchema::new(vec![
            FieldSpec::str("name").required(),
            FieldSpec::bool("enabled").default_value(json!(true)),
            FieldSpec::list("rules", FieldType::Dict),
        ]),
    }
}
