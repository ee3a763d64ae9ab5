//! API discovery filtered by `SyncTarget.spec.supportedResourceTypes` (§4.8,
//! §6 "Discovery output").

use serde::{Deserialize, Serialize};
use syncer_core::sync_target::SyncTargetSpec;

/// Resources that put the core group on the discovery list when at least one
/// of them is supported (§6 "the core group is included iff at least one of
/// pods, services, configmaps is supported").
const CORE_TRIGGER_RESOURCES: &[(&str, &str)] = &[("pods", "Pod"), ("services", "Service"), ("configmaps", "ConfigMap")];

/// The workload group is always published regardless of what's supported
/// (§6 "An APIGroupList always includes the workload group").
const WORKLOAD_GROUP: &str = "workload.kcp.io";
const WORKLOAD_VERSION: &str = "v1alpha1";
const WORKLOAD_RESOURCES: &[(&str, &str)] = &[("deployments", "Deployment"), ("statefulsets", "StatefulSet")];

const SYNC_TARGET_VERBS: &[&str] = &["get", "list", "watch"];
const POD_LIKE_VERBS: &[&str] = &["get", "list", "watch", "create", "update", "patch", "delete"];

/// One API group entry (a simplified `metav1.APIGroup`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiGroup {
    pub name: String,
    pub versions: Vec<String>,
    pub preferred_version: String,
}

/// `metav1.APIGroupList` equivalent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiGroupList {
    pub groups: Vec<ApiGroup>,
}

/// One resource entry (a simplified `metav1.APIResource`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResource {
    pub name: String,
    pub kind: String,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

/// `metav1.APIResourceList` equivalent, scoped to one group/version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResourceList {
    pub group_version: String,
    pub resources: Vec<ApiResource>,
}

fn core_group_supported(spec: &SyncTargetSpec) -> bool {
    spec.supported_resource_types.is_empty()
        || CORE_TRIGGER_RESOURCES.iter().any(|(plural, _)| spec.supports(plural, plural))
}

/// Discovery groups this SyncTarget's syncer is allowed to see.
pub fn discover_groups(spec: &SyncTargetSpec) -> ApiGroupList {
    let mut groups = Vec::new();
    if core_group_supported(spec) {
        groups.push(ApiGroup {
            name: String::new(),
            versions: vec!["v1".to_string()],
            preferred_version: "v1".to_string(),
        });
    }
    groups.push(ApiGroup {
        name: WORKLOAD_GROUP.to_string(),
        versions: vec![WORKLOAD_VERSION.to_string()],
        preferred_version: WORKLOAD_VERSION.to_string(),
    });
    ApiGroupList { groups }
}

/// Resource list for the core group (`""`), filtered by `supportedResourceTypes`.
pub fn discover_core_resources(spec: &SyncTargetSpec) -> ApiResourceList {
    let resources = CORE_TRIGGER_RESOURCES
        .iter()
        .filter(|(plural, _)| spec.supported_resource_types.is_empty() || spec.supports(plural, plural))
        .map(|(plural, kind)| ApiResource {
            name: plural.to_string(),
            kind: kind.to_string(),
            namespaced: true,
            verbs: POD_LIKE_VERBS.iter().map(|v| v.to_string()).collect(),
        })
        .collect();
    ApiResourceList {
        group_version: "v1".to_string(),
        resources,
    }
}

/// Resource list for the workload group: always includes `SyncTargets`
/// (read-only, the REST surface §4.8 exposes), plus any supported
/// workload-controller resources.
pub fn discover_workload_resources(spec: &SyncTargetSpec) -> ApiResourceList {
    let mut resources = vec![ApiResource {
        name: "synctargets".to_string(),
        kind: "SyncTarget".to_string(),
        namespaced: false,
        verbs: SYNC_TARGET_VERBS.iter().map(|v| v.to_string()).collect(),
    }];
    resources.extend(
        WORKLOAD_RESOURCES
            .iter()
            .filter(|(plural, _)| spec.supported_resource_types.is_empty() || spec.supports(plural, plural))
            .map(|(plural, kind)| ApiResource {
                name: plural.to_string(),
                kind: kind.to_string(),
                namespaced: true,
                verbs: POD_LIKE_VERBS.iter().map(|v| v.to_string()).collect(),
            }),
    );
    ApiResourceList {
        group_version: format!("{WORKLOAD_GROUP}/{WORKLOAD_VERSION}"),
        resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(supported: Vec<&str>) -> SyncTargetSpec {
        SyncTargetSpec {
            location: "dc1".to_string(),
            supported_resource_types: supported.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn core_group_present_when_pods_supported() {
        let groups = discover_groups(&spec(vec!["pods"]));
        assert!(groups.groups.iter().any(|g| g.name.is_empty()));
    }

    #[test]
    fn core_group_absent_when_only_deployments_supported() {
        let groups = discover_groups(&spec(vec!["deployments"]));
        assert!(!groups.groups.iter().any(|g| g.name.is_empty()));
    }

    #[test]
    fn workload_group_always_present() {
        let groups = discover_groups(&spec(vec!["deployments"]));
        assert!(groups.groups.iter().any(|g| g.name == WORKLOAD_GROUP));
    }

    #[test]
    fn core_resources_filtered_to_supported() {
        let resources = discover_core_resources(&spec(vec!["pods"]));
        assert_eq!(resources.resources.len(), 1);
        assert_eq!(resources.resources[0].name, "pods");
    }

    #[test]
    fn synctargets_always_listed_with_readonly_verbs() {
        let resources = discover_workload_resources(&spec(vec![]));
        let sync_targets = resources.resources.iter().find(|r| r.name == "synctargets").unwrap();
        assert_eq!(sync_targets.verbs, vec!["get", "list", "watch"]);
    }
}
