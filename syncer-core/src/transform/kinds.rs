//! Per-kind sanitation tables (§4.2 step 6, §9 "Transformer as data, not code").
//!
//! Resources outside the closed set fall into [`Kind::Generic`], which runs
//! only the envelope logic in [`super::ResourceTransformer`] — no
//! kind-specific field stripping.

use serde_json::Value;

/// The closed set of kinds with dedicated sanitation rules, plus a
/// catch-all for everything else (§9 "Per-kind dispatch").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `v1/Pod`.
    Pod,
    /// `v1/Node`.
    Node,
    /// `v1/Service`.
    Service,
    /// `v1/PersistentVolume`.
    PersistentVolume,
    /// `apps/v1/Deployment`.
    Deployment,
    /// `apps/v1/StatefulSet`.
    StatefulSet,
    /// `apps/v1/DaemonSet`.
    DaemonSet,
    /// `v1/ConfigMap`.
    ConfigMap,
    /// `v1/Secret`.
    Secret,
    /// Anything else.
    Generic,
}

impl Kind {
    /// Classify by the resource's `kind` string (case-sensitive, matching
    /// the Kubernetes convention of PascalCase kind names).
    pub fn classify(kind: &str) -> Kind {
        match kind {
            "Pod" => Kind::Pod,
            "Node" => Kind::Node,
            "Service" => Kind::Service,
            "PersistentVolume" => Kind::PersistentVolume,
            "Deployment" => Kind::Deployment,
            "StatefulSet" => Kind::StatefulSet,
            "DaemonSet" => Kind::DaemonSet,
            "ConfigMap" => Kind::ConfigMap,
            "Secret" => Kind::Secret,
            _ => Kind::Generic,
        }
    }

    /// Is this one of the workload-controller kinds ConflictResolver treats
    /// specially (§4.4 ThreeWayMerge: "for workload controllers, replace
    /// `spec` with logical `spec`")?
    pub fn is_workload_controller(self) -> bool {
        matches!(self, Kind::Deployment | Kind::StatefulSet | Kind::DaemonSet)
    }
}

/// JSON-pointer-style path, split into segments, for field removal within
/// `spec`/`status`.
type Path = &'static [&'static str];

/// `spec` paths removed from physical Pods before they reach the workspace.
const POD_SPEC_STRIP: &[Path] = &[&["nodeName"], &["serviceAccountName"]];
/// `status` paths removed from physical Pods.
const POD_STATUS_STRIP: &[Path] = &[&["hostIP"], &["podIP"], &["podIPs"], &["nominatedNodeName"]];

/// `status` paths removed from physical Nodes.
const NODE_STATUS_STRIP: &[Path] = &[
    &["nodeInfo", "machineID"],
    &["nodeInfo", "systemUUID"],
    &["nodeInfo", "bootID"],
];

/// `spec` paths removed from physical Services.
const SERVICE_SPEC_STRIP: &[Path] = &[&["clusterIP"], &["clusterIPs"]];
/// `status` paths removed from physical Services.
const SERVICE_STATUS_STRIP: &[Path] = &[&["loadBalancer"]];

/// `spec` paths removed from physical PersistentVolumes.
const PV_SPEC_STRIP: &[Path] = &[&["local"], &["hostPath"], &["nodeAffinity"]];

/// Remove `spec`/`status` fields per §4.2 step 6, for the given kind.
/// No-op for [`Kind::Generic`] and kinds without dedicated rules.
pub fn sanitize_physical(kind: Kind, spec: &mut Value, status: &mut Value) {
    match kind {
        Kind::Pod => {
            strip_paths(spec, POD_SPEC_STRIP);
            strip_paths(status, POD_STATUS_STRIP);
        }
        Kind::Node => strip_paths(status, NODE_STATUS_STRIP),
        Kind::Service => {
            strip_paths(spec, SERVICE_SPEC_STRIP);
            strip_paths(status, SERVICE_STATUS_STRIP);
        }
        Kind::PersistentVolume => strip_paths(spec, PV_SPEC_STRIP),
        Kind::Deployment | Kind::StatefulSet | Kind::DaemonSet | Kind::ConfigMap | Kind::Secret | Kind::Generic => {}
    }
}

fn strip_paths(value: &mut Value, paths: &[Path]) {
    for path in paths {
        remove_path(value, path);
    }
}

fn remove_path(value: &mut Value, path: &[&str]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let Value::Object(map) = value else {
        return;
    };
    if rest.is_empty() {
        map.remove(*head);
    } else if let Some(child) = map.get_mut(*head) {
        remove_path(child, rest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_known_kinds() {
        assert_eq!(Kind::classify("Pod"), Kind::Pod);
        assert_eq!(Kind::classify("ConfigMap"), Kind::ConfigMap);
        assert_eq!(Kind::classify("Secret"), Kind::Secret);
        assert_eq!(Kind::classify("WidgetCustomResource"), Kind::Generic);
    }

    #[test]
    fn pod_sanitation_strips_node_fields() {
        let mut spec = json!({"nodeName": "node-1", "serviceAccountName": "sa", "containers": []});
        let mut status = json!({"hostIP": "10.0.0.1", "podIP": "10.0.0.2", "phase": "Running"});
        sanitize_physical(Kind::Pod, &mut spec, &mut status);
        assert_eq!(spec.get("nodeName"), None);
        assert_eq!(spec.get("serviceAccountName"), None);
        assert!(spec.get("containers").is_some());
        assert_eq!(status.get("hostIP"), None);
        assert_eq!(status.get("podIP"), None);
        assert_eq!(status.get("phase").unwrap(), "Running");
    }

    #[test]
    fn node_sanitation_strips_nested_node_info() {
        let mut status = json!({"nodeInfo": {"machineID": "m", "systemUUID": "s", "bootID": "b", "osImage": "linux"}});
        let mut spec = Value::Null;
        sanitize_physical(Kind::Node, &mut spec, &mut status);
        let info = status.get("nodeInfo").unwrap();
        assert_eq!(info.get("machineID"), None);
        assert_eq!(info.get("osImage").unwrap(), "linux");
    }

    #[test]
    fn generic_kind_is_untouched() {
        let mut spec = json!({"foo": "bar"});
        let mut status = json!({"baz": "qux"});
        let spec_before = spec.clone();
        let status_before = status.clone();
        sanitize_physical(Kind::Generic, &mut spec, &mut status);
        assert_eq!(spec, spec_before);
        assert_eq!(status, status_before);
    }
}
