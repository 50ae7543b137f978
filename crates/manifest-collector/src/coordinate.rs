//! Resource type coordinates queried by the collector.

use std::fmt;

use kube::{core::GroupVersionKind, discovery::ApiResource};

/// A (group, version, resource) triple identifying a listable resource type.
///
/// `kind` is not needed to address the list endpoint, but the dynamic API
/// uses it to type the returned objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceCoordinate {
	pub group: &'static str,
	pub version: &'static str,
	/// Plural resource name, as it appears in API paths.
	pub resource: &'static str,
	pub kind: &'static str,
}

impl ResourceCoordinate {
	pub const fn new(
		group: &'static str,
		version: &'static str,
		resource: &'static str,
		kind: &'static str,
	) -> Self {
		Self {
			group,
			version,
			resource,
			kind,
		}
	}

	/// The `apiVersion` string for this coordinate (`version` alone for the core group).
	pub fn api_version(&self) -> String {
		if self.group.is_empty() {
			self.version.to_string()
		} else {
			format!("{}/{}", self.group, self.version)
		}
	}

	/// Build the kube `ApiResource` used for dynamic list calls.
	pub fn api_resource(&self) -> ApiResource {
		let gvk = GroupVersionKind::gvk(self.group, self.version, self.kind);
		ApiResource::from_gvk_with_plural(&gvk, self.resource)
	}
}

impl fmt::Display for ResourceCoordinate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.api_version(), self.resource)
	}
}

/// Resource types scanned by [`crate::ManifestCollector::collect`], in query order.
pub const RESOURCE_COORDINATES: &[ResourceCoordinate; 7] = &[
	ResourceCoordinate::new("apps", "v1", "daemonsets", "DaemonSet"),
	ResourceCoordinate::new("apps", "v1", "deployments", "Deployment"),
	ResourceCoordinate::new("apps", "v1", "replicasets", "ReplicaSet"),
	ResourceCoordinate::new("apps", "v1", "statefulsets", "StatefulSet"),
	ResourceCoordinate::new("networking.k8s.io", "v1", "networkpolicies", "NetworkPolicy"),
	ResourceCoordinate::new("policy", "v1beta1", "podsecuritypolicies", "PodSecurityPolicy"),
	ResourceCoordinate::new("extensions", "v1beta1", "ingresses", "Ingress"),
];
