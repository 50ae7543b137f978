//! Resource types known to the mock server.

/// A mock API resource definition.
#[derive(Debug, Clone)]
pub struct MockApiResource {
	/// `group/version`, or `version` alone for the core group.
	pub api_version: String,
	/// Plural resource name used in API paths.
	pub plural: String,
	pub kind: String,
	pub namespaced: bool,
}

impl MockApiResource {
	pub fn namespaced(api_version: &str, plural: &str, kind: &str) -> Self {
		Self {
			api_version: api_version.to_string(),
			plural: plural.to_string(),
			kind: kind.to_string(),
			namespaced: true,
		}
	}

	pub fn cluster_scoped(api_version: &str, plural: &str, kind: &str) -> Self {
		Self {
			api_version: api_version.to_string(),
			plural: plural.to_string(),
			kind: kind.to_string(),
			namespaced: false,
		}
	}

	/// Path listing every instance across all namespaces.
	pub fn list_path(&self) -> String {
		if self.api_version.contains('/') {
			format!("/apis/{}/{}", self.api_version, self.plural)
		} else {
			format!("/api/{}/{}", self.api_version, self.plural)
		}
	}
}

/// Resource types served by the mock server.
pub struct MockCatalog {
	pub resources: Vec<MockApiResource>,
}

impl Default for MockCatalog {
	fn default() -> Self {
		Self {
			resources: vec![
				MockApiResource::namespaced("v1", "configmaps", "ConfigMap"),
				MockApiResource::cluster_scoped("v1", "namespaces", "Namespace"),
				MockApiResource::namespaced("apps/v1", "daemonsets", "DaemonSet"),
				MockApiResource::namespaced("apps/v1", "deployments", "Deployment"),
				MockApiResource::namespaced("apps/v1", "replicasets", "ReplicaSet"),
				MockApiResource::namespaced("apps/v1", "statefulsets", "StatefulSet"),
				MockApiResource::namespaced(
					"networking.k8s.io/v1",
					"networkpolicies",
					"NetworkPolicy",
				),
				MockApiResource::cluster_scoped(
					"policy/v1beta1",
					"podsecuritypolicies",
					"PodSecurityPolicy",
				),
				MockApiResource::namespaced("extensions/v1beta1", "ingresses", "Ingress"),
			],
		}
	}
}

impl MockCatalog {
	/// Find the resource type of a manifest by its apiVersion and kind.
	pub fn lookup(&self, api_version: &str, kind: &str) -> Option<&MockApiResource> {
		self.resources
			.iter()
			.find(|r| r.api_version == api_version && r.kind == kind)
	}

	/// Find a resource type by apiVersion and plural name.
	pub fn lookup_plural(&self, api_version: &str, plural: &str) -> Option<&MockApiResource> {
		self.resources
			.iter()
			.find(|r| r.api_version == api_version && r.plural == plural)
	}
}
