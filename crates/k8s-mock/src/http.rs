//! HTTP-based mock Kubernetes server using wiremock.
//!
//! This provides a real HTTP server that can be used with actual kubeconfig-based
//! connections. Only list endpoints are served: every resource type in the
//! catalog answers cluster-wide list requests with the manifests registered for it.

use std::{
	fs, io,
	path::Path,
	sync::{Arc, RwLock},
};

use bon::Builder;
use kube::config::{
	AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
};
use tracing::{debug, trace};
use wiremock::{
	matchers::{method, path, path_regex},
	Mock, MockServer, Request, ResponseTemplate,
};

use super::catalog::MockCatalog;

const DEFAULT_CONTEXT: &str = "mock-context";
const MOCK_CLUSTER: &str = "mock-cluster";
const MOCK_USER: &str = "mock-user";

/// A registered manifest together with the list path it is served under.
#[derive(Debug, Clone)]
struct StoredResource {
	list_path: String,
	namespace: Option<String>,
	name: String,
	manifest: serde_json::Value,
}

/// Type alias for the shared mutable resources list, kept in registration order.
type SharedResources = Arc<RwLock<Vec<StoredResource>>>;

/// A list endpoint that answers with an error status instead of items.
#[derive(Debug, Clone)]
pub struct FailingList {
	pub api_version: String,
	pub plural: String,
	pub status: u16,
}

impl FailingList {
	pub fn new(api_version: &str, plural: &str, status: u16) -> Self {
		Self {
			api_version: api_version.to_string(),
			plural: plural.to_string(),
			status,
		}
	}
}

/// A mock Kubernetes server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockK8sServer {
	#[builder(default)]
	catalog: MockCatalog,
	/// Resources to serve as raw manifests. The server derives list paths from
	/// apiVersion/kind using the catalog; manifests of unknown types are ignored.
	#[builder(default)]
	resources: Vec<serde_json::Value>,
	#[builder(default)]
	failing_lists: Vec<FailingList>,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockK8sServer {
	server: MockServer,
	catalog: Arc<MockCatalog>,
	resources: SharedResources,
}

impl HttpMockK8sServer {
	/// Start the mock server with all configured resources.
	pub async fn start(self) -> RunningHttpMockK8sServer {
		let server = MockServer::start().await;
		debug!(uri = %server.uri(), "Started mock K8s server");

		let catalog = Arc::new(self.catalog);
		let resources: SharedResources = Arc::new(RwLock::new(Vec::new()));

		let running = RunningHttpMockK8sServer {
			server,
			catalog,
			resources,
		};
		for manifest in self.resources {
			running.insert(manifest);
		}

		mount_failures(&running.server, &running.catalog, &self.failing_lists).await;
		mount_lists(&running.server, &running.catalog, &running.resources).await;
		mount_not_found(&running.server).await;

		running
	}
}

impl RunningHttpMockK8sServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// Register a manifest, replacing any existing object with the same type,
	/// namespace and name. Returns false if the catalog doesn't know its type.
	pub fn insert(&self, manifest: serde_json::Value) -> bool {
		let Some(stored) = stored_resource(manifest, &self.catalog) else {
			return false;
		};
		trace!(list_path = %stored.list_path, name = %stored.name, "Registered resource");

		let mut resources = self.resources.write().unwrap();
		let existing = resources.iter_mut().find(|r| {
			r.list_path == stored.list_path
				&& r.namespace == stored.namespace
				&& r.name == stored.name
		});
		match existing {
			Some(existing) => *existing = stored,
			None => resources.push(stored),
		}
		true
	}

	/// Kubeconfig for this server whose only context is `mock-context`.
	pub fn kubeconfig(&self) -> Kubeconfig {
		self.kubeconfig_with_context(DEFAULT_CONTEXT)
	}

	/// Kubeconfig for this server with a single context named `context`, which is
	/// also the current-context.
	pub fn kubeconfig_with_context(&self, context: &str) -> Kubeconfig {
		Kubeconfig {
			clusters: vec![NamedCluster {
				name: MOCK_CLUSTER.to_string(),
				cluster: Some(Cluster {
					server: Some(self.uri()),
					insecure_skip_tls_verify: Some(true),
					..Default::default()
				}),
			}],
			contexts: vec![NamedContext {
				name: context.to_string(),
				context: Some(Context {
					cluster: MOCK_CLUSTER.to_string(),
					user: Some(MOCK_USER.to_string()),
					namespace: Some("default".to_string()),
					..Default::default()
				}),
			}],
			auth_infos: vec![NamedAuthInfo {
				name: MOCK_USER.to_string(),
				auth_info: Some(AuthInfo::default()),
			}],
			current_context: Some(context.to_string()),
			..Default::default()
		}
	}

	/// Write [`Self::kubeconfig`] to `path` as YAML.
	pub fn write_kubeconfig(&self, path: &Path) -> io::Result<()> {
		write_yaml(path, &self.kubeconfig())
	}

	/// Write [`Self::kubeconfig_with_context`] to `path` as YAML.
	pub fn write_kubeconfig_with_context(&self, path: &Path, context: &str) -> io::Result<()> {
		write_yaml(path, &self.kubeconfig_with_context(context))
	}
}

fn write_yaml(path: &Path, kubeconfig: &Kubeconfig) -> io::Result<()> {
	let yaml = serde_yaml::to_string(kubeconfig).map_err(io::Error::other)?;
	fs::write(path, yaml)
}

/// Derive where a manifest is listed using the catalog.
fn stored_resource(manifest: serde_json::Value, catalog: &MockCatalog) -> Option<StoredResource> {
	let api_version = manifest.get("apiVersion")?.as_str()?;
	let kind = manifest.get("kind")?.as_str()?;
	let resource = catalog.lookup(api_version, kind)?;

	let metadata = manifest.get("metadata")?;
	let name = metadata.get("name")?.as_str()?.to_string();
	let namespace = if resource.namespaced {
		let ns = metadata
			.get("namespace")
			.and_then(|n| n.as_str())
			.unwrap_or("default");
		Some(ns.to_string())
	} else {
		None
	};

	Some(StoredResource {
		list_path: resource.list_path(),
		namespace,
		name,
		manifest: with_namespace(manifest, resource.namespaced),
	})
}

/// Fill in `metadata.namespace` the way the API server does for namespaced objects.
fn with_namespace(mut manifest: serde_json::Value, namespaced: bool) -> serde_json::Value {
	if namespaced {
		if let Some(metadata) = manifest
			.get_mut("metadata")
			.and_then(|m| m.as_object_mut())
		{
			metadata
				.entry("namespace")
				.or_insert_with(|| serde_json::Value::String("default".to_string()));
		}
	}
	manifest
}

fn status_body(code: u16, reason: &str, message: &str) -> serde_json::Value {
	serde_json::json!({
		"kind": "Status",
		"apiVersion": "v1",
		"metadata": {},
		"status": "Failure",
		"message": message,
		"reason": reason,
		"code": code
	})
}

fn status_reason(code: u16) -> &'static str {
	match code {
		401 => "Unauthorized",
		403 => "Forbidden",
		404 => "NotFound",
		503 => "ServiceUnavailable",
		_ => "InternalError",
	}
}

/// Mount failing list endpoints ahead of the regular ones.
async fn mount_failures(
	server: &MockServer,
	catalog: &MockCatalog,
	failing_lists: &[FailingList],
) {
	for failing in failing_lists {
		let Some(resource) = catalog.lookup_plural(&failing.api_version, &failing.plural) else {
			debug!(
				api_version = %failing.api_version,
				plural = %failing.plural,
				"Ignoring failing list for a type outside the catalog"
			);
			continue;
		};
		let list_path = resource.list_path();
		let message = format!(
			"{} is not allowed to be listed at the cluster scope",
			failing.plural
		);

		Mock::given(method("GET"))
			.and(path(list_path.as_str()))
			.respond_with(
				ResponseTemplate::new(failing.status).set_body_json(status_body(
					failing.status,
					status_reason(failing.status),
					&message,
				)),
			)
			.with_priority(1)
			.mount(server)
			.await;
	}
}

async fn mount_lists(server: &MockServer, catalog: &MockCatalog, resources: &SharedResources) {
	for resource in &catalog.resources {
		let list_path = resource.list_path();
		let list_resources = Arc::clone(resources);
		let served_path = list_path.clone();

		Mock::given(method("GET"))
			.and(path(list_path.as_str()))
			.respond_with(move |_: &Request| {
				let resources = list_resources.read().unwrap();
				let items: Vec<_> = resources
					.iter()
					.filter(|r| r.list_path == served_path)
					.map(|r| r.manifest.clone())
					.collect();

				ResponseTemplate::new(200).set_body_json(serde_json::json!({
					"kind": "List",
					"apiVersion": "v1",
					"metadata": {"resourceVersion": "1"},
					"items": items
				}))
			})
			.mount(server)
			.await;
	}
}

/// Anything not in the catalog is unknown to this API server.
async fn mount_not_found(server: &MockServer) {
	Mock::given(method("GET"))
		.and(path_regex(r"^/api(s)?/.*"))
		.respond_with(move |req: &Request| {
			ResponseTemplate::new(404).set_body_json(status_body(
				404,
				"NotFound",
				&format!("the server could not find the requested resource ({})", req.url.path()),
			))
		})
		.with_priority(10)
		.mount(server)
		.await;
}
