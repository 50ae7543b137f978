//! Cluster access used by the collector.
//!
//! [`ClusterResourceClient`] is the seam between the collector and the cluster:
//! production code uses [`KubeResourceClient`], tests substitute in-memory fakes.

use std::{
	collections::BTreeMap,
	fmt,
	path::{Path, PathBuf},
	time::Duration,
};

use async_trait::async_trait;
use kube::{
	api::{Api, DynamicObject, ListParams},
	config::{KubeConfigOptions, Kubeconfig, KubeconfigError},
	Client, Config,
};
use thiserror::Error;
use tracing::instrument;

use crate::coordinate::ResourceCoordinate;

/// Boxed error returned by list calls, so test doubles are not tied to kube's error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building a cluster client.
#[derive(Debug, Error)]
pub enum ClientInitError {
	#[error("no cluster client supplied and no kubeconfig path given")]
	NoClientSource,

	#[error("reading kubeconfig {}", path.display())]
	ReadKubeconfig {
		path: PathBuf,
		#[source]
		source: KubeconfigError,
	},

	#[error("resolving cluster config from kubeconfig {}", path.display())]
	ResolveConfig {
		path: PathBuf,
		#[source]
		source: KubeconfigError,
	},

	#[error("constructing cluster client")]
	BuildClient(#[source] kube::Error),
}

/// A live object as seen by the collector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInstance {
	/// Empty for cluster-scoped objects.
	pub namespace: String,
	pub name: String,
	pub annotations: BTreeMap<String, String>,
}

impl From<DynamicObject> for ResourceInstance {
	fn from(obj: DynamicObject) -> Self {
		let metadata = obj.metadata;
		Self {
			namespace: metadata.namespace.unwrap_or_default(),
			name: metadata.name.unwrap_or_default(),
			annotations: metadata.annotations.unwrap_or_default(),
		}
	}
}

/// Ability to list every instance of a resource type across the cluster.
#[async_trait]
pub trait ClusterResourceClient: Send + Sync {
	/// Issue a single unfiltered list request for `coordinate`.
	async fn list(
		&self,
		coordinate: &ResourceCoordinate,
	) -> Result<Vec<ResourceInstance>, BoxError>;
}

#[async_trait]
impl<T: ClusterResourceClient + ?Sized> ClusterResourceClient for Box<T> {
	async fn list(
		&self,
		coordinate: &ResourceCoordinate,
	) -> Result<Vec<ResourceInstance>, BoxError> {
		(**self).list(coordinate).await
	}
}

/// Settings applied when building a client from a kubeconfig.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
	/// Context to use instead of the kubeconfig's current-context.
	pub context: Option<String>,
	/// Read timeout for API requests. Left to kube's default when unset.
	pub read_timeout: Option<Duration>,
}

/// [`ClusterResourceClient`] backed by a kube client.
#[derive(Clone)]
pub struct KubeResourceClient {
	client: Client,
}

impl fmt::Debug for KubeResourceClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KubeResourceClient")
			.field("default_namespace", &self.client.default_namespace())
			.finish_non_exhaustive()
	}
}

impl KubeResourceClient {
	/// Wrap an already configured kube client.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}

	/// Build a client from the kubeconfig file at `path`.
	#[instrument(skip_all, fields(path = %path.display()))]
	pub async fn from_kubeconfig(
		path: &Path,
		options: &ClientOptions,
	) -> Result<Self, ClientInitError> {
		let kubeconfig =
			Kubeconfig::read_from(path).map_err(|source| ClientInitError::ReadKubeconfig {
				path: path.to_owned(),
				source,
			})?;
		Self::from_parsed_kubeconfig(path, kubeconfig, options).await
	}

	async fn from_parsed_kubeconfig(
		path: &Path,
		kubeconfig: Kubeconfig,
		options: &ClientOptions,
	) -> Result<Self, ClientInitError> {
		let mut config = Config::from_custom_kubeconfig(
			kubeconfig,
			&KubeConfigOptions {
				context: options.context.clone(),
				..Default::default()
			},
		)
		.await
		.map_err(|source| ClientInitError::ResolveConfig {
			path: path.to_owned(),
			source,
		})?;

		tracing::debug!(cluster_url = %config.cluster_url, "resolved cluster config");

		if let Some(timeout) = options.read_timeout {
			config.read_timeout = Some(timeout);
		}
		let client = Client::try_from(config).map_err(ClientInitError::BuildClient)?;

		Ok(Self { client })
	}

	/// Get a reference to the underlying kube client.
	pub fn client(&self) -> &Client {
		&self.client
	}
}

#[async_trait]
impl ClusterResourceClient for KubeResourceClient {
	#[instrument(skip_all, fields(coordinate = %coordinate))]
	async fn list(
		&self,
		coordinate: &ResourceCoordinate,
	) -> Result<Vec<ResourceInstance>, BoxError> {
		let api: Api<DynamicObject> =
			Api::all_with(self.client.clone(), &coordinate.api_resource());
		let list = api.list(&ListParams::default()).await?;
		Ok(list.items.into_iter().map(ResourceInstance::from).collect())
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

	use super::*;

	#[test]
	fn test_instance_from_dynamic_object() {
		let mut obj = DynamicObject::new("web", &crate::RESOURCE_COORDINATES[1].api_resource())
			.within("prod");
		obj.metadata.annotations = Some(BTreeMap::from([(
			"team".to_string(),
			"payments".to_string(),
		)]));

		let instance = ResourceInstance::from(obj);
		assert_eq!(instance.namespace, "prod");
		assert_eq!(instance.name, "web");
		assert_eq!(instance.annotations["team"], "payments");
	}

	#[test]
	fn test_instance_from_cluster_scoped_object() {
		let obj = DynamicObject {
			types: None,
			metadata: ObjectMeta {
				name: Some("restricted".to_string()),
				..ObjectMeta::default()
			},
			data: serde_json::Value::Null,
		};

		let instance = ResourceInstance::from(obj);
		assert_eq!(instance.namespace, "");
		assert_eq!(instance.name, "restricted");
		assert!(instance.annotations.is_empty());
	}

	#[tokio::test]
	async fn test_from_kubeconfig_missing_file() {
		let path = Path::new("/nonexistent/kubeconfig");
		let result = KubeResourceClient::from_kubeconfig(path, &ClientOptions::default()).await;
		assert_matches!(
			result,
			Err(ClientInitError::ReadKubeconfig { path: p, .. }) if p == path
		);
	}

	#[tokio::test]
	async fn test_from_parsed_kubeconfig_without_contexts() {
		let result = KubeResourceClient::from_parsed_kubeconfig(
			Path::new("empty"),
			Kubeconfig::default(),
			&ClientOptions::default(),
		)
		.await;
		assert_matches!(result, Err(ClientInitError::ResolveConfig { .. }));
	}
}
