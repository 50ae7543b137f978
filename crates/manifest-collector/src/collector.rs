//! The collection routine.

use std::{fmt, path::PathBuf};

use bon::Builder;
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::{
	client::{
		BoxError, ClientInitError, ClientOptions, ClusterResourceClient, KubeResourceClient,
	},
	coordinate::{ResourceCoordinate, RESOURCE_COORDINATES},
	manifest::{decode_manifest, last_applied, DecodedManifest},
};

/// Errors that abort a [`ManifestCollector::collect`] call.
#[derive(Debug, Error)]
pub enum CollectError {
	#[error("listing {coordinate}")]
	ResourceList {
		coordinate: ResourceCoordinate,
		#[source]
		source: BoxError,
	},

	#[error("decoding last-applied-configuration annotation of {namespace}/{name}")]
	ManifestDecode {
		namespace: String,
		name: String,
		#[source]
		source: serde_json::Error,
	},
}

/// How to obtain the cluster client.
///
/// A supplied `client` takes precedence, and `kubeconfig` is then never read.
#[derive(Builder, Default)]
pub struct CollectorOptions {
	#[builder(into)]
	kubeconfig: Option<PathBuf>,
	client: Option<Box<dyn ClusterResourceClient>>,
	#[builder(default)]
	client_options: ClientOptions,
}

/// Collects last-applied manifests of workload and policy resources.
pub struct ManifestCollector {
	client: Box<dyn ClusterResourceClient>,
}

impl fmt::Debug for ManifestCollector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ManifestCollector")
			.field("name", &self.name())
			.finish_non_exhaustive()
	}
}

impl ManifestCollector {
	const NAME: &'static str = "Cluster";

	/// Build a collector from options, loading the kubeconfig if no client is supplied.
	#[instrument(skip_all)]
	pub async fn new(options: CollectorOptions) -> Result<Self, ClientInitError> {
		if let Some(client) = options.client {
			debug!("using supplied cluster client");
			return Ok(Self { client });
		}

		let path = options
			.kubeconfig
			.filter(|path| !path.as_os_str().is_empty())
			.ok_or(ClientInitError::NoClientSource)?;

		let client = KubeResourceClient::from_kubeconfig(&path, &options.client_options).await?;
		Ok(Self::with_client(client))
	}

	/// Build a collector around a ready-made client.
	pub fn with_client(client: impl ClusterResourceClient + 'static) -> Self {
		Self {
			client: Box::new(client),
		}
	}

	/// Name identifying this collector.
	pub fn name(&self) -> &'static str {
		Self::NAME
	}

	/// List every resource type and decode the last-applied manifest of each instance.
	///
	/// Manifests are returned in coordinate order, then in the order the cluster
	/// listed the instances. Instances without the annotation are skipped. Any
	/// failed list call or malformed annotation aborts the whole collection.
	#[instrument(skip_all, fields(collector = self.name()))]
	pub async fn collect(&self) -> Result<Vec<DecodedManifest>, CollectError> {
		let mut manifests = Vec::new();

		for coordinate in RESOURCE_COORDINATES {
			let instances = self
				.client
				.list(coordinate)
				.await
				.map_err(|source| CollectError::ResourceList {
					coordinate: *coordinate,
					source,
				})?;

			let collected_before = manifests.len();
			for instance in &instances {
				let Some(raw) = last_applied(instance) else {
					trace!(
						namespace = %instance.namespace,
						name = %instance.name,
						"no last-applied-configuration annotation"
					);
					continue;
				};

				let manifest =
					decode_manifest(raw).map_err(|source| CollectError::ManifestDecode {
						namespace: instance.namespace.clone(),
						name: instance.name.clone(),
						source,
					})?;
				manifests.push(manifest);
			}

			debug!(
				coordinate = %coordinate,
				instances = instances.len(),
				manifests = manifests.len() - collected_before,
				"listed resources"
			);
		}

		Ok(manifests)
	}
}
