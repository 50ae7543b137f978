//! Collection of "as-submitted" manifests from a running Kubernetes cluster.
//!
//! [`ManifestCollector`] lists daemonsets, deployments, replicasets, statefulsets,
//! networkpolicies, podsecuritypolicies and ingresses across the cluster, and
//! decodes the `kubectl.kubernetes.io/last-applied-configuration` annotation of
//! every instance carrying it.

pub mod client;
pub mod collector;
pub mod coordinate;
pub mod manifest;

pub use client::{
	BoxError, ClientInitError, ClientOptions, ClusterResourceClient, KubeResourceClient,
	ResourceInstance,
};
pub use collector::{CollectError, CollectorOptions, ManifestCollector};
pub use coordinate::{ResourceCoordinate, RESOURCE_COORDINATES};
pub use manifest::{decode_manifest, DecodedManifest, LAST_APPLIED_ANNOTATION};
