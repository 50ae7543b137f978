//! Decoding of the last-applied-configuration annotation.

use crate::client::ResourceInstance;

/// Annotation written by client-side `kubectl apply` holding the submitted manifest.
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// A manifest recovered from the annotation. No schema is assumed.
pub type DecodedManifest = serde_json::Map<String, serde_json::Value>;

/// Look up the raw last-applied annotation value of an instance.
pub fn last_applied(instance: &ResourceInstance) -> Option<&str> {
	instance
		.annotations
		.get(LAST_APPLIED_ANNOTATION)
		.map(String::as_str)
}

/// Decode an annotation value.
///
/// The top-level value must be a JSON object; arrays and scalars are rejected.
/// A literal `null` decodes to an empty manifest.
pub fn decode_manifest(raw: &str) -> Result<DecodedManifest, serde_json::Error> {
	let manifest: Option<DecodedManifest> = serde_json::from_str(raw)?;
	Ok(manifest.unwrap_or_default())
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use serde_json::json;

	use super::*;

	#[test]
	fn test_decode_nested_document() {
		let manifest = decode_manifest(
			r#"{"apiVersion":"apps/v1","kind":"Deployment","metadata":{"name":"a","labels":{"app":"a"}},"spec":{"replicas":2,"paused":false,"template":null,"ports":[80,443]}}"#,
		)
		.unwrap();

		assert_eq!(manifest["kind"], json!("Deployment"));
		assert_eq!(manifest["metadata"]["labels"]["app"], json!("a"));
		assert_eq!(manifest["spec"]["replicas"], json!(2));
		assert_eq!(manifest["spec"]["paused"], json!(false));
		assert_eq!(manifest["spec"]["template"], json!(null));
		assert_eq!(manifest["spec"]["ports"], json!([80, 443]));
	}

	#[test]
	fn test_decode_preserves_key_order() {
		let manifest = decode_manifest(r#"{"kind":"Service","apiVersion":"v1","metadata":{}}"#)
			.unwrap();
		let keys: Vec<_> = manifest.keys().map(String::as_str).collect();
		assert_eq!(keys, vec!["kind", "apiVersion", "metadata"]);
	}

	#[test]
	fn test_decode_round_trip() {
		let original = json!({
			"apiVersion": "networking.k8s.io/v1",
			"kind": "NetworkPolicy",
			"metadata": {"name": "deny-all", "namespace": "prod"},
			"spec": {"podSelector": {}, "policyTypes": ["Ingress", "Egress"]}
		});
		let encoded = serde_json::to_string(&original).unwrap();

		let decoded = decode_manifest(&encoded).unwrap();
		assert_eq!(serde_json::Value::Object(decoded), original);
	}

	#[test]
	fn test_decode_rejects_malformed() {
		assert!(decode_manifest("not-valid-data").is_err());
		assert!(decode_manifest(r#"{"kind":"#).is_err());
	}

	#[test]
	fn test_decode_rejects_non_object() {
		assert!(decode_manifest(r#"[{"kind":"Deployment"}]"#).is_err());
		assert!(decode_manifest(r#""Deployment""#).is_err());
		assert!(decode_manifest("42").is_err());
	}

	#[test]
	fn test_decode_null_is_empty_manifest() {
		assert_eq!(decode_manifest("null").unwrap(), DecodedManifest::new());
		assert_eq!(decode_manifest(" null\n").unwrap(), DecodedManifest::new());
	}

	#[test]
	fn test_last_applied_lookup() {
		let instance = ResourceInstance {
			namespace: "default".into(),
			name: "web".into(),
			annotations: BTreeMap::from([
				("deployment.kubernetes.io/revision".to_string(), "3".to_string()),
				(LAST_APPLIED_ANNOTATION.to_string(), "{}".to_string()),
			]),
		};
		assert_eq!(last_applied(&instance), Some("{}"));

		let bare = ResourceInstance {
			annotations: BTreeMap::new(),
			..instance
		};
		assert_eq!(last_applied(&bare), None);
	}
}
