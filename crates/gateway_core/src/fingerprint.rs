use serde::Serialize;
use sha1::{Digest, Sha1};

/// Lifecycle of one gateway deployment. `Unchanged` holds while the computed
/// digest matches the last-applied digest; a mismatch moves to `Redeploying`,
/// and `Deployed` is terminal once the stage points at the new deployment.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DeploymentState {
    Unchanged,
    Redeploying,
    Deployed,
}

/// Canonical string form of a route document. Maps are BTreeMap-backed and
/// struct field order is fixed, so identical content serializes identically.
pub fn stable_document_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of route document should not fail")
}

/// Change-detection token over serialized route table content. Not a
/// security boundary.
pub fn content_fingerprint(serialized: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(serialized.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn redeploy_decision(last_applied: Option<&str>, computed: &str) -> DeploymentState {
    match last_applied {
        Some(digest) if digest == computed => DeploymentState::Unchanged,
        _ => DeploymentState::Redeploying,
    }
}

#[cfg(test)]
mod tests {
    use crate::route_table::build_route_table;

    use super::*;

    #[test]
    fn identical_content_yields_identical_digests() {
        let body = stable_document_json(build_route_table("arn:aws:lambda:example:fn"));
        assert_eq!(content_fingerprint(&body), content_fingerprint(&body));
    }

    #[test]
    fn single_field_change_yields_different_digest() {
        let first = stable_document_json(build_route_table("arn:aws:lambda:example:fn-a"));
        let second = stable_document_json(build_route_table("arn:aws:lambda:example:fn-b"));

        assert_ne!(first, second);
        assert_ne!(content_fingerprint(&first), content_fingerprint(&second));
    }

    #[test]
    fn digest_matches_known_sha1_fixture() {
        let fixture = r#"{"openapi":"3.0.1","paths":{"/path1":{}}}"#;
        assert_eq!(
            content_fingerprint(fixture),
            "1deadfd8bed1c724ddc75ee7c6277e2ec076f455"
        );
    }

    #[test]
    fn digest_is_fixed_length_hex() {
        let digest = content_fingerprint("");
        assert_eq!(digest.len(), 40);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn redeploy_decision_follows_digest_comparison() {
        assert_eq!(
            redeploy_decision(None, "abc"),
            DeploymentState::Redeploying
        );
        assert_eq!(
            redeploy_decision(Some("abc"), "abc"),
            DeploymentState::Unchanged
        );
        assert_eq!(
            redeploy_decision(Some("abc"), "abd"),
            DeploymentState::Redeploying
        );
    }
}
