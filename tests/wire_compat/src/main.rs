fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use lfs_config::LfsConfig;
    use lfs_protocol::{ObjectResource, ProtocolError, Relation};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn parse_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent comparison).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = parse_fixture(name);
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
    }

    // --- Negotiation payloads ---

    #[test]
    fn fixture_negotiation_request() {
        roundtrip_test::<ObjectResource>("negotiation_request.json");

        let obj: ObjectResource = parse_fixture("negotiation_request.json");
        assert!(obj.links.is_none());
        assert_eq!(
            serde_json::to_value(ObjectResource::request(obj.oid.clone(), obj.size)).unwrap(),
            load_fixture("negotiation_request.json")
        );
    }

    #[test]
    fn fixture_negotiation_response_verify() {
        roundtrip_test::<ObjectResource>("negotiation_response_verify.json");

        let obj: ObjectResource = parse_fixture("negotiation_response_verify.json");
        let upload = obj.validate_for_upload().unwrap();
        assert_eq!(
            upload.header.get("x-amz-content-sha256").map(String::as_str),
            Some("UNSIGNED-PAYLOAD")
        );
        let verify = obj.link(Relation::Verify).unwrap();
        assert_eq!(verify.href, "https://lfs.example.com/repo/objects/verify");
        assert_eq!(verify.header.len(), 1);
    }

    #[test]
    fn fixture_negotiation_response_upload_only() {
        roundtrip_test::<ObjectResource>("negotiation_response_upload_only.json");

        let obj: ObjectResource = parse_fixture("negotiation_response_upload_only.json");
        assert!(obj.validate_for_upload().unwrap().header.is_empty());
        assert!(!obj.has_link(Relation::Verify));
    }

    #[test]
    fn fixture_verify_body_drops_links() {
        let obj: ObjectResource = parse_fixture("negotiation_response_verify.json");
        assert_eq!(
            serde_json::to_value(obj.without_links()).unwrap(),
            load_fixture("negotiation_request.json")
        );
    }

    // --- Tolerated variations ---

    #[test]
    fn fixture_unknown_fields_and_relations_are_ignored() {
        let obj: ObjectResource = parse_fixture("negotiation_response_extra.json");
        let upload = obj.validate_for_upload().unwrap();
        assert_eq!(upload.href, "https://storage.example.com/objects/4d7a2146");
        assert!(obj.has_link(Relation::Download));
        assert!(obj.links.as_ref().unwrap().contains_key("mirror"));

        let reserialized = serde_json::to_value(&obj).unwrap();
        assert!(reserialized.get("authenticated").is_none());
        assert!(reserialized["_links"]["upload"].get("expires_at").is_none());
    }

    #[test]
    fn fixture_legacy_links_key_is_accepted() {
        let obj: ObjectResource = parse_fixture("negotiation_response_legacy_links.json");
        assert!(obj.validate_for_upload().is_ok());

        let reserialized = serde_json::to_value(&obj).unwrap();
        assert!(reserialized.get("links").is_none());
        assert!(reserialized["_links"]["upload"].is_object());
    }

    #[test]
    fn fixture_missing_upload_link_is_rejected() {
        let obj: ObjectResource = parse_fixture("negotiation_response_no_upload.json");
        assert_eq!(
            obj.validate_for_upload().unwrap_err(),
            ProtocolError::MissingLink("upload")
        );
    }

    // --- Configuration file ---

    #[test]
    fn fixture_config_file() {
        let config = LfsConfig::load_from(&fixtures_dir().join("config.json")).unwrap();
        assert_eq!(config.url, "https://git.example.com/repo.git/info/lfs");
        assert_eq!(
            config.headers.get("Authorization").map(String::as_str),
            Some("Basic dXNlcjpwYXNz")
        );
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(
            config.objects_url(),
            "https://git.example.com/repo.git/info/lfs/objects"
        );
        config.validate().unwrap();
    }
}
