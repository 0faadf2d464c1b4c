#[cfg(test)]
mod tests {
    use super::super::*;
    use bytes::Bytes;

    #[test]
    fn test_unconfigured_cloud_yields_no_store() {
        let store = create_cloud_store(&CloudConfig::default()).unwrap();
        assert!(store.is_none());
    }

    #[tokio::test]
    async fn test_local_put_creates_family_dir_and_reads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());

        store
            .put("Extract/Extract__abc.json", Bytes::from("[1,2]"))
            .await
            .unwrap();
        let data = store.get("Extract/Extract__abc.json").await.unwrap();
        assert_eq!(data.as_ref(), b"[1,2]");
        assert!(!store.is_remote());

        // Only the final file is left behind.
        let names: Vec<_> = std::fs::read_dir(tmp.path().join("Extract"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["Extract__abc.json".to_string()]);
    }

    #[tokio::test]
    async fn test_local_overwrite_replaces_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());

        store.put("T/t.json", Bytes::from("1")).await.unwrap();
        store.put("T/t.json", Bytes::from("2")).await.unwrap();
        assert_eq!(store.get("T/t.json").await.unwrap().as_ref(), b"2");
    }

    #[tokio::test]
    async fn test_local_missing_key_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());

        let err = store.get("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.get_opt("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_local_delete_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());

        store.put("key", Bytes::from("data")).await.unwrap();
        assert!(store.exists("key").await.unwrap());
        store.delete("key").await.unwrap();
        assert!(!store.exists("key").await.unwrap());
        store.delete("key").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_rejects_keys_outside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path().join("targets"));

        for key in ["../escape.json", "/abs.json", ""] {
            let err = store.put(key, Bytes::from("x")).await.unwrap_err();
            assert!(matches!(err, StoreError::Internal(_)), "{key}");
        }
        assert!(!tmp.path().join("escape.json").exists());
    }

    #[tokio::test]
    async fn test_memory_clones_share_objects() {
        let store = MemoryStore::remote();
        let other = store.clone();

        store.put("a/b", Bytes::from("x")).await.unwrap();
        assert!(other.exists("a/b").await.unwrap());
        assert_eq!(other.keys(), vec!["a/b".to_string()]);
        assert!(other.is_remote());
        assert!(!MemoryStore::new().is_remote());
    }

    #[cfg(feature = "s3")]
    #[test]
    fn test_s3_missing_bucket_produces_error() {
        let config = CloudConfig {
            endpoint_url: Some("http://localhost:3900".into()),
            region: Some("garage".into()),
            bucket: None,
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
        };
        let err = S3Store::new(&config).unwrap_err();
        assert!(err.to_string().contains("bucket name required"));
    }

    #[cfg(feature = "s3")]
    #[test]
    fn test_s3_content_type_follows_extension() {
        use super::super::s3::content_type_for_key;

        assert_eq!(content_type_for_key("Train/x.json"), "application/json");
        assert_eq!(content_type_for_key("Train/x.cbor"), "application/cbor");
        assert_eq!(content_type_for_key("Train/x.log"), "text/plain");
        assert_eq!(content_type_for_key("x.bin"), "application/octet-stream");
    }
}
