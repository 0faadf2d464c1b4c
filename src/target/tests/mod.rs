#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_target_kind_parses_and_displays() {
        for kind in [
            TargetKind::Dummy,
            TargetKind::LOCAL_JSON,
            TargetKind::LOCAL_CBOR,
            TargetKind::CLOUD_JSON,
            TargetKind::CLOUD_CBOR,
        ] {
            assert_eq!(kind.to_string().parse::<TargetKind>(), Ok(kind));
        }
        assert!("pickle".parse::<TargetKind>().is_err());
    }

    #[tokio::test]
    async fn test_cbor_target_dumps_and_loads() {
        let store = Arc::new(MemoryStore::new());
        let target = StoreTarget::new(store.clone(), "Train", "Train_1_abc", Format::Cbor);
        assert_eq!(target.key(), "Train/Train_1_abc.cbor");
        assert!(!target.exists().await.unwrap());

        let value = json!({"weights": [0.5, 1.5], "epochs": 3});
        target.dump(&value).await.unwrap();
        assert!(target.exists().await.unwrap());
        assert_eq!(target.load().await.unwrap(), value);

        target.remove().await.unwrap();
        assert!(!target.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_json_target_rejects_corrupt_payload() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("Score/s.json", Bytes::from("{not json"))
            .await
            .unwrap();
        let target = StoreTarget::new(store, "Score", "s", Format::Json);
        let err = target.load().await.unwrap_err();
        assert!(matches!(err, TargetError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_persisted_log_is_readable() {
        let store = Arc::new(MemoryStore::remote());
        let target = StoreTarget::new(store, "Train", "t", Format::Json);
        assert!(target.is_cloud_target());
        assert_eq!(target.load_log().await.unwrap(), None);

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "epoch 1\n").unwrap();
        target.persist_log(file.path()).await.unwrap();
        assert_eq!(target.load_log().await.unwrap().as_deref(), Some("epoch 1\n"));
    }

    #[test]
    fn test_cloud_kind_without_store_is_an_error() {
        let factory = TargetFactory::new(Arc::new(MemoryStore::new()), None);
        let result = factory.create(TargetKind::CLOUD_JSON, "Train", "t");
        assert!(matches!(result, Err(TargetError::CloudNotConfigured(_))));
        assert!(factory.create(TargetKind::LOCAL_JSON, "Train", "t").is_ok());
    }
}
