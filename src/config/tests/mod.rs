#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;

    #[test]
    fn test_param_config_from_vars_picks_prefixed_pairs() {
        let config = ParamConfig::from_vars(vec![
            ("CAROL_PARAM__Train__epochs".to_string(), "10".to_string()),
            ("CAROL_PARAM__Train".to_string(), "oops".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);
        assert_eq!(config.get("Train", "epochs"), Some(&json!("10")));
        assert_eq!(config.get("Train", "lr"), None);
        assert_eq!(config.get("HOME", ""), None);
    }

    #[test]
    fn test_param_config_from_json_and_merge() {
        let base = ParamConfig::from_json_str(r#"{"Train": {"epochs": 3, "lr": 0.1}}"#).unwrap();
        let overlay = ParamConfig::new().with("Train", "epochs", json!(5));
        let merged = base.merge(overlay);
        assert_eq!(merged.get("Train", "epochs"), Some(&json!(5)));
        assert_eq!(merged.get("Train", "lr"), Some(&json!(0.1)));
    }

    #[test]
    fn test_cloud_config_requires_all_fields() {
        let mut cloud = CloudConfig {
            endpoint_url: Some("http://localhost:3900".into()),
            region: Some("garage".into()),
            bucket: Some("pipeline".into()),
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
        };
        assert!(cloud.is_configured());

        cloud.bucket = None;
        assert!(!cloud.is_configured());
        assert!(!CloudConfig::default().is_configured());
    }

    #[test]
    fn test_pipeline_config_builder() {
        let config = PipelineConfig::new()
            .with_target_dir("/tmp/targets")
            .with_default_target(TargetKind::Dummy);
        assert_eq!(config.target_dir, PathBuf::from("/tmp/targets"));
        assert_eq!(config.default_target, TargetKind::Dummy);
        assert_eq!(PipelineConfig::default().target_dir, PathBuf::from(DEFAULT_TARGET_DIR));
    }
}
