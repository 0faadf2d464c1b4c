#[cfg(test)]
mod tests {
    use super::super::SqliteStorage;
    use crate::engine::TaskState;
    use crate::storage::StatusStore;

    async fn temp_db(dir: &tempfile::TempDir) -> SqliteStorage {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("builds.db").display());
        let storage = SqliteStorage::new(&url).await.unwrap();
        storage.init().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_records_and_updates_task_states() {
        let dir = tempfile::tempdir().unwrap();
        let storage = temp_db(&dir).await;
        storage
            .create_task_record("build1", "Extract_abc", "Extract")
            .await
            .unwrap();
        storage
            .update_task_state("build1", "Extract_abc", TaskState::Completed, 2)
            .await
            .unwrap();

        let status = storage.get_build_status("build1").await.unwrap();
        assert_eq!(status, vec![("Extract_abc".to_string(), TaskState::Completed, 2)]);
        assert!(storage.get_build_status("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_builds_sharing_a_task_keep_separate_records() {
        let dir = tempfile::tempdir().unwrap();
        let storage = temp_db(&dir).await;
        for build in ["b1", "b2"] {
            storage
                .create_task_record(build, "Shared_x", "Shared")
                .await
                .unwrap();
        }
        storage
            .update_task_state("b1", "Shared_x", TaskState::Completed, 1)
            .await
            .unwrap();
        storage
            .update_task_state("b2", "Shared_x", TaskState::Skipped, 0)
            .await
            .unwrap();

        assert_eq!(
            storage.get_build_status("b1").await.unwrap(),
            vec![("Shared_x".to_string(), TaskState::Completed, 1)]
        );
        assert_eq!(
            storage.get_build_status("b2").await.unwrap(),
            vec![("Shared_x".to_string(), TaskState::Skipped, 0)]
        );
    }

    #[tokio::test]
    async fn test_updating_unknown_task_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = temp_db(&dir).await;
        storage
            .create_task_record("build1", "Extract_abc", "Extract")
            .await
            .unwrap();

        let result = storage
            .update_task_state("build1", "missing", TaskState::Running, 1)
            .await;
        assert!(result.is_err());
        let result = storage
            .update_task_state("build2", "Extract_abc", TaskState::Running, 1)
            .await;
        assert!(result.is_err());
    }
}
