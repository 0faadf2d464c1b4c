#[cfg(test)]
mod tests {
    use super::super::MemoryStorage;
    use crate::engine::TaskState;
    use crate::storage::StatusStore;

    #[tokio::test]
    async fn test_builds_sharing_a_task_keep_separate_records() {
        let storage = MemoryStorage::new();
        storage.create_task_record("b1", "Shared_x", "Shared").await.unwrap();
        storage.create_task_record("b2", "Shared_x", "Shared").await.unwrap();
        storage
            .update_task_state("b2", "Shared_x", TaskState::Skipped, 0)
            .await
            .unwrap();

        assert_eq!(storage.get_task_state("b1", "Shared_x"), Some((TaskState::Pending, 0)));
        assert_eq!(storage.get_task_state("b2", "Shared_x"), Some((TaskState::Skipped, 0)));
        assert_eq!(storage.get_build_status("b1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_a_record_in_that_build() {
        let storage = MemoryStorage::new();
        storage.create_task_record("b1", "Task_x", "Task").await.unwrap();

        let result = storage
            .update_task_state("b2", "Task_x", TaskState::Running, 1)
            .await;
        assert!(result.is_err());
        assert_eq!(
            storage.get_update_calls(),
            vec![("Task_x".to_string(), TaskState::Running, 1)]
        );
    }
}
