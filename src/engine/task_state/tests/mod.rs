#[cfg(test)]
mod tests {
    use super::super::TaskState;

    #[test]
    fn test_task_state_as_str() {
        assert_eq!(TaskState::Pending.as_str(), "pending");
        assert_eq!(TaskState::Running.as_str(), "running");
        assert_eq!(TaskState::Completed.as_str(), "completed");
        assert_eq!(TaskState::Failed.as_str(), "failed");
        assert_eq!(TaskState::Skipped.as_str(), "skipped");
    }

    #[test]
    fn test_task_state_round_trips_through_str() {
        for state in [
            TaskState::Pending,
            TaskState::Running,
            TaskState::Completed,
            TaskState::Failed,
            TaskState::Skipped,
        ] {
            assert_eq!(TaskState::from_str(state.as_str()), Some(state));
            assert_eq!(format!("{}", state), state.as_str());
        }
        assert_eq!(TaskState::from_str("invalid"), None);
    }

    #[test]
    fn test_task_state_success() {
        assert!(TaskState::Completed.is_success());
        assert!(TaskState::Skipped.is_success());
        assert!(!TaskState::Failed.is_success());
        assert!(!TaskState::Pending.is_success());
    }
}
