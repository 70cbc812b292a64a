#[cfg(test)]
mod tests {
    use crate::error::PawError;
    use crate::storage::StorageError;

    #[test]
    fn test_error_creation() {
        let error = PawError::new("Test error", "test_stage");
        assert_eq!(error.message, "Test error");
        assert_eq!(error.stage, "test_stage");
    }

    #[test]
    fn test_error_with_context() {
        let error = PawError::new("Test error", "test_stage")
            .with_context("Additional context");
        assert!(error.context.is_some());
        assert_eq!(error.context.unwrap(), "Additional context");
    }

    #[test]
    fn test_error_display() {
        let error = PawError::new("Test error", "test_stage")
            .with_context("context")
            .with_source("source");
        let display = format!("{}", error);
        assert!(display.contains("[test_stage] Test error"));
        assert!(display.contains("(context: context)"));
        assert!(display.contains("(source: source)"));
    }

    #[test]
    fn test_error_from_json() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: PawError = err.into();
        assert_eq!(error.stage, "json_parse");
        assert_eq!(error.source.as_deref(), Some("serde_json"));
    }

    #[test]
    fn test_error_from_storage() {
        let error: PawError = StorageError::InvalidKey("a/b".to_string()).into();
        assert_eq!(error.stage, "storage");
        assert!(error.message.contains("a/b"));
    }

    #[test]
    fn test_error_from_toml() {
        let error = crate::config::settings::AppConfig::from_toml_str("max_insights = \"four\"").unwrap_err();
        assert_eq!(error.stage, "config");
    }
}
