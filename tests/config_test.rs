use gitnotify::config::{ConfigError, GroupBy, Settings};
use gitnotify::notifications::filters::{FilterMode, SearchToken, StateCategory};
use gitnotify::notifications::{Reason, SubjectType};

#[test]
fn missing_file_yields_defaults() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temporary directory");
    let path = temp_dir.path().join("settings.json");

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings, Settings::default());
    assert!(!path.exists());
}

#[test]
fn settings_survive_save_and_load() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temporary directory");
    let path = temp_dir.path().join("nested").join("settings.json");

    let mut settings = Settings {
        participating: true,
        fetch_interval_secs: 300,
        group_by: GroupBy::Date,
        mark_as_done_on_unsubscribe: true,
        notification_volume: 80,
        ..Default::default()
    };
    settings.filters.reasons.push(Reason::Mention);
    settings.filters.subject_types.push(SubjectType::PullRequest);
    settings.filters.states.push(StateCategory::Open);
    settings
        .filters
        .add_search_token(FilterMode::Include, SearchToken::org("gitify-app"))
        .unwrap();

    settings.save(&path).unwrap();
    let loaded = Settings::load(&path).unwrap();

    assert_eq!(loaded, settings);
    assert_eq!(loaded.volume(), 0.8);
}

#[test]
fn invalid_json_is_reported_with_path() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temporary directory");
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("settings.json"));
}
