// ==========================================
// EngineConfig 集成测试
// ==========================================
// 测试目标: 验证配置文件加载、默认值回填与校验
// ==========================================

mod helpers;

use helpers::test_data_builder::*;
use meeting_assign::domain::family::Confidence;
use meeting_assign::domain::types::{Qualification, RoleTier};
use meeting_assign::engine::{AllocationRequest, Allocator, RuleCatalog};
use meeting_assign::{ConfigError, EngineConfig, FairnessMode};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_config(raw: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(raw.as_bytes()).expect("Failed to write config");
    file
}

#[test]
fn test_load_config_from_file() {
    let file = write_config(
        r#"{
            "fairness_mode": "legacy_hash",
            "recent_assignment_warning_days": 21,
            "inference": { "apply_min_confidence": "high" }
        }"#,
    );

    let config = EngineConfig::from_file(file.path()).expect("Failed to load config");
    assert_eq!(config.fairness_mode, FairnessMode::LegacyHash);
    assert_eq!(config.recent_assignment_warning_days, 21);
    assert_eq!(config.inference.apply_min_confidence, Confidence::High);

    // 未写出的字段取默认值
    assert_eq!(config.overload_recent_threshold, 3);
    assert_eq!(config.inference.parent_min_age, 25);
}

#[test]
fn test_empty_object_yields_defaults() {
    let file = write_config("{}");
    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.fairness_mode, FairnessMode::CountBased);
    assert_eq!(config.recent_assignment_warning_days, 14);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let err = EngineConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config(r#"{"recent_assignment_warning_days": -1}"#);
    let err = EngineConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid { ref key, .. } if key == "recent_assignment_warning_days"
    ));

    let file = write_config(r#"{"inference": {"adult_age": 30, "parent_min_age": 25}}"#);
    let err = EngineConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "inference.adult_age"));

    let file = write_config(r#"{"fairness_mode": "random"}"#);
    assert!(matches!(
        EngineConfig::from_file(file.path()).unwrap_err(),
        ConfigError::Parse(_)
    ));
}

#[test]
fn test_snapshot_round_trips_through_loader() {
    let config = EngineConfig {
        fairness_mode: FairnessMode::LegacyHash,
        overload_recent_threshold: 5,
        ..EngineConfig::default()
    };
    let file = write_config(&config.snapshot_json());

    let loaded = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(loaded.fairness_mode, FairnessMode::LegacyHash);
    assert_eq!(loaded.overload_recent_threshold, 5);
}

#[test]
fn test_fairness_mode_changes_rotation() {
    // B1 分派次数多,但旧版哈希评分更高
    let members = vec![
        MemberBuilder::brother("B1")
            .role(RoleTier::MinisterialServant)
            .qualified(&[Qualification::Reading])
            .history(8, 2, None)
            .build(),
        MemberBuilder::brother("B2")
            .qualified(&[Qualification::Reading])
            .build(),
    ];
    let parts = vec![PartBuilder::new("P1", "bible_reading").build()];
    let run = |mode: FairnessMode| {
        let config = EngineConfig {
            fairness_mode: mode,
            ..EngineConfig::default()
        };
        Allocator::new(Arc::new(RuleCatalog::standard()), config)
            .run(
                AllocationRequest::new(members.clone(), parts.clone())
                    .with_reference_date(reference_date()),
            )
            .unwrap()
            .assignments[0]
            .principal_id
            .clone()
    };

    assert_eq!(run(FairnessMode::CountBased).as_deref(), Some("B2"));
    assert_eq!(run(FairnessMode::LegacyHash).as_deref(), Some("B1"));
}
