// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证 bagrut 配置读取与回退默认值
// ==========================================


use bagrut_core::config::{config_keys, ConfigManager};
use bagrut_core::domain::types::GradeMismatchPolicy;
use test_helpers::{create_test_db, insert_test_config};

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[test]
fn test_空配置_使用默认值() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let settings = config_manager
        .load_bagrut_settings()
        .expect("Should load settings");
    assert_eq!(settings.grade_mismatch_policy, GradeMismatchPolicy::Reject);
    assert_eq!(settings.default_conservatory_name, "");
}

#[test]
fn test_读取测试配置() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_test_connection(&db_path).expect("Failed to open db");
    insert_test_config(&conn, "AUTO_CORRECT", "Jerusalem Conservatory")
        .expect("Failed to insert test config");

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert_eq!(
        config_manager.get_grade_mismatch_policy().unwrap(),
        GradeMismatchPolicy::AutoCorrect
    );
    assert_eq!(
        config_manager.get_default_conservatory_name().unwrap(),
        "Jerusalem Conservatory"
    );
}

#[test]
fn test_未知策略_回退为拒绝() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_test_connection(&db_path).expect("Failed to open db");
    insert_test_config(&conn, "SOMETIMES", "").expect("Failed to insert test config");

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    assert_eq!(
        config_manager.get_grade_mismatch_policy().unwrap(),
        GradeMismatchPolicy::Reject
    );
}

#[test]
fn test_写入配置_覆盖已有值() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::GRADE_MISMATCH_POLICY, "auto_correct")
        .unwrap();
    config_manager
        .set_global_config_value(config_keys::GRADE_MISMATCH_POLICY, "REJECT")
        .unwrap();

    let snapshot = config_manager.get_config_snapshot().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.get(config_keys::GRADE_MISMATCH_POLICY).map(String::as_str),
        Some("REJECT")
    );
}

#[test]
fn test_策略大小写不敏感() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager
        .set_global_config_value(config_keys::GRADE_MISMATCH_POLICY, " auto_correct ")
        .unwrap();
    assert_eq!(
        config_manager.get_grade_mismatch_policy().unwrap(),
        GradeMismatchPolicy::AutoCorrect
    );
}
