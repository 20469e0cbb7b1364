// ==========================================
// 音乐学院管理后台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约定: 只使用 scope_id='global'
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::GradeMismatchPolicy;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// BagrutSettings - 启动时加载的业务配置
// ==========================================
/// bagrut 业务配置
///
/// 在 AppState 构造时读取一次，之后按值传入各 API。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagrutSettings {
    /// 成绩与等级不一致时的处理策略
    pub grade_mismatch_policy: GradeMismatchPolicy,
    /// 新建/迁移记录时缺省的音乐学院名称
    pub default_conservatory_name: String,
}

impl Default for BagrutSettings {
    fn default() -> Self {
        Self {
            grade_mismatch_policy: GradeMismatchPolicy::Reject,
            default_conservatory_name: defaults::CONSERVATORY_NAME.to_string(),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置（按键排序）
    pub fn get_config_snapshot(&self) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    // ===== bagrut 配置 =====

    /// 获取成绩/等级不一致策略
    ///
    /// 未知取值回退为 REJECT
    pub fn get_grade_mismatch_policy(&self) -> Result<GradeMismatchPolicy, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::GRADE_MISMATCH_POLICY,
            GradeMismatchPolicy::Reject.to_db_str(),
        )?;
        let policy = GradeMismatchPolicy::from_str(&value);
        if policy.to_db_str() != value.trim().to_uppercase() {
            tracing::warn!(
                config_key = config_keys::GRADE_MISMATCH_POLICY,
                raw_value = %value,
                "未知的成绩不一致策略，使用 REJECT"
            );
        }
        Ok(policy)
    }

    /// 获取默认音乐学院名称
    pub fn get_default_conservatory_name(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::DEFAULT_CONSERVATORY_NAME, defaults::CONSERVATORY_NAME)
    }

    /// 一次性加载 bagrut 业务配置
    pub fn load_bagrut_settings(&self) -> Result<BagrutSettings, Box<dyn Error>> {
        Ok(BagrutSettings {
            grade_mismatch_policy: self.get_grade_mismatch_policy()?,
            default_conservatory_name: self.get_default_conservatory_name()?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 成绩与等级不一致时的处理策略 (REJECT / AUTO_CORRECT)
    pub const GRADE_MISMATCH_POLICY: &str = "bagrut/grade_mismatch_policy";

    // 缺省音乐学院名称
    pub const DEFAULT_CONSERVATORY_NAME: &str = "bagrut/default_conservatory_name";
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    pub const CONSERVATORY_NAME: &str = "";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = manager().load_bagrut_settings().unwrap();
        assert_eq!(settings, BagrutSettings::default());
    }

    #[test]
    fn test_set_then_load() {
        let cm = manager();
        cm.set_global_config_value(config_keys::GRADE_MISMATCH_POLICY, "AUTO_CORRECT").unwrap();
        cm.set_global_config_value(config_keys::DEFAULT_CONSERVATORY_NAME, "Raanana").unwrap();

        let settings = cm.load_bagrut_settings().unwrap();
        assert_eq!(settings.grade_mismatch_policy, GradeMismatchPolicy::AutoCorrect);
        assert_eq!(settings.default_conservatory_name, "Raanana");
    }

    #[test]
    fn test_set_overwrites_and_snapshot() {
        let cm = manager();
        cm.set_global_config_value("k", "1").unwrap();
        cm.set_global_config_value("k", "2").unwrap();
        assert_eq!(cm.get_global_config_value("k").unwrap(), Some("2".to_string()));
        assert_eq!(cm.get_config_snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_policy_falls_back_to_reject() {
        let cm = manager();
        cm.set_global_config_value(config_keys::GRADE_MISMATCH_POLICY, "whatever").unwrap();
        assert_eq!(cm.get_grade_mismatch_policy().unwrap(), GradeMismatchPolicy::Reject);
    }
}
