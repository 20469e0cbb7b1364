// ==========================================
// 音乐学院管理后台 - Bagrut 核心主入口
// ==========================================
// 职责: 初始化日志与应用状态，输出数据库概况
// 控制器/HTTP 层由宿主服务负责
// ==========================================

use bagrut_core::api::BagrutListFilter;
use bagrut_core::app::{get_default_db_path, AppState};
use bagrut_core::engine::needs_migration;
use bagrut_core::repository::Filter;

fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    bagrut_core::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 毕业考试评分核心", bagrut_core::APP_NAME);
    tracing::info!("系统版本: {}", bagrut_core::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径（第一个参数优先）
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let app_state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let active = app_state.bagrut_api.list_bagruts(&BagrutListFilter::default())?;
    let legacy = app_state
        .bagrut_collection
        .find(&Filter::new())?
        .iter()
        .filter(|doc| needs_migration(doc))
        .count();

    tracing::info!(active = active.len(), legacy, "bagrut 记录统计");
    if legacy > 0 {
        tracing::info!("存在旧结构记录，可运行 migrate_legacy_bagruts 批量迁移");
    }

    Ok(())
}
