// ==========================================
// 聚会节目分派引擎 - 配置层
// ==========================================
// 职责: 引擎配置加载与校验
// ==========================================

pub mod engine_config;

// 重导出核心配置
pub use engine_config::{ConfigError, EngineConfig, FairnessMode, InferenceConfig};
