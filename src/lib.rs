// ==========================================
// 聚会节目分派引擎 - 核心库
// ==========================================
// 技术栈: Rust + serde + tracing
// 系统定位: 纯计算引擎（输入内存集合,输出分派结果与报告）
// 红线: 引擎层不做 I/O,不保留跨运行状态
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 引擎配置
pub mod config;

// 引擎层 - 分派规则与家庭关系
pub mod engine;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Gender, MaritalStatus, Qualification, Qualifications, RoleTier};

// 领域实体
pub use domain::{
    AllocationOutcome, AllocationStatistics, Assignment, AssignmentHistory, AssignmentStatus,
    FamilyLink, InferredRelationship, Member, Part, PartType, RelationKind, Relationship,
};

// 配置
pub use config::{ConfigError, EngineConfig, FairnessMode};

// 引擎
pub use engine::{
    AllocationRequest, Allocator, BatchValidationReport, BatchValidator, EngineError,
    FamilyGraph, FamilyInferenceEngine, FamilyValidator, PairClassification, RuleCatalog,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "聚会节目分派引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
