// ==========================================
// 聚会节目分派引擎 - 引擎层
// ==========================================
// 职责: 规则筛选、决胜轮换、助手配对、家庭关系图与推断、批量校验
// 红线: 引擎不做 I/O,输入输出都是内存集合
// 红线: 所有判定必须输出 reason（状态 + 冲突/理由字符串）
// ==========================================

pub mod allocator;
pub mod batch_validator;
pub mod candidate_pool;
pub mod eligibility;
pub mod error;
pub mod family_graph;
pub mod family_inference;
pub mod family_validator;
pub mod rule_catalog;
pub mod tie_break;

// 重导出核心引擎
pub use allocator::{AllocationRequest, Allocator};
pub use batch_validator::{AssignmentCheck, BatchSummary, BatchValidationReport, BatchValidator};
pub use candidate_pool::CandidatePool;
pub use eligibility::{EligibilityCore, EligibilityFailure};
pub use error::EngineError;
pub use family_graph::{FamilyCycle, FamilyGraph, StructureReport};
pub use family_inference::{
    AppliedInferences, FamilyGroup, FamilyInferenceEngine, InferenceConflict,
    InferenceConflictKind, InferenceResult, InferenceStatistics, InferenceValidation,
    PotentialCouple,
};
pub use family_validator::{FamilyValidator, PairClassification, PairValidation};
pub use rule_catalog::{AssistantGenderPolicy, RuleCatalog, RuleSet, TieBreakPolicy};
pub use tie_break::{
    CountBasedFairness, FairnessStrategy, LegacyHashFairness, Selection, TieBreaker,
};
