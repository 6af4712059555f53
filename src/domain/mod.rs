// ==========================================
// 聚会节目分派引擎 - 领域模型层
// ==========================================
// 职责: 定义成员、节目、分派结果、家庭关系等实体
// 红线: 不含引擎逻辑,不含 I/O
// ==========================================

pub mod assignment;
pub mod family;
pub mod member;
pub mod part;
pub mod types;

// 重导出核心类型
pub use assignment::{AllocationOutcome, AllocationStatistics, Assignment, AssignmentStatus};
pub use family::{
    Confidence, FamilyLink, InferenceEvidence, InferredRelation, InferredRelationship,
    RelationKind, Relationship,
};
pub use member::{AssignmentHistory, Member};
pub use part::{MeetingSection, Part, PartType};
pub use types::{Gender, MaritalStatus, Qualification, Qualifications, RoleTier};
