// ==========================================
// 聚会节目分派引擎 - 分派结果模型
// ==========================================
// 用途: 每次分派运行新建,所有权归调用方
// 红线: 每个输入节目恰好对应一条 Assignment
// ==========================================

use crate::domain::types::RoleTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// 分派状态 (Assignment Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,            // 主讲人（及所需助手）已分派
    NoEligibleCandidate, // 无合格主讲人,或节目类型无规则
    AssistantMissing,    // 主讲人已分派,但找不到合规助手
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::Assigned => write!(f, "ASSIGNED"),
            AssignmentStatus::NoEligibleCandidate => write!(f, "NO_ELIGIBLE_CANDIDATE"),
            AssignmentStatus::AssistantMissing => write!(f, "ASSISTANT_MISSING"),
        }
    }
}

// ==========================================
// Assignment - 单个节目的分派结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// 分派ID（{week}:{part_id},同一输入重复运行结果一致）
    pub id: String,

    /// 节目引用
    pub part_id: String,

    /// 解析后的规则键（未知节目类型为 None）
    #[serde(default)]
    pub resolved_type: Option<String>,

    /// 主讲人（未分派为 None）
    pub principal_id: Option<String>,

    /// 助手
    #[serde(default)]
    pub assistant_id: Option<String>,

    pub status: AssignmentStatus,

    /// 选择理由（可解释性）
    #[serde(default)]
    pub rationale: String,

    /// 参与比较的候选人数量
    #[serde(default)]
    pub alternatives_considered: usize,

    /// 冲突/提示说明
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Assignment {
    /// 分派中出现的成员ID（主讲人 + 助手）
    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.principal_id
            .as_deref()
            .into_iter()
            .chain(self.assistant_id.as_deref())
    }
}

// ==========================================
// AllocationStatistics - 运行统计
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationStatistics {
    /// 可用成员数（活跃成员）
    pub total_members_available: usize,

    /// 成功分派主讲人的节目数
    pub parts_assigned: usize,

    /// 按职务层级统计的分派次数（含助手）
    pub distribution_by_role: BTreeMap<RoleTier, usize>,

    /// 本次运行未获分派的活跃成员
    pub members_without_assignment: Vec<String>,

    /// 冲突列表
    pub conflicts: Vec<String>,
}

// ==========================================
// AllocationOutcome - 一次分派运行的完整输出
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub assignments: Vec<Assignment>,
    pub statistics: AllocationStatistics,
}
