// ==========================================
// 聚会节目分派引擎 - 家庭关系模型
// ==========================================
// 职责: 显式家庭链接、关系分类、推断提议
// 说明: FamilyLink 由外部存储持久化,此处只读消费
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 链接关系类型 (Relation Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Spouse,     // 配偶
    ChildOf,    // source 是 target 的子女
    GuardianOf, // source 是 target 的监护人
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Spouse => "spouse",
            RelationKind::ChildOf => "child_of",
            RelationKind::GuardianOf => "guardian_of",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// FamilyLink - 显式家庭链接
// ==========================================
// 存储为有向边,FamilyGraph 负责转换为双向查找
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyLink {
    pub source_id: String,
    pub target_id: String,
    pub relation: RelationKind,
}

// ==========================================
// Relationship - 两个成员之间的关系
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "relation")]
pub enum Relationship {
    ParentChild, // 父母指针
    Spouse,      // 配偶指针
    Siblings,    // 共同父母
    Linked(RelationKind), // 显式链接（间接）
}

impl Relationship {
    /// 直接关系: 由成员指针字段得出
    pub fn is_direct(&self) -> bool {
        !matches!(self, Relationship::Linked(_))
    }

    pub fn label(&self) -> String {
        match self {
            Relationship::ParentChild => "parent/child".to_string(),
            Relationship::Spouse => "spouses".to_string(),
            Relationship::Siblings => "siblings (shared parent)".to_string(),
            Relationship::Linked(RelationKind::Spouse) => "spouses (link)".to_string(),
            Relationship::Linked(RelationKind::ChildOf) => "parent/child (link)".to_string(),
            Relationship::Linked(RelationKind::GuardianOf) => "guardian/dependent".to_string(),
        }
    }
}

// ==========================================
// 推断置信度 (Confidence)
// ==========================================
// 顺序: Low < Medium < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

// ==========================================
// 推断关系类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredRelation {
    ChildOf, // subject 是 object 的子女
    Spouse,
}

/// 推断证据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceEvidence {
    pub same_surname: bool,
    pub age_compatible: bool,
    pub gender_compatible: bool,
    pub role_compatible: bool,
    pub existing_family_structure: bool,
}

// ==========================================
// InferredRelationship - 推断提议
// ==========================================
// 红线: 提议不直接修改图,必须先经 validate_inferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferredRelationship {
    pub subject_id: String,
    pub object_id: String,
    pub relation: InferredRelation,
    pub confidence: Confidence,
    pub score: u32, // 0-100+
    pub reasoning: Vec<String>,
    pub evidence: InferenceEvidence,
}
