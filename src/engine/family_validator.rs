// ==========================================
// 聚会节目分派引擎 - 配对校验
// ==========================================
// 职责: 对主讲人/助手配对分类并给出合规结论
// 依赖: FamilyGraph（只读）
// ==========================================

use crate::domain::family::Relationship;
use crate::domain::member::Member;
use crate::engine::family_graph::FamilyGraph;
use crate::engine::rule_catalog::AssistantGenderPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// PairClassification - 配对分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairClassification {
    SameGender,
    MinorMixedGender,
    DirectFamily,
    IndirectFamily,
    UnrelatedMixedGender,
}

impl fmt::Display for PairClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PairClassification::SameGender => "same_gender",
            PairClassification::MinorMixedGender => "minor_mixed_gender",
            PairClassification::DirectFamily => "direct_family",
            PairClassification::IndirectFamily => "indirect_family",
            PairClassification::UnrelatedMixedGender => "unrelated_mixed_gender",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// PairValidation - 配对校验结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairValidation {
    pub compliant: bool,
    pub classification: PairClassification,
    pub relationship: Option<Relationship>,
    pub warnings: Vec<String>,
    pub violations: Vec<String>,
    pub suggestions: Vec<String>,
}

impl PairValidation {
    fn new(classification: PairClassification, compliant: bool) -> Self {
        Self {
            compliant,
            classification,
            relationship: None,
            warnings: Vec::new(),
            violations: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

// ==========================================
// FamilyValidator
// ==========================================
pub struct FamilyValidator<'g> {
    graph: &'g FamilyGraph,
}

impl<'g> FamilyValidator<'g> {
    pub fn new(graph: &'g FamilyGraph) -> Self {
        Self { graph }
    }

    /// 校验一对成员
    ///
    /// # 规则（按顺序,首个命中生效）
    /// 1. 同性别 → 合规 (same_gender)
    /// 2. 任一方未成年且性别不同 → 违规 (minor_mixed_gender),无家庭例外
    /// 3. 直接家庭关系 → 合规 (direct_family)
    /// 4. 显式链接关系 → 合规但有警告 (indirect_family)
    /// 5. 无关系 → 违规 (unrelated_mixed_gender),附建议
    pub fn validate_pair(&self, a: &Member, b: &Member) -> PairValidation {
        if a.gender == b.gender {
            return PairValidation::new(PairClassification::SameGender, true);
        }

        if a.minor || b.minor {
            let minor = if a.minor { a } else { b };
            let mut result = PairValidation::new(PairClassification::MinorMixedGender, false);
            result.violations.push(format!(
                "MINOR_MIXED_GENDER: {} is a minor and may only be paired with the same gender",
                minor.id
            ));
            result
                .suggestions
                .push(format!("pick a {} assistant for {}", minor.gender, minor.id));
            return result;
        }

        match self.graph.relationship(&a.id, &b.id) {
            Some(rel) if rel.is_direct() => {
                let mut result = PairValidation::new(PairClassification::DirectFamily, true);
                result.relationship = Some(rel);
                result
            }
            Some(rel) => {
                let mut result = PairValidation::new(PairClassification::IndirectFamily, true);
                result.relationship = Some(rel);
                result.warnings.push(format!(
                    "INDIRECT_FAMILY: {} and {} are related only through an explicit link ({})",
                    a.id,
                    b.id,
                    rel.label()
                ));
                result
            }
            None => {
                let mut result =
                    PairValidation::new(PairClassification::UnrelatedMixedGender, false);
                result.violations.push(format!(
                    "UNRELATED_MIXED_GENDER: {} and {} have no recorded family relationship",
                    a.id, b.id
                ));
                result.suggestions.push(
                    "pick a same-gender assistant or a verified family member".to_string(),
                );
                result
            }
        }
    }

    /// 按助手性别策略判断候选助手是否可用
    ///
    /// # 规则
    /// - None: 不限制,但未成年人异性配对仍然禁止
    /// - SameGenderOnly: 必须同性别
    /// - SameGenderOrFamily: validate_pair 合规
    pub fn check_assistant(
        &self,
        policy: AssistantGenderPolicy,
        principal: &Member,
        candidate: &Member,
    ) -> bool {
        match policy {
            AssistantGenderPolicy::None => {
                principal.gender == candidate.gender || !(principal.minor || candidate.minor)
            }
            AssistantGenderPolicy::SameGenderOnly => principal.gender == candidate.gender,
            AssistantGenderPolicy::SameGenderOrFamily => {
                self.validate_pair(principal, candidate).compliant
            }
        }
    }
}
