// ==========================================
// 聚会节目分派引擎 - 批量校验（持久化闸门）
// ==========================================
// 职责: 独立复核一批（可能经人工编辑的）Assignment
// 红线: 与分派器共享同一 RuleCatalog 实例与同一组资格谓词
// 红线: 任一项不通过 → 整批拒绝（fail closed,不允许部分持久化）
// ==========================================

use crate::config::EngineConfig;
use crate::domain::assignment::Assignment;
use crate::domain::family::FamilyLink;
use crate::domain::member::Member;
use crate::domain::part::Part;
use crate::engine::eligibility::EligibilityCore;
use crate::engine::error::EngineError;
use crate::engine::family_graph::FamilyGraph;
use crate::engine::family_validator::{FamilyValidator, PairClassification};
use crate::engine::rule_catalog::{AssistantGenderPolicy, RuleCatalog, RuleSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// 校验结果结构
// ==========================================

/// 单条 Assignment 的校验结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentCheck {
    pub assignment_id: String,
    pub part_id: String,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchValidationReport {
    pub all_valid: bool,
    /// 不属于单条分派的整批错误（如名册 id 重复）
    #[serde(default)]
    pub batch_errors: Vec<String>,
    pub results: Vec<AssignmentCheck>,
    pub summary: BatchSummary,
}

impl BatchValidationReport {
    /// 持久化闸门
    ///
    /// # 返回
    /// - Ok(()): 全部通过,可以持久化
    /// - Err(BatchRejected): 逐项列出违规,整批不得写入
    pub fn gate(&self) -> Result<(), EngineError> {
        if self.all_valid {
            return Ok(());
        }

        let violations = self
            .batch_errors
            .iter()
            .map(|e| format!("batch: {}", e))
            .chain(self.results.iter().flat_map(|r| {
                r.errors
                    .iter()
                    .map(move |e| format!("{}: {}", r.assignment_id, e))
            }))
            .collect();
        Err(EngineError::BatchRejected { violations })
    }
}

// ==========================================
// BatchValidator
// ==========================================
pub struct BatchValidator {
    catalog: Arc<RuleCatalog>,
    config: EngineConfig,
}

impl BatchValidator {
    pub fn new(catalog: Arc<RuleCatalog>, config: EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// 校验一批 Assignment
    ///
    /// # 参数
    /// - `assignments`: 待持久化的分派（可能经人工修改）
    /// - `parts`: 分派引用的节目
    /// - `members`: 完整名册
    /// - `links`: 显式家庭链接
    /// - `today`: 年龄计算参考日期
    ///
    /// # 规则
    /// - 每项列出全部失败项,而不是只报告第一个
    /// - 同一成员在整批中出现多次 → 每个涉及的分派都报错
    /// - 名册中 id 重复 → 整批错误 DUPLICATE_MEMBER（按首条记录校验,与家庭图一致）
    #[instrument(skip_all, fields(assignments = assignments.len()))]
    pub fn validate_batch(
        &self,
        assignments: &[Assignment],
        parts: &[Part],
        members: &[Member],
        links: &[FamilyLink],
        today: NaiveDate,
    ) -> BatchValidationReport {
        let graph = FamilyGraph::build(members, links);
        let validator = FamilyValidator::new(&graph);
        let mut members_by_id: HashMap<&str, &Member> = HashMap::new();
        let mut roster_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for member in members {
            members_by_id.entry(member.id.as_str()).or_insert(member);
            *roster_counts.entry(member.id.as_str()).or_insert(0) += 1;
        }
        let batch_errors: Vec<String> = roster_counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, count)| {
                format!("DUPLICATE_MEMBER: id={} appears {} times in roster", id, count)
            })
            .collect();
        let parts_by_id: HashMap<&str, &Part> = parts.iter().map(|p| (p.id.as_str(), p)).collect();

        // 整批出现次数（用于重复分派检测）
        let mut appearances: HashMap<&str, usize> = HashMap::new();
        for assignment in assignments {
            for id in assignment.member_ids() {
                *appearances.entry(id).or_insert(0) += 1;
            }
        }

        let results: Vec<AssignmentCheck> = assignments
            .iter()
            .map(|a| {
                self.check_assignment(
                    a,
                    &parts_by_id,
                    &members_by_id,
                    &appearances,
                    &validator,
                    today,
                )
            })
            .collect();

        let assignment_errors: usize = results.iter().map(|r| r.errors.len()).sum();
        let summary = BatchSummary {
            total: results.len(),
            valid: results.iter().filter(|r| r.valid).count(),
            invalid: results.iter().filter(|r| !r.valid).count(),
            total_errors: batch_errors.len() + assignment_errors,
            total_warnings: results.iter().map(|r| r.warnings.len()).sum(),
        };
        let all_valid = summary.invalid == 0 && batch_errors.is_empty();

        if all_valid {
            info!(total = summary.total, warnings = summary.total_warnings, "批量校验通过");
        } else {
            warn!(
                total = summary.total,
                invalid = summary.invalid,
                errors = summary.total_errors,
                batch_errors = batch_errors.len(),
                "批量校验未通过"
            );
        }

        BatchValidationReport {
            all_valid,
            batch_errors,
            results,
            summary,
        }
    }

    fn check_assignment(
        &self,
        assignment: &Assignment,
        parts: &HashMap<&str, &Part>,
        members: &HashMap<&str, &Member>,
        appearances: &HashMap<&str, usize>,
        validator: &FamilyValidator<'_>,
        today: NaiveDate,
    ) -> AssignmentCheck {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // === 重复分派 ===
        for id in assignment.member_ids() {
            let count = appearances.get(id).copied().unwrap_or(0);
            if count > 1 {
                errors.push(format!(
                    "DOUBLE_BOOKED: member={} appears in {} assignments",
                    id, count
                ));
            }
        }

        // === 节目与规则 ===
        let rules = match parts.get(assignment.part_id.as_str()) {
            None => {
                errors.push(format!("PART_NOT_FOUND: part={}", assignment.part_id));
                None
            }
            Some(part) => match self.catalog.resolve(part) {
                None => {
                    errors.push(format!(
                        "UNKNOWN_PART_TYPE: part={}, type={}",
                        part.id, part.part_type
                    ));
                    None
                }
                Some(rules) => Some((*part, rules)),
            },
        };

        // === 主讲人 ===
        let principal = match assignment.principal_id.as_deref() {
            None => {
                errors.push("PRINCIPAL_MISSING".to_string());
                None
            }
            Some(id) => match members.get(id) {
                None => {
                    errors.push(format!("MEMBER_NOT_FOUND: principal={}", id));
                    None
                }
                Some(m) => Some(*m),
            },
        };

        if let (Some((part, rules)), Some(principal)) = (rules, principal) {
            errors.extend(
                EligibilityCore::failures(principal, rules, today)
                    .into_iter()
                    .map(|f| format!("principal={}: {}", principal.id, f)),
            );
            self.history_warnings(principal, part, rules, today, &mut warnings);
        }

        // === 助手 ===
        if let Some((_, rules)) = rules {
            self.check_assistant(
                assignment,
                rules,
                principal,
                members,
                validator,
                &mut errors,
                &mut warnings,
            );
        }

        AssignmentCheck {
            assignment_id: assignment.id.clone(),
            part_id: assignment.part_id.clone(),
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_assistant(
        &self,
        assignment: &Assignment,
        rules: &RuleSet,
        principal: Option<&Member>,
        members: &HashMap<&str, &Member>,
        validator: &FamilyValidator<'_>,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let Some(assistant_id) = assignment.assistant_id.as_deref() else {
            if rules.assistant_required {
                errors.push(format!(
                    "ASSISTANT_MISSING: part type {} requires an assistant",
                    rules.part_type
                ));
            }
            return;
        };

        if !rules.assistant_required {
            warnings.push(format!(
                "ASSISTANT_NOT_REQUIRED: part type {} does not need an assistant",
                rules.part_type
            ));
        }
        if assignment.principal_id.as_deref() == Some(assistant_id) {
            errors.push(format!("ASSISTANT_IS_PRINCIPAL: member={}", assistant_id));
            return;
        }

        let Some(assistant) = members.get(assistant_id).copied() else {
            errors.push(format!("MEMBER_NOT_FOUND: assistant={}", assistant_id));
            return;
        };
        if !assistant.active {
            errors.push(format!("ASSISTANT_INACTIVE: member={}", assistant_id));
        }

        let Some(principal) = principal else {
            return;
        };

        // 策略 None 只禁止未成年人异性配对
        let pairing = validator.validate_pair(principal, assistant);
        let rejected = match rules.assistant_policy {
            AssistantGenderPolicy::SameGenderOnly => {
                pairing.classification != PairClassification::SameGender
            }
            AssistantGenderPolicy::SameGenderOrFamily => !pairing.compliant,
            AssistantGenderPolicy::None => {
                pairing.classification == PairClassification::MinorMixedGender
            }
        };
        if rejected {
            if pairing.violations.is_empty() {
                errors.push(format!(
                    "PAIRING_VIOLATION: {} requires a same-gender assistant ({} / {}, {})",
                    rules.part_type, principal.id, assistant.id, pairing.classification
                ));
            } else {
                errors.extend(
                    pairing
                        .violations
                        .iter()
                        .map(|v| format!("PAIRING_VIOLATION: {}", v)),
                );
            }
        }
        if pairing.classification == PairClassification::IndirectFamily {
            warnings.extend(pairing.warnings);
        }
    }

    /// 历史相关警告（不阻断持久化）
    ///
    /// # 规则
    /// - 距上次分派不足冷却期 → RECENT_ASSIGNMENT
    /// - 冷却期取节目规则的 cooldown_weeks;为 0 时回退到全局 recent_assignment_warning_days
    fn history_warnings(
        &self,
        principal: &Member,
        part: &Part,
        rules: &RuleSet,
        today: NaiveDate,
        warnings: &mut Vec<String>,
    ) {
        let history = &principal.history;
        let meeting_date = part.meeting_date.unwrap_or(today);
        let cooldown_days = match rules.cooldown_weeks {
            0 => self.config.recent_assignment_warning_days,
            weeks => i64::from(weeks) * 7,
        };

        if let Some(last) = history.last_assignment_date {
            let days = (meeting_date - last).num_days();
            if (0..cooldown_days).contains(&days) {
                warnings.push(format!(
                    "RECENT_ASSIGNMENT: member={} assigned {} days before ({}), cooldown {} days",
                    principal.id,
                    days,
                    history.last_assignment_label.as_deref().unwrap_or("unknown part"),
                    cooldown_days
                ));
            }
        }
        if history.recent_count >= self.config.overload_recent_threshold {
            warnings.push(format!(
                "OVERLOADED: member={} has {} recent assignments",
                principal.id, history.recent_count
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assignment::AssignmentStatus;
    use crate::domain::member::AssignmentHistory;
    use crate::domain::part::PartType;
    use crate::domain::types::{Gender, Qualifications, RoleTier};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn member(id: &str, gender: Gender, quals: Qualifications) -> Member {
        Member {
            id: id.to_string(),
            name: id.to_string(),
            family_name: None,
            gender,
            role: RoleTier::RegularPublisher,
            active: true,
            minor: false,
            birth_date: None,
            marital_status: None,
            qualifications: quals,
            parent1_id: None,
            parent2_id: None,
            spouse_id: None,
            history: AssignmentHistory::default(),
        }
    }

    fn part(id: &str, part_type: &str) -> Part {
        Part {
            id: id.to_string(),
            part_type: part_type.to_string(),
            title: part_type.to_string(),
            instructions: None,
            duration_minutes: 4,
            section: None,
            week: "2026-W42".to_string(),
            meeting_date: Some(today()),
        }
    }

    fn assignment(part_id: &str, principal: Option<&str>, assistant: Option<&str>) -> Assignment {
        Assignment {
            id: format!("2026-W42:{}", part_id),
            part_id: part_id.to_string(),
            resolved_type: None,
            principal_id: principal.map(str::to_string),
            assistant_id: assistant.map(str::to_string),
            status: AssignmentStatus::Assigned,
            rationale: String::new(),
            alternatives_considered: 0,
            notes: Vec::new(),
        }
    }

    fn validator() -> BatchValidator {
        BatchValidator::new(Arc::new(RuleCatalog::standard()), EngineConfig::default())
    }

    #[test]
    fn test_valid_batch_passes_gate() {
        let members = vec![
            member("B1", Gender::Male, Qualifications::READING),
            member("S1", Gender::Female, Qualifications::STARTING),
            member("S2", Gender::Female, Qualifications::empty()),
        ];
        let parts = vec![part("P1", "bible_reading"), part("P2", "starting_conversation")];
        let batch = vec![
            assignment("P1", Some("B1"), None),
            assignment("P2", Some("S1"), Some("S2")),
        ];

        let report = validator().validate_batch(&batch, &parts, &members, &[], today());
        assert!(report.all_valid);
        assert_eq!(report.summary.valid, 2);
        assert!(report.gate().is_ok());
    }

    #[test]
    fn test_reports_every_failure_and_rejects_batch() {
        let members = vec![
            member("S1", Gender::Female, Qualifications::empty()),
            member("B1", Gender::Male, Qualifications::empty()),
        ];
        let parts = vec![part("P1", "bible_reading"), part("P2", "starting_conversation")];
        let batch = vec![
            assignment("P1", Some("S1"), None),
            assignment("P2", Some("B1"), Some("S1")),
        ];

        let report = validator().validate_batch(&batch, &parts, &members, &[], today());
        assert!(!report.all_valid);

        let first = &report.results[0];
        // 性别 + 资格 + 重复分派
        assert_eq!(first.errors.len(), 3);
        assert!(first.errors.iter().any(|e| e.starts_with("DOUBLE_BOOKED")));

        let second = &report.results[1];
        assert!(second.errors.iter().any(|e| e.contains("UNRELATED_MIXED_GENDER")));

        let err = report.gate().unwrap_err();
        assert_eq!(err.violations().len(), report.summary.total_errors);
        assert!(err.violations()[0].starts_with("2026-W42:P1: "));
    }

    #[test]
    fn test_structural_errors() {
        let members = vec![member("S1", Gender::Female, Qualifications::FOLLOWING)];
        let parts = vec![part("P1", "following_up"), part("P2", "song")];
        let batch = vec![
            assignment("P1", Some("S1"), Some("S1")),
            assignment("P2", None, None),
            assignment("P9", Some("GHOST"), None),
        ];

        let report = validator().validate_batch(&batch, &parts, &members, &[], today());
        assert!(report.results[0]
            .errors
            .iter()
            .any(|e| e.starts_with("ASSISTANT_IS_PRINCIPAL")));
        assert!(report.results[1]
            .errors
            .iter()
            .any(|e| e.starts_with("UNKNOWN_PART_TYPE")));
        assert!(report.results[1].errors.contains(&"PRINCIPAL_MISSING".to_string()));
        assert!(report.results[2]
            .errors
            .iter()
            .any(|e| e.starts_with("PART_NOT_FOUND")));
        assert!(report.results[2]
            .errors
            .iter()
            .any(|e| e.starts_with("MEMBER_NOT_FOUND")));
    }

    #[test]
    fn test_non_blocking_warnings() {
        let mut reader = member("B1", Gender::Male, Qualifications::READING);
        reader.history.last_assignment_date = NaiveDate::from_ymd_opt(2026, 10, 11);
        reader.history.last_assignment_label = Some("Bible Reading".to_string());
        reader.history.recent_count = 3;
        let helper = member("B2", Gender::Male, Qualifications::empty());

        let parts = vec![part("P1", "bible_reading")];
        let batch = vec![assignment("P1", Some("B1"), Some("B2"))];

        let report =
            validator().validate_batch(&batch, &parts, &[reader, helper], &[], today());
        let result = &report.results[0];

        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.starts_with("RECENT_ASSIGNMENT")));
        assert!(result.warnings.iter().any(|w| w.starts_with("OVERLOADED")));
        assert!(result.warnings.iter().any(|w| w.starts_with("ASSISTANT_NOT_REQUIRED")));
        assert!(report.gate().is_ok());
    }

    #[test]
    fn test_recent_assignment_uses_part_cooldown() {
        let mut reader = member("B1", Gender::Male, Qualifications::READING);
        reader.history.last_assignment_date = NaiveDate::from_ymd_opt(2026, 9, 28);
        let mut sister = member("S1", Gender::Female, Qualifications::STARTING);
        sister.history.last_assignment_date = NaiveDate::from_ymd_opt(2026, 9, 28);
        let helper = member("S2", Gender::Female, Qualifications::empty());

        let parts = vec![part("P1", "bible_reading"), part("P2", "starting_conversation")];
        let batch = vec![
            assignment("P1", Some("B1"), None),
            assignment("P2", Some("S1"), Some("S2")),
        ];

        // 20 天前: 读经冷却 4 周内,初次交谈冷却 2 周外
        let report =
            validator().validate_batch(&batch, &parts, &[reader, sister, helper], &[], today());
        assert!(report.results[0]
            .warnings
            .iter()
            .any(|w| w.starts_with("RECENT_ASSIGNMENT") && w.contains("cooldown 28 days")));
        assert!(report.results[1].warnings.is_empty());
        assert!(report.all_valid);
    }

    #[test]
    fn test_zero_cooldown_falls_back_to_config_window() {
        let standard = RuleCatalog::standard();
        let mut reading = standard.rules_for(PartType::BibleReading).unwrap().clone();
        reading.cooldown_weeks = 0;
        let catalog = Arc::new(RuleCatalog::from_rules(vec![reading]));

        let mut reader = member("B1", Gender::Male, Qualifications::READING);
        reader.history.last_assignment_date = NaiveDate::from_ymd_opt(2026, 9, 28);
        let parts = vec![part("P1", "bible_reading")];
        let batch = vec![assignment("P1", Some("B1"), None)];

        let report = BatchValidator::new(catalog.clone(), EngineConfig::default())
            .validate_batch(&batch, &parts, &[reader.clone()], &[], today());
        assert!(report.results[0].warnings.is_empty());

        let config = EngineConfig {
            recent_assignment_warning_days: 21,
            ..EngineConfig::default()
        };
        let report = BatchValidator::new(catalog, config)
            .validate_batch(&batch, &parts, &[reader], &[], today());
        assert!(report.results[0]
            .warnings
            .iter()
            .any(|w| w.contains("cooldown 21 days")));
    }

    #[test]
    fn test_duplicate_roster_ids_reject_batch() {
        let reader = member("B1", Gender::Male, Qualifications::READING);
        // 同 id 的第二条记录没有资格
        let shadow = member("B1", Gender::Male, Qualifications::empty());
        let parts = vec![part("P1", "bible_reading")];
        let batch = vec![assignment("P1", Some("B1"), None)];

        let report = validator().validate_batch(&batch, &parts, &[reader, shadow], &[], today());
        assert!(report.results[0].valid, "{:?}", report.results[0].errors);
        assert!(!report.all_valid);
        assert_eq!(
            report.batch_errors,
            vec!["DUPLICATE_MEMBER: id=B1 appears 2 times in roster".to_string()]
        );
        assert_eq!(report.summary.total_errors, 1);

        let err = report.gate().unwrap_err();
        assert_eq!(err.violations(), ["batch: DUPLICATE_MEMBER: id=B1 appears 2 times in roster"]);
    }

    #[test]
    fn test_same_gender_only_rejects_spouses() {
        let mut husband = member("H", Gender::Male, Qualifications::empty());
        husband.spouse_id = Some("W".to_string());
        let mut wife = member("W", Gender::Female, Qualifications::MAKING);
        wife.spouse_id = Some("H".to_string());

        let parts = vec![part("P1", "making_disciples"), part("P2", "starting_conversation")];
        let mut wife_starting = wife.clone();
        wife_starting.qualifications = Qualifications::MAKING | Qualifications::STARTING;

        let report = validator().validate_batch(
            &[assignment("P1", Some("W"), Some("H"))],
            &parts,
            &[husband.clone(), wife],
            &[],
            today(),
        );
        assert!(report.results[0]
            .errors
            .iter()
            .any(|e| e.starts_with("PAIRING_VIOLATION")));

        let report = validator().validate_batch(
            &[assignment("P2", Some("W"), Some("H"))],
            &parts,
            &[husband, wife_starting],
            &[],
            today(),
        );
        assert!(report.all_valid);
    }
}
