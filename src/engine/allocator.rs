// ==========================================
// 聚会节目分派引擎 - 分派器（核心循环）
// ==========================================
// 职责: 按节目顺序筛选候选 → 决胜选主讲人 → 配对助手 → 标记已用
// 红线: 每个输入节目恰好输出一条 Assignment,单个节目失败不中断运行
// 红线: 同一次运行中,任何成员最多出现在一条 Assignment 中
// 并发: 节目之间有顺序依赖,单线程顺序处理;不同运行之间互不共享可变状态
// ==========================================

use crate::config::EngineConfig;
use crate::domain::assignment::{
    AllocationOutcome, AllocationStatistics, Assignment, AssignmentStatus,
};
use crate::domain::family::FamilyLink;
use crate::domain::member::Member;
use crate::domain::part::Part;
use crate::engine::candidate_pool::CandidatePool;
use crate::engine::eligibility::EligibilityCore;
use crate::engine::error::EngineError;
use crate::engine::family_graph::FamilyGraph;
use crate::engine::family_validator::FamilyValidator;
use crate::engine::rule_catalog::{RuleCatalog, RuleSet};
use crate::engine::tie_break::TieBreaker;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// AllocationRequest - 一次分派运行的输入
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// 成员名册（缺失为致命错误,空列表合法）
    #[serde(default)]
    pub members: Option<Vec<Member>>,

    /// 有序节目列表（顺序有意义: 靠前的节目先挑选）
    #[serde(default)]
    pub parts: Option<Vec<Part>>,

    #[serde(default)]
    pub family_links: Vec<FamilyLink>,

    /// 年龄计算参考日期（缺省为当天）
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

impl AllocationRequest {
    pub fn new(members: Vec<Member>, parts: Vec<Part>) -> Self {
        Self {
            members: Some(members),
            parts: Some(parts),
            family_links: Vec::new(),
            reference_date: None,
        }
    }

    pub fn with_links(mut self, links: Vec<FamilyLink>) -> Self {
        self.family_links = links;
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }
}

// ==========================================
// Allocator - 分派器
// ==========================================
pub struct Allocator {
    catalog: Arc<RuleCatalog>,
    config: EngineConfig,
    tie_breaker: TieBreaker,
}

impl Allocator {
    /// 创建分派器
    ///
    /// # 参数
    /// - catalog: 规则目录（与 BatchValidator 共享同一实例）
    /// - config: 引擎配置（决定公平轮换实现）
    pub fn new(catalog: Arc<RuleCatalog>, config: EngineConfig) -> Self {
        let tie_breaker = TieBreaker::from_mode(config.fairness_mode);
        Self {
            catalog,
            config,
            tie_breaker,
        }
    }

    pub fn catalog(&self) -> &Arc<RuleCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 校验请求结构并执行一次完整分派
    ///
    /// # 返回
    /// - Ok(AllocationOutcome): 每个节目一条 Assignment（可能含未分派项）
    /// - Err(EngineError): 请求结构错误,未做任何处理
    #[instrument(skip_all)]
    pub fn run(&self, request: AllocationRequest) -> Result<AllocationOutcome, EngineError> {
        let members = request
            .members
            .ok_or_else(|| EngineError::InvalidInput("缺少成员名册 (members)".to_string()))?;
        let parts = request
            .parts
            .ok_or_else(|| EngineError::InvalidInput("缺少节目列表 (parts)".to_string()))?;

        ensure_unique("member", members.iter().map(|m| m.id.as_str()))?;
        ensure_unique("part", parts.iter().map(|p| p.id.as_str()))?;

        let today = request
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());

        for member in &members {
            for warning in member.integrity_warnings(today) {
                warn!(%warning, "成员数据问题");
            }
        }

        let graph = FamilyGraph::build(&members, &request.family_links);
        for warning in graph.warnings() {
            warn!(%warning, "家庭关系数据问题");
        }

        Ok(self.allocate(&members, &parts, &graph, today))
    }

    /// 分派主循环
    ///
    /// # 参数
    /// - `members`: 名册（非活跃成员在候选池构建时排除）
    /// - `parts`: 有序节目列表
    /// - `graph`: 家庭关系图（用于助手配对校验）
    /// - `today`: 年龄计算参考日期
    #[instrument(skip_all, fields(
        members = members.len(),
        parts = parts.len(),
        fairness = self.tie_breaker.fairness_name()
    ))]
    pub fn allocate(
        &self,
        members: &[Member],
        parts: &[Part],
        graph: &FamilyGraph,
        today: NaiveDate,
    ) -> AllocationOutcome {
        let pool = CandidatePool::build(members);
        let validator = FamilyValidator::new(graph);
        let mut used: HashSet<&str> = HashSet::new();
        let mut assignments = Vec::with_capacity(parts.len());
        let mut conflicts = Vec::new();
        let mut distribution = BTreeMap::new();

        info!(
            available = pool.len(),
            config = %self.config.snapshot_json(),
            "开始分派"
        );

        for part in parts {
            let assignment =
                self.allocate_part(part, &pool, &validator, &mut used, &mut conflicts, today);

            for member_id in assignment.member_ids() {
                if let Some(member) = pool.all().iter().find(|m| m.id == member_id) {
                    *distribution.entry(member.role).or_insert(0) += 1;
                }
            }
            assignments.push(assignment);
        }

        let parts_assigned = assignments
            .iter()
            .filter(|a| a.principal_id.is_some())
            .count();
        let members_without_assignment: Vec<String> = pool
            .all()
            .iter()
            .filter(|m| !used.contains(m.id.as_str()))
            .map(|m| m.id.clone())
            .collect();

        info!(
            parts = parts.len(),
            assigned = parts_assigned,
            conflicts = conflicts.len(),
            idle_members = members_without_assignment.len(),
            "分派完成"
        );

        AllocationOutcome {
            assignments,
            statistics: AllocationStatistics {
                total_members_available: pool.len(),
                parts_assigned,
                distribution_by_role: distribution,
                members_without_assignment,
                conflicts,
            },
        }
    }

    fn allocate_part<'a>(
        &self,
        part: &Part,
        pool: &CandidatePool<'a>,
        validator: &FamilyValidator<'_>,
        used: &mut HashSet<&'a str>,
        conflicts: &mut Vec<String>,
        today: NaiveDate,
    ) -> Assignment {
        let mut assignment = Assignment {
            id: format!("{}:{}", part.week, part.id),
            part_id: part.id.clone(),
            resolved_type: None,
            principal_id: None,
            assistant_id: None,
            status: AssignmentStatus::NoEligibleCandidate,
            rationale: String::new(),
            alternatives_considered: 0,
            notes: Vec::new(),
        };

        // === 1. 解析规则 ===
        let Some(rules) = self.catalog.resolve(part) else {
            let conflict = format!(
                "UNKNOWN_PART_TYPE: part={}, type={}",
                part.id, part.part_type
            );
            warn!(part_id = %part.id, part_type = %part.part_type, "节目类型无规则");
            assignment.rationale = "no rule set for part type".to_string();
            assignment.notes.push(conflict.clone());
            conflicts.push(conflict);
            return assignment;
        };
        assignment.resolved_type = Some(rules.part_type.to_string());

        // === 2. 筛选主讲人候选 ===
        let candidates = Self::eligible_principals(pool, rules, used, today);
        assignment.alternatives_considered = candidates.len();

        // === 3. 无候选: 记录冲突后继续 ===
        // === 4. 决胜选择主讲人 ===
        let Some(selection) = self
            .tie_breaker
            .select_principal(rules.tie_break, &candidates)
        else {
            let conflict = format!(
                "NO_ELIGIBLE_CANDIDATE: part={}, type={}",
                part.id, rules.part_type
            );
            warn!(part_id = %part.id, part_type = %rules.part_type, "无合格主讲人");
            assignment.rationale = "no eligible candidate".to_string();
            assignment.notes.push(conflict.clone());
            conflicts.push(conflict);
            return assignment;
        };

        let principal = candidates[selection.index];
        used.insert(principal.id.as_str());
        assignment.principal_id = Some(principal.id.clone());
        assignment.rationale = selection.rationale;
        assignment.status = AssignmentStatus::Assigned;

        // === 5. 助手配对 ===
        if rules.assistant_required {
            let assistants: Vec<&Member> = pool
                .all()
                .iter()
                .copied()
                .filter(|m| !used.contains(m.id.as_str()))
                .filter(|m| validator.check_assistant(rules.assistant_policy, principal, m))
                .collect();

            match self.tie_breaker.select_fair(&assistants) {
                Some(pick) => {
                    let assistant = assistants[pick.index];
                    let pairing = validator.validate_pair(principal, assistant);
                    used.insert(assistant.id.as_str());
                    assignment.assistant_id = Some(assistant.id.clone());
                    assignment
                        .notes
                        .push(format!("assistant pairing: {}", pairing.classification));
                    assignment.notes.extend(pairing.warnings);
                }
                None => {
                    let conflict = format!(
                        "ASSISTANT_MISSING: part={}, principal={}, policy={:?}",
                        part.id, principal.id, rules.assistant_policy
                    );
                    warn!(part_id = %part.id, principal = %principal.id, "无合规助手");
                    assignment.status = AssignmentStatus::AssistantMissing;
                    assignment.notes.push(conflict.clone());
                    conflicts.push(conflict);
                }
            }
        }

        debug!(
            part_id = %part.id,
            part_type = %rules.part_type,
            principal = ?assignment.principal_id,
            assistant = ?assignment.assistant_id,
            alternatives = assignment.alternatives_considered,
            rationale = %assignment.rationale,
            "节目分派决策"
        );

        assignment
    }

    /// 基础分区 → 排除已用 → 资格谓词（逻辑与）
    fn eligible_principals<'a>(
        pool: &CandidatePool<'a>,
        rules: &RuleSet,
        used: &HashSet<&'a str>,
        today: NaiveDate,
    ) -> Vec<&'a Member> {
        pool.base_partition(rules)
            .iter()
            .copied()
            .filter(|m| !used.contains(m.id.as_str()))
            .filter(|m| EligibilityCore::is_eligible(m, rules, today))
            .collect()
    }
}

/// ID 唯一性检查
fn ensure_unique<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), EngineError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(EngineError::InvalidInput(format!("{} id 为空", kind)));
        }
        if !seen.insert(id) {
            return Err(EngineError::DuplicateId {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
    }
    Ok(())
}
