// ==========================================
// 聚会节目分派引擎 - 家庭关系推断
// ==========================================
// 职责: 按姓氏/年龄模式推断父母子女、配偶关系（带置信度评分）
// 红线: 推断只产生提议,不修改图;应用前必须经 validate_inferences
// 红线: apply_inferences 为演练（dry-run）,返回成员副本,不回写
// ==========================================

use crate::config::InferenceConfig;
use crate::domain::family::{
    Confidence, InferenceEvidence, InferredRelation, InferredRelationship,
};
use crate::domain::member::Member;
use crate::domain::types::MaritalStatus;
use crate::engine::family_graph::FamilyGraph;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, instrument};

// ==========================================
// 推断输出结构
// ==========================================

/// 候选夫妻
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialCouple {
    pub first_id: String,
    pub second_id: String,
    pub score: u32,
}

/// 按姓氏分析出的家庭分组
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyGroup {
    pub surname: String,
    pub member_ids: Vec<String>,   // 年长者在前
    pub parents: Vec<String>,      // 年龄 >= parent_min_age
    pub children: Vec<String>,     // 年龄 < adult_age
    pub adult_children: Vec<String>,
    pub potential_couples: Vec<PotentialCouple>,
    pub confidence_score: u32,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceStatistics {
    pub members_analysed: usize,
    pub members_without_birth_date: usize,
    pub families_detected: usize,
    pub relationships_inferred: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub potential_issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    /// 按分数降序
    pub proposals: Vec<InferredRelationship>,
    pub groups: Vec<FamilyGroup>,
    pub statistics: InferenceStatistics,
}

/// 推断冲突类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceConflictKind {
    ExistingRelationship,
    AgeViolation,
    GenderViolation,
    LogicViolation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConflict {
    pub kind: InferenceConflictKind,
    pub proposal: InferredRelationship,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceValidation {
    pub valid: Vec<InferredRelationship>,
    pub conflicts: Vec<InferenceConflict>,
}

/// apply_inferences 的演练结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedInferences {
    pub members: Vec<Member>,
    pub changes: Vec<String>,
    pub skipped: Vec<String>,
}

/// 分组内带年龄的成员视图
struct Aged<'a> {
    member: &'a Member,
    age: u32,
}

// ==========================================
// FamilyInferenceEngine
// ==========================================
pub struct FamilyInferenceEngine {
    config: InferenceConfig,
}

impl FamilyInferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    /// 推断家庭关系
    ///
    /// # 参数
    /// - `members`: 名册（出生日期缺失的成员不参与推断）
    /// - `today`: 年龄计算参考日期
    #[instrument(skip_all, fields(members = members.len()))]
    pub fn infer(&self, members: &[Member], today: NaiveDate) -> InferenceResult {
        let mut without_birth_date = 0;
        let mut by_surname: BTreeMap<String, Vec<Aged>> = BTreeMap::new();

        for member in members {
            let Some(age) = member.age_on(today) else {
                without_birth_date += 1;
                continue;
            };
            match member.surname() {
                Some(surname) if surname.chars().count() > 1 => by_surname
                    .entry(surname.to_string())
                    .or_default()
                    .push(Aged { member, age }),
                _ => {}
            }
        }

        let mut groups = Vec::new();
        let mut proposals = Vec::new();
        let mut grouped_members = 0;

        for (surname, mut aged) in by_surname {
            if aged.len() < 2 {
                continue;
            }
            grouped_members += aged.len();

            // 年长者在前,同龄保持输入顺序
            aged.sort_by(|a, b| b.age.cmp(&a.age));
            let group = self.analyse_group(&surname, &aged);
            proposals.extend(self.extract_relationships(&group, &aged));
            groups.push(group);
        }

        proposals.sort_by(|a, b| b.score.cmp(&a.score));

        let statistics = self.statistics(
            members.len(),
            without_birth_date,
            grouped_members,
            &groups,
            &proposals,
        );

        info!(
            families = statistics.families_detected,
            proposals = statistics.relationships_inferred,
            high = statistics.high_confidence,
            "家庭关系推断完成"
        );

        InferenceResult {
            proposals,
            groups,
            statistics,
        }
    }

    fn analyse_group(&self, surname: &str, aged: &[Aged]) -> FamilyGroup {
        let mut parents = Vec::new();
        let mut children = Vec::new();
        let mut adult_children = Vec::new();

        for a in aged {
            if a.age >= self.config.parent_min_age {
                parents.push(a);
            } else if a.age < self.config.adult_age {
                children.push(a);
            } else {
                adult_children.push(a);
            }
        }

        let potential_couples = self.potential_couples(&parents);

        // === 家庭置信度 ===
        let mut score = 0;
        if aged.len() >= 3 {
            score += 20;
        }
        if aged.len() >= 4 {
            score += 10;
        }
        if !parents.is_empty() && !children.is_empty() {
            score += 30;
        }
        if potential_couples.first().map_or(false, |c| c.score >= 70) {
            score += 25;
        }
        let span = aged.first().map_or(0, |a| a.age) - aged.last().map_or(0, |a| a.age);
        if (15..=50).contains(&span) {
            score += 15;
        }
        let confidence = if score >= 70 {
            Confidence::High
        } else if score >= 40 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        let ids = |list: &[&Aged]| list.iter().map(|a| a.member.id.clone()).collect::<Vec<_>>();

        FamilyGroup {
            surname: surname.to_string(),
            member_ids: aged.iter().map(|a| a.member.id.clone()).collect(),
            parents: ids(&parents),
            children: ids(&children),
            adult_children: ids(&adult_children),
            potential_couples,
            confidence_score: score,
            confidence,
        }
    }

    /// 父母候选中的异性配对评分（>= 50 保留,按分数降序）
    fn potential_couples(&self, parents: &[&Aged]) -> Vec<PotentialCouple> {
        let mut couples = Vec::new();

        for (i, a) in parents.iter().enumerate() {
            for b in &parents[i + 1..] {
                if a.member.gender == b.member.gender {
                    continue;
                }

                let gap = a.age.abs_diff(b.age);
                let mut score = 0;
                if gap <= 5 {
                    score += 40;
                } else if gap <= 10 {
                    score += 25;
                } else if gap <= self.config.max_spouse_gap {
                    score += 10;
                }
                if a.age >= self.config.parent_min_age && b.age >= self.config.parent_min_age {
                    score += 30;
                }
                score += 20; // 异性
                if both_married(a.member, b.member) {
                    score += 10;
                }

                if score >= 50 {
                    couples.push(PotentialCouple {
                        first_id: a.member.id.clone(),
                        second_id: b.member.id.clone(),
                        score,
                    });
                }
            }
        }

        couples.sort_by(|a, b| b.score.cmp(&a.score));
        couples
    }

    fn extract_relationships(
        &self,
        group: &FamilyGroup,
        aged: &[Aged],
    ) -> Vec<InferredRelationship> {
        let by_id: HashMap<&str, &Aged> = aged.iter().map(|a| (a.member.id.as_str(), a)).collect();
        let lookup = |id: &String| by_id.get(id.as_str()).copied();

        let mut out = Vec::new();

        for parent in group.parents.iter().filter_map(lookup) {
            for child in group
                .children
                .iter()
                .chain(group.adult_children.iter())
                .filter_map(lookup)
            {
                if child.member.is_parent(&parent.member.id) {
                    continue;
                }
                if let Some(proposal) = self.infer_parent_child(parent, child, group) {
                    out.push(proposal);
                }
            }
        }

        for couple in &group.potential_couples {
            let (Some(a), Some(b)) = (
                by_id.get(couple.first_id.as_str()),
                by_id.get(couple.second_id.as_str()),
            ) else {
                continue;
            };
            if a.member.spouse_id.as_deref() == Some(b.member.id.as_str()) {
                continue;
            }
            if let Some(proposal) = self.infer_spouse(a, b, group, couple.score) {
                out.push(proposal);
            }
        }

        out
    }

    fn infer_parent_child(
        &self,
        parent: &Aged,
        child: &Aged,
        group: &FamilyGroup,
    ) -> Option<InferredRelationship> {
        let gap = parent.age.checked_sub(child.age)?;
        if gap < self.config.min_parent_gap {
            return None;
        }

        let mut score = 0;
        let mut reasoning = Vec::new();
        let age_compatible = gap <= self.config.max_parent_gap;

        if age_compatible {
            score += 30;
            reasoning.push(format!("appropriate age gap ({} years)", gap));
        }
        score += 25;
        reasoning.push(format!("same surname: {}", group.surname));
        if parent.age >= self.config.parent_min_age {
            score += 20;
            reasoning.push("parent age plausible".to_string());
        }
        if child.age < self.config.parent_min_age {
            score += 15;
            reasoning.push("child age plausible".to_string());
        }
        if group.confidence == Confidence::High {
            score += 10;
            reasoning.push("consistent family structure".to_string());
        }

        if score < 50 {
            return None;
        }

        let confidence = if score >= 80 {
            Confidence::High
        } else if score >= 65 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        debug!(
            child = %child.member.id,
            parent = %parent.member.id,
            score,
            "推断父母子女关系"
        );

        Some(InferredRelationship {
            subject_id: child.member.id.clone(),
            object_id: parent.member.id.clone(),
            relation: InferredRelation::ChildOf,
            confidence,
            score,
            reasoning,
            evidence: InferenceEvidence {
                same_surname: true,
                age_compatible,
                gender_compatible: true,
                role_compatible: parent.age >= self.config.parent_min_age
                    && child.age < self.config.parent_min_age,
                existing_family_structure: group.confidence != Confidence::Low,
            },
        })
    }

    fn infer_spouse(
        &self,
        a: &Aged,
        b: &Aged,
        group: &FamilyGroup,
        couple_score: u32,
    ) -> Option<InferredRelationship> {
        if a.member.gender == b.member.gender {
            return None;
        }

        let mut score = couple_score * 8 / 10;
        let mut reasoning = vec!["different genders".to_string()];
        score += 20;

        let gap = a.age.abs_diff(b.age);
        if gap <= 10 {
            score += 15;
            reasoning.push(format!("compatible ages (gap {} years)", gap));
        }
        let both_adult = a.age >= self.config.adult_age && b.age >= self.config.adult_age;
        if both_adult {
            score += 10;
            reasoning.push("both adults".to_string());
        }
        if both_married(a.member, b.member) {
            score += 15;
            reasoning.push("both marked as married".to_string());
        }
        score += 10;
        reasoning.push(format!("same surname: {}", group.surname));

        if score < 60 {
            return None;
        }

        let confidence = if score >= 85 {
            Confidence::High
        } else if score >= 70 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        Some(InferredRelationship {
            subject_id: a.member.id.clone(),
            object_id: b.member.id.clone(),
            relation: InferredRelation::Spouse,
            confidence,
            score,
            reasoning,
            evidence: InferenceEvidence {
                same_surname: true,
                age_compatible: gap <= self.config.max_spouse_gap,
                gender_compatible: true,
                role_compatible: both_adult,
                existing_family_structure: group.confidence != Confidence::Low,
            },
        })
    }

    fn statistics(
        &self,
        total: usize,
        without_birth_date: usize,
        grouped_members: usize,
        groups: &[FamilyGroup],
        proposals: &[InferredRelationship],
    ) -> InferenceStatistics {
        let count = |level: Confidence| proposals.iter().filter(|p| p.confidence == level).count();

        let mut potential_issues = Vec::new();
        if without_birth_date > 0 {
            potential_issues.push(format!(
                "{} members have no birth date and were not analysed",
                without_birth_date
            ));
        }
        let ungrouped = total - without_birth_date - grouped_members;
        if ungrouped > 0 {
            potential_issues.push(format!("{} members were not grouped into a family", ungrouped));
        }
        let unclear = groups
            .iter()
            .filter(|g| g.confidence == Confidence::Low)
            .count();
        if unclear > 0 {
            potential_issues.push(format!("{} families with an unclear structure", unclear));
        }
        let wide_gap_couples = proposals
            .iter()
            .filter(|p| p.relation == InferredRelation::Spouse && !p.evidence.age_compatible)
            .count();
        if wide_gap_couples > 0 {
            potential_issues.push(format!(
                "{} couples with a significant age gap",
                wide_gap_couples
            ));
        }

        InferenceStatistics {
            members_analysed: total - without_birth_date,
            members_without_birth_date: without_birth_date,
            families_detected: groups.len(),
            relationships_inferred: proposals.len(),
            high_confidence: count(Confidence::High),
            medium_confidence: count(Confidence::Medium),
            low_confidence: count(Confidence::Low),
            potential_issues,
        }
    }

    // ==========================================
    // 提议校验
    // ==========================================

    /// 对照已有关系校验推断提议
    ///
    /// # 规则
    /// - 成员不存在 / 自指 / 会形成祖先环 → logic_violation
    /// - 配偶: 同性别 → gender_violation;任一方已有其他配偶 → existing_relationship
    /// - 父母子女: 父母不比子女年长 → age_violation;
    ///   子女已有两位父母、已有同性别父母、或双方已有其他关系 → existing_relationship
    /// - 同一批次中先通过的提议参与后续判断（不会给同一人两个推断配偶）
    #[instrument(skip_all, fields(proposals = proposals.len()))]
    pub fn validate_inferences(
        &self,
        proposals: &[InferredRelationship],
        members: &[Member],
        graph: &FamilyGraph,
        today: NaiveDate,
    ) -> InferenceValidation {
        let by_id: HashMap<&str, &Member> = members.iter().map(|m| (m.id.as_str(), m)).collect();
        let mut pending_spouse: HashMap<String, String> = HashMap::new();
        let mut pending_parents: HashMap<String, Vec<String>> = HashMap::new();
        let mut result = InferenceValidation::default();

        for proposal in proposals {
            let check = match (
                by_id.get(proposal.subject_id.as_str()),
                by_id.get(proposal.object_id.as_str()),
            ) {
                (Some(subject), Some(object)) => match proposal.relation {
                    InferredRelation::Spouse => {
                        self.check_spouse(subject, object, graph, &pending_spouse)
                    }
                    InferredRelation::ChildOf => self.check_parent_child(
                        subject,
                        object,
                        graph,
                        &by_id,
                        &pending_parents,
                        today,
                    ),
                },
                _ => Err((
                    InferenceConflictKind::LogicViolation,
                    format!(
                        "MEMBER_NOT_FOUND: {} or {}",
                        proposal.subject_id, proposal.object_id
                    ),
                )),
            };

            match check {
                Ok(()) => {
                    match proposal.relation {
                        InferredRelation::Spouse => {
                            pending_spouse
                                .insert(proposal.subject_id.clone(), proposal.object_id.clone());
                            pending_spouse
                                .insert(proposal.object_id.clone(), proposal.subject_id.clone());
                        }
                        InferredRelation::ChildOf => pending_parents
                            .entry(proposal.subject_id.clone())
                            .or_default()
                            .push(proposal.object_id.clone()),
                    }
                    result.valid.push(proposal.clone());
                }
                Err((kind, message)) => {
                    debug!(
                        subject = %proposal.subject_id,
                        object = %proposal.object_id,
                        %message,
                        "推断提议冲突"
                    );
                    result.conflicts.push(InferenceConflict {
                        kind,
                        proposal: proposal.clone(),
                        message,
                    });
                }
            }
        }

        info!(
            valid = result.valid.len(),
            conflicts = result.conflicts.len(),
            "推断提议校验完成"
        );
        result
    }

    fn check_spouse(
        &self,
        a: &Member,
        b: &Member,
        graph: &FamilyGraph,
        pending: &HashMap<String, String>,
    ) -> Result<(), (InferenceConflictKind, String)> {
        use InferenceConflictKind::*;

        if a.id == b.id {
            return Err((LogicViolation, format!("SELF_REFERENCE: {}", a.id)));
        }
        if a.gender == b.gender {
            return Err((
                GenderViolation,
                format!("SAME_GENDER_SPOUSE: {} and {}", a.id, b.id),
            ));
        }
        for (m, other) in [(a, b), (b, a)] {
            let recorded = graph.spouse_of(&m.id).or(m.spouse_id.as_deref());
            if let Some(existing) = recorded.or(pending.get(&m.id).map(String::as_str)) {
                return Err((
                    ExistingRelationship,
                    if existing == other.id {
                        format!("ALREADY_SPOUSES: {} and {}", m.id, other.id)
                    } else {
                        format!("SPOUSE_ALREADY_RECORDED: {} is married to {}", m.id, existing)
                    },
                ));
            }
        }
        if let Some(rel) = graph.relationship(&a.id, &b.id) {
            return Err((
                ExistingRelationship,
                format!("ALREADY_RELATED: {} and {} are {}", a.id, b.id, rel.label()),
            ));
        }
        Ok(())
    }

    fn check_parent_child(
        &self,
        child: &Member,
        parent: &Member,
        graph: &FamilyGraph,
        by_id: &HashMap<&str, &Member>,
        pending: &HashMap<String, Vec<String>>,
        today: NaiveDate,
    ) -> Result<(), (InferenceConflictKind, String)> {
        use InferenceConflictKind::*;

        if child.id == parent.id {
            return Err((LogicViolation, format!("SELF_REFERENCE: {}", child.id)));
        }
        if let (Some(child_age), Some(parent_age)) = (child.age_on(today), parent.age_on(today)) {
            if parent_age <= child_age {
                return Err((
                    AgeViolation,
                    format!(
                        "PARENT_NOT_OLDER: parent {} ({}) vs child {} ({})",
                        parent.id, parent_age, child.id, child_age
                    ),
                ));
            }
        }

        let parents: Vec<&str> = child
            .parent_ids()
            .chain(pending.get(&child.id).into_iter().flatten().map(String::as_str))
            .collect();

        if parents.contains(&parent.id.as_str()) {
            return Err((
                ExistingRelationship,
                format!("ALREADY_PARENT: {} is already a parent of {}", parent.id, child.id),
            ));
        }
        if parents.len() >= 2 {
            return Err((
                ExistingRelationship,
                format!("PARENTS_COMPLETE: {} already has two parents", child.id),
            ));
        }
        let same_gender_parent = parents
            .iter()
            .filter_map(|id| by_id.get(id))
            .find(|p| p.gender == parent.gender);
        if let Some(existing) = same_gender_parent {
            return Err((
                ExistingRelationship,
                format!(
                    "PARENT_SLOT_TAKEN: {} already has a {} parent ({})",
                    child.id, parent.gender, existing.id
                ),
            ));
        }
        if let Some(rel) = graph.relationship(&child.id, &parent.id) {
            return Err((
                ExistingRelationship,
                format!("ALREADY_RELATED: {} and {} are {}", child.id, parent.id, rel.label()),
            ));
        }
        if Self::is_ancestor(&child.id, &parent.id, by_id, pending) {
            return Err((
                LogicViolation,
                format!(
                    "WOULD_CREATE_CYCLE: {} is already an ancestor of {}",
                    child.id, parent.id
                ),
            ));
        }
        Ok(())
    }

    /// ancestor 是否已经是 descendant 的祖先（含本批次待定的父母）
    fn is_ancestor(
        ancestor: &str,
        descendant: &str,
        by_id: &HashMap<&str, &Member>,
        pending: &HashMap<String, Vec<String>>,
    ) -> bool {
        let mut stack = vec![descendant.to_string()];
        let mut seen = HashSet::new();

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let recorded = by_id
                .get(current.as_str())
                .into_iter()
                .flat_map(|m| m.parent_ids())
                .map(str::to_string);
            let pending_parents = pending.get(&current).into_iter().flatten().cloned();
            for parent in recorded.chain(pending_parents) {
                if parent == ancestor {
                    return true;
                }
                stack.push(parent);
            }
        }
        false
    }

    // ==========================================
    // 提议应用（演练）
    // ==========================================

    /// 把已校验的提议应用到成员副本上
    ///
    /// # 规则
    /// - 置信度低于 apply_min_confidence 的提议跳过
    /// - 父母子女: 填入第一个空的父母槽位;子女未成年时同步 minor 标记
    /// - 配偶: 双方都没有配偶时才写入
    pub fn apply_inferences(
        &self,
        proposals: &[InferredRelationship],
        members: &[Member],
        today: NaiveDate,
    ) -> AppliedInferences {
        let mut updated = members.to_vec();
        let index: HashMap<String, usize> = updated
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        let mut changes = Vec::new();
        let mut skipped = Vec::new();

        for p in proposals {
            let label = format!("{} {:?} {}", p.subject_id, p.relation, p.object_id);

            if p.confidence < self.config.apply_min_confidence {
                skipped.push(format!("{}: confidence {} below threshold", label, p.confidence));
                continue;
            }
            let (Some(&s), Some(&o)) = (index.get(&p.subject_id), index.get(&p.object_id)) else {
                skipped.push(format!("{}: member not found", label));
                continue;
            };

            match p.relation {
                InferredRelation::ChildOf => {
                    let child = &mut updated[s];
                    if child.is_parent(&p.object_id) {
                        skipped.push(format!("{}: already recorded", label));
                        continue;
                    }
                    if child.parent1_id.is_none() {
                        child.parent1_id = Some(p.object_id.clone());
                    } else if child.parent2_id.is_none() {
                        child.parent2_id = Some(p.object_id.clone());
                    } else {
                        skipped.push(format!("{}: no free parent slot", label));
                        continue;
                    }
                    changes.push(format!("{}: parent set", label));

                    let is_minor = child
                        .age_on(today)
                        .map_or(false, |age| age < self.config.adult_age);
                    if is_minor && !child.minor {
                        child.minor = true;
                        changes.push(format!("{}: minor flag set", p.subject_id));
                    }
                }
                InferredRelation::Spouse => {
                    if updated[s].spouse_id.is_some() || updated[o].spouse_id.is_some() {
                        skipped.push(format!("{}: spouse already recorded", label));
                        continue;
                    }
                    updated[s].spouse_id = Some(p.object_id.clone());
                    updated[o].spouse_id = Some(p.subject_id.clone());
                    changes.push(format!("{}: spouses linked", label));
                }
            }
        }

        AppliedInferences {
            members: updated,
            changes,
            skipped,
        }
    }
}

impl Default for FamilyInferenceEngine {
    fn default() -> Self {
        Self::new(InferenceConfig::default())
    }
}

fn both_married(a: &Member, b: &Member) -> bool {
    a.marital_status == Some(MaritalStatus::Married)
        && b.marital_status == Some(MaritalStatus::Married)
}
