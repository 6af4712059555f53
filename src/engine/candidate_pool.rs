// ==========================================
// 聚会节目分派引擎 - 候选池
// ==========================================
// 职责: 单次遍历把名册划分为查找分区
// 红线: 非活跃成员在构建时排除,下游不再复查
// ==========================================

use crate::domain::member::Member;
use crate::domain::types::{Gender, RoleTier};
use crate::engine::rule_catalog::RuleSet;

// ==========================================
// CandidatePool - 分区候选池
// ==========================================
// 成员可同时属于多个分区（长老也是合格弟兄）
#[derive(Debug, Clone, Default)]
pub struct CandidatePool<'a> {
    all: Vec<&'a Member>,
    qualified_males: Vec<&'a Member>, // 长老 ∪ 助理仆人
    male_publishers: Vec<&'a Member>, // 全部活跃弟兄
    female_publishers: Vec<&'a Member>, // 全部活跃姊妹
    elders: Vec<&'a Member>,
}

impl<'a> CandidatePool<'a> {
    /// O(n) 单次遍历构建分区,保持名册顺序
    pub fn build(members: &'a [Member]) -> Self {
        let mut pool = CandidatePool::default();

        for member in members.iter().filter(|m| m.active) {
            pool.all.push(member);

            match member.gender {
                Gender::Male => {
                    pool.male_publishers.push(member);
                    if member.role.is_appointed() {
                        pool.qualified_males.push(member);
                    }
                    if member.role == RoleTier::Elder {
                        pool.elders.push(member);
                    }
                }
                Gender::Female => pool.female_publishers.push(member),
            }
        }

        pool
    }

    pub fn all(&self) -> &[&'a Member] {
        &self.all
    }

    pub fn qualified_males(&self) -> &[&'a Member] {
        &self.qualified_males
    }

    pub fn male_publishers(&self) -> &[&'a Member] {
        &self.male_publishers
    }

    pub fn female_publishers(&self) -> &[&'a Member] {
        &self.female_publishers
    }

    pub fn elders(&self) -> &[&'a Member] {
        &self.elders
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// 按规则的性别/职务约束选择基础分区
    ///
    /// # 规则
    /// - 男性 + 仅长老 → elders
    /// - 男性 + 职务 ⊆ {长老, 助理仆人} → qualified_males
    /// - 男性 → male_publishers
    /// - 女性 → female_publishers
    /// - 不限 → all
    pub fn base_partition(&self, rules: &RuleSet) -> &[&'a Member] {
        match rules.required_gender {
            Some(Gender::Male) => match rules.allowed_roles.as_deref() {
                Some(roles) if !roles.is_empty() && roles.iter().all(|r| *r == RoleTier::Elder) => {
                    &self.elders
                }
                Some(roles) if !roles.is_empty() && roles.iter().all(|r| r.is_appointed()) => {
                    &self.qualified_males
                }
                _ => &self.male_publishers,
            },
            Some(Gender::Female) => &self.female_publishers,
            None => &self.all,
        }
    }
}
