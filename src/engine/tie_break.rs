// ==========================================
// 聚会节目分派引擎 - 平局决胜（Tie-break）
// ==========================================
// 职责: 在合格候选人中确定性地选出一人,并生成选择理由
// 红线: 相同输入必须得到相同结果（无随机数、无时钟）
// ==========================================

use crate::config::FairnessMode;
use crate::domain::member::Member;
use crate::domain::types::RoleTier;
use crate::engine::rule_catalog::TieBreakPolicy;
use chrono::NaiveDate;
use std::cmp::Reverse;

// ==========================================
// FairnessStrategy - 公平轮换策略接口
// ==========================================
pub trait FairnessStrategy: Send + Sync {
    /// 策略名（写入日志）
    fn name(&self) -> &'static str;

    /// 从候选列表中选出一个下标
    ///
    /// # 返回
    /// - None: 候选为空
    fn pick(&self, candidates: &[&Member]) -> Option<usize>;
}

// ==========================================
// CountBasedFairness - 计数轮换
// ==========================================
// 排序键: 累计次数升序 → 近期次数升序 → 最近分派日期升序（从未分派者最先）
// 键完全相同时保持输入顺序
#[derive(Debug, Clone, Copy, Default)]
pub struct CountBasedFairness;

impl CountBasedFairness {
    fn key(member: &Member) -> (u32, u32, Option<NaiveDate>) {
        let h = &member.history;
        (h.lifetime_count, h.recent_count, h.last_assignment_date)
    }
}

impl FairnessStrategy for CountBasedFairness {
    fn name(&self) -> &'static str {
        "count_based"
    }

    fn pick(&self, candidates: &[&Member]) -> Option<usize> {
        // min_by_key 在并列时返回第一个元素
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| Self::key(m))
            .map(|(idx, _)| idx)
    }
}

// ==========================================
// LegacyHashFairness - 旧版哈希评分
// ==========================================
// score = 100 - (|hash(id)| mod 50) + 20（长老/助理仆人）
// 伪随机决胜,不反映真实轮换,仅用于与旧结果对照
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyHashFairness;

impl LegacyHashFairness {
    pub fn score(member: &Member) -> i64 {
        let bonus = if member.role.is_appointed() { 20 } else { 0 };
        100 - (legacy_hash(&member.id) % 50) + bonus
    }
}

impl FairnessStrategy for LegacyHashFairness {
    fn name(&self) -> &'static str {
        "legacy_hash"
    }

    fn pick(&self, candidates: &[&Member]) -> Option<usize> {
        // 取最高分; Reverse + min_by_key 保证并列时取输入顺序第一个
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| Reverse(Self::score(m)))
            .map(|(idx, _)| idx)
    }
}

/// 旧版字符串哈希（按 UTF-16 码元, hash = hash * 31 + c, 32 位回绕）
///
/// # 返回
/// 哈希的绝对值（i64,避免 i32::MIN 取绝对值溢出）
pub fn legacy_hash(id: &str) -> i64 {
    let hash = id.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    i64::from(hash).abs()
}

// ==========================================
// Selection - 选择结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// 在传入候选列表中的下标
    pub index: usize,

    /// 可读的选择理由
    pub rationale: String,
}

// ==========================================
// TieBreaker - 按 RuleSet 决胜策略选择
// ==========================================
pub struct TieBreaker {
    fairness: Box<dyn FairnessStrategy>,
}

impl TieBreaker {
    pub fn new(fairness: Box<dyn FairnessStrategy>) -> Self {
        Self { fairness }
    }

    pub fn from_mode(mode: FairnessMode) -> Self {
        match mode {
            FairnessMode::CountBased => Self::new(Box::new(CountBasedFairness)),
            FairnessMode::LegacyHash => Self::new(Box::new(LegacyHashFairness)),
        }
    }

    pub fn fairness_name(&self) -> &'static str {
        self.fairness.name()
    }

    /// 选择主讲人
    ///
    /// # 规则
    /// - SeniorityFirst: 首个长老 → 首个助理仆人 → 首个候选
    /// - ElderRotation: 长老子集内公平轮换,无长老回退助理仆人,再回退全部候选
    /// - Balanced / PlainFairness: 全部候选公平轮换
    pub fn select_principal(
        &self,
        policy: TieBreakPolicy,
        candidates: &[&Member],
    ) -> Option<Selection> {
        if candidates.is_empty() {
            return None;
        }

        match policy {
            TieBreakPolicy::SeniorityFirst => {
                let (index, priority) =
                    if let Some(idx) = Self::first_with_role(candidates, RoleTier::Elder) {
                        (idx, Some(RoleTier::Elder))
                    } else if let Some(idx) =
                        Self::first_with_role(candidates, RoleTier::MinisterialServant)
                    {
                        (idx, Some(RoleTier::MinisterialServant))
                    } else {
                        (0, None)
                    };
                Some(Self::describe(index, candidates[index], priority))
            }
            TieBreakPolicy::ElderRotation => {
                for tier in [RoleTier::Elder, RoleTier::MinisterialServant] {
                    let subset: Vec<usize> = candidates
                        .iter()
                        .enumerate()
                        .filter(|(_, m)| m.role == tier)
                        .map(|(idx, _)| idx)
                        .collect();
                    if let Some(index) = self.pick_within(candidates, &subset) {
                        return Some(Self::describe(index, candidates[index], Some(tier)));
                    }
                }
                self.select_fair(candidates)
            }
            TieBreakPolicy::Balanced | TieBreakPolicy::PlainFairness => {
                self.select_fair(candidates)
            }
        }
    }

    /// 纯公平轮换（也用于助手选择）
    pub fn select_fair(&self, candidates: &[&Member]) -> Option<Selection> {
        let index = self.fairness.pick(candidates)?;
        Some(Self::describe(index, candidates[index], None))
    }

    fn pick_within(&self, candidates: &[&Member], subset: &[usize]) -> Option<usize> {
        let members: Vec<&Member> = subset.iter().map(|&idx| candidates[idx]).collect();
        self.fairness.pick(&members).map(|pos| subset[pos])
    }

    fn first_with_role(candidates: &[&Member], role: RoleTier) -> Option<usize> {
        candidates.iter().position(|m| m.role == role)
    }

    fn describe(index: usize, member: &Member, priority: Option<RoleTier>) -> Selection {
        let mut parts = Vec::new();
        match priority {
            Some(RoleTier::Elder) => parts.push("elder priority".to_string()),
            Some(RoleTier::MinisterialServant) => {
                parts.push("ministerial servant priority".to_string())
            }
            _ => {}
        }

        let previous = member.history.lifetime_count;
        if previous == 0 {
            parts.push("first assignment".to_string());
        } else {
            parts.push(format!("fair rotation ({} previous assignments)", previous));
        }

        Selection {
            index,
            rationale: parts.join(", "),
        }
    }
}

impl Default for TieBreaker {
    fn default() -> Self {
        Self::from_mode(FairnessMode::default())
    }
}
