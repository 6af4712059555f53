// ==========================================
// 聚会节目分派引擎 - 规则目录
// ==========================================
// 职责: 节目类型 → RuleSet（资格 + 配对策略）的唯一权威表
// 红线: 生成路径与批量校验路径共享同一个不可变实例
// 红线: 找不到规则只报告,不作为致命错误
// ==========================================

use crate::domain::part::{MeetingSection, Part, PartType};
use crate::domain::types::{Gender, Qualification, RoleTier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

// ==========================================
// 助手性别策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantGenderPolicy {
    None,             // 不限制
    SameGenderOnly,   // 必须同性别
    SameGenderOrFamily, // 同性别,或经核实的家庭成员
}

// ==========================================
// 平局决胜策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    SeniorityFirst, // 长老 > 助理仆人 > 其他,层内取首个
    ElderRotation,  // 仅长老轮换,逐级回退
    Balanced,       // 保留名: 目前等同 PlainFairness
    PlainFairness,  // 公平轮换
}

impl fmt::Display for TieBreakPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreakPolicy::SeniorityFirst => write!(f, "seniority_first"),
            TieBreakPolicy::ElderRotation => write!(f, "elder_rotation"),
            TieBreakPolicy::Balanced => write!(f, "balanced"),
            TieBreakPolicy::PlainFairness => write!(f, "plain_fairness"),
        }
    }
}

// ==========================================
// RuleSet - 单个节目类型的资格与配对策略
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub part_type: PartType,
    pub required_gender: Option<Gender>,
    pub allowed_roles: Option<Vec<RoleTier>>,
    pub required_qualification: Qualification,
    pub assistant_required: bool,
    pub assistant_policy: AssistantGenderPolicy,
    pub baptized_only: bool,
    pub exclude_minors: bool,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub tie_break: TieBreakPolicy,
    pub cooldown_weeks: u32,
}

impl RuleSet {
    /// 男性限定、无助手的基础规则
    fn male_only(part_type: PartType, qualification: Qualification) -> Self {
        Self {
            part_type,
            required_gender: Some(Gender::Male),
            allowed_roles: None,
            required_qualification: qualification,
            assistant_required: false,
            assistant_policy: AssistantGenderPolicy::None,
            baptized_only: false,
            exclude_minors: false,
            min_age: None,
            max_age: None,
            tie_break: TieBreakPolicy::PlainFairness,
            cooldown_weeks: 4,
        }
    }

    /// 合格弟兄（长老/助理仆人）专属规则
    fn appointed_men(
        part_type: PartType,
        qualification: Qualification,
        cooldown_weeks: u32,
    ) -> Self {
        Self {
            allowed_roles: Some(vec![RoleTier::Elder, RoleTier::MinisterialServant]),
            baptized_only: true,
            exclude_minors: true,
            tie_break: TieBreakPolicy::SeniorityFirst,
            cooldown_weeks,
            ..Self::male_only(part_type, qualification)
        }
    }

    /// 示范类节目（两性皆可,需要助手）
    fn demonstration(
        part_type: PartType,
        qualification: Qualification,
        policy: AssistantGenderPolicy,
        cooldown_weeks: u32,
    ) -> Self {
        Self {
            part_type,
            required_gender: None,
            allowed_roles: None,
            required_qualification: qualification,
            assistant_required: true,
            assistant_policy: policy,
            baptized_only: false,
            exclude_minors: false,
            min_age: None,
            max_age: None,
            tie_break: TieBreakPolicy::Balanced,
            cooldown_weeks,
        }
    }

    /// 角色是否在允许列表内（未限制视为允许）
    pub fn allows_role(&self, role: RoleTier) -> bool {
        self.allowed_roles
            .as_ref()
            .map_or(true, |roles| roles.contains(&role))
    }
}

// ==========================================
// RuleCatalog - 规则目录
// ==========================================
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: HashMap<PartType, RuleSet>,
}

const TALK_KEYWORDS: [&str; 2] = ["discurso", "talk"];
const EXPLAINING_KEYWORDS: [&str; 2] = ["explaining", "explicando"];
const TREASURES_KEYWORDS: [&str; 3] = ["treasures", "tesouros", "tesouro"];
const GEMS_KEYWORDS: [&str; 2] = ["gems", "joias"];

impl RuleCatalog {
    /// 标准规则表（S-38 指引）
    pub fn standard() -> Self {
        use AssistantGenderPolicy::{SameGenderOnly, SameGenderOrFamily};

        let rules = vec![
            RuleSet::appointed_men(PartType::OpeningComments, Qualification::Chairman, 4),
            RuleSet::appointed_men(PartType::TreasuresTalk, Qualification::Treasures, 6),
            RuleSet::appointed_men(PartType::SpiritualGems, Qualification::Gems, 6),
            RuleSet::male_only(PartType::BibleReading, Qualification::Reading),
            RuleSet::demonstration(
                PartType::StartingConversation,
                Qualification::Starting,
                SameGenderOrFamily,
                2,
            ),
            RuleSet::demonstration(
                PartType::FollowingUp,
                Qualification::Following,
                SameGenderOnly,
                3,
            ),
            RuleSet::demonstration(
                PartType::MakingDisciples,
                Qualification::Making,
                SameGenderOnly,
                4,
            ),
            RuleSet::male_only(PartType::ExplainingBeliefsTalk, Qualification::Explaining),
            RuleSet::demonstration(
                PartType::ExplainingBeliefsDemo,
                Qualification::Explaining,
                SameGenderOrFamily,
                4,
            ),
            RuleSet {
                cooldown_weeks: 6,
                ..RuleSet::male_only(PartType::Talk, Qualification::Talk)
            },
            RuleSet {
                tie_break: TieBreakPolicy::ElderRotation,
                ..RuleSet::appointed_men(
                    PartType::CongregationStudy,
                    Qualification::CongregationStudy,
                    8,
                )
            },
        ];

        Self::from_rules(rules)
    }

    /// 由自定义规则构建（同一类型后者覆盖前者）
    pub fn from_rules(rules: Vec<RuleSet>) -> Self {
        let rules = rules.into_iter().map(|r| (r.part_type, r)).collect();
        Self { rules }
    }

    /// 按类型直接查找
    pub fn rules_for(&self, part_type: PartType) -> Option<&RuleSet> {
        self.rules.get(&part_type)
    }

    /// 解析节目的有效类型（先做两轮消歧,再直接查找）
    ///
    /// # 规则
    /// 1. 通用解释信仰类（或未知类型且标题匹配）: 标题/说明含"discurso/talk" → 演讲变体,否则示范变体
    /// 2. 环节专属: 宝藏环节的演讲/灵粮,开场环节的通用演讲（未知类型需标题含演讲关键字）
    /// 3. 否则按原始类型
    pub fn resolve_type(&self, part: &Part) -> Option<PartType> {
        let parsed = part.part_type.parse::<PartType>().ok();
        let title = part.title.to_lowercase();
        let text = match part.instructions.as_deref() {
            Some(instructions) => format!("{} {}", title, instructions.to_lowercase()),
            None => title.clone(),
        };
        let contains_any = |haystack: &str, needles: &[&str]| {
            needles.iter().any(|n| haystack.contains(n))
        };

        // === 消歧 1: 解释信仰（演讲 vs 示范）===
        // 显式的 talk/demo 变体不参与消歧,直接查找
        let explaining = parsed == Some(PartType::ExplainingBeliefs)
            || (parsed.is_none() && contains_any(&title, &EXPLAINING_KEYWORDS));
        if explaining {
            return Some(if contains_any(&text, &TALK_KEYWORDS) {
                PartType::ExplainingBeliefsTalk
            } else {
                PartType::ExplainingBeliefsDemo
            });
        }

        // === 消歧 2: 环节专属变体 ===
        let in_treasures = part.section == Some(MeetingSection::Treasures)
            || contains_any(&title, &TREASURES_KEYWORDS);
        if in_treasures {
            if parsed == Some(PartType::Talk) || contains_any(&title, &TALK_KEYWORDS) {
                return Some(PartType::TreasuresTalk);
            }
            if parsed == Some(PartType::SpiritualGems) || contains_any(&title, &GEMS_KEYWORDS) {
                return Some(PartType::SpiritualGems);
            }
        }

        let generic_talk = parsed == Some(PartType::Talk)
            || (parsed.is_none() && contains_any(&title, &TALK_KEYWORDS));
        if part.section == Some(MeetingSection::Opening) && generic_talk {
            return Some(PartType::OpeningComments);
        }

        parsed
    }

    /// 解析节目对应的 RuleSet
    ///
    /// # 返回
    /// - Some(&RuleSet): 找到规则
    /// - None: 未知类型（调用方记录冲突后继续）
    pub fn resolve(&self, part: &Part) -> Option<&RuleSet> {
        let resolved = self.resolve_type(part);
        debug!(
            part_id = %part.id,
            raw_type = %part.part_type,
            resolved = ?resolved,
            "解析节目规则"
        );
        resolved.and_then(|t| self.rules_for(t))
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
