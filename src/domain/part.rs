// ==========================================
// 聚会节目分派引擎 - 节目领域模型
// ==========================================
// 职责: 节目(Part)、节目类型、聚会环节
// 说明: part_type 保留外部原始字符串,由 RuleCatalog 解析;
//       未知类型是可报告的冲突,而不是反序列化失败
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 聚会环节 (Meeting Section)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingSection {
    Opening,  // 开场
    Treasures, // 上帝话语的宝藏
    Ministry, // 用心准备传道工作
    Living,   // 基督徒的生活
}

// ==========================================
// 节目类型 (Part Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    OpeningComments,
    TreasuresTalk,
    SpiritualGems,
    BibleReading,
    StartingConversation,
    FollowingUp,
    MakingDisciples,
    ExplainingBeliefs,
    ExplainingBeliefsTalk,
    ExplainingBeliefsDemo,
    Talk,
    CongregationStudy,
}

impl PartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartType::OpeningComments => "opening_comments",
            PartType::TreasuresTalk => "treasures_talk",
            PartType::SpiritualGems => "spiritual_gems",
            PartType::BibleReading => "bible_reading",
            PartType::StartingConversation => "starting_conversation",
            PartType::FollowingUp => "following_up",
            PartType::MakingDisciples => "making_disciples",
            PartType::ExplainingBeliefs => "explaining_beliefs",
            PartType::ExplainingBeliefsTalk => "explaining_beliefs_talk",
            PartType::ExplainingBeliefsDemo => "explaining_beliefs_demo",
            PartType::Talk => "talk",
            PartType::CongregationStudy => "congregation_study",
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "opening_comments" => Ok(PartType::OpeningComments),
            "treasures_talk" => Ok(PartType::TreasuresTalk),
            "spiritual_gems" => Ok(PartType::SpiritualGems),
            "bible_reading" => Ok(PartType::BibleReading),
            "starting_conversation" | "starting" => Ok(PartType::StartingConversation),
            "following_up" | "following" => Ok(PartType::FollowingUp),
            "making_disciples" => Ok(PartType::MakingDisciples),
            "explaining_beliefs" => Ok(PartType::ExplainingBeliefs),
            "explaining_beliefs_talk" => Ok(PartType::ExplainingBeliefsTalk),
            "explaining_beliefs_demo" => Ok(PartType::ExplainingBeliefsDemo),
            "talk" => Ok(PartType::Talk),
            "congregation_study" => Ok(PartType::CongregationStudy),
            other => Err(format!("unknown part type: {}", other)),
        }
    }
}

// ==========================================
// Part - 单个节目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub part_type: String, // 外部原始类型,映射到 RuleSet
    pub title: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub section: Option<MeetingSection>,
    pub week: String, // 周标识（如 2026-W42）
    #[serde(default)]
    pub meeting_date: Option<NaiveDate>,
}
