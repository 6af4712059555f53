// ==========================================
// 聚会节目分派引擎 - 领域类型定义
// ==========================================
// 职责: 性别、职务层级、资格位集、婚姻状态等封闭枚举
// 红线: 资格只能用封闭枚举表达,禁止字符串索引
// ==========================================

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 性别 (Gender)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

// ==========================================
// 职务层级 (Role Tier)
// ==========================================
// 顺序: 声明顺序即资历顺序,Elder 最资深
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTier {
    Elder,               // 长老
    MinisterialServant,  // 助理仆人
    RegularPublisher,    // 已受浸传道员
    UnbaptizedPublisher, // 未受浸传道员
    NewStudent,          // 新学员
}

impl RoleTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTier::Elder => "elder",
            RoleTier::MinisterialServant => "ministerial_servant",
            RoleTier::RegularPublisher => "regular_publisher",
            RoleTier::UnbaptizedPublisher => "unbaptized_publisher",
            RoleTier::NewStudent => "new_student",
        }
    }

    /// 是否已受浸（长老/助理仆人/已受浸传道员）
    pub fn is_baptized(&self) -> bool {
        matches!(
            self,
            RoleTier::Elder | RoleTier::MinisterialServant | RoleTier::RegularPublisher
        )
    }

    /// 是否属于"合格弟兄"层级（长老 ∪ 助理仆人）
    pub fn is_appointed(&self) -> bool {
        matches!(self, RoleTier::Elder | RoleTier::MinisterialServant)
    }
}

impl fmt::Display for RoleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 资格类型 (Qualification)
// ==========================================
// 每种节目类型对应一个资格标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualification {
    Chairman,
    Prayer,
    Treasures,
    Gems,
    Reading,
    Starting,
    Following,
    Making,
    Explaining,
    Talk,
    CongregationStudy,
}

impl Qualification {
    pub const ALL: [Qualification; 11] = [
        Qualification::Chairman,
        Qualification::Prayer,
        Qualification::Treasures,
        Qualification::Gems,
        Qualification::Reading,
        Qualification::Starting,
        Qualification::Following,
        Qualification::Making,
        Qualification::Explaining,
        Qualification::Talk,
        Qualification::CongregationStudy,
    ];

    /// 映射到位集中的对应标记
    pub fn flag(self) -> Qualifications {
        match self {
            Qualification::Chairman => Qualifications::CHAIRMAN,
            Qualification::Prayer => Qualifications::PRAYER,
            Qualification::Treasures => Qualifications::TREASURES,
            Qualification::Gems => Qualifications::GEMS,
            Qualification::Reading => Qualifications::READING,
            Qualification::Starting => Qualifications::STARTING,
            Qualification::Following => Qualifications::FOLLOWING,
            Qualification::Making => Qualifications::MAKING,
            Qualification::Explaining => Qualifications::EXPLAINING,
            Qualification::Talk => Qualifications::TALK,
            Qualification::CongregationStudy => Qualifications::CONGREGATION_STUDY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Qualification::Chairman => "chairman",
            Qualification::Prayer => "prayer",
            Qualification::Treasures => "treasures",
            Qualification::Gems => "gems",
            Qualification::Reading => "reading",
            Qualification::Starting => "starting",
            Qualification::Following => "following",
            Qualification::Making => "making",
            Qualification::Explaining => "explaining",
            Qualification::Talk => "talk",
            Qualification::CongregationStudy => "congregation_study",
        }
    }
}

impl fmt::Display for Qualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

bitflags! {
    /// 成员资格位集（固定大小,每个节目类型一位）
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Qualifications: u16 {
        const CHAIRMAN           = 1 << 0;
        const PRAYER             = 1 << 1;
        const TREASURES          = 1 << 2;
        const GEMS               = 1 << 3;
        const READING            = 1 << 4;
        const STARTING           = 1 << 5;
        const FOLLOWING          = 1 << 6;
        const MAKING             = 1 << 7;
        const EXPLAINING         = 1 << 8;
        const TALK               = 1 << 9;
        const CONGREGATION_STUDY = 1 << 10;
    }
}

impl Qualifications {
    /// 是否具备某项资格
    pub fn has(&self, qualification: Qualification) -> bool {
        self.contains(qualification.flag())
    }

    /// 由资格列表构建位集
    pub fn of(qualifications: &[Qualification]) -> Self {
        qualifications
            .iter()
            .fold(Qualifications::empty(), |acc, q| acc | q.flag())
    }
}

// ==========================================
// 婚姻状态 (Marital Status)
// ==========================================
// 仅作为家庭关系推断的提示信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    Widowed,
    Divorced,
}
