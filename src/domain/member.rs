// ==========================================
// 聚会节目分派引擎 - 成员领域模型
// ==========================================
// 用途: 外部存储加载,引擎层只读
// 红线: 家庭指针是弱引用(ID),不是所有权
// ==========================================

use crate::domain::types::{Gender, MaritalStatus, Qualification, Qualifications, RoleTier};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ==========================================
// AssignmentHistory - 分派历史聚合
// ==========================================
// 由调用方的存储层提供,驱动计数轮换策略
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentHistory {
    #[serde(default)]
    pub lifetime_count: u32, // 累计分派次数

    #[serde(default)]
    pub recent_count: u32, // 近期窗口内分派次数（如 90 天）

    #[serde(default)]
    pub last_assignment_date: Option<NaiveDate>, // 最近一次分派日期

    #[serde(default)]
    pub last_assignment_label: Option<String>, // 最近一次分派的节目标题
}

// ==========================================
// Member - 会众成员
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    // ===== 主键 =====
    pub id: String,

    // ===== 基础信息 =====
    pub name: String,
    #[serde(default)]
    pub family_name: Option<String>, // 家族姓氏（缺失时取姓名最后一段）
    pub gender: Gender,
    pub role: RoleTier,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub minor: bool,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub marital_status: Option<MaritalStatus>,

    // ===== 资格 =====
    #[serde(default = "Qualifications::empty")]
    pub qualifications: Qualifications,

    // ===== 家庭指针（弱引用）=====
    #[serde(default)]
    pub parent1_id: Option<String>,
    #[serde(default)]
    pub parent2_id: Option<String>,
    #[serde(default)]
    pub spouse_id: Option<String>,

    // ===== 分派历史 =====
    #[serde(default)]
    pub history: AssignmentHistory,
}

fn default_active() -> bool {
    true
}

impl Member {
    /// 按参考日期计算周岁
    ///
    /// # 返回
    /// - None: 出生日期缺失或晚于参考日期
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if birth > today {
            return None;
        }

        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }

    /// 家族姓氏: 优先 family_name,否则取姓名的最后一段
    pub fn surname(&self) -> Option<&str> {
        if let Some(family) = self.family_name.as_deref() {
            let family = family.trim();
            if !family.is_empty() {
                return Some(family);
            }
        }
        self.name.split_whitespace().last()
    }

    /// 父母指针（过滤空值）
    pub fn parent_ids(&self) -> impl Iterator<Item = &str> {
        self.parent1_id
            .as_deref()
            .into_iter()
            .chain(self.parent2_id.as_deref())
    }

    pub fn is_parent(&self, other_id: &str) -> bool {
        self.parent_ids().any(|p| p == other_id)
    }

    /// 成员数据完整性检查
    ///
    /// # 返回
    /// 警告列表（空表示无问题）,不阻断分派
    pub fn integrity_warnings(&self, today: NaiveDate) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.parent_ids().any(|p| p == self.id) {
            warnings.push(format!("SELF_PARENT: member={}", self.id));
        }
        if self.spouse_id.as_deref() == Some(self.id.as_str()) {
            warnings.push(format!("SELF_SPOUSE: member={}", self.id));
        }

        if let Some(age) = self.age_on(today) {
            if self.minor && age >= 18 {
                warnings.push(format!(
                    "MINOR_FLAG_MISMATCH: member={} flagged minor but age={}",
                    self.id, age
                ));
            } else if !self.minor && age < 18 {
                warnings.push(format!(
                    "MINOR_FLAG_MISMATCH: member={} not flagged minor but age={}",
                    self.id, age
                ));
            }
        }

        if self.gender == Gender::Female {
            for q in [
                Qualification::Reading,
                Qualification::Talk,
                Qualification::Chairman,
                Qualification::Prayer,
            ] {
                if self.qualifications.has(q) {
                    warnings.push(format!(
                        "UNUSABLE_QUALIFICATION: member={} qualification={} is male-only",
                        self.id, q
                    ));
                }
            }
        }

        if self.qualifications.has(Qualification::Talk) && !self.role.is_baptized() {
            warnings.push(format!(
                "UNUSABLE_QUALIFICATION: member={} qualification=talk requires baptized tier, role={}",
                self.id, self.role
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: "Maria Souza".to_string(),
            family_name: None,
            gender: Gender::Female,
            role: RoleTier::RegularPublisher,
            active: true,
            minor: false,
            birth_date: NaiveDate::from_ymd_opt(1990, 6, 15),
            marital_status: None,
            qualifications: Qualifications::empty(),
            parent1_id: None,
            parent2_id: None,
            spouse_id: None,
            history: AssignmentHistory::default(),
        }
    }

    #[test]
    fn test_age_respects_birthday() {
        let m = sample("M1");
        let before = NaiveDate::from_ymd_opt(2020, 6, 14).unwrap();
        let on = NaiveDate::from_ymd_opt(2020, 6, 15).unwrap();
        assert_eq!(m.age_on(before), Some(29));
        assert_eq!(m.age_on(on), Some(30));
    }

    #[test]
    fn test_surname_falls_back_to_last_name_token() {
        let mut m = sample("M1");
        assert_eq!(m.surname(), Some("Souza"));
        m.family_name = Some("Oliveira".to_string());
        assert_eq!(m.surname(), Some("Oliveira"));
    }

    #[test]
    fn test_integrity_warnings() {
        let mut m = sample("M1");
        m.spouse_id = Some("M1".to_string());
        m.qualifications = Qualifications::READING;
        m.minor = true;

        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let warnings = m.integrity_warnings(today);
        assert!(warnings.iter().any(|w| w.starts_with("SELF_SPOUSE")));
        assert!(warnings.iter().any(|w| w.starts_with("MINOR_FLAG_MISMATCH")));
        assert!(warnings.iter().any(|w| w.contains("qualification=reading")));
    }
}
