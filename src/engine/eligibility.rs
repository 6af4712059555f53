// ==========================================
// 聚会节目分派引擎 - Eligibility Core 纯函数库
// ==========================================
// 职责: 主讲人资格判定的纯谓词（逻辑与组合）
// 红线: 无状态、无副作用、无 I/O 操作
// 说明: 分派路径与批量校验路径共用这些谓词
// ==========================================

use crate::domain::member::Member;
use crate::domain::types::{Gender, Qualification, RoleTier};
use crate::engine::rule_catalog::RuleSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// EligibilityFailure - 不合格原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "code")]
pub enum EligibilityFailure {
    Inactive,
    GenderMismatch { required: Gender, actual: Gender },
    RoleNotAllowed { role: RoleTier },
    MissingQualification { qualification: Qualification },
    NotBaptized { role: RoleTier },
    MinorExcluded,
    AgeUnknown,
    BelowMinAge { age: u32, min: u32 },
    AboveMaxAge { age: u32, max: u32 },
}

impl fmt::Display for EligibilityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EligibilityFailure::Inactive => write!(f, "INACTIVE"),
            EligibilityFailure::GenderMismatch { required, actual } => {
                write!(f, "GENDER_MISMATCH: required={}, actual={}", required, actual)
            }
            EligibilityFailure::RoleNotAllowed { role } => {
                write!(f, "ROLE_NOT_ALLOWED: role={}", role)
            }
            EligibilityFailure::MissingQualification { qualification } => {
                write!(f, "MISSING_QUALIFICATION: {}", qualification)
            }
            EligibilityFailure::NotBaptized { role } => write!(f, "NOT_BAPTIZED: role={}", role),
            EligibilityFailure::MinorExcluded => write!(f, "MINOR_EXCLUDED"),
            EligibilityFailure::AgeUnknown => write!(f, "AGE_UNKNOWN: birth_date missing"),
            EligibilityFailure::BelowMinAge { age, min } => {
                write!(f, "BELOW_MIN_AGE: age={}, min={}", age, min)
            }
            EligibilityFailure::AboveMaxAge { age, max } => {
                write!(f, "ABOVE_MAX_AGE: age={}, max={}", age, max)
            }
        }
    }
}

// ==========================================
// EligibilityCore - 纯函数工具类
// ==========================================
pub struct EligibilityCore;

impl EligibilityCore {
    pub fn gender_ok(member: &Member, rules: &RuleSet) -> bool {
        rules.required_gender.map_or(true, |g| member.gender == g)
    }

    pub fn role_ok(member: &Member, rules: &RuleSet) -> bool {
        rules.allows_role(member.role)
    }

    pub fn qualification_ok(member: &Member, rules: &RuleSet) -> bool {
        member.qualifications.has(rules.required_qualification)
    }

    pub fn baptism_ok(member: &Member, rules: &RuleSet) -> bool {
        !rules.baptized_only || member.role.is_baptized()
    }

    pub fn minor_ok(member: &Member, rules: &RuleSet) -> bool {
        !rules.exclude_minors || !member.minor
    }

    /// 年龄区间检查
    ///
    /// # 规则
    /// - 规则无年龄限制 → 通过
    /// - 有限制但出生日期缺失 → 不通过（无法核实）
    pub fn age_ok(member: &Member, rules: &RuleSet, today: NaiveDate) -> bool {
        Self::age_failure(member, rules, today).is_none()
    }

    fn age_failure(
        member: &Member,
        rules: &RuleSet,
        today: NaiveDate,
    ) -> Option<EligibilityFailure> {
        if rules.min_age.is_none() && rules.max_age.is_none() {
            return None;
        }

        let age = match member.age_on(today) {
            Some(age) => age,
            None => return Some(EligibilityFailure::AgeUnknown),
        };

        if let Some(min) = rules.min_age {
            if age < min {
                return Some(EligibilityFailure::BelowMinAge { age, min });
            }
        }
        if let Some(max) = rules.max_age {
            if age > max {
                return Some(EligibilityFailure::AboveMaxAge { age, max });
            }
        }
        None
    }

    /// 分派路径: 全部谓词逻辑与（短路）
    pub fn is_eligible(member: &Member, rules: &RuleSet, today: NaiveDate) -> bool {
        member.active
            && Self::gender_ok(member, rules)
            && Self::role_ok(member, rules)
            && Self::qualification_ok(member, rules)
            && Self::baptism_ok(member, rules)
            && Self::minor_ok(member, rules)
            && Self::age_ok(member, rules, today)
    }

    /// 校验路径: 列出全部不合格原因（不短路）
    pub fn failures(member: &Member, rules: &RuleSet, today: NaiveDate) -> Vec<EligibilityFailure> {
        let mut failures = Vec::new();

        if !member.active {
            failures.push(EligibilityFailure::Inactive);
        }
        if let Some(required) = rules.required_gender {
            if member.gender != required {
                failures.push(EligibilityFailure::GenderMismatch {
                    required,
                    actual: member.gender,
                });
            }
        }
        if !Self::role_ok(member, rules) {
            failures.push(EligibilityFailure::RoleNotAllowed { role: member.role });
        }
        if !Self::qualification_ok(member, rules) {
            failures.push(EligibilityFailure::MissingQualification {
                qualification: rules.required_qualification,
            });
        }
        if !Self::baptism_ok(member, rules) {
            failures.push(EligibilityFailure::NotBaptized { role: member.role });
        }
        if !Self::minor_ok(member, rules) {
            failures.push(EligibilityFailure::MinorExcluded);
        }
        if let Some(failure) = Self::age_failure(member, rules, today) {
            failures.push(failure);
        }

        failures
    }
}
