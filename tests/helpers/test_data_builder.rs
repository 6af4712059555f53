// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use chrono::{Datelike, NaiveDate};
use meeting_assign::domain::member::AssignmentHistory;
use meeting_assign::domain::part::MeetingSection;
use meeting_assign::domain::types::{Gender, MaritalStatus, Qualification, Qualifications, RoleTier};
use meeting_assign::domain::{Member, Part};

/// 测试统一参考日期
pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

// ==========================================
// Member 构建器
// ==========================================

pub struct MemberBuilder {
    member: Member,
}

impl MemberBuilder {
    pub fn new(id: &str, gender: Gender) -> Self {
        Self {
            member: Member {
                id: id.to_string(),
                name: id.to_string(),
                family_name: None,
                gender,
                role: RoleTier::RegularPublisher,
                active: true,
                minor: false,
                birth_date: None,
                marital_status: None,
                qualifications: Qualifications::empty(),
                parent1_id: None,
                parent2_id: None,
                spouse_id: None,
                history: AssignmentHistory::default(),
            },
        }
    }

    pub fn brother(id: &str) -> Self {
        Self::new(id, Gender::Male)
    }

    pub fn sister(id: &str) -> Self {
        Self::new(id, Gender::Female)
    }

    pub fn name(mut self, name: &str) -> Self {
        self.member.name = name.to_string();
        self
    }

    pub fn role(mut self, role: RoleTier) -> Self {
        self.member.role = role;
        self
    }

    pub fn qualified(mut self, qualifications: &[Qualification]) -> Self {
        self.member.qualifications |= Qualifications::of(qualifications);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.member.active = false;
        self
    }

    /// 按参考日期设置年龄,并同步未成年标记
    pub fn age(mut self, years: i32) -> Self {
        let today = reference_date();
        self.member.birth_date = NaiveDate::from_ymd_opt(today.year() - years, 1, 1);
        self.member.minor = years < 18;
        self
    }

    pub fn minor(mut self) -> Self {
        self.member.minor = true;
        self
    }

    pub fn married(mut self) -> Self {
        self.member.marital_status = Some(MaritalStatus::Married);
        self
    }

    pub fn parent(mut self, parent_id: &str) -> Self {
        if self.member.parent1_id.is_none() {
            self.member.parent1_id = Some(parent_id.to_string());
        } else {
            self.member.parent2_id = Some(parent_id.to_string());
        }
        self
    }

    pub fn spouse(mut self, spouse_id: &str) -> Self {
        self.member.spouse_id = Some(spouse_id.to_string());
        self
    }

    pub fn history(mut self, lifetime: u32, recent: u32, last: Option<NaiveDate>) -> Self {
        self.member.history.lifetime_count = lifetime;
        self.member.history.recent_count = recent;
        self.member.history.last_assignment_date = last;
        self
    }

    pub fn build(self) -> Member {
        self.member
    }
}

// ==========================================
// Part 构建器
// ==========================================

pub struct PartBuilder {
    part: Part,
}

impl PartBuilder {
    pub fn new(id: &str, part_type: &str) -> Self {
        Self {
            part: Part {
                id: id.to_string(),
                part_type: part_type.to_string(),
                title: part_type.replace('_', " "),
                instructions: None,
                duration_minutes: 4,
                section: None,
                week: "2026-W42".to_string(),
                meeting_date: Some(reference_date()),
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.part.title = title.to_string();
        self
    }

    pub fn instructions(mut self, text: &str) -> Self {
        self.part.instructions = Some(text.to_string());
        self
    }

    pub fn section(mut self, section: MeetingSection) -> Self {
        self.part.section = Some(section);
        self
    }

    pub fn week(mut self, week: &str) -> Self {
        self.part.week = week.to_string();
        self
    }

    pub fn build(self) -> Part {
        self.part
    }
}

/// 一周的标准节目列表
pub fn standard_week() -> Vec<Part> {
    vec![
        PartBuilder::new("W1-01", "opening_comments")
            .section(MeetingSection::Opening)
            .build(),
        PartBuilder::new("W1-02", "talk")
            .section(MeetingSection::Treasures)
            .title("Treasures From God's Word")
            .build(),
        PartBuilder::new("W1-03", "spiritual_gems")
            .section(MeetingSection::Treasures)
            .build(),
        PartBuilder::new("W1-04", "bible_reading").build(),
        PartBuilder::new("W1-05", "starting_conversation").build(),
        PartBuilder::new("W1-06", "following_up").build(),
        PartBuilder::new("W1-07", "making_disciples").build(),
        PartBuilder::new("W1-08", "explaining_beliefs")
            .instructions("Discurso")
            .build(),
        PartBuilder::new("W1-09", "congregation_study")
            .section(MeetingSection::Living)
            .build(),
    ]
}
