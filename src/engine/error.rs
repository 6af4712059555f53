// ==========================================
// 聚会节目分派引擎 - 引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 只覆盖致命边界（请求结构校验、持久化闸门）;
//       单个节目的分派失败是数据（状态 + 冲突字符串）,不是错误
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ===== 请求结构错误（处理前拒绝）=====
    #[error("输入无效: {0}")]
    InvalidInput(String),

    #[error("ID 重复 ({kind}): {id}")]
    DuplicateId { kind: String, id: String },

    // ===== 持久化闸门 =====
    #[error("批量校验未通过: {} 项违规", .violations.len())]
    BatchRejected { violations: Vec<String> },
}

impl EngineError {
    /// 批量闸门拒绝时的违规明细（其余错误为空）
    pub fn violations(&self) -> &[String] {
        match self {
            EngineError::BatchRejected { violations } => violations,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::DuplicateId {
            kind: "member".to_string(),
            id: "M1".to_string(),
        };
        assert_eq!(err.to_string(), "ID 重复 (member): M1");

        let err = EngineError::BatchRejected {
            violations: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "批量校验未通过: 2 项违规");
        assert_eq!(err.violations().len(), 2);
        assert!(EngineError::InvalidInput("x".to_string()).violations().is_empty());
    }
}
