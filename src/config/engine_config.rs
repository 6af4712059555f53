// ==========================================
// 聚会节目分派引擎 - 引擎配置
// ==========================================
// 职责: 配置加载、默认值、校验、快照
// 存储: JSON（由调用方提供字符串或文件路径）
// ==========================================

use crate::domain::family::Confidence;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置项无效: {key}: {reason}")]
    Invalid { key: String, reason: String },
}

// ==========================================
// FairnessMode - 公平轮换实现
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairnessMode {
    /// 计数轮换: 累计次数少者优先,其次近期次数,其次最早分派者
    CountBased,
    /// 旧版哈希评分: 100 - hash(id) % 50 + 合格加分,仅用于对照
    LegacyHash,
}

impl Default for FairnessMode {
    fn default() -> Self {
        FairnessMode::CountBased
    }
}

// ==========================================
// InferenceConfig - 家庭关系推断阈值
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// 父母候选最小年龄
    pub parent_min_age: u32,

    /// 成年年龄（低于此为子女）
    pub adult_age: u32,

    /// 父母与子女最小年龄差
    pub min_parent_gap: u32,

    /// 父母与子女最大"合理"年龄差
    pub max_parent_gap: u32,

    /// 配偶最大年龄差
    pub max_spouse_gap: u32,

    /// 可应用的最低置信度
    pub apply_min_confidence: Confidence,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            parent_min_age: 25,
            adult_age: 18,
            min_parent_gap: 15,
            max_parent_gap: 50,
            max_spouse_gap: 15,
            apply_min_confidence: Confidence::Medium,
        }
    }
}

// ==========================================
// EngineConfig - 引擎配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// plain-fairness 背后的实现
    pub fairness_mode: FairnessMode,

    /// 近期分派提醒窗口（天）,仅用于未设置冷却周数的节目规则
    pub recent_assignment_warning_days: i64,

    /// 近期窗口内分派次数达到该值时提示过载
    pub overload_recent_threshold: u32,

    /// 家庭关系推断阈值
    pub inference: InferenceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fairness_mode: FairnessMode::default(),
            recent_assignment_warning_days: 14,
            overload_recent_threshold: 3,
            inference: InferenceConfig::default(),
        }
    }
}

impl EngineConfig {
    /// 从 JSON 字符串加载（缺失字段取默认值）
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recent_assignment_warning_days < 0 {
            return Err(ConfigError::Invalid {
                key: "recent_assignment_warning_days".to_string(),
                reason: format!("必须 >= 0,实际 {}", self.recent_assignment_warning_days),
            });
        }

        if self.overload_recent_threshold == 0 {
            return Err(ConfigError::Invalid {
                key: "overload_recent_threshold".to_string(),
                reason: "必须 >= 1".to_string(),
            });
        }

        let inf = &self.inference;
        if inf.adult_age > inf.parent_min_age {
            return Err(ConfigError::Invalid {
                key: "inference.adult_age".to_string(),
                reason: format!(
                    "成年年龄 {} 不能大于父母候选最小年龄 {}",
                    inf.adult_age, inf.parent_min_age
                ),
            });
        }
        if inf.min_parent_gap >= inf.max_parent_gap {
            return Err(ConfigError::Invalid {
                key: "inference.min_parent_gap".to_string(),
                reason: format!(
                    "最小年龄差 {} 必须小于最大年龄差 {}",
                    inf.min_parent_gap, inf.max_parent_gap
                ),
            });
        }

        Ok(())
    }

    /// 配置快照（JSON）,用于运行日志审计
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fairness_mode, FairnessMode::CountBased);
        assert_eq!(config.recent_assignment_warning_days, 14);
        assert_eq!(config.inference.parent_min_age, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"fairness_mode":"legacy_hash"}"#).unwrap();
        assert_eq!(config.fairness_mode, FairnessMode::LegacyHash);
        assert_eq!(config.overload_recent_threshold, 3);
        assert_eq!(config.inference.max_parent_gap, 50);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{"overload_recent_threshold":0}"#).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref key, .. } if key == "overload_recent_threshold")
        );

        let err = EngineConfig::from_json_str(
            r#"{"inference":{"min_parent_gap":60,"max_parent_gap":50}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
