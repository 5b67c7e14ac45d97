use std::fmt;

use serde::{Deserialize, Serialize};

/// 评分等级带
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeBand {
    Fail,
    #[default]
    Pass,
    Merit,
    Distinction,
}

impl GradeBand {
    /// 全部等级，按从低到高排列
    pub const ALL: [GradeBand; 4] = [
        GradeBand::Fail,
        GradeBand::Pass,
        GradeBand::Merit,
        GradeBand::Distinction,
    ];

    /// 获取标准名称（与数据库中存储的值一致）
    pub fn as_str(self) -> &'static str {
        match self {
            GradeBand::Fail => "Fail",
            GradeBand::Pass => "Pass",
            GradeBand::Merit => "Merit",
            GradeBand::Distinction => "Distinction",
        }
    }

    /// 严格解析，无法识别时返回 None
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|band| band.as_str() == value)
    }

    /// 宽松解析：无法识别的等级一律修正为 Pass
    pub fn parse_or_default(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_bands() {
        assert_eq!(GradeBand::parse("Merit"), Some(GradeBand::Merit));
        assert_eq!(GradeBand::parse("Distinction"), Some(GradeBand::Distinction));
        assert_eq!(GradeBand::parse("merit"), None);
    }

    #[test]
    fn test_parse_or_default_corrects_to_pass() {
        assert_eq!(GradeBand::parse_or_default("Excellent"), GradeBand::Pass);
        assert_eq!(GradeBand::parse_or_default(""), GradeBand::Pass);
        assert_eq!(GradeBand::parse_or_default("Fail"), GradeBand::Fail);
    }

    #[test]
    fn test_default_band_is_pass() {
        assert_eq!(GradeBand::default(), GradeBand::Pass);
    }
}
