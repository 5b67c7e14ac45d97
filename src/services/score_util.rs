//! 评分数值工具
//!
//! 纯函数，无外部依赖：
//! - 要求覆盖率（匹配分数）
//! - 批改加权总分
//! - 按分数划分等级

use std::collections::BTreeSet;

use crate::models::GradeBand;

/// 匹配分数保留阈值（含）
pub const MATCH_THRESHOLD: u8 = 30;

/// 最多返回的匹配数量
pub const MAX_MATCHES: usize = 3;

/// 要求集合中被标签覆盖的比例，向下取整为 0-100
///
/// 使用精确字符串交集；要求集合为空时为 0
pub fn match_score(requirements: &BTreeSet<String>, tags: &BTreeSet<String>) -> u8 {
    if requirements.is_empty() {
        return 0;
    }
    let overlap = requirements.intersection(tags).count();
    ((overlap * 100) / requirements.len()) as u8
}

/// 批改加权分的各项输入（除 red_flags 外均为 0.0-1.0）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompositeInputs {
    pub similarity: f64,
    pub clarity: f64,
    pub alignment: f64,
    pub red_flags: usize,
}

/// `0.4·similarity + 0.3·clarity + 0.25·alignment − 0.05·red_flags`，换算为 0-100 并截断
pub fn weighted_composite(inputs: CompositeInputs) -> u8 {
    let raw = inputs.similarity * 0.4 + inputs.clarity * 0.3 + inputs.alignment * 0.25
        - inputs.red_flags as f64 * 0.05;
    // 先取整再裁剪，避免浮点误差把 0.95 变成 94
    let scaled = (raw * 100.0 + 1e-9).floor();
    scaled.clamp(0.0, 100.0) as u8
}

/// 按分数划分等级
pub fn classify_band(score: u8) -> GradeBand {
    match score {
        70.. => GradeBand::Distinction,
        60..=69 => GradeBand::Merit,
        40..=59 => GradeBand::Pass,
        _ => GradeBand::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_score_floors_ratio() {
        let requirements = set(&["data", "tables", "summary"]);
        let tags = set(&["data", "summary", "images"]);
        assert_eq!(match_score(&requirements, &tags), 66);
    }

    #[test]
    fn test_match_score_edge_cases() {
        assert_eq!(match_score(&BTreeSet::new(), &set(&["data"])), 0);
        assert_eq!(match_score(&set(&["data"]), &BTreeSet::new()), 0);
        assert_eq!(match_score(&set(&["data"]), &set(&["data"])), 100);
        // 精确匹配，大小写敏感
        assert_eq!(match_score(&set(&["Data"]), &set(&["data"])), 0);
    }

    #[test]
    fn test_weighted_composite() {
        let full = CompositeInputs {
            similarity: 1.0,
            clarity: 1.0,
            alignment: 1.0,
            red_flags: 0,
        };
        assert_eq!(weighted_composite(full), 95);

        let flagged = CompositeInputs {
            red_flags: 2,
            ..full
        };
        assert_eq!(weighted_composite(flagged), 85);

        let penalised = CompositeInputs {
            red_flags: 50,
            ..CompositeInputs::default()
        };
        assert_eq!(weighted_composite(penalised), 0);
    }

    #[test]
    fn test_classify_band_boundaries() {
        assert_eq!(classify_band(100), GradeBand::Distinction);
        assert_eq!(classify_band(70), GradeBand::Distinction);
        assert_eq!(classify_band(69), GradeBand::Merit);
        assert_eq!(classify_band(60), GradeBand::Merit);
        assert_eq!(classify_band(40), GradeBand::Pass);
        assert_eq!(classify_band(39), GradeBand::Fail);
    }
}
