//! 要求匹配 - 业务能力层
//!
//! 给定内容标签和等级，从目录取候选、逐条打分、过滤、排序、截断。

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::models::{GradeBand, MatchReport, MatchResult};
use crate::services::requirement_catalog::RequirementCatalog;
use crate::services::score_util::{self, MATCH_THRESHOLD, MAX_MATCHES};

/// 要求匹配器
#[derive(Clone)]
pub struct RequirementMatcher {
    catalog: RequirementCatalog,
}

impl RequirementMatcher {
    pub fn new(catalog: RequirementCatalog) -> Self {
        Self { catalog }
    }

    /// 匹配内容标签
    ///
    /// - 无法识别的等级修正为 Pass
    /// - 目录不可用时返回空结果并标记 `catalog_unavailable`，不报错
    pub fn match_tags(&self, tags: &BTreeSet<String>, grade_band: &str) -> MatchReport {
        let band = GradeBand::parse_or_default(grade_band);
        if band.as_str() != grade_band {
            debug!("等级 '{}' 已修正为 {}", grade_band, band);
        }

        let candidates = match self.catalog.find_candidates(band, tags) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("⚠️ 评分要求目录不可用: {}", e);
                return MatchReport {
                    grade_band: band,
                    matches: Vec::new(),
                    total_candidates: 0,
                    catalog_unavailable: true,
                };
            }
        };

        let scored: Vec<MatchResult> = candidates
            .into_iter()
            .map(|record| MatchResult {
                match_score: score_util::match_score(&record.requirements, tags),
                title: record.title,
                location: record.location,
                grade_band: record.grade_band,
                requirements: record.requirements,
            })
            .collect();

        let (matches, total_candidates) = rank_matches(scored);
        MatchReport {
            grade_band: band,
            matches,
            total_candidates,
            catalog_unavailable: false,
        }
    }
}

/// 过滤低于阈值的结果，按分数稳定降序排列并截断
///
/// 返回 (截断后的结果, 过滤后截断前的数量)
pub fn rank_matches(mut results: Vec<MatchResult>) -> (Vec<MatchResult>, usize) {
    results.retain(|r| r.match_score >= MATCH_THRESHOLD);
    results.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    let total = results.len();
    results.truncate(MAX_MATCHES);
    (results, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::error::StoreError;
    use crate::infrastructure::{GradeStore, RequirementSource};
    use crate::models::RequirementRecord;

    struct BrokenSource;

    impl RequirementSource for BrokenSource {
        fn find_requirements(
            &self,
            _grade_band: GradeBand,
        ) -> Result<Vec<RequirementRecord>, StoreError> {
            Err(StoreError::LockPoisoned)
        }
    }

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn result(title: &str, score: u8) -> MatchResult {
        MatchResult {
            title: title.to_string(),
            match_score: score,
            location: String::new(),
            grade_band: GradeBand::Pass,
            requirements: BTreeSet::new(),
        }
    }

    fn matcher() -> RequirementMatcher {
        let store = GradeStore::open_in_memory().unwrap();
        let record = |id: i64, reqs: &[&str]| RequirementRecord {
            id,
            title: format!("R{}", id),
            location: format!("Unit {}", id),
            grade_band: GradeBand::Pass,
            requirements: reqs.iter().map(|s| s.to_string()).collect(),
        };
        store
            .seed_requirements(&[
                record(1, &["data", "tables", "summary"]),
                record(2, &["summary"]),
                record(3, &["images", "references", "citations", "data"]),
                record(4, &["introduction", "content", "data", "tables"]),
            ])
            .unwrap();
        RequirementMatcher::new(RequirementCatalog::new(Arc::new(store)))
    }

    #[test]
    fn test_rank_filters_sorts_and_truncates() {
        let scored = [90, 45, 30, 29, 80]
            .iter()
            .enumerate()
            .map(|(i, s)| result(&format!("r{}", i), *s))
            .collect();
        let (ranked, total) = rank_matches(scored);
        let scores: Vec<u8> = ranked.iter().map(|r| r.match_score).collect();
        assert_eq!(scores, vec![90, 80, 45]);
        // 30 保留，29 被过滤
        assert_eq!(total, 4);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let (ranked, _) = rank_matches(vec![result("first", 50), result("second", 50)]);
        assert_eq!(ranked[0].title, "first");
        assert_eq!(ranked[1].title, "second");
    }

    #[test]
    fn test_match_scores_against_catalog() {
        let report = matcher().match_tags(&tags(&["data", "summary", "images"]), "Pass");
        let scores: Vec<(String, u8)> = report
            .matches
            .iter()
            .map(|m| (m.title.clone(), m.match_score))
            .collect();
        assert_eq!(
            scores,
            vec![
                ("R2".to_string(), 100),
                ("R1".to_string(), 66),
                ("R3".to_string(), 50),
            ]
        );
        assert_eq!(report.total_candidates, 3);
        assert_eq!(report.best_score(), 100);
    }

    #[test]
    fn test_unknown_band_behaves_as_pass() {
        let m = matcher();
        let t = tags(&["data", "summary"]);
        let excellent = m.match_tags(&t, "Excellent");
        let pass = m.match_tags(&t, "Pass");
        assert_eq!(excellent.grade_band, GradeBand::Pass);
        assert_eq!(excellent, pass);
    }

    #[test]
    fn test_empty_tags_yield_no_matches() {
        let report = matcher().match_tags(&BTreeSet::new(), "Pass");
        assert!(report.matches.is_empty());
        assert_eq!(report.total_candidates, 0);
        assert!(!report.catalog_unavailable);
    }

    #[test]
    fn test_catalog_failure_is_not_fatal() {
        let matcher =
            RequirementMatcher::new(RequirementCatalog::new(Arc::new(BrokenSource)));
        let report = matcher.match_tags(&tags(&["data"]), "Merit");
        assert!(report.matches.is_empty());
        assert_eq!(report.total_candidates, 0);
        assert!(report.catalog_unavailable);
        assert_eq!(report.grade_band, GradeBand::Merit);
    }
}
