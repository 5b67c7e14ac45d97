//! 原创度评分 - 业务能力层
//!
//! 把基准语料、历史提交和候选文本放在一起做 TF-IDF 向量化，
//! 取候选文本与其他文档的最大余弦相似度 `m`，
//! 原创度 = `max(100 − round(100·m), 10)`。
//!
//! 每次评分都会把候选文本追加进历史语料，之后的提交会看到更大的语料库。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::infrastructure::{CorpusSnapshot, CorpusStore};

/// 原创度下限
pub const MIN_ORIGINALITY: u8 = 10;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// 小写分词（至少两个字符的单词）
fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// 一组文档上的 TF-IDF 向量
struct TfidfVectors {
    vectors: Vec<HashMap<String, f64>>,
}

impl TfidfVectors {
    /// 平滑 idf: `ln((1+N)/(1+df)) + 1`，每个向量做 L2 归一化
    fn fit(documents: &[&str]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();
        let total_docs = tokenized.len() as f64;

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for token in unique {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }

        let vectors = tokenized
            .iter()
            .map(|tokens| {
                let mut tf: HashMap<String, f64> = HashMap::new();
                for token in tokens {
                    *tf.entry(token.clone()).or_insert(0.0) += 1.0;
                }
                for (term, weight) in tf.iter_mut() {
                    let df = doc_freq.get(term.as_str()).copied().unwrap_or(0) as f64;
                    let idf = ((1.0 + total_docs) / (1.0 + df)).ln() + 1.0;
                    *weight *= idf;
                }
                let norm = tf.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for weight in tf.values_mut() {
                        *weight /= norm;
                    }
                }
                tf
            })
            .collect();

        Self { vectors }
    }

    /// 已归一化向量的余弦相似度即点积
    fn cosine(&self, a: usize, b: usize) -> f64 {
        let (small, large) = if self.vectors[a].len() <= self.vectors[b].len() {
            (&self.vectors[a], &self.vectors[b])
        } else {
            (&self.vectors[b], &self.vectors[a])
        };
        small
            .iter()
            .filter_map(|(term, w)| large.get(term).map(|v| w * v))
            .sum()
    }
}

/// 候选文本与比对集合的原创度，纯计算
pub fn originality(candidate: &str, comparisons: &[String]) -> u8 {
    if comparisons.is_empty() {
        return 100;
    }

    let mut documents: Vec<&str> = comparisons.iter().map(String::as_str).collect();
    documents.push(candidate);
    let candidate_idx = documents.len() - 1;

    let tfidf = TfidfVectors::fit(&documents);
    let max_similarity = (0..candidate_idx)
        .map(|i| tfidf.cosine(candidate_idx, i))
        .fold(0.0_f64, f64::max)
        .clamp(0.0, 1.0);

    let score = 100 - (100.0 * max_similarity).round() as i64;
    score.max(MIN_ORIGINALITY as i64) as u8
}

/// 原创度评分器
#[derive(Clone)]
pub struct SimilarityScorer {
    corpus: Arc<dyn CorpusStore>,
    window: Option<usize>,
}

impl SimilarityScorer {
    pub fn new(corpus: Arc<dyn CorpusStore>, window: Option<usize>) -> Self {
        Self { corpus, window }
    }

    /// 评分并把候选文本追加进语料库
    ///
    /// 语料库不可用时按空比对集合计分（100）
    pub fn score(&self, candidate_text: &str) -> u8 {
        match self
            .corpus
            .append_and_fetch_corpus(candidate_text, self.window)
        {
            Ok(snapshot) => Self::score_snapshot(candidate_text, &snapshot),
            Err(e) => {
                warn!("⚠️ 比对语料读取失败，按空语料计分: {}", e);
                Self::score_snapshot(candidate_text, &CorpusSnapshot::default())
            }
        }
    }

    /// 对已取得的语料快照计分，不写存储
    pub fn score_snapshot(candidate_text: &str, snapshot: &CorpusSnapshot) -> u8 {
        let comparisons: Vec<String> = snapshot
            .baseline
            .iter()
            .chain(&snapshot.historical)
            .cloned()
            .collect();

        let score = originality(candidate_text, &comparisons);
        debug!("原创度 {} (比对 {} 篇)", score, comparisons.len());
        score
    }

    pub fn window(&self) -> Option<usize> {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::infrastructure::GradeStore;

    struct BrokenCorpus;

    impl CorpusStore for BrokenCorpus {
        fn append_and_fetch_corpus(
            &self,
            _candidate_text: &str,
            _window: Option<usize>,
        ) -> Result<CorpusSnapshot, StoreError> {
            Err(StoreError::LockPoisoned)
        }
    }

    #[test]
    fn test_identical_text_hits_floor() {
        let text = "Photosynthesis converts light energy into chemical energy.";
        assert_eq!(originality(text, &[text.to_string()]), MIN_ORIGINALITY);
    }

    #[test]
    fn test_unrelated_text_is_fully_original() {
        let score = originality(
            "quantum chromodynamics gluons",
            &["medieval poetry sonnets".to_string()],
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn test_partial_overlap_is_between_bounds() {
        let score = originality(
            "The river floods every spring near the village",
            &["The river floods every autumn near the city".to_string()],
        );
        assert!(score > MIN_ORIGINALITY && score < 100, "score = {}", score);
    }

    #[test]
    fn test_empty_comparison_set() {
        assert_eq!(originality("anything at all", &[]), 100);
    }

    #[test]
    fn test_scorer_sees_growing_corpus() {
        let store = Arc::new(GradeStore::open_in_memory().unwrap());
        let scorer = SimilarityScorer::new(store, None);

        let text = "An essay about renewable energy and solar panels.";
        assert_eq!(scorer.score(text), 100);
        // 第二次提交同样文本时，第一次已在历史语料中
        assert_eq!(scorer.score(text), MIN_ORIGINALITY);
    }

    #[test]
    fn test_scorer_store_failure_is_neutral() {
        let scorer = SimilarityScorer::new(Arc::new(BrokenCorpus), None);
        assert_eq!(scorer.score("some text"), 100);
    }
}
