use crate::decay::DecayCalculator;
use crate::types::Difficulty;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `category.topic` entries and their keyword lists. Data, not code — adding
/// a topic is one table entry.
const TAXONOMY: &[(&str, &[(&str, &[&str])])] = &[
    (
        "data_structures",
        &[
            ("array", &["array", "arrays", "dynamic array"]),
            ("linked_list", &["linked list", "singly linked", "doubly linked"]),
            ("stack", &["stack", "stacks", "lifo"]),
            ("queue", &["queue", "queues", "fifo", "deque"]),
            ("tree", &["tree", "binary tree", "bst", "binary search tree", "trees"]),
            ("heap", &["heap", "priority queue", "min heap", "max heap"]),
            ("hash_table", &["hash table", "hash map", "hashmap", "hash set", "dictionary"]),
            ("graph", &["graph", "graphs", "adjacency list", "adjacency matrix"]),
            ("trie", &["trie", "prefix tree"]),
        ],
    ),
    (
        "algorithms",
        &[
            ("sorting", &["sorting", "quicksort", "mergesort", "bubble sort", "sort algorithm"]),
            ("searching", &["binary search", "linear search", "searching algorithm"]),
            ("dynamic_programming", &["dynamic programming", "dp", "memoization", "tabulation"]),
            ("greedy", &["greedy algorithm", "greedy approach"]),
            ("recursion", &["recursion", "recursive", "backtracking"]),
            ("two_pointers", &["two pointer", "two pointers", "sliding window"]),
            ("string_algorithms", &["string matching", "substring", "kmp", "palindrome"]),
        ],
    ),
    (
        "system_design",
        &[
            ("scalability", &["scalability", "scale", "horizontal scaling", "vertical scaling"]),
            ("load_balancer", &["load balancer", "load balancing"]),
            ("database", &["database design", "sql", "nosql", "sharding", "indexing"]),
            ("caching", &["caching", "cache", "redis", "memcached"]),
            ("microservices", &["microservices", "microservice architecture"]),
            ("messaging", &["message queue", "kafka", "rabbitmq", "pub sub", "pubsub"]),
            ("consistency", &["consistency", "cap theorem", "eventual consistency"]),
        ],
    ),
    (
        "programming_concepts",
        &[
            ("oop", &["object oriented", "oop", "inheritance", "polymorphism", "encapsulation"]),
            ("concurrency", &["concurrency", "multithreading", "thread safety", "race condition"]),
            ("design_patterns", &["design pattern", "singleton", "factory pattern", "observer pattern"]),
            ("complexity", &["time complexity", "space complexity", "big o", "asymptotic"]),
        ],
    ),
    (
        "technologies",
        &[
            ("languages", &["python", "java", "javascript", "c++", "golang", "rust"]),
            ("frameworks", &["react", "django", "spring boot", "node.js", "flask"]),
            ("cloud", &["aws", "azure", "gcp", "cloud computing"]),
            ("databases", &["postgresql", "mysql", "mongodb", "dynamodb"]),
        ],
    ),
];

/// Category multipliers applied during scoring (§4.7).
fn category_multiplier(category: &str) -> f64 {
    match category {
        "algorithms" => 1.6,
        "data_structures" => 1.5,
        "system_design" => 1.8,
        "programming_concepts" => 1.3,
        "technologies" => 1.1,
        _ => 1.0,
    }
}

struct KeywordEntry {
    category: &'static str,
    topic: &'static str,
    regex: Regex,
}

fn keyword_lookup() -> &'static Vec<KeywordEntry> {
    static CACHE: OnceLock<Vec<KeywordEntry>> = OnceLock::new();
    CACHE.get_or_init(|| {
        let mut entries = Vec::new();
        for (category, topics) in TAXONOMY {
            for (topic, keywords) in *topics {
                for kw in *keywords {
                    let pattern = format!(r"\b{}\b", regex::escape(kw));
                    if let Ok(re) = Regex::new(&pattern) {
                        entries.push(KeywordEntry {
                            category,
                            topic,
                            regex: re,
                        });
                    }
                }
            }
        }
        entries
    })
}

fn context_patterns() -> &'static Vec<Regex> {
    static CACHE: OnceLock<Vec<Regex>> = OnceLock::new();
    CACHE.get_or_init(|| {
        [
            r"implement(?:ed|ing)?\s+(?:a|an|the)?\s*([a-z][a-z \-]{2,30})",
            r"design(?:ed|ing)?\s+(?:a|an|the)?\s*([a-z][a-z \-]{2,30})\s*system",
            r"asked\s+(?:me\s+)?(?:about|to)\s+([a-z][a-z \-]{2,30})",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Fixed dictionary of idiomatic cues for topics that a plain keyword pass
/// under-detects.
fn advanced_patterns() -> &'static Vec<(&'static str, &'static str, Vec<Regex>)> {
    static CACHE: OnceLock<Vec<(&'static str, &'static str, Vec<Regex>)>> = OnceLock::new();
    CACHE.get_or_init(|| {
        vec![
            (
                "algorithms",
                "dynamic_programming",
                vec![Regex::new(r"dp\s*\[").unwrap(), Regex::new(r"memo\s*\[").unwrap()],
            ),
            (
                "algorithms",
                "two_pointers",
                vec![Regex::new(r"two.pointer").unwrap(), Regex::new(r"left\s*,?\s*right\s*pointer").unwrap()],
            ),
            (
                "system_design",
                "scalability",
                vec![Regex::new(r"horizontal.*scaling").unwrap(), Regex::new(r"scale.*(horizontally|out)").unwrap()],
            ),
            (
                "data_structures",
                "tree",
                vec![Regex::new(r"\bdfs\b").unwrap(), Regex::new(r"\bbfs\b").unwrap()],
            ),
        ]
    })
}

fn difficulty_patterns() -> &'static HashMap<Difficulty, Vec<Regex>> {
    static CACHE: OnceLock<HashMap<Difficulty, Vec<Regex>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert(
            Difficulty::Easy,
            vec![Regex::new(r"\beasy\b").unwrap(), Regex::new(r"\bstraightforward\b").unwrap(), Regex::new(r"\bsimple\b").unwrap()],
        );
        m.insert(
            Difficulty::Medium,
            vec![Regex::new(r"\bmedium\b").unwrap(), Regex::new(r"\bmoderate\b").unwrap()],
        );
        m.insert(
            Difficulty::Hard,
            vec![Regex::new(r"\bhard\b").unwrap(), Regex::new(r"\bdifficult\b").unwrap(), Regex::new(r"\bchallenging\b").unwrap()],
        );
        m
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewRound {
    Coding,
    SystemDesign,
    Behavioral,
    TechnicalDiscussion,
}

fn round_keywords() -> &'static HashMap<InterviewRound, Vec<Regex>> {
    static CACHE: OnceLock<HashMap<InterviewRound, Vec<Regex>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert(
            InterviewRound::Coding,
            vec![Regex::new(r"\bcoding\s*round\b").unwrap(), Regex::new(r"\bleetcode\b").unwrap(), Regex::new(r"\bwhiteboard\b").unwrap()],
        );
        m.insert(
            InterviewRound::SystemDesign,
            vec![Regex::new(r"system\s*design").unwrap(), Regex::new(r"\barchitecture\b").unwrap()],
        );
        m.insert(
            InterviewRound::Behavioral,
            vec![Regex::new(r"behavioral").unwrap(), Regex::new(r"\bhr\s*round\b").unwrap(), Regex::new(r"tell me about").unwrap()],
        );
        m.insert(
            InterviewRound::TechnicalDiscussion,
            vec![Regex::new(r"technical\s*discussion").unwrap(), Regex::new(r"\bdeep\s*dive\b").unwrap()],
        );
        m
    })
}

fn advice_patterns() -> &'static Vec<Regex> {
    static CACHE: OnceLock<Vec<Regex>> = OnceLock::new();
    CACHE.get_or_init(|| {
        vec![
            Regex::new(r"(?i)(?:tip|advice)[:\-]\s*([^.]{20,200})").unwrap(),
            Regex::new(r"(?i)make sure (?:you|to) ([^.]{20,200})").unwrap(),
            Regex::new(r"(?i)i (?:recommend|suggest) ([^.]{20,200})").unwrap(),
        ]
    })
}

#[derive(Debug, Clone)]
pub struct ScoredTopic {
    pub category: String,
    pub topic: String,
    pub raw_count: u32,
    pub frequency_percent: f64,
    pub importance: f64,
    pub time_factor: f64,
    pub weighted_importance: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct DifficultyAssessment {
    pub overall_difficulty: Option<Difficulty>,
    pub confidence: f64,
    pub distribution: HashMap<Difficulty, u32>,
}

#[derive(Debug, Clone)]
pub struct RoundClassification {
    pub round: InterviewRound,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct TopicAnalysis {
    pub topics: Vec<ScoredTopic>,
    pub rounds: Vec<RoundClassification>,
    pub difficulty: DifficultyAssessment,
    pub key_insights: Vec<String>,
    pub word_count: usize,
    pub confidence_score: f64,
}

fn preprocess(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c == ' ' || c == '.' { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Multi-method topic extraction: keyword pass + context pass + advanced
/// idiomatic-cue pass, merged and scored under a weighted, decay-adjusted,
/// confidence-scored model (§4.7).
pub fn extract_topics(
    title: &str,
    content: &str,
    experience_date: DateTime<Utc>,
    now: DateTime<Utc>,
    decay: &DecayCalculator,
) -> TopicAnalysis {
    let combined = format!("{title} {content}");
    let text = preprocess(&combined);
    let word_count = text.split_whitespace().count().max(1);

    let mut raw_counts: HashMap<(&'static str, &'static str), u32> = HashMap::new();

    // Keyword pass.
    for entry in keyword_lookup() {
        let count = entry.regex.find_iter(&text).count() as u32;
        if count > 0 {
            *raw_counts.entry((entry.category, entry.topic)).or_insert(0) += count;
        }
    }

    // Context pass: captured phrases checked against the keyword lookup.
    for pattern in context_patterns() {
        for cap in pattern.captures_iter(&text) {
            if let Some(phrase) = cap.get(1) {
                let phrase = phrase.as_str().trim();
                for entry in keyword_lookup() {
                    if entry.regex.is_match(phrase) {
                        *raw_counts.entry((entry.category, entry.topic)).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    // Advanced-pattern pass.
    for (category, topic, regexes) in advanced_patterns() {
        let count: u32 = regexes.iter().map(|r| r.find_iter(&text).count() as u32).sum();
        if count > 0 {
            *raw_counts.entry((category, topic)).or_insert(0) += count;
        }
    }

    let time_factor = decay.weight(experience_date, now);

    let mut topics: Vec<ScoredTopic> = raw_counts
        .into_iter()
        .map(|((category, topic), raw_count)| {
            let frequency_percent = raw_count as f64 / word_count as f64 * 100.0;
            let multiplier = category_multiplier(category);
            let importance = frequency_percent * multiplier * ((raw_count as f64 + 1.0).ln());
            let weighted_importance = importance * time_factor;
            let confidence = (((raw_count as f64 / 5.0).min(1.0)) + ((frequency_percent / 2.0).min(1.0))) / 2.0;
            ScoredTopic {
                category: category.to_string(),
                topic: topic.to_string(),
                raw_count,
                frequency_percent,
                importance,
                time_factor,
                weighted_importance,
                confidence,
            }
        })
        .collect();

    topics.sort_by(|a, b| b.weighted_importance.partial_cmp(&a.weighted_importance).unwrap());

    let rounds = classify_rounds(&text);
    let difficulty = assess_difficulty(&text);
    let key_insights = extract_key_insights(&text);

    let confidence_score = if topics.is_empty() {
        0.0
    } else {
        topics.iter().map(|t| t.confidence).sum::<f64>() / topics.len() as f64
    };

    TopicAnalysis {
        topics,
        rounds,
        difficulty,
        key_insights,
        word_count,
        confidence_score,
    }
}

fn classify_rounds(text: &str) -> Vec<RoundClassification> {
    let mut out = Vec::new();
    for (round, patterns) in round_keywords() {
        let score: u32 = patterns.iter().map(|r| r.find_iter(text).count() as u32).sum();
        if score > 0 {
            out.push(RoundClassification {
                round: *round,
                confidence: (score as f64 / 3.0).min(1.0),
            });
        }
    }
    out
}

fn assess_difficulty(text: &str) -> DifficultyAssessment {
    let mut distribution = HashMap::new();
    for (difficulty, patterns) in difficulty_patterns() {
        let count: u32 = patterns.iter().map(|r| r.find_iter(text).count() as u32).sum();
        distribution.insert(*difficulty, count);
    }

    let total: u32 = distribution.values().sum();
    if total == 0 {
        return DifficultyAssessment {
            overall_difficulty: None,
            confidence: 0.0,
            distribution,
        };
    }

    let (overall, count) = distribution
        .iter()
        .max_by_key(|(_, c)| **c)
        .map(|(d, c)| (*d, *c))
        .unwrap();

    DifficultyAssessment {
        overall_difficulty: Some(overall),
        confidence: count as f64 / total as f64,
        distribution,
    }
}

fn extract_key_insights(text: &str) -> Vec<String> {
    let mut captures: Vec<String> = Vec::new();
    for pattern in advice_patterns() {
        for cap in pattern.captures_iter(text) {
            if let Some(m) = cap.get(1) {
                let s = m.as_str().trim();
                if s.len() >= 20 {
                    captures.push(s.chars().take(200).collect());
                }
            }
        }
    }
    captures.sort_by_key(|b| std::cmp::Reverse(b.len()));
    captures.truncate(5);
    captures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_pass_detects_dynamic_programming() {
        let now = Utc::now();
        let decay = DecayCalculator::new(0.08);
        let analysis = extract_topics(
            "Amazon SDE Interview",
            "They asked me about dynamic programming and dp[] table construction. It was a medium round.",
            now,
            now,
            &decay,
        );
        let dp = analysis
            .topics
            .iter()
            .find(|t| t.topic == "dynamic_programming")
            .expect("dp topic found");
        assert!(dp.raw_count >= 2);
        assert_eq!(dp.category, "algorithms");
    }

    #[test]
    fn difficulty_assessment_majority() {
        let now = Utc::now();
        let decay = DecayCalculator::new(0.08);
        let analysis = extract_topics("t", "This was a hard, really hard and challenging round", now, now, &decay);
        assert_eq!(analysis.difficulty.overall_difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn empty_content_yields_no_topics() {
        let now = Utc::now();
        let decay = DecayCalculator::new(0.08);
        let analysis = extract_topics("t", "nothing technical here at all", now, now, &decay);
        assert!(analysis.topics.is_empty());
    }
}
