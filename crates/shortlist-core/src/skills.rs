//! Canonical skill normalization
//!
//! Skill tokens coming from queries, the LLM parser, and the skills index
//! all pass through the same alias substitution so "k8s", "K8S" and
//! "kubernetes" gate the same candidates. Normalization is idempotent.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Alias -> canonical form substitutions
    static ref SKILL_ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("ml", "machine learning");
        m.insert("js", "javascript");
        m.insert("ts", "typescript");
        m.insert("py", "python");
        m.insert("c#", "csharp");
        m.insert("c sharp", "csharp");
        m.insert("c++", "cpp");
        m.insert("golang", "go");
        m.insert("dl", "deep learning");
        m.insert("nlp", "natural language processing");
        m.insert("cv", "computer vision");
        m.insert("ai", "artificial intelligence");
        m.insert("llm", "large language models");
        m.insert("llms", "large language models");
        m.insert("genai", "generative ai");
        m.insert("gen ai", "generative ai");
        m.insert("sklearn", "scikit-learn");
        m.insert("scikit learn", "scikit-learn");
        m.insert("tf", "tensorflow");
        m.insert("react.js", "react");
        m.insert("reactjs", "react");
        m.insert("vue.js", "vue");
        m.insert("vuejs", "vue");
        m.insert("angular.js", "angular");
        m.insert("angularjs", "angular");
        m.insert("next.js", "nextjs");
        m.insert("node.js", "nodejs");
        m.insert("node js", "nodejs");
        m.insert("node", "nodejs");
        m.insert("express.js", "express");
        m.insert("expressjs", "express");
        m.insert("fast api", "fastapi");
        m.insert("postgres", "postgresql");
        m.insert("pg", "postgresql");
        m.insert("mongo", "mongodb");
        m.insert("amazon web services", "aws");
        m.insert("gcp", "google cloud platform");
        m.insert("google cloud", "google cloud platform");
        m.insert("k8s", "kubernetes");
        m.insert("html5", "html");
        m.insert("css3", "css");
        m
    };
}

/// Normalize a single skill token to its canonical form
///
/// Lowercases, trims whitespace and trailing punctuation, then applies
/// alias substitution.
pub fn normalize_skill(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .to_lowercase()
        .trim_end_matches(['.', ',', ';', ':'])
        .to_string();
    match SKILL_ALIASES.get(cleaned.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => cleaned,
    }
}

/// Normalize a list of skill tokens, deduplicating while preserving order
pub fn normalize_skills<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for item in raw {
        let canonical = normalize_skill(item.as_ref());
        if !canonical.is_empty() && seen.insert(canonical.clone()) {
            result.push(canonical);
        }
    }
    result
}
