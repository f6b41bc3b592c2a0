//! Tag enrichment: before similarity search, mine additional tags out
//! of the request text itself so retrieval can be biased toward
//! artifacts that share a language, API, verb class, or data format
//! even when the wording differs.

use once_cell::sync::Lazy;
use regex::Regex;

struct TagPattern {
    pattern: Regex,
    tag: &'static str,
}

static TAG_PATTERNS: Lazy<Vec<TagPattern>> = Lazy::new(|| {
    let rules: &[(&str, &str)] = &[
        (r"(?i)\bpython\b", "lang:python"),
        (r"(?i)\brust\b", "lang:rust"),
        (r"(?i)\btype\s*script\b", "lang:typescript"),
        (r"(?i)\bjava\s*script\b", "lang:javascript"),
        (r"(?i)\bgo(lang)?\b", "lang:go"),
        (r"(?i)\bsql\b", "lang:sql"),
        (r"(?i)\bredis\b", "api:redis"),
        (r"(?i)\bpostgres(ql)?\b", "api:postgres"),
        (r"(?i)\bs3\b|\bamazon s3\b", "api:s3"),
        (r"(?i)\bkafka\b", "api:kafka"),
        (r"(?i)\bstripe\b", "api:stripe"),
        (r"(?i)\bvalidat(e|es|ing|ion)\b", "verb:validate"),
        (r"(?i)\bpars(e|es|ing)\b", "verb:parse"),
        (r"(?i)\bsort(s|ing)?\b", "verb:sort"),
        (r"(?i)\bdedup(e|licat)", "verb:dedupe"),
        (r"(?i)\bsummariz(e|es|ing)\b", "verb:summarize"),
        (r"(?i)\bjson\b", "format:json"),
        (r"(?i)\bcsv\b", "format:csv"),
        (r"(?i)\byaml\b", "format:yaml"),
        (r"(?i)\bxml\b", "format:xml"),
        (r"(?i)\bprotobuf|protocol buffer", "format:protobuf"),
    ];
    rules
        .iter()
        .map(|(pattern, tag)| TagPattern { pattern: Regex::new(pattern).expect("static tag pattern is valid"), tag })
        .collect()
});

/// Scan `text` against the static tag-pattern table, returning every
/// tag whose pattern matched at least once. Order follows the table,
/// not the text, and duplicates are impossible since each pattern
/// contributes at most one tag.
pub fn enrich_tags(text: &str) -> Vec<String> {
    TAG_PATTERNS
        .iter()
        .filter(|rule| rule.pattern.is_match(text))
        .map(|rule| rule.tag.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_language_api_verb_and_format() {
        let tags = enrich_tags("validate a CSV upload against the Stripe API in Python");
        assert!(tags.contains(&"lang:python".to_string()));
        assert!(tags.contains(&"api:stripe".to_string()));
        assert!(tags.contains(&"verb:validate".to_string()));
        assert!(tags.contains(&"format:csv".to_string()));
    }

    #[test]
    fn no_matches_returns_empty() {
        assert!(enrich_tags("do the thing with the widget").is_empty());
    }
}
