// src/tagger.rs
//! Rule engine: assigns at most one tag to a title by matching it against an
//! ordered list of regex rules. First rule with any matching pattern wins;
//! later rules are never consulted once a match occurs.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::config::RuleConfig;
use crate::model::{Announcement, RawAnnouncement};

/// One compiled tag rule. Case-insensitivity (Unicode-aware; CJK text is not
/// case-folded and matches literally) is baked into the compiled patterns.
#[derive(Debug, Clone)]
pub struct TagRule {
    pub tag: String,
    pub patterns: Vec<Regex>,
}

/// Compile the configured rules, preserving declaration order.
///
/// A malformed pattern is a startup error naming the offending rule and
/// pattern; a silently skipped rule would swallow a whole category.
pub fn compile_rules(configs: &[RuleConfig]) -> Result<Vec<TagRule>> {
    let mut rules = Vec::with_capacity(configs.len());
    for cfg in configs {
        let mut patterns = Vec::with_capacity(cfg.patterns.len());
        for pat in &cfg.patterns {
            let re = RegexBuilder::new(pat)
                .case_insensitive(!cfg.case_sensitive)
                .build()
                .with_context(|| {
                    format!("invalid pattern {pat:?} in tag rule {:?}", cfg.tag)
                })?;
            patterns.push(re);
        }
        rules.push(TagRule {
            tag: cfg.tag.clone(),
            patterns,
        });
    }
    Ok(rules)
}

/// Return the tag of the first rule (in declaration order) with at least one
/// pattern matching anywhere in the title, or `None` if nothing matches.
pub fn classify<'r>(title: &str, rules: &'r [TagRule]) -> Option<&'r str> {
    for rule in rules {
        if rule.patterns.iter().any(|re| re.is_match(title)) {
            return Some(&rule.tag);
        }
    }
    None
}

/// Classify a raw announcement and carry the result into an [`Announcement`].
pub fn tag_announcement(raw: RawAnnouncement, rules: &[TagRule]) -> Announcement {
    let tag = classify(&raw.title, rules).map(str::to_owned);
    Announcement::from_raw(raw, tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(defs: &[(&str, bool, &[&str])]) -> Vec<TagRule> {
        let configs: Vec<RuleConfig> = defs
            .iter()
            .map(|(tag, cs, pats)| RuleConfig {
                tag: tag.to_string(),
                case_sensitive: *cs,
                patterns: pats.iter().map(|p| p.to_string()).collect(),
            })
            .collect();
        compile_rules(&configs).unwrap()
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = rules(&[
            ("delist", false, &["delist", "下架"]),
            ("listing", false, &["will list"]),
        ]);
        assert_eq!(classify("Notice on Token XYZ Delisting", &rules), Some("delist"));
        assert_eq!(classify("Binance Will List ABC", &rules), Some("listing"));
        assert_eq!(classify("Scheduled Maintenance", &rules), None);
    }

    #[test]
    fn earlier_rule_shadows_later_one() {
        let rules = rules(&[
            ("delist", false, &["token"]),
            ("listing", false, &["token"]),
        ]);
        // Both rules match; declaration order decides.
        assert_eq!(classify("Token news", &rules), Some("delist"));
    }

    #[test]
    fn case_insensitive_ascii_and_literal_cjk() {
        let rules = rules(&[("delist", false, &["delist", "下架"])]);
        assert_eq!(classify("DELISTING notice", &rules), Some("delist"));
        assert_eq!(classify("DeLiSt soon", &rules), Some("delist"));
        assert_eq!(classify("关于下架 DEF/USDT 交易对的公告", &rules), Some("delist"));
    }

    #[test]
    fn case_sensitive_rule_requires_exact_case() {
        let rules = rules(&[("listing", true, &["Will List"])]);
        assert_eq!(classify("Binance Will List ABC", &rules), Some("listing"));
        assert_eq!(classify("binance will list abc", &rules), None);
    }

    #[test]
    fn patterns_within_a_rule_are_ored() {
        let rules = rules(&[("listing", false, &["will list", "上线", "new listing"])]);
        assert_eq!(classify("币安将上线 XYZ/USDT 交易对", &rules), Some("listing"));
        assert_eq!(classify("New Listing: GHI", &rules), Some("listing"));
    }

    #[test]
    fn malformed_pattern_fails_fast_naming_rule_and_pattern() {
        let configs = vec![RuleConfig {
            tag: "broken".into(),
            case_sensitive: false,
            patterns: vec!["ok".into(), "(unclosed".into()],
        }];
        let err = compile_rules(&configs).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("broken"), "missing rule tag in: {msg}");
        assert!(msg.contains("(unclosed"), "missing pattern in: {msg}");
    }

    #[test]
    fn empty_rule_list_tags_nothing() {
        assert_eq!(classify("anything at all", &[]), None);
    }
}
