//! Artifact exclusion patterns.
//!
//! Patterns are `groupId:artifactId` globs where `*` matches any run of
//! characters, e.g. `org.jahia.*:*` or `*:jahia-test-*`. A pattern without a
//! `:` only constrains the group id.

use anyhow::Result;
use regex::Regex;

use crate::error::AnalysisError;
use crate::models::Artifact;

#[derive(Clone, Debug)]
pub struct ExclusionPattern {
    pattern: String,
    regex: Regex,
}

impl ExclusionPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(AnalysisError::InvalidExclusion {
                pattern: pattern.to_string(),
                message: "empty pattern".to_string(),
            }
            .into());
        }

        let full = if pattern.contains(':') {
            pattern.to_string()
        } else {
            format!("{}:*", pattern)
        };
        let source = format!(
            "^{}$",
            full.split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        );
        let regex = Regex::new(&source).map_err(|e| AnalysisError::InvalidExclusion {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(ExclusionPattern {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        self.regex.is_match(&artifact.key())
    }
}

/// Compiles all patterns, failing on the first invalid one.
pub fn compile_exclusions(patterns: &[String]) -> Result<Vec<ExclusionPattern>> {
    patterns
        .iter()
        .map(|pattern| ExclusionPattern::new(pattern))
        .collect()
}

/// The first pattern excluding `artifact`.
pub fn find_exclusion<'a>(
    exclusions: &'a [ExclusionPattern],
    artifact: &Artifact,
) -> Option<&'a ExclusionPattern> {
    exclusions.iter().find(|pattern| pattern.matches(artifact))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards_match_group_and_artifact() {
        let pattern = ExclusionPattern::new("org.jahia.*:jahia-*").unwrap();
        assert!(pattern.matches(&Artifact::new("org.jahia.server", "jahia-impl", "8.0")));
        assert!(!pattern.matches(&Artifact::new("org.jahia.server", "other", "8.0")));
        assert!(!pattern.matches(&Artifact::new("org.jahiax", "jahia-impl", "8.0")));
    }

    #[test]
    fn test_dots_are_literal() {
        let pattern = ExclusionPattern::new("org.a:b").unwrap();
        assert!(pattern.matches(&Artifact::new("org.a", "b", "1")));
        assert!(!pattern.matches(&Artifact::new("orgxa", "b", "1")));
    }

    #[test]
    fn test_group_only_pattern() {
        let pattern = ExclusionPattern::new("javax.servlet").unwrap();
        assert!(pattern.matches(&Artifact::new("javax.servlet", "servlet-api", "2.5")));
        assert!(!pattern.matches(&Artifact::new("javax.servlet.jsp", "jsp-api", "2.1")));
    }

    #[test]
    fn test_empty_pattern_is_typed_error() {
        let err = compile_exclusions(&["g:a".to_string(), " ".to_string()]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::InvalidExclusion { .. })
        ));
    }

    #[test]
    fn test_find_exclusion_returns_first_match() {
        let exclusions = compile_exclusions(&["*:b".to_string(), "g:*".to_string()]).unwrap();
        let found = find_exclusion(&exclusions, &Artifact::new("g", "b", "1")).unwrap();
        assert_eq!(found.as_str(), "*:b");
        assert!(find_exclusion(&exclusions, &Artifact::new("x", "y", "1")).is_none());
    }
}
