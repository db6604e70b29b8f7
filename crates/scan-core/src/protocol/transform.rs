//! Sandboxed value-rewriting rules.
//!
//! Hosts that need to rewrite a scanned value (strip a leading check digit,
//! normalise case, ...) describe the rewrite as data instead of supplying
//! code.  A [`TransformPipeline`] serialises to JSON or TOML, so the same
//! rules can run in the widget or be registered with the server relay.
//!
//! ```toml
//! [[rules]]
//! op = "strip_prefix"
//! prefix = "0"
//! formats = [8]          # only ITF
//!
//! [[rules]]
//! op = "uppercase"
//! ```

use serde::{Deserialize, Serialize};

/// One string operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOp {
    /// Removes every leading `'0'`.
    StripLeadingZeros,
    /// Removes `prefix` once, if present.
    StripPrefix { prefix: String },
    /// Removes `suffix` once, if present.
    StripSuffix { suffix: String },
    Uppercase,
    Lowercase,
    /// Replaces every occurrence of `from` with `to`.
    Replace { from: String, to: String },
}

impl TransformOp {
    fn apply(&self, value: &str) -> String {
        match self {
            TransformOp::StripLeadingZeros => value.trim_start_matches('0').to_string(),
            TransformOp::StripPrefix { prefix } => {
                value.strip_prefix(prefix.as_str()).unwrap_or(value).to_string()
            }
            TransformOp::StripSuffix { suffix } => {
                value.strip_suffix(suffix.as_str()).unwrap_or(value).to_string()
            }
            TransformOp::Uppercase => value.to_uppercase(),
            TransformOp::Lowercase => value.to_lowercase(),
            TransformOp::Replace { from, to } if !from.is_empty() => value.replace(from.as_str(), to),
            TransformOp::Replace { .. } => value.to_string(),
        }
    }
}

/// An operation restricted to a set of format codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRule {
    #[serde(flatten)]
    pub op: TransformOp,
    /// Format codes the rule applies to; empty means every format.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<u32>,
}

impl TransformRule {
    pub fn new(op: TransformOp) -> Self {
        Self { op, formats: Vec::new() }
    }

    pub fn only_for(mut self, formats: Vec<u32>) -> Self {
        self.formats = formats;
        self
    }

    fn applies_to(&self, format_code: u32) -> bool {
        self.formats.is_empty() || self.formats.contains(&format_code)
    }
}

/// An ordered list of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformPipeline {
    #[serde(default)]
    pub rules: Vec<TransformRule>,
}

impl TransformPipeline {
    pub fn new(rules: Vec<TransformRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every applicable rule in order.
    pub fn apply(&self, value: &str, format_code: u32) -> String {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(format_code))
            .fold(value.to_string(), |acc, rule| rule.op.apply(&acc))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_zeros() {
        let pipeline = TransformPipeline::new(vec![TransformRule::new(TransformOp::StripLeadingZeros)]);
        assert_eq!(pipeline.apply("000123", 6), "123");
        assert_eq!(pipeline.apply("0000", 6), "");
    }

    #[test]
    fn test_rule_scoped_to_format_only_runs_for_that_format() {
        // ITF values with a leading zero lose exactly one character.
        let pipeline = TransformPipeline::new(vec![TransformRule::new(TransformOp::StripPrefix {
            prefix: "0".to_string(),
        })
        .only_for(vec![8])]);

        assert_eq!(pipeline.apply("00123", 8), "0123");
        assert_eq!(pipeline.apply("00123", 6), "00123");
        assert_eq!(pipeline.apply("123", 8), "123");
    }

    #[test]
    fn test_rules_apply_in_order() {
        let pipeline = TransformPipeline::new(vec![
            TransformRule::new(TransformOp::Replace {
                from: "-".to_string(),
                to: "".to_string(),
            }),
            TransformRule::new(TransformOp::Uppercase),
            TransformRule::new(TransformOp::StripSuffix {
                suffix: "X".to_string(),
            }),
        ]);
        assert_eq!(pipeline.apply("ab-cd-x", 0), "ABCD");
    }

    #[test]
    fn test_empty_replace_pattern_is_noop() {
        let op = TransformOp::Replace {
            from: String::new(),
            to: "z".to_string(),
        };
        assert_eq!(op.apply("abc"), "abc");
    }

    #[test]
    fn test_empty_pipeline_returns_input() {
        assert_eq!(TransformPipeline::default().apply("xyz", 0), "xyz");
    }

    #[test]
    fn test_pipeline_json_shape() {
        let json = r#"{"rules":[{"op":"strip_prefix","prefix":"0","formats":[8]},{"op":"lowercase"}]}"#;
        let pipeline: TransformPipeline = serde_json::from_str(json).unwrap();
        assert_eq!(pipeline.rules.len(), 2);
        assert_eq!(pipeline.rules[0].formats, vec![8]);
        assert_eq!(pipeline.rules[1].op, TransformOp::Lowercase);
        assert_eq!(pipeline.apply("0ABC", 8), "abc");
    }
}
