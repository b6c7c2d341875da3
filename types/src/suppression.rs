use serde::{Deserialize, Serialize};

/// Game identifier of an abnormality (status effect).
pub type AbnormalityId = u32;

/// How the client treats one abnormality id.
///
/// A blocked abnormality is never tracked and never forwarded. An overriding
/// abnormality removes the abnormality it overrides before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub id: AbnormalityId,

    #[serde(default)]
    pub blocked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<AbnormalityId>,
}

impl SuppressionRule {
    pub fn blocked(id: AbnormalityId) -> Self {
        Self {
            id,
            blocked: true,
            overrides: None,
        }
    }

    pub fn overriding(id: AbnormalityId, target: AbnormalityId) -> Self {
        Self {
            id,
            blocked: false,
            overrides: Some(target),
        }
    }
}

/// Root of a rule file: a list of `[[rule]]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default, rename = "rule")]
    pub rules: Vec<SuppressionRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_toml() {
        let toml = r#"
[[rule]]
id = 10153210
blocked = true

[[rule]]
id = 101200
overrides = 101100
"#;

        let config: RuleConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0], SuppressionRule::blocked(10153210));
        assert_eq!(config.rules[1], SuppressionRule::overriding(101200, 101100));
    }

    #[test]
    fn test_empty_rule_file() {
        let config: RuleConfig = toml::from_str("").unwrap();
        assert!(config.rules.is_empty());
    }
}
