//! Relation and attribute rule tables.
//!
//! A relation rule reads as `<left> [lead] TRIGGER [trail] <right>` over two
//! adjacent typed mentions in one sentence: the words between the mentions must
//! contain one of the trigger phrases, preceded by at most `max_lead` words and
//! followed by at most `max_trail` words.

use regex::Regex;
use thiserror::Error;

use crate::core::EntityType;
use crate::text::normalize_key;

use EntityType::{DataProduct, Format, Instrument, Mission, Organization, Other, Satellite};

/// Errors raised while validating a rule table
#[derive(Error, Debug, PartialEq)]
pub enum RuleError {
    /// A rule has no trigger phrases
    #[error("rule '{rule}' has no triggers")]
    NoTriggers {
        /// Rule name
        rule: String,
    },

    /// A rule binds no entity type on one side
    #[error("rule '{rule}' binds no entity types on the {side} side")]
    NoBindings {
        /// Rule name
        rule: String,
        /// "left" or "right"
        side: &'static str,
    },

    /// Default confidence outside [0, 1]
    #[error("rule '{rule}' has confidence {confidence} outside [0, 1]")]
    InvalidConfidence {
        /// Rule name
        rule: String,
        /// Offending value
        confidence: f32,
    },

    /// Two rules share a name
    #[error("duplicate rule name '{rule}'")]
    DuplicateName {
        /// Rule name
        rule: String,
    },
}

/// One relation pattern
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRule {
    /// Unique rule name
    pub name: &'static str,
    /// Types accepted for the earlier mention
    pub left: &'static [EntityType],
    /// Trigger phrases, matched against normalized words
    pub triggers: &'static [&'static str],
    /// Types accepted for the later mention
    pub right: &'static [EntityType],
    /// Relation label emitted
    pub relation_type: &'static str,
    /// Default confidence emitted
    pub confidence: f32,
    /// Emit the later mention as the relation source
    pub reverse: bool,
    /// Words allowed before the trigger
    pub max_lead: usize,
    /// Words allowed after the trigger
    pub max_trail: usize,
}

impl RelationRule {
    /// Whether the rule fires for mentions of these types separated by `gap` words
    pub fn matches(&self, left: EntityType, right: EntityType, gap: &[&str]) -> bool {
        if !self.left.contains(&left) || !self.right.contains(&right) {
            return false;
        }
        self.triggers.iter().any(|trigger| {
            let words: Vec<&str> = trigger.split_whitespace().collect();
            if words.is_empty() || words.len() > gap.len() {
                return false;
            }
            (0..=gap.len() - words.len()).any(|lead| {
                let trail = gap.len() - lead - words.len();
                lead <= self.max_lead && trail <= self.max_trail && gap[lead..lead + words.len()] == words[..]
            })
        })
    }
}

/// An attribute pattern applied to the nearest preceding subject mention
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRule {
    /// Attribute key written on the subject
    pub attribute: &'static str,
    /// Regex whose first group is the attribute value
    pub pattern: &'static str,
    /// Types that can carry the attribute
    pub subjects: &'static [EntityType],
}

const fn rule(
    name: &'static str,
    left: &'static [EntityType],
    triggers: &'static [&'static str],
    right: &'static [EntityType],
    relation_type: &'static str,
    confidence: f32,
) -> RelationRule {
    RelationRule {
        name,
        left,
        triggers,
        right,
        relation_type,
        confidence,
        reverse: false,
        max_lead: 2,
        max_trail: 2,
    }
}

const fn reversed(mut rule: RelationRule) -> RelationRule {
    rule.reverse = true;
    rule
}

const fn window(mut rule: RelationRule, max_lead: usize, max_trail: usize) -> RelationRule {
    rule.max_lead = max_lead;
    rule.max_trail = max_trail;
    rule
}

const PLATFORMS: &[EntityType] = &[Satellite, Mission];
const OBSERVERS: &[EntityType] = &[Satellite, Instrument, Mission];

/// Default relation rules for the satellite data domain
pub const DEFAULT_RELATION_RULES: &[RelationRule] = &[
    window(
        rule(
            "platform_carries_instrument",
            PLATFORMS,
            &["carries", "carry", "carried", "has onboard", "has on board", "is equipped with", "equipped with", "hosts", "has", "payloads include", "payload includes", "payloads are", "payload is"],
            &[Instrument],
            "carries",
            0.9,
        ),
        3,
        3,
    ),
    window(
        reversed(rule(
            "instrument_onboard_platform",
            &[Instrument],
            &["onboard", "on board", "aboard", "carried by", "carried on", "flown on", "flying on", "mounted on", "on"],
            PLATFORMS,
            "carries",
            0.85,
        )),
        3,
        1,
    ),
    rule(
        "operated_by_organization",
        &[Satellite, Mission, Organization, Other],
        &["operated by", "managed by", "run by", "maintained by", "controlled by", "hosted by"],
        &[Organization],
        "operated_by",
        0.85,
    ),
    rule(
        "organization_operates",
        &[Organization],
        &["operates", "operate", "manages", "runs", "maintains", "controls"],
        &[Satellite, Mission, Organization],
        "operates",
        0.85,
    ),
    window(
        rule(
            "observer_generates_product",
            OBSERVERS,
            &["generates", "generate", "produces", "produce", "provides", "provide", "delivers", "yields", "offers", "supplies"],
            &[DataProduct],
            "generates",
            0.8,
        ),
        2,
        3,
    ),
    window(
        rule(
            "observer_measures_product",
            OBSERVERS,
            &["measures", "measure", "monitors", "monitor", "observes", "observe", "senses", "retrieves", "maps", "tracks", "estimates"],
            &[DataProduct],
            "measures",
            0.8,
        ),
        2,
        3,
    ),
    window(
        rule(
            "product_available_in_format",
            &[DataProduct, Other],
            &["available in", "distributed in", "provided in", "delivered in", "supplied in", "stored in", "archived in", "downloadable in", "formatted as", "in"],
            &[Format],
            "available_in",
            0.8,
        ),
        3,
        2,
    ),
    window(
        rule(
            "organization_provides",
            &[Organization],
            &["provides", "provide", "offers", "offer", "disseminates", "distributes", "supplies", "hosts", "serves", "archives", "shares"],
            &[DataProduct, Other, Format],
            "provides",
            0.75,
        ),
        2,
        4,
    ),
    rule(
        "part_of",
        &[Satellite, Instrument, Mission, Other, DataProduct],
        &["part of", "component of", "belongs to", "member of", "under"],
        &[Mission, Organization, Satellite, Other],
        "part_of",
        0.8,
    ),
    rule(
        "launched_by_organization",
        PLATFORMS,
        &["launched by", "built by", "developed by", "designed by", "realised by", "realized by"],
        &[Organization],
        "launched_by",
        0.85,
    ),
    window(
        rule(
            "product_derived_from",
            &[DataProduct],
            &["derived from", "obtained from", "retrieved from", "estimated from", "generated from", "produced from", "from", "produced by", "generated by", "measured by"],
            OBSERVERS,
            "derived_from",
            0.7,
        ),
        3,
        2,
    ),
    window(
        rule(
            "accessed_via_protocol",
            &[Organization, Other],
            &["supports", "support", "via", "through", "using", "accessible via", "available via", "available through"],
            &[Format],
            "accessed_via",
            0.7,
        ),
        2,
        2,
    ),
];

/// Default attribute rules
pub const DEFAULT_ATTRIBUTE_RULES: &[AttributeRule] = &[
    AttributeRule {
        attribute: "launch_year",
        pattern: r"(?i)\blaunched\b(?:\s+(?:in|on|during))?(?:\s+[A-Za-z0-9,]+){0,3}?\s+((?:19|20)\d{2})\b",
        subjects: PLATFORMS,
    },
    AttributeRule {
        attribute: "orbit",
        pattern: r"(?i)\b(geostationary|geosynchronous|polar|sun[\s-]synchronous|low earth|near[\s-]equatorial|lunar|halo)\s+(?:[a-z]+\s+)?orbit",
        subjects: PLATFORMS,
    },
];

/// Compiled attribute rule
#[derive(Debug, Clone)]
pub struct CompiledAttributeRule {
    /// Source rule
    pub rule: AttributeRule,
    /// Compiled pattern
    pub regex: Regex,
}

/// A validated rule table
#[derive(Debug, Clone)]
pub struct RuleSet {
    relations: Vec<RelationRule>,
    attributes: Vec<CompiledAttributeRule>,
}

impl RuleSet {
    /// Validate and compile rule tables
    pub fn new(relations: &[RelationRule], attributes: &[AttributeRule]) -> crate::Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for rule in relations {
            if !seen.insert(rule.name) {
                return Err(RuleError::DuplicateName {
                    rule: rule.name.to_string(),
                }
                .into());
            }
            if rule.triggers.iter().all(|t| normalize_key(t).is_empty()) {
                return Err(RuleError::NoTriggers {
                    rule: rule.name.to_string(),
                }
                .into());
            }
            if rule.left.is_empty() || rule.right.is_empty() {
                return Err(RuleError::NoBindings {
                    rule: rule.name.to_string(),
                    side: if rule.left.is_empty() { "left" } else { "right" },
                }
                .into());
            }
            if !(0.0..=1.0).contains(&rule.confidence) {
                return Err(RuleError::InvalidConfidence {
                    rule: rule.name.to_string(),
                    confidence: rule.confidence,
                }
                .into());
            }
        }

        let attributes = attributes
            .iter()
            .map(|rule| {
                Ok(CompiledAttributeRule {
                    rule: rule.clone(),
                    regex: Regex::new(rule.pattern)?,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Self {
            relations: relations.to_vec(),
            attributes,
        })
    }

    /// The default domain rules
    pub fn default_domain() -> crate::Result<Self> {
        Self::new(DEFAULT_RELATION_RULES, DEFAULT_ATTRIBUTE_RULES)
    }

    /// Relation rules in evaluation order
    pub fn relation_rules(&self) -> &[RelationRule] {
        &self.relations
    }

    /// Compiled attribute rules
    pub fn attribute_rules(&self) -> &[CompiledAttributeRule] {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap(text: &str) -> Vec<String> {
        normalize_key(text).split(' ').filter(|w| !w.is_empty()).map(String::from).collect()
    }

    fn fires(rule: &RelationRule, left: EntityType, right: EntityType, between: &str) -> bool {
        let words = gap(between);
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        rule.matches(left, right, &refs)
    }

    fn rule_named(name: &str) -> &'static RelationRule {
        DEFAULT_RELATION_RULES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn default_tables_validate() {
        let rules = RuleSet::default_domain().unwrap();
        assert_eq!(rules.relation_rules().len(), DEFAULT_RELATION_RULES.len());
        assert_eq!(rules.attribute_rules().len(), DEFAULT_ATTRIBUTE_RULES.len());
    }

    #[test]
    fn trigger_window_limits_lead_and_trail() {
        let carries = rule_named("platform_carries_instrument");
        assert!(fires(carries, Satellite, Instrument, " carries an "));
        assert!(fires(carries, Satellite, Instrument, ", launched in 2013, carries the "));
        assert!(!fires(carries, Satellite, Instrument, " was launched from the coast and later carries the "));
        assert!(!fires(carries, Satellite, DataProduct, " carries "));
    }

    #[test]
    fn multiword_triggers_match_as_phrases() {
        let operated = rule_named("operated_by_organization");
        assert!(fires(operated, Mission, Organization, " is operated by "));
        assert!(!fires(operated, Mission, Organization, " is operated and funded by "));
    }

    #[test]
    fn validation_rejects_bad_rules() {
        let bad = RelationRule {
            name: "bad",
            left: &[Satellite],
            triggers: &[],
            right: &[Instrument],
            relation_type: "carries",
            confidence: 0.5,
            reverse: false,
            max_lead: 1,
            max_trail: 1,
        };
        assert!(RuleSet::new(&[bad.clone()], &[]).is_err());

        let overconfident = RelationRule {
            triggers: &["carries"],
            confidence: 1.5,
            ..bad.clone()
        };
        assert!(matches!(
            RuleSet::new(&[overconfident], &[]),
            Err(crate::OrbitRagError::EntityExtraction { .. })
        ));

        let ok = RelationRule {
            triggers: &["carries"],
            ..bad
        };
        assert!(RuleSet::new(&[ok.clone(), ok], &[]).is_err());
    }
}
