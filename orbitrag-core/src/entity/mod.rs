//! Entity and relation extraction.
//!
//! Extraction is precision oriented: an entity is only ever produced by a
//! gazetteer or shape match, and a relation only by a rule from the table in
//! [`rules`]. Text that matches nothing yields an empty [`ExtractionOutput`].

/// Domain vocabulary
pub mod gazetteer;
/// Relation and attribute rule tables
pub mod rules;

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::config::ExtractionConfig;
use crate::core::{
    merge_attributes, EntityCandidate, EntityId, RelationCandidate, Result, SourceRef,
};
use crate::text::{normalize_key, Sentence, TextNormalizer};

pub use gazetteer::{Gazetteer, GazetteerEntry, Mention, DEFAULT_GAZETTEER};
pub use rules::{
    AttributeRule, RelationRule, RuleError, RuleSet, DEFAULT_ATTRIBUTE_RULES,
    DEFAULT_RELATION_RULES,
};

/// Words allowed between coordinated mentions ("Imager, Sounder and VHRR")
const COORDINATORS: &[&str] = &[
    "and", "or", "as", "well", "plus", "also", "along", "with", "the", "a", "an",
];

/// Candidates extracted from one piece of text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutput {
    /// Entity candidates, deduplicated by id in first-seen order
    pub entities: Vec<EntityCandidate>,
    /// Relation candidates, deduplicated by identity key
    pub relations: Vec<RelationCandidate>,
}

impl ExtractionOutput {
    /// True when no pattern matched
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Ids of every entity mentioned
    pub fn entity_ids(&self) -> BTreeSet<EntityId> {
        self.entities.iter().map(EntityCandidate::entity_id).collect()
    }
}

#[derive(Default)]
struct Accumulator {
    entities: IndexMap<EntityId, EntityCandidate>,
    relations: IndexMap<(EntityId, EntityId, String), RelationCandidate>,
}

impl Accumulator {
    fn add_entity(&mut self, candidate: EntityCandidate) {
        match self.entities.get_mut(&candidate.entity_id()) {
            Some(existing) => {
                merge_attributes(&mut existing.attributes, &candidate.attributes);
                if candidate.name < existing.name {
                    existing.name = candidate.name;
                }
            },
            None => {
                self.entities.insert(candidate.entity_id(), candidate);
            },
        }
    }

    fn add_relation(&mut self, candidate: RelationCandidate) {
        let key = (
            candidate.source.entity_id(),
            candidate.target.entity_id(),
            candidate.relation_type.clone(),
        );
        match self.relations.get_mut(&key) {
            Some(existing) if candidate.confidence > existing.confidence => {
                existing.confidence = candidate.confidence;
            },
            Some(_) => {},
            None => {
                self.relations.insert(key, candidate);
            },
        }
    }

    fn finish(self) -> ExtractionOutput {
        ExtractionOutput {
            entities: self.entities.into_values().collect(),
            relations: self.relations.into_values().collect(),
        }
    }
}

/// Pattern-based entity and relation extractor
#[derive(Debug, Clone)]
pub struct Extractor {
    normalizer: TextNormalizer,
    gazetteer: Gazetteer,
    rules: RuleSet,
    min_confidence: f32,
}

impl Extractor {
    /// Extractor with the default domain tables
    pub fn new() -> Result<Self> {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Extractor with the default domain tables and configured threshold
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::new(),
            gazetteer: Gazetteer::default_domain()?,
            rules: RuleSet::default_domain()?,
            min_confidence: config.min_confidence,
        })
    }

    /// Replace the vocabulary
    pub fn with_gazetteer(mut self, gazetteer: Gazetteer) -> Self {
        self.gazetteer = gazetteer;
        self
    }

    /// Replace the rule table
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// The vocabulary in use
    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// Normalize `text` and extract candidates tagged with `source_ref`
    pub fn extract(&self, text: &str, source_ref: &SourceRef) -> ExtractionOutput {
        self.extract_sentences(self.normalizer.sentences(text), source_ref)
    }

    /// Extract candidates from an already normalized sentence sequence
    pub fn extract_sentences<I>(&self, sentences: I, source_ref: &SourceRef) -> ExtractionOutput
    where
        I: IntoIterator<Item = Sentence>,
    {
        let mut acc = Accumulator::default();
        let mut sentence_count = 0usize;
        for sentence in sentences {
            sentence_count += 1;
            self.extract_sentence(&sentence.text, source_ref, &mut acc);
        }
        let output = acc.finish();
        tracing::debug!(
            source_ref = %source_ref,
            sentences = sentence_count,
            entities = output.entities.len(),
            relations = output.relations.len(),
            "extraction finished"
        );
        output
    }

    /// Entity mentions in `text`, sentence by sentence, in reading order.
    ///
    /// Offsets are relative to the normalized sentence containing the mention.
    pub fn extract_mentions(&self, text: &str) -> Vec<Mention> {
        self.normalizer
            .sentences(text)
            .flat_map(|sentence| self.mentions_in(&sentence.text))
            .collect()
    }

    fn mentions_in(&self, sentence: &str) -> Vec<Mention> {
        let mut mentions: Vec<Mention> = self
            .gazetteer
            .find_mentions(sentence)
            .into_iter()
            .filter(|m| m.confidence >= self.min_confidence)
            .collect();
        self.apply_attribute_rules(sentence, &mut mentions);
        mentions
    }

    fn apply_attribute_rules(&self, sentence: &str, mentions: &mut [Mention]) {
        for compiled in self.rules.attribute_rules() {
            for caps in compiled.regex.captures_iter(sentence) {
                let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let subjects = compiled.rule.subjects;
                let subject = mentions
                    .iter()
                    .rposition(|m| m.end <= whole.start() && subjects.contains(&m.entity_type))
                    .or_else(|| mentions.iter().position(|m| subjects.contains(&m.entity_type)));
                if let Some(index) = subject {
                    mentions[index]
                        .attributes
                        .entry(compiled.rule.attribute.to_string())
                        .or_insert_with(|| normalize_key(value.as_str()).replace(' ', "-"));
                }
            }
        }
    }

    fn extract_sentence(&self, sentence: &str, source_ref: &SourceRef, acc: &mut Accumulator) {
        let mentions = self.mentions_in(sentence);
        if mentions.is_empty() {
            return;
        }
        for mention in &mentions {
            acc.add_entity(mention.to_candidate(source_ref));
        }

        let gaps: Vec<Vec<String>> = mentions
            .windows(2)
            .map(|pair| gap_words(&sentence[pair[0].end..pair[1].start]))
            .collect();

        for (i, gap) in gaps.iter().enumerate() {
            let gap_refs: Vec<&str> = gap.iter().map(String::as_str).collect();
            for rule in self.rules.relation_rules() {
                if rule.confidence < self.min_confidence {
                    continue;
                }
                if !rule.matches(mentions[i].entity_type, mentions[i + 1].entity_type, &gap_refs) {
                    continue;
                }
                self.emit(rule, &mentions[i], &mentions[i + 1], source_ref, acc);

                // "<Sat> carries Imager, Sounder and VHRR"
                let mut k = i + 2;
                while k < mentions.len()
                    && is_coordination(&gaps[k - 1])
                    && rule.right.contains(&mentions[k].entity_type)
                {
                    self.emit(rule, &mentions[i], &mentions[k], source_ref, acc);
                    k += 1;
                }

                // "INSAT-3D and KALPANA-1 carry VHRR"
                let mut k = i;
                while k > 0 && is_coordination(&gaps[k - 1]) && rule.left.contains(&mentions[k - 1].entity_type) {
                    self.emit(rule, &mentions[k - 1], &mentions[i + 1], source_ref, acc);
                    k -= 1;
                }
            }
        }
    }

    fn emit(
        &self,
        rule: &RelationRule,
        left: &Mention,
        right: &Mention,
        source_ref: &SourceRef,
        acc: &mut Accumulator,
    ) {
        let (source, target) = if rule.reverse { (right, left) } else { (left, right) };
        if source.entity_id() == target.entity_id() {
            return;
        }
        acc.add_relation(RelationCandidate::new(
            source.to_candidate(source_ref),
            target.to_candidate(source_ref),
            rule.relation_type,
            rule.confidence,
            source_ref.clone(),
        ));
    }
}

fn gap_words(gap: &str) -> Vec<String> {
    normalize_key(gap)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

fn is_coordination(gap: &[String]) -> bool {
    gap.iter().all(|w| COORDINATORS.contains(&w.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityType;

    fn extract(text: &str) -> ExtractionOutput {
        Extractor::new().unwrap().extract(text, &SourceRef::new("doc-1"))
    }

    fn triples(output: &ExtractionOutput) -> Vec<(String, String, String)> {
        output
            .relations
            .iter()
            .map(|r| (r.source.name.clone(), r.relation_type.clone(), r.target.name.clone()))
            .collect()
    }

    #[test]
    fn unmatched_text_yields_nothing() {
        assert!(extract("The weather is pleasant today.").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn satellite_carries_instrument() {
        let output = extract("INSAT-3D carries a six channel Imager.");
        assert_eq!(
            triples(&output),
            vec![("INSAT-3D".to_string(), "carries".to_string(), "Imager".to_string())]
        );
        let relation = &output.relations[0];
        assert_eq!(relation.confidence, 0.9);
        assert_eq!(relation.source_ref, SourceRef::new("doc-1"));
        assert_eq!(relation.source.entity_type, EntityType::Satellite);
    }

    #[test]
    fn mission_operated_by_organization() {
        let output = extract("The Chandrayaan mission is operated by ISRO.");
        assert!(triples(&output).contains(&(
            "Chandrayaan".to_string(),
            "operated_by".to_string(),
            "ISRO".to_string()
        )));
    }

    #[test]
    fn multiple_rules_fire_in_one_sentence() {
        let output = extract("OCEANSAT-2 carries OCM which measures chlorophyll. SST is available in NetCDF.");
        let found = triples(&output);
        assert!(found.contains(&("OCEANSAT-2".into(), "carries".into(), "OCM".into())));
        assert!(found.contains(&("OCM".into(), "measures".into(), "Chlorophyll".into())));
        assert!(found.contains(&("SST".into(), "available_in".into(), "NetCDF".into())));
    }

    #[test]
    fn passive_rules_reverse_direction() {
        let output = extract("The AltiKa altimeter onboard SARAL measures sea surface height.");
        let found = triples(&output);
        assert!(found.contains(&("SARAL".into(), "carries".into(), "AltiKa".into())));
    }

    #[test]
    fn coordinated_mentions_share_the_relation() {
        let output = extract("INSAT-3D carries the Imager, the Sounder and the Data Relay Transponder.");
        let found = triples(&output);
        assert!(found.contains(&("INSAT-3D".into(), "carries".into(), "Imager".into())));
        assert!(found.contains(&("INSAT-3D".into(), "carries".into(), "Sounder".into())));
        assert!(found.contains(&("INSAT-3D".into(), "carries".into(), "Data Relay Transponder".into())));

        let output = extract("INSAT-3D and KALPANA-1 carry VHRR.");
        let found = triples(&output);
        assert!(found.contains(&("INSAT-3D".into(), "carries".into(), "VHRR".into())));
        assert!(found.contains(&("KALPANA-1".into(), "carries".into(), "VHRR".into())));
    }

    #[test]
    fn attribute_rules_annotate_the_subject() {
        let output = extract("INSAT-3D was launched in July 2013 into a geostationary orbit.");
        let insat = output
            .entities
            .iter()
            .find(|e| e.name == "INSAT-3D")
            .unwrap();
        assert_eq!(insat.attributes.get("launch_year").map(String::as_str), Some("2013"));
        assert_eq!(insat.attributes.get("orbit").map(String::as_str), Some("geostationary"));
        assert_eq!(insat.attributes.get("series").map(String::as_str), Some("INSAT"));
    }

    #[test]
    fn repeated_mentions_are_deduplicated() {
        let output = extract("SST from INSAT-3D. SST from INSAT-3D.");
        assert_eq!(output.entities.len(), 2);
        assert_eq!(output.relations.len(), 1);
        assert_eq!(output.relations[0].relation_type, "derived_from");
    }

    #[test]
    fn high_threshold_drops_weak_candidates() {
        let extractor = Extractor::from_config(&ExtractionConfig { min_confidence: 0.88 }).unwrap();
        let output = extractor.extract("SST from INSAT-3D. The Venus mission carries OCM.", &SourceRef::new("d"));
        assert!(output.relations.is_empty());
        assert!(output.entities.iter().all(|e| e.name != "Venus"));
    }

    #[test]
    fn query_mentions() {
        let extractor = Extractor::new().unwrap();
        let mentions = extractor.extract_mentions("Which instruments does insat-3d carry?");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].name, "INSAT-3D");
    }
}
