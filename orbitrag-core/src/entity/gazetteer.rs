//! Domain gazetteer: the fixed vocabulary of satellites, instruments,
//! products, formats and organizations recognized in text.
//!
//! Each entry compiles to one case-insensitive, word-bounded regex. Series
//! entries (satellite families) also accept a numbered suffix, so
//! `Oceansat 2` and `OCEANSAT-2` both resolve to the mention `OCEANSAT-2`.

use std::collections::BTreeMap;

use regex::Regex;

use crate::core::{EntityCandidate, EntityId, EntityType, Result, SourceRef};

/// Confidence assigned to gazetteer hits
pub const GAZETTEER_CONFIDENCE: f32 = 0.9;
/// Confidence assigned to `<Name> mission` shape matches
pub const MISSION_SHAPE_CONFIDENCE: f32 = 0.6;

/// One vocabulary entry
#[derive(Debug, Clone, Copy)]
pub struct GazetteerEntry {
    /// Canonical display name
    pub canonical: &'static str,
    /// Alternative surface forms
    pub aliases: &'static [&'static str],
    /// Entity type bound by this entry
    pub entity_type: EntityType,
    /// Accepts a numbered suffix (`INSAT-3D`, `CARTOSAT-2`)
    pub series: bool,
    /// Short description stored as an attribute
    pub description: Option<&'static str>,
}

const fn entry(
    canonical: &'static str,
    aliases: &'static [&'static str],
    entity_type: EntityType,
    description: Option<&'static str>,
) -> GazetteerEntry {
    GazetteerEntry {
        canonical,
        aliases,
        entity_type,
        series: false,
        description,
    }
}

const fn series(canonical: &'static str, aliases: &'static [&'static str], description: &'static str) -> GazetteerEntry {
    GazetteerEntry {
        canonical,
        aliases,
        entity_type: EntityType::Satellite,
        series: true,
        description: Some(description),
    }
}

use EntityType::{DataProduct, Format, Instrument, Mission, Organization, Other};

/// Vocabulary of the satellite data portal domain
pub const DEFAULT_GAZETTEER: &[GazetteerEntry] = &[
    // Satellites
    series("INSAT", &[], "Indian National Satellite System, geostationary meteorology and communication"),
    series("KALPANA", &["METSAT"], "Geostationary meteorological satellite"),
    series("OCEANSAT", &[], "Ocean observation satellite series"),
    series("CARTOSAT", &[], "Cartography satellite series"),
    series("RESOURCESAT", &["IRS-P6"], "Natural resource monitoring satellite series"),
    series("RISAT", &[], "Radar imaging satellite series"),
    series("SARAL", &[], "Satellite with ARgos and ALtiKa, joint ISRO and CNES altimetry mission"),
    series("SCATSAT", &[], "Scatterometer satellite for ocean surface winds"),
    series("MEGHA-TROPIQUES", &["Megha Tropiques"], "Tropical water cycle and energy budget satellite"),
    series("ASTROSAT", &[], "Multi-wavelength space observatory"),
    series("EOS", &[], "Earth observation satellite series"),
    // Missions
    entry("Chandrayaan", &["Chandrayaan-1", "Chandrayaan-2", "Chandrayaan-3"], Mission, Some("Lunar exploration mission")),
    entry("Mangalyaan", &["Mars Orbiter Mission", "MOM"], Mission, Some("Mars orbiter mission")),
    entry("Aditya-L1", &["Aditya L1"], Mission, Some("Solar observation mission")),
    entry("Gaganyaan", &[], Mission, Some("Human spaceflight mission")),
    // Instruments
    entry("Imager", &["6 channel imager", "six channel imager"], Instrument, Some("Multi-spectral radiometer imaging the earth disk")),
    entry("Sounder", &["19 channel sounder", "atmospheric sounder"], Instrument, Some("Atmospheric temperature and humidity profiler")),
    entry("VHRR", &["Very High Resolution Radiometer"], Instrument, Some("Very high resolution radiometer")),
    entry("OCM", &["Ocean Colour Monitor", "Ocean Color Monitor"], Instrument, Some("Ocean colour monitor")),
    entry("OSCAT", &["scatterometer", "Ku-band scatterometer"], Instrument, Some("Pencil-beam Ku-band scatterometer")),
    entry("AltiKa", &["Ka-band altimeter"], Instrument, Some("Ka-band radar altimeter")),
    entry("MADRAS", &[], Instrument, Some("Microwave imager for precipitation and cloud studies")),
    entry("SAPHIR", &[], Instrument, Some("Microwave humidity sounder")),
    entry("ScaRaB", &[], Instrument, Some("Radiation budget scanner")),
    entry("LISS-III", &["LISS 3", "LISS-3", "LISS III"], Instrument, Some("Linear imaging self scanner, medium resolution")),
    entry("LISS-IV", &["LISS 4", "LISS-4", "LISS IV"], Instrument, Some("Linear imaging self scanner, high resolution")),
    entry("AWiFS", &["Advanced Wide Field Sensor"], Instrument, Some("Advanced wide field sensor")),
    entry("Data Relay Transponder", &["DRT"], Instrument, Some("Relays data from automatic weather stations")),
    // Organizations
    entry("ISRO", &["Indian Space Research Organisation", "Indian Space Research Organization"], Organization, Some("Indian Space Research Organisation")),
    entry("MOSDAC", &["Meteorological and Oceanographic Satellite Data Archival Centre"], Organization, Some("Meteorological and oceanographic satellite data portal")),
    entry("SAC", &["Space Applications Centre", "Space Applications Center"], Organization, Some("Space Applications Centre, Ahmedabad")),
    entry("NRSC", &["National Remote Sensing Centre"], Organization, Some("National Remote Sensing Centre")),
    entry("IMD", &["India Meteorological Department"], Organization, Some("India Meteorological Department")),
    entry("NOAA", &[], Organization, Some("US National Oceanic and Atmospheric Administration")),
    entry("EUMETSAT", &[], Organization, Some("European meteorological satellite agency")),
    entry("CNES", &[], Organization, Some("French space agency")),
    entry("NASA", &[], Organization, Some("US space agency")),
    // Data products
    entry("SST", &["Sea Surface Temperature", "sea surface temperatures"], DataProduct, Some("Sea surface temperature")),
    entry("Chlorophyll", &["chlorophyll-a", "chlorophyll concentration", "chl-a"], DataProduct, Some("Ocean chlorophyll concentration")),
    entry("Wind Data", &["wind speed", "wind vector", "wind vectors", "ocean surface winds", "surface winds", "wind_data"], DataProduct, Some("Ocean surface wind speed and direction")),
    entry("Significant Wave Height", &["wave height", "SWH"], DataProduct, Some("Significant wave height")),
    entry("Bathymetry", &[], DataProduct, Some("Ocean depth")),
    entry("Land Cover", &["land use land cover", "LULC", "land_cover"], DataProduct, Some("Land use and land cover classification")),
    entry("NDVI", &["Normalized Difference Vegetation Index", "vegetation index"], DataProduct, Some("Normalized difference vegetation index")),
    entry("Ocean Colour", &["Ocean Color"], DataProduct, Some("Ocean colour radiance products")),
    entry("Altimetry", &["sea surface height", "SSH"], DataProduct, Some("Sea surface height from altimetry")),
    entry("Rainfall", &["precipitation", "rain rate", "HEM"], DataProduct, Some("Rainfall estimates")),
    entry("OLR", &["Outgoing Longwave Radiation"], DataProduct, Some("Outgoing longwave radiation")),
    entry("Cloud Motion Vectors", &["CMV", "atmospheric motion vectors", "AMV"], DataProduct, Some("Winds derived from cloud motion")),
    entry("Humidity Profile", &["humidity profiles", "water vapour", "water vapor"], DataProduct, Some("Atmospheric humidity profiles")),
    entry("Temperature Profile", &["temperature profiles"], DataProduct, Some("Atmospheric temperature profiles")),
    entry("Soil Moisture", &[], DataProduct, Some("Surface soil moisture")),
    // Formats and access protocols
    entry("NetCDF", &["netCDF4", "NetCDF-4", "nc files"], Format, Some("Network Common Data Form")),
    entry("HDF5", &["HDF-5", "HDF 5"], Format, Some("Hierarchical Data Format version 5")),
    entry("HDF", &["HDF4", "HDF-EOS"], Format, Some("Hierarchical Data Format")),
    entry("GeoTIFF", &["Geo-TIFF", "TIFF"], Format, Some("Georeferenced TIFF raster")),
    entry("CSV", &[], Format, Some("Comma separated values")),
    entry("KML", &["KMZ"], Format, Some("Keyhole markup language")),
    entry("WMS", &["Web Map Service"], Format, Some("OGC web map service")),
    entry("WCS", &["Web Coverage Service"], Format, Some("OGC web coverage service")),
    // Portal services
    entry("Data Download", &["download data", "data downloads", "data_download"], Other, Some("Bulk and on-demand data download service")),
    entry("Visualization", &["visualisation", "data visualization"], Other, Some("Online product visualization")),
    entry("API Access", &["API", "APIs", "api_access"], Other, Some("Programmatic access to the catalogue")),
    entry("User Registration", &["registration", "sign up", "user_registration"], Other, Some("Account registration for data access")),
    entry("Subsetting", &["spatial subsetting", "subset"], Other, Some("Spatial and temporal subsetting service")),
    entry("Time Series", &["time-series"], Other, Some("Time series extraction service")),
];

/// Words that precede "mission" without naming one
const MISSION_STOPWORDS: &[&str] = &[
    "the", "this", "that", "a", "an", "our", "each", "every", "which", "its", "their", "space", "new",
    "current", "future", "previous", "satellite", "science", "joint",
];

/// An entity mention located in a sentence
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    /// Canonical display name
    pub name: String,
    /// Type bound by the matching entry
    pub entity_type: EntityType,
    /// Byte offset of the mention start in the sentence
    pub start: usize,
    /// Byte offset one past the mention end
    pub end: usize,
    /// Recognition confidence
    pub confidence: f32,
    /// Attributes implied by the vocabulary entry
    pub attributes: BTreeMap<String, String>,
}

impl Mention {
    /// Id this mention merges into
    pub fn entity_id(&self) -> EntityId {
        EntityId::for_entity(&self.name, self.entity_type)
    }

    /// Convert to an extraction candidate carrying `source_ref`
    pub fn to_candidate(&self, source_ref: &SourceRef) -> EntityCandidate {
        EntityCandidate {
            name: self.name.clone(),
            entity_type: self.entity_type,
            attributes: self.attributes.clone(),
            source_ref: source_ref.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledEntry {
    entry: GazetteerEntry,
    regex: Regex,
}

/// Compiled gazetteer
#[derive(Debug, Clone)]
pub struct Gazetteer {
    entries: Vec<CompiledEntry>,
    mission_shape: Regex,
}

impl Gazetteer {
    /// Compile the default domain vocabulary
    pub fn default_domain() -> Result<Self> {
        Self::from_entries(DEFAULT_GAZETTEER)
    }

    /// Compile an arbitrary vocabulary table
    pub fn from_entries(entries: &[GazetteerEntry]) -> Result<Self> {
        let compiled = entries
            .iter()
            .map(|entry| {
                let regex = Regex::new(&entry_pattern(entry))?;
                Ok(CompiledEntry {
                    entry: *entry,
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            entries: compiled,
            mission_shape: Regex::new(r"\b([A-Z][A-Za-z0-9]*(?:-[A-Za-z0-9]+)*)\s+[Mm]ission\b")?,
        })
    }

    /// Number of vocabulary entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the vocabulary has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical entries, for seeding and inspection
    pub fn entries(&self) -> impl Iterator<Item = &GazetteerEntry> {
        self.entries.iter().map(|c| &c.entry)
    }

    /// Find mentions in `sentence`, overlaps resolved leftmost-longest
    pub fn find_mentions(&self, sentence: &str) -> Vec<Mention> {
        // (mention, priority) where a lower priority wins ties on equal spans
        let mut found: Vec<(Mention, usize)> = Vec::new();

        for (priority, compiled) in self.entries.iter().enumerate() {
            for caps in compiled.regex.captures_iter(sentence) {
                let Some(whole) = caps.get(0) else { continue };
                let entry = &compiled.entry;
                let mut attributes = BTreeMap::new();
                if let Some(description) = entry.description {
                    attributes.insert("description".to_string(), description.to_string());
                }
                let name = match caps.get(1) {
                    Some(suffix) if entry.series => {
                        attributes.insert("series".to_string(), entry.canonical.to_string());
                        format!("{}-{}", entry.canonical, suffix.as_str().to_uppercase())
                    },
                    _ => entry.canonical.to_string(),
                };
                found.push((
                    Mention {
                        name,
                        entity_type: entry.entity_type,
                        start: whole.start(),
                        end: whole.end(),
                        confidence: GAZETTEER_CONFIDENCE,
                        attributes,
                    },
                    priority,
                ));
            }
        }

        let shape_priority = self.entries.len();
        for caps in self.mission_shape.captures_iter(sentence) {
            let Some(name) = caps.get(1) else { continue };
            if MISSION_STOPWORDS.contains(&name.as_str().to_lowercase().as_str()) {
                continue;
            }
            found.push((
                Mention {
                    name: name.as_str().to_string(),
                    entity_type: Mission,
                    start: name.start(),
                    end: name.end(),
                    confidence: MISSION_SHAPE_CONFIDENCE,
                    attributes: BTreeMap::new(),
                },
                shape_priority,
            ));
        }

        found.sort_by(|(a, pa), (b, pb)| {
            a.start
                .cmp(&b.start)
                .then((b.end - b.start).cmp(&(a.end - a.start)))
                .then(pa.cmp(pb))
        });

        let mut mentions: Vec<Mention> = Vec::with_capacity(found.len());
        for (mention, _) in found {
            if mentions.last().is_some_and(|last| mention.start < last.end) {
                continue;
            }
            mentions.push(mention);
        }
        mentions
    }
}

fn entry_pattern(entry: &GazetteerEntry) -> String {
    let mut forms: Vec<&str> = std::iter::once(entry.canonical)
        .chain(entry.aliases.iter().copied())
        .collect();
    // Longest first so alternation prefers the fullest form
    forms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    forms.dedup();

    let alternation = forms
        .iter()
        .map(|form| {
            form.split(|c: char| c == ' ' || c == '-' || c == '_')
                .filter(|part| !part.is_empty())
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"[\s_-]?")
        })
        .collect::<Vec<_>>()
        .join("|");

    if entry.series {
        format!(r"(?i)\b(?:{alternation})(?:[\s-]?(\d[a-z0-9]*))?\b")
    } else {
        format!(r"(?i)\b(?:{alternation})\b")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sentence: &str) -> Vec<(String, EntityType)> {
        Gazetteer::default_domain()
            .unwrap()
            .find_mentions(sentence)
            .into_iter()
            .map(|m| (m.name, m.entity_type))
            .collect()
    }

    #[test]
    fn default_table_compiles() {
        let gazetteer = Gazetteer::default_domain().unwrap();
        assert_eq!(gazetteer.len(), DEFAULT_GAZETTEER.len());
    }

    #[test]
    fn series_suffixes_are_canonicalized() {
        assert_eq!(
            names("Oceansat 2 and INSAT-3DR data"),
            vec![
                ("OCEANSAT-2".to_string(), EntityType::Satellite),
                ("INSAT-3DR".to_string(), EntityType::Satellite),
            ]
        );
        assert_eq!(names("The INSAT series"), vec![("INSAT".to_string(), EntityType::Satellite)]);
    }

    #[test]
    fn aliases_resolve_to_canonical_names() {
        assert_eq!(
            names("Sea Surface Temperature in netCDF4"),
            vec![
                ("SST".to_string(), EntityType::DataProduct),
                ("NetCDF".to_string(), EntityType::Format),
            ]
        );
        assert_eq!(names("wind_data"), vec![("Wind Data".to_string(), EntityType::DataProduct)]);
    }

    #[test]
    fn longest_overlapping_mention_wins() {
        // "HDF5" must not also produce "HDF"
        assert_eq!(names("Files in HDF5"), vec![("HDF5".to_string(), EntityType::Format)]);
        assert_eq!(
            names("The Ocean Colour Monitor"),
            vec![("OCM".to_string(), EntityType::Instrument)]
        );
    }

    #[test]
    fn mission_shape_rule_with_stopwords() {
        assert_eq!(
            names("The Venus mission is planned"),
            vec![("Venus".to_string(), EntityType::Mission)]
        );
        assert!(names("The mission is planned").is_empty());
        // Known satellites keep their gazetteer type
        assert_eq!(
            names("SARAL mission"),
            vec![("SARAL".to_string(), EntityType::Satellite)]
        );
    }

    #[test]
    fn mentions_are_word_bounded() {
        assert!(names("insatiable curiosity").is_empty());
        assert!(names("sstables").is_empty());
    }
}
