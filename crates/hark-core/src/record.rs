use crate::error::RecordError;

/// Well-known property names shared across the dump format, the XML
/// documents, and the cache algorithms.
pub mod props {
    /// Actual recognized text of an utterance; the dedup key.
    pub const WORDS_ACTUAL: &str = "wordsActual";
    /// Word-level edit distance between expected and actual text.
    pub const WORD_DIST: &str = "wordDist";
    /// Identity marker in dump lines and the XML identity attribute.
    pub const REL_WAV_PATH: &str = "RelWavPath";
}

/// One decoder evaluation instance for one audio segment.
///
/// `attributes` and `sub_elements` are order-preserving association lists,
/// not maps: write-back must reproduce attribute and element order exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtterResult {
    /// Relative path of the source audio segment; the identity key.
    /// Empty until parse assigns it, non-empty in any fully parsed record.
    pub rel_wav_path: String,
    /// XML element attributes, insertion order preserved.
    pub attributes: Vec<(String, String)>,
    /// Body fields: XML child elements or dump key=value lines.
    pub sub_elements: Vec<(String, String)>,
}

impl UtterResult {
    pub fn new(rel_wav_path: impl Into<String>) -> Self {
        Self {
            rel_wav_path: rel_wav_path.into(),
            attributes: Vec::new(),
            sub_elements: Vec::new(),
        }
    }

    /// Look up a named property: `sub_elements` first (first match wins),
    /// then `attributes`. Missing in both is an error, since the cache's
    /// correctness depends on identity and distance fields being present.
    pub fn prop_value(&self, name: &str) -> Result<&str, RecordError> {
        let found = self
            .sub_elements
            .iter()
            .chain(self.attributes.iter())
            .find(|(k, _)| k == name);
        match found {
            Some((_, v)) => Ok(v),
            None => Err(RecordError::MissingProperty {
                rel_wav_path: self.rel_wav_path.clone(),
                name: name.to_string(),
            }),
        }
    }

    /// The actual recognized text, used to distinguish "same mismatch,
    /// same output" from "same segment, different decoder output".
    pub fn words_actual(&self) -> Result<&str, RecordError> {
        self.prop_value(props::WORDS_ACTUAL)
    }

    /// Word-level edit distance; zero means a perfect recognition.
    pub fn word_dist(&self) -> Result<i64, RecordError> {
        let raw = self.prop_value(props::WORD_DIST)?;
        raw.trim()
            .parse()
            .map_err(|_| RecordError::BadWordDist {
                rel_wav_path: self.rel_wav_path.clone(),
                value: raw.to_string(),
            })
    }
}

/// All known result instances for one audio segment, across decoder runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtterResultGroup {
    pub rel_wav_path: String,
    /// Append-only; no two instances share the same recognized text.
    pub instances: Vec<UtterResult>,
}

impl UtterResultGroup {
    pub fn new(rel_wav_path: impl Into<String>) -> Self {
        Self {
            rel_wav_path: rel_wav_path.into(),
            instances: Vec::new(),
        }
    }

    /// True if some instance already carries the same recognized text as
    /// `new_item`. Short-circuits on the first match.
    pub fn has_instance_with_same_output(
        &self,
        new_item: &UtterResult,
    ) -> Result<bool, RecordError> {
        let text_new = new_item.words_actual()?;
        for instance in &self.instances {
            if instance.words_actual()? == text_new {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
