//! Evidence collected for one candidate organization.

use std::collections::BTreeMap;

use orgscout_shared::{OrgScoutError, Result, Segment};
use serde::{Deserialize, Serialize};

use crate::tables;

/// One piece of evidence for a signal: the phrase or derived fact that
/// fired and the page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub snippet: String,
    pub source_url: String,
}

/// All evidence gathered for a candidate in one segment. Signal names are
/// validated against the segment's scoring table on insert, so a typo in
/// a detector surfaces as an error instead of silently scoring zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    segment: Segment,
    detections: BTreeMap<String, Detection>,
    red_flags: Vec<String>,
}

impl Evidence {
    pub fn new(segment: Segment) -> Self {
        Self {
            segment,
            detections: BTreeMap::new(),
            red_flags: Vec::new(),
        }
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    /// Record a detected signal. Later detections of the same signal keep
    /// the first snippet; the earliest evidence wins.
    pub fn record(&mut self, name: &str, detection: Detection) -> Result<()> {
        if !tables::is_known_signal(self.segment, name) {
            return Err(OrgScoutError::validation(format!(
                "unknown signal {name:?} for segment {}",
                self.segment.as_str()
            )));
        }
        self.detections.entry(name.to_string()).or_insert(detection);
        Ok(())
    }

    pub fn add_red_flag(&mut self, flag: impl Into<String>) {
        self.red_flags.push(flag.into());
    }

    pub fn present(&self, name: &str) -> bool {
        self.detections.contains_key(name)
    }

    pub fn detection(&self, name: &str) -> Option<&Detection> {
        self.detections.get(name)
    }

    pub fn red_flags(&self) -> &[String] {
        &self.red_flags
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty() && self.red_flags.is_empty()
    }

    /// Distinct source URLs across all detections, ordered by signal name
    /// so the same evidence always serializes the same way.
    pub fn source_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for detection in self.detections.values() {
            if !detection.source_url.is_empty() && !urls.contains(&detection.source_url.as_str()) {
                urls.push(&detection.source_url);
            }
        }
        urls
    }
}
