//! Evidence extraction for harvested pages.
//!
//! Everything here is pure text analysis: candidate names from search
//! titles, healthcare entity recognition, training metrics, per-segment
//! signal and red flag detection, and region classification. No I/O
//! happens in this crate; callers hand in page text and URLs.

pub mod entities;
pub mod metrics;
pub mod names;
pub mod region;
pub mod signals;

pub use entities::{HealthcareEntities, extract_healthcare_entities};
pub use names::{is_article_title, org_name_from_title};
pub use region::classify_region;
pub use signals::{DetectedSignal, clip, detect_red_flags, detect_signals, display_flags};
