use std::str::FromStr;

/// Banding used when Config has no usable `quiz_performance_thresholds`.
pub const DEFAULT_THRESHOLDS: &str = "excellent>=0.85|good>=0.70";
pub const NEEDS_IMPROVEMENT: &str = "needs_improvement";

#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub cutoff: f64,
}

/// Ordered performance bands, highest cutoff first.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    bands: Vec<Band>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdParseError {
    #[error("threshold list is empty")]
    Empty,
    #[error("segment '{0}' is not of the form name>=value")]
    Segment(String),
    #[error("cutoff in segment '{0}' is not a finite number")]
    Cutoff(String),
}

/// Where the thresholds used for a classification came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdSource {
    Configured,
    Default,
    Fallback(ThresholdParseError),
}

impl Thresholds {
    pub fn defaults() -> Self {
        Self {
            bands: vec![
                Band {
                    name: "excellent".to_string(),
                    cutoff: 0.85,
                },
                Band {
                    name: "good".to_string(),
                    cutoff: 0.70,
                },
            ],
        }
    }

    /// `name>=value|name>=value`. One bad segment rejects the whole list.
    pub fn parse(raw: &str) -> Result<Self, ThresholdParseError> {
        if raw.trim().is_empty() {
            return Err(ThresholdParseError::Empty);
        }
        let mut bands = Vec::new();
        for segment in raw.split('|') {
            let (name, value) = segment
                .split_once(">=")
                .ok_or_else(|| ThresholdParseError::Segment(segment.to_string()))?;
            let name = name.trim();
            if name.is_empty() || value.contains(">=") {
                return Err(ThresholdParseError::Segment(segment.to_string()));
            }
            let cutoff = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|cutoff| cutoff.is_finite())
                .ok_or_else(|| ThresholdParseError::Cutoff(segment.to_string()))?;
            bands.push(Band {
                name: name.to_string(),
                cutoff,
            });
        }
        bands.sort_by(|left, right| right.cutoff.total_cmp(&left.cutoff));
        Ok(Self { bands })
    }

    /// Thresholds from an optional Config value, never failing.
    pub fn resolve(configured: Option<&str>) -> (Self, ThresholdSource) {
        match configured {
            None => (Self::defaults(), ThresholdSource::Default),
            Some(raw) => match Self::parse(raw) {
                Ok(parsed) => (parsed, ThresholdSource::Configured),
                Err(err) => (Self::defaults(), ThresholdSource::Fallback(err)),
            },
        }
    }

    #[cfg(test)]
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn classify(&self, ratio: f64) -> &str {
        self.bands
            .iter()
            .find(|band| ratio >= band.cutoff)
            .map(|band| band.name.as_str())
            .unwrap_or(NEEDS_IMPROVEMENT)
    }
}

impl FromStr for Thresholds {
    type Err = ThresholdParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

/// `score / total`, or 0.0 when the total is not positive.
pub fn score_ratio(score: f64, total: f64) -> f64 {
    if total > 0.0 && score.is_finite() && total.is_finite() {
        score / total
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{score_ratio, ThresholdParseError, ThresholdSource, Thresholds, DEFAULT_THRESHOLDS};

    #[test]
    fn default_string_matches_default_bands() {
        assert_eq!(
            Thresholds::parse(DEFAULT_THRESHOLDS).expect("defaults parse"),
            Thresholds::defaults()
        );
    }

    #[test]
    fn classifies_at_band_edges() {
        let thresholds = Thresholds::defaults();
        assert_eq!(thresholds.classify(score_ratio(85.0, 100.0)), "excellent");
        assert_eq!(thresholds.classify(score_ratio(70.0, 100.0)), "good");
        assert_eq!(thresholds.classify(score_ratio(69.0, 100.0)), "needs_improvement");
        assert_eq!(thresholds.classify(score_ratio(5.0, 0.0)), "needs_improvement");
    }

    #[test]
    fn zero_or_negative_totals_yield_zero_ratio() {
        assert_eq!(score_ratio(10.0, 0.0), 0.0);
        assert_eq!(score_ratio(10.0, -5.0), 0.0);
        assert_eq!(score_ratio(f64::NAN, 10.0), 0.0);
    }

    #[test]
    fn configured_bands_are_data() {
        let thresholds: Thresholds = "pass>=0.5 | distinction >= 0.9".parse().expect("parse");
        assert_eq!(thresholds.bands()[0].name, "distinction");
        assert_eq!(thresholds.classify(0.95), "distinction");
        assert_eq!(thresholds.classify(0.6), "pass");
        assert_eq!(thresholds.classify(0.2), "needs_improvement");
    }

    #[test]
    fn malformed_strings_are_rejected_whole() {
        assert_eq!(Thresholds::parse(""), Err(ThresholdParseError::Empty));
        assert!(matches!(
            Thresholds::parse("excellent>=0.85|good"),
            Err(ThresholdParseError::Segment(_))
        ));
        assert!(matches!(
            Thresholds::parse("excellent>=high"),
            Err(ThresholdParseError::Cutoff(_))
        ));
        assert!(matches!(
            Thresholds::parse("excellent>=0.85|"),
            Err(ThresholdParseError::Segment(_))
        ));
    }

    #[test]
    fn resolve_reports_its_source() {
        let (_, source) = Thresholds::resolve(None);
        assert_eq!(source, ThresholdSource::Default);

        let (thresholds, source) = Thresholds::resolve(Some("top>=0.99"));
        assert_eq!(source, ThresholdSource::Configured);
        assert_eq!(thresholds.classify(0.9), "needs_improvement");

        let (thresholds, source) = Thresholds::resolve(Some("garbage"));
        assert!(matches!(source, ThresholdSource::Fallback(_)));
        assert_eq!(thresholds, Thresholds::defaults());
    }
}
