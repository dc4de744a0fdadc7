use std::{fmt, str::FromStr};

use common::error::AppError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A gated capability with a monthly quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    ResumeCreation,
    ResumeDownloads,
    CoverLetters,
    AtsOptimizations,
    InterviewQuestions,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 5] = [
        FeatureKey::ResumeCreation,
        FeatureKey::ResumeDownloads,
        FeatureKey::CoverLetters,
        FeatureKey::AtsOptimizations,
        FeatureKey::InterviewQuestions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::ResumeCreation => "resume_creation",
            FeatureKey::ResumeDownloads => "resume_downloads",
            FeatureKey::CoverLetters => "cover_letters",
            FeatureKey::AtsOptimizations => "ats_optimizations",
            FeatureKey::InterviewQuestions => "interview_questions",
        }
    }

    /// Features a free user can unlock per use with a one-off payment
    /// instead of a quota.
    pub fn sells_one_off(&self) -> bool {
        matches!(self, FeatureKey::ResumeDownloads)
    }

    /// Whether the feature produces text through the generation service.
    pub fn is_generated(&self) -> bool {
        matches!(
            self,
            FeatureKey::CoverLetters | FeatureKey::AtsOptimizations | FeatureKey::InterviewQuestions
        )
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKey::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| AppError::NotFound(format!("Unknown feature: {}", s)))
    }
}

/// Monthly allowance for a feature. Serialized as a number, `-1` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    pub fn allows(&self, current: i64) -> bool {
        match self {
            Quota::Limited(max) => current < i64::from(*max),
            Quota::Unlimited => true,
        }
    }

    /// Store-level bound for the conditional increment.
    pub fn as_limit(&self) -> Option<i64> {
        match self {
            Quota::Limited(max) => Some(i64::from(*max)),
            Quota::Unlimited => None,
        }
    }

    pub fn display_value(&self) -> i64 {
        self.as_limit().unwrap_or(-1)
    }
}

impl Serialize for Quota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.display_value())
    }
}

impl<'de> Deserialize<'de> for Quota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        if value < 0 {
            Ok(Quota::Unlimited)
        } else {
            u32::try_from(value)
                .map(Quota::Limited)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_keys_round_trip_through_their_names() {
        for feature in FeatureKey::ALL {
            assert_eq!(feature.as_str().parse::<FeatureKey>().unwrap(), feature);
        }
        assert!("job_alerts".parse::<FeatureKey>().is_err());
    }

    #[test]
    fn limited_quota_allows_strictly_below_cap() {
        assert!(Quota::Limited(5).allows(0));
        assert!(Quota::Limited(5).allows(4));
        assert!(!Quota::Limited(5).allows(5));
        assert!(!Quota::Limited(0).allows(0));
    }

    #[test]
    fn unlimited_quota_serializes_as_minus_one() {
        assert!(Quota::Unlimited.allows(i64::MAX));
        assert_eq!(serde_json::to_string(&Quota::Unlimited).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Quota::Limited(10)).unwrap(), "10");
        assert_eq!(serde_json::from_str::<Quota>("-1").unwrap(), Quota::Unlimited);
    }
}
