use serde::Deserialize;

use crate::config::ConfigError;
use crate::sizer::label::SizeLabel;

/// Size thresholds as written in the configuration file.
///
/// Values are signed so that non-positive thresholds surface as a validation error instead of a
/// parse error.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SizeThresholds {
    pub s: i64,
    pub m: i64,
    pub l: i64,
    pub xl: i64,
    pub xxl: i64,
}

impl SizeThresholds {
    fn as_array(&self) -> [i64; 5] {
        [self.s, self.m, self.l, self.xl, self.xxl]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = self.as_array();
        if values.iter().any(|&value| value <= 0) {
            return Err(ConfigError::InvalidConfig(format!(
                "size thresholds must be positive, got {self}"
            )));
        }
        if values.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(ConfigError::InvalidConfig(format!(
                "size thresholds must satisfy s <= m <= l <= xl <= xxl, got {self}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for SizeThresholds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "s={}, m={}, l={}, xl={}, xxl={}",
            self.s, self.m, self.l, self.xl, self.xxl
        )
    }
}

/// Validated thresholds used to classify pull requests.
///
/// A bucket's threshold is the smallest change count that belongs to it, e.g. a PR with exactly
/// `s` changed lines is `size/S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdPolicy {
    s: u64,
    m: u64,
    l: u64,
    xl: u64,
    xxl: u64,
}

impl ThresholdPolicy {
    pub fn classify(&self, count: u64) -> SizeLabel {
        if count < self.s {
            SizeLabel::XS
        } else if count < self.m {
            SizeLabel::S
        } else if count < self.l {
            SizeLabel::M
        } else if count < self.xl {
            SizeLabel::L
        } else if count < self.xxl {
            SizeLabel::XL
        } else {
            SizeLabel::XXL
        }
    }
}

impl TryFrom<SizeThresholds> for ThresholdPolicy {
    type Error = ConfigError;

    fn try_from(thresholds: SizeThresholds) -> Result<Self, Self::Error> {
        thresholds.validate()?;
        // Positivity was checked above, so the casts are lossless.
        Ok(Self {
            s: thresholds.s as u64,
            m: thresholds.m as u64,
            l: thresholds.l as u64,
            xl: thresholds.xl as u64,
            xxl: thresholds.xxl as u64,
        })
    }
}
