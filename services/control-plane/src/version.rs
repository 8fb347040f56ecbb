//! Kubelet version parsing and the minimum-version constraint.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Oldest kubelet new workers may run.
pub const MIN_KUBELET_VERSION: KubeletVersion = KubeletVersion {
    major: 1,
    minor: 8,
    patch: 0,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("failed to parse kubelet version '{0}'")]
    Invalid(String),

    #[error("pre-release kubelet version '{0}' is not allowed")]
    PreRelease(String),

    #[error("kubelet version {version} does not fit constraint. Allowed >= {minimum}")]
    BelowMinimum {
        version: KubeletVersion,
        minimum: KubeletVersion,
    },
}

/// `MAJOR.MINOR.PATCH` kubelet version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KubeletVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl fmt::Display for KubeletVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for KubeletVersion {
    type Err = VersionError;

    /// Accepts `1.12`, `1.12.3` and `v1.12.3`; build metadata (`+...`) is
    /// ignored. Missing minor or patch components default to zero.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::Invalid(raw.to_string());

        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = trimmed.split('+').next().unwrap_or_default();
        if core.contains('-') {
            return Err(VersionError::PreRelease(raw.to_string()));
        }

        let mut parts = core.split('.');
        let mut next = |required: bool| -> Result<u64, VersionError> {
            match parts.next() {
                Some(part) if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) => {
                    part.parse().map_err(|_| invalid())
                }
                None if !required => Ok(0),
                _ => Err(invalid()),
            }
        };

        let version = Self {
            major: next(true)?,
            minor: next(false)?,
            patch: next(false)?,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

/// Parse `raw` and enforce [`MIN_KUBELET_VERSION`].
pub fn check_kubelet_version(raw: &str) -> Result<KubeletVersion, VersionError> {
    let version: KubeletVersion = raw.parse()?;
    if version < MIN_KUBELET_VERSION {
        return Err(VersionError::BelowMinimum {
            version,
            minimum: MIN_KUBELET_VERSION,
        });
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1.12.3", "1.12.3")]
    #[case("v1.9.0", "1.9.0")]
    #[case("1.10", "1.10.0")]
    #[case(" 1.8.1+build.7 ", "1.8.1")]
    fn test_accepted_versions_are_normalised(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(check_kubelet_version(raw).unwrap().to_string(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("latest")]
    #[case("1.x")]
    #[case("1.2.3.4")]
    #[case("1..2")]
    fn test_garbage_is_invalid(#[case] raw: &str) {
        assert_eq!(
            check_kubelet_version(raw),
            Err(VersionError::Invalid(raw.to_string()))
        );
    }

    #[test]
    fn test_old_versions_fail_constraint() {
        let err = check_kubelet_version("1.7.9").unwrap_err();
        assert_eq!(
            err.to_string(),
            "kubelet version 1.7.9 does not fit constraint. Allowed >= 1.8.0"
        );
        assert!(check_kubelet_version("1.8").is_ok());
    }

    #[test]
    fn test_pre_releases_are_rejected() {
        assert!(matches!(
            check_kubelet_version("1.13.0-beta.1"),
            Err(VersionError::PreRelease(_))
        ));
    }
}
