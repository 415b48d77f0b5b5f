use std::fmt;

/// Verdict for one URL in check-only mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    /// The URL answered with a status in [200, 400)
    Exists,
    /// The URL failed or answered with any other status
    Not,
}

impl CheckStatus {
    /// Classifies an HTTP status code
    pub fn from_status(status: u16) -> Self {
        if (200..400).contains(&status) {
            Self::Exists
        } else {
            Self::Not
        }
    }

    /// Sentinel stored in the site map for this verdict
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exists => "Exists",
            Self::Not => "Not",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(CheckStatus::from_status(200), CheckStatus::Exists);
        assert_eq!(CheckStatus::from_status(301), CheckStatus::Exists);
        assert_eq!(CheckStatus::from_status(399), CheckStatus::Exists);
        assert_eq!(CheckStatus::from_status(404), CheckStatus::Not);
        assert_eq!(CheckStatus::from_status(500), CheckStatus::Not);
        assert_eq!(CheckStatus::from_status(199), CheckStatus::Not);
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(CheckStatus::Exists.to_string(), "Exists");
        assert_eq!(CheckStatus::Not.to_string(), "Not");
    }
}
