//! Codec configuration

/// Options controlling how entities are encoded and decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Emit indented JSON
    ///
    /// Default: false
    pub pretty: bool,

    /// Decode matrices without free variables to [`crate::Matrix::Numeric`]
    ///
    /// When false, a matrix whose envelope holds any expression string stays
    /// symbolic even if the expressions are closed.
    ///
    /// Default: true
    pub collapse_numeric: bool,

    /// Reject circuit envelopes written by a newer format version
    ///
    /// Default: true
    pub check_version: bool,

    /// Maximum nesting depth of sub-circuits accepted on decode
    ///
    /// Default: 32
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            collapse_numeric: true,
            check_version: true,
            max_depth: 32,
        }
    }
}

impl CodecConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for human inspection: indented output
    pub fn readable() -> Self {
        Self {
            pretty: true,
            ..Default::default()
        }
    }

    /// Configuration that accepts circuit envelopes from any format version
    pub fn lenient() -> Self {
        Self {
            check_version: false,
            ..Default::default()
        }
    }

    /// Enable or disable indented output
    pub fn with_pretty(mut self, enabled: bool) -> Self {
        self.pretty = enabled;
        self
    }

    /// Enable or disable collapsing closed symbolic matrices
    pub fn with_collapse_numeric(mut self, enabled: bool) -> Self {
        self.collapse_numeric = enabled;
        self
    }

    /// Enable or disable the format version check
    pub fn with_version_check(mut self, enabled: bool) -> Self {
        self.check_version = enabled;
        self
    }

    /// Set the maximum sub-circuit nesting depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("max_depth must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CodecConfig::default();
        assert!(!config.pretty);
        assert!(config.collapse_numeric);
        assert!(config.check_version);
        assert_eq!(config.max_depth, 32);
    }

    #[test]
    fn test_presets() {
        assert!(CodecConfig::readable().pretty);
        assert!(!CodecConfig::lenient().check_version);
    }

    #[test]
    fn test_builder_pattern() {
        let config = CodecConfig::new()
            .with_pretty(true)
            .with_collapse_numeric(false)
            .with_max_depth(4);
        assert!(config.pretty);
        assert!(!config.collapse_numeric);
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn test_validate() {
        assert!(CodecConfig::default().validate().is_ok());
        assert!(CodecConfig::new().with_max_depth(0).validate().is_err());
    }
}
