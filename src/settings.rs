//! Conversion settings.
//!
//! Deployment-wide knobs carried as an explicit value: the set of
//! accepted CASToR versions, the byte order to substitute for a `system`
//! payload declaration, and the UID root used when minting identifiers.
//! Construction sites inject it; nothing reads a global.
use byteordered::Endianness;

/// UID root for generated identifiers, from the publicly registered
/// `pydicom` namespace used by the reconstruction pipeline.
pub const UID_ROOT: &str = "1.2.826.0.1.3680043.8.498.";

/// Explicit configuration for a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// CASToR versions this converter accepts.
    pub castor_versions: Vec<String>,
    /// Byte order substituted when the header declares `system`.
    pub native_order: Endianness,
    /// Root prefix for generated UIDs.
    pub uid_root: String,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            castor_versions: vec!["3.1".to_owned()],
            native_order: Endianness::native(),
            uid_root: UID_ROOT.to_owned(),
        }
    }
}

impl Settings {
    /// Whether the given CASToR version is accepted.
    pub fn supports_castor(&self, version: &str) -> bool {
        self.castor_versions.iter().any(|v| v == version)
    }
}
