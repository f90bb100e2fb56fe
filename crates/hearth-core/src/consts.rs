//! Reserved keys and file names.

/// Top-level key of the core section.
pub const CORE_KEY: &str = "core";

/// Key of the packages block inside the core section.
pub const PACKAGES_KEY: &str = "packages";

/// Key naming the platform of a platform entry.
pub const PLATFORM_KEY: &str = "platform";

pub const CUSTOMIZE_KEY: &str = "customize";
pub const CUSTOMIZE_DOMAIN_KEY: &str = "customize_domain";
pub const CUSTOMIZE_GLOB_KEY: &str = "customize_glob";

pub const YAML_CONFIG_FILE: &str = "configuration.yaml";
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Marker holding the version that last wrote the configuration directory.
pub const VERSION_FILE: &str = ".HEARTH_VERSION";

pub const AUTOMATION_CONFIG_PATH: &str = "automations.yaml";
pub const SCRIPT_CONFIG_PATH: &str = "scripts.yaml";
pub const SCENE_CONFIG_PATH: &str = "scenes.yaml";

/// Presence of this file in the configuration directory requests safe mode
/// for the next start.
pub const SAFE_MODE_FILENAME: &str = "safe-mode";

/// Longest rendering of an offending value kept in validation messages.
pub const MAX_VALIDATION_ERROR_ITEM_LENGTH: usize = 500;

/// Currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Withdrawn ISO 4217 codes. Still accepted, but raise a repair issue.
pub const HISTORIC_CURRENCIES: &[&str] = &[
    "ADP", "AFA", "ATS", "AZM", "BEF", "BGL", "CSD", "CYP", "DEM", "EEK", "ESP", "FIM", "FRF",
    "GRD", "HRK", "IEP", "ITL", "LTL", "LUF", "LVL", "MTL", "NLG", "PTE", "ROL", "SIT", "SKK",
    "TRL", "VEB", "VEF", "ZWD",
];

/// Nesting limit for `!include`.
pub const MAX_INCLUDE_DEPTH: usize = 16;
