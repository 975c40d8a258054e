use std::time::Duration;

/// Application name
pub const APP_NAME: &str = "Cadenza";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default file name of the persisted settings tree
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Suffix appended to the settings file name for the single backup generation
pub const BACKUP_SUFFIX: &str = ".backup";

/// Default delay between the last write and the durable save
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(5);

// --- Top-level path segments of the settings tree ---

/// Provider instance configs, keyed by instance id
pub const CONF_PROVIDERS: &str = "providers";

/// Player configs, keyed by player id
pub const CONF_PLAYERS: &str = "players";

/// Core module configs, keyed by module domain
pub const CONF_CORE: &str = "core";

/// DSP configs, keyed by player id
pub const CONF_PLAYER_DSP: &str = "player_dsp";

/// Randomly generated server identifier (root of the secret key)
pub const CONF_SERVER_ID: &str = "server_id";

/// Set once the first user-facing provider has been configured
pub const CONF_ONBOARD_DONE: &str = "onboard_done";

// --- Well-known entity keys ---

/// Keys stored on the entity itself instead of inside its `values` map
pub const BASE_KEYS: [&str; 6] = ["enabled", "name", "available", "default_name", "provider", "type"];

pub const CONF_LOG_LEVEL: &str = "log_level";
pub const CONF_OUTPUT_LIMITER: &str = "output_limiter";
pub const CONF_DEPRECATED_EQ_BASS: &str = "eq_bass";
pub const CONF_DEPRECATED_EQ_MID: &str = "eq_mid";
pub const CONF_DEPRECATED_EQ_TREBLE: &str = "eq_treble";

/// Separator used when two values are packed into one multi-value string
pub const MULTI_VALUE_SPLITTER: &str = "$$";

// --- Secrets ---

/// Prefix marking a string value as encrypted at rest
pub const ENCRYPT_MARKER: &str = "_encrypted_";

/// Placeholder handed out instead of a secret's plaintext
pub const SECURE_STRING_SUBSTITUTE: &str = "this_value_is_encrypted";

/// Core modules that expose user configuration
pub const CONFIGURABLE_CORE_MODULES: [&str; 6] =
    ["streams", "webserver", "players", "metadata", "cache", "music"];

/// Length of the random suffix of multi-instance provider ids
pub const INSTANCE_SUFFIX_LEN: usize = 8;
