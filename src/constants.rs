/// Path separator of settings paths.
pub const SEPARATOR: char = '/';

/// Topic segment under a device prefix carrying settings requests.
pub const SETTINGS_SUFFIX: &str = "/settings";

/// Default topic segment for responses addressed to this client.
pub const RESPONSE_SUFFIX: &str = "/response";

/// Topic segment on which devices announce their liveness.
pub const ALIVE_SUFFIX: &str = "/alive";

/// User property carrying the response status.
pub const CODE_PROPERTY: &str = "code";

pub const CODE_CONTINUE: &str = "Continue";
pub const CODE_OK: &str = "Ok";

/// Error status used by devices (any value other than `Continue`/`Ok` is an error).
pub const CODE_ERROR: &str = "Error";

//-----------------------------------------------------------
// Discovery defaults

/// Listen window in units of the subscribe round-trip.
pub const DEFAULT_DISCOVERY_REL_TIMEOUT: f64 = 3.0;

/// Minimum listen window in milliseconds.
pub const DEFAULT_DISCOVERY_ABS_TIMEOUT_MS: u64 = 100;
