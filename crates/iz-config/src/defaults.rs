//! Built-in fallbacks applied when no flag, environment variable or file value exists.

use crate::validate::{ColorMode, OutputFormat};

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default renderer.
pub const DEFAULT_OUTPUT_FORMAT: OutputFormat = OutputFormat::Table;
/// Debug logging is off unless requested.
pub const DEFAULT_VERBOSE: bool = false;
/// Default colour policy.
pub const DEFAULT_COLOR: ColorMode = ColorMode::Auto;
