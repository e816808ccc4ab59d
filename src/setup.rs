//! Parsing of the `k8s_event` Corefile stanza
//!
//! ```text
//! k8s_event {
//!     level <severity>...
//!     rate <qps> [<burst> [<cache size>]]
//! }
//! ```

use std::fmt::Display;
use std::str::FromStr;

use k8s_event_types::{
    LevelMask, MAX_RATE_BURST, MAX_RATE_CACHE_SIZE, MAX_RATE_QPS, MIN_RATE_BURST,
    MIN_RATE_CACHE_SIZE, MIN_RATE_QPS, PLUGIN_NAME, RateSettings, Settings, Severity,
};

use crate::config::{Dispenser, extract};
use crate::error::{ConfigError, PluginError};

/// Read the plugin's settings from a whole Corefile
///
/// Returns `None` when the Corefile has no `k8s_event` directive.
pub fn setup(corefile: &str) -> Result<Option<Settings>, PluginError> {
    let mut dispenser = extract(corefile, PLUGIN_NAME).map_err(plugin_error)?;
    parse(&mut dispenser).map_err(plugin_error)
}

fn plugin_error(source: ConfigError) -> PluginError {
    PluginError {
        plugin: PLUGIN_NAME,
        source,
    }
}

/// Parse the directives in `d`; the plugin may appear at most once
pub fn parse(d: &mut Dispenser) -> Result<Option<Settings>, ConfigError> {
    let mut settings = None;
    while d.next() {
        if settings.is_some() {
            return Err(ConfigError::DuplicateStanza);
        }
        settings = Some(parse_stanza(d)?);
    }
    Ok(settings)
}

/// Parse one stanza, with the cursor on the directive name
fn parse_stanza(d: &mut Dispenser) -> Result<Settings, ConfigError> {
    if !d.remaining_args().is_empty() {
        return Err(d.arg_err());
    }

    let mut settings = Settings::default();
    while d.next_block() {
        match d.val() {
            "level" => {
                let args = d.remaining_args();
                if args.is_empty() {
                    return Err(d.arg_err());
                }
                // Replaces the default rather than adding to it
                settings.levels = args
                    .iter()
                    .map(|arg| arg.parse::<Severity>())
                    .collect::<Result<LevelMask, _>>()?;
            }
            "rate" => {
                parse_rate(d, &mut settings.rate)?;
                settings.rate_configured = true;
            }
            name => {
                return Err(ConfigError::UnknownDirective {
                    line: d.line(),
                    name: name.to_string(),
                });
            }
        }
    }
    Ok(settings)
}

fn parse_rate(d: &mut Dispenser, rate: &mut RateSettings) -> Result<(), ConfigError> {
    let line = d.line();
    let args = d.remaining_args();
    if args.is_empty() || args.len() > 3 {
        return Err(d.arg_err());
    }

    let qps: f64 = parse_in_range(line, "qps", &args[0], MIN_RATE_QPS, MAX_RATE_QPS)?;
    rate.qps = qps as f32;

    if let Some(burst) = args.get(1) {
        rate.burst = parse_in_range(line, "burst", burst, MIN_RATE_BURST, MAX_RATE_BURST)?;
    }

    if let Some(cache_size) = args.get(2) {
        rate.cache_size = parse_in_range(
            line,
            "cacheSize",
            cache_size,
            MIN_RATE_CACHE_SIZE,
            MAX_RATE_CACHE_SIZE,
        )?;
    }

    Ok(())
}

/// Parse `value` and check it lies in `[min, max]`
///
/// Values that do not parse are reported the same way as values outside the
/// range.
fn parse_in_range<T>(
    line: usize,
    field: &'static str,
    value: &str,
    min: T,
    max: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Display,
{
    match value.parse::<T>() {
        Ok(v) if v >= min && v <= max => Ok(v),
        _ => Err(ConfigError::OutOfRange {
            line,
            field,
            min: min.to_string(),
            max: max.to_string(),
            value: value.to_string(),
        }),
    }
}
