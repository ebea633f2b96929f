//! Global subscriber installation.

use std::error::Error;
use vasari_core::{LogFormat, init_telemetry};

// Binaries propagate setup failures with `?` into `Box<dyn Error>`.
fn install(format: LogFormat) -> Result<(), Box<dyn Error>> {
    init_telemetry(format, "info")?;
    Ok(())
}

#[test]
fn second_install_is_rejected() {
    assert!(install(LogFormat::Json).is_ok());
    assert!(install(LogFormat::Pretty).is_err());
}

#[test]
fn log_format_parses_from_flag_values() {
    assert_eq!("json".parse::<LogFormat>().ok(), Some(LogFormat::Json));
    assert_eq!(LogFormat::Pretty.to_string(), "pretty");
}
