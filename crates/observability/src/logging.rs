//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (ueberschreibt die Config-Datei):
//! - `PD_LOG_LEVEL`: Filter-Ausdruck (z.B. `info` oder `peerdial_signaling=debug`)
//! - `PD_LOG_FORMAT`: Format (text/json)

use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LOG_LEVEL: &str = "PD_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "PD_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anderes => Err(format!("Unbekanntes Log-Format: {anderes}")),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `level` und `format` stammen aus der Konfiguration; `PD_LOG_LEVEL` und
/// `PD_LOG_FORMAT` haben Vorrang. Ungueltige Werte fallen auf `info` / `text`
/// zurueck. Ein zweiter Aufruf ist wirkungslos.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = log_format_waehlen(std::env::var(ENV_LOG_FORMAT).ok().as_deref(), format);

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if ergebnis.is_err() {
        tracing::debug!("Logging war bereits initialisiert");
    }
}

/// Waehlt das Format: Umgebung vor Konfiguration, sonst Text
pub fn log_format_waehlen(aus_env: Option<&str>, aus_config: &str) -> LogFormat {
    aus_env
        .and_then(|f| f.parse().ok())
        .or_else(|| aus_config.parse().ok())
        .unwrap_or_default()
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsen() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("JSON".parse::<LogFormat>().is_err()); // Gross-/Kleinschreibung
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn umgebung_hat_vorrang() {
        assert_eq!(log_format_waehlen(Some("json"), "text"), LogFormat::Json);
        assert_eq!(log_format_waehlen(None, "json"), LogFormat::Json);
    }

    #[test]
    fn ungueltige_werte_fallen_zurueck() {
        assert_eq!(log_format_waehlen(Some("xml"), "json"), LogFormat::Json);
        assert_eq!(log_format_waehlen(Some("xml"), "yaml"), LogFormat::Text);
    }

    #[test]
    fn log_level_werte() {
        assert!(log_level_gueltig("debug"));
        assert!(log_level_gueltig("warn"));
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO"));
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn doppelte_initialisierung_ist_harmlos() {
        logging_initialisieren("info", "text");
        logging_initialisieren("debug", "json");
    }
}
