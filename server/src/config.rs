//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use peerdial_core::{PeerdialError, Result};
use peerdial_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

/// Umgebungsvariable die den HTTP-Port ueberschreibt
pub const ENV_PORT: &str = "PORT";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Signaling-Einstellungen
    pub signaling: SignalingEinstellungen,
    /// Ausgelieferte Web-Oberflaeche
    pub ui: UiEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Peerdial Server".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP und WebSocket
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket
    pub port: u16,
    /// Pfad des WebSocket-Endpunkts
    pub ws_pfad: String,
    /// Erlaubte CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 3000,
            ws_pfad: "/ws".into(),
            cors_origins: vec![],
        }
    }
}

/// Signaling-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Kapazitaet der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Signale des Anrufers puffern bis angenommen wird
    pub signale_puffern: bool,
    /// Obergrenze gepufferter Signale pro Call
    pub max_gepufferte_signale: usize,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        Self {
            send_queue_groesse: 64,
            signale_puffern: false,
            max_gepufferte_signale: 32,
        }
    }
}

/// Web-Oberflaeche
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiEinstellungen {
    /// Verzeichnis mit der gebauten UI (leer = keine statischen Dateien)
    pub verzeichnis: Option<String>,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level bzw. Filter-Ausdruck
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    /// Die Umgebungsvariable `PORT` ueberschreibt `netzwerk.port`.
    pub fn laden(pfad: &str) -> Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| PeerdialError::konfiguration(format!("'{pfad}': {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                tracing::error!(pfad = pfad, fehler = %e, "Konfigurationsdatei nicht lesbar");
                return Err(PeerdialError::Io(e));
            }
        };

        config.port_ueberschreiben(std::env::var(ENV_PORT).ok().as_deref())?;
        Ok(config)
    }

    /// Parst eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Setzt den Port aus einem Umgebungswert (leer/None = unveraendert)
    pub fn port_ueberschreiben(&mut self, wert: Option<&str>) -> Result<()> {
        let Some(wert) = wert.map(str::trim).filter(|w| !w.is_empty()) else {
            return Ok(());
        };
        self.netzwerk.port = wert
            .parse()
            .map_err(|_| PeerdialError::konfiguration(format!("Ungueltiger Port in {ENV_PORT}: {wert}")))?;
        Ok(())
    }

    /// Gibt die Bind-Adresse fuer HTTP und WebSocket zurueck
    pub fn http_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }

    /// Leitet die Konfiguration des Signaling-Kerns ab
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            send_queue_groesse: self.signaling.send_queue_groesse,
            signale_puffern: self.signaling.signale_puffern,
            max_gepufferte_signale: self.signaling.max_gepufferte_signale,
        }
    }
}
