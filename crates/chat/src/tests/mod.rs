//! Unit-Tests fuer das Chat-Crate
