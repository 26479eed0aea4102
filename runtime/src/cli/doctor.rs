//! Environment readiness check.

use crate::cli::output::{self, Styled};
use crate::config::Settings;
use crate::renderer::chromium::find_chromium;
use crate::store::ObservationStore;
use anyhow::{bail, Result};
use serde::Serialize;

/// One readiness probe.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

/// Probe the browser, the database and the catalog.
pub fn checks(settings: &Settings) -> Vec<Check> {
    let mut out = Vec::new();

    let chromium = settings
        .chromium_path
        .clone()
        .filter(|p| p.exists())
        .or_else(find_chromium);
    out.push(match chromium {
        Some(path) => Check {
            name: "chromium",
            ok: true,
            detail: path.display().to_string(),
        },
        None => Check {
            name: "chromium",
            ok: false,
            detail: "not found; install Chrome or set PRICEWATCH_CHROMIUM_PATH".to_string(),
        },
    });

    out.push(match ObservationStore::open(&settings.db_path) {
        Ok(store) => {
            let detail = match store.latest_prices() {
                Ok(latest) => format!(
                    "{} ({} products priced)",
                    settings.db_path.display(),
                    latest.len()
                ),
                Err(e) => format!("{}: {e}", settings.db_path.display()),
            };
            Check {
                name: "database",
                ok: true,
                detail,
            }
        }
        Err(e) => Check {
            name: "database",
            ok: false,
            detail: format!("{}: {e}", settings.db_path.display()),
        },
    });

    out.push(match settings.load_catalog() {
        Ok(catalog) => Check {
            name: "catalog",
            ok: true,
            detail: format!("{} products", catalog.len()),
        },
        Err(e) => Check {
            name: "catalog",
            ok: false,
            detail: e.to_string(),
        },
    });

    out
}

/// `pricewatch doctor`.
pub fn run(settings: &Settings) -> Result<()> {
    let results = checks(settings);
    let ready = results.iter().all(|c| c.ok);

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "checks": results,
            "ready": ready,
        }));
    } else if !output::is_quiet() {
        let s = Styled::new();
        println!("  {}", s.bold("Pricewatch Doctor"));
        println!();
        println!("  OS:   {}", std::env::consts::OS);
        println!("  Arch: {}", std::env::consts::ARCH);
        println!();
        for c in &results {
            let sym = if c.ok { s.ok_sym() } else { s.err_sym() };
            println!("  {sym} {:<9} {}", c.name, c.detail);
        }
        println!();
        println!("  Status: {}", if ready { "READY" } else { "NOT READY" });
    }

    if !ready {
        bail!("environment is not ready");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks_report_database_and_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::from_env();
        settings.db_path = dir.path().join("nested/prices.db");
        settings.catalog_path = Some(dir.path().join("missing.json"));

        let results = checks(&settings);
        let by_name = |n: &str| results.iter().find(|c| c.name == n).unwrap();
        assert!(by_name("database").ok);
        assert!(!by_name("catalog").ok);
    }
}
