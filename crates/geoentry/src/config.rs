//! Flag-aware configuration on top of `geoentry-config`.
//!
//! Core never sees these types -- it receives a pre-built `DashboardConfig`.

use std::time::Duration;

use geoentry_config::{Config, Profile};
use geoentry_core::{DashboardConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The profile selected for this invocation and the config derived from it.
pub struct Resolved {
    pub profile_name: String,
    pub profile: Option<Profile>,
    pub dashboard: DashboardConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the `DashboardConfig` from the config file, profile and flags.
///
/// Flag > env > profile. Without a profile, `--api-url` alone suffices.
pub fn resolve(global: &GlobalOpts, mut cfg: Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, &cfg);
    let profile = cfg.profiles.remove(&profile_name);

    let mut dashboard = match (&profile, global.api_url.as_deref()) {
        (Some(p), url) => {
            let mut base = geoentry_config::profile_to_dashboard_config(p)?;
            if let Some(url) = url {
                base.api_url = parse_url(url)?;
            }
            base
        }
        (None, Some(url)) => DashboardConfig::new(parse_url(url)?),
        (None, None) if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available.join(", "),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: geoentry_config::config_path().display().to_string(),
            });
        }
    };

    match global.timeout {
        Some(0) => {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least one second".into(),
            });
        }
        Some(secs) => dashboard.timeout = Duration::from_secs(secs),
        None => {}
    }

    if global.insecure {
        dashboard.tls = TlsVerification::DangerAcceptInvalid;
    }

    Ok(Resolved {
        profile_name,
        profile,
        dashboard,
    })
}

fn parse_url(raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: "api-url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["geoentry"];
        argv.extend_from_slice(args);
        argv.push("stats");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn with_profile(name: &str, url: &str) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            name.into(),
            Profile {
                api_url: url.into(),
                timeout: Some(12),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn flags_override_profile() {
        let cfg = with_profile("default", "https://a.geoentry.test");
        let resolved = resolve(
            &global(&["--api-url", "https://b.geoentry.test", "--timeout", "3", "-k"]),
            cfg,
        )
        .unwrap();

        assert_eq!(resolved.dashboard.api_url.as_str(), "https://b.geoentry.test/");
        assert_eq!(resolved.dashboard.timeout, Duration::from_secs(3));
        assert!(matches!(
            resolved.dashboard.tls,
            TlsVerification::DangerAcceptInvalid
        ));
        assert!(resolved.profile.is_some());
    }

    #[test]
    fn profile_values_apply_without_flags() {
        let cfg = with_profile("default", "https://a.geoentry.test");
        let resolved = resolve(&global(&[]), cfg).unwrap();
        assert_eq!(resolved.dashboard.timeout, Duration::from_secs(12));
        assert_eq!(resolved.profile_name, "default");
    }

    #[test]
    fn missing_profile_and_url_is_an_error() {
        assert!(matches!(
            resolve(&global(&[]), Config::default()),
            Err(CliError::NoConfig { .. })
        ));

        let cfg = with_profile("work", "https://a.geoentry.test");
        assert!(matches!(
            resolve(&global(&["--profile", "home"]), cfg),
            Err(CliError::ProfileNotFound { ref available, .. }) if available == "work"
        ));
    }
}
