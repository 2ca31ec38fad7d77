use crate::conf::{ConfigError, load_config};
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub fn check(path: PathBuf, plain: bool) -> anyhow::Result<()> {
    match load_config(&path) {
        Ok(validated) => {
            let cfg = &validated.config;
            println!("✔ Config loaded successfully");
            println!("✔ {} endpoints", cfg.endpoints.len());
            println!(
                "✔ {} discovery candidates ({})",
                cfg.discovery.candidates.len(),
                if cfg.discovery.enable {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!(
                "✔ breaker opens after {} failures, cooldown {}ms",
                cfg.circuit_breaker.failure_threshold, cfg.circuit_breaker.cooldown_ms
            );

            for warning in &validated.warnings {
                if plain {
                    println!("! {warning}");
                } else {
                    println!("{} {}", "!".yellow().bold(), warning.yellow());
                }
            }
            Ok(())
        }
        Err(err) => {
            print_config_error(&err, plain);
            std::process::exit(1);
        }
    }
}

fn print_config_error(err: &ConfigError, plain: bool) {
    if plain {
        eprintln!("{err}");
    } else {
        eprintln!();
        eprintln!("{} {}", "✘".red().bold(), err.red());
    }

    let hints: Vec<&'static str> = match err {
        ConfigError::Validation { validation_errors } => validation_errors
            .errors()
            .iter()
            .filter_map(config_error_hint)
            .collect(),
        other => config_error_hint(other).into_iter().collect(),
    };

    let mut seen = Vec::new();
    for hint in hints {
        if seen.contains(&hint) {
            continue;
        }
        seen.push(hint);
        eprintln!();
        eprintln!("{hint}");
    }
}

pub fn config_error_hint(err: &ConfigError) -> Option<&'static str> {
    match err {
        //---------------------------------------------------------------------
        // File errors
        //---------------------------------------------------------------------
        ConfigError::ReadFile { .. } => Some(
            "Relayway looks for relayway.hcl inside the given directory.\n\
             \n\
             Create one with:\n\
             \n\
             relayway conf init config",
        ),

        //---------------------------------------------------------------------
        // Endpoint errors
        //---------------------------------------------------------------------
        ConfigError::DuplicateEndpoint { .. } => Some(
            "Endpoint ids must be unique.\n\
             \n\
             Rename one of the endpoints or remove the duplicate entry.",
        ),

        ConfigError::InvalidEndpoint { .. } | ConfigError::InvalidCandidate { .. } => Some(
            "Endpoint URLs must use http or https.\n\
             \n\
             Example:\n\
             \n\
             endpoints = [\n  \
               { id = \"primary\", url = \"http://127.0.0.1:8545\", rate_ceiling = 60 },\n\
             ]",
        ),

        //---------------------------------------------------------------------
        // Scoring / breaker errors
        //---------------------------------------------------------------------
        ConfigError::InvalidWeights { .. } => Some(
            "Scoring weights must be non-negative and add up to exactly 1.0.\n\
             \n\
             Default:\n\
             \n\
             weights = {\n  \
               success_rate = 0.4\n  \
               latency      = 0.3\n  \
               load         = 0.2\n  \
               recovery     = 0.1\n\
             }",
        ),

        ConfigError::InvalidCircuitBreaker { .. } => Some(
            "The cooldown can only grow up to max_cooldown_ms.\n\
             \n\
             Set max_cooldown_ms to at least cooldown_ms.",
        ),

        //---------------------------------------------------------------------
        // Everything else: no hint
        //---------------------------------------------------------------------
        _ => None,
    }
}
