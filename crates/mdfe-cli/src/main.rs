//! # mdfe CLI entry point
//!
//! Parses command-line arguments, loads the emitter config and dispatches
//! to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mdfe_cli::config::EmitterConfig;
use mdfe_cli::contingency::{run_contingency, ContingencyArgs};
use mdfe_cli::event::{run_event, EventArgs};
use mdfe_cli::key::{run_key, KeyArgs};
use mdfe_cli::manifest::{run_adjust, run_build, AdjustArgs, BuildArgs};
use mdfe_cli::reconcile::{run_reconcile, ReconcileArgs};
use mdfe_cli::signing::{run_keygen, run_sign, run_verify, KeygenArgs, SignArgs, VerifyArgs};

/// MDF-e toolkit CLI.
///
/// Builds, signs and reconciles electronic transport manifests, and
/// manages the emitter's contingency mode.
#[derive(Parser, Debug)]
#[command(name = "mdfe", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the emitter configuration file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured state directory.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, check or recompute access keys.
    Key(KeyArgs),

    /// Show or change the persisted contingency mode.
    Contingency(ContingencyArgs),

    /// Assemble a manifest from a YAML or JSON description.
    Build(BuildArgs),

    /// Re-key a finished manifest under the current contingency mode.
    Adjust(AdjustArgs),

    /// Generate an Ed25519 signing key.
    Keygen(KeygenArgs),

    /// Sign a manifest or event.
    Sign(SignArgs),

    /// Verify a signed document.
    Verify(VerifyArgs),

    /// Build an event request.
    Event(EventArgs),

    /// Reconcile a submission with the authority's response.
    Reconcile(ReconcileArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = load_config(&cli).and_then(|config| match &cli.command {
        Commands::Key(args) => run_key(args),
        Commands::Contingency(args) => run_contingency(args, &config),
        Commands::Build(args) => run_build(args, &config),
        Commands::Adjust(args) => run_adjust(args, &config),
        Commands::Keygen(args) => run_keygen(args),
        Commands::Sign(args) => run_sign(args),
        Commands::Verify(args) => run_verify(args),
        Commands::Event(args) => run_event(args, &config),
        Commands::Reconcile(args) => run_reconcile(args),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<EmitterConfig> {
    let mut config = EmitterConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.state_dir {
        config.state_dir = dir.clone();
    }
    tracing::debug!(state_dir = %config.state_dir.display(), environment = %config.environment, "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdfe_cli::contingency::ContingencyCommand;
    use mdfe_cli::event::EventCommand;
    use mdfe_cli::key::KeyCommand;
    use mdfe_cli::reconcile::ReconcileCommand;

    #[test]
    fn cli_parse_key_build() {
        let cli = Cli::try_parse_from([
            "mdfe", "key", "build", "--uf-code", "41", "--year", "14", "--month", "05",
            "--tax-id", "81452880000139", "--series", "1", "--number", "28",
            "--control-number", "61174316",
        ])
        .unwrap();
        let Commands::Key(args) = cli.command else {
            panic!("expected key command");
        };
        let KeyCommand::Build {
            model,
            emission_type,
            ..
        } = args.command
        else {
            panic!("expected key build");
        };
        assert_eq!(model, "58");
        assert_eq!(emission_type, "1");
    }

    #[test]
    fn cli_parse_key_check_with_uf() {
        let cli = Cli::try_parse_from(["mdfe", "key", "check", "4114", "--uf", "PR"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Key(KeyArgs {
                command: KeyCommand::Check { .. }
            })
        ));
    }

    #[test]
    fn cli_parse_contingency_activate() {
        let cli = Cli::try_parse_from([
            "mdfe",
            "contingency",
            "activate",
            "--motive",
            "SEFAZ fora do ar",
            "--uf",
            "SP",
        ])
        .unwrap();
        let Commands::Contingency(args) = cli.command else {
            panic!("expected contingency command");
        };
        let ContingencyCommand::Activate { motive, uf, mode } = args.command else {
            panic!("expected activate");
        };
        assert_eq!(motive, "SEFAZ fora do ar");
        assert_eq!(uf.as_deref(), Some("SP"));
        assert!(mode.is_none());
    }

    #[test]
    fn cli_parse_activate_requires_motive() {
        assert!(Cli::try_parse_from(["mdfe", "contingency", "activate"]).is_err());
    }

    #[test]
    fn cli_parse_build_with_out() {
        let cli = Cli::try_parse_from(["mdfe", "build", "m.yaml", "--out", "m.xml"]).unwrap();
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.spec, PathBuf::from("m.yaml"));
        assert_eq!(args.out, Some(PathBuf::from("m.xml")));
    }

    #[test]
    fn cli_parse_sign_default_tag() {
        let cli = Cli::try_parse_from(["mdfe", "sign", "doc.xml", "--key", "mdfe.key"]).unwrap();
        let Commands::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        assert_eq!(args.tag, "infMDFe");
    }

    #[test]
    fn cli_parse_event_cancel_with_trailing_globals() {
        let cli = Cli::try_parse_from([
            "mdfe",
            "event",
            "cancel",
            "--protocol",
            "941140000000001",
            "--justification",
            "Erro de digitacao",
            "--key",
            "41140581452880000139580010000000281611743166",
            "--sequence",
            "2",
        ])
        .unwrap();
        let Commands::Event(args) = cli.command else {
            panic!("expected event");
        };
        assert_eq!(args.sequence, 2);
        assert!(args.key.is_some());
        assert!(matches!(args.command, EventCommand::Cancel { .. }));
    }

    #[test]
    fn cli_parse_reconcile_event() {
        let cli = Cli::try_parse_from([
            "mdfe",
            "reconcile",
            "event",
            "ev.xml",
            "--response",
            "ret.xml",
            "--kind",
            "110112",
        ])
        .unwrap();
        let Commands::Reconcile(args) = cli.command else {
            panic!("expected reconcile");
        };
        assert!(matches!(
            args.command,
            ReconcileCommand::Event { kind: Some(_), .. }
        ));
    }

    #[test]
    fn cli_parse_verbose_levels() {
        let cli0 = Cli::try_parse_from(["mdfe", "contingency", "deactivate"]).unwrap();
        assert_eq!(cli0.verbose, 0);
        let cli2 = Cli::try_parse_from(["mdfe", "-vv", "contingency", "deactivate"]).unwrap();
        assert_eq!(cli2.verbose, 2);
    }

    #[test]
    fn cli_parse_config_and_state_dir() {
        let cli = Cli::try_parse_from([
            "mdfe",
            "--config",
            "mdfe.yaml",
            "--state-dir",
            "/tmp/mdfe",
            "contingency",
            "status",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("mdfe.yaml")));
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/mdfe")));
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["mdfe"]).is_err());
    }

    #[test]
    fn state_dir_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdfe.yaml");
        std::fs::write(&path, "state_dir: /var/lib/mdfe\n").unwrap();
        let cli = Cli::try_parse_from([
            "mdfe",
            "--config",
            path.to_str().unwrap(),
            "--state-dir",
            "override",
            "contingency",
            "status",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.state_dir, PathBuf::from("override"));
    }
}
