use crate::config::filters::Extensions;
use crate::config::settings::{default_dirs, Settings, SiteLayout, DEFAULT_SETTINGS_FILE};
use crate::config::types::{Severity, SeverityMask};
use crate::host::log_bridge::LogBridge;
use crate::sink::lifecycle::Lifecycle;
use crate::sink::registry::SinkRegistry;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct LayoutArgs {
    /// Site root, stripped from default entries
    #[arg(long, default_value = "/")]
    root: PathBuf,
    /// Plugins directory (defaults to <root>/wp-content/plugins)
    #[arg(long)]
    plugins: Option<PathBuf>,
    /// Content directory (defaults to <root>/wp-content)
    #[arg(long)]
    content: Option<PathBuf>,
}

impl LayoutArgs {
    fn layout(&self) -> SiteLayout {
        let mut layout = SiteLayout::new(&self.root);
        if let Some(content) = &self.content {
            layout.content_dir = content.clone();
            layout.plugins_dir = content.join("plugins");
        }
        if let Some(plugins) = &self.plugins {
            layout.plugins_dir = plugins.clone();
        }
        layout
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the built-in directory list
    Defaults {
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Replace the configured directories with the built-in list
    Reset {
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Write the built-in list only when no directories are configured
    Seed {
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Print the effective rule set
    Show {
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
        /// Severity mask override (names separated by '|' or an integer)
        #[arg(long)]
        levels: Option<SeverityMask>,
    },
    /// Decide whether one diagnostic would be suppressed
    Check {
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
        #[arg(long)]
        severity: Severity,
        /// Origin file of the diagnostic
        #[arg(long)]
        file: String,
        #[arg(long, default_value_t = 0)]
        line: u32,
        #[arg(long)]
        levels: Option<SeverityMask>,
    },
}

fn extensions(levels: Option<SeverityMask>) -> Extensions {
    match levels {
        Some(mask) => Extensions::new().filter_levels(move |_| mask),
        None => Extensions::new(),
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(LevelFilter::Warn);
    }

    if let Err(e) = LogBridge::init_with(SinkRegistry::global(), builder.build()) {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Defaults { layout } => {
            for dir in default_dirs(&layout.layout()) {
                println!("{}", dir);
            }
            Ok(())
        }
        Commands::Reset { settings, layout } => {
            let mut current = Settings::load(&settings)?;
            current.reset(&layout.layout());
            current.save(&settings)?;
            info!("Directories reset to defaults in {}", settings.display());
            Ok(())
        }
        Commands::Seed { settings, layout } => {
            let mut current = Settings::load(&settings)?;
            if current.seed_defaults_if_empty(&layout.layout()) {
                current.save(&settings)?;
                println!("seeded");
            } else {
                println!("unchanged");
            }
            Ok(())
        }
        Commands::Show { settings, levels } => {
            let current = Settings::load(&settings)?;
            let rules = extensions(levels).build_rules(&current);
            let report = serde_json::json!({
                "disabled": current.disabled,
                "inert": rules.is_inert(),
                "severity_mask": rules.severity_mask().to_string(),
                "prefixes": rules.prefixes(),
                "fingerprint": rules.fingerprint(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Check {
            settings,
            severity,
            file,
            line,
            levels,
        } => {
            let current = Settings::load(&settings)
                .with_context(|| format!("loading {}", settings.display()))?;
            let decision = check(&current, &extensions(levels), severity, &file, line);
            println!("{}", decision);
            Ok(())
        }
    }
}

/// Run one diagnostic through a private registry whose original sink only
/// records that it was reached.
fn check(
    settings: &Settings,
    extensions: &Extensions,
    severity: Severity,
    file: &str,
    line: u32,
) -> &'static str {
    let registry = SinkRegistry::new();
    let reached = Arc::new(AtomicBool::new(false));
    let flag = reached.clone();
    registry.capture_and_replace(Some(Arc::new(
        move |_: Severity, _: &str, _: &str, _: u32| {
            flag.store(true, Ordering::SeqCst);
            false
        },
    )));

    let lifecycle = Lifecycle::bootstrap(&registry, settings, extensions);
    if !lifecycle.is_active() {
        return "bypassed";
    }

    let handled = registry.raise(severity, "diagsieve check", file, line);
    if handled && !reached.load(Ordering::SeqCst) {
        "suppressed"
    } else {
        "forwarded"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_decisions() {
        let settings = Settings::with_dirs(["wp-admin/"]);
        let ext = Extensions::new();

        assert_eq!(
            check(&settings, &ext, Severity::Deprecated, "/site/wp-admin/a.php", 1),
            "suppressed"
        );
        assert_eq!(
            check(&settings, &ext, Severity::Deprecated, "/site/plugins/a.php", 1),
            "forwarded"
        );
        assert_eq!(
            check(&settings, &ext, Severity::Error, "/site/wp-admin/a.php", 1),
            "forwarded"
        );
    }

    #[test]
    fn test_check_bypassed_when_disabled() {
        let mut settings = Settings::with_dirs(["wp-admin/"]);
        settings.disabled = true;
        assert_eq!(
            check(&settings, &Extensions::new(), Severity::Deprecated, "/site/wp-admin/a.php", 1),
            "bypassed"
        );
    }

    #[test]
    fn test_levels_override_in_check() {
        let settings = Settings::with_dirs(["wp-admin/"]);
        let ext = extensions(Some(Severity::Error.into()));
        assert_eq!(
            check(&settings, &ext, Severity::Error, "/site/wp-admin/a.php", 1),
            "suppressed"
        );
    }

    #[test]
    fn test_layout_args() {
        let args = LayoutArgs {
            root: PathBuf::from("/srv/site"),
            plugins: None,
            content: Some(PathBuf::from("/srv/content")),
        };
        let layout = args.layout();
        assert_eq!(layout.plugins_dir, PathBuf::from("/srv/content/plugins"));
    }
}
