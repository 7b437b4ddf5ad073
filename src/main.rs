// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;
use tracing::info;
use yumrepo::client::Client;
use yumrepo::config::{Config, ConfigType};
use yumrepo::packages::{Package, Requires, Rpm};
use yumrepo::repository::Repository;
use yumrepo::version::Flags;

#[derive(Parser)]
#[command(name = "yumrepo")]
#[command(author, version, about = "Resolve packages and dependencies against YUM/RPM repositories", long_about = None)]
struct Cli {
    /// Configuration preset
    #[arg(long = "type", value_enum, default_value_t = ConfigType::Lhcb, global = true)]
    config_type: ConfigType,

    /// Installation root; the cache lives in <siteroot>/var/cache/yum
    #[arg(long, env = "MYSITEROOT", value_name = "DIR", global = true)]
    siteroot: Option<PathBuf>,

    /// Repository base URL (default depends on --type)
    #[arg(long, value_name = "URL", global = true)]
    repo_url: Option<String>,

    /// Repository name used for the cache directory (default: --type)
    #[arg(long, value_name = "NAME", global = true)]
    repo_name: Option<String>,

    /// Backend kind to try, in order (default: sqlite, xml)
    #[arg(long = "backend", value_name = "KIND", global = true)]
    backends: Vec<String>,

    /// Use the cached catalog without checking for updates
    #[arg(long, global = true)]
    offline: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the latest repository catalog
    Sync,
    /// Find the latest package with a name
    Find {
        /// Package name
        name: String,
        /// Exact version (empty matches any)
        #[arg(long, default_value = "")]
        version: String,
        /// Release (empty matches any)
        #[arg(long, default_value = "")]
        release: String,
    },
    /// Find the latest package providing a capability
    Provides {
        /// Capability name
        capability: String,
        /// Comparison operator
        #[arg(long, default_value = "EQ")]
        flags: Flags,
        /// Exact version (empty matches any)
        #[arg(long, default_value = "")]
        version: String,
        /// Release (empty matches any)
        #[arg(long, default_value = "")]
        release: String,
    },
    /// List the packages a package requires, transitively
    Deps {
        /// Package name
        name: String,
        /// Exact version (empty matches any)
        #[arg(long, default_value = "")]
        version: String,
        /// Release (empty matches any)
        #[arg(long, default_value = "")]
        release: String,
        /// Print download URLs instead of package names
        #[arg(long)]
        urls: bool,
    },
    /// List every package in the repository
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::new(self.config_type, self.siteroot.clone())?
            .with_backends(self.backends.clone())
            .with_debug(self.verbose);
        if let Some(url) = &self.repo_url {
            config = config.with_repo_url(url.clone());
        }
        Ok(config)
    }

    fn repo_name(&self) -> String {
        self.repo_name
            .clone()
            .unwrap_or_else(|| self.config_type.to_string())
    }

    fn open_client(&self) -> Result<Client> {
        let config = self.config()?;
        let name = self.repo_name();
        Client::from_config(&config, &name, !self.offline)
            .with_context(|| format!("Failed to open repository {} at {}", name, config.repo_url))
    }
}

fn print_package(client: &Client, pkg: &Package, urls: bool) -> Result<()> {
    if urls {
        println!("{}", client.package_url(pkg)?);
    } else {
        println!("{}", pkg);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "yumrepo", &mut io::stdout());
            Ok(())
        }
        Commands::Sync => {
            let config = cli.config()?;
            let name = cli.repo_name();
            config.validate()?;

            let mut repo = Repository::open(
                &name,
                &config.repo_url,
                &config.cache_dir(&name),
                &config.backends,
                true,
            )?;
            let count = repo.get_packages()?.len();
            info!("Synchronized {} packages from {}", count, name);
            println!("Synchronized repository {} ({} packages)", name, count);
            repo.close()?;
            Ok(())
        }
        Commands::Find {
            name,
            version,
            release,
        } => {
            let mut client = cli.open_client()?;
            let pkg = client.find_latest_matching_name(name, version, release)?;
            println!("{}", pkg);
            println!("  Repository: {}", pkg.repository());
            println!("  Group: {}", pkg.group());
            println!("  Location: {}", client.package_url(&pkg)?);
            client.close()?;
            Ok(())
        }
        Commands::Provides {
            capability,
            flags,
            version,
            release,
        } => {
            let mut client = cli.open_client()?;
            let requirement = if version.is_empty() {
                Requires::named(capability.as_str())
            } else {
                Requires::versioned(capability.as_str(), *flags, version.as_str(), release.as_str())
            };
            let pkg = client.find_latest_matching_require(&requirement)?;
            println!("{} is provided by {}", requirement, pkg);
            client.close()?;
            Ok(())
        }
        Commands::Deps {
            name,
            version,
            release,
            urls,
        } => {
            let mut client = cli.open_client()?;
            let pkg = client.find_latest_matching_name(name, version, release)?;
            let deps = client.required_packages(&pkg)?;

            print_package(&client, &pkg, *urls)?;
            for dep in &deps {
                print_package(&client, dep, *urls)?;
            }
            if !urls {
                println!("\nTotal: {} package(s) required by {}", deps.len(), pkg.name());
            }
            client.close()?;
            Ok(())
        }
        Commands::List { json } => {
            let mut client = cli.open_client()?;
            let mut packages = client.list_packages()?;
            packages.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.evr().cmp(b.evr())));

            if *json {
                println!("{}", serde_json::to_string_pretty(&packages)?);
            } else if packages.is_empty() {
                println!("No packages found.");
            } else {
                for pkg in &packages {
                    println!("  {}", pkg);
                }
                println!("\nTotal: {} package(s)", packages.len());
            }
            client.close()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_provides() {
        let cli = Cli::try_parse_from([
            "yumrepo",
            "--siteroot",
            "/opt/site",
            "provides",
            "libfoo",
            "--flags",
            "GE",
            "--version",
            "1.0",
        ])
        .unwrap();

        match cli.command {
            Commands::Provides { flags, version, .. } => {
                assert_eq!(flags, Flags::Ge);
                assert_eq!(version, "1.0");
            }
            _ => panic!("expected provides"),
        }
    }

    #[test]
    fn test_config_from_flags() {
        let cli = Cli::try_parse_from([
            "yumrepo",
            "--type",
            "atlas",
            "--siteroot",
            "/opt/site",
            "--backend",
            "xml",
            "--offline",
            "list",
        ])
        .unwrap();

        let config = cli.config().unwrap();
        assert_eq!(config.config_type, ConfigType::Atlas);
        assert_eq!(config.backends, vec!["xml"]);
        assert_eq!(cli.repo_name(), "atlas");
        assert!(cli.offline);
    }
}
