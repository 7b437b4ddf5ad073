// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn version_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("version")
            .long("version")
            .value_name("VERSION")
            .default_value("")
            .help("Exact version (empty matches any)"),
    )
    .arg(
        Arg::new("release")
            .long("release")
            .value_name("RELEASE")
            .default_value("")
            .help("Release (empty matches any)"),
    )
}

fn build_cli() -> Command {
    Command::new("yumrepo")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Yumrepo Contributors")
        .about("Resolve packages and dependencies against YUM/RPM repositories")
        .arg(
            Arg::new("type")
                .long("type")
                .value_parser(["lhcb", "atlas"])
                .default_value("lhcb")
                .global(true)
                .help("Configuration preset"),
        )
        .arg(
            Arg::new("siteroot")
                .long("siteroot")
                .env("MYSITEROOT")
                .value_name("DIR")
                .global(true)
                .help("Installation root; the cache lives in <siteroot>/var/cache/yum"),
        )
        .arg(
            Arg::new("repo_url")
                .long("repo-url")
                .value_name("URL")
                .global(true)
                .help("Repository base URL (default depends on --type)"),
        )
        .arg(
            Arg::new("repo_name")
                .long("repo-name")
                .value_name("NAME")
                .global(true)
                .help("Repository name used for the cache directory (default: --type)"),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .value_name("KIND")
                .action(ArgAction::Append)
                .global(true)
                .help("Backend kind to try, in order (default: sqlite, xml)"),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Use the cached catalog without checking for updates"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable debug output"),
        )
        .subcommand(Command::new("sync").about("Download the latest repository catalog"))
        .subcommand(version_args(
            Command::new("find")
                .about("Find the latest package with a name")
                .arg(Arg::new("name").required(true).help("Package name")),
        ))
        .subcommand(version_args(
            Command::new("provides")
                .about("Find the latest package providing a capability")
                .arg(Arg::new("capability").required(true).help("Capability name"))
                .arg(
                    Arg::new("flags")
                        .long("flags")
                        .value_parser(["EQ", "LT", "LE", "GT", "GE"])
                        .default_value("EQ")
                        .help("Comparison operator"),
                ),
        ))
        .subcommand(version_args(
            Command::new("deps")
                .about("List the packages a package requires, transitively")
                .arg(Arg::new("name").required(true).help("Package name"))
                .arg(
                    Arg::new("urls")
                        .long("urls")
                        .action(ArgAction::SetTrue)
                        .help("Print download URLs instead of package names"),
                ),
        ))
        .subcommand(
            Command::new("list")
                .about("List every package in the repository")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("yumrepo.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
