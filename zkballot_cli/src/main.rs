use clap::{App, AppSettings, Arg, SubCommand};

mod command_e2e;
mod command_keygen;
mod command_tree;
mod config;

use command_e2e::command_e2e;
use command_keygen::{command_keygen, command_secret};
use command_tree::{command_leaf, command_nullifier, command_path, command_root};
use config::Config;

const ROSTER_HELP: &str = "Roster file: JSON list of {\"index\": n, \"leaf\": \"<64 hex digits>\"}";

fn main() {
    let matches = App::new("ZkBallot CLI")
        .version("0.1")
        .about("Voter roster, key and demo-election tooling for zkballot")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(SubCommand::with_name("keygen").about("Generate an ed25519 keypair"))
        .subcommand(
            SubCommand::with_name("secret")
                .about("Generate a voter secret and its eligibility leaf"),
        )
        .subcommand(
            SubCommand::with_name("leaf")
                .about("Derive the eligibility leaf of a voter secret")
                .arg(
                    Arg::with_name("SECRET")
                        .index(1)
                        .required(true)
                        .help("Voter secret, hex (0x...) or decimal"),
                ),
        )
        .subcommand(
            SubCommand::with_name("nullifier")
                .about("Derive the nullifier of a voter secret for an election")
                .arg(
                    Arg::with_name("SECRET")
                        .index(1)
                        .required(true)
                        .help("Voter secret, hex (0x...) or decimal"),
                )
                .arg(
                    Arg::with_name("ELECTION-ID")
                        .index(2)
                        .required(true)
                        .help("Election id, hex (0x...) or decimal"),
                ),
        )
        .subcommand(
            SubCommand::with_name("root")
                .about("Compute the eligibility root of a roster")
                .arg(
                    Arg::with_name("ROSTER")
                        .index(1)
                        .required(true)
                        .help(ROSTER_HELP),
                ),
        )
        .subcommand(
            SubCommand::with_name("path")
                .about("Build the merkle path of a roster leaf")
                .arg(
                    Arg::with_name("ROSTER")
                        .index(1)
                        .required(true)
                        .help(ROSTER_HELP),
                )
                .arg(
                    Arg::with_name("INDEX")
                        .index(2)
                        .required(true)
                        .help("Leaf index"),
                ),
        )
        .subcommand(
            SubCommand::with_name("e2e")
                .about("Run a local demo election end to end")
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .default_value("5")
                        .help("Number of voters"),
                )
                .arg(
                    Arg::with_name("candidates")
                        .long("candidates")
                        .takes_value(true)
                        .default_value("3")
                        .help("Number of candidates"),
                ),
        )
        .get_matches();

    let level = match matches.occurrences_of("v") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config::from_env().unwrap_or_else(|e| exit_with("config", e));

    // Subcommands
    match matches.subcommand() {
        ("keygen", Some(matches)) => command_keygen(matches),
        ("secret", Some(matches)) => command_secret(matches),
        ("leaf", Some(matches)) => command_leaf(matches),
        ("nullifier", Some(matches)) => command_nullifier(matches),
        ("root", Some(matches)) => command_root(matches, &config),
        ("path", Some(matches)) => command_path(matches, &config),
        ("e2e", Some(matches)) => command_e2e(matches, &config),
        _ => {}
    }
}

/// Print an error for `command` and exit non-zero
pub fn exit_with(command: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("zkballot {}: {}", command, e);
    std::process::exit(1);
}
