/// amptools: integration analysis for amplicon haplotype data
///
/// This is the entry point for the amptools CLI.
/// It is responsible for parsing the CLI arguments
/// and executing the appropriate subcommand [amp-tool].
///
/// This wrapper offers 4 different subcommands:
/// - amp-abund
/// - amp-umap
/// - amp-mltree
/// - run
///
/// Each subcommand/submodule offers different functionalities,
/// such as plotting relative abundances per taxonomic rank,
/// embedding per-target sequence subsets with UMAP, and inferring
/// maximum-likelihood trees. The `run` subcommand chains the three
/// modules for a single target. In addition to the latter, amptools
/// also includes two hidden submodules: 'amp-pack' [the sample
/// bundle loader] and 'config' [universal constants and helpers
/// for the amptools pipeline].
///
/// To get help on the subcommands, you can run:
///
/// ```shell
/// amptools amp-umap -- --help
/// ```
///
use clap::{Args, Parser, Subcommand};
use log::{error, info, Level};
use simple_logger::init_with_level;

use std::process::Command;

const ENTRY: &str = env!("CARGO_MANIFEST_DIR");
const RELEASES: &str = "target/release";

const HELP: &str = r#"
Usage: amptools run --samples <DIR> --rank <RANK> --target <NAME> --target-rank <RANK> <OUTDIR>

 Options:
  --samples <DIR>             Path to samples directory [one subdirectory per sample]
  --rank <RANK>               Taxonomic rank to aggregate abundances at
  --target <NAME>             Target taxon name to subset haplotypes by
  --target-rank <RANK>        Rank the target name belongs to
  <OUTDIR>                    Output directory, always the last argument
  -h, --help                  Print help
"#;

#[derive(Parser)]
#[command(name = "amptools")]
#[command(about = "amptools: integration analysis for amplicon haplotype data")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "amp-abund")]
    Abund(AmpArgs),
    #[command(name = "amp-umap")]
    Umap(AmpArgs),
    #[command(name = "amp-mltree")]
    Mltree(AmpArgs),
    #[command(name = "run")]
    Run(AmpArgs),
}

#[derive(Args)]
struct AmpArgs {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, help = HELP)]
    args: Vec<String>,
}

fn main() {
    init_with_level(Level::Info).unwrap();
    let cli = Cli::parse();

    init();

    let (cmd, args) = match cli.command {
        Commands::Abund(args) => ("amp-abund", args.args),
        Commands::Umap(args) => ("amp-umap", args.args),
        Commands::Mltree(args) => ("amp-mltree", args.args),
        Commands::Run(args) => ("run", args.args),
    };

    match cmd {
        "run" => amptools::lib(args),
        _ => {
            let package = std::path::Path::new(ENTRY)
                .parent()
                .expect("ERROR: Could not get parent dir")
                .join(RELEASES)
                .join(cmd);

            if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
                let output = Command::new(package)
                    .arg("--help")
                    .output()
                    .expect("ERROR: Failed to execute process");

                check_output(output);
            } else {
                let output = Command::new(package)
                    .args(args)
                    .output()
                    .expect("ERROR: Failed to execute process");

                check_output(output);
            }
        }
    }
}

fn check_output(output: std::process::Output) {
    if output.status.success() {
        info!("{}", String::from_utf8_lossy(&output.stdout));
    } else {
        error!("{}", String::from_utf8_lossy(&output.stderr));
        std::process::exit(1);
    }
}

fn init() {
    let message = format!(
        r#"

        amptools: integration analysis for amplicon haplotype data

        this is the entry point for the amptools CLI
        and it is responsible for parsing the CLI arguments
        for each amp-tool:

        - amp-abund
        - amp-umap
        - amp-mltree

        > version: {}

        for any bug, please open an issue on the repository.

        * to get help on the subcommands, run:
            amptools <SUBCOMMAND> -- --help

        "#,
        env!("CARGO_PKG_VERSION")
    );

    println!("{}", message);
}
