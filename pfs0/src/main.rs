use std::path::Path;

use anyhow::Context;
use clap::{crate_description, crate_name, crate_version, App, AppSettings, Arg, SubCommand};
use pfs0::{list, Builder, Config, DEFAULT_OUTPUT};
use tracing_subscriber::EnvFilter;

fn create(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let mut config = match matches.value_of("config") {
        Some(path) => Config::open(Path::new(path))?,
        None => Config::default(),
    };
    if let Some(buffer) = matches.value_of("buffer") {
        config.buffer_size = buffer
            .parse()
            .with_context(|| format!("Invalid buffer size: {}", buffer))?;
    }
    if matches.is_present("progress") {
        config.progress = true;
    }

    let output = matches.value_of("output").unwrap_or(DEFAULT_OUTPUT);
    let files = matches.values_of("files").into_iter().flatten();

    let mut builder = Builder::with_config(output, config);
    builder
        .add_files(files)
        .context("Failed to add files to NSP builder")?;
    builder.build().context("Failed to build NSP file")?;

    println!("Successfully built NSP file: {}", output);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = App::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("create")
                .about("Package files into an NSP archive")
                .arg(
                    Arg::with_name("output")
                        .help("NSP output file name")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("FILE")
                        .default_value(DEFAULT_OUTPUT),
                )
                .arg(
                    Arg::with_name("buffer")
                        .help("Buffer size for file copying operations")
                        .long("buffer")
                        .takes_value(true)
                        .value_name("BYTES"),
                )
                .arg(
                    Arg::with_name("progress")
                        .help("Show progress bar during NSP creation")
                        .long("progress"),
                )
                .arg(
                    Arg::with_name("config")
                        .help("TOML file with builder settings")
                        .short("c")
                        .long("config")
                        .takes_value(true)
                        .value_name("FILE"),
                )
                .arg(
                    Arg::with_name("files")
                        .help("Files to package, usually .nca")
                        .required(true)
                        .multiple(true)
                        .value_name("FILE"),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List archive entries")
                .arg(
                    Arg::with_name("archive")
                        .help("Archive file")
                        .short("a")
                        .long("archive")
                        .required(true)
                        .takes_value(true)
                        .value_name("FILE"),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("create") {
        create(matches)
    } else if let Some(matches) = matches.subcommand_matches("list") {
        list(matches.value_of("archive").unwrap_or_default())
            .context("Failed to list NSP file")
    } else {
        Ok(())
    }
}
