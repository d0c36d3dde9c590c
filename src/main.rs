use clap::{
    crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches,
    Command,
};
use std::path::PathBuf;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help("Path to a packager.toml, defaults to ./packager.toml when present")
        .value_parser(clap::value_parser!(PathBuf))
}

fn workspace_arg() -> Arg {
    Arg::new("workspace")
        .short('w')
        .long("workspace")
        .help("Directory holding <vendor>/<name> packages")
        .value_parser(clap::value_parser!(PathBuf))
}

fn yes_arg() -> Arg {
    Arg::new("yes")
        .short('y')
        .long("yes")
        .help("Skip the confirmation prompt")
        .action(ArgAction::SetTrue)
}

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("new")
                .about("Generates a package from the skeleton into <workspace>/<vendor>/<name>")
                .arg(Arg::new("vendor").help("vendor name, asked for when omitted"))
                .arg(Arg::new("name").help("package name, asked for when omitted"))
                .arg(
                    Arg::new("source")
                        .short('s')
                        .long("source")
                        .help("Skeleton zip URL, git reference, local zip or directory"),
                )
                .arg(workspace_arg())
                .arg(config_arg())
                .arg(yes_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Removes a generated package")
                .arg(Arg::new("vendor").help("vendor name").required(true))
                .arg(Arg::new("name").help("package name").required(true))
                .arg(workspace_arg())
                .arg(config_arg())
                .arg(yes_arg()),
        )
        .subcommand(
            Command::new("tree")
                .about("Prints the folder layout generated inside src/")
                .arg(config_arg()),
        )
        .get_matches();

    let is_verbose = matches.get_flag("verbose");

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if is_verbose { "debug" } else { "warn" }),
    )
    .init();

    match matches.subcommand() {
        Some(("new", args)) => handle_new(args),
        Some(("remove", args)) => handle_remove(args),
        Some(("tree", args)) => handle_tree(args),
        _ => unreachable!(),
    }
}

fn handle_new(args: &ArgMatches) -> miette::Result<()> {
    let workspace = args.get_one::<PathBuf>("workspace");
    let config = args.get_one::<PathBuf>("config");

    let request = packager::NewPackage {
        vendor: args.get_one::<String>("vendor").map(String::as_str),
        name: args.get_one::<String>("name").map(String::as_str),
        source: args.get_one::<String>("source").map(String::as_str),
        workspace: workspace.map(PathBuf::as_path),
        config: config.map(PathBuf::as_path),
        assume_yes: args.get_flag("yes"),
    };

    match packager::new_package(request)? {
        Some(report) => println!(
            "Package generated at {} ({} files, {} empty folders kept)",
            report.package_dir.display(),
            report.written.len(),
            report.marked.len()
        ),
        None => println!("Nothing generated"),
    }

    Ok(())
}

fn handle_remove(args: &ArgMatches) -> miette::Result<()> {
    let vendor = args.get_one::<String>("vendor").expect("vendor required");
    let name = args.get_one::<String>("name").expect("name required");

    let removed = packager::remove_package(
        vendor,
        name,
        args.get_one::<PathBuf>("workspace").map(PathBuf::as_path),
        args.get_one::<PathBuf>("config").map(PathBuf::as_path),
        args.get_flag("yes"),
    )?;

    if !removed {
        println!("Nothing removed");
    }

    Ok(())
}

fn handle_tree(args: &ArgMatches) -> miette::Result<()> {
    let tree = packager::folder_tree(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    print!("{}", tree);

    Ok(())
}
