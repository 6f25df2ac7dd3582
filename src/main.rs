/// Report on a FAT12 image file
/// Usage: fat12-reader IMAGE [--filename NAME --output PATH]
///
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info, LevelFilter};

use fat12_image_reader::error::FAT12Error;
use fat12_image_reader::scan::Session;
use fat12_image_reader::settings::{Settings, DEFAULT_CONFIG_FILE};

/// Command line arguments to read an image file
#[derive(Parser, Debug)]
#[clap(about, version, author)]
struct Args {
    /// Image file to read
    image: PathBuf,

    /// Config file to load settings from
    #[clap(short, long)]
    config: Option<String>,

    /// Longest cluster chain to follow before giving up on a file
    #[clap(short, long)]
    max_chain_length: Option<u32>,

    /// Specify a file in the root directory to extract, by long or 8.3 name
    #[clap(short, long, requires = "output")]
    filename: Option<String>,

    /// Specify an output filename to write the extracted file to
    #[clap(short, long, requires = "filename")]
    output: Option<PathBuf>,

    /// Verbose mode will print information while reading the image file
    #[clap(short, long)]
    verbose: bool,
}

/// Read an image file
fn main() {
    // Parse command line arguments
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            exit(code);
        }
    };

    let config_name = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);
    let (mut settings, settings_error) = match Settings::load(config_name) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    // Initialize logger, RUST_LOG overrides the default level
    let level = if args.verbose || settings.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init()
    {
        eprintln!("couldn't initialize logger: {:?}", e);
    }

    match settings_error {
        None => info!("merged in config"),
        Some(e) => error!("error loading config: {}", e),
    }

    if args.max_chain_length.is_some() {
        settings.max_chain_length = args.max_chain_length;
    }

    let mut session = match Session::open(&args.image, &settings) {
        Ok(session) => session,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            exit(1);
        }
    };

    if args.verbose {
        println!("{}", session.boot_record());
        println!("{}", session.layout());
        let cluster_count = session.layout().cluster_count();
        match session.allocation_table() {
            Ok(table) => println!("Allocation table: {}\n", table.summary(cluster_count)),
            Err(e) => error!("{}", e),
        }
    }

    let report = match session.scan_root_directory() {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            exit(1);
        }
    };
    print!("{}", report);

    if let (Some(filename), Some(output)) = (&args.filename, &args.output) {
        let data = match report.find(filename) {
            Some(found) => {
                let entry = found.entry.clone();
                session.read_file(&entry)
            }
            None => Err(FAT12Error::FileNotFound(filename.clone())),
        };

        let data = match data {
            Ok(data) => data,
            Err(e) => {
                error!("{}", e);
                eprintln!("{}", e);
                exit(1);
            }
        };

        let written = File::create(output).and_then(|mut file| file.write_all(&data));
        if let Err(e) = written {
            error!("Error writing {}: {}", output.display(), e);
            exit(1);
        }
        info!("Wrote {} bytes to {}", data.len(), output.display());
    }

    exit(0);
}
