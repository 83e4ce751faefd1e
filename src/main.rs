//! Punto de entrada.
//!
//! Este módulo expone una CLI sobre [`littlec::driver`].

use anyhow::{self, Context};
use clap::{self, crate_version, Arg};
use littlec::{
    driver::{self, Listings},
    source::Source,
};

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    process,
    rc::Rc,
};

use tracing::Level;

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = clap::Command::new("littlec")
        .version(crate_version!())
        .about("Little to Tiny compiler")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .default_value("-")
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .value_name("FILE")
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("ast")
                .long("ast")
                .help("Print the syntax tree"),
        )
        .arg(
            Arg::new("no-ir")
                .long("no-ir")
                .help("Omit the intermediate code listing"),
        )
        .arg(
            Arg::new("no-target")
                .long("no-target")
                .help("Omit the Tiny assembly listing"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Increase logging verbosity"),
        )
        .get_matches();

    let level = match args.occurrences_of("verbose") {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let mut listings = Listings::default();
    if args.is_present("ast") {
        listings |= Listings::AST;
    }

    if args.is_present("no-ir") {
        listings.remove(Listings::IR);
    }

    if args.is_present("no-target") {
        listings.remove(Listings::TARGET);
    }

    // Ambos tienen valores por omisión
    let input = args.value_of("input").unwrap_or("-");
    let output = args.value_of("output").unwrap_or("-");

    let source = match input {
        "-" => Source::read(io::stdin().lock(), "<stdin>").context("Failed to read stdin")?,
        path => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open for reading: {}", path))?;

            Source::read(BufReader::new(file), path)
                .with_context(|| format!("Failed to read source file: {}", path))?
        }
    };

    let compilation = match driver::compile(&Rc::new(source)) {
        Ok(compilation) => compilation,
        Err(diagnostics) => {
            eprint!("{}", diagnostics);
            process::exit(1);
        }
    };

    match output {
        "-" => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();

            compilation
                .write(listings, &mut stdout)
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")?;
        }

        path => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            let mut file = BufWriter::new(file);
            compilation
                .write(listings, &mut file)
                .and_then(|()| file.flush())
                .with_context(|| format!("Failed to write output file: {}", path))?;
        }
    }

    Ok(())
}
