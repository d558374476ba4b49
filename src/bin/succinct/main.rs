//! Succinct CLI tool for building and inspecting frozen structures.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use succinct_mapped::binary::{self, mmap::MappedFile, MapFlags, Mappable};
use succinct_mapped::coding::{EliasFanoCompressedList, EliasFanoList, GammaVector};
use succinct_mapped::trees::CartesianTree;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "succinct")]
#[command(about = "Build, inspect and query frozen succinct structures", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a structure from a list of integers and freeze it to a file
    Build(BuildArgs),
    /// Print the size breakdown of a frozen file
    Stats(StatsArgs),
    /// Read one value from a frozen file
    Get(GetArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    /// Gamma coded vector
    Gamma,
    /// Prefix sums in an Elias-Fano sequence
    EfList,
    /// Variable-width values with Elias-Fano offsets
    EfCompressed,
    /// Cartesian tree for range minimum queries
    Cartesian,
}

/// Build a structure from a list of integers and freeze it to a file
#[derive(Debug, Parser)]
struct BuildArgs {
    /// Structure to build
    kind: Kind,

    /// Input file with one unsigned integer per line
    input: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Value stored in the reserved header word
    #[arg(long, default_value = "0")]
    flags: u64,
}

/// Print the size breakdown of a frozen file
#[derive(Debug, Parser)]
struct StatsArgs {
    /// Structure stored in the file
    kind: Kind,

    /// Frozen file
    file: PathBuf,
}

/// Read one value from a frozen file
#[derive(Debug, Parser)]
struct GetArgs {
    /// Structure stored in the file
    kind: Kind,

    /// Frozen file
    file: PathBuf,

    /// Index of the value (range start for `cartesian`)
    index: u64,

    /// Inclusive range end, required for `cartesian`
    end: Option<u64>,

    /// Read the whole file before querying
    #[arg(long)]
    warmup: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => build(&args),
        Command::Stats(args) => stats(&args),
        Command::Get(args) => get(&args),
    }
}

fn read_values(path: &Path) -> Result<Vec<u64>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut values = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = trimmed
            .parse::<u64>()
            .with_context(|| format!("{}:{}: invalid integer {:?}", path.display(), line_no + 1, trimmed))?;
        values.push(value);
    }
    Ok(values)
}

fn build(args: &BuildArgs) -> Result<()> {
    let values = read_values(&args.input)?;
    if matches!(args.kind, Kind::Gamma | Kind::EfCompressed) {
        if let Some(pos) = values.iter().position(|&v| v == u64::MAX) {
            bail!("value at position {} is too large to encode", pos);
        }
    }
    if matches!(args.kind, Kind::EfList) && values.iter().try_fold(0u64, |acc, &v| acc.checked_add(v)).is_none() {
        bail!("sum of values does not fit in 64 bits");
    }

    let written = match args.kind {
        Kind::Gamma => freeze(GammaVector::new(values.iter().copied()), &args.output, args.flags)?,
        Kind::EfList => freeze(EliasFanoList::new(values.iter().copied()), &args.output, args.flags)?,
        Kind::EfCompressed => freeze(
            EliasFanoCompressedList::new(values.iter().copied()),
            &args.output,
            args.flags,
        )?,
        Kind::Cartesian => freeze(CartesianTree::new(values.iter().copied()), &args.output, args.flags)?,
    };
    eprintln!(
        "✓ Wrote {} values ({} bytes) to {}",
        values.len(),
        written,
        args.output.display()
    );
    Ok(())
}

fn freeze<T: Mappable<'static>>(mut value: T, path: &Path, flags: u64) -> Result<usize> {
    binary::freeze_to_file(&mut value, path, flags).with_context(|| format!("Failed to write {}", path.display()))
}

fn open(path: &Path) -> Result<MappedFile> {
    MappedFile::open(path).with_context(|| format!("Failed to map {}", path.display()))
}

fn stats(args: &StatsArgs) -> Result<()> {
    let file = open(&args.file)?;
    let tree = match args.kind {
        Kind::Gamma => size_tree::<GammaVector<'_>>(&file, "gamma")?,
        Kind::EfList => size_tree::<EliasFanoList<'_>>(&file, "ef_list")?,
        Kind::EfCompressed => size_tree::<EliasFanoCompressedList<'_>>(&file, "ef_compressed")?,
        Kind::Cartesian => size_tree::<CartesianTree<'_>>(&file, "cartesian")?,
    };
    print!("{}", tree.render());
    if tree.size != file.len() {
        eprintln!("note: file has {} trailing bytes", file.len().saturating_sub(tree.size));
    }
    Ok(())
}

fn size_tree<'a, T: Mappable<'a> + Default>(file: &'a MappedFile, name: &str) -> Result<binary::SizeNode> {
    let mut value: T = file.map(MapFlags::NONE).context("File does not hold this structure")?;
    Ok(binary::size_tree(&mut value, name))
}

fn get(args: &GetArgs) -> Result<()> {
    let file = open(&args.file)?;
    let flags = if args.warmup { MapFlags::WARMUP } else { MapFlags::NONE };
    let index = args.index;
    let value = match args.kind {
        Kind::Gamma => {
            let v: GammaVector<'_> = file.map(flags)?;
            check_index(index, v.len())?;
            v.get(index)
        }
        Kind::EfList => {
            let v: EliasFanoList<'_> = file.map(flags)?;
            check_index(index, v.len())?;
            v.get(index)
        }
        Kind::EfCompressed => {
            let v: EliasFanoCompressedList<'_> = file.map(flags)?;
            check_index(index, v.len())?;
            v.get(index)
        }
        Kind::Cartesian => {
            let tree: CartesianTree<'_> = file.map(flags)?;
            let end = args.end.context("cartesian queries need a range end")?;
            if index > end {
                bail!("range start {} is after range end {}", index, end);
            }
            check_index(end, tree.size())?;
            tree.rmq(index, end)
        }
    };
    println!("{}", value);
    Ok(())
}

fn check_index(index: u64, len: u64) -> Result<()> {
    if index >= len {
        bail!("index {} out of range for {} values", index, len);
    }
    Ok(())
}
