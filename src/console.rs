//! Handling the command line of the batch tool
//!
//! This module handles the command line parsing as well as basic information (help dialog, version information).
use std::path::{Path, PathBuf};

use clap::{builder::Str, Parser};

use crate::{
    error::{CassegrainError, CsgResult},
    get_version,
};

/// Validated command line arguments of the batch tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// CSV file with the design records to be ranked
    pub input: PathBuf,
    /// destination of the ranked results
    pub output: PathBuf,
    /// number of best configurations kept, overrides the run configuration
    pub top_n: Option<usize>,
    /// number of rays per configuration, overrides the run configuration
    pub nr_of_rays: Option<usize>,
    /// YAML run configuration
    pub config: Option<PathBuf>,
}

/// Raw command line arguments as parsed by `clap`.
#[derive(Parser, Debug)]
#[command(author, version = Str::from(&get_version()), about, long_about = None)]
pub struct PartialArgs {
    /// CSV file with the design records to be ranked
    #[arg(short, long)]
    input: String,

    /// destination of the ranked results. if not defined, `<input>_ranked.csv` next to the input file is used
    #[arg(short, long)]
    output: Option<String>,

    /// number of best configurations kept in the ranking
    #[arg(short, long)]
    top_n: Option<usize>,

    /// number of rays traced per secondary position
    #[arg(short, long)]
    rays: Option<usize>,

    /// YAML file with the run configuration
    #[arg(short, long)]
    config: Option<String>,
}

fn file_path_is_valid(path: &Path, extensions: &[&str]) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|e| extensions.iter().any(|ext| e == *ext))
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "results".to_owned(), |s| s.to_string_lossy().to_string());
    input.with_file_name(format!("{stem}_ranked.csv"))
}

impl TryFrom<PartialArgs> for Args {
    type Error = CassegrainError;

    fn try_from(part_args: PartialArgs) -> CsgResult<Self> {
        let input = PathBuf::from(&part_args.input);
        if !file_path_is_valid(&input, &["csv"]) {
            return Err(CassegrainError::Console(format!(
                "invalid input file: {}",
                input.display()
            )));
        }
        let config = match part_args.config {
            Some(c) => {
                let path = PathBuf::from(c);
                if !file_path_is_valid(&path, &["yaml", "yml"]) {
                    return Err(CassegrainError::Console(format!(
                        "invalid run configuration file: {}",
                        path.display()
                    )));
                }
                Some(path)
            }
            None => None,
        };
        if part_args.top_n == Some(0) {
            return Err(CassegrainError::Console("top-n must be > 0".into()));
        }
        if part_args.rays == Some(0) {
            return Err(CassegrainError::Console(
                "number of rays must be > 0".into(),
            ));
        }
        let output = part_args
            .output
            .map_or_else(|| default_output_path(&input), PathBuf::from);
        Ok(Self {
            input,
            output,
            top_n: part_args.top_n,
            nr_of_rays: part_args.rays,
            config,
        })
    }
}

/// Show name and version of the batch tool.
pub fn show_intro() {
    println!("cassegrain - Cassegrain telescope configuration ranking");
    println!("version {}\n", get_version());
}
