//! # CLI Module
//!
//! Command-line interface for nc2json:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML)
//! - Environment variables with the NC2JSON_ prefix
//! - Merging of file and command-line values, command line first
//! - Shell completion scripts

use crate::error::{Nc2JsonError, Nc2JsonResult};
use crate::input::ConversionConfig;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::io::Write;
use std::path::PathBuf;

/// Summarise a netCDF glider archive as a JSON document
#[derive(Parser, Debug)]
#[command(name = "nc2json")]
#[command(about = "Convert netCDF archives into JSON metadata summaries")]
#[command(version)]
#[command(long_about = "
nc2json reads a netCDF archive, from a local path or an HTTP(S) URL, and writes a
JSON document describing it: dimensions, the leading values of every data
variable, global attributes and the bounding box of the quality-controlled GPS
fixes.

EXAMPLES:
  # Local file, document written next to the working directory
  nc2json sea017_20230613_R.nc

  # Remote archive into a directory, echoed to stdout
  nc2json https://co.ifremer.fr/co/ego/ego/v2/sea017/sea017_20230613/sea017_20230613_R.nc \\
    -d out -s

  # Explicit output file
  nc2json data.nc -o summary.json

  # Using a config file, with the source overridden
  nc2json --config job.yaml other.nc

  # Generate completions
  nc2json --completions bash > ~/.bash_completion.d/nc2json
")]
pub struct Cli {
    /// netCDF archive: local path or HTTP(S) URL
    #[arg(
        value_name = "SOURCE",
        env = "NC2JSON_SOURCE",
        required_unless_present_any = ["completions", "config"]
    )]
    pub source: Option<String>,

    /// Output file (default: <DIRECTORY>/<basename of SOURCE>.json)
    #[arg(short = 'o', long, env = "NC2JSON_OUTPUT_FILENAME")]
    pub json_output_filename: Option<String>,

    /// Directory for the derived output file; ignored with --json-output-filename
    #[arg(short = 'd', long, env = "NC2JSON_OUTPUT_DIRECTORY")]
    pub json_output_directory: Option<String>,

    /// Also print the document to stdout
    #[arg(short = 's', long, env = "NC2JSON_WRITE_TO_STDOUT")]
    pub write_to_stdout: bool,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, env = "NC2JSON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print a completion script for SHELL and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

impl Cli {
    /// Builds the conversion config: the config file (if any) first, then
    /// every value given on the command line or through the environment.
    ///
    /// # Errors
    ///
    /// Fails if the config file cannot be loaded or the merged configuration
    /// does not validate.
    pub fn to_config(&self) -> Nc2JsonResult<ConversionConfig> {
        let mut config = match &self.config {
            Some(path) => ConversionConfig::from_file(path)?,
            None => ConversionConfig::new(String::new()),
        };

        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if let Some(filename) = &self.json_output_filename {
            config.json_output_filename = Some(filename.clone());
        }
        if let Some(directory) = &self.json_output_directory {
            config.json_output_directory = directory.clone();
        }
        if self.write_to_stdout {
            config.write_to_stdout = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Writes the completion script for `shell` to `out`.
pub fn write_completions<W: Write>(shell: Shell, out: &mut W) -> Nc2JsonResult<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, out);
    out.flush().map_err(Nc2JsonError::Io)
}
