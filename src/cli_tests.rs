//! # CLI Integration Tests
//!
//! Tests for the command-line interface: argument parsing, environment
//! variable bindings, config-file merging and completion generation.

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use clap_complete::Shell;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::cli::{write_completions, Cli};
    use crate::error::Nc2JsonError;

    /// Test basic CLI argument parsing
    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["nc2json", "--help"]);
        assert!(result.is_err()); // --help causes early exit with "error"

        let error = result.unwrap_err();
        assert!(error.to_string().contains("nc2json reads a netCDF archive"));
    }

    /// Test version argument
    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["nc2json", "--version"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_only() {
        let cli = Cli::parse_from(["nc2json", "sea017_20230613_R.nc"]);

        assert_eq!(cli.source, Some("sea017_20230613_R.nc".to_string()));
        assert_eq!(cli.json_output_filename, None);
        assert_eq!(cli.json_output_directory, None);
        assert!(!cli.write_to_stdout);
        assert!(!cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::parse_from([
            "nc2json",
            "https://co.ifremer.fr/sea017_20230613_R.nc",
            "-o",
            "summary.json",
            "-d",
            "out",
            "-s",
            "-v",
        ]);

        assert_eq!(cli.json_output_filename, Some("summary.json".to_string()));
        assert_eq!(cli.json_output_directory, Some("out".to_string()));
        assert!(cli.write_to_stdout);
        assert!(cli.verbose);
    }

    #[test]
    fn test_long_flags() {
        let cli = Cli::parse_from([
            "nc2json",
            "--json-output-directory",
            "json",
            "--write-to-stdout",
            "--quiet",
            "data.nc",
        ]);

        assert_eq!(cli.source, Some("data.nc".to_string()));
        assert_eq!(cli.json_output_directory, Some("json".to_string()));
        assert!(cli.write_to_stdout);
        assert!(cli.quiet);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Cli::try_parse_from(["nc2json", "data.nc", "--verbose", "--quiet"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_bindings() {
        let command = Cli::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(|env| env.to_string_lossy().into_owned())
        };

        assert_eq!(env_of("source").as_deref(), Some("NC2JSON_SOURCE"));
        assert_eq!(env_of("json_output_filename").as_deref(), Some("NC2JSON_OUTPUT_FILENAME"));
        assert_eq!(env_of("json_output_directory").as_deref(), Some("NC2JSON_OUTPUT_DIRECTORY"));
        assert_eq!(env_of("write_to_stdout").as_deref(), Some("NC2JSON_WRITE_TO_STDOUT"));
        assert_eq!(env_of("config").as_deref(), Some("NC2JSON_CONFIG"));
    }

    #[test]
    fn test_completions_without_source() {
        let cli = Cli::parse_from(["nc2json", "--completions", "bash"]);
        assert_eq!(cli.completions, Some(Shell::Bash));
        assert_eq!(cli.source, None);
    }

    #[test]
    fn test_write_completions() -> Result<(), Box<dyn std::error::Error>> {
        let mut script = Vec::new();
        write_completions(Shell::Bash, &mut script)?;

        let script = String::from_utf8(script)?;
        assert!(script.contains("nc2json"));
        assert!(script.contains("--json-output-filename"));
        Ok(())
    }

    #[test]
    fn test_to_config_from_arguments() -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::parse_from([
            "nc2json",
            "https://co.ifremer.fr/co/ego/ego/v2/sea017/sea017_20230613/sea017_20230613_R.nc",
            "-d",
            "out",
        ]);
        let config = cli.to_config()?;

        assert_eq!(config.output_path(), PathBuf::from("out/sea017_20230613_R.nc.json"));
        assert!(!config.write_to_stdout);
        Ok(())
    }

    #[test]
    fn test_cli_overrides_config_file() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("job.yaml");
        fs::write(
            &config_path,
            "source: from_file.nc\njson_output_directory: file_dir\nbounding_box:\n  time_variable: GPS_TIME\n",
        )?;

        let cli = Cli::parse_from([
            "nc2json",
            "--config",
            config_path.to_str().unwrap(),
            "from_cli.nc",
            "-s",
        ]);
        let config = cli.to_config()?;

        assert_eq!(config.source, "from_cli.nc");
        assert_eq!(config.json_output_directory, "file_dir");
        assert_eq!(config.bounding_box.time_variable, "GPS_TIME");
        assert!(config.write_to_stdout);
        Ok(())
    }

    #[test]
    fn test_config_file_supplies_source() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("job.json");
        fs::write(&config_path, r#"{"source": "glider.nc", "json_output_filename": "g.json"}"#)?;

        let cli = Cli::parse_from(["nc2json", "-c", config_path.to_str().unwrap()]);
        let config = cli.to_config()?;

        assert_eq!(config.source, "glider.nc");
        assert_eq!(config.output_path(), PathBuf::from("g.json"));
        Ok(())
    }

    #[test]
    fn test_config_without_source_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("job.json");
        fs::write(&config_path, r#"{"json_output_directory": "out"}"#)?;

        let cli = Cli::parse_from(["nc2json", "-c", config_path.to_str().unwrap()]);
        assert!(matches!(cli.to_config(), Err(Nc2JsonError::Config(_))));
        Ok(())
    }
}
