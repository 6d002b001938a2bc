//! CLI subcommands — init, validate, synth, graph.

use crate::core::{parser, stack, synth, types};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new molde project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate molde.yaml without synthesizing
    Validate {
        /// Path to molde.yaml
        #[arg(short, long, default_value = "molde.yaml")]
        file: PathBuf,
    },

    /// Synthesize the CloudFormation template
    Synth {
        /// Path to molde.yaml
        #[arg(short, long, default_value = "molde.yaml")]
        file: PathBuf,

        /// Where to write the template
        #[arg(short, long, default_value = "template.json")]
        output: PathBuf,

        /// Print the template to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },

    /// Show construction order and resource dependencies
    Graph {
        /// Path to molde.yaml
        #[arg(short, long, default_value = "molde.yaml")]
        file: PathBuf,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Synth {
            file,
            output,
            stdout,
        } => cmd_synth(&file, &output, stdout),
        Commands::Graph { file } => cmd_graph(&file),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("molde.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    let template = r#"stack_name: cloudformation-stack
account: "123456789012"
region: us-west-1

repository: my_ecr_repo
image_tag: hello-world-image

bucket_arn: arn:aws:s3:::my-s3-bucket/*
secret_arn: arn:aws:secretsmanager:us-east-1:123456789012:secret:my-secret-GH69Bf4

network:
  cidr: 10.0.0.0/16
  max_azs: 2

compute:
  max_vcpus: 2
  instance_types: [m5.xlarge, m5.2xlarge, m5.4xlarge]
  allocation_strategy: best_fit_progressive
  volume_size_gib: 50
  launch_template_name: my-launch-template

job:
  command: [python, hello_world.py]
  vcpus: 4
  memory_mib: 8192
  queue_priority: 1
"#;
    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized molde project at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);

    if errors.is_empty() {
        println!(
            "OK: {} ({} in {})",
            config.stack_name, config.account, config.region
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse and validate a molde config file, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<types::StackConfig, String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

fn cmd_synth(file: &Path, output: &Path, to_stdout: bool) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let template = synth::synthesize(&config).map_err(|e| e.to_string())?;
    let json = template.to_json_pretty()?;

    if to_stdout {
        println!("{}", json);
        return Ok(());
    }

    std::fs::write(output, json)
        .map_err(|e| format!("cannot write {}: {}", output.display(), e))?;

    println!(
        "Synthesized {} resources to {}",
        template.resource_count(),
        output.display()
    );
    println!("  Digest: {}", template.digest());
    Ok(())
}

fn cmd_graph(file: &Path) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let graph = stack::build_stack(&config).map_err(|e| e.to_string())?;

    println!("Construction order: {} resources", graph.len());
    for (id, targets) in graph.dependencies() {
        if targets.is_empty() {
            println!("  {}", id);
        } else {
            println!("  {} -> {}", id, targets.join(", "));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let config_path = dir.path().join("molde.yaml");
        assert!(config_path.exists());
        cmd_validate(&config_path).unwrap();
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let err = cmd_init(dir.path()).unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_init_config_matches_defaults() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let written = parser::parse_config_file(&dir.path().join("molde.yaml")).unwrap();
        let defaults = types::StackConfig::default();
        assert_eq!(written.account, defaults.account);
        assert_eq!(written.secret_arn, defaults.secret_arn);
        assert_eq!(written.compute.instance_types, defaults.compute.instance_types);
        assert_eq!(written.job.memory_mib, defaults.job.memory_mib);
    }

    #[test]
    fn test_validate_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("molde.yaml");
        std::fs::write(&config_path, "account: \"nope\"\n").unwrap();
        let err = cmd_validate(&config_path).unwrap_err();
        assert!(err.contains("validation error"));
    }

    #[test]
    fn test_validate_missing_file() {
        let err = cmd_validate(Path::new("/nonexistent/molde.yaml")).unwrap_err();
        assert!(err.contains("failed to read"));
    }

    #[test]
    fn test_synth_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let config_path = dir.path().join("molde.yaml");
        let output = dir.path().join("template.json");
        cmd_synth(&config_path, &output, false).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        let template: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(template["Resources"].as_object().unwrap().len(), 26);
    }

    #[test]
    fn test_synth_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("molde.yaml");
        std::fs::write(&config_path, "job:\n  command: []\n").unwrap();
        let err = cmd_synth(&config_path, &dir.path().join("out.json"), false).unwrap_err();
        assert_eq!(err, "validation failed");
        assert!(!dir.path().join("out.json").exists());
    }

    #[test]
    fn test_graph_command_runs() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        cmd_graph(&dir.path().join("molde.yaml")).unwrap();
    }

    #[test]
    fn test_dispatch_validate() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        dispatch(Commands::Validate {
            file: dir.path().join("molde.yaml"),
        })
        .unwrap();
    }
}
