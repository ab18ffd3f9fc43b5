use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use hconfig_core::{apply_tags, format_json, parse_file, render, write, write_file, Host};
use hconfig_remediation::platform::{
    load_builtin_with_source, load_files_with_source, load_role_with_source, load_tag_rules,
    Platform,
};
use hconfig_remediation::report::{render_remediation, render_summary, render_tree};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;

use cli::{Cli, Command, FutureArgs, InspectArgs, OutputFormat, PlatformArgs, RemediateArgs};

#[derive(Serialize)]
struct RemediateReport<'a> {
    changed: bool,
    response: &'a str,
    remediation: serde_json::Value,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    match cli.command {
        Command::Remediate(args) => run_remediate(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Future(args) => run_future(args),
    }
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}

fn run_remediate(args: RemediateArgs) -> Result<()> {
    let mut host = load_host(
        &args.hostname,
        &args.platform,
        &args.running_config,
        &args.compiled_config,
    )?;
    let remediation = host
        .filter_remediation(&args.config_tags, &args.exclude_tags)
        .with_context(|| format!("failed to generate remediation for {}", args.hostname))?;

    let lines = render(&remediation);
    let changed = !lines.is_empty();
    let mut response = lines.join("\n");
    if changed {
        response.push('\n');
    }
    fs::write(&args.remediation_config, &response).with_context(|| {
        format!(
            "failed to write remediation file {}",
            args.remediation_config.display()
        )
    })?;
    info!(
        hostname = %args.hostname,
        changed,
        lines = lines.len(),
        path = %args.remediation_config.display(),
        "wrote remediation"
    );

    match args.format {
        OutputFormat::Json => {
            let report = RemediateReport {
                changed,
                response: &response,
                remediation: serde_json::from_str(&format_json(&remediation))?,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("changed={changed}");
            if args.summary {
                println!("{}", render_summary(&remediation));
            } else if changed {
                println!("{}", render_remediation(&remediation));
            }
        }
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let platform = load_platform(&args.platform)?;
    let mut tree = parse_file(&args.file, &platform.options)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    apply_tags(&mut tree, &platform.tag_rules);

    print!("{}", render_tree(&tree, args.depth));
    Ok(())
}

fn run_future(args: FutureArgs) -> Result<()> {
    let mut host = load_host(
        &args.hostname,
        &args.platform,
        &args.running_config,
        &args.compiled_config,
    )?;
    let projected = host
        .future_config()
        .with_context(|| format!("failed to project configuration for {}", args.hostname))?;

    if let Some(path) = &args.output {
        write_file(&projected, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    print!("{}", write(&projected));
    Ok(())
}

fn load_host(
    hostname: &str,
    platform: &PlatformArgs,
    running: &Path,
    compiled: &Path,
) -> Result<Host> {
    let platform = load_platform(platform)?;
    let mut host = Host::new(hostname, platform.options);
    host.load_tags(platform.tag_rules);

    let raw = read_config(running)?;
    host.load_running(&raw)
        .with_context(|| format!("failed to parse {}", running.display()))?;
    let raw = read_config(compiled)?;
    host.load_compiled(&raw)
        .with_context(|| format!("failed to parse {}", compiled.display()))?;
    Ok(host)
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("error opening {}", path.display()))
}

fn load_platform(args: &PlatformArgs) -> Result<Platform> {
    let (mut platform, source) = if let Some(role) = &args.os_role {
        load_role_with_source(&args.roles_dir, role)?
    } else if let Some(options) = &args.options {
        load_files_with_source(options, args.tags.as_deref())?
    } else if let Some(builtin) = args.platform {
        load_builtin_with_source(builtin.name())?
    } else {
        (Platform::default(), "default".to_string())
    };

    if args.options.is_none() {
        if let Some(tags) = &args.tags {
            platform.tag_rules = load_tag_rules(tags)?;
        }
    }
    info!(
        source = %source,
        tag_rules = platform.tag_rules.len(),
        "loaded platform definitions"
    );
    Ok(platform)
}
