use std::path::PathBuf;
use std::process::exit;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use easy_kcl::launch::{self, DaemonCommand};

/// Assembles the classpath for the Amazon KCL MultiLangDaemon and runs it.
#[derive(Parser)]
#[command(name = "launch_multilang_daemon")]
struct Args {
    /// Path to the java executable.
    #[arg(short, long)]
    java: Option<PathBuf>,

    /// Path to the MultiLangDaemon properties file.
    #[arg(short, long, visible_alias = "props")]
    properties: Option<PathBuf>,

    /// Directory holding the KCL jars.
    #[arg(long, env = "KCL_JAR_DIR")]
    jar_dir: PathBuf,

    /// java.util.logging properties file for the daemon.
    #[arg(short = 'l', long)]
    java_loglevel_properties: Option<PathBuf>,

    /// Generate the properties file from KCL_-prefixed environment variables
    /// before launching.
    #[arg(long)]
    generate_properties: bool,

    /// Additional classpath entry, may be given any number of times.
    #[arg(short = 'c', long = "path")]
    paths: Vec<PathBuf>,

    /// Print the daemon command line without executing it.
    #[arg(long)]
    print_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    if args.generate_properties {
        let properties = args
            .properties
            .as_deref()
            .context("--generate-properties requires --properties")?;
        let count = launch::generate_properties_from_env(properties)
            .with_context(|| format!("failed to write {}", properties.display()))?;
        info!(
            properties = %properties.display(),
            count, "generated properties file from the environment"
        );
    }

    let (java, properties) = match (args.java, args.properties) {
        (Some(java), Some(properties)) => (java, properties),
        _ => bail!("must provide --java and --properties"),
    };

    let command = DaemonCommand {
        java,
        jar_dir: args.jar_dir,
        properties,
        java_loglevel_properties: args.java_loglevel_properties,
        extra_paths: args.paths,
    };
    let argv = command.argv()?;
    println!("{}", argv.join(" "));

    if !args.print_only {
        let status = tokio::process::Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .await
            .with_context(|| format!("failed to launch {}", argv[0]))?;
        exit(status.code().unwrap_or(1));
    }
    Ok(())
}
