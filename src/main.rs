//! Release Lane CLI
//!
//! Entry point for the `release-lane` command-line tool.

use clap::{Args, Parser, Subcommand};
use release_lane::summary::ExitCode;
use release_lane::{
    artifact_name, compose_notes, BuildIdentity, BuildRequest, CommandPackager, EffectiveConfig,
    GhCliHost, GitGateway, NotesInput, PartialIdentity, Pipeline,
};
use release_provenance::{verify_artifact, AttestationRecord, VerificationLinks};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "release-lane")]
#[command(about = "Build, fingerprint, attest, tag and publish a release", version)]
struct Cli {
    /// Repository root (paths in the config are relative to it)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Repo config file; must exist (default: <root>/.release/lane.toml, if present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Configuration overrides as a JSON object, merged last
    #[arg(long, global = true, value_name = "JSON")]
    set: Option<String>,

    /// Log progress (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log everything (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the release pipeline
    Release {
        #[command(flatten)]
        request: RequestArgs,

        /// Print the plan as JSON without building, tagging or publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the artifact name derived from a release tag
    Name {
        tag: String,
    },

    /// Preview release notes
    Notes {
        /// Use the beta header
        #[arg(long)]
        beta: bool,

        /// Custom notes text
        #[arg(long, default_value = "")]
        notes: String,

        /// SHA-256 to show in the footer
        #[arg(long, default_value = "<sha256>")]
        sha256: String,

        /// Build log link to show in the footer
        #[arg(long, default_value = "<run-url>")]
        run_url: String,
    },

    /// Check an artifact against its checksum manifest and attestation
    Verify {
        artifact: PathBuf,

        #[arg(long)]
        checksums: PathBuf,

        #[arg(long)]
        attestation: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Args)]
struct RequestArgs {
    /// Release tag, e.g. v2.3-beta
    #[arg(long)]
    tag: String,

    /// Release name (title)
    #[arg(long)]
    name: String,

    /// Publish as a prerelease
    #[arg(long)]
    beta: bool,

    /// Custom release notes
    #[arg(long, conflicts_with = "notes_file")]
    notes: Option<String>,

    /// Read custom release notes from a file
    #[arg(long)]
    notes_file: Option<PathBuf>,

    /// Source revision (default: GITHUB_SHA, then the checked-out HEAD)
    #[arg(long)]
    revision: Option<String>,

    /// Invoking actor (default: GITHUB_ACTOR)
    #[arg(long)]
    actor: Option<String>,

    /// Repository as owner/name (default: GITHUB_REPOSITORY)
    #[arg(long)]
    repository: Option<String>,

    /// Workflow run id (default: GITHUB_RUN_ID, else a local id)
    #[arg(long)]
    run_id: Option<String>,

    /// Workflow run number (default: GITHUB_RUN_NUMBER)
    #[arg(long)]
    run_number: Option<String>,

    /// Workflow name (default: GITHUB_WORKFLOW)
    #[arg(long)]
    workflow: Option<String>,

    /// Git ref (default: GITHUB_REF)
    #[arg(long = "ref")]
    git_ref: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(ExitCode::Config.as_i32());
        }
    };

    match &cli.command {
        Commands::Release { request, dry_run } => run_release(&cli.root, &config, request, *dry_run),
        Commands::Name { tag } => run_name(&config, tag),
        Commands::Notes {
            beta,
            notes,
            sha256,
            run_url,
        } => run_notes(&config, *beta, notes, sha256, run_url),
        Commands::Verify {
            artifact,
            checksums,
            attestation,
        } => run_verify(artifact, checksums, attestation),
        Commands::Config => run_config(&config),
    }
}

fn init_tracing(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, String> {
    let overrides = match &cli.set {
        Some(json) => {
            let value: serde_json::Value =
                serde_json::from_str(json).map_err(|e| format!("--set is not valid JSON: {}", e))?;
            if !value.is_object() {
                return Err("--set must be a JSON object".to_string());
            }
            Some(value)
        }
        None => None,
    };

    debug!(root = %cli.root.display(), config = ?cli.config, "loading configuration");
    EffectiveConfig::load(&cli.root, cli.config.as_deref(), overrides).map_err(|e| e.to_string())
}

fn exit_invalid_request(message: impl std::fmt::Display) -> ! {
    eprintln!("Invalid request: {}", message);
    process::exit(ExitCode::InvalidRequest.as_i32());
}

fn build_request(root: &Path, config: &EffectiveConfig, args: &RequestArgs) -> BuildRequest {
    let lane = config.lane();

    let cli_identity = PartialIdentity {
        revision: args.revision.clone(),
        actor: args.actor.clone(),
        repository: args.repository.clone(),
        run_id: args.run_id.clone(),
        run_number: args.run_number.clone(),
        workflow: args.workflow.clone(),
        git_ref: args.git_ref.clone(),
        server_url: None,
    };
    let mut partial = BuildIdentity::from_env().overlay(cli_identity);

    if partial.revision.is_none() {
        match GitGateway::new(&lane.vcs, root).head_revision() {
            Ok(head) => {
                info!(revision = %head, "using checked-out HEAD as the source revision");
                partial.revision = Some(head);
            }
            Err(e) => debug!(error = %e, "could not read HEAD"),
        }
    }

    let identity = partial
        .complete(&lane.host.workflow, &lane.host.server_url)
        .unwrap_or_else(|e| exit_invalid_request(e));

    let notes = match &args.notes_file {
        Some(path) => Some(
            fs::read_to_string(path)
                .unwrap_or_else(|e| exit_invalid_request(format!("{}: {}", path.display(), e))),
        ),
        None => args.notes.clone(),
    };

    BuildRequest::new(&args.tag, &args.name, args.beta, notes, identity)
        .unwrap_or_else(|e| exit_invalid_request(e))
}

fn run_release(root: &Path, config: &EffectiveConfig, args: &RequestArgs, dry_run: bool) {
    let request = build_request(root, config, args);
    let lane = config.lane();

    let packager = CommandPackager::new(lane.packager.clone());
    let gateway = GitGateway::new(&lane.vcs, root);
    let host = GhCliHost::new(&lane.host, root);
    let pipeline = Pipeline::new(lane, root, &packager, &gateway, &host);

    if dry_run {
        let plan = pipeline.plan(&request);
        match serde_json::to_string_pretty(&plan) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing plan: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    match pipeline.run(&request) {
        Ok(outcome) => {
            println!("Released {} ({})", request.tag(), outcome.release.url);
            println!("  Artifact: {}", outcome.artifact.file_name());
            println!("  SHA256:   {}", outcome.fingerprints.sha256());
            println!("  MD5:      {}", outcome.fingerprints.md5());
        }
        Err(e) => {
            eprintln!("Release failed: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run_name(config: &EffectiveConfig, tag: &str) {
    if !release_lane::request::is_valid_tag(tag) {
        exit_invalid_request(format!("'{}' is not a version tag", tag));
    }
    println!("{}", artifact_name(&config.lane().product, tag));
}

fn run_notes(config: &EffectiveConfig, beta: bool, notes: &str, sha256: &str, run_url: &str) {
    let publish = &config.lane().publish;
    let composed = compose_notes(
        &NotesInput {
            beta,
            custom: notes,
            sha256,
            run_url,
            checksum_file: &publish.checksum_file,
            attestation_file: &publish.attestation_file,
        },
        &config.lane().notes,
    );
    print!("{}", composed.as_str());
}

fn run_verify(artifact: &Path, checksums: &Path, attestation: &Path) {
    let checksum_text = fs::read_to_string(checksums).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", checksums.display(), e);
        process::exit(1);
    });
    let record = AttestationRecord::from_file(attestation).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", attestation.display(), e);
        process::exit(1);
    });

    match verify_artifact(artifact, &checksum_text, &record) {
        Ok(report) => {
            println!("{}", report.summary());
            for error in &report.errors {
                println!("  - {}", error);
            }
            let links: &VerificationLinks = &record.verification;
            println!("  Build logs: {}", links.workflow_url);
            println!("  Commit:     {}", links.commit_url);
            if !report.passed {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Verification error: {}", e);
            process::exit(1);
        }
    }
}

fn run_config(config: &EffectiveConfig) {
    match config.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            process::exit(1);
        }
    }
}
