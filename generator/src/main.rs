use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use fakegen::diag::GenError;
use fakegen::pass::PassId;
use fakegen::pipeline::{self, Options, Provenance, SourceMode};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EmitStage {
    /// Rendered Go source of the double
    Go,
    /// Parsed declaration tree (debug form)
    Ast,
    /// Flattened method set as JSON
    Signatures,
    /// Synthesized declaration tree (debug form)
    Fake,
    /// Source hash and generator version as JSON
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "fakegen",
    version,
    about = "Generates concurrency-safe Go test doubles from interface declarations"
)]
struct Cli {
    /// Go source file declaring the interface
    source: PathBuf,

    /// Interface to fake
    #[arg(short, long)]
    interface: Option<String>,

    /// Fake the pointer-receiver methods of this struct instead of an interface
    #[arg(long, conflicts_with = "interface")]
    record: Option<String>,

    /// Name of the generated type (default: Fake<Name>)
    #[arg(long)]
    record_name: Option<String>,

    /// Receiver name for generated methods (default: first letter of the type)
    #[arg(long)]
    receiver: Option<String>,

    /// Package clause of the output (default: the source's package)
    #[arg(short, long)]
    package: Option<String>,

    /// Keep source parameter names where they are usable
    #[arg(long)]
    preserve_param_names: bool,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Go)]
    emit: EmitStage,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log pass boundaries to stderr
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            interface_name: self.interface.clone(),
            record_name: self.record_name.clone(),
            receiver_name: self.receiver.clone(),
            package_name: self.package.clone(),
            preserve_param_names: self.preserve_param_names,
            source: match &self.record {
                Some(name) => SourceMode::Record(name.clone()),
                None => SourceMode::Interface,
            },
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        Some(EnvFilter::new("fakegen=debug"))
    } else {
        EnvFilter::try_from_env("FAKEGEN_LOG").ok()
    };
    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}

fn report(err: &GenError, source: &str) {
    for diag in err.to_diagnostics() {
        eprintln!("fakegen: {}", diag.display_with_source(source));
    }
}

/// Why no output was produced.
#[derive(Debug, thiserror::Error)]
enum Failure {
    /// The source or options are at fault.
    #[error(transparent)]
    Gen(#[from] GenError),
    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

impl Failure {
    fn exit_status(&self) -> u8 {
        match self {
            Failure::Gen(_) => 1,
            Failure::Json(_) => 2,
        }
    }
}

/// Produce the text for the requested `--emit` stage.
fn produce(cli: &Cli, source: &str) -> Result<String, Failure> {
    let options = cli.options();
    match cli.emit {
        EmitStage::Go => Ok(pipeline::generate(source, &options)?.code),
        EmitStage::Ast => Ok(format!("{:#?}\n", pipeline::parse_source(source)?)),
        EmitStage::Signatures => {
            let artifacts = pipeline::run_pipeline(source, &options, PassId::Resolve)?;
            Ok(serde_json::to_string_pretty(&artifacts.interface)? + "\n")
        }
        EmitStage::Fake => {
            let artifacts = pipeline::run_pipeline(source, &options, PassId::Synthesize)?;
            Ok(format!("{:#?}\n", artifacts.fake))
        }
        EmitStage::BuildInfo => Ok(Provenance::compute(source).build_info_json()?),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!(source = %cli.source.display(), emit = ?cli.emit, "starting");

    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("fakegen: error: {}: {}", cli.source.display(), e);
            return ExitCode::from(2);
        }
    };

    let output = match produce(&cli, &source) {
        Ok(output) => output,
        Err(failure) => {
            match &failure {
                Failure::Gen(err) => report(err, &source),
                Failure::Json(err) => eprintln!("fakegen: error: {err}"),
            }
            return ExitCode::from(failure.exit_status());
        }
    };

    // Nothing is written unless every pass succeeded.
    let written = match &cli.output {
        Some(path) => std::fs::write(path, &output).map_err(|e| format!("{}: {}", path.display(), e)),
        None => std::io::stdout()
            .lock()
            .write_all(output.as_bytes())
            .map_err(|e| format!("stdout: {e}")),
    };
    if let Err(msg) = written {
        eprintln!("fakegen: error: {msg}");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_failures_are_output_errors() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let failure = Failure::from(json);
        assert_eq!(failure.exit_status(), 2);
        assert!(failure.to_string().starts_with("cannot serialize output: "));

        let input = Failure::from(GenError::MissingInterfaceName);
        assert_eq!(input.exit_status(), 1);
        assert_eq!(input.to_string(), "no interface name given");
    }
}
