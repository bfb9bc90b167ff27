// pipeline.rs — Generation options and pass orchestration
//
// Runs parse → resolve → synthesize → render for one source text, stopping
// at the terminal pass an `--emit` stage asks for.
//
// Preconditions: `Options` names an interface (interface mode) or a struct
//                (record mode).
// Postconditions: every artifact up to the terminal pass is populated.
// Failure modes: the first `GenError` any pass reports; nothing partial is
//                returned.
// Side effects: `tracing` events per pass.

use std::time::Instant;

use serde::Serialize;

use crate::ast::SourceFile;
use crate::diag::{GenError, SyntaxError};
use crate::fake_ast::FakeFile;
use crate::pass::{descriptor, required_passes, PassId};
use crate::render::{render, RenderOptions};
use crate::resolve::{resolve, resolve_record, InterfaceDecl, Naming, ParamNaming, Resolution};
use crate::synth::{synthesize, SynthOptions};

/// Package used when neither the options nor the source name one.
pub const DEFAULT_PACKAGE: &str = "fakes";

// ── Configuration ──────────────────────────────────────────────────────────

/// What the method set is taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceMode {
    /// The interface named by `Options::interface_name`.
    #[default]
    Interface,
    /// The pointer-receiver methods of the named struct.
    Record(String),
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub interface_name: Option<String>,
    /// Defaults to `Fake<Name>`.
    pub record_name: Option<String>,
    /// Defaults to the lower-cased first character of the record name.
    pub receiver_name: Option<String>,
    /// Defaults to the source file's package, else `fakes`.
    pub package_name: Option<String>,
    pub preserve_param_names: bool,
    pub source: SourceMode,
}

impl Options {
    pub fn for_interface(name: impl Into<String>) -> Self {
        Options {
            interface_name: Some(name.into()),
            ..Options::default()
        }
    }

    pub fn for_record(name: impl Into<String>) -> Self {
        Options {
            source: SourceMode::Record(name.into()),
            ..Options::default()
        }
    }

    fn naming(&self) -> Naming {
        Naming {
            params: if self.preserve_param_names {
                ParamNaming::Preserve
            } else {
                ParamNaming::Positional
            },
            record_name: non_empty(&self.record_name),
            receiver_name: non_empty(&self.receiver_name),
        }
    }

    fn package_for(&self, file: &SourceFile) -> String {
        non_empty(&self.package_name)
            .or_else(|| file.package.as_ref().map(|p| p.name.clone()))
            .unwrap_or_else(|| DEFAULT_PACKAGE.to_string())
    }
}

/// An empty string is the same as an unset option.
fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

// ── Provenance ─────────────────────────────────────────────────────────────

/// Where a generated file came from.
///
/// `source_hash`: hex SHA-256 of the raw source text.
/// `generator_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub source_hash: String,
    pub generator_version: &'static str,
}

impl Provenance {
    pub fn compute(source: &str) -> Self {
        use sha2::{Digest, Sha256};

        let digest = Sha256::digest(source.as_bytes());
        let mut source_hash = String::with_capacity(64);
        for b in digest {
            use std::fmt::Write;
            let _ = write!(source_hash, "{:02x}", b);
        }
        Provenance {
            source_hash,
            generator_version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Pretty JSON for `--emit build-info`.
    pub fn build_info_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

// ── Artifacts ──────────────────────────────────────────────────────────────

/// Everything a run up to some terminal pass produced.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub file: SourceFile,
    pub provenance: Provenance,
    pub interface: Option<InterfaceDecl>,
    pub fake: Option<FakeFile>,
    pub code: Option<String>,
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct Generated {
    pub interface: InterfaceDecl,
    pub fake: FakeFile,
    pub code: String,
    pub provenance: Provenance,
}

// ── Passes ─────────────────────────────────────────────────────────────────

/// Parse `source`, turning lexer and parser errors into `GenError::Parse`.
pub fn parse_source(source: &str) -> Result<SourceFile, GenError> {
    let started = Instant::now();
    let result = crate::parser::parse(source);
    if !result.errors.is_empty() {
        let errors = result
            .errors
            .iter()
            .map(|e| SyntaxError {
                span: *e.span(),
                message: e.to_string(),
            })
            .collect();
        return Err(GenError::Parse { errors });
    }
    let file = result.file.ok_or(GenError::Parse { errors: Vec::new() })?;
    tracing::debug!(
        decls = file.decls.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "parse complete"
    );
    Ok(file)
}

fn timed<T>(pass: PassId, run: impl FnOnce() -> Result<T, GenError>) -> Result<T, GenError> {
    let started = Instant::now();
    let result = run();
    let name = descriptor(pass).name;
    match &result {
        Ok(_) => tracing::debug!(
            pass = name,
            elapsed_us = started.elapsed().as_micros() as u64,
            "pass complete"
        ),
        Err(e) => tracing::debug!(pass = name, error = %e, "pass failed"),
    }
    result
}

fn resolve_source(file: &SourceFile, options: &Options) -> Result<Resolution, GenError> {
    let naming = options.naming();
    match &options.source {
        SourceMode::Interface => {
            let name = options
                .interface_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .ok_or(GenError::MissingInterfaceName)?;
            resolve(file, name, &naming)
        }
        SourceMode::Record(name) => resolve_record(file, name, &naming),
    }
}

fn synth_options(file: &SourceFile, options: &Options) -> SynthOptions {
    SynthOptions {
        package: options.package_for(file),
        source_imports: file.imports.clone(),
    }
}

/// Run the passes needed for `terminal`.
pub fn run_pipeline(source: &str, options: &Options, terminal: PassId) -> Result<Artifacts, GenError> {
    let passes = required_passes(terminal);
    let file = parse_source(source)?;
    let mut artifacts = Artifacts {
        provenance: Provenance::compute(source),
        interface: None,
        fake: None,
        code: None,
        file,
    };

    let resolution = timed(PassId::Resolve, || resolve_source(&artifacts.file, options))?;
    artifacts.interface = Some(resolution.interface.clone());
    if !passes.contains(&PassId::Synthesize) {
        return Ok(artifacts);
    }

    let synth = synth_options(&artifacts.file, options);
    let fake = timed(PassId::Synthesize, || Ok(synthesize(resolution, &synth)))?;
    if passes.contains(&PassId::Render) {
        let render_options = RenderOptions {
            source_hash: Some(artifacts.provenance.source_hash.clone()),
        };
        artifacts.code = Some(timed(PassId::Render, || Ok(render(&fake, &render_options)))?);
    }
    artifacts.fake = Some(fake);
    Ok(artifacts)
}

/// Generate the double for `source` end to end.
pub fn generate(source: &str, options: &Options) -> Result<Generated, GenError> {
    let artifacts = run_pipeline(source, options, PassId::Render)?;
    let (Some(interface), Some(fake), Some(code)) = (artifacts.interface, artifacts.fake, artifacts.code) else {
        unreachable!("the render pass populates every artifact")
    };
    tracing::debug!(
        interface = %interface.name,
        methods = interface.methods.len(),
        bytes = code.len(),
        "generation complete"
    );
    Ok(Generated {
        interface,
        fake,
        code,
        provenance: artifacts.provenance,
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────
