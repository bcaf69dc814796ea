//! # Test runs
//!
//! A [`TestRun`] owns the emission sequencer for its whole lifetime and
//! hands out [`TestStep`]s that share it.
//!
//! ```rust,ignore
//! let run = TestRun::new("mlc_test", "1.0");
//! let dut = Dut::new("dut0");
//! run.scope(&dut, |run| {
//!     run.add_step("check").scope(|step| {
//!         step.add_measurement(Measurement::new("temp", 42.5).with_unit("C"))?;
//!         Ok(())
//!     })
//! })?;
//! ```

use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};

use ocptv_core::{
    Error, Log, LogSeverity, Metadata, RunArtifact, RunEnd, RunStart, SoftwareInfo, TestResult,
    TestStatus,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::dut::Dut;
use crate::emitter::ArtifactEmitter;
use crate::error::{OutputError, ScopeError};
use crate::scope::UnwindGuard;
use crate::source::SourceLocation;
use crate::step::TestStep;

/// Optional fields of an error artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorDetails {
    pub message: Option<String>,
    /// Software components causally related to the error.
    pub software_infos: Vec<SoftwareInfo>,
    pub source_location: SourceLocation,
}

impl ErrorDetails {
    /// Details with no message, no software and the caller's location.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Add a causally related software component.
    pub fn software_info(mut self, info: SoftwareInfo) -> Self {
        self.software_infos.push(info);
        self
    }

    pub fn source_location(mut self, location: SourceLocation) -> Self {
        self.source_location = location;
        self
    }

    pub(crate) fn into_record(self, symptom: String, caller: &Location<'_>) -> Error {
        Error {
            symptom,
            message: self.message,
            software_infos: self.software_infos,
            source_location: self.source_location.resolve(caller),
        }
    }
}

/// Builder for [`TestRun`].
#[derive(Debug, Clone)]
pub struct TestRunBuilder {
    name: String,
    version: String,
    command_line: Option<String>,
    parameters: Metadata,
    config: Option<Config>,
}

impl TestRunBuilder {
    /// Defaults to the process arguments after the program name.
    pub fn command_line(mut self, command_line: impl Into<String>) -> Self {
        self.command_line = Some(command_line.into());
        self
    }

    /// Replace all parameters.
    pub fn parameters(mut self, parameters: Metadata) -> Self {
        self.parameters = parameters;
        self
    }

    /// Add one parameter.
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Defaults to [`Config::global`].
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Create the run and its emitter.
    pub fn build(self) -> TestRun {
        let config = self.config.unwrap_or_else(|| Config::global().clone());
        let command_line = self.command_line.unwrap_or_else(process_command_line);
        TestRun {
            name: self.name,
            version: self.version,
            command_line,
            parameters: self.parameters,
            emitter: Arc::new(ArtifactEmitter::new(config)),
            next_step: Mutex::new(0),
        }
    }
}

fn process_command_line() -> String {
    std::env::args().skip(1).collect::<Vec<_>>().join(" ")
}

/// Stateful handle on one diagnostic run. All methods are thread safe.
#[derive(Debug)]
pub struct TestRun {
    name: String,
    version: String,
    command_line: String,
    parameters: Metadata,
    emitter: Arc<ArtifactEmitter>,
    next_step: Mutex<u64>,
}

impl TestRun {
    /// Run with default options writing through [`Config::global`].
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::builder(name, version).build()
    }

    /// Builder for a run with custom options.
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> TestRunBuilder {
        TestRunBuilder {
            name: name.into(),
            version: version.into(),
            command_line: None,
            parameters: Metadata::new(),
            config: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn parameters(&self) -> &Metadata {
        &self.parameters
    }

    /// Emit the run start. The DUT is snapshotted at this point.
    pub fn start(&self, dut: &Dut) -> Result<(), OutputError> {
        let start = RunStart {
            name: self.name.clone(),
            version: self.version.clone(),
            command_line: self.command_line.clone(),
            parameters: self.parameters.clone(),
            dut_info: dut.to_spec(),
        };
        self.emit(RunArtifact::Start(start))
    }

    /// Emit the run end with the given outcome.
    pub fn end(&self, status: TestStatus, result: TestResult) -> Result<(), OutputError> {
        self.emit(RunArtifact::End(RunEnd { status, result }))
    }

    /// Start the run, execute `body` and always emit the run end.
    ///
    /// | Body outcome | Run end | Returned |
    /// |--------------|---------|----------|
    /// | `Ok` | COMPLETE / PASS | `Ok` |
    /// | `Err(ScopeError::Run(signal))` | signal status / result | `Ok` |
    /// | any other `Err` | ERROR / NOT_APPLICABLE | the error |
    /// | panic | ERROR / NOT_APPLICABLE | panic resumes |
    pub fn scope<F>(&self, dut: &Dut, body: F) -> Result<(), ScopeError>
    where
        F: FnOnce(&TestRun) -> Result<(), ScopeError>,
    {
        self.start(dut)?;

        let guard = UnwindGuard::new(|| {
            self.end_quietly(TestStatus::Error, TestResult::NotApplicable);
        });
        let outcome = body(self);
        drop(guard);

        match outcome {
            Ok(()) => {
                self.end(TestStatus::Complete, TestResult::Pass)?;
                Ok(())
            }
            Err(ScopeError::Run(signal)) => {
                debug!(status = %signal.status, result = %signal.result, "run ended early");
                self.end(signal.status, signal.result)?;
                Ok(())
            }
            Err(error) => {
                self.end_quietly(TestStatus::Error, TestResult::NotApplicable);
                Err(error)
            }
        }
    }

    /// Reserve the next step ordinal. The step is not started.
    pub fn add_step(&self, name: impl Into<String>) -> TestStep {
        let ordinal = {
            let mut next_step = self.next_step.lock().unwrap_or_else(PoisonError::into_inner);
            let ordinal = *next_step;
            *next_step += 1;
            ordinal
        };
        TestStep::new(name.into(), ordinal, Arc::clone(&self.emitter))
    }

    /// Emit a run-level log located at the caller.
    #[track_caller]
    pub fn add_log(
        &self,
        severity: LogSeverity,
        message: impl Into<String>,
    ) -> Result<(), OutputError> {
        self.add_log_with(severity, message, SourceLocation::Caller)
    }

    /// Emit a run-level log with an explicit source location.
    #[track_caller]
    pub fn add_log_with(
        &self,
        severity: LogSeverity,
        message: impl Into<String>,
        source_location: SourceLocation,
    ) -> Result<(), OutputError> {
        let log = Log {
            severity,
            message: message.into(),
            source_location: source_location.resolve(Location::caller()),
        };
        self.emit(RunArtifact::Log(log))
    }

    /// Emit a run-level error located at the caller.
    #[track_caller]
    pub fn add_error(&self, symptom: impl Into<String>) -> Result<(), OutputError> {
        self.add_error_with(symptom, ErrorDetails::default())
    }

    /// Emit a run-level error with optional details.
    #[track_caller]
    pub fn add_error_with(
        &self,
        symptom: impl Into<String>,
        details: ErrorDetails,
    ) -> Result<(), OutputError> {
        let error = details.into_record(symptom.into(), Location::caller());
        self.emit(RunArtifact::Error(error))
    }

    fn emit(&self, artifact: RunArtifact) -> Result<(), OutputError> {
        self.emitter.emit(artifact).map(|_| ())
    }

    fn end_quietly(&self, status: TestStatus, result: TestResult) {
        if let Err(error) = self.end(status, result) {
            warn!(run = %self.name, %error, "could not emit test run end");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use serde_json::json;

    use super::*;
    use crate::dut::SoftwareSpec;
    use crate::error::TestRunError;
    use crate::writer::BufferWriter;

    fn run_with_buffer() -> (Arc<BufferWriter>, TestRun) {
        let buffer = Arc::new(BufferWriter::new());
        let run = TestRun::builder("test", "1.0")
            .command_line("cl")
            .config(Config::with_writer(buffer.clone()))
            .build();
        (buffer, run)
    }

    fn lines(buffer: &BufferWriter) -> Vec<Value> {
        buffer
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).expect("json"))
            .collect()
    }

    #[test]
    fn start_and_end_produce_three_lines() {
        let (buffer, run) = run_with_buffer();
        run.start(&Dut::new("dut0")).expect("start");
        run.end(TestStatus::Complete, TestResult::Pass).expect("end");

        let lines = lines(&buffer);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["sequenceNumber"], 0);
        assert_eq!(
            lines[1]["testRunArtifact"]["testRunStart"],
            json!({
                "name": "test",
                "version": "1.0",
                "commandLine": "cl",
                "parameters": {},
                "dutInfo": {
                    "dutInfoId": "dut0",
                    "platformInfos": [],
                    "softwareInfos": [],
                    "hardwareInfos": [],
                },
            })
        );
        assert_eq!(
            lines[2]["testRunArtifact"]["testRunEnd"],
            json!({ "status": "COMPLETE", "result": "PASS" })
        );
    }

    #[test]
    fn scope_signal_sets_end_outcome() {
        let (buffer, run) = run_with_buffer();
        run.scope(&Dut::new("dut0"), |_| {
            Err(TestRunError::new(TestStatus::Skip, TestResult::NotApplicable).into())
        })
        .expect("signal is consumed");

        let lines = lines(&buffer);
        assert_eq!(
            lines[2]["testRunArtifact"]["testRunEnd"],
            json!({ "status": "SKIP", "result": "NOT_APPLICABLE" })
        );
    }

    #[test]
    fn scope_propagates_foreign_errors_after_ending() {
        let (buffer, run) = run_with_buffer();
        let err = run
            .scope(&Dut::new("dut0"), |_| Err(ScopeError::other("disk on fire")))
            .expect_err("foreign error passes through");
        assert_eq!(err.to_string(), "disk on fire");

        let lines = lines(&buffer);
        assert_eq!(
            lines.last().expect("end line")["testRunArtifact"]["testRunEnd"]["status"],
            "ERROR"
        );
    }

    #[test]
    fn scope_emits_end_when_body_panics() {
        let (buffer, run) = run_with_buffer();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = run.scope(&Dut::new("dut0"), |_| panic!("body panicked"));
        }));
        assert!(result.is_err());

        let lines = lines(&buffer);
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[2]["testRunArtifact"]["testRunEnd"],
            json!({ "status": "ERROR", "result": "NOT_APPLICABLE" })
        );
    }

    #[test]
    fn log_records_caller_location() {
        let (buffer, run) = run_with_buffer();
        let line = line!() + 1;
        run.add_log(LogSeverity::Info, "hello").expect("log");

        let lines = lines(&buffer);
        let log = &lines[1]["testRunArtifact"]["log"];
        assert_eq!(log["severity"], "INFO");
        assert_eq!(log["sourceLocation"]["file"], file!());
        assert_eq!(log["sourceLocation"]["line"], line);
    }

    #[test]
    fn error_lists_related_software_ids() {
        let (buffer, run) = run_with_buffer();
        let dut = Dut::new("dut0");
        let bmc = dut.add_software_info(SoftwareSpec::new("bmc"));
        run.add_error_with(
            "no-dut",
            ErrorDetails::new()
                .message("could not find any DUT")
                .software_info(bmc)
                .source_location(SourceLocation::Omit),
        )
        .expect("error");

        let lines = lines(&buffer);
        assert_eq!(
            lines[1]["testRunArtifact"]["error"],
            json!({
                "symptom": "no-dut",
                "message": "could not find any DUT",
                "softwareInfoIds": ["dut0_0"],
            })
        );
    }

    #[test]
    fn steps_receive_increasing_ordinals() {
        let (_buffer, run) = run_with_buffer();
        let ids: Vec<String> = (0..3)
            .map(|index| run.add_step(format!("s{index}")).id().to_owned())
            .collect();
        assert_eq!(ids, ["0", "1", "2"]);
    }

    #[test]
    fn parameters_are_emitted_verbatim() {
        let buffer = Arc::new(BufferWriter::new());
        let run = TestRun::builder("test", "1.0")
            .command_line("")
            .parameter("param", "test")
            .parameter("iterations", 3)
            .config(Config::with_writer(buffer.clone()))
            .build();
        run.start(&Dut::new("dut0")).expect("start");

        let lines = lines(&buffer);
        assert_eq!(
            lines[1]["testRunArtifact"]["testRunStart"]["parameters"],
            json!({ "param": "test", "iterations": 3 })
        );
    }
}
