//! # Test steps
//!
//! Steps share the run's sequencer and tag every payload with their id.
//!
//! | Scope body outcome | Step end status | Returned |
//! |--------------------|-----------------|----------|
//! | `Ok` | COMPLETE | `Ok` |
//! | `Err(ScopeError::Step(signal))` | signal status | `Ok` |
//! | `Err(ScopeError::Run(signal))` | signal status | the run signal |
//! | any other `Err` | ERROR | the error |
//! | panic | ERROR | panic resumes |

use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};

use ocptv_core::{
    Diagnosis, DiagnosisType, Extension, File, HardwareInfo, Log, LogSeverity, Measurement,
    SerializeError, StepArtifact, StepEnd, StepPayload, StepStart, Subcomponent, TestStatus,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::emitter::ArtifactEmitter;
use crate::error::{OutputError, ScopeError};
use crate::measurement::{MeasurementSeries, SeriesSpec};
use crate::run::ErrorDetails;
use crate::scope::UnwindGuard;
use crate::source::SourceLocation;

/// Optional fields of a diagnosis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosisDetails {
    pub message: Option<String>,
    pub hardware_info: Option<HardwareInfo>,
    pub subcomponent: Option<Subcomponent>,
    pub source_location: SourceLocation,
}

impl DiagnosisDetails {
    /// Details with no message, no hardware and the caller's location.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn hardware_info(mut self, hardware_info: HardwareInfo) -> Self {
        self.hardware_info = Some(hardware_info);
        self
    }

    pub fn subcomponent(mut self, subcomponent: Subcomponent) -> Self {
        self.subcomponent = Some(subcomponent);
        self
    }

    pub fn source_location(mut self, location: SourceLocation) -> Self {
        self.source_location = location;
        self
    }
}

/// One step of a run. Created by [`crate::TestRun::add_step`].
#[derive(Debug)]
pub struct TestStep {
    name: String,
    id: String,
    emitter: Arc<ArtifactEmitter>,
    next_series: Mutex<u64>,
}

impl TestStep {
    pub(crate) fn new(name: String, ordinal: u64, emitter: Arc<ArtifactEmitter>) -> Self {
        Self {
            name,
            id: ordinal.to_string(),
            emitter,
            next_series: Mutex::new(0),
        }
    }

    /// Name given at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Step id, the ordinal assigned by the run.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Emit the step start.
    pub fn start(&self) -> Result<(), OutputError> {
        self.emit(StepPayload::Start(StepStart {
            name: self.name.clone(),
        }))
    }

    /// Emit the step end with `status`.
    pub fn end(&self, status: TestStatus) -> Result<(), OutputError> {
        self.emit(StepPayload::End(StepEnd { status }))
    }

    /// Start the step, execute `body` and always emit the step end.
    pub fn scope<F>(&self, body: F) -> Result<(), ScopeError>
    where
        F: FnOnce(&TestStep) -> Result<(), ScopeError>,
    {
        self.start()?;

        let guard = UnwindGuard::new(|| self.end_quietly(TestStatus::Error));
        let outcome = body(self);
        drop(guard);

        match outcome {
            Ok(()) => {
                self.end(TestStatus::Complete)?;
                Ok(())
            }
            Err(ScopeError::Step(signal)) => {
                debug!(step = %self.id, status = %signal.status, "step ended early");
                self.end(signal.status)?;
                Ok(())
            }
            Err(ScopeError::Run(signal)) => {
                self.end_quietly(signal.status);
                Err(ScopeError::Run(signal))
            }
            Err(error) => {
                self.end_quietly(TestStatus::Error);
                Err(error)
            }
        }
    }

    /// Emit a single-shot measurement.
    pub fn add_measurement(&self, measurement: Measurement) -> Result<(), OutputError> {
        self.emit(StepPayload::Measurement(measurement))
    }

    /// Start a new series; its id is `{step_id}_{n}`.
    pub fn start_measurement_series(
        &self,
        spec: SeriesSpec,
    ) -> Result<MeasurementSeries, OutputError> {
        let series_id = {
            let mut next_series = self
                .next_series
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let series_id = format!("{}_{}", self.id, *next_series);
            *next_series += 1;
            series_id
        };
        MeasurementSeries::start(self.id.clone(), series_id, spec, Arc::clone(&self.emitter))
    }

    /// Emit a diagnosis located at the caller.
    #[track_caller]
    pub fn add_diagnosis(
        &self,
        verdict: impl Into<String>,
        diagnosis_type: DiagnosisType,
    ) -> Result<(), OutputError> {
        self.add_diagnosis_with(verdict, diagnosis_type, DiagnosisDetails::default())
    }

    /// Emit a diagnosis with optional details.
    #[track_caller]
    pub fn add_diagnosis_with(
        &self,
        verdict: impl Into<String>,
        diagnosis_type: DiagnosisType,
        details: DiagnosisDetails,
    ) -> Result<(), OutputError> {
        let diagnosis = Diagnosis {
            verdict: verdict.into(),
            diagnosis_type,
            message: details.message,
            hardware_info: details.hardware_info,
            subcomponent: details.subcomponent,
            source_location: details.source_location.resolve(Location::caller()),
        };
        self.emit(StepPayload::Diagnosis(diagnosis))
    }

    /// Emit a step-level log located at the caller.
    #[track_caller]
    pub fn add_log(
        &self,
        severity: LogSeverity,
        message: impl Into<String>,
    ) -> Result<(), OutputError> {
        self.add_log_with(severity, message, SourceLocation::Caller)
    }

    /// Emit a step-level log with an explicit source location.
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
        self.emit(StepPayload::Log(log))
    }

    /// Emit a step-level error located at the caller.
    #[track_caller]
    pub fn add_error(&self, symptom: impl Into<String>) -> Result<(), OutputError> {
        self.add_error_with(symptom, ErrorDetails::default())
    }

    /// Emit a step-level error with optional details.
    #[track_caller]
    pub fn add_error_with(
        &self,
        symptom: impl Into<String>,
        details: ErrorDetails,
    ) -> Result<(), OutputError> {
        let error = details.into_record(symptom.into(), Location::caller());
        self.emit(StepPayload::Error(error))
    }

    /// Reference a snapshot file.
    pub fn add_file(
        &self,
        name: impl Into<String>,
        uri: impl Into<String>,
    ) -> Result<(), OutputError> {
        self.add_file_with(File::new(name, uri))
    }

    /// Emit a fully described file reference.
    pub fn add_file_with(&self, file: File) -> Result<(), OutputError> {
        self.emit(StepPayload::File(file))
    }

    /// Emit a vendor extension. `content` may be any serde-serializable value.
    pub fn add_extension<T: Serialize>(
        &self,
        name: impl Into<String>,
        content: &T,
    ) -> Result<(), OutputError> {
        let content = serde_json::to_value(content).map_err(SerializeError::Json)?;
        self.emit(StepPayload::Extension(Extension {
            name: name.into(),
            content,
        }))
    }

    fn emit(&self, payload: StepPayload) -> Result<(), OutputError> {
        let artifact = StepArtifact {
            id: self.id.clone(),
            payload,
        };
        self.emitter.emit(artifact).map(|_| ())
    }

    fn end_quietly(&self, status: TestStatus) {
        if let Err(error) = self.end(status) {
            warn!(step = %self.id, %error, "could not emit test step end");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use ocptv_core::{TestResult, Validator, ValidatorType};
    use serde_json::{json, Value};

    use super::*;
    use crate::config::Config;
    use crate::dut::{Dut, HardwareSpec};
    use crate::error::{TestRunError, TestStepError};
    use crate::run::TestRun;
    use crate::writer::BufferWriter;

    fn run_with_buffer() -> (Arc<BufferWriter>, TestRun) {
        let buffer = Arc::new(BufferWriter::new());
        let run = TestRun::builder("test", "1.0")
            .command_line("")
            .config(Config::with_writer(buffer.clone()))
            .build();
        (buffer, run)
    }

    fn step_lines(buffer: &BufferWriter) -> Vec<Value> {
        buffer
            .lines()
            .iter()
            .map(|line| serde_json::from_str::<Value>(line).expect("json"))
            .filter_map(|value| value.get("testStepArtifact").cloned())
            .collect()
    }

    #[test]
    fn scope_wraps_body_in_start_and_end() {
        let (buffer, run) = run_with_buffer();
        let step = run.add_step("first step");
        step.scope(|step| {
            step.add_measurement(Measurement::new("temp", 42.5).with_unit("C"))?;
            Ok(())
        })
        .expect("scope");

        let lines = step_lines(&buffer);
        assert_eq!(
            lines,
            vec![
                json!({ "testStepId": "0", "testStepStart": { "name": "first step" } }),
                json!({
                    "testStepId": "0",
                    "measurement": {
                        "name": "temp",
                        "value": 42.5,
                        "unit": "C",
                        "validators": [],
                    },
                }),
                json!({ "testStepId": "0", "testStepEnd": { "status": "COMPLETE" } }),
            ]
        );
    }

    #[test]
    fn step_signal_is_consumed() {
        let (buffer, run) = run_with_buffer();
        run.add_step("skipped")
            .scope(|_| Err(TestStepError::new(TestStatus::Skip).into()))
            .expect("signal consumed");

        let lines = step_lines(&buffer);
        assert_eq!(lines[1]["testStepEnd"]["status"], "SKIP");
    }

    #[test]
    fn run_signal_ends_step_and_propagates() {
        let (buffer, run) = run_with_buffer();
        run.scope(&Dut::new("dut0"), |run| {
            run.add_step("fails").scope(|_| {
                Err(TestRunError::new(TestStatus::Complete, TestResult::Fail).into())
            })
        })
        .expect("run consumes its signal");

        let lines: Vec<Value> = buffer
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).expect("json"))
            .collect();
        assert_eq!(lines[3]["testStepArtifact"]["testStepEnd"]["status"], "COMPLETE");
        assert_eq!(
            lines[4]["testRunArtifact"]["testRunEnd"],
            json!({ "status": "COMPLETE", "result": "FAIL" })
        );
    }

    #[test]
    fn foreign_error_ends_step_with_error() {
        let (buffer, run) = run_with_buffer();
        let err = run
            .add_step("broken")
            .scope(|_| Err(ScopeError::other("sensor unreachable")))
            .expect_err("propagates");
        assert_eq!(err.to_string(), "sensor unreachable");
        assert_eq!(step_lines(&buffer)[1]["testStepEnd"]["status"], "ERROR");
    }

    #[test]
    fn panic_ends_step_with_error() {
        let (buffer, run) = run_with_buffer();
        let step = run.add_step("panics");
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = step.scope(|_| panic!("boom"));
        }));
        assert!(result.is_err());

        let lines = step_lines(&buffer);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["testStepEnd"]["status"], "ERROR");
    }

    #[test]
    fn diagnosis_references_hardware_and_location() {
        let (buffer, run) = run_with_buffer();
        let dut = Dut::new("dut0");
        let fan = dut.add_hardware_info(HardwareSpec::new("fan"));
        let step = run.add_step("diag");
        step.add_diagnosis_with(
            "fan-ok",
            DiagnosisType::Pass,
            DiagnosisDetails::new()
                .message("fan spins")
                .hardware_info(fan)
                .source_location(SourceLocation::at("fan.rs", 12)),
        )
        .expect("diagnosis");

        assert_eq!(
            step_lines(&buffer)[0]["diagnosis"],
            json!({
                "verdict": "fan-ok",
                "type": "PASS",
                "message": "fan spins",
                "hardwareInfoId": "dut0_0",
                "sourceLocation": { "file": "fan.rs", "line": 12 },
            })
        );
    }

    #[test]
    fn extension_accepts_serializable_content() {
        #[derive(Serialize)]
        struct Payload {
            #[serde(rename = "@type")]
            kind: &'static str,
            retries: u32,
        }

        let (buffer, run) = run_with_buffer();
        run.add_step("ext")
            .add_extension("ext0", &Payload { kind: "Example", retries: 3 })
            .expect("extension");

        assert_eq!(
            step_lines(&buffer)[0]["extension"],
            json!({ "name": "ext0", "content": { "@type": "Example", "retries": 3 } })
        );
    }

    #[test]
    fn null_extension_content_is_written_as_null() {
        let (buffer, run) = run_with_buffer();
        run.add_step("ext")
            .add_extension("ext", &json!(null))
            .expect("extension");

        let extension = &step_lines(&buffer)[0]["extension"];
        assert_eq!(extension, &json!({ "name": "ext", "content": null }));
        assert!(extension
            .as_object()
            .expect("object")
            .contains_key("content"));
    }

    #[test]
    fn file_and_error_payloads() {
        let (buffer, run) = run_with_buffer();
        let step = run.add_step("io");
        step.add_file("out.log", "file:///tmp/out.log").expect("file");
        step.add_error_with(
            "io-fail",
            ErrorDetails::new().source_location(SourceLocation::Omit),
        )
        .expect("error");

        let lines = step_lines(&buffer);
        assert_eq!(lines[0]["file"]["isSnapshot"], true);
        assert_eq!(lines[1]["error"], json!({ "symptom": "io-fail", "softwareInfoIds": [] }));
    }

    #[test]
    fn invalid_validator_is_rejected_without_output() {
        let (buffer, run) = run_with_buffer();
        let step = run.add_step("check");
        step.start().expect("start");
        let before = buffer.lines().len();

        let measurement = Measurement::new("fan_speed", 1000).with_validator(Validator::new(
            ValidatorType::InSet,
            vec![ocptv_core::MeasurementValue::Int(1), "two".into()],
        ));
        let err = step.add_measurement(measurement).expect_err("mixed set");
        assert!(matches!(err, OutputError::TypeCheck(_)));
        assert_eq!(buffer.lines().len(), before);
    }

    #[test]
    fn series_ids_count_per_step() {
        let (_buffer, run) = run_with_buffer();
        let first = run.add_step("a");
        let second = run.add_step("b");
        let ids = [
            first.start_measurement_series(SeriesSpec::new("s")).expect("series").id().to_owned(),
            first.start_measurement_series(SeriesSpec::new("s")).expect("series").id().to_owned(),
            second.start_measurement_series(SeriesSpec::new("s")).expect("series").id().to_owned(),
        ];
        assert_eq!(ids, ["0_0", "0_1", "1_0"]);
    }
}
