//! Behaviour tests for the emitted output stream.
//!
//! These tests drive the public API the way a diagnostic would and assert
//! on the JSON lines a consumer reads.

use ocptv_core::record::{zip_fields, Field, FieldValue, Node, Record, TypeDesc};
use ocptv_core::serialize::to_value;
use ocptv_core::{ErrorKind, FormatContext, SerializeError};
use ocptv_output::{
    validate_stream, DiagnosisDetails, DiagnosisType, Dut, HardwareSpec, LogSeverity,
    Measurement, Metadata, OutputError, ScopeError, SeriesSpec, SoftwareSpec, SoftwareType,
    SourceLocation, Subcomponent, SubcomponentType, TestResult, TestRun, TestRunError,
    TestStatus, Validator, ValidatorType,
};
use ocptv_tests::{assert_line, capture, records, sequence_numbers};
use serde_json::json;

// =============================================================================
// Run lifecycle
// =============================================================================

#[test]
fn manual_run_produces_preamble_start_and_end() {
    // Given: a run writing into a buffer
    let (buffer, config) = capture();
    let run = TestRun::builder("test", "1.0")
        .command_line("")
        .config(config)
        .build();

    // When: the run is started and ended by hand
    run.start(&Dut::new("dut0")).expect("start");
    run.end(TestStatus::Complete, TestResult::Pass).expect("end");

    // Then: exactly three lines are written, preamble first
    let records = records(&buffer);
    assert_eq!(records.len(), 3);
    assert_line(
        &records[0],
        json!({ "schemaVersion": { "major": 2, "minor": 0 }, "sequenceNumber": 0 }),
    );
    assert_line(
        &records[1],
        json!({
            "testRunArtifact": {
                "testRunStart": {
                    "name": "test",
                    "version": "1.0",
                    "commandLine": "",
                    "parameters": {},
                    "dutInfo": {
                        "dutInfoId": "dut0",
                        "platformInfos": [],
                        "softwareInfos": [],
                        "hardwareInfos": [],
                    },
                },
            },
            "sequenceNumber": 1,
        }),
    );
    assert_line(
        &records[2],
        json!({
            "testRunArtifact": { "testRunEnd": { "status": "COMPLETE", "result": "PASS" } },
            "sequenceNumber": 2,
        }),
    );
}

#[test]
fn run_scope_skip_signal_replaces_default_outcome() {
    // Given: a scoped run whose body raises SKIP / NOT_APPLICABLE
    let (buffer, config) = capture();
    let run = TestRun::builder("run_skip", "1.0").config(config).build();

    // When: the scope finishes
    run.scope(&Dut::new("dut0"), |_| {
        Err(TestRunError::new(TestStatus::Skip, TestResult::NotApplicable).into())
    })
    .expect("the signal is consumed by the run scope");

    // Then: the run end carries the signal's outcome
    let records = records(&buffer);
    assert_line(
        records.last().expect("run end"),
        json!({
            "testRunArtifact": {
                "testRunEnd": { "status": "SKIP", "result": "NOT_APPLICABLE" },
            },
            "sequenceNumber": 2,
        }),
    );
}

#[test]
fn nested_scopes_emit_well_formed_stream() {
    // Given: a DUT with hardware and software descriptions
    let (buffer, config) = capture();
    let dut = Dut::new("dut0").with_name("dut0.server.net");
    dut.add_platform_info("memory-optimized");
    let bmc = dut.add_software_info(
        SoftwareSpec::new("bmc0")
            .software_type(SoftwareType::Firmware)
            .version("10"),
    );
    let ram = dut.add_hardware_info(HardwareSpec::new("ram0").location("MB/DIMM_A1"));

    // When: a run with two steps executes
    let run = TestRun::builder("mem", "2.1")
        .command_line("mem --fast")
        .parameter("iterations", 2)
        .config(config)
        .build();
    run.scope(&dut, |run| {
        run.add_step("measure").scope(|step| {
            step.add_measurement(
                Measurement::new("temp0", 100.5)
                    .with_unit("F")
                    .with_hardware_info(ram.clone())
                    .with_subcomponent(
                        Subcomponent::new("chip0").with_type(SubcomponentType::Asic),
                    ),
            )?;
            Ok(())
        })?;
        run.add_step("diagnose").scope(|step| {
            step.add_diagnosis_with(
                "ram-ok",
                DiagnosisType::Pass,
                DiagnosisDetails::new()
                    .hardware_info(ram.clone())
                    .source_location(SourceLocation::Omit),
            )?;
            Ok(())
        })?;
        run.add_error_with(
            "late-warning",
            ocptv_output::ErrorDetails::new()
                .software_info(bmc.clone())
                .source_location(SourceLocation::Omit),
        )?;
        Ok(())
    })
    .expect("run");

    // Then: the stream validates and references ids rather than objects
    let text = buffer.contents();
    assert_eq!(validate_stream(&text).expect("valid stream"), 10);

    let records = records(&buffer);
    let start = &records[1]["testRunArtifact"]["testRunStart"];
    assert_eq!(start["parameters"], json!({ "iterations": 2 }));
    assert_eq!(start["dutInfo"]["name"], "dut0.server.net");
    assert_eq!(start["dutInfo"]["platformInfos"], json!([{ "info": "memory-optimized" }]));
    assert_eq!(start["dutInfo"]["softwareInfos"][0]["softwareInfoId"], "dut0_0");
    assert_eq!(start["dutInfo"]["hardwareInfos"][0]["hardwareInfoId"], "dut0_0");

    assert_line(
        &records[3],
        json!({
            "testStepArtifact": {
                "testStepId": "0",
                "measurement": {
                    "name": "temp0",
                    "value": 100.5,
                    "unit": "F",
                    "validators": [],
                    "hardwareInfoId": "dut0_0",
                    "subcomponent": { "type": "ASIC", "name": "chip0" },
                },
            },
            "sequenceNumber": 3,
        }),
    );
    assert_line(
        &records[6],
        json!({
            "testStepArtifact": {
                "testStepId": "1",
                "diagnosis": { "verdict": "ram-ok", "type": "PASS", "hardwareInfoId": "dut0_0" },
            },
            "sequenceNumber": 6,
        }),
    );
    assert_eq!(
        records[8]["testRunArtifact"]["error"]["softwareInfoIds"],
        json!(["dut0_0"])
    );
    assert_eq!(sequence_numbers(&records), (0..10).collect::<Vec<_>>());
}

#[test]
fn foreign_errors_end_scopes_with_error_and_propagate() {
    // Given: a step body that fails with an application error
    let (buffer, config) = capture();
    let run = TestRun::builder("test", "1.0").config(config).build();

    // When: the error bubbles through step and run scopes
    let err = run
        .scope(&Dut::new("dut0"), |run| {
            run.add_step("flaky")
                .scope(|_| Err(ScopeError::other("i2c bus timeout")))
        })
        .expect_err("the error propagates to the caller");

    // Then: both scopes were closed with ERROR
    assert_eq!(err.to_string(), "i2c bus timeout");
    let records = records(&buffer);
    assert_eq!(records[3]["testStepArtifact"]["testStepEnd"]["status"], "ERROR");
    assert_eq!(
        records[4]["testRunArtifact"]["testRunEnd"],
        json!({ "status": "ERROR", "result": "NOT_APPLICABLE" })
    );
}

// =============================================================================
// Measurements and series
// =============================================================================

#[test]
fn interleaved_series_keep_independent_indexes() {
    // Given: two series started on the same step
    let (buffer, config) = capture();
    let run = TestRun::builder("test", "1.0").config(config).build();
    let step = run.add_step("freq");
    step.start().expect("start");
    let freq0 = step
        .start_measurement_series(SeriesSpec::new("freq0").unit("ghz"))
        .expect("series 0");
    let freq1 = step
        .start_measurement_series(SeriesSpec::new("freq1").unit("ghz"))
        .expect("series 1");

    // When: elements are interleaved
    freq0.add_measurement(1.0).expect("element");
    freq1.add_measurement(2.0).expect("element");
    freq0.add_measurement(1.2).expect("element");
    freq0.add_measurement(1.4).expect("element");
    freq0.end().expect("end");
    freq1.end().expect("end");

    // Then: each series counts its own elements
    let records = records(&buffer);
    let elements: Vec<(String, u64)> = records
        .iter()
        .filter_map(|record| record["testStepArtifact"].get("measurementSeriesElement"))
        .map(|element| {
            (
                element["measurementSeriesId"].as_str().expect("id").to_owned(),
                element["index"].as_u64().expect("index"),
            )
        })
        .collect();
    assert_eq!(
        elements,
        [
            ("0_0".to_owned(), 0),
            ("0_1".to_owned(), 0),
            ("0_0".to_owned(), 1),
            ("0_0".to_owned(), 2),
        ]
    );

    let totals: Vec<_> = records
        .iter()
        .filter_map(|record| record["testStepArtifact"].get("measurementSeriesEnd"))
        .cloned()
        .collect();
    assert_eq!(
        totals,
        [
            json!({ "measurementSeriesId": "0_0", "totalCount": 3 }),
            json!({ "measurementSeriesId": "0_1", "totalCount": 1 }),
        ]
    );
}

#[test]
fn set_validator_with_mixed_values_is_rejected() {
    // Given: a measurement whose IN_SET validator mixes ints and strings
    let (buffer, config) = capture();
    let run = TestRun::builder("test", "1.0").config(config).build();
    let step = run.add_step("check");
    step.start().expect("start");
    let written = buffer.lines().len();

    let measurement = Measurement::new("mode", 1).with_validator(Validator::new(
        ValidatorType::InSet,
        vec![
            ocptv_output::MeasurementValue::Int(1),
            ocptv_output::MeasurementValue::from("two"),
        ],
    ));

    // When: it is emitted with runtime checks enabled
    let err = step.add_measurement(measurement).expect_err("type check fails");

    // Then: the failure is a data error naming the offending field and nothing is written
    assert_eq!(err.kind(), ErrorKind::Data);
    assert!(err.to_string().contains("Validator.value"), "{err}");
    assert_eq!(buffer.lines().len(), written);
}

#[test]
fn step_logs_carry_source_location() {
    // Given: a step
    let (buffer, config) = capture();
    let run = TestRun::builder("test", "1.0").config(config).build();
    let step = run.add_step("logs");

    // When: logs are added with implicit, explicit and omitted locations
    let line = line!() + 1;
    step.add_log(LogSeverity::Warning, "implicit").expect("log");
    step.add_log_with(LogSeverity::Info, "explicit", SourceLocation::at("sensor.rs", 7))
        .expect("log");
    step.add_log_with(LogSeverity::Debug, "omitted", SourceLocation::Omit)
        .expect("log");

    // Then: each log reflects its location choice
    let records = records(&buffer);
    assert_eq!(
        records[1]["testStepArtifact"]["log"]["sourceLocation"],
        json!({ "file": file!(), "line": line })
    );
    assert_eq!(
        records[2]["testStepArtifact"]["log"]["sourceLocation"],
        json!({ "file": "sensor.rs", "line": 7 })
    );
    assert!(records[3]["testStepArtifact"]["log"].get("sourceLocation").is_none());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn timestamps_follow_configured_timezone() {
    // Given: one run at UTC and one at +02:00
    let (utc_buffer, utc_config) = capture();
    let (plus_two_buffer, plus_two_config) = capture();
    plus_two_config.set_timezone(Some(
        time::UtcOffset::from_hms(2, 0, 0).expect("valid offset"),
    ));

    // When: each writes a run start
    for config in [utc_config, plus_two_config] {
        let run = TestRun::builder("tz", "1.0").config(config).build();
        run.start(&Dut::new("dut0")).expect("start");
    }

    // Then: the suffix matches the offset
    for record in records(&utc_buffer) {
        assert!(record["timestamp"].as_str().expect("string").ends_with('Z'));
    }
    for record in records(&plus_two_buffer) {
        assert!(record["timestamp"].as_str().expect("string").ends_with("+02:00"));
    }
}

#[test]
fn disabled_runtime_checks_let_mixed_sets_through() {
    // Given: runtime checks disabled
    let (buffer, config) = capture();
    config.enable_runtime_checks(false);
    let run = TestRun::builder("test", "1.0").config(config).build();

    // When: a record the checker would reject is emitted
    run.add_step("check")
        .add_measurement(Measurement::new("mode", 1).with_validator(Validator::new(
            ValidatorType::InSet,
            vec![
                ocptv_output::MeasurementValue::Int(1),
                ocptv_output::MeasurementValue::from("two"),
            ],
        )))
        .expect("no runtime check");

    // Then: it is serialized as given
    let records = records(&buffer);
    assert_eq!(
        records[1]["testStepArtifact"]["measurement"]["validators"][0]["value"],
        json!([1, "two"])
    );
}

#[derive(Debug)]
struct HalfFilledLog {
    message: Option<String>,
}

const HALF_FILLED_FIELDS: &[Field] = &[
    Field::wire("severity", "severity", TypeDesc::Str),
    Field::wire("message", "message", TypeDesc::Str),
];

impl Record for HalfFilledLog {
    fn type_name(&self) -> &'static str {
        "HalfFilledLog"
    }

    fn spec_object(&self) -> Option<&'static str> {
        Some("log")
    }

    fn fields(&self) -> Vec<FieldValue<'_>> {
        let message = self.message.as_deref().map_or(Node::Absent, Node::Str);
        zip_fields(HALF_FILLED_FIELDS, vec![Node::Str("INFO"), message])
    }
}

#[test]
fn missing_required_field_fails_without_type_checks() {
    // Given: a record with a required field left empty
    let record = HalfFilledLog { message: None };

    // When: it is serialized directly, bypassing the type checker
    let err = to_value(&record, &FormatContext::default()).expect_err("required field");

    // Then: the serializer reports a data error on its own
    assert!(matches!(
        err,
        SerializeError::MissingRequiredField { field: "message", .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn every_optional_field_maps_to_its_wire_name() {
    // Given: a measurement with all optional fields set, and one with none
    let mut metadata = Metadata::new();
    metadata.insert("sensor".to_owned(), json!("tc-1"));
    let dut = Dut::new("d0");
    let fan = dut.add_hardware_info(HardwareSpec::new("fan"));
    let full = Measurement::new("speed", 1200)
        .with_unit("rpm")
        .with_validator(Validator::new(ValidatorType::LessThan, 3000))
        .with_hardware_info(fan)
        .with_subcomponent(Subcomponent::new("rotor"))
        .with_metadata(metadata);
    let bare = Measurement::new("speed", 1200);

    // When: both are serialized
    let ctx = FormatContext::default();
    let full = to_value(&full, &ctx).expect("full");
    let bare = to_value(&bare, &ctx).expect("bare");

    // Then: keys are exactly the declared wire names
    let keys = |value: &serde_json::Value| {
        value
            .as_object()
            .expect("object")
            .keys()
            .cloned()
            .collect::<Vec<_>>()
    };
    assert_eq!(
        keys(&full),
        [
            "hardwareInfoId",
            "metadata",
            "name",
            "subcomponent",
            "unit",
            "validators",
            "value",
        ]
    );
    assert_eq!(keys(&bare), ["name", "validators", "value"]);
}

#[test]
fn write_failure_surfaces_as_io_error() {
    struct ClosedPipe;

    impl ocptv_output::Writer for ClosedPipe {
        fn write(&self, _line: &str) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    // Given: a sink that always fails
    let config = ocptv_output::Config::with_writer(ocptv_tests::Arc::new(ClosedPipe));
    let run = TestRun::builder("test", "1.0").config(config).build();

    // When: the first record is emitted
    let err = run.start(&Dut::new("dut0")).expect_err("sink is closed");

    // Then: the preamble failure is reported with the I/O classification
    assert!(matches!(err, OutputError::PreambleFailed { kind: ErrorKind::Io, .. }));
    assert_eq!(err.kind(), ErrorKind::Io);
}
