//! Bundled demo programs.
//!
//! Every demo writes one complete stream through the [`Config`] it is
//! given, so the runner decides where output goes and how it is checked.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ocptv_core::timestamp;
use ocptv_output::{
    Config, DiagnosisType, Dut, ErrorDetails, File, HardwareSpec, LogSeverity, Measurement,
    Metadata, RunLogLayer, ScopeError, SeriesElement, SeriesSpec, SoftwareSpec, SoftwareType,
    Subcomponent, SubcomponentType, TestResult, TestRun, TestRunBuilder, TestRunError, TestStatus,
    TestStep, TestStepError, Validator, ValidatorType,
};
use serde_json::json;
use time::macros::offset;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;

/// Body of a demo, writing through the given configuration.
pub type DemoFn = fn(&Config) -> Result<(), ScopeError>;

/// One bundled demo program.
#[derive(Debug, Clone, Copy)]
pub struct Demo {
    pub name: &'static str,
    pub description: &'static str,
    pub run: DemoFn,
}

pub const DEMOS: &[Demo] = &[
    Demo {
        name: "no_contexts",
        description: "run and step started and ended by hand",
        run: no_contexts,
    },
    Demo {
        name: "context_run_skip",
        description: "run scope ended early with SKIP",
        run: context_run_skip,
    },
    Demo {
        name: "context_step_fail",
        description: "step scope ended early with ERROR",
        run: context_step_fail,
    },
    Demo {
        name: "diagnosis",
        description: "diagnosis inside a step",
        run: diagnosis,
    },
    Demo {
        name: "error_while_gathering_duts",
        description: "run error emitted before the run starts",
        run: error_while_gathering_duts,
    },
    Demo {
        name: "run_error_with_dut",
        description: "run error referencing DUT software",
        run: run_error_with_dut,
    },
    Demo {
        name: "create_file_during_step",
        description: "file references with and without metadata",
        run: create_file_during_step,
    },
    Demo {
        name: "step_extension",
        description: "vendor extensions with string and object content",
        run: step_extension,
    },
    Demo {
        name: "measurement_simple",
        description: "single measurements",
        run: measurement_simple,
    },
    Demo {
        name: "measurement_series",
        description: "manual, scoped and interleaved measurement series",
        run: measurement_series,
    },
    Demo {
        name: "measurements_with_validators",
        description: "measurements and series with validators",
        run: measurements_with_validators,
    },
    Demo {
        name: "measurements_with_subcomponent",
        description: "measurements tied to DUT hardware and subcomponents",
        run: measurements_with_subcomponent,
    },
    Demo {
        name: "different_timezone",
        description: "timestamps rendered at UTC-2",
        run: different_timezone,
    },
    Demo {
        name: "parallel_steps",
        description: "steps logging concurrently from several threads",
        run: parallel_steps,
    },
    Demo {
        name: "tracing_logs",
        description: "tracing events routed into run logs",
        run: tracing_logs,
    },
];

/// Look a demo up by its name.
pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|demo| demo.name == name)
}

fn test_run(config: &Config, name: &str) -> TestRunBuilder {
    TestRun::builder(name, "1.0").config(config.clone())
}

fn no_contexts(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "no with").parameter("param", "test").build();
    run.start(&Dut::new("dut0"))?;

    let step = run.add_step("step0");
    step.start()?;
    step.add_log(LogSeverity::Debug, "Some interesting message.")?;
    step.end(TestStatus::Complete)?;

    run.end(TestStatus::Complete, TestResult::Pass)?;
    Ok(())
}

fn context_run_skip(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "run_skip").parameter("param", "test").build();
    run.scope(&Dut::new("dut0"), |_| {
        Err(TestRunError::new(TestStatus::Skip, TestResult::NotApplicable).into())
    })
}

fn context_step_fail(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "step_fail").build();
    run.scope(&Dut::new("dut0"), |run| {
        run.add_step("step0").scope(|step| {
            step.add_log(LogSeverity::Info, "info log")?;
            Ok(())
        })?;

        run.add_step("step1")
            .scope(|_| Err(TestStepError::new(TestStatus::Error).into()))
    })
}

fn diagnosis(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "run_with_diagnosis").build();
    run.scope(&Dut::new("dut0"), |run| {
        run.add_step("step0").scope(|step| {
            step.add_diagnosis("pass-default", DiagnosisType::Pass)?;
            Ok(())
        })
    })
}

fn error_while_gathering_duts(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "test").build();
    run.add_error_with(
        "no-dut",
        ErrorDetails::new().message("could not find any valid DUTs"),
    )?;
    Ok(())
}

fn run_error_with_dut(config: &Config) -> Result<(), ScopeError> {
    let dut = Dut::new("dut0").with_name("dut0.server.net");
    let bmc = dut.add_software_info(
        SoftwareSpec::new("bmc")
            .software_type(SoftwareType::Firmware)
            .version("2.5"),
    );

    let run = test_run(config, "test").build();
    run.scope(&dut, |run| {
        run.add_error_with("power-fail", ErrorDetails::new().software_info(bmc))?;
        Ok(())
    })
}

fn create_file_during_step(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "test").build();
    run.scope(&Dut::new("dut0"), |run| {
        run.add_step("step0").scope(|step| {
            step.add_file("device_info.csv", "file:///root/device_info.csv")?;

            let mut metadata = Metadata::new();
            metadata.insert("k".to_owned(), json!("v"));
            step.add_file_with(
                File::new("file_with_meta.txt", "ftp://file").with_metadata(metadata),
            )?;
            Ok(())
        })
    })
}

fn step_extension(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "test").build();
    run.scope(&Dut::new("dut0"), |run| {
        run.add_step("step0").scope(|step| {
            step.add_extension("simple", &"extension_identifier")?;
            step.add_extension(
                "complex",
                &json!({
                    "@type": "DemoExtension",
                    "field": "demo",
                    "subtypes": [1, 42],
                }),
            )?;
            Ok(())
        })
    })
}

fn measurement_simple(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "test").build();
    run.scope(&Dut::new("dut0"), |run| {
        run.add_step("step0").scope(|step| {
            step.add_measurement(Measurement::new("fan_speed", "1200").with_unit("rpm"))?;
            step.add_measurement(Measurement::new("temperature", 42.5))?;
            Ok(())
        })
    })
}

fn measurement_series(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "test").build();
    run.scope(&Dut::new("dut0"), |run| {
        run.add_step("step0").scope(|step| {
            let fan_speed =
                step.start_measurement_series(SeriesSpec::new("fan_speed").unit("rpm"))?;
            for value in [1000, 1200, 1500] {
                fan_speed.add_measurement(value)?;
            }
            fan_speed.end()?;
            Ok(())
        })?;

        run.add_step("step1").scope(|step| {
            let temp0 = step.start_measurement_series(SeriesSpec::new("temp0").unit("C"))?;
            temp0.scope(|series| {
                series.add_measurement_with(
                    SeriesElement::new(42).timestamp(timestamp::now() - 2.0),
                )?;
                series.add_measurement(43)?;
                Ok(())
            })
        })?;

        run.add_step("step2").scope(|step| {
            let freq0 = step.start_measurement_series(SeriesSpec::new("freq0").unit("ghz"))?;
            let freq1 = step.start_measurement_series(SeriesSpec::new("freq1").unit("ghz"))?;
            freq0.add_measurement(1.0)?;
            freq1.add_measurement(2.0)?;
            freq0.add_measurement(1.2)?;
            freq0.end()?;
            freq1.end()?;
            Ok(())
        })
    })
}

fn measurements_with_validators(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "test").build();
    run.scope(&Dut::new("dut0"), |run| {
        run.add_step("step0").scope(|step| {
            step.add_measurement(
                Measurement::new("temp", 40).with_validator(
                    Validator::new(ValidatorType::GreaterThan, 30).with_name("gt_30"),
                ),
            )?;

            let fan_speed = step.start_measurement_series(
                SeriesSpec::new("fan_speed")
                    .unit("rpm")
                    .validator(Validator::new(ValidatorType::LessThanOrEqual, 3000)),
            )?;
            fan_speed.scope(|series| {
                series.add_measurement(1000)?;
                Ok(())
            })
        })
    })
}

fn measurements_with_subcomponent(config: &Config) -> Result<(), ScopeError> {
    let dut = Dut::new("dut0").with_name("dut0.server.net");
    dut.add_platform_info("memory-optimized");
    dut.add_software_info(
        SoftwareSpec::new("bmc0")
            .software_type(SoftwareType::Firmware)
            .version("10")
            .revision("11")
            .computer_system("primary_node"),
    );
    let ram0 = dut.add_hardware_info(
        HardwareSpec::new("ram0")
            .version("1")
            .revision("2")
            .location("MB/DIMM_A1")
            .serial_number("HMA2022029281901")
            .part_number("P03052-091")
            .manufacturer("hynix")
            .manufacturer_part_number("HMA84GR7AFR4N-VK")
            .odata_id("/redfish/v1/Systems/System.Embedded.1/Memory/DIMMSLOTA1")
            .computer_system("primary_node")
            .manager("bmc0"),
    );

    let run = test_run(config, "test").build();
    run.scope(&dut, |run| {
        run.add_step("step0").scope(|step| {
            step.add_measurement(
                Measurement::new("temp0", 100.5)
                    .with_unit("F")
                    .with_hardware_info(ram0.clone())
                    .with_subcomponent(Subcomponent::new("chip0")),
            )?;

            let chip1_temp = step.start_measurement_series(
                SeriesSpec::new("temp1")
                    .unit("C")
                    .hardware_info(ram0.clone())
                    .subcomponent(
                        Subcomponent::new("chip1")
                            .with_location("U11")
                            .with_version("1")
                            .with_revision("1")
                            .with_type(SubcomponentType::Unspecified),
                    ),
            )?;
            chip1_temp.scope(|series| {
                series.add_measurement(79)?;
                Ok(())
            })
        })
    })
}

fn different_timezone(config: &Config) -> Result<(), ScopeError> {
    config.set_timezone(Some(offset!(-2)));
    let run = test_run(config, "test").build();
    run.scope(&Dut::new("dut0"), |_| Ok(()))
}

fn parallel_steps(config: &Config) -> Result<(), ScopeError> {
    let run = test_run(config, "custom writer").build();
    run.scope(&Dut::new("dut0"), |run| {
        let steps: Vec<TestStep> = (0..4)
            .map(|id| run.add_step(format!("parallel_step_{id}")))
            .collect();

        thread::scope(|scope| {
            let handles: Vec<_> = steps
                .iter()
                .map(|step| scope.spawn(move || parallel_step(step)))
                .collect();
            handles.into_iter().try_for_each(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
        })
    })
}

fn tracing_logs(config: &Config) -> Result<(), ScopeError> {
    let run = Arc::new(test_run(config, "run_with_tracing").build());
    let subscriber = tracing_subscriber::registry().with(RunLogLayer::new(Arc::clone(&run)));

    tracing::subscriber::with_default(subscriber, || {
        run.scope(&Dut::new("dut0"), |_| {
            info!("ocp log through tracing");
            debug!("debug log sample");
            warn!(sensor = "fan0", "warn level here");
            Ok(())
        })
    })
}

fn parallel_step(step: &TestStep) -> Result<(), ScopeError> {
    step.scope(|step| {
        for _ in 0..5 {
            step.add_log(
                LogSeverity::Info,
                format!("log from: {}, ts: {}", step.name(), timestamp::now()),
            )?;
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ocptv_output::{validate_stream, BufferWriter};
    use serde_json::Value;

    use super::*;

    fn capture(demo: &Demo) -> Vec<Value> {
        let buffer = Arc::new(BufferWriter::new());
        let config = Config::with_writer(buffer.clone());
        (demo.run)(&config).expect("demo succeeds");
        validate_stream(&buffer.contents()).expect("valid stream");
        buffer
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).expect("json"))
            .collect()
    }

    fn demo(name: &str) -> &'static Demo {
        find(name).expect("demo exists")
    }

    #[test]
    fn every_demo_produces_a_valid_stream() {
        for demo in DEMOS {
            let lines = capture(demo);
            assert!(lines.len() >= 2, "{} wrote too little", demo.name);
        }
    }

    #[test]
    fn demo_names_are_unique() {
        let mut names: Vec<_> = DEMOS.iter().map(|demo| demo.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DEMOS.len());
    }

    #[test]
    fn run_skip_ends_with_signal_outcome() {
        let lines = capture(demo("context_run_skip"));
        assert_eq!(
            lines.last().expect("end")["testRunArtifact"]["testRunEnd"],
            json!({ "status": "SKIP", "result": "NOT_APPLICABLE" })
        );
    }

    #[test]
    fn failing_step_does_not_fail_the_run() {
        let lines = capture(demo("context_step_fail"));
        let step_ends: Vec<_> = lines
            .iter()
            .filter_map(|line| line["testStepArtifact"].get("testStepEnd"))
            .collect();
        assert_eq!(step_ends, [&json!({ "status": "COMPLETE" }), &json!({ "status": "ERROR" })]);
        assert_eq!(
            lines.last().expect("end")["testRunArtifact"]["testRunEnd"]["result"],
            "PASS"
        );
    }

    #[test]
    fn timezone_demo_renders_negative_offset() {
        let lines = capture(demo("different_timezone"));
        let timestamp = lines[1]["timestamp"].as_str().expect("string timestamp");
        assert!(timestamp.ends_with("-02:00"), "{timestamp}");
    }

    #[test]
    fn parallel_steps_scope_their_own_logs() {
        let lines = capture(demo("parallel_steps"));
        for id in 0..4 {
            let id = id.to_string();
            let step_lines: Vec<_> = lines
                .iter()
                .filter(|line| line["testStepArtifact"]["testStepId"] == id.as_str())
                .collect();
            assert_eq!(step_lines.len(), 7);
            assert!(step_lines[0]["testStepArtifact"].get("testStepStart").is_some());
            assert!(step_lines[6]["testStepArtifact"].get("testStepEnd").is_some());
        }
    }

    #[test]
    fn tracing_demo_routes_events_into_run_logs() {
        let lines = capture(demo("tracing_logs"));
        let logs: Vec<_> = lines
            .iter()
            .filter_map(|line| line["testRunArtifact"].get("log"))
            .collect();
        let severities: Vec<_> = logs.iter().map(|log| log["severity"].clone()).collect();
        assert_eq!(severities, [json!("INFO"), json!("DEBUG"), json!("WARNING")]);
        assert_eq!(logs[0]["message"], "ocp log through tracing");
        assert_eq!(logs[2]["message"], "warn level here sensor=fan0");
        assert!(logs.iter().all(|log| log.get("sourceLocation").is_some()));
    }

    #[test]
    fn subcomponent_demo_references_ram_by_id() {
        let lines = capture(demo("measurements_with_subcomponent"));
        let measurement = lines
            .iter()
            .find_map(|line| line["testStepArtifact"].get("measurement"))
            .expect("measurement");
        assert_eq!(measurement["hardwareInfoId"], "dut0_0");
        assert_eq!(measurement["subcomponent"], json!({ "name": "chip0" }));
    }
}
