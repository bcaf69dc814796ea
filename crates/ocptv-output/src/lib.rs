//! # ocptv-output
//!
//! Produces OCP Test & Validation output as a stream of JSON lines.
//!
//! ## Overview
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`config`] | sink, runtime checks and display timezone |
//! | [`writer`] | the [`Writer`] sink trait with stdout, stream and buffer sinks |
//! | [`emitter`] | schema-version preamble and gap-free sequence numbers |
//! | [`dut`] | device-under-test registry deriving hardware and software ids |
//! | [`run`], [`step`], [`measurement`] | the user-level API |
//! | [`stream`] | parsing and validating emitted streams |
//! | [`bridge`] | routing `tracing` events into run logs and output lines into `tracing` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use ocptv_output::{Dut, HardwareSpec, Measurement, TestRun};
//!
//! let dut = Dut::new("dut0");
//! let ram = dut.add_hardware_info(HardwareSpec::new("ram0").location("MB/DIMM_A1"));
//!
//! TestRun::new("memory_check", "1.0").scope(&dut, |run| {
//!     run.add_step("read_speed").scope(|step| {
//!         step.add_measurement(
//!             Measurement::new("speed", 3200).with_unit("MT/s").with_hardware_info(ram.clone()),
//!         )?;
//!         Ok(())
//!     })
//! })?;
//! ```

pub mod bridge;
pub mod config;
pub mod dut;
pub mod emitter;
pub mod error;
pub mod measurement;
pub mod run;
mod scope;
pub mod source;
pub mod step;
pub mod stream;
pub mod writer;

pub use bridge::{RunLogLayer, TracingWriter};
pub use config::{Config, Settings};
pub use dut::{Dut, HardwareSpec, SoftwareSpec};
pub use emitter::ArtifactEmitter;
pub use error::{OutputError, ScopeError, TestRunError, TestStepError};
pub use measurement::{MeasurementSeries, SeriesElement, SeriesSpec};
pub use run::{ErrorDetails, TestRun, TestRunBuilder};
pub use source::SourceLocation;
pub use step::{DiagnosisDetails, TestStep};
pub use stream::{parse_stream, validate_stream, StreamValidationError};
pub use writer::{BufferWriter, StdoutWriter, StreamWriter, Writer};

pub use ocptv_core::{
    DiagnosisType, ErrorKind, File, HardwareInfo, LogSeverity, Measurement, MeasurementValue,
    Metadata, PlatformInfo, SoftwareInfo, SoftwareType, Subcomponent, SubcomponentType,
    TestResult, TestStatus, Validator, ValidatorType, ValidatorValue,
};
