//! Measurement series.
//!
//! A series is started by [`crate::TestStep::start_measurement_series`],
//! receives elements with consecutive indexes starting at 0 and is closed
//! by one `measurementSeriesEnd` whose `totalCount` equals the number of
//! elements written.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ocptv_core::{
    timestamp, HardwareInfo, MeasurementSeriesElement, MeasurementSeriesEnd,
    MeasurementSeriesStart, MeasurementValue, Metadata, StepArtifact, StepPayload, Subcomponent,
    Validator,
};
use tracing::warn;

use crate::emitter::ArtifactEmitter;
use crate::error::{OutputError, ScopeError};
use crate::scope::UnwindGuard;

/// Description of a series before it is started.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSpec {
    pub name: String,
    pub unit: Option<String>,
    pub validators: Vec<Validator>,
    pub hardware_info: Option<HardwareInfo>,
    pub subcomponent: Option<Subcomponent>,
    pub metadata: Option<Metadata>,
}

impl SeriesSpec {
    /// Series description with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Append a validator; may be called repeatedly.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
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

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One value to append to a series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesElement {
    pub value: MeasurementValue,
    /// Unix epoch seconds; defaults to the time of emission.
    pub timestamp: Option<f64>,
    pub metadata: Option<Metadata>,
}

impl SeriesElement {
    /// Element timestamped at emission.
    pub fn new(value: impl Into<MeasurementValue>) -> Self {
        Self {
            value: value.into(),
            timestamp: None,
            metadata: None,
        }
    }

    /// Explicit timestamp in Unix epoch seconds.
    pub fn timestamp(mut self, seconds: f64) -> Self {
        self.timestamp = Some(seconds);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Default)]
struct SeriesState {
    next_index: u64,
    ended: bool,
}

/// Handle on a started series. Safe to share between threads.
#[derive(Debug)]
pub struct MeasurementSeries {
    step_id: String,
    series_id: String,
    emitter: Arc<ArtifactEmitter>,
    state: Mutex<SeriesState>,
}

impl MeasurementSeries {
    pub(crate) fn start(
        step_id: String,
        series_id: String,
        spec: SeriesSpec,
        emitter: Arc<ArtifactEmitter>,
    ) -> Result<Self, OutputError> {
        let series = Self {
            step_id,
            series_id,
            emitter,
            state: Mutex::new(SeriesState::default()),
        };
        series.emit(StepPayload::SeriesStart(MeasurementSeriesStart {
            name: spec.name,
            unit: spec.unit,
            series_id: series.series_id.clone(),
            validators: spec.validators,
            hardware_info: spec.hardware_info,
            subcomponent: spec.subcomponent,
            metadata: spec.metadata,
        }))?;
        Ok(series)
    }

    /// Series id, `{step}_{n}`.
    pub fn id(&self) -> &str {
        &self.series_id
    }

    /// Number of elements written so far.
    pub fn count(&self) -> u64 {
        self.lock().next_index
    }

    /// Append a value timestamped now.
    pub fn add_measurement(&self, value: impl Into<MeasurementValue>) -> Result<(), OutputError> {
        self.add_measurement_with(SeriesElement::new(value))
    }

    /// Append one element. The index advances only if the element was written.
    pub fn add_measurement_with(&self, element: SeriesElement) -> Result<(), OutputError> {
        let mut state = self.lock();
        if state.ended {
            return Err(self.ended_error());
        }
        let record = MeasurementSeriesElement {
            index: state.next_index,
            value: element.value,
            timestamp: element.timestamp.unwrap_or_else(timestamp::now),
            series_id: self.series_id.clone(),
            metadata: element.metadata,
        };
        self.emit(StepPayload::SeriesElement(record))?;
        state.next_index += 1;
        Ok(())
    }

    /// Write the `measurementSeriesEnd` record. Fails with
    /// [`OutputError::SeriesEnded`] if the series was already ended.
    pub fn end(&self) -> Result<(), OutputError> {
        let mut state = self.lock();
        if state.ended {
            return Err(self.ended_error());
        }
        self.finish(&mut state)
    }

    /// Execute `body` and end the series afterwards, whatever the outcome.
    ///
    /// A body that ends the series itself is not an error.
    pub fn scope<F>(&self, body: F) -> Result<(), ScopeError>
    where
        F: FnOnce(&MeasurementSeries) -> Result<(), ScopeError>,
    {
        let guard = UnwindGuard::new(|| self.end_quietly());
        let outcome = body(self);
        drop(guard);

        match outcome {
            Ok(()) => {
                self.end_if_open()?;
                Ok(())
            }
            Err(error) => {
                self.end_quietly();
                Err(error)
            }
        }
    }

    fn emit(&self, payload: StepPayload) -> Result<(), OutputError> {
        let artifact = StepArtifact {
            id: self.step_id.clone(),
            payload,
        };
        self.emitter.emit(artifact).map(|_| ())
    }

    fn end_if_open(&self) -> Result<(), OutputError> {
        let mut state = self.lock();
        if state.ended {
            return Ok(());
        }
        self.finish(&mut state)
    }

    // caller holds the state lock
    fn finish(&self, state: &mut SeriesState) -> Result<(), OutputError> {
        self.emit(StepPayload::SeriesEnd(MeasurementSeriesEnd {
            series_id: self.series_id.clone(),
            total_count: state.next_index,
        }))?;
        state.ended = true;
        Ok(())
    }

    fn end_quietly(&self) {
        if let Err(error) = self.end_if_open() {
            warn!(series = %self.series_id, %error, "could not emit measurement series end");
        }
    }

    fn ended_error(&self) -> OutputError {
        OutputError::SeriesEnded {
            series_id: self.series_id.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SeriesState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
