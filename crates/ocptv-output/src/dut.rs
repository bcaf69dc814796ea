//! Devices under test.
//!
//! A [`Dut`] accumulates platform, software and hardware descriptions until
//! a run starts and snapshots it. Software and hardware ids are derived as
//! `{dut_id}_{n}`, `n` counting earlier items of the same kind.

use std::sync::{Mutex, PoisonError};

use ocptv_core::{
    DutInfo, HardwareInfo, Metadata, PlatformInfo, SoftwareInfo, SoftwareType,
};
use tracing::debug;

#[derive(Debug, Default)]
struct Infos {
    platform: Vec<PlatformInfo>,
    software: Vec<SoftwareInfo>,
    hardware: Vec<HardwareInfo>,
}

/// Device under test. Info items may be added from several threads.
#[derive(Debug)]
pub struct Dut {
    id: String,
    name: Option<String>,
    metadata: Option<Metadata>,
    infos: Mutex<Infos>,
}

impl Dut {
    /// DUT with the given id and no info items.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            metadata: None,
            infos: Mutex::new(Infos::default()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// DUT id; info item ids are derived from it.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register platform information.
    pub fn add_platform_info(&self, info: impl Into<String>) -> PlatformInfo {
        let info = PlatformInfo { info: info.into() };
        self.lock().platform.push(info.clone());
        info
    }

    /// Register a software component. Its id is `{dut}_{n}` where `n` counts software items only.
    pub fn add_software_info(&self, spec: SoftwareSpec) -> SoftwareInfo {
        let mut infos = self.lock();
        let id = format!("{}_{}", self.id, infos.software.len());
        debug!(dut = %self.id, %id, "registered software info");
        let info = SoftwareInfo {
            id,
            name: spec.name,
            version: spec.version,
            revision: spec.revision,
            software_type: spec.software_type,
            computer_system: spec.computer_system,
        };
        infos.software.push(info.clone());
        info
    }

    /// Register a hardware component. Its id is `{dut}_{n}` where `n` counts hardware items only.
    pub fn add_hardware_info(&self, spec: HardwareSpec) -> HardwareInfo {
        let mut infos = self.lock();
        let id = format!("{}_{}", self.id, infos.hardware.len());
        debug!(dut = %self.id, %id, "registered hardware info");
        let info = HardwareInfo {
            id,
            name: spec.name,
            version: spec.version,
            revision: spec.revision,
            location: spec.location,
            serial_number: spec.serial_number,
            part_number: spec.part_number,
            manufacturer: spec.manufacturer,
            manufacturer_part_number: spec.manufacturer_part_number,
            odata_id: spec.odata_id,
            computer_system: spec.computer_system,
            manager: spec.manager,
        };
        infos.hardware.push(info.clone());
        info
    }

    /// Snapshot of everything registered so far.
    pub fn to_spec(&self) -> DutInfo {
        let infos = self.lock();
        DutInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            platform_infos: infos.platform.clone(),
            software_infos: infos.software.clone(),
            hardware_infos: infos.hardware.clone(),
            metadata: self.metadata.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Infos> {
        self.infos.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Description of a software component before it is given an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftwareSpec {
    pub name: String,
    pub software_type: Option<SoftwareType>,
    pub version: Option<String>,
    pub revision: Option<String>,
    pub computer_system: Option<String>,
}

impl SoftwareSpec {
    /// Software item with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn software_type(mut self, software_type: SoftwareType) -> Self {
        self.software_type = Some(software_type);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn computer_system(mut self, computer_system: impl Into<String>) -> Self {
        self.computer_system = Some(computer_system.into());
        self
    }
}

/// Description of a hardware component before it is given an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareSpec {
    pub name: String,
    pub version: Option<String>,
    pub revision: Option<String>,
    pub location: Option<String>,
    pub serial_number: Option<String>,
    pub part_number: Option<String>,
    pub manufacturer: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub odata_id: Option<String>,
    pub computer_system: Option<String>,
    pub manager: Option<String>,
}

impl HardwareSpec {
    /// Hardware item with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn part_number(mut self, part_number: impl Into<String>) -> Self {
        self.part_number = Some(part_number.into());
        self
    }

    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn manufacturer_part_number(mut self, number: impl Into<String>) -> Self {
        self.manufacturer_part_number = Some(number.into());
        self
    }

    pub fn odata_id(mut self, odata_id: impl Into<String>) -> Self {
        self.odata_id = Some(odata_id.into());
        self
    }

    pub fn computer_system(mut self, computer_system: impl Into<String>) -> Self {
        self.computer_system = Some(computer_system.into());
        self
    }

    pub fn manager(mut self, manager: impl Into<String>) -> Self {
        self.manager = Some(manager.into());
        self
    }
}
