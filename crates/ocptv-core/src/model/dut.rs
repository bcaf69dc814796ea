use crate::record::{Field, TypeDesc};

use super::enums::{SoftwareType, SubcomponentType};
use super::{Metadata, METADATA, OPTIONAL_STR};

/// Free-form description of the platform a DUT runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformInfo {
    pub info: String,
}

const PLATFORM_INFO_FIELDS: &[Field] = &[Field::wire("info", "info", TypeDesc::Str)];

impl_record!(PlatformInfo, Some("platformInfo"), PLATFORM_INFO_FIELDS, [info]);

/// Software component of a DUT. `id` is assigned by the owning DUT.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareInfo {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub revision: Option<String>,
    pub software_type: Option<SoftwareType>,
    pub computer_system: Option<String>,
}

const SOFTWARE_INFO_FIELDS: &[Field] = &[
    Field::wire("id", "softwareInfoId", TypeDesc::Str),
    Field::wire("name", "name", TypeDesc::Str),
    Field::wire("version", "version", OPTIONAL_STR),
    Field::wire("revision", "revision", OPTIONAL_STR),
    Field::wire(
        "software_type",
        "softwareType",
        TypeDesc::Optional(&TypeDesc::Enum("SoftwareType")),
    ),
    Field::wire("computer_system", "computerSystem", OPTIONAL_STR),
];

impl_record!(
    SoftwareInfo,
    Some("softwareInfo"),
    SOFTWARE_INFO_FIELDS,
    [id, name, version, revision, software_type, computer_system]
);

/// Hardware component of a DUT. `id` is assigned by the owning DUT.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareInfo {
    pub id: String,
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

const HARDWARE_INFO_FIELDS: &[Field] = &[
    Field::wire("id", "hardwareInfoId", TypeDesc::Str),
    Field::wire("name", "name", TypeDesc::Str),
    Field::wire("version", "version", OPTIONAL_STR),
    Field::wire("revision", "revision", OPTIONAL_STR),
    Field::wire("location", "location", OPTIONAL_STR),
    Field::wire("serial_number", "serialNumber", OPTIONAL_STR),
    Field::wire("part_number", "partNumber", OPTIONAL_STR),
    Field::wire("manufacturer", "manufacturer", OPTIONAL_STR),
    Field::wire(
        "manufacturer_part_number",
        "manufacturerPartNumber",
        OPTIONAL_STR,
    ),
    Field::wire("odata_id", "odataId", OPTIONAL_STR),
    Field::wire("computer_system", "computerSystem", OPTIONAL_STR),
    Field::wire("manager", "manager", OPTIONAL_STR),
];

impl_record!(
    HardwareInfo,
    Some("hardwareInfo"),
    HARDWARE_INFO_FIELDS,
    [
        id,
        name,
        version,
        revision,
        location,
        serial_number,
        part_number,
        manufacturer,
        manufacturer_part_number,
        odata_id,
        computer_system,
        manager,
    ]
);

/// Part of a hardware component below FRU granularity. Not referenceable by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Subcomponent {
    pub subcomponent_type: Option<SubcomponentType>,
    pub name: String,
    pub location: Option<String>,
    pub version: Option<String>,
    pub revision: Option<String>,
}

impl Subcomponent {
    /// Subcomponent with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            subcomponent_type: None,
            name: name.into(),
            location: None,
            version: None,
            revision: None,
        }
    }

    pub fn with_type(mut self, subcomponent_type: SubcomponentType) -> Self {
        self.subcomponent_type = Some(subcomponent_type);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

const SUBCOMPONENT_FIELDS: &[Field] = &[
    Field::wire(
        "subcomponent_type",
        "type",
        TypeDesc::Optional(&TypeDesc::Enum("SubcomponentType")),
    ),
    Field::wire("name", "name", TypeDesc::Str),
    Field::wire("location", "location", OPTIONAL_STR),
    Field::wire("version", "version", OPTIONAL_STR),
    Field::wire("revision", "revision", OPTIONAL_STR),
];

impl_record!(
    Subcomponent,
    Some("subcomponent"),
    SUBCOMPONENT_FIELDS,
    [subcomponent_type, name, location, version, revision]
);

/// Snapshot of a DUT as embedded in the run start record.
#[derive(Debug, Clone, PartialEq)]
pub struct DutInfo {
    pub id: String,
    pub name: Option<String>,
    pub platform_infos: Vec<PlatformInfo>,
    pub software_infos: Vec<SoftwareInfo>,
    pub hardware_infos: Vec<HardwareInfo>,
    pub metadata: Option<Metadata>,
}

const DUT_INFO_FIELDS: &[Field] = &[
    Field::wire("id", "dutInfoId", TypeDesc::Str),
    Field::wire("name", "name", OPTIONAL_STR),
    Field::wire(
        "platform_infos",
        "platformInfos",
        TypeDesc::List(Some(&TypeDesc::Record("PlatformInfo"))),
    ),
    Field::wire(
        "software_infos",
        "softwareInfos",
        TypeDesc::List(Some(&TypeDesc::Record("SoftwareInfo"))),
    ),
    Field::wire(
        "hardware_infos",
        "hardwareInfos",
        TypeDesc::List(Some(&TypeDesc::Record("HardwareInfo"))),
    ),
    Field::wire("metadata", "metadata", METADATA),
];

impl_record!(
    DutInfo,
    Some("dutInfo"),
    DUT_INFO_FIELDS,
    [id, name, platform_infos, software_infos, hardware_infos, metadata]
);
