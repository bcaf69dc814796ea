use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parse failure for a wire enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {type_name} value '{value}'")]
pub struct UnknownVariant {
    pub type_name: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire spelling.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                match input {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        type_name: stringify!($name),
                        value: input.to_owned(),
                    }),
                }
            }
        }

        impl $crate::record::ToNode for $name {
            fn to_node(&self) -> $crate::record::Node<'_> {
                $crate::record::Node::Enum {
                    type_name: stringify!($name),
                    value: self.as_str(),
                }
            }
        }
    };
}

wire_enum! {
    /// Severity of a log artifact.
    LogSeverity {
        Debug => "DEBUG",
        Info => "INFO",
        Warning => "WARNING",
        Error => "ERROR",
        Fatal => "FATAL",
    }
}

wire_enum! {
    /// Outcome class of a diagnosis.
    DiagnosisType {
        Pass => "PASS",
        Fail => "FAIL",
        Unknown => "UNKNOWN",
    }
}

wire_enum! {
    /// Terminal status of a run or step.
    TestStatus {
        Complete => "COMPLETE",
        Error => "ERROR",
        Skip => "SKIP",
    }
}

wire_enum! {
    /// Overall result of a run.
    TestResult {
        Pass => "PASS",
        Fail => "FAIL",
        NotApplicable => "NOT_APPLICABLE",
    }
}

wire_enum! {
    SoftwareType {
        Unspecified => "UNSPECIFIED",
        Firmware => "FIRMWARE",
        System => "SYSTEM",
        Application => "APPLICATION",
    }
}

wire_enum! {
    SubcomponentType {
        Unspecified => "UNSPECIFIED",
        Asic => "ASIC",
        AsicSubsystem => "ASIC-SUBSYSTEM",
        Bus => "BUS",
        Function => "FUNCTION",
        Connector => "CONNECTOR",
    }
}

wire_enum! {
    /// Comparison operator of a measurement validator.
    ///
    /// `InSet` and `NotInSet` expect a list value; every other operator
    /// compares against a single primitive.
    ValidatorType {
        Equal => "EQUAL",
        NotEqual => "NOT_EQUAL",
        LessThan => "LESS_THAN",
        LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        GreaterThan => "GREATER_THAN",
        GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
        RegexMatch => "REGEX_MATCH",
        RegexNoMatch => "REGEX_NO_MATCH",
        InSet => "IN_SET",
        NotInSet => "NOT_IN_SET",
    }
}

impl ValidatorType {
    /// Whether the operator compares against a set of values.
    pub const fn expects_set(self) -> bool {
        matches!(self, Self::InSet | Self::NotInSet)
    }
}
