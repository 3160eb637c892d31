// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use std::fmt::Display;

use super::ConfigurationError;

/**
The kind of compare-exchange pass a step performs.

Each phase has a stable numeric code so it can be handed to a shader uniform.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepPhase {
    ///No pending comparison.  Initial "previous step" and terminal "next step".
    #[default]
    None,
    ///Mirror pairing inside blocks that fit one workgroup.
    FlipLocal,
    ///Half pairing inside blocks that fit one workgroup.
    DisperseLocal,
    ///Mirror pairing inside blocks spanning several workgroups.
    FlipGlobal,
    ///Half pairing inside blocks spanning several workgroups.
    DisperseGlobal,
}

impl StepPhase {
    pub const fn code(self) -> u32 {
        match self {
            StepPhase::None => 0,
            StepPhase::FlipLocal => 1,
            StepPhase::DisperseLocal => 2,
            StepPhase::FlipGlobal => 3,
            StepPhase::DisperseGlobal => 4,
        }
    }

    pub const fn is_flip(self) -> bool {
        matches!(self, StepPhase::FlipLocal | StepPhase::FlipGlobal)
    }

    pub const fn is_disperse(self) -> bool {
        matches!(self, StepPhase::DisperseLocal | StepPhase::DisperseGlobal)
    }

    ///Whether all pairs of this phase stay inside one workgroup's range.
    pub const fn is_local(self) -> bool {
        matches!(self, StepPhase::FlipLocal | StepPhase::DisperseLocal)
    }

    pub const fn is_global(self) -> bool {
        matches!(self, StepPhase::FlipGlobal | StepPhase::DisperseGlobal)
    }
}

impl TryFrom<u32> for StepPhase {
    type Error = ConfigurationError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StepPhase::None),
            1 => Ok(StepPhase::FlipLocal),
            2 => Ok(StepPhase::DisperseLocal),
            3 => Ok(StepPhase::FlipGlobal),
            4 => Ok(StepPhase::DisperseGlobal),
            other => Err(ConfigurationError::UnknownPhaseCode(other)),
        }
    }
}

impl Display for StepPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepPhase::None => write!(f, "NONE"),
            StepPhase::FlipLocal => write!(f, "FLIP_LOCAL"),
            StepPhase::DisperseLocal => write!(f, "DISPERSE_LOCAL"),
            StepPhase::FlipGlobal => write!(f, "FLIP_GLOBAL"),
            StepPhase::DisperseGlobal => write!(f, "DISPERSE_GLOBAL"),
        }
    }
}
