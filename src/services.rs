// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! SMC dispatch.
//!
//! The execution environment serialises SMC calls at the EL3 boundary, so
//! exactly one call is ever being serviced at a time and the dispatch path
//! needs no locking: it only reads the platform snapshot published during
//! boot.

pub mod sip;

use crate::{
    platform,
    smccc::{FunctionId, NOT_SUPPORTED, SmcReturn},
};
use spin::Lazy;

/// The security state an SMC originated from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum World {
    /// The call trapped from the Normal World.
    NonSecure,
    /// The call trapped from the Secure World.
    Secure,
}

/// Helper macro to define the range of SMC function ID values covered by a service
#[macro_export]
macro_rules! owns {
    // service handles the entire Owning Entity Number (OEN)
    ($owning_entity:expr) => {
        #[inline(always)]
        fn owns(&self, function: $crate::smccc::FunctionId) -> bool {
            function.oen() == $owning_entity
                && matches!(
                    function.call_type(),
                    $crate::smccc::SmcccCallType::Fast32 | $crate::smccc::SmcccCallType::Fast64
                )
        }
    };
}
pub(crate) use owns;

/// A service which handles some range of SMC calls.
///
/// According to SMCCC v1.3+ the implementation must disregard the SVE hint bit in the function ID
/// and consider it to be 0 for the purpose of function identification.
pub trait Service {
    /// Returns whether this service is intended to handle the given function ID.
    fn owns(&self, function: FunctionId) -> bool;

    /// Handles the given SMC call from Normal World.
    fn handle_non_secure_smc(&self, _regs: &[u64; 18]) -> (SmcReturn, World) {
        (NOT_SUPPORTED.into(), World::NonSecure)
    }

    /// Handles the given SMC call from Secure World.
    fn handle_secure_smc(&self, _regs: &[u64; 18]) -> (SmcReturn, World) {
        (NOT_SUPPORTED.into(), World::Secure)
    }
}

static SERVICES: Lazy<Services> = Lazy::new(Services::new);

/// Contains an instance of all of the currently implemented services.
pub struct Services {
    /// The SiP platform service.
    pub sip: sip::Sip<'static>,
}

impl Services {
    /// Returns a reference to the global Services instance.
    ///
    /// Also, initializes it if it hasn't been initialized yet. Platform
    /// discovery must have completed by then; reaching the dispatcher with no
    /// published snapshot is a boot-sequence bug.
    pub fn get() -> &'static Self {
        &SERVICES
    }

    fn new() -> Self {
        Self {
            sip: sip::Sip::new(
                platform::platform_info()
                    .expect("platform discovery must complete before services are reachable"),
            ),
        }
    }

    /// Routes one SMC to the service owning its function ID and returns the
    /// result registers along with the world to resume.
    pub fn handle_smc(&self, regs: &[u64; 18], world: World) -> (SmcReturn, World) {
        let function = FunctionId(regs[0] as u32);

        if !function.valid() {
            return (NOT_SUPPORTED.into(), world);
        }

        if self.sip.owns(function) {
            match world {
                World::NonSecure => self.sip.handle_non_secure_smc(regs),
                World::Secure => self.sip.handle_secure_smc(regs),
            }
        } else {
            (NOT_SUPPORTED.into(), world)
        }
    }
}
