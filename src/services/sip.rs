// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The SiP runtime service.
//!
//! Serves the information discovered from the VMM's hardware description to
//! the Normal World operating system. Every response is derived purely from
//! the [`PlatformInfo`] snapshot published during boot; no call mutates any
//! state and each call completes in constant work.

use crate::{
    dtb::PlatformInfo,
    services::{Service, World, owns},
    smccc::{FunctionId, INVALID_PARAMETER, NOT_SUPPORTED, OwningEntityNumber, SmcReturn},
};
use log::{error, info};
use num_enum::TryFromPrimitive;

/// The closed table of SiP calls this platform serves.
///
/// SMC64 fast calls in the SiP owning entity, `0xc200_0000 | n`. The values,
/// argument positions and response register ordering are a compatibility
/// contract with the Normal World OS.
#[derive(Copy, Clone, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum SipFunction {
    /// Version of the whole virtual hardware platform.
    ///
    /// This deliberately does not reuse `SMCCC_ARCH_SOC_ID`: the emulated SoC
    /// can change on its own, while the Normal World needs the version of the
    /// virtual platform as a whole.
    Version = 0xc200_0001,
    /// GIC distributor and redistributor base addresses.
    GetGic = 0xc200_0064,
    /// GIC ITS base address.
    GetGicIts = 0xc200_0065,
    /// Number of CPUs in the hardware description.
    GetCpuCount = 0xc200_00c8,
    /// NUMA node ID and MPIDR of the CPU at the index given in x1.
    GetCpuNode = 0xc200_00c9,
}

/// The SiP service. Holds a read-only handle on the platform snapshot.
pub struct Sip<'a> {
    info: &'a PlatformInfo,
}

impl Service for Sip<'_> {
    owns!(OwningEntityNumber::SIP);

    fn handle_non_secure_smc(&self, regs: &[u64; 18]) -> (SmcReturn, World) {
        (self.handle_smc(regs), World::NonSecure)
    }

    fn handle_secure_smc(&self, regs: &[u64; 18]) -> (SmcReturn, World) {
        // This interface exists solely to inform the Normal World OS. A
        // Secure World caller gets the generic unknown-SMC response no matter
        // which function it asked for.
        error!("wrong world SMC ({:#010x})", regs[0] as u32);
        (NOT_SUPPORTED.into(), World::Secure)
    }
}

impl<'a> Sip<'a> {
    /// Creates the service over the published platform snapshot.
    pub fn new(info: &'a PlatformInfo) -> Self {
        Self { info }
    }

    fn handle_smc(&self, regs: &[u64; 18]) -> SmcReturn {
        let mut function = FunctionId(regs[0] as u32);
        function.clear_sve_hint();

        match SipFunction::try_from(function.0) {
            Ok(SipFunction::Version) => {
                info!("Platform version requested");
                self.version()
            }
            Ok(SipFunction::GetGic) => self.gic(),
            Ok(SipFunction::GetGicIts) => self.gic_its(),
            Ok(SipFunction::GetCpuCount) => self.cpu_count(),
            Ok(SipFunction::GetCpuNode) => self.cpu_node(regs[1]),
            Err(_) => {
                error!("unhandled SMC ({function})");
                NOT_SUPPORTED.into()
            }
        }
    }

    fn version(&self) -> SmcReturn {
        let version = self.info.version;
        [0, version.major.into(), version.minor.into()].into()
    }

    fn gic(&self) -> SmcReturn {
        [0, self.info.gic.gicd_base, self.info.gic.gicr_base].into()
    }

    fn gic_its(&self) -> SmcReturn {
        [0, self.info.gic.its_base].into()
    }

    fn cpu_count(&self) -> SmcReturn {
        [0, self.info.cpus.count() as u64].into()
    }

    /// The bounds check is against the fixed topology capacity, not the
    /// discovered count: probing an index between the count and the capacity
    /// returns the zeroed default record rather than an error. See
    /// [`crate::dtb::CpuTopology::record`].
    fn cpu_node(&self, index: u64) -> SmcReturn {
        let record = usize::try_from(index)
            .ok()
            .and_then(|index| self.info.cpus.record(index));
        match record {
            Some(record) => [0, record.node_id.into(), record.mpidr].into(),
            None => INVALID_PARAMETER.into(),
        }
    }
}
