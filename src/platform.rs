// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The virtual SBSA-like platform.
//!
//! Everything here is fixed by the contract with the virtual machine monitor:
//! where the hardware description is preloaded, how large it may be, how many
//! cores the machine can have, and where the boot console lives. The rest of
//! the platform is discovered at runtime from the description itself.

use crate::dtb::PlatformInfo;
#[cfg(not(test))]
use crate::{dtb, logger};
#[cfg(not(test))]
use arm_pl011_uart::{PL011Registers, Uart, UniqueMmioPointer};
#[cfg(not(test))]
use core::ptr::NonNull;
use spin::Once;

/// The number of CPU clusters the platform can expose.
const CLUSTER_COUNT: usize = 64;
/// The maximum number of CPUs in each cluster.
const MAX_CPUS_PER_CLUSTER: usize = 8;
/// The maximum number of CPU cores, fixing the capacity of the CPU topology.
pub const CORE_COUNT: usize = CLUSTER_COUNT * MAX_CPUS_PER_CLUSTER;

/// Physical address at which the VMM preloads the hardware description.
#[cfg(not(test))]
const PRELOADED_DTB_BASE: usize = 0x100_0000_0000;
/// Size of the window reserved for the hardware description.
#[cfg(not(test))]
const DTB_MAX_SIZE: usize = 0x20_0000;

/// Base address of the secure world PL011 UART.
#[cfg(not(test))]
const UART_BASE: usize = 0x6004_0000;
#[cfg(not(test))]
const PL011_BASE_ADDRESS: *mut PL011Registers = UART_BASE as _;

/// The log sink the boot console writes through.
#[cfg(not(test))]
pub type LogSinkImpl = logger::LockedWriter<Uart<'static>>;
/// The log sink the boot console writes through.
#[cfg(test)]
pub type LogSinkImpl = crate::logger::StdOutSink;

static PLATFORM_INFO: Once<PlatformInfo> = Once::new();

/// Initialises the boot console and performs platform discovery. This must be
/// called exactly once on the primary core, before the MMU is enabled (the
/// hardware description is read through the identity mapping) and before any
/// SMC can be dispatched.
///
/// Halts the boot stage if the hardware description cannot be read: no
/// service is ever reachable in that case.
#[cfg(not(test))]
pub fn init_before_mmu() {
    // SAFETY: `PL011_BASE_ADDRESS` is the base address of the secure PL011 device, and nothing
    // else accesses that address range.
    let uart_pointer = unsafe { UniqueMmioPointer::new(NonNull::new(PL011_BASE_ADDRESS).unwrap()) };
    logger::init(logger::LockedWriter::new(Uart::new(uart_pointer)))
        .expect("Failed to initialise logger");

    // SAFETY: The VMM guarantees the hardware description window at `PRELOADED_DTB_BASE`, the
    // window is identity mapped at this point of boot, and nothing writes to it for the lifetime
    // of the firmware stage.
    let blob = unsafe { core::slice::from_raw_parts(PRELOADED_DTB_BASE as *const u8, DTB_MAX_SIZE) };

    match dtb::parse(blob) {
        Ok(info) => {
            PLATFORM_INFO.call_once(|| info);
        }
        Err(e) => panic!("Invalid hardware description: {e}"),
    }
}

/// Returns the platform snapshot, or `None` if discovery has not completed.
pub fn platform_info() -> Option<&'static PlatformInfo> {
    PLATFORM_INFO.get()
}
