// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Discovery of the hardware description passed by the virtual machine monitor.
//!
//! The VMM describes the platform it emulates with a minimal DeviceTree. This
//! is not a Linux DeviceTree, nor a firmware DeviceTree: it carries only the
//! information a physical platform would have other mechanisms to discover at
//! runtime, and which is affected by the VMM command line — the platform
//! version, the interrupt controller layout and the CPU topology.
//!
//! Discovery runs exactly once during cold boot, before the MMU is enabled, so
//! the blob is read through the identity mapping. The result is an immutable
//! [`PlatformInfo`] snapshot; nothing in this module is ever mutated after
//! [`parse`] returns.

use crate::platform::CORE_COUNT;
use arrayvec::ArrayVec;
use core::fmt::{self, Display, Formatter};
use fdt::{Fdt, FdtError};
use log::{error, info, warn};

/// The version of the virtual hardware platform, as reported by the VMM.
///
/// This is deliberately not the SoC version: the emulated SoC can change on
/// its own, while this tracks the whole virtual platform.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PlatformVersion {
    /// Major version, 0 if the description does not carry one.
    pub major: u32,
    /// Minor version, 0 if the description does not carry one.
    pub minor: u32,
}

/// Base addresses of the GIC register regions described by the VMM.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GicLayout {
    /// Base address of the distributor.
    pub gicd_base: u64,
    /// Base address of the first redistributor frame.
    pub gicr_base: u64,
    /// Base address of the ITS, or 0 if the platform has none.
    pub its_base: u64,
}

/// Per-CPU information read from one `cpu@N` node.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CpuRecord {
    /// NUMA node the CPU belongs to. The VMM only emits `numa-node-id` when a
    /// NUMA configuration is in use, so this defaults to 0.
    pub node_id: u32,
    /// MPIDR affinity value of the CPU.
    pub mpidr: u64,
}

/// The discovered CPU topology: a bounded sequence of [`CpuRecord`]s in
/// DeviceTree document order.
#[derive(Clone, Debug, Default)]
pub struct CpuTopology {
    records: ArrayVec<CpuRecord, CORE_COUNT>,
}

impl CpuTopology {
    /// The compile-time maximum number of cores the platform supports.
    pub const CAPACITY: usize = CORE_COUNT;

    /// Returns the number of CPUs found in the hardware description.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Returns the record for the given CPU index.
    ///
    /// Returns `None` only for indices at or beyond [`Self::CAPACITY`]. An
    /// index within capacity but beyond the discovered count yields a zeroed
    /// default record: callers probing the full index space observe default
    /// data rather than an error, matching what the fixed-size topology array
    /// holds for cores that were never described.
    pub fn record(&self, index: usize) -> Option<CpuRecord> {
        if index < Self::CAPACITY {
            Some(self.records.get(index).copied().unwrap_or_default())
        } else {
            None
        }
    }
}

/// Everything discovered from the hardware description.
///
/// Built once by [`parse`] and published by the platform code behind a
/// one-shot barrier; the runtime service only ever holds a shared reference.
#[derive(Clone, Debug, Default)]
pub struct PlatformInfo {
    /// Virtual platform version.
    pub version: PlatformVersion,
    /// Interrupt controller layout.
    pub gic: GicLayout,
    /// CPU topology.
    pub cpus: CpuTopology,
}

/// A fatal error found while reading the hardware description.
///
/// Any of these aborts discovery outright; the boot stage cannot continue
/// with a half-read description.
#[derive(Clone, Copy, Debug)]
pub enum DtbError {
    /// The blob failed structural validation (bad magic, truncated, ...).
    Invalid(FdtError),
    /// The description carries no `/cpus` node, so the CPU set is unknown.
    CpusMissing,
}

impl Display for DtbError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "invalid DeviceTree blob: {e:?}"),
            Self::CpusMissing => write!(f, "no information about cpus in DeviceTree"),
        }
    }
}

/// Parses the hardware description and returns the platform snapshot.
///
/// `blob` must cover the platform's reserved descriptor window; the total
/// size recorded in the blob header is validated against it.
///
/// Optional information (platform version, interrupt controller, ITS) that is
/// missing from the description is substituted with defaults and the rest of
/// discovery continues. A structurally invalid blob or a missing `/cpus` node
/// is an error; no partial snapshot is returned.
pub fn parse(blob: &[u8]) -> Result<PlatformInfo, DtbError> {
    let fdt = Fdt::new(blob).map_err(DtbError::Invalid)?;

    let version = read_platform_version(&fdt);
    info!("Platform version: {}.{}", version.major, version.minor);

    Ok(PlatformInfo {
        version,
        gic: read_gic_layout(&fdt),
        cpus: read_cpu_topology(&fdt)?,
    })
}

fn read_platform_version(fdt: &Fdt) -> PlatformVersion {
    let read = |name| {
        fdt.root()
            .property(name)
            .and_then(|prop| prop.as_usize())
            .unwrap_or(0) as u32
    };

    PlatformVersion {
        major: read("machine-version-major"),
        minor: read("machine-version-minor"),
    }
}

/// Reads the `/intc` node, e.g.:
///
/// ```text
/// intc {
///     reg = < 0x00 0x40060000 0x00 0x10000
///             0x00 0x40080000 0x00 0x4000000>;
///     its {
///         reg = <0x00 0x44081000 0x00 0x20000>;
///     };
/// };
/// ```
///
/// Reading the interrupt controller is best-effort: some boot configurations
/// omit the node entirely, and a partially readable `reg` leaves the layout
/// unset rather than failing discovery.
fn read_gic_layout(fdt: &Fdt) -> GicLayout {
    let mut gic = GicLayout::default();

    let Some(intc) = fdt.find_node("/intc") else {
        return gic;
    };
    if intc.property("reg").is_none() {
        return gic;
    }

    let mut ranges = intc.reg().into_iter().flatten();
    let Some(gicd) = ranges.next() else {
        error!("Failed to read GICD reg property of GIC node");
        return gic;
    };
    info!("GICD base = {:#x}", gicd.starting_address as u64);

    let Some(gicr) = ranges.next() else {
        error!("Failed to read GICR reg property of GIC node");
        return gic;
    };
    info!("GICR base = {:#x}", gicr.starting_address as u64);

    gic.gicd_base = gicd.starting_address as u64;
    gic.gicr_base = gicr.starting_address as u64;

    let Some(its) = fdt.find_node("/intc/its") else {
        return gic;
    };
    match its.reg().and_then(|mut ranges| ranges.next()) {
        Some(range) => {
            gic.its_base = range.starting_address as u64;
            info!("GICI base = {:#x}", gic.its_base);
        }
        None => error!("Failed to read GICI reg property of GIC node"),
    }

    gic
}

/// Reads the `/cpus` node, e.g.:
///
/// ```text
/// cpus {
///     #size-cells = <0x00>;
///     #address-cells = <0x02>;
///
///     cpu@0 {
///         numa-node-id = <0x00>;
///         reg = <0x00 0x00>;
///     };
///
///     cpu@1 {
///         numa-node-id = <0x03>;
///         reg = <0x00 0x01>;
///     };
/// };
/// ```
///
/// A missing `/cpus` node is fatal: the boot stage cannot continue without
/// knowing its CPU set.
fn read_cpu_topology(fdt: &Fdt) -> Result<CpuTopology, DtbError> {
    let Some(cpus) = fdt.find_node("/cpus") else {
        error!("No information about cpus in DeviceTree.");
        return Err(DtbError::CpusMissing);
    };

    let mut topology = CpuTopology::default();
    let mut dropped = 0usize;

    // The VMM numbers CPUs from 0, and a /cpus/cpu-map grouping node may
    // appear before them, so the walk starts at cpu@0 rather than at the
    // first child.
    let nodes = cpus.children().skip_while(|node| node.name != "cpu@0");
    for (index, node) in nodes.enumerate() {
        let record = CpuRecord {
            node_id: node
                .property("numa-node-id")
                .and_then(|prop| prop.as_usize())
                .unwrap_or(0) as u32,
            mpidr: node
                .property("reg")
                .and_then(|prop| prop.as_usize())
                .unwrap_or(0) as u64,
        };

        if topology.records.try_push(record).is_err() {
            dropped += 1;
            continue;
        }
        info!("CPU {}: node-id: {}, mpidr: {}", index, record.node_id, record.mpidr);
    }

    if dropped > 0 {
        warn!(
            "Ignoring {} CPU nodes beyond the {} supported cores",
            dropped,
            CpuTopology::CAPACITY
        );
    }
    info!("Found {} cpus", topology.count());

    Ok(topology)
}
