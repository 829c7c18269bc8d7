// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Platform-adaptation layer of an EL3 secure monitor for a virtual SBSA-like
//! Arm machine.
//!
//! The virtual machine monitor describes the hardware it emulates with a
//! minimal DeviceTree blob preloaded at a fixed physical address. During cold
//! boot, before the MMU is enabled, [`platform::init_before_mmu`] parses that
//! blob once and publishes an immutable [`dtb::PlatformInfo`] snapshot. From
//! then on the SiP runtime service answers Normal World SMC calls (platform
//! version, GIC base addresses, CPU topology) purely from the snapshot.

#![cfg_attr(not(test), no_std)]

pub mod debug;
pub mod dtb;
#[cfg(test)]
mod fake_dtb;
pub mod logger;
pub mod platform;
pub mod services;
pub mod smccc;
