// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Builds flattened DeviceTree blobs for unit tests, so that descriptor
//! scenarios (missing nodes, partial properties, corrupted headers) can be
//! constructed without shipping binary fixtures.

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 1;
const FDT_END_NODE: u32 = 2;
const FDT_PROP: u32 = 3;
const FDT_END: u32 = 9;

const HEADER_SIZE: usize = 40;
const RSVMAP_SIZE: usize = 16;

/// An incremental writer for the structure block of a DTB.
///
/// Nodes are opened and closed explicitly; `build` assembles the final blob
/// with a well-formed header, an empty memory reservation block and the
/// accumulated strings block.
pub struct DtbBuilder {
    structs: Vec<u8>,
    strings: Vec<u8>,
}

impl DtbBuilder {
    pub fn new() -> Self {
        Self {
            structs: Vec::new(),
            strings: Vec::new(),
        }
    }

    /// Opens a node. The root node has the empty name.
    pub fn begin_node(&mut self, name: &str) {
        self.push_token(FDT_BEGIN_NODE);
        self.structs.extend_from_slice(name.as_bytes());
        self.structs.push(0);
        self.pad();
    }

    pub fn end_node(&mut self) {
        self.push_token(FDT_END_NODE);
    }

    pub fn prop_bytes(&mut self, name: &str, value: &[u8]) {
        let name_offset = self.string_offset(name);
        self.push_token(FDT_PROP);
        self.push_token(value.len() as u32);
        self.push_token(name_offset);
        self.structs.extend_from_slice(value);
        self.pad();
    }

    /// A single-cell property.
    pub fn prop_u32(&mut self, name: &str, value: u32) {
        self.prop_bytes(name, &value.to_be_bytes());
    }

    /// A two-cell property, as used for addresses under `#address-cells = <2>`.
    pub fn prop_u64(&mut self, name: &str, value: u64) {
        self.prop_bytes(name, &value.to_be_bytes());
    }

    /// A `reg`-style list of (address, size) ranges, two cells each.
    pub fn prop_ranges(&mut self, name: &str, ranges: &[(u64, u64)]) {
        let mut value = Vec::with_capacity(ranges.len() * 16);
        for (address, size) in ranges {
            value.extend_from_slice(&address.to_be_bytes());
            value.extend_from_slice(&size.to_be_bytes());
        }
        self.prop_bytes(name, &value);
    }

    /// Assembles the blob. All opened nodes must have been closed.
    pub fn build(&self) -> Vec<u8> {
        let mut structs = self.structs.clone();
        structs.extend_from_slice(&FDT_END.to_be_bytes());

        let off_dt_struct = HEADER_SIZE + RSVMAP_SIZE;
        let off_dt_strings = off_dt_struct + structs.len();
        let totalsize = off_dt_strings + self.strings.len();

        let header = [
            FDT_MAGIC,
            totalsize as u32,
            off_dt_struct as u32,
            off_dt_strings as u32,
            HEADER_SIZE as u32, // off_mem_rsvmap
            17,                 // version
            16,                 // last_comp_version
            0,                  // boot_cpuid_phys
            self.strings.len() as u32,
            structs.len() as u32,
        ];

        let mut blob = Vec::with_capacity(totalsize);
        for word in header {
            blob.extend_from_slice(&word.to_be_bytes());
        }
        // Empty memory reservation block: a single all-zero terminator entry.
        blob.extend_from_slice(&[0; RSVMAP_SIZE]);
        blob.extend_from_slice(&structs);
        blob.extend_from_slice(&self.strings);
        blob
    }

    fn push_token(&mut self, token: u32) {
        self.structs.extend_from_slice(&token.to_be_bytes());
    }

    fn pad(&mut self) {
        while self.structs.len() % 4 != 0 {
            self.structs.push(0);
        }
    }

    /// Returns the offset of `name` in the strings block, interning it on
    /// first use.
    fn string_offset(&mut self, name: &str) -> u32 {
        let mut offset = 0;
        while offset < self.strings.len() {
            let end = offset
                + self.strings[offset..]
                    .iter()
                    .position(|&b| b == 0)
                    .expect("strings block entries are NUL-terminated");
            if &self.strings[offset..end] == name.as_bytes() {
                return offset as u32;
            }
            offset = end + 1;
        }

        let offset = self.strings.len();
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        offset as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_blob_parses() {
        let mut dtb = DtbBuilder::new();
        dtb.begin_node("");
        dtb.prop_u32("#address-cells", 2);
        dtb.prop_u32("#size-cells", 2);
        dtb.begin_node("uart@9000000");
        dtb.prop_ranges("reg", &[(0x900_0000, 0x1000)]);
        dtb.end_node();
        dtb.end_node();
        let blob = dtb.build();

        let fdt = fdt::Fdt::new(&blob).unwrap();
        let uart = fdt.find_node("/uart@9000000").unwrap();
        let range = uart.reg().unwrap().next().unwrap();
        assert_eq!(range.starting_address as u64, 0x900_0000);
        assert_eq!(range.size, Some(0x1000));
    }

    #[test]
    fn property_names_are_interned() {
        let mut dtb = DtbBuilder::new();
        dtb.begin_node("");
        dtb.prop_u32("#address-cells", 2);
        dtb.begin_node("a");
        dtb.prop_u32("#address-cells", 1);
        dtb.end_node();
        dtb.end_node();

        // "#address-cells\0" stored once.
        assert_eq!(dtb.strings.len(), "#address-cells".len() + 1);
    }
}
