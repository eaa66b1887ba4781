//! Shared fixtures for integration tests: synthetic bundles assembled
//! byte-for-byte through the documented wire layout, plus canonical
//! indicator strings.

#![allow(dead_code)]

use flate2::{write::ZlibEncoder, Compression};
use std::io::Write;

use pyscope::archive::CARCHIVE_MAGIC;

/// Webhook literal used across tests; matches the canonical service pattern.
pub const TEST_WEBHOOK: &str = "https://discord.com/api/webhooks/123456789/AbCdEfGh123";

/// A second distinct webhook for auxiliary-endpoint scenarios.
pub const TEST_WEBHOOK_ALT: &str = "https://discord.com/api/webhooks/987654321/ZyXwVu987";

pub fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Wrap a body in a compiled-bytecode header (3.7 magic).
pub fn make_pyc(body: &[u8]) -> Vec<u8> {
    let mut data = vec![0x42, 0x0D, 0x0D, 0x0A];
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(body);
    data
}

/// Builds synthetic embedded archives, including deliberately damaged ones.
///
/// The payload region always opens with an `MZ` stub so built archives
/// classify as executables, the same way real bundled droppers do.
pub struct ArchiveBuilder {
    payload: Vec<u8>,
    toc: Vec<u8>,
    overlay_override: Option<u32>,
}

impl ArchiveBuilder {
    pub fn new() -> ArchiveBuilder {
        ArchiveBuilder {
            payload: b"MZ\x90\x00\x03\x00\x00\x00".to_vec(),
            toc: Vec::new(),
            overlay_override: None,
        }
    }

    fn push_record(
        &mut self,
        name: &str,
        uncompressed: u32,
        offset: u32,
        compressed: u32,
        compression_flag: u8,
        type_flag: u8,
    ) {
        let record_len = 18 + name.len() as u32;
        self.toc.extend_from_slice(&record_len.to_be_bytes());
        self.toc.extend_from_slice(&uncompressed.to_be_bytes());
        self.toc.extend_from_slice(&offset.to_be_bytes());
        self.toc.extend_from_slice(&compressed.to_be_bytes());
        self.toc.push(compression_flag);
        self.toc.push(type_flag);
        self.toc.extend_from_slice(name.as_bytes());
    }

    /// Append an uncompressed entry.
    pub fn add_stored(mut self, name: &str, data: &[u8]) -> ArchiveBuilder {
        let offset = self.payload.len() as u32;
        self.payload.extend_from_slice(data);
        self.push_record(name, data.len() as u32, offset, data.len() as u32, 0, b'b');
        self
    }

    /// Append a zlib-compressed entry.
    pub fn add_deflated(mut self, name: &str, data: &[u8]) -> ArchiveBuilder {
        let compressed = zlib_compress(data);
        let offset = self.payload.len() as u32;
        self.payload.extend_from_slice(&compressed);
        self.push_record(
            name,
            data.len() as u32,
            offset,
            compressed.len() as u32,
            1,
            b'b',
        );
        self
    }

    /// Append an uncompressed entry with an explicit type flag.
    pub fn add_typed(mut self, name: &str, data: &[u8], type_flag: u8) -> ArchiveBuilder {
        let offset = self.payload.len() as u32;
        self.payload.extend_from_slice(data);
        self.push_record(
            name,
            data.len() as u32,
            offset,
            data.len() as u32,
            0,
            type_flag,
        );
        self
    }

    /// Append a record whose payload range lies outside the file.
    pub fn add_phantom(mut self, name: &str, offset: u32, compressed: u32) -> ArchiveBuilder {
        self.push_record(name, compressed, offset, compressed, 0, b'b');
        self
    }

    /// Append raw payload bytes with full control over the declared sizes and
    /// flags.
    pub fn add_raw(
        mut self,
        name: &str,
        raw: &[u8],
        uncompressed: u32,
        compression_flag: u8,
        type_flag: u8,
    ) -> ArchiveBuilder {
        let offset = self.payload.len() as u32;
        self.payload.extend_from_slice(raw);
        self.push_record(
            name,
            uncompressed,
            offset,
            raw.len() as u32,
            compression_flag,
            type_flag,
        );
        self
    }

    /// Append arbitrary bytes to the table of contents region.
    pub fn with_raw_toc_record(mut self, bytes: &[u8]) -> ArchiveBuilder {
        self.toc.extend_from_slice(bytes);
        self
    }

    /// Write this value as the trailer overlay length instead of the real one.
    pub fn with_overlay_size(mut self, overlay: u32) -> ArchiveBuilder {
        self.overlay_override = Some(overlay);
        self
    }

    /// Assemble the final archive bytes.
    pub fn build(self) -> Vec<u8> {
        let toc_len = self.toc.len() as u32;
        let overlay = self.overlay_override.unwrap_or(4 + toc_len);

        let mut data = self.payload;
        data.extend_from_slice(&toc_len.to_be_bytes());
        data.extend_from_slice(&self.toc);
        data.extend_from_slice(CARCHIVE_MAGIC);
        data.extend_from_slice(&overlay.to_be_bytes());
        data
    }
}

/// Wrap bytes in `levels` nested archives, innermost first.
pub fn nested_archive(levels: usize, innermost: &[u8]) -> Vec<u8> {
    let mut current = innermost.to_vec();
    for level in 0..levels {
        current = ArchiveBuilder::new()
            .add_stored(&format!("layer{level}.exe"), &current)
            .build();
    }
    current
}
