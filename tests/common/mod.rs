//! Shared test helpers: an in-memory zip writer and listing pages.

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

struct Member {
    name: String,
    data: Vec<u8>,
    method: u16,
    crc: Option<u32>,
    /// Uncompressed size to record instead of the real one.
    declared_size: Option<u32>,
    /// Compressed size to record through a ZIP64 extra field.
    zip64_compressed: Option<u64>,
}

/// Writes small single-disk zip archives.
#[derive(Default)]
pub struct ZipBuilder {
    members: Vec<Member>,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.member(name, data, METHOD_STORED, None)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.member(name, data, METHOD_DEFLATE, None)
    }

    pub fn directory(self, name: &str) -> Self {
        self.member(name, b"", METHOD_STORED, None)
    }

    /// Stored member whose recorded CRC-32 is wrong.
    pub fn corrupt(self, name: &str, data: &[u8]) -> Self {
        let bad = crc32fast::hash(data) ^ 0xFFFF_FFFF;
        self.member(name, data, METHOD_STORED, Some(bad))
    }

    /// Stored bytes labelled with an arbitrary compression method.
    pub fn with_method(self, name: &str, data: &[u8], method: u16) -> Self {
        self.member(name, data, method, None)
    }

    /// Deflated member whose recorded uncompressed size is `declared`.
    pub fn deflated_claiming(mut self, name: &str, data: &[u8], declared: u32) -> Self {
        self = self.member(name, data, METHOD_DEFLATE, None);
        if let Some(m) = self.members.last_mut() {
            m.declared_size = Some(declared);
        }
        self
    }

    /// Stored member whose central directory entry routes its compressed
    /// size through a ZIP64 extra field holding `compressed`.
    pub fn zip64_compressed(mut self, name: &str, data: &[u8], compressed: u64) -> Self {
        self = self.member(name, data, METHOD_STORED, None);
        if let Some(m) = self.members.last_mut() {
            m.zip64_compressed = Some(compressed);
        }
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    fn member(mut self, name: &str, data: &[u8], method: u16, crc: Option<u32>) -> Self {
        self.members.push(Member {
            name: name.to_string(),
            data: data.to_vec(),
            method,
            crc,
            declared_size: None,
            zip64_compressed: None,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for m in &self.members {
            let payload = if m.method == METHOD_DEFLATE {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(&m.data).unwrap();
                enc.finish().unwrap()
            } else {
                m.data.clone()
            };
            let crc = m.crc.unwrap_or_else(|| crc32fast::hash(&m.data));
            let offset = out.len() as u32;
            let uncompressed = m.declared_size.unwrap_or(m.data.len() as u32);
            let extra: Vec<u8> = match m.zip64_compressed {
                Some(size) => {
                    let mut extra = Vec::new();
                    extra.write_u16::<LittleEndian>(0x0001).unwrap();
                    extra.write_u16::<LittleEndian>(8).unwrap();
                    extra.write_u64::<LittleEndian>(size).unwrap();
                    extra
                }
                None => Vec::new(),
            };
            let cd_compressed = match m.zip64_compressed {
                Some(_) => 0xFFFF_FFFF,
                None => payload.len() as u32,
            };

            out.write_all(b"PK\x03\x04").unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(m.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0x21).unwrap();
            out.write_u32::<LittleEndian>(crc).unwrap();
            out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(uncompressed).unwrap();
            out.write_u16::<LittleEndian>(m.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_all(m.name.as_bytes()).unwrap();
            out.write_all(&payload).unwrap();

            central.write_all(b"PK\x01\x02").unwrap();
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(m.method).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0x21).unwrap();
            central.write_u32::<LittleEndian>(crc).unwrap();
            central.write_u32::<LittleEndian>(cd_compressed).unwrap();
            central.write_u32::<LittleEndian>(uncompressed).unwrap();
            central.write_u16::<LittleEndian>(m.name.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(offset).unwrap();
            central.write_all(m.name.as_bytes()).unwrap();
            central.write_all(&extra).unwrap();
        }

        let cd_offset = out.len() as u32;
        out.write_all(&central).unwrap();

        out.write_all(b"PK\x05\x06").unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(self.members.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(self.members.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(central.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.write_all(&self.comment).unwrap();
        out
    }
}

/// An Apache-style index page linking each of `names`.
pub fn listing(names: &[&str]) -> String {
    let mut html = String::from(
        "<!DOCTYPE HTML><html><body><h1>Index of /feeds</h1><table>\
         <tr><th>Name</th><th>Last modified</th><th>Size</th></tr>\
         <tr><td><a href=\"/\">Parent Directory</a></td><td>&nbsp;</td><td>-</td></tr>",
    );
    for name in names {
        html.push_str(&format!(
            "<tr><td><a href=\"{name}\">{name}</a></td><td>01-Jan-2024 00:00</td><td>1.0M</td></tr>"
        ));
    }
    html.push_str("</table></body></html>");
    html
}

/// Number of entries left in a directory.
pub fn file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
