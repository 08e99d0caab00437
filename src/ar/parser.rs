//! Unix `ar(5)` archive header parsing.
//!
//! Translated field-for-field from the reference Python scanner: magic
//! check, fixed 60-byte headers, POSIX symbol table / GNU long-name table
//! / BSD long name / thin-archive special cases. `.deb` files need no
//! special handling — they are plain GNU-variant AR archives and fall out
//! of this parser unchanged.

use std::io::{Read, Seek, SeekFrom};

use crate::error::ArParseError;
use crate::model::libc_s_ifmt;

const HEADER_SIZE: usize = 60;

#[derive(Debug, Clone)]
pub struct RawEntry {
    pub header_offset: u64,
    pub data_offset: u64,
    pub size: u64,
    pub mtime: i64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub name: Vec<u8>,
    pub linkname: Vec<u8>,
    pub is_symlink: bool,
}

enum LongNames {
    Gnu(Vec<Vec<u8>>),
    Thin(Vec<u8>),
}

pub fn parse_ar_archive<R: Read + Seek>(stream: &mut R) -> Result<Vec<RawEntry>, ArParseError> {
    let mut magic = [0u8; 8];
    stream.read_exact(&mut magic)?;
    let is_thin = magic == *b"!<thin>\n";
    if magic != *b"!<arch>\n" && !is_thin {
        return Err(ArParseError::BadMagic(magic.to_vec()));
    }

    let mut entries: Vec<RawEntry> = Vec::new();
    let mut long_names: Option<LongNames> = None;

    loop {
        let header_offset = stream.stream_position()?;
        let mut header = [0u8; HEADER_SIZE];
        let read = read_fully_or_eof(stream, &mut header)?;
        if read == 0 {
            break;
        }
        if read < HEADER_SIZE {
            return Err(ArParseError::IncompleteHeader {
                offset: header_offset,
                len: read,
            });
        }

        let end = &header[58..60];
        if end != b"`\n" {
            return Err(ArParseError::BadTerminator {
                offset: header_offset,
                bytes: [end[0], end[1]],
            });
        }

        let name_field = trim_trailing(&header[0..16], &[b' ', 0]).to_vec();
        let mtime = parse_int(&header[16..28], 10, "mtime")? as i64;
        let uid = parse_int(&header[28..34], 10, "uid")? as u32;
        let gid = parse_int(&header[34..40], 10, "gid")? as u32;
        let mut mode = parse_int(&header[40..48], 8, "mode")? as u32;
        if mode == 0 {
            mode = 0o660;
        }
        mode |= libc_s_ifmt::S_IFREG;
        if is_thin {
            mode |= libc_s_ifmt::S_IFLNK;
        }
        let declared_size = parse_int(&header[48..58], 10, "size")?;

        let offset_after_header = stream.stream_position()?;

        if name_field == b"/" {
            let skip = declared_size + declared_size % 2;
            stream.seek(SeekFrom::Current(skip as i64))?;
            continue;
        }

        if name_field == b"//" {
            if is_thin {
                let mut buf = vec![0u8; declared_size as usize];
                stream.read_exact(&mut buf)?;
                long_names = Some(LongNames::Thin(buf));
            } else {
                let mut buf = vec![0u8; declared_size as usize];
                stream.read_exact(&mut buf)?;
                let mut parts = split_on(&buf, b"/\n");
                if declared_size % 2 == 0 {
                    if let Some(last) = parts.last() {
                        if last.as_slice() == b"\x60" || last.as_slice() == b"\x0a" {
                            parts.pop();
                        }
                    }
                } else {
                    stream.seek(SeekFrom::Current((declared_size % 2) as i64))?;
                }
                long_names = Some(LongNames::Gnu(parts));
            }

            for entry in entries.iter_mut() {
                if is_thin {
                    entry.linkname = get_long_file_name(&entry.name, &long_names, is_thin);
                } else {
                    entry.name = get_long_file_name(&entry.name, &long_names, is_thin);
                }
            }
            continue;
        }

        let mut name = name_field;
        let mut data_offset = offset_after_header;
        let mut stored_size = declared_size;

        if name.starts_with(b"#1/") {
            let name_size: usize = std::str::from_utf8(&name[3..])
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ArParseError::BadNumericField {
                    field: "bsd_name_len",
                    value: name.clone(),
                })?;
            let mut namebuf = vec![0u8; name_size];
            let got = stream.read(&mut namebuf)?;
            if got != name_size {
                return Err(ArParseError::TruncatedLongName {
                    expected: name_size,
                    got,
                });
            }
            name = namebuf;
            data_offset += name_size as u64;
            stored_size = stored_size.saturating_sub(name_size as u64);
        }

        let mut linkname = Vec::new();
        if long_names.is_some() {
            if is_thin {
                linkname = get_long_file_name(&name, &long_names, is_thin);
            } else {
                name = get_long_file_name(&name, &long_names, is_thin);
            }
        }

        // llvm-ar -r --format=bsd pads names with stray NUL bytes.
        let name = trim_trailing(&name, &[0]).to_vec();

        entries.push(RawEntry {
            header_offset,
            data_offset,
            size: stored_size,
            mtime,
            uid,
            gid,
            mode,
            name,
            linkname,
            is_symlink: is_thin,
        });

        if is_thin {
            stream.seek(SeekFrom::Start(offset_after_header))?;
            continue;
        }

        stream.seek(SeekFrom::Start(
            offset_after_header + declared_size + declared_size % 2,
        ))?;
    }

    Ok(entries)
}

fn get_long_file_name(name: &[u8], long_names: &Option<LongNames>, is_thin: bool) -> Vec<u8> {
    if !(name.first() == Some(&b'/') && name.len() > 1 && name[1..].iter().all(u8::is_ascii_digit)) {
        return name.to_vec();
    }
    let index: usize = match std::str::from_utf8(&name[1..]).ok().and_then(|s| s.parse().ok()) {
        Some(i) => i,
        None => return name.to_vec(),
    };
    match long_names {
        Some(LongNames::Gnu(table)) if !is_thin => {
            if index < table.len() {
                table[index].clone()
            } else {
                name.to_vec()
            }
        }
        Some(LongNames::Thin(buf)) if is_thin => {
            if index < buf.len() {
                if let Some(rel) = find_subsequence(&buf[index..], b"/\n") {
                    return buf[index..index + rel].to_vec();
                }
            }
            name.to_vec()
        }
        _ => name.to_vec(),
    }
}

fn split_on(haystack: &[u8], needle: &[u8]) -> Vec<Vec<u8>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            parts.push(haystack[start..i].to_vec());
            i += needle.len();
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(haystack[start..].to_vec());
    parts
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn trim_trailing<'a>(field: &'a [u8], strip: &[u8]) -> &'a [u8] {
    let end = field
        .iter()
        .rposition(|b| !strip.contains(b))
        .map(|p| p + 1)
        .unwrap_or(0);
    &field[..end]
}

fn trim_spaces(field: &[u8]) -> &[u8] {
    let start = field.iter().position(|&b| b != b' ').unwrap_or(field.len());
    let end = field.iter().rposition(|&b| b != b' ').map(|p| p + 1).unwrap_or(0);
    if start >= end {
        &[]
    } else {
        &field[start..end]
    }
}

fn parse_int(field: &[u8], base: u32, name: &'static str) -> Result<u64, ArParseError> {
    validate_decimal_field(field, name)?;
    let trimmed = trim_spaces(field);
    if trimmed.is_empty() {
        return Ok(0);
    }
    let s = std::str::from_utf8(trimmed).map_err(|_| ArParseError::BadNumericField {
        field: name,
        value: field.to_vec(),
    })?;
    u64::from_str_radix(s, base).map_err(|_| ArParseError::BadNumericField {
        field: name,
        value: field.to_vec(),
    })
}

/// All information in AR member headers is printable ASCII, padded with
/// trailing spaces; a field must be digits followed by (only) spaces.
fn validate_decimal_field(field: &[u8], name: &'static str) -> Result<(), ArParseError> {
    let mut seen_space = false;
    for &b in field {
        if b.is_ascii_digit() {
            if seen_space {
                return Err(ArParseError::BadNumericField {
                    field: name,
                    value: field.to_vec(),
                });
            }
        } else if b == b' ' {
            seen_space = true;
        } else {
            return Err(ArParseError::BadNumericField {
                field: name,
                value: field.to_vec(),
            });
        }
    }
    Ok(())
}

fn read_fully_or_eof<R: Read>(stream: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match stream.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(name: &str, mtime: u64, uid: u32, gid: u32, mode: u32, size: u64) -> Vec<u8> {
        let mut h = Vec::with_capacity(HEADER_SIZE);
        h.extend(format!("{name:<16}").into_bytes());
        h.extend(format!("{mtime:<12}").into_bytes());
        h.extend(format!("{uid:<6}").into_bytes());
        h.extend(format!("{gid:<6}").into_bytes());
        h.extend(format!("{mode:<8o}").into_bytes());
        h.extend(format!("{size:<10}").into_bytes());
        h.extend(b"`\n");
        assert_eq!(h.len(), HEADER_SIZE);
        h
    }

    fn gnu_archive() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(b"!<arch>\n");
        buf.extend(header("a.txt/", 0, 0, 0, 0o100644, 5));
        buf.extend(b"hello");
        buf
    }

    #[test]
    fn parses_simple_gnu_entry() {
        let archive = gnu_archive();
        let mut cursor = Cursor::new(archive);
        let entries = parse_ar_archive(&mut cursor).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"a.txt");
        assert_eq!(entries[0].size, 5);
        assert_eq!(entries[0].data_offset, 8 + HEADER_SIZE as u64);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut cursor = Cursor::new(b"not-an-ar".to_vec());
        assert!(parse_ar_archive(&mut cursor).is_err());
    }

    #[test]
    fn resolves_bsd_long_name() {
        let mut buf = Vec::new();
        buf.extend(b"!<arch>\n");
        let long_name = b"a-rather-long-file-name.txt";
        buf.extend(header(
            &format!("#1/{}", long_name.len()),
            0,
            0,
            0,
            0o100644,
            (long_name.len() + 5) as u64,
        ));
        buf.extend(long_name);
        buf.extend(b"hello");
        let mut cursor = Cursor::new(buf);
        let entries = parse_ar_archive(&mut cursor).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, long_name);
        assert_eq!(entries[0].size, 5);
    }

    #[test]
    fn resolves_gnu_long_name_table() {
        let mut buf = Vec::new();
        buf.extend(b"!<arch>\n");
        buf.extend(header("/0", 0, 0, 0, 0o100644, 3));
        buf.extend(b"abc");
        // GNU table entries: index is treated as a position in the split list,
        // matching the original scanner's (non-offset) lookup behavior.
        let table = b"really-long-name.txt/\n";
        buf.extend(header("//", 0, 0, 0, 0, table.len() as u64));
        buf.extend(table);
        let mut cursor = Cursor::new(buf);
        let entries = parse_ar_archive(&mut cursor).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"really-long-name.txt");
    }

    #[test]
    fn thin_archive_marks_symlink_mode() {
        let mut buf = Vec::new();
        buf.extend(b"!<thin>\n");
        buf.extend(header("member.o", 0, 0, 0, 0o100644, 0));
        let mut cursor = Cursor::new(buf);
        let entries = parse_ar_archive(&mut cursor).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_symlink);
        assert_eq!(entries[0].mode & libc_s_ifmt::S_IFMT, libc_s_ifmt::S_IFLNK);
    }
}
