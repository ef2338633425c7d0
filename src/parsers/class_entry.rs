//! Archive entries and compiled classes.
//!
//! Every non-directory entry of a JAR contributes to the package its
//! directory maps to. Class files can additionally be mined for the classes
//! they reference: the constant pool lists every referenced class, and
//! field/method descriptors and generic signatures name the rest.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

use super::{ResourceKind, ResourceScanner};
use crate::models::ResourceReferences;

const EXCLUDED_ROOTS: &[&str] = &["META-INF", "OSGI-INF", "OSGI-OPT", "WEB-INF"];
const EXCLUDED_PACKAGE_PREFIX: &str = "org.osgi";
const CLASS_MAGIC: u32 = 0xCAFEBABE;

lazy_static! {
    static ref DESCRIPTOR_CLASS: Regex =
        Regex::new(r"L([A-Za-z_$][\w/$]*)[;<]").expect("valid descriptor regex");
}

/// Package an archive entry belongs to, `None` for directories, the default
/// package, metadata directories, `org.osgi` and paths that cannot be Java
/// packages.
pub fn package_for_entry(path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') {
        return None;
    }

    let (directory, _) = path.rsplit_once('/')?;
    let first = directory.split('/').next().unwrap_or_default();
    if EXCLUDED_ROOTS.contains(&first) {
        return None;
    }
    if directory
        .split('/')
        .any(|segment| !is_package_segment(segment))
    {
        return None;
    }

    let package = directory.replace('/', ".");
    if package == EXCLUDED_PACKAGE_PREFIX
        || package.starts_with(&format!("{}.", EXCLUDED_PACKAGE_PREFIX))
    {
        return None;
    }
    Some(package)
}

fn is_package_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Package of a binary class name (`org.a.B$C` -> `org.a`).
pub fn package_of_binary_name(class_name: &str) -> Option<&str> {
    class_name.rsplit_once('.').map(|(package, _)| package)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassFile {
    /// Binary name with dots, e.g. `org.example.Outer$Inner`.
    pub name: String,
    pub references: BTreeSet<String>,
}

pub fn parse_class_file(data: &[u8]) -> Result<ClassFile> {
    let mut reader = ClassReader::new(data);
    reader.expect_magic()?;
    let _minor = reader.read_u2()?;
    let _major = reader.read_u2()?;

    let pool = ConstantPool::parse(&mut reader)?;
    let _access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let name = pool
        .class_name(this_class)
        .ok_or(ClassParseError::InvalidConstantIndex {
            index: this_class as usize,
        })?
        .replace('/', ".");

    let mut references = BTreeSet::new();
    for (index, value) in pool.utf8.iter().enumerate() {
        if pool.class_name_indices.contains(&index) {
            continue;
        }
        if let Some(value) = value
            && looks_like_signature(value)
        {
            for caps in DESCRIPTOR_CLASS.captures_iter(value) {
                references.insert(caps[1].replace('/', "."));
            }
        }
    }
    for name_index in &pool.class_name_indices {
        if let Some(Some(value)) = pool.utf8.get(*name_index)
            && let Some(class_name) = class_entry_name(value)
        {
            references.insert(class_name);
        }
    }

    references.remove(&name);
    Ok(ClassFile { name, references })
}

/// Every class referenced by a compiled class, excluding the class itself.
pub fn class_references(data: &[u8]) -> Result<BTreeSet<String>> {
    Ok(parse_class_file(data)?.references)
}

/// Field and method descriptors or generic signatures.
fn looks_like_signature(value: &str) -> bool {
    value.starts_with(['(', 'L', '[', '<']) && value.contains(';')
}

/// Class constant entries hold internal names (`org/a/B`) or array
/// descriptors (`[Lorg/a/B;`, `[I`).
fn class_entry_name(value: &str) -> Option<String> {
    if value.starts_with('[') {
        return DESCRIPTOR_CLASS
            .captures(value)
            .map(|caps| caps[1].replace('/', "."));
    }
    Some(value.replace('/', "."))
}

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic {0:#010x}")]
    InvalidMagic(u32),
    #[error("unsupported constant pool tag {tag} at index {index}")]
    UnsupportedConstant { tag: u8, index: usize },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: usize },
}

struct ConstantPool {
    utf8: Vec<Option<String>>,
    class_entries: Vec<Option<usize>>,
    class_name_indices: BTreeSet<usize>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut utf8 = vec![None; count];
        let mut class_entries = vec![None; count];
        let mut class_name_indices = BTreeSet::new();

        let mut index = 1usize;
        while index < count {
            let tag = reader.read_u1()?;
            match tag {
                1 => {
                    let len = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(len)?;
                    utf8[index] = Some(String::from_utf8_lossy(bytes).to_string());
                }
                7 => {
                    let name_index = reader.read_u2()? as usize;
                    class_entries[index] = Some(name_index);
                    class_name_indices.insert(name_index);
                }
                3 | 4 => reader.skip(4)?,
                5 | 6 => {
                    // 8-byte constants take two slots
                    if index + 1 >= count {
                        return Err(ClassParseError::InvalidConstantIndex { index });
                    }
                    reader.skip(8)?;
                    index += 1;
                }
                8 => reader.skip(2)?,
                9 | 10 | 11 | 12 | 17 | 18 => reader.skip(4)?,
                15 => reader.skip(3)?,
                16 | 19 | 20 => reader.skip(2)?,
                _ => return Err(ClassParseError::UnsupportedConstant { tag, index }),
            }
            index += 1;
        }

        Ok(ConstantPool {
            utf8,
            class_entries,
            class_name_indices,
        })
    }

    fn class_name(&self, class_index: u16) -> Option<&str> {
        let name_index = (*self.class_entries.get(class_index as usize)?)?;
        self.utf8.get(name_index)?.as_deref()
    }
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        ClassReader { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        let magic = self.read_u4()?;
        if magic != CLASS_MAGIC {
            return Err(ClassParseError::InvalidMagic(magic));
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let bytes = self.read_slice(1)?;
        Ok(bytes[0])
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(ClassParseError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}

/// Adds the packages a compiled class references. Only dispatched when class
/// reference scanning is enabled.
pub struct ClassScanner;

impl ResourceScanner for ClassScanner {
    const KIND: ResourceKind = ResourceKind::Class;

    fn is_match(name: &str) -> bool {
        name.ends_with(".class")
    }

    fn scan(_name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()> {
        for class_name in class_references(content)? {
            if let Some(package) = package_of_binary_name(&class_name) {
                refs.add_package(package);
            }
        }
        Ok(())
    }
}
