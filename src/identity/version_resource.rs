//! Version resources embedded into Windows executables. `ProductName` usually carries the name
//! users recognise ("Minecraft Launcher" instead of "MinecraftLauncher.exe").

use std::{ffi::c_void, path::Path, ptr, slice};

use tracing::trace;
use windows::{
    core::{HSTRING, PCWSTR},
    Win32::Storage::FileSystem::{GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW},
};

use super::PlatformNameResolver;

/// en-US, Unicode. Used when the resource doesn't declare its translations.
const DEFAULT_TRANSLATION: (u16, u16) = (0x0409, 1200);

const VERSION_NAME_FIELDS: [&str; 2] = ["ProductName", "FileDescription"];

pub struct VersionResourceResolver;

impl PlatformNameResolver for VersionResourceResolver {
    #[tracing::instrument(skip(self), level = "trace")]
    fn resolve(&self, executable: &Path) -> Option<String> {
        let block = read_version_block(executable)?;
        let translations = translations(&block);

        VERSION_NAME_FIELDS.iter().find_map(|field| {
            translations.iter().find_map(|(language, codepage)| {
                query_string(
                    &block,
                    &format!("\\StringFileInfo\\{language:04x}{codepage:04x}\\{field}"),
                )
            })
        })
    }
}

fn read_version_block(executable: &Path) -> Option<Vec<u8>> {
    let file_name = HSTRING::from(executable.as_os_str());
    let size = unsafe { GetFileVersionInfoSizeW(PCWSTR(file_name.as_ptr()), None) };
    if size == 0 {
        trace!("No version resource in {executable:?}");
        return None;
    }

    let mut block = vec![0u8; size as usize];
    unsafe {
        GetFileVersionInfoW(
            PCWSTR(file_name.as_ptr()),
            0,
            size,
            block.as_mut_ptr().cast(),
        )
    }
    .inspect_err(|e| trace!("Couldn't read version resource of {executable:?}: {e:?}"))
    .ok()?;
    Some(block)
}

/// Returns a pointer into `block` and the length reported for it. The pointer is only valid
/// while `block` is alive.
fn query_value(block: &[u8], sub_block: &str) -> Option<(*const c_void, u32)> {
    let sub_block = HSTRING::from(sub_block);
    let mut buffer: *mut c_void = ptr::null_mut();
    let mut length = 0u32;
    let found = unsafe {
        VerQueryValueW(
            block.as_ptr().cast(),
            PCWSTR(sub_block.as_ptr()),
            &mut buffer,
            &mut length,
        )
    };
    if !found.as_bool() || buffer.is_null() || length == 0 {
        None
    } else {
        Some((buffer.cast_const(), length))
    }
}

fn translations(block: &[u8]) -> Vec<(u16, u16)> {
    match query_value(block, "\\VarFileInfo\\Translation") {
        Some((buffer, length)) => {
            // Length is in bytes, each translation is two u16 values.
            let words = unsafe { slice::from_raw_parts(buffer.cast::<u16>(), (length / 4 * 2) as usize) };
            parse_translations(words)
        }
        None => parse_translations(&[]),
    }
}

/// (language, codepage) pairs, falling back to [DEFAULT_TRANSLATION] when none are declared.
fn parse_translations(words: &[u16]) -> Vec<(u16, u16)> {
    let declared = words
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect::<Vec<_>>();

    if declared.is_empty() {
        vec![DEFAULT_TRANSLATION]
    } else {
        declared
    }
}

fn query_string(block: &[u8], sub_block: &str) -> Option<String> {
    let (buffer, length) = query_value(block, sub_block)?;
    // Length is in characters here.
    let characters = unsafe { slice::from_raw_parts(buffer.cast::<u16>(), length as usize) };
    let value = String::from_utf16_lossy(characters);
    let value = value.trim_end_matches('\0').trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}
