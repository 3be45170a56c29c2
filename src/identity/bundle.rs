//! Application bundles (`Something.app/Contents/...`). The displayed name lives in the bundle's
//! `Contents/Info.plist`.

use std::path::{Component, Path, PathBuf};

use tracing::trace;

use super::PlatformNameResolver;

const BUNDLE_SUFFIX: &str = ".app";

/// Keys of the manifest that may hold the name, most preferred first.
const MANIFEST_NAME_KEYS: [&str; 3] = ["CFBundleDisplayName", "CFBundleName", "CFBundleExecutable"];

pub struct BundleNameResolver;

impl PlatformNameResolver for BundleNameResolver {
    /// Any executable below a `*.app` segment counts, not only `Contents/MacOS`.
    fn resolve(&self, executable: &Path) -> Option<String> {
        let root = bundle_root(executable)?;
        manifest_name(&root).or_else(|| bundle_stem(&root))
    }
}

/// Path up to and including the outermost `*.app` segment.
pub fn bundle_root(executable: &Path) -> Option<PathBuf> {
    let mut root = PathBuf::new();
    for component in executable.components() {
        root.push(component);
        if let Component::Normal(segment) = component {
            if segment
                .to_string_lossy()
                .to_lowercase()
                .ends_with(BUNDLE_SUFFIX)
            {
                return Some(root);
            }
        }
    }
    None
}

fn manifest_name(root: &Path) -> Option<String> {
    let manifest = root.join("Contents").join("Info.plist");
    let value = plist::Value::from_file(&manifest)
        .inspect_err(|e| trace!("Couldn't read manifest {manifest:?}: {e}"))
        .ok()?;
    let dictionary = value.as_dictionary()?;

    MANIFEST_NAME_KEYS
        .iter()
        .filter_map(|key| dictionary.get(key))
        .filter_map(|value| value.as_string())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_owned)
}

/// "Game.app" becomes "Game".
fn bundle_stem(root: &Path) -> Option<String> {
    let name = root.file_name()?.to_string_lossy();
    name.get(..name.len().saturating_sub(BUNDLE_SUFFIX.len()))
        .filter(|stem| !stem.is_empty())
        .map(str::to_owned)
}
