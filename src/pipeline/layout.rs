//! Where things live in the working directory and the assembled tree
//!
//! Profile paths are templates over a fixed set of anchors:
//!
//! | anchor        | macOS                              | Windows / Linux |
//! |---------------|------------------------------------|-----------------|
//! | `{work}`      | working directory                  | same            |
//! | `{binaries}`  | prebuilt binaries directory        | same            |
//! | `{root}`      | `{work}/<name>`                    | same            |
//! | `{bundle}`    | `{root}/<name>.app`                | `{root}`        |
//! | `{app}`       | `{bundle}/Contents/MacOS`          | `{root}`        |
//! | `{resources}` | `{bundle}/Contents/Resources`      | `{app}`         |
//! | `{name}`      | product name                       | same            |

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use super::platform::Platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    platform: Platform,
    name: String,
    work: PathBuf,
    binaries: PathBuf,
    root: PathBuf,
    bundle: PathBuf,
    app: PathBuf,
    resources: PathBuf,
}

impl BundleLayout {
    pub fn new(platform: Platform, work: &Path, binaries: &Path, name: &str) -> Self {
        let root = work.join(name);
        let (bundle, app, resources) = match platform {
            Platform::MacOs => {
                let bundle = root.join(format!("{}.app", name));
                let contents = bundle.join("Contents");
                (
                    bundle.clone(),
                    contents.join("MacOS"),
                    contents.join("Resources"),
                )
            }
            Platform::Windows | Platform::Linux => (root.clone(), root.clone(), root.clone()),
        };

        Self {
            platform,
            name: name.to_string(),
            work: work.to_path_buf(),
            binaries: binaries.to_path_buf(),
            root,
            bundle,
            app,
            resources,
        }
    }

    pub fn work(&self) -> &Path {
        &self.work
    }

    /// Top of the assembled tree, the directory the packager consumes
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bundle(&self) -> &Path {
        &self.bundle
    }

    pub fn app(&self) -> &Path {
        &self.app
    }

    pub fn resources(&self) -> &Path {
        &self.resources
    }

    /// `Contents` of the `.app` bundle; macOS only
    pub fn contents(&self) -> Option<PathBuf> {
        (self.platform == Platform::MacOs).then(|| self.bundle.join("Contents"))
    }

    /// Directories every bundle of this platform starts with
    pub fn skeleton(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.root.clone()];
        if let Some(contents) = self.contents() {
            for sub in ["MacOS", "Resources", "PlugIns", "StartupItems"] {
                dirs.push(contents.join(sub));
            }
        }
        dirs
    }

    fn anchor(&self, name: &str) -> Option<String> {
        let path = match name {
            "work" => &self.work,
            "binaries" => &self.binaries,
            "root" => &self.root,
            "bundle" => &self.bundle,
            "app" => &self.app,
            "resources" => &self.resources,
            "name" => return Some(self.name.clone()),
            _ => return None,
        };
        Some(path.to_string_lossy().into_owned())
    }

    /// Substitute every `{anchor}` in `template`
    pub fn render(&self, template: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                bail!("unterminated anchor in '{}'", template);
            };
            let name = &after[..end];
            match self.anchor(name) {
                Some(value) => out.push_str(&value),
                None => bail!("unknown anchor '{{{}}}' in '{}'", name, template),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    pub fn expand(&self, template: &str) -> Result<PathBuf> {
        self.render(template).map(PathBuf::from)
    }
}
