//! Host platform and the platform-specific part of the action plan

use std::fmt;

use super::actions::ActionKind;
use crate::package::PackagerKind;

/// Platform the bundle is built for; always the host platform at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::MacOs, Platform::Windows, Platform::Linux];

    /// Resolved once at startup; anything that is neither macOS nor Windows
    /// is treated as Linux-like.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Suffix used in artifact names, e.g. `linux64`
    pub fn tag(&self) -> String {
        let bits = if cfg!(target_pointer_width = "64") {
            "64"
        } else {
            "32"
        };
        match self {
            Platform::MacOs => "OSX".to_string(),
            Platform::Windows => format!("win{}", bits),
            Platform::Linux => format!("linux{}", bits),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        };
        f.write_str(name)
    }
}

/// Decides which optional actions and which packager a platform gets
#[derive(Debug, Clone, Copy)]
pub struct PlatformStrategy {
    platform: Platform,
}

impl PlatformStrategy {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Platform-only actions, in order, appended after the universal prefix
    pub fn tail_actions(&self, signing: bool) -> Vec<ActionKind> {
        match self.platform {
            Platform::MacOs => {
                let mut tail = vec![
                    ActionKind::Plist,
                    ActionKind::Launcher,
                    ActionKind::CopyAssets,
                    ActionKind::FixDylibs,
                ];
                if signing {
                    tail.push(ActionKind::Codesign);
                }
                tail
            }
            Platform::Windows => vec![ActionKind::EmbedManifests],
            Platform::Linux => vec![ActionKind::RemoveUnused],
        }
    }

    /// The single terminal packaging step
    pub fn packager(&self) -> PackagerKind {
        match self.platform {
            Platform::MacOs => PackagerKind::DiskImage,
            Platform::Windows => PackagerKind::Zip,
            Platform::Linux => PackagerKind::Tarball,
        }
    }

    /// Whether shared objects are passed through `strip` during cleanup
    pub fn strips_libraries(&self) -> bool {
        self.platform != Platform::Windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_each_platform_has_distinct_packager() {
        let packagers: HashSet<PackagerKind> = Platform::ALL
            .iter()
            .map(|p| PlatformStrategy::new(*p).packager())
            .collect();
        assert_eq!(packagers.len(), Platform::ALL.len());
    }

    #[test]
    fn test_tail_never_contains_packaging() {
        for platform in Platform::ALL {
            let tail = PlatformStrategy::new(platform).tail_actions(true);
            assert!(tail.iter().all(|a| !a.is_packaging()));
        }
    }

    #[test]
    fn test_macos_tail_signs_only_with_identity() {
        let strategy = PlatformStrategy::new(Platform::MacOs);
        assert!(!strategy.tail_actions(false).contains(&ActionKind::Codesign));
        let tail = strategy.tail_actions(true);
        assert_eq!(tail.last(), Some(&ActionKind::Codesign));
        assert_eq!(tail[0], ActionKind::Plist);
    }

    #[test]
    fn test_windows_and_linux_tails() {
        assert_eq!(
            PlatformStrategy::new(Platform::Windows).tail_actions(true),
            vec![ActionKind::EmbedManifests]
        );
        assert_eq!(
            PlatformStrategy::new(Platform::Linux).tail_actions(true),
            vec![ActionKind::RemoveUnused]
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(Platform::MacOs.tag(), "OSX");
        assert!(Platform::Linux.tag().starts_with("linux"));
        assert!(Platform::Windows.tag().starts_with("win"));
    }

    #[test]
    fn test_only_windows_skips_strip() {
        assert!(PlatformStrategy::new(Platform::Linux).strips_libraries());
        assert!(PlatformStrategy::new(Platform::MacOs).strips_libraries());
        assert!(!PlatformStrategy::new(Platform::Windows).strips_libraries());
    }
}
