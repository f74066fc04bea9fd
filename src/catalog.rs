//! Package-manager catalog.
//!
//! A static table of the argument vocabulary needed to drive each supported
//! package manager non-interactively, plus the resolution rule that decides
//! which manager runs on a host and whether it needs elevation.
use std::fmt;

use crate::error::CatalogError;
use crate::platform::Platform;

/// Package operation requested by a lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Install packages.
    Install,
    /// Remove packages.
    Uninstall,
    /// Bring the given packages to their latest version.
    Update,
    /// System-wide upgrade.
    Upgrade,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Uninstall => write!(f, "uninstall"),
            Self::Update => write!(f, "update"),
            Self::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// Argument vocabulary for one package manager.
#[derive(Debug, PartialEq, Eq)]
pub struct PackageManagerDescriptor {
    /// Executable to invoke.
    pub executable: &'static str,
    /// Argument selecting installation.
    pub install_arg: &'static str,
    /// Argument selecting removal.
    pub uninstall_arg: &'static str,
    /// Argument selecting a per-package update.
    pub update_arg: &'static str,
    /// Argument selecting a system upgrade.
    pub upgrade_arg: &'static str,
    /// Flag that suppresses confirmation prompts (empty when unsupported).
    pub auto_confirm_opt: &'static str,
    /// Flag that quiets output.
    pub quiet_opt: &'static str,
    /// Whether mutating operations need root.
    pub requires_root: bool,
}

impl PackageManagerDescriptor {
    /// The argument that selects `op`.
    #[must_use]
    pub const fn argument(&self, op: Operation) -> &'static str {
        match op {
            Operation::Install => self.install_arg,
            Operation::Uninstall => self.uninstall_arg,
            Operation::Update => self.update_arg,
            Operation::Upgrade => self.upgrade_arg,
        }
    }

    /// Build `[opArg, autoConfirm, quiet, pkg...]`.
    ///
    /// Empty option strings are omitted rather than passed as blank
    /// arguments.
    #[must_use]
    pub fn argv<S: AsRef<str>>(&self, op: Operation, packages: &[S]) -> Vec<String> {
        [self.argument(op), self.auto_confirm_opt, self.quiet_opt]
            .into_iter()
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .chain(packages.iter().map(|p| p.as_ref().to_string()))
            .collect()
    }
}

/// Debian/Ubuntu.
pub const APT: PackageManagerDescriptor = PackageManagerDescriptor {
    executable: "apt-get",
    install_arg: "install",
    uninstall_arg: "remove",
    update_arg: "install",
    upgrade_arg: "upgrade",
    auto_confirm_opt: "-y",
    quiet_opt: "-qq",
    requires_root: true,
};

/// Fedora/RHEL.
pub const DNF: PackageManagerDescriptor = PackageManagerDescriptor {
    executable: "dnf",
    install_arg: "install",
    uninstall_arg: "remove",
    update_arg: "upgrade",
    upgrade_arg: "upgrade",
    auto_confirm_opt: "-y",
    quiet_opt: "-q",
    requires_root: true,
};

/// Arch Linux.
pub const PACMAN: PackageManagerDescriptor = PackageManagerDescriptor {
    executable: "pacman",
    install_arg: "-S",
    uninstall_arg: "-R",
    update_arg: "-Syu",
    upgrade_arg: "-Syu",
    auto_confirm_opt: "--noconfirm",
    quiet_opt: "--quiet",
    requires_root: true,
};

/// openSUSE.
pub const ZYPPER: PackageManagerDescriptor = PackageManagerDescriptor {
    executable: "zypper",
    install_arg: "in",
    uninstall_arg: "rm",
    update_arg: "in",
    upgrade_arg: "up",
    auto_confirm_opt: "--non-interactive",
    quiet_opt: "--quiet",
    requires_root: true,
};

/// Homebrew. Refuses to run as root.
pub const BREW: PackageManagerDescriptor = PackageManagerDescriptor {
    executable: "brew",
    install_arg: "install",
    uninstall_arg: "uninstall",
    update_arg: "upgrade",
    upgrade_arg: "upgrade",
    auto_confirm_opt: "",
    quiet_opt: "-q",
    requires_root: false,
};

/// Every supported manager, once each.
pub const ALL: [&PackageManagerDescriptor; 5] = [&APT, &DNF, &PACMAN, &ZYPPER, &BREW];

static CATALOG: &[(&str, &PackageManagerDescriptor)] = &[
    ("apt", &APT),
    ("apt-get", &APT),
    ("aptitude", &APT),
    ("dnf", &DNF),
    ("pacman", &PACMAN),
    ("zypper", &ZYPPER),
    ("brew", &BREW),
];

/// Look up a manager by identifier (ASCII case-insensitive).
#[must_use]
pub fn lookup(identifier: &str) -> Option<&'static PackageManagerDescriptor> {
    let identifier = identifier.trim();
    CATALOG
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(identifier))
        .map(|(_, descriptor)| *descriptor)
}

/// Outcome of resolving a configured manager on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Manager to drive.
    pub descriptor: &'static PackageManagerDescriptor,
    /// Whether the invocation must be elevated.
    pub elevate: bool,
}

/// Resolve the manager to use for `identifier` on `platform`.
///
/// macOS always resolves to Homebrew without elevation, whatever was
/// configured. Elsewhere the identifier is used verbatim and elevation
/// follows [`PackageManagerDescriptor::requires_root`].
///
/// # Errors
///
/// Returns [`CatalogError::UnsupportedPackageManager`] for an unknown
/// identifier on a non-macOS host.
pub fn resolve(identifier: &str, platform: &Platform) -> Result<Resolution, CatalogError> {
    if platform.is_macos() {
        return Ok(Resolution {
            descriptor: &BREW,
            elevate: false,
        });
    }
    let descriptor = lookup(identifier)
        .ok_or_else(|| CatalogError::UnsupportedPackageManager(identifier.to_string()))?;
    Ok(Resolution {
        descriptor,
        elevate: descriptor.requires_root,
    })
}

/// Probe order used by [`detect`] on non-macOS hosts.
const PROBE_ORDER: &[&str] = &["apt-get", "dnf", "pacman", "zypper", "brew"];

/// Pick a default manager identifier for `platform`.
///
/// `is_available` reports whether an executable is on `PATH`.
#[must_use]
pub fn detect(platform: &Platform, is_available: impl Fn(&str) -> bool) -> Option<&'static str> {
    if platform.is_macos() {
        return Some(BREW.executable);
    }
    PROBE_ORDER.iter().copied().find(|exe| is_available(exe))
}
