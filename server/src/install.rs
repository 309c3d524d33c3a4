use axum::http::StatusCode;
use serde::Serialize;
use std::io;
use tokio::process::Command;

/// Operating systems the install endpoint knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Linux,
    Termux,
    Windows,
    Macos,
}

impl OsType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "linux" => Some(Self::Linux),
            "termux" => Some(Self::Termux),
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::Macos),
            _ => None,
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Termux => "Termux",
            Self::Windows => "Windows",
            Self::Macos => "Macos",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub status: InstallStatus,
    pub message: String,
    pub output: String,
}

impl InstallReport {
    fn new(status: InstallStatus, message: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            output: output.into(),
        }
    }
}

/// What the installer knows about the host it runs on.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    pub is_linux: bool,
    pub is_termux: bool,
}

impl Platform {
    pub fn detect() -> Self {
        Self {
            is_linux: std::env::consts::OS == "linux",
            is_termux: std::env::var_os("TERMUX_VERSION").is_some(),
        }
    }
}

/// A package manager that can install the tool unattended.
struct PackageManager {
    name: &'static str,
    update: &'static [&'static str],
    install: &'static [&'static str],
    missing_hint: &'static str,
}

const APT: PackageManager = PackageManager {
    name: "apt",
    update: &["sudo", "apt", "update"],
    install: &["sudo", "apt", "install", "-y"],
    missing_hint: "Are you on a Debian/Ubuntu-based system?",
};

const PKG: PackageManager = PackageManager {
    name: "pkg",
    update: &["pkg", "update", "-y"],
    install: &["pkg", "install", "-y"],
    missing_hint: "Are you on Termux?",
};

/// Installs the external tool through the host's package manager.
pub struct Installer {
    package: String,
    platform: Platform,
}

impl Installer {
    pub fn new(package: impl Into<String>, platform: Platform) -> Self {
        Self {
            package: package.into(),
            platform,
        }
    }

    pub async fn install(&self, os_type: Option<&str>) -> (StatusCode, InstallReport) {
        let Some(os) = os_type.and_then(OsType::parse) else {
            return (
                StatusCode::BAD_REQUEST,
                InstallReport::new(
                    InstallStatus::Error,
                    "Unsupported OS type for automatic installation.",
                    "Please select a valid OS type (linux, termux, windows, macos).",
                ),
            );
        };

        match os {
            OsType::Linux if self.platform.is_linux => self.run(os, &APT).await,
            OsType::Termux if self.platform.is_termux => self.run(os, &PKG).await,
            OsType::Linux | OsType::Termux => (
                StatusCode::BAD_REQUEST,
                InstallReport::new(
                    InstallStatus::Error,
                    format!(
                        "Installation via this interface is only supported on {} systems.",
                        os.display_name()
                    ),
                    format!("Operating system is not {}.", os.display_name()),
                ),
            ),
            OsType::Windows | OsType::Macos => (
                StatusCode::OK,
                InstallReport::new(
                    InstallStatus::Info,
                    "Manual installation required.",
                    format!(
                        "Please follow the manual installation steps for {}.",
                        os.display_name()
                    ),
                ),
            ),
        }
    }

    async fn run(&self, os: OsType, manager: &PackageManager) -> (StatusCode, InstallReport) {
        let mut install: Vec<&str> = manager.install.to_vec();
        install.push(self.package.as_str());

        let mut output = String::new();
        for step in [manager.update, install.as_slice()] {
            match run_step(step).await {
                Ok(captured) if captured.success => output = captured.text,
                Ok(captured) => {
                    tracing::warn!(step = ?step, "package manager step failed");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        InstallReport::new(
                            InstallStatus::Error,
                            format!(
                                "Failed to install {} on {}: {}",
                                self.package,
                                os.display_name(),
                                captured.stderr
                            ),
                            captured.text,
                        ),
                    );
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        InstallReport::new(
                            InstallStatus::Error,
                            format!("{} command not found. {}", manager.name, manager.missing_hint),
                            format!("{} command not found.", manager.name),
                        ),
                    );
                }
                Err(err) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        InstallReport::new(
                            InstallStatus::Error,
                            format!("Failed to install {} on {}: {err}", self.package, os.display_name()),
                            err.to_string(),
                        ),
                    );
                }
            }
        }

        tracing::info!(package = %self.package, os = os.display_name(), "tool installed");
        (
            StatusCode::OK,
            InstallReport::new(
                InstallStatus::Success,
                format!("{} installed successfully on {}.", self.package, os.display_name()),
                output,
            ),
        )
    }
}

struct Captured {
    success: bool,
    stderr: String,
    /// stdout followed by stderr
    text: String,
}

async fn run_step(argv: &[&str]) -> io::Result<Captured> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
    let output = Command::new(program).args(args).output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    tracing::debug!(?argv, status = %output.status, %stdout, %stderr, "package manager step");
    Ok(Captured {
        success: output.status.success(),
        text: format!("{stdout}{stderr}"),
        stderr,
    })
}
