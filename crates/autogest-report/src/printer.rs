//! # Print Dispatcher
//!
//! Hands finished documents to the operating system.
//!
//! ## Commands
//! ```text
//! ┌──────────────┬────────────────────────┬──────────────────────────────┐
//! │ Operation    │ Linux / macOS          │ Windows                      │
//! ├──────────────┼────────────────────────┼──────────────────────────────┤
//! │ printers     │ lpstat -p              │ powershell Get-Printer       │
//! │ default      │ lpstat -d              │ powershell Win32_Printer     │
//! │ open         │ xdg-open / open        │ cmd /C start                 │
//! │ print        │ lpr [-P name] [-# n]   │ cmd /C print /D:name (×n)    │
//! └──────────────┴────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Nothing here is fatal to the application: failures are logged at warn
//! level and returned so the caller can tell the user.

use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ReportError, ReportResult};

/// Operating system family, which decides the helper programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    fn new(program: &str, args: &[&str]) -> Self {
        Invocation {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Sends documents to the system viewer or print spooler.
#[derive(Debug, Clone)]
pub struct PrintDispatcher {
    platform: Platform,
}

impl Default for PrintDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintDispatcher {
    pub fn new() -> Self {
        Self::for_platform(Platform::current())
    }

    pub fn for_platform(platform: Platform) -> Self {
        PrintDispatcher { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Names of the installed printers.
    pub async fn available_printers(&self) -> ReportResult<Vec<String>> {
        let invocation = match self.platform {
            Platform::Windows => Invocation::new(
                "powershell",
                &["-NoProfile", "-Command", "Get-Printer | Select-Object -ExpandProperty Name"],
            ),
            Platform::Linux | Platform::MacOs => Invocation::new("lpstat", &["-p"]),
        };

        let output = run(&invocation).await?;
        let printers = match self.platform {
            Platform::Windows => parse_name_lines(&output),
            Platform::Linux | Platform::MacOs => parse_lpstat_printers(&output),
        };

        debug!(count = printers.len(), "Listed printers");
        Ok(printers)
    }

    /// Name of the default printer, if one is configured.
    pub async fn default_printer(&self) -> ReportResult<Option<String>> {
        let invocation = match self.platform {
            Platform::Windows => Invocation::new(
                "powershell",
                &[
                    "-NoProfile",
                    "-Command",
                    "(Get-CimInstance Win32_Printer -Filter 'Default=true').Name",
                ],
            ),
            Platform::Linux | Platform::MacOs => Invocation::new("lpstat", &["-d"]),
        };

        let output = run(&invocation).await?;
        Ok(match self.platform {
            Platform::Windows => parse_name_lines(&output).into_iter().next(),
            Platform::Linux | Platform::MacOs => parse_lpstat_default(&output),
        })
    }

    /// Opens `path` in the default viewer, where the user can print it.
    pub async fn open(&self, path: &Path) -> ReportResult<()> {
        require_file(path)?;
        run(&open_command(self.platform, path)).await?;
        info!(path = %path.display(), "Document opened");
        Ok(())
    }

    /// Sends `path` straight to a printer.
    ///
    /// ## Arguments
    /// * `printer` - Target printer, `None` for the system default
    /// * `copies` - Number of copies (0 is treated as 1)
    pub async fn print(&self, path: &Path, printer: Option<&str>, copies: u32) -> ReportResult<()> {
        require_file(path)?;
        let copies = copies.max(1);

        let invocation = print_command(self.platform, path, printer, copies);

        // Windows `print` has no copies flag
        let runs = if self.platform == Platform::Windows { copies } else { 1 };
        for _ in 0..runs {
            run(&invocation).await?;
        }

        info!(
            path = %path.display(),
            printer = printer.unwrap_or("default"),
            copies,
            "Document sent to printer"
        );
        Ok(())
    }
}

fn require_file(path: &Path) -> ReportResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        warn!(path = %path.display(), "Document to print does not exist");
        Err(ReportError::FileNotFound(path.to_path_buf()))
    }
}

// =============================================================================
// Command Construction
// =============================================================================

/// Command that opens `path` in the default viewer.
pub fn open_command(platform: Platform, path: &Path) -> Invocation {
    let path = path.display().to_string();
    match platform {
        Platform::Linux => Invocation::new("xdg-open", &[path.as_str()]),
        Platform::MacOs => Invocation::new("open", &[path.as_str()]),
        // The empty string is the window title `start` expects first
        Platform::Windows => Invocation::new("cmd", &["/C", "start", "", path.as_str()]),
    }
}

/// Command that prints `path` once (all copies, except on Windows).
pub fn print_command(
    platform: Platform,
    path: &Path,
    printer: Option<&str>,
    copies: u32,
) -> Invocation {
    let path = path.display().to_string();
    let printer = printer.map(str::trim).filter(|p| !p.is_empty());

    match platform {
        Platform::Windows => {
            let mut args = vec!["/C".to_string(), "print".to_string()];
            if let Some(printer) = printer {
                args.push(format!("/D:{}", printer));
            }
            args.push(path);
            Invocation {
                program: "cmd".to_string(),
                args,
            }
        }
        Platform::Linux | Platform::MacOs => {
            let mut args = Vec::new();
            if let Some(printer) = printer {
                args.push("-P".to_string());
                args.push(printer.to_string());
            }
            if copies > 1 {
                args.push("-#".to_string());
                args.push(copies.to_string());
            }
            args.push(path);
            Invocation {
                program: "lpr".to_string(),
                args,
            }
        }
    }
}

// =============================================================================
// Output Parsing
// =============================================================================

/// Printer names from `lpstat -p`: the second word of every line that
/// starts with `printer`.
pub fn parse_lpstat_printers(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with("printer"))
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// Default printer from `lpstat -d`: whatever follows the last `:`.
///
/// `"no system default destination"` has no colon and yields `None`.
pub fn parse_lpstat_default(output: &str) -> Option<String> {
    let (_, name) = output.rsplit_once(':')?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn parse_name_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Process Execution
// =============================================================================

async fn run(invocation: &Invocation) -> ReportResult<String> {
    debug!(cmd = %invocation.display(), "Running print helper");

    let output = Command::new(&invocation.program)
        .args(&invocation.args)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                warn!(program = %invocation.program, "Print helper not found in PATH");
                ReportError::CommandNotFound(invocation.program.clone())
            } else {
                warn!(program = %invocation.program, error = %e, "Print helper could not start");
                ReportError::Spawn {
                    command: invocation.program.clone(),
                    source: e,
                }
            }
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(
            cmd = %invocation.display(),
            status = %output.status,
            stderr = %stderr,
            "Print helper failed"
        );
        Err(ReportError::CommandFailed {
            command: invocation.display(),
            status: output.status.to_string(),
            stderr,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_lpstat_printers() {
        let output = "printer HP_LaserJet is idle.  enabled since Mon 01 Jan 2024\n\
                      \tReady\n\
                      printer Oficina_2 disabled since Tue 02 Jan 2024 -\n\
                      scheduler is running\n";

        assert_eq!(parse_lpstat_printers(output), vec!["HP_LaserJet", "Oficina_2"]);
        assert!(parse_lpstat_printers("").is_empty());
    }

    #[test]
    fn test_parse_lpstat_default() {
        assert_eq!(
            parse_lpstat_default("system default destination: HP_LaserJet\n").as_deref(),
            Some("HP_LaserJet")
        );
        assert_eq!(parse_lpstat_default("no system default destination\n"), None);
        assert_eq!(parse_lpstat_default("system default destination: \n"), None);
    }

    #[test]
    fn test_lpr_command() {
        let path = PathBuf::from("/tmp/venta_1_comprobante.pdf");

        assert_eq!(
            print_command(Platform::Linux, &path, Some("HP"), 3),
            Invocation::new("lpr", &["-P", "HP", "-#", "3", "/tmp/venta_1_comprobante.pdf"])
        );
        // Single copy and default printer add no flags
        assert_eq!(
            print_command(Platform::MacOs, &path, None, 1),
            Invocation::new("lpr", &["/tmp/venta_1_comprobante.pdf"])
        );
        assert_eq!(
            print_command(Platform::Linux, &path, Some("  "), 1).args,
            vec!["/tmp/venta_1_comprobante.pdf"]
        );
    }

    #[test]
    fn test_windows_commands() {
        let path = PathBuf::from("lista_clientes.pdf");

        assert_eq!(
            print_command(Platform::Windows, &path, Some("Oficina"), 2),
            Invocation::new("cmd", &["/C", "print", "/D:Oficina", "lista_clientes.pdf"])
        );
        assert_eq!(
            open_command(Platform::Windows, &path),
            Invocation::new("cmd", &["/C", "start", "", "lista_clientes.pdf"])
        );
    }

    #[test]
    fn test_open_command_per_platform() {
        let path = PathBuf::from("a.pdf");
        assert_eq!(open_command(Platform::Linux, &path).program, "xdg-open");
        assert_eq!(open_command(Platform::MacOs, &path).program, "open");
    }

    #[tokio::test]
    async fn test_missing_document_is_rejected_before_spawning() {
        let dispatcher = PrintDispatcher::new();
        let missing = PathBuf::from("/definitely/not/here.pdf");

        assert!(matches!(
            dispatcher.print(&missing, None, 1).await,
            Err(ReportError::FileNotFound(_))
        ));
        assert!(matches!(
            dispatcher.open(&missing).await,
            Err(ReportError::FileNotFound(_))
        ));
    }
}
