use std::io::Write;
use std::path::Path;

/// What: Append confirmed package identifiers to an audit log.
///
/// Input:
/// - `logs_dir`: Directory holding `install_log.log`.
/// - `packages`: Identifiers to append; each line is timestamped.
///
/// Output: `Ok(())` on success; otherwise an I/O error.
///
/// # Errors
/// - Returns `Err` when the logs directory cannot be created or the log file cannot be written.
pub fn log_installed(logs_dir: &Path, packages: &[String]) -> std::io::Result<()> {
    std::fs::create_dir_all(logs_dir)?;
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join("install_log.log"))?;
    let when = crate::util::ts_to_date(Some(crate::util::now_millis() / 1000));
    for p in packages {
        writeln!(f, "{when} {p}")?;
    }
    Ok(())
}
