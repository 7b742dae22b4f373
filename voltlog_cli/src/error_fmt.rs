//! Human-readable error descriptions and structured JSON error formatting.

use voltlog_core::PipelineError;

/// Map an eyre::Report to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(pe) = err.downcast_ref::<PipelineError>() {
        return match pe {
            PipelineError::LinkUnavailable { attempts } => format!(
                "What happened: The device could not be reached after {attempts} connection attempts.\nLikely causes: Cable unplugged, wrong link.port, or another process holding the port.\nHow to fix: Check the USB cable and link.port in the config, close competing serial monitors, then rerun."
            ),
            PipelineError::LinkLost => {
                "What happened: The transport dropped mid-run and reconnecting did not help.\nLikely causes: Loose cable, device reset, or power loss on the ADC board.\nHow to fix: Reseat the cable and power, then rerun; already-flushed batches are safe on disk.".to_string()
            }
            PipelineError::Timeout => {
                "What happened: The device stayed silent past the read timeout.\nLikely causes: Firmware not sending, wrong baud rate, or link.read_timeout_ms too low for the sample rate.\nHow to fix: Confirm the firmware sketch is running and the baud matches, or raise link.read_timeout_ms.".to_string()
            }
            PipelineError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/voltlog_config.toml for a sample."
            ),
            PipelineError::Io(msg) => format!(
                "What happened: Disk I/O failed ({msg}).\nLikely causes: storage.out_dir missing or not writable, or the disk is full.\nHow to fix: Check the output directory permissions and free space."
            ),
            PipelineError::Link(msg) => format!(
                "What happened: Transport error ({msg}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("permission denied") && lower.contains("tty") {
        return "What happened: The serial port exists but access was denied.\nLikely causes: The user is not in the dialout/uucp group.\nHow to fix: Add the user to the serial group (e.g. `usermod -aG dialout $USER`) and log in again.".to_string();
    }

    if lower.contains("firmware") && lower.contains("sketch") {
        return "What happened: The firmware sketch could not be read or parsed.\nLikely causes: Wrong link.firmware_sketch path or a sketch without the expected assignments.\nHow to fix: Point link.firmware_sketch at the .ino the device runs, or remove the key to use the TOML values.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per failure class; generic errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::LinkUnavailable { .. }) => 2,
        Some(PipelineError::LinkLost) => 3,
        Some(PipelineError::Config(_)) => 4,
        Some(PipelineError::Io(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::LinkUnavailable { .. }) => "LinkUnavailable",
        Some(PipelineError::LinkLost) => "LinkLost",
        Some(PipelineError::Timeout) => "Timeout",
        Some(PipelineError::Config(_)) => "Config",
        Some(PipelineError::Io(_)) => "Io",
        Some(PipelineError::Link(_)) => "Link",
        None => "Error",
    };

    if let Some(PipelineError::LinkUnavailable { attempts }) = err.downcast_ref::<PipelineError>() {
        return json!({
            "reason": reason,
            "details": { "attempts": attempts },
            "message": humanize(err),
        })
        .to_string();
    }
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
