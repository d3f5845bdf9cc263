//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the application context.
//! Each handler takes CLI args and Output, returns ExitCode.

use tokio_util::sync::CancellationToken;

use crate::cast::{CastPipeline, CastReport, PipelineError, ReadinessReport, SearchReport};
use crate::cli::{CastCmd, Cli, Command, DevicesCmd, ExitCode, Output, SearchCmd, StatusCmd};
use crate::config::Config;
use crate::context::AppContext;
use crate::models::Device;

/// Load config, build the context and dispatch
pub async fn run_cli(cli: Cli, cancel: CancellationToken) -> ExitCode {
    let output = Output::new(&cli);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return output.error(format!("{:#}", e), ExitCode::Error),
    };

    if let Command::Devices(cmd) = &cli.command {
        return devices_cmd(cmd, &config, &output);
    }

    let context = match AppContext::from_config(config) {
        Ok(context) => context,
        Err(e) => return output.error(format!("{:#}", e), ExitCode::Error),
    };

    let device = cli.device.as_deref();
    match cli.command {
        Command::Search(cmd) => search_cmd(cmd, &context, &output, &cancel).await,
        Command::Cast(cmd) => cast_cmd(cmd, device, &context, &output, &cancel).await,
        Command::Status(cmd) => status_cmd(cmd, device, &context, &output, &cancel).await,
        Command::Devices(cmd) => devices_cmd(&cmd, &context.config, &output),
    }
}

/// Exit code for a pipeline failure
pub fn exit_code_for(err: &PipelineError) -> ExitCode {
    match err {
        PipelineError::DeviceNotFound(_) => ExitCode::DeviceNotFound,
        PipelineError::MissingCredentials | PipelineError::Cancelled => ExitCode::Error,
        PipelineError::MetadataNotFound(_) => ExitCode::MetadataNotFound,
        PipelineError::Metadata(_) => ExitCode::NetworkError,
        PipelineError::NothingFound { .. } => ExitCode::NoStreams,
    }
}

fn pipeline_error(err: PipelineError, output: &Output) -> ExitCode {
    let code = exit_code_for(&err);
    match err {
        PipelineError::NothingFound {
            metadata,
            aggregate,
            reason,
        } => {
            let report = SearchReport {
                metadata: *metadata,
                aggregate,
            };
            print_outcomes(&report, output);
            output.fail_with(&report, reason.to_string(), code)
        }
        other => output.error(other.to_string(), code),
    }
}

// =============================================================================
// Search Command
// =============================================================================

pub async fn search_cmd(
    cmd: SearchCmd,
    context: &AppContext,
    output: &Output,
    cancel: &CancellationToken,
) -> ExitCode {
    let request = match cmd.media.to_request(None) {
        Ok(request) => request,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };

    output.info(format!("Searching for: {}", request));

    let report = match CastPipeline::new(context).search(request, cancel).await {
        Ok(report) => report,
        Err(e) => return pipeline_error(e, output),
    };

    if output.json {
        if let Err(e) = output.print(&report) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        output.text(&report.metadata);
        for (index, stream) in report.aggregate.candidates.iter().enumerate() {
            output.text(format!("  {:>2}. {}", index, stream));
        }
        print_outcomes(&report, output);
    }

    if report.aggregate.is_empty() {
        return ExitCode::NoStreams;
    }
    ExitCode::Success
}

fn print_outcomes(report: &SearchReport, output: &Output) {
    for outcome in &report.aggregate.outcomes {
        output.info(format!("  {}", outcome));
    }
    output.info(format!(
        "{} of {} providers succeeded, {} stream(s) found",
        report.aggregate.providers_succeeded(),
        report.aggregate.providers_queried(),
        report.aggregate.total_streams()
    ));
}

// =============================================================================
// Cast Command
// =============================================================================

pub async fn cast_cmd(
    cmd: CastCmd,
    device: Option<&str>,
    context: &AppContext,
    output: &Output,
    cancel: &CancellationToken,
) -> ExitCode {
    let request = match cmd.media.to_request(device) {
        Ok(request) => request,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };

    output.info(format!("Casting {}...", request));

    let report = match CastPipeline::new(context).cast(request, cmd.index, cancel).await {
        Ok(report) => report,
        Err(e) => return pipeline_error(e, output),
    };

    print_cast_report(&report, output);

    if report.outcome.success {
        if output.json {
            if let Err(e) = output.print(&report) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
        }
        ExitCode::Success
    } else {
        output.fail_with(&report, report.outcome.to_string(), ExitCode::CastFailed)
    }
}

fn print_cast_report(report: &CastReport, output: &Output) {
    output.info(format!("Found: {}", report.metadata));
    output.info(format!(
        "Selected: {} ({} of {} streams)",
        report.selected,
        report
            .aggregate
            .candidates
            .iter()
            .position(|c| c == &report.selected)
            .map(|i| i + 1)
            .unwrap_or(1),
        report.aggregate.total_streams()
    ));
    output.info(format!("Device: {} [{}]", report.device, report.readiness.state));
    if report.outcome.success {
        output.text(&report.outcome);
    }
}

// =============================================================================
// Devices Command
// =============================================================================

pub fn devices_cmd(_cmd: &DevicesCmd, config: &Config, output: &Output) -> ExitCode {
    if config.devices.is_empty() {
        return output.error(
            "No devices configured. Add [[devices]] entries to the config file.",
            ExitCode::DeviceNotFound,
        );
    }

    if output.json {
        if let Err(e) = output.print(&config.devices) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        for device in &config.devices {
            output.text(format!("{}  {}:{}", device.name, device.address, device.port));
        }
    }
    ExitCode::Success
}

// =============================================================================
// Status Command
// =============================================================================

#[derive(serde::Serialize)]
struct DeviceStatus<'a> {
    device: &'a Device,
    readiness: &'a ReadinessReport,
}

pub async fn status_cmd(
    cmd: StatusCmd,
    device: Option<&str>,
    context: &AppContext,
    output: &Output,
    cancel: &CancellationToken,
) -> ExitCode {
    if cmd.wake {
        output.info("Checking device, waking it if needed...");
    }

    let (device, report) = match CastPipeline::new(context)
        .check_device(device, cmd.wake, cancel)
        .await
    {
        Ok(result) => result,
        Err(e) => return pipeline_error(e, output),
    };

    let status = DeviceStatus {
        device: &device,
        readiness: &report,
    };

    if report.is_ready() {
        if output.json {
            if let Err(e) = output.print(&status) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
        } else {
            output.text(format!("{}: {}", device, report.state));
        }
        return ExitCode::Success;
    }

    let reason = report
        .failure_outcome(&device.name)
        .map(|o| o.to_string())
        .unwrap_or_else(|| format!("{} is not ready", device.name));
    output.fail_with(&status, reason, ExitCode::NetworkError)
}
