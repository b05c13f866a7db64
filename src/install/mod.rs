//! Download, save, installer handoff, and confirmation for catalog packages.
//!
//! [`Orchestrator`] is the pure per-package state machine; [`InstallRunner`] executes its
//! actions against the transfer driver and the storage, installer, and prober collaborators.

mod installed;
mod installer;
mod job;
mod logging;
mod orchestrator;
mod prober;
mod runner;
mod storage;

pub use installed::InstalledSet;
pub use installer::{CommandInstaller, Installer, PACKAGE_MIME};
pub use job::{DownloadJob, InstallPhase, JobKey};
pub use logging::log_installed;
pub use orchestrator::{
    InstallEvent, JobTicket, NextAction, Notice, NoticeLevel, Orchestrator, StartRejected,
    Transition,
};
pub use prober::{CommandProber, ProbeSchedule, Prober};
pub use runner::{
    Collaborators, InstallRunner, RunnerOptions, cancel_job, dispatch, start_job,
};
pub use storage::{DiskStorage, Storage, artifact_file_name, artifact_path, save_artifact};
