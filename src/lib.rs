//! slurmtools - job inspection, cancellation and a live queue view for Slurm
//!
//! The scheduler is only ever reached through [`slurm::SlurmCommands`], so
//! every component can be driven by canned `scontrol`/`squeue` output.

pub mod catalog;
pub mod display;
pub mod error;
pub mod formatting;
pub mod last_submit;
pub mod models;
pub mod queue;
pub mod slurm;
pub mod tui;
