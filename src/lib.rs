//! Workflow configuration and launch engine for a Galaxy-backed genome data
//! portal: match workflows to assemblies, plan and fill configuration steps,
//! and turn a finished configuration into a Galaxy landing request.

pub mod catalog;
pub mod compat;
pub mod config;
pub mod configure;
pub mod domain;
pub mod ena;
pub mod error;
pub mod launch;
pub mod request;
pub mod stepper;
pub mod steps;
