//! The coordinator side of the system: experiment records and their
//! lifecycle, matrix enumeration with seeded crash schedules, JSON reports
//! and the orchestrating actor.

mod experiment;
mod generator;
mod report;
mod tracker;

#[rustfmt::skip]
pub use {
  experiment::ExpectedCrash,
  experiment::Experiment,
  experiment::ExperimentSettings,
  experiment::ReportedCrash,
  generator::crash_schedule,
  generator::generate_experiments,
  generator::ExperimentMatrix,
  report::ExpectedCrashEntry,
  report::Report,
  report::ReportError,
  report::ReportResult,
  report::ReportSettings,
  report::ReportedCrashEntry,
  tracker::Tracker,
};
