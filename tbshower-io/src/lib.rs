//! tbshower-io: Event input and analysis output for tbshower.
//!
//! This crate reads line-delimited JSON event files through memory maps,
//! writes the analysis dumps, and emits batch-job files for running the
//! analysis on an HTCondor pool.
//!

pub mod condor;
mod error;
pub mod reader;
mod writer;

pub use condor::{
    DagWriter, DataType, Job, JobMode, Pipeline, SubmissionFile, SIM_BEAM_ENERGIES,
    SIM_NTUPLES_PER_ENERGY,
};
pub use error::{Error, Result};
pub use reader::{EventFileReader, EventRecord, MappedFileReader};
pub use writer::{DataFileWriter, CLUSTERS_HEADER, TOTAL_ENERGY_HEADER};
