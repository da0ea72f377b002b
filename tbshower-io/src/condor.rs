//! HTCondor submission and DAG files for batch processing.
//!
//! Pure text emission: one submission file per job and one DAG file
//! describing the jobs, their dependencies and retry counts.

use crate::Result;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Beam energies (GeV) of the simulated samples.
pub const SIM_BEAM_ENERGIES: [u32; 10] = [20, 30, 50, 80, 100, 120, 150, 200, 250, 300];
/// Simulated ntuples produced per beam energy, numbered from 0.
pub const SIM_NTUPLES_PER_ENERGY: usize = 5;

/// Processing stage a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    /// Hit selection from the raw ntuples.
    Selection,
    /// Cluster analysis of selected hits.
    Analysis,
}

impl JobMode {
    /// Script executed by the job, relative to the base directory.
    #[must_use]
    pub fn script(self) -> &'static str {
        match self {
            Self::Selection => "selector.sh",
            Self::Analysis => "analyzer.sh",
        }
    }

    /// Prefix of the job's output, error and log files.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Selection => "selector",
            Self::Analysis => "analyzer",
        }
    }

    /// Memory requested from the scheduler.
    #[must_use]
    pub fn memory(self) -> &'static str {
        match self {
            Self::Selection => "1.5GB",
            Self::Analysis => "500MB",
        }
    }

    /// Stage name used for job names and submission folders.
    #[must_use]
    pub fn step(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Analysis => "analysis",
        }
    }

    /// Maximum wall time class.
    #[must_use]
    pub fn flavour(self) -> &'static str {
        match self {
            Self::Selection => "workday",
            Self::Analysis => "longlunch",
        }
    }
}

/// Input sample the jobs run on, as understood by the job scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Test-beam data.
    Data,
    /// Simulation including the proton component of the beam.
    SimProton,
    /// Simulation without the proton component.
    SimNoProton,
}

impl DataType {
    /// Label passed to `--datatype`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::SimProton => "sim_proton",
            Self::SimNoProton => "sim_noproton",
        }
    }

    /// Returns true for simulated samples.
    #[must_use]
    pub fn is_simulation(self) -> bool {
        !matches!(self, Self::Data)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One job submission description.
#[derive(Debug, Clone)]
pub struct SubmissionFile {
    /// Ntuple id processed by the job.
    pub id: usize,
    /// Directory holding the scripts and the `out/` and `log/` folders.
    pub base: PathBuf,
    /// Stage the job runs.
    pub mode: JobMode,
    /// Input sample.
    pub datatype: DataType,
    /// Beam energy, passed on for simulated samples only.
    pub energy: Option<u32>,
}

impl SubmissionFile {
    /// Renders the submission file.
    #[must_use]
    pub fn render(&self) -> String {
        let base = &self.base;
        let mode = self.mode;
        let stem = format!("{}_{}.{}", mode.tag(), self.datatype, self.id);
        let energy = if self.datatype.is_simulation() {
            format!(" --energy {}", self.energy.unwrap_or(0))
        } else {
            String::new()
        };

        format!(
            "executable = {executable}\n\
             arguments = --ntupleid {id} --datatype {datatype}{energy}\n\
             universe = vanilla\n\
             requirements = (OpSysAndVer =?= \"CentOS7\")\n\
             output = {output}\n\
             error = {error}\n\
             log = {log}\n\
             RequestMemory = {memory}\n\
             +JobFlavour = \"{flavour}\"\n\
             queue\n",
            executable = base.join(mode.script()).display(),
            id = self.id,
            datatype = self.datatype,
            output = base.join("out").join(format!("{stem}.out")).display(),
            error = base.join("out").join(format!("{stem}.err")).display(),
            log = base.join("log").join(format!("{stem}.log")).display(),
            memory = mode.memory(),
            flavour = mode.flavour(),
        )
    }

    /// Writes the submission file to `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// Writer for DAG files.
pub struct DagWriter<W: Write = File> {
    writer: BufWriter<W>,
}

impl DagWriter<File> {
    /// Creates a DAG file, truncating an existing one.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_writer(File::create(path)?))
    }
}

impl<W: Write> DagWriter<W> {
    /// Wraps an arbitrary sink.
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    /// Declares jobs as `(name, submission file)` pairs.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_jobs<S: AsRef<str>, P: AsRef<Path>>(&mut self, jobs: &[(S, P)]) -> Result<()> {
        for (name, path) in jobs {
            writeln!(self.writer, "JOB {}\t{}", name.as_ref(), path.as_ref().display())?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    /// Declares `(parent, child)` dependencies.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_hierarchy<S: AsRef<str>>(&mut self, edges: &[(S, S)]) -> Result<()> {
        for (dad, child) in edges {
            writeln!(self.writer, "PARENT {} CHILD {}", dad.as_ref(), child.as_ref())?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    /// Sets the retry count of each named job.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_retries<S: AsRef<str>>(&mut self, jobs: &[S], count: u32) -> Result<()> {
        for name in jobs {
            writeln!(self.writer, "RETRY {} {count}", name.as_ref())?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// A job of a [`Pipeline`] stage.
#[derive(Debug, Clone)]
pub struct Job {
    /// Name used in the DAG file.
    pub name: String,
    /// Submission file name, relative to the stage folder.
    pub file_name: String,
    /// Submission description.
    pub submission: SubmissionFile,
}

fn names(jobs: &[Job]) -> Vec<&str> {
    jobs.iter().map(|j| j.name.as_str()).collect()
}

/// Selection and analysis jobs of one sample.
///
/// Data jobs run over the listed ntuple ids. Simulated samples run over
/// [`SIM_NTUPLES_PER_ENERGY`] ntuples at each of the [`SIM_BEAM_ENERGIES`],
/// with selection retried once and analysis twice. Every selection job is
/// the parent of the analysis job of the same ntuple.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Directory holding the scripts and the `out/` and `log/` folders.
    pub base: PathBuf,
    /// Input sample.
    pub datatype: DataType,
    /// Ntuple ids of a data sample; unused for simulation.
    pub ids: Vec<usize>,
    /// Submit only the analysis stage of a simulated sample.
    pub last_step_only: bool,
}

impl Pipeline {
    fn analysis_only(&self) -> bool {
        self.last_step_only && self.datatype.is_simulation()
    }

    /// Stages submitted, in DAG order.
    #[must_use]
    pub fn stages(&self) -> Vec<JobMode> {
        if self.analysis_only() {
            vec![JobMode::Analysis]
        } else {
            vec![JobMode::Selection, JobMode::Analysis]
        }
    }

    /// Name of the DAG file.
    #[must_use]
    pub fn dag_name(&self) -> String {
        if self.analysis_only() {
            format!("clue_{}_analysis_only.dag", self.datatype)
        } else {
            format!("clue_{}.dag", self.datatype)
        }
    }

    fn submission(&self, mode: JobMode, id: usize, energy: Option<u32>) -> SubmissionFile {
        SubmissionFile {
            id,
            base: self.base.clone(),
            mode,
            datatype: self.datatype,
            energy,
        }
    }

    /// Jobs of one stage, in submission order.
    #[must_use]
    pub fn jobs(&self, mode: JobMode) -> Vec<Job> {
        let step = mode.step();
        if self.datatype.is_simulation() {
            SIM_BEAM_ENERGIES
                .iter()
                .flat_map(|&energy| (0..SIM_NTUPLES_PER_ENERGY).map(move |j| (energy, j)))
                .map(|(energy, j)| {
                    let name = format!("{step}_{}_beamen{energy}_{j}", self.datatype);
                    Job {
                        file_name: format!("{name}.sub"),
                        name,
                        submission: self.submission(mode, j, Some(energy)),
                    }
                })
                .collect()
        } else {
            self.ids
                .iter()
                .map(|&id| Job {
                    name: format!("{step}{}_{id}", self.datatype),
                    file_name: format!("{step}{id}.sub"),
                    submission: self.submission(mode, id, None),
                })
                .collect()
        }
    }

    /// Writes the submission files under `submission_dir/<stage>/` and the
    /// DAG file into `submission_dir`, returning the DAG path.
    ///
    /// # Errors
    /// Returns an error if a directory or file cannot be written.
    pub fn write<P: AsRef<Path>>(&self, submission_dir: P) -> Result<PathBuf> {
        let submission_dir = submission_dir.as_ref();
        let stages: Vec<(JobMode, Vec<Job>)> = self
            .stages()
            .into_iter()
            .map(|mode| (mode, self.jobs(mode)))
            .collect();

        let mut declared: Vec<(&str, PathBuf)> = Vec::new();
        for (mode, jobs) in &stages {
            let stage_dir = submission_dir.join(mode.step());
            std::fs::create_dir_all(&stage_dir)?;
            for job in jobs {
                let path = stage_dir.join(&job.file_name);
                job.submission.write(&path)?;
                declared.push((job.name.as_str(), path));
            }
        }

        let dag_path = submission_dir.join(self.dag_name());
        let mut dag = DagWriter::create(&dag_path)?;
        dag.write_jobs(&declared)?;

        if let [(_, selection), (_, analysis)] = stages.as_slice() {
            let edges: Vec<(&str, &str)> =
                names(selection).into_iter().zip(names(analysis)).collect();
            dag.write_hierarchy(&edges)?;
            if self.datatype.is_simulation() {
                dag.write_retries(&names(analysis), 2)?;
                dag.write_retries(&names(selection), 1)?;
            }
        } else if let [(_, analysis)] = stages.as_slice() {
            dag.write_retries(&names(analysis), 1)?;
        }
        dag.flush()?;

        log::info!("wrote {} jobs to {}", declared.len(), dag_path.display());
        Ok(dag_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn submission(mode: JobMode, datatype: DataType) -> SubmissionFile {
        SubmissionFile {
            id: 12,
            base: PathBuf::from("/work/tb"),
            mode,
            datatype,
            energy: Some(50),
        }
    }

    #[test]
    fn test_render_selection_job() {
        let text = submission(JobMode::Selection, DataType::Data).render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "executable = /work/tb/selector.sh",
                "arguments = --ntupleid 12 --datatype data",
                "universe = vanilla",
                "requirements = (OpSysAndVer =?= \"CentOS7\")",
                "output = /work/tb/out/selector_data.12.out",
                "error = /work/tb/out/selector_data.12.err",
                "log = /work/tb/log/selector_data.12.log",
                "RequestMemory = 1.5GB",
                "+JobFlavour = \"workday\"",
                "queue",
            ]
        );
    }

    #[test]
    fn test_render_simulation_passes_energy() {
        let text = submission(JobMode::Analysis, DataType::SimProton).render();
        assert!(text.contains("arguments = --ntupleid 12 --datatype sim_proton --energy 50\n"));
        assert!(text.contains("executable = /work/tb/analyzer.sh\n"));
        assert!(text.contains("output = /work/tb/out/analyzer_sim_proton.12.out\n"));
        assert!(text.contains("RequestMemory = 500MB\n"));
        assert!(text.contains("+JobFlavour = \"longlunch\"\n"));
        assert!(text.ends_with("queue\n"));
    }

    #[test]
    fn test_datatype_labels() {
        assert_eq!(DataType::Data.to_string(), "data");
        assert_eq!(DataType::SimProton.to_string(), "sim_proton");
        assert_eq!(DataType::SimNoProton.to_string(), "sim_noproton");
        assert!(!DataType::Data.is_simulation());
        assert!(DataType::SimNoProton.is_simulation());
    }

    #[test]
    fn test_dag_file() {
        let mut buffer = Vec::new();
        {
            let mut dag = DagWriter::from_writer(&mut buffer);
            dag.write_jobs(&[("sel0", "/jobs/sel0.sub"), ("ana0", "/jobs/ana0.sub")])
                .unwrap();
            dag.write_hierarchy(&[("sel0", "ana0")]).unwrap();
            dag.write_retries(&["sel0", "ana0"], 3).unwrap();
            dag.flush().unwrap();
        }
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "JOB sel0\t/jobs/sel0.sub\nJOB ana0\t/jobs/ana0.sub\n\n\
             PARENT sel0 CHILD ana0\n\n\
             RETRY sel0 3\nRETRY ana0 3\n\n"
        );
    }

    #[test]
    fn test_data_pipeline_links_stages() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline {
            base: PathBuf::from("/work/tb/"),
            datatype: DataType::Data,
            ids: vec![435, 436],
            last_step_only: false,
        };
        let dag_path = pipeline.write(dir.path()).unwrap();
        assert_eq!(dag_path, dir.path().join("clue_data.dag"));

        let dag = std::fs::read_to_string(&dag_path).unwrap();
        let sel = dir.path().join("selection").join("selection435.sub");
        assert!(dag.starts_with(&format!("JOB selectiondata_435\t{}\n", sel.display())));
        assert!(dag.contains("PARENT selectiondata_435 CHILD analysisdata_435\n"));
        assert!(dag.contains("PARENT selectiondata_436 CHILD analysisdata_436\n"));
        assert!(!dag.contains("RETRY"));

        let analysis_file = dir.path().join("analysis").join("analysis436.sub");
        let analysis = std::fs::read_to_string(analysis_file).unwrap();
        assert!(analysis.contains("arguments = --ntupleid 436 --datatype data\n"));
    }

    #[test]
    fn test_simulation_pipeline_sweeps_energies() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline {
            base: PathBuf::from("/work/tb/"),
            datatype: DataType::SimProton,
            ids: Vec::new(),
            last_step_only: false,
        };
        let jobs = pipeline.jobs(JobMode::Selection);
        assert_eq!(jobs.len(), SIM_BEAM_ENERGIES.len() * SIM_NTUPLES_PER_ENERGY);
        assert_eq!(jobs[0].name, "selection_sim_proton_beamen20_0");
        assert_eq!(jobs[6].name, "selection_sim_proton_beamen30_1");
        assert_eq!(jobs[6].submission.id, 1);
        assert_eq!(jobs[6].submission.energy, Some(30));

        let dag_path = pipeline.write(dir.path()).unwrap();
        assert_eq!(dag_path, dir.path().join("clue_sim_proton.dag"));
        let dag = std::fs::read_to_string(&dag_path).unwrap();
        assert!(dag.contains(
            "PARENT selection_sim_proton_beamen300_4 CHILD analysis_sim_proton_beamen300_4\n"
        ));
        assert!(dag.contains("RETRY analysis_sim_proton_beamen20_0 2\n"));
        assert!(dag.contains("RETRY selection_sim_proton_beamen20_0 1\n"));
        let first_analysis_retry = dag.find("RETRY analysis").unwrap();
        let first_selection_retry = dag.find("RETRY selection").unwrap();
        assert!(first_analysis_retry < first_selection_retry);

        let sub = std::fs::read_to_string(
            dir.path()
                .join("analysis")
                .join("analysis_sim_proton_beamen250_3.sub"),
        )
        .unwrap();
        assert!(sub.contains("arguments = --ntupleid 3 --datatype sim_proton --energy 250\n"));
    }

    #[test]
    fn test_simulation_last_step_only() {
        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline {
            base: PathBuf::from("/work/tb/"),
            datatype: DataType::SimNoProton,
            ids: Vec::new(),
            last_step_only: true,
        };
        assert_eq!(pipeline.stages(), vec![JobMode::Analysis]);

        let dag_path = pipeline.write(dir.path()).unwrap();
        assert_eq!(
            dag_path,
            dir.path().join("clue_sim_noproton_analysis_only.dag")
        );
        let dag = std::fs::read_to_string(&dag_path).unwrap();
        assert!(!dag.contains("PARENT"));
        assert!(!dag.contains("selection"));
        assert!(dag.contains("RETRY analysis_sim_noproton_beamen100_2 1\n"));
        assert!(!dir.path().join("selection").exists());
    }

    #[test]
    fn test_write_submission_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.sub");
        submission(JobMode::Selection, DataType::Data)
            .write(&path)
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("queue\n"));
    }
}
