//! Writers for analysis dumps.
#![allow(clippy::cast_precision_loss)]

use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tbshower_algorithms::{RunAnalysis, RunSummary};
use tbshower_core::ClusterOutput;

/// Header of the individual-cluster dump.
pub const CLUSTERS_HEADER: &str =
    "###Cluster Analysis: individual clusters (posx, posy, posz, energy)";
/// Header of the total-energy dump.
pub const TOTAL_ENERGY_HEADER: &str = "###Cluster Analysis: total energy";

/// Writer for analysis output files.
pub struct DataFileWriter<W: Write = File> {
    writer: BufWriter<W>,
}

impl DataFileWriter<File> {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> DataFileWriter<W> {
    /// Wraps an arbitrary sink.
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    /// Writes one `x,y,z,energy` line per entry, `z` being the layer.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_individual_clusters(&mut self, outputs: &[ClusterOutput]) -> Result<()> {
        writeln!(self.writer, "{CLUSTERS_HEADER}")?;
        for o in outputs {
            writeln!(self.writer, "{},{},{},{}", o.x, o.y, o.layer, o.energy)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the run's total clustered energy.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_total_energy(&mut self, total: f32) -> Result<()> {
        writeln!(self.writer, "{TOTAL_ENERGY_HEADER}")?;
        writeln!(self.writer, "{total}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes every 2D cluster of the run as CSV.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_clusters_csv(&mut self, run: &RunAnalysis) -> Result<()> {
        writeln!(
            self.writer,
            "event,layer,cluster_id,n_hits,energy,energy_cut,x,y"
        )?;
        for event in &run.events {
            for c in event.clusters.clusters() {
                writeln!(
                    self.writer,
                    "{},{},{},{},{},{},{},{}",
                    event.context.event,
                    c.layer,
                    c.cluster_id,
                    c.n_hits,
                    c.energy,
                    c.energy_cut,
                    c.x,
                    c.y
                )?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes per-layer totals of the run as CSV.
    ///
    /// Mean rho and delta are empty when the input carried no such column.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_layers_csv(&mut self, run: &RunAnalysis) -> Result<()> {
        writeln!(
            self.writer,
            "layer,n_hits,n_clustered,hits_fraction,energy_fraction,clustered_energy,mean_rho,mean_delta,n_seeds"
        )?;
        for (l, occ) in run.layer_totals().iter().enumerate() {
            let mut rho = (0.0f64, 0usize);
            let mut delta = (0.0f64, 0usize);
            let mut n_seeds = 0usize;
            for slice in run.events.iter().filter_map(|e| e.layers.get(l)) {
                rho.0 += slice.rho.iter().map(|&v| f64::from(v)).sum::<f64>();
                rho.1 += slice.rho.len();
                delta.0 += slice.delta.iter().map(|&v| f64::from(v)).sum::<f64>();
                delta.1 += slice.delta.len();
                n_seeds += slice.n_seeds();
            }
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{}",
                occ.layer,
                occ.n_hits,
                occ.n_clustered,
                occ.hits_fraction(),
                occ.energy_fraction(),
                occ.clustered_energy,
                mean_or_empty(rho),
                mean_or_empty(delta),
                n_seeds
            )?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes one residual line per cluster that has an impact point.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_resolution_csv(&mut self, run: &RunAnalysis) -> Result<()> {
        writeln!(self.writer, "event,layer,cluster_id,x,y,dx,dy")?;
        for event in &run.events {
            for c in event.clusters.clusters() {
                let Some(r) = c.residual else {
                    continue;
                };
                writeln!(
                    self.writer,
                    "{},{},{},{},{},{},{}",
                    event.context.event, c.layer, c.cluster_id, c.x, c.y, r.dx, r.dy
                )?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the run summary as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_summary_json(&mut self, summary: &RunSummary) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, summary)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
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

fn mean_or_empty((sum, n): (f64, usize)) -> String {
    if n == 0 {
        String::new()
    } else {
        (sum / n as f64).to_string()
    }
}
