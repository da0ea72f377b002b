//! Memory-mapped readers for line-delimited JSON event files.
//!
//! Each non-blank line holds one event:
//!
//! ```json
//! {"event": 12, "run": 436, "beam_energy": 50.0,
//!  "x": [0.1, 1.2], "y": [0.4, 0.3], "energy": [12.5, 3.1],
//!  "layer": [1, 1], "cluster_id": [0, -1],
//!  "impact_x": [0.2, null], "impact_y": [0.5, null]}
//! ```
//!
//! `rho`, `delta`, `is_seed`, `cluster_size`, `impact_x` and `impact_y` are
//! optional. Impact arrays are indexed by `layer - 1`; `null` marks a layer
//! without a track extrapolation. Lines starting with `#` are comments.

use crate::{Error, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tbshower_algorithms::EventInput;
use tbshower_core::{EventContext, HitBatch, HitColumns, ImpactPoint, ImpactPoints, ShowerType};

/// A memory-mapped file reader.
///
/// Zero-length files are not mapped and read as empty.
pub struct MappedFileReader {
    mmap: Option<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
            #[allow(unsafe_code)]
            let mmap = unsafe { Mmap::map(&file)? };
            Some(mmap)
        };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Path the reader was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One event as stored on disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub event: u64,
    #[serde(default)]
    pub run: u32,
    #[serde(default)]
    pub beam_energy: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shower_type: Option<ShowerType>,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub energy: Vec<f32>,
    pub layer: Vec<u32>,
    pub cluster_id: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rho: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_seed: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_size: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_x: Option<Vec<Option<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_y: Option<Vec<Option<f32>>>,
}

impl EventRecord {
    /// Impact points of the record, if it carries any.
    ///
    /// # Errors
    /// Returns a message if only one coordinate array is present or the two
    /// differ in length.
    fn impact_points(&self) -> std::result::Result<Option<ImpactPoints>, String> {
        match (&self.impact_x, &self.impact_y) {
            (None, None) => Ok(None),
            (Some(xs), Some(ys)) if xs.len() == ys.len() => {
                let mut points = ImpactPoints::new();
                for (layer, (x, y)) in (1u32..).zip(xs.iter().zip(ys)) {
                    if let (Some(x), Some(y)) = (x, y) {
                        points.insert(layer, ImpactPoint::new(*x, *y));
                    }
                }
                Ok(Some(points))
            }
            (Some(xs), Some(ys)) => Err(format!(
                "impact_x has {} layers but impact_y has {}",
                xs.len(),
                ys.len()
            )),
            _ => Err("impact_x and impact_y must be given together".to_string()),
        }
    }

    /// Validates the record and turns it into an analysis input.
    ///
    /// `default_shower` applies when the record does not name its shower type.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for inconsistent impact arrays and
    /// [`Error::InvalidEvent`] when the hit columns fail validation.
    pub fn into_input(self, line: usize, default_shower: ShowerType) -> Result<EventInput> {
        let impacts = self
            .impact_points()
            .map_err(|message| Error::InvalidFormat { line, message })?;
        let context = EventContext {
            event: self.event,
            run: self.run,
            beam_energy: self.beam_energy,
            shower_type: self.shower_type.unwrap_or(default_shower),
        };
        let columns = HitColumns {
            x: self.x,
            y: self.y,
            energy: self.energy,
            layer: self.layer,
            cluster_id: self.cluster_id,
            rho: self.rho,
            delta: self.delta,
            is_seed: self.is_seed,
            cluster_size: self.cluster_size,
        };
        let batch = HitBatch::from_columns(context, columns)
            .map_err(|source| Error::InvalidEvent { line, source })?;
        Ok(EventInput { batch, impacts })
    }
}

/// Reader for line-delimited JSON event files.
pub struct EventFileReader {
    reader: MappedFileReader,
    shower_type: ShowerType,
}

impl EventFileReader {
    /// Opens an event file; events without a shower type are taken as EM.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            reader: MappedFileReader::open(path)?,
            shower_type: ShowerType::Em,
        })
    }

    /// Sets the shower type assumed for events that do not name one.
    #[must_use]
    pub fn with_shower_type(mut self, shower_type: ShowerType) -> Self {
        self.shower_type = shower_type;
        self
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Iterates over the raw records with their 1-based line numbers.
    pub fn records(&self) -> impl Iterator<Item = Result<(usize, EventRecord)>> + '_ {
        self.reader
            .as_bytes()
            .split(|&b| b == b'\n')
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_ascii()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with(b"#"))
            .map(|(line_no, line)| {
                serde_json::from_slice::<EventRecord>(line)
                    .map(|record| (line_no, record))
                    .map_err(|e| Error::InvalidFormat {
                        line: line_no,
                        message: e.to_string(),
                    })
            })
    }

    /// Iterates over validated analysis inputs.
    pub fn events(&self) -> impl Iterator<Item = Result<EventInput>> + '_ {
        let shower_type = self.shower_type;
        self.records().map(move |record| {
            let (line, record) = record?;
            record.into_input(line, shower_type)
        })
    }

    /// Reads every event, failing on the first invalid line.
    ///
    /// # Errors
    /// Returns the first decoding or validation error.
    pub fn read_all(&self) -> Result<Vec<EventInput>> {
        let events = self.events().collect::<Result<Vec<_>>>()?;
        log::info!(
            "read {} events from {}",
            events.len(),
            self.reader.path().display()
        );
        Ok(events)
    }

    /// Reads every valid event and logs the invalid ones.
    #[must_use]
    pub fn read_valid(&self) -> Vec<EventInput> {
        let mut skipped = 0usize;
        let events: Vec<EventInput> = self
            .events()
            .filter_map(|event| match event {
                Ok(event) => Some(event),
                Err(e) => {
                    log::warn!("skipping event: {e}");
                    skipped += 1;
                    None
                }
            })
            .collect();
        log::info!(
            "read {} events from {} ({} skipped)",
            events.len(),
            self.reader.path().display(),
            skipped
        );
        events
    }
}
