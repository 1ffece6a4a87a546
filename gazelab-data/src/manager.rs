use crate::error::Result;
use chrono::Local;
use gazelab_core::{CaptureRecord, LandmarkSink, SessionMetadata, TrialConfig};
use log::info;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const METADATA_FILE: &str = "Metadata.json";
const TRIAL_CONFIG_FILE: &str = "setup_config.json";
const LANDMARK_FILE: &str = "landmark_data.csv";
const TRIAL_PREFIX: &str = "Trial_";

/// Owns the on-disk layout of a study:
///
/// ```text
/// <YYYYMMDD>_GazeStudy/
///   S001/
///     Metadata.json
///     Trial_001/
///       setup_config.json
///       landmark_data.csv
/// ```
#[derive(Debug)]
pub struct DataManager {
    base: PathBuf,
    app_version: String,
}

impl DataManager {
    /// Uses `base` if given, otherwise a dated directory under the current
    /// working directory. The directory is created eagerly so later write
    /// failures are genuine trial-scoped errors, not setup mistakes.
    pub fn new(base: Option<PathBuf>, app_version: &str) -> Result<Self> {
        let base = base.unwrap_or_else(|| {
            PathBuf::from(format!("{}_GazeStudy", Local::now().format("%Y%m%d")))
        });
        fs::create_dir_all(&base)?;
        Ok(Self {
            base,
            app_version: app_version.to_string(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Creates (or reuses) `S<id>` with the id zero-padded to three digits.
    pub fn create_subject_dir(&self, subject_id: &str) -> Result<PathBuf> {
        let dir = self.base.join(format!("S{subject_id:0>3}"));
        fs::create_dir_all(&dir)?;
        info!("subject directory ready: {}", dir.display());
        Ok(dir)
    }

    /// Number of `Trial_*` directories already present for the subject.
    pub fn trial_count(&self, subject_dir: &Path) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(subject_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir()
                && entry.file_name().to_string_lossy().starts_with(TRIAL_PREFIX)
            {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Creates the next `Trial_NNN` directory, numbered sequentially from 1
    /// relative to the trials already on disk.
    pub fn create_trial_dir(&self, subject_dir: &Path) -> Result<PathBuf> {
        let number = self.trial_count(subject_dir)? + 1;
        let dir = subject_dir.join(format!("{TRIAL_PREFIX}{number:03}"));
        fs::create_dir_all(&dir)?;
        info!("trial directory created: {}", dir.display());
        Ok(dir)
    }

    pub fn save_metadata(&self, subject_dir: &Path, metadata: &SessionMetadata) -> Result<()> {
        let path = subject_dir.join(METADATA_FILE);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, metadata)?;
        info!("metadata saved to {}", path.display());
        Ok(())
    }

    pub fn save_trial_config(&self, trial_dir: &Path, config: &TrialConfig) -> Result<()> {
        let path = trial_dir.join(TRIAL_CONFIG_FILE);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, config)?;
        info!("trial configuration saved to {}", path.display());
        Ok(())
    }

    pub fn save_landmark_data(
        &self,
        trial_dir: &Path,
        header: &[String],
        records: &[CaptureRecord],
    ) -> Result<()> {
        let path = trial_dir.join(LANDMARK_FILE);
        write_landmark_file(&path, header, records)?;
        info!(
            "landmark data saved to {} ({} rows)",
            path.display(),
            records.len()
        );
        Ok(())
    }

    /// Copies the whole base directory into a timestamped backup under
    /// `dest_root`.
    pub fn backup(&self, dest_root: &Path) -> Result<PathBuf> {
        let backup_dir = dest_root.join(format!(
            "GazeStudy_Backup_{}",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        copy_tree(&self.base, &backup_dir)?;
        info!("backup created at {}", backup_dir.display());
        Ok(backup_dir)
    }
}

fn write_landmark_file(
    path: &Path,
    header: &[String],
    records: &[CaptureRecord],
) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", header.join(","))?;
    for record in records {
        writeln!(writer, "{}", record.csv_row())?;
    }
    writer.flush()
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Sink adapter bound to one trial directory; the orchestration core hands
/// a finished trial's records through this.
#[derive(Debug)]
pub struct TrialStore {
    trial_dir: PathBuf,
}

impl TrialStore {
    pub fn new(trial_dir: PathBuf) -> Self {
        Self { trial_dir }
    }

    pub fn trial_dir(&self) -> &Path {
        &self.trial_dir
    }
}

impl LandmarkSink for TrialStore {
    fn write_landmarks(&mut self, header: &[String], records: &[CaptureRecord]) -> io::Result<()> {
        let path = self.trial_dir.join(LANDMARK_FILE);
        write_landmark_file(&path, header, records)?;
        info!(
            "landmark data saved to {} ({} rows)",
            path.display(),
            records.len()
        );
        Ok(())
    }
}
