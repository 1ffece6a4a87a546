use chrono::Local;
use serde::{Deserialize, Serialize};

/// Subject demographics collected before the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub id: String,
    pub age: u32,
    pub gender: String,
    pub vision_correction: String,
    pub dominant_eye: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub date: String,
    pub start_time: String,
    pub experimenter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareInfo {
    pub app_version: String,
}

/// A free-form experimenter note with the time it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionNote {
    pub timestamp: String,
    pub note: String,
}

/// The document written to `Metadata.json` in the subject directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub subject: SubjectInfo,
    pub session: SessionInfo,
    pub software: SoftwareInfo,
    pub notes: Vec<SessionNote>,
}

impl SessionMetadata {
    /// Stamps the session block with the current date and time.
    pub fn new(subject: SubjectInfo, experimenter: &str, app_version: &str) -> Self {
        let now = Local::now();
        Self {
            subject,
            session: SessionInfo {
                date: now.format("%Y-%m-%d").to_string(),
                start_time: now.format("%H:%M:%S").to_string(),
                experimenter: experimenter.to_string(),
            },
            software: SoftwareInfo {
                app_version: app_version.to_string(),
            },
            notes: Vec::new(),
        }
    }

    pub fn add_note(&mut self, note: &str) {
        self.notes.push(SessionNote {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            note: note.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_document_shape() {
        let mut meta = SessionMetadata::new(
            SubjectInfo {
                id: "001".to_string(),
                age: 25,
                gender: "Female".to_string(),
                vision_correction: "None".to_string(),
                dominant_eye: "Right".to_string(),
            },
            "exp-01",
            "0.1.0",
        );
        meta.add_note("camera remounted");

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["subject"]["id"], "001");
        assert_eq!(json["session"]["experimenter"], "exp-01");
        assert_eq!(json["software"]["app_version"], "0.1.0");
        assert_eq!(json["notes"][0]["note"], "camera remounted");
    }
}
