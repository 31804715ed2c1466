//! Durable project state: one JSON document per pipeline artifact,
//! stored in a single project directory at fixed relative paths.

use chrono::Utc;
use engine::timeline::{Project, Scene, Stage, TimelineWord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::events::{EventChannel, PipelineEvent};

/// The documents the store owns. Each is one JSON file; each write
/// publishes the matching `*-updated` notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Doc {
    Project,
    Timeline,
    Scenes,
    Annotations,
    KeyframePrompts,
}

impl Doc {
    pub fn file_name(&self) -> &'static str {
        match self {
            Doc::Project => "project.json",
            Doc::Timeline => "timeline.json",
            Doc::Scenes => "scenes.json",
            Doc::Annotations => "annotations.json",
            Doc::KeyframePrompts => "keyframe-prompts.json",
        }
    }

    pub fn updated_event(&self) -> PipelineEvent {
        match self {
            Doc::Project => PipelineEvent::ProjectUpdated,
            Doc::Timeline => PipelineEvent::TimelineUpdated,
            Doc::Scenes => PipelineEvent::ScenesUpdated,
            Doc::Annotations => PipelineEvent::AnnotationsUpdated,
            Doc::KeyframePrompts => PipelineEvent::KeyframePromptsUpdated,
        }
    }
}

/// Journal entry written before a stage result is applied, so a crash
/// between the marker advance and the produced-document notifications
/// can be replayed on startup.
#[derive(Debug, Serialize, Deserialize)]
struct CommitRecord {
    target: Stage,
    produced: Vec<Doc>,
    at: chrono::DateTime<Utc>,
}

pub struct ProjectStore {
    root: PathBuf,
    events: EventChannel,
    // Serializes writes so update notices reach viewers in write order.
    // Same-document concurrent writes are last-write-wins; there is no
    // merge.
    write_lock: Mutex<()>,
}

const WAL_FILE: &str = "commit.wal";

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>, events: EventChannel) -> Result<Self, PipelineError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        for sub in ["style", "keyframes", "clips", "output"] {
            fs::create_dir_all(root.join(sub))?;
        }
        let store = ProjectStore {
            root,
            events,
            write_lock: Mutex::new(()),
        };
        store.recover()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn doc_path(&self, doc: Doc) -> PathBuf {
        self.root.join(doc.file_name())
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.root.join("clips")
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join("output").join("final.mp4")
    }

    /// The song audio, if uploaded: audio.mp3 with audio.wav fallback.
    pub fn audio_path(&self) -> Option<PathBuf> {
        for name in ["audio.mp3", "audio.wav"] {
            let path = self.root.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    pub fn read_raw(&self, doc: Doc) -> Result<Option<String>, PipelineError> {
        match fs::read_to_string(self.doc_path(doc)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn read<T: DeserializeOwned>(&self, doc: Doc) -> Result<Option<T>, PipelineError> {
        match self.read_raw(doc)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Replace a document wholesale and notify viewers.
    pub fn write<T: Serialize>(&self, doc: Doc, value: &T) -> Result<(), PipelineError> {
        let _guard = self.write_lock.lock().unwrap();
        self.write_file(doc, value)?;
        self.events.publish(doc.updated_event());
        Ok(())
    }

    // Atomic per file: write a temp sibling, then rename over.
    fn write_file<T: Serialize>(&self, doc: Doc, value: &T) -> Result<(), PipelineError> {
        let path = self.doc_path(doc);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// The singleton project record, created with defaults and
    /// persisted on first read.
    pub fn project(&self) -> Result<Project, PipelineError> {
        if let Some(project) = self.read::<Project>(Doc::Project)? {
            return Ok(project);
        }
        let project = Project::default();
        self.write(Doc::Project, &project)?;
        Ok(project)
    }

    pub fn set_project(&self, project: &Project) -> Result<(), PipelineError> {
        self.write(Doc::Project, project)
    }

    /// Absent pipeline documents read as empty sequences; callers must
    /// tolerate an empty pipeline state at any stage.
    pub fn timeline(&self) -> Result<Vec<TimelineWord>, PipelineError> {
        Ok(self.read(Doc::Timeline)?.unwrap_or_default())
    }

    pub fn scenes(&self) -> Result<Vec<Scene>, PipelineError> {
        Ok(self.read(Doc::Scenes)?.unwrap_or_default())
    }

    pub fn annotations(&self) -> Result<Value, PipelineError> {
        Ok(self
            .read(Doc::Annotations)?
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    pub fn keyframe_prompts(&self) -> Result<Value, PipelineError> {
        Ok(self
            .read(Doc::KeyframePrompts)?
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// Apply a successful stage result as one committed unit: journal
    /// the intent, advance the stage marker (forward only), notify for
    /// each document the stage produced, then drop the journal. A crash
    /// mid-commit is replayed by `recover`.
    pub fn commit_stage_result(
        &self,
        target: Stage,
        produced: &[Doc],
    ) -> Result<Project, PipelineError> {
        let _guard = self.write_lock.lock().unwrap();
        let record = CommitRecord {
            target,
            produced: produced.to_vec(),
            at: Utc::now(),
        };
        let wal = self.root.join(WAL_FILE);
        fs::write(&wal, serde_json::to_string(&record)?)?;

        let project = self.apply_commit(&record)?;

        fs::remove_file(&wal)?;
        Ok(project)
    }

    fn apply_commit(&self, record: &CommitRecord) -> Result<Project, PipelineError> {
        let mut project = match self.read::<Project>(Doc::Project)? {
            Some(p) => p,
            None => Project::default(),
        };
        // The marker never moves backwards.
        if record.target > project.stage {
            project.stage = record.target;
            self.write_file(Doc::Project, &project)?;
        }
        self.events.publish(PipelineEvent::ProjectUpdated);
        for doc in &record.produced {
            self.events.publish(doc.updated_event());
        }
        Ok(project)
    }

    /// Replay a commit the previous run journalled but did not finish.
    fn recover(&self) -> Result<(), PipelineError> {
        let wal = self.root.join(WAL_FILE);
        let text = match fs::read_to_string(&wal) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<CommitRecord>(&text) {
            Ok(record) => {
                info!(
                    "replaying unfinished commit to stage {} from {}",
                    record.target.as_str(),
                    record.at
                );
                self.apply_commit(&record)?;
            }
            Err(e) => warn!("discarding unreadable commit journal: {}", e),
        }
        fs::remove_file(&wal)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::timeline::Transition;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ProjectStore, EventChannel) {
        let dir = TempDir::new().unwrap();
        let events = EventChannel::new(64);
        let store = ProjectStore::new(dir.path(), events.clone()).unwrap();
        (dir, store, events)
    }

    fn scene(label: &str, start: f64, end: f64) -> Scene {
        Scene {
            label: label.to_string(),
            description: "desc".to_string(),
            start,
            end,
            status: "pending".to_string(),
            prompt: None,
            annotation: None,
            transition: Transition::Cut,
        }
    }

    #[test]
    fn write_then_read_is_byte_identical() {
        let (_dir, store, _events) = setup();
        let scenes = vec![scene("intro", 0.0, 8.0), scene("verse", 8.0, 20.0)];
        store.write(Doc::Scenes, &scenes).unwrap();

        let on_disk = store.read_raw(Doc::Scenes).unwrap().unwrap();
        assert_eq!(on_disk, serde_json::to_string_pretty(&scenes).unwrap());
    }

    #[test]
    fn absent_documents_read_as_empty_sequences() {
        let (_dir, store, _events) = setup();
        assert!(store.timeline().unwrap().is_empty());
        assert!(store.scenes().unwrap().is_empty());
        assert_eq!(store.annotations().unwrap(), serde_json::json!([]));
        assert_eq!(store.keyframe_prompts().unwrap(), serde_json::json!([]));
    }

    #[test]
    fn project_is_created_and_persisted_on_first_read() {
        let (_dir, store, _events) = setup();
        assert!(!store.doc_path(Doc::Project).exists());

        let project = store.project().unwrap();
        assert_eq!(project.stage, Stage::Init);
        assert!(store.doc_path(Doc::Project).exists());
    }

    #[test]
    fn every_write_publishes_an_updated_notice() {
        let (_dir, store, events) = setup();
        let mut rx = events.subscribe();

        store
            .write(Doc::Timeline, &Vec::<TimelineWord>::new())
            .unwrap();
        store.write(Doc::Scenes, &Vec::<Scene>::new()).unwrap();

        assert!(matches!(rx.try_recv(), Ok(PipelineEvent::TimelineUpdated)));
        assert!(matches!(rx.try_recv(), Ok(PipelineEvent::ScenesUpdated)));
    }

    #[test]
    fn stage_marker_never_moves_backwards() {
        let (_dir, store, _events) = setup();
        let project = store
            .commit_stage_result(Stage::Storyboarded, &[Doc::Scenes])
            .unwrap();
        assert_eq!(project.stage, Stage::Storyboarded);

        // A re-run of an earlier stage must not regress the marker.
        let project = store
            .commit_stage_result(Stage::Transcribed, &[Doc::Timeline])
            .unwrap();
        assert_eq!(project.stage, Stage::Storyboarded);
    }

    #[test]
    fn pending_commit_journal_is_replayed_on_startup() {
        let dir = TempDir::new().unwrap();
        {
            let events = EventChannel::new(64);
            let store = ProjectStore::new(dir.path(), events).unwrap();
            store.project().unwrap();
            // Simulate a crash after journalling but before the marker
            // advance landed.
            fs::write(
                dir.path().join(WAL_FILE),
                r#"{"target":"transcribed","produced":["timeline"],"at":"2026-08-29T00:00:00Z"}"#,
            )
            .unwrap();
        }

        let events = EventChannel::new(64);
        let mut rx = events.subscribe();
        let store = ProjectStore::new(dir.path(), events.clone()).unwrap();

        assert_eq!(store.project().unwrap().stage, Stage::Transcribed);
        assert!(!dir.path().join(WAL_FILE).exists());
        assert!(matches!(rx.try_recv(), Ok(PipelineEvent::ProjectUpdated)));
        assert!(matches!(rx.try_recv(), Ok(PipelineEvent::TimelineUpdated)));
    }
}
