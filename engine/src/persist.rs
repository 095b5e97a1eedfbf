use crate::classify::AlphaProfile;
use crate::config::EngineConfig;
use crate::index::{HybridIndex, IndexSnapshot, PassageRecord};
use crate::vocabulary::Vocabulary;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Snapshot directory header: whatever a caller needs to sanity-check a
/// snapshot without loading the passage table.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_passages: u32,
    pub dimension: usize,
    pub created_at: String,
    pub version: u32,
}

pub const SNAPSHOT_VERSION: u32 = 1;

pub struct SnapshotPaths {
    pub root: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
    fn vocabulary(&self) -> PathBuf {
        self.root.join("vocabulary.bin")
    }
    fn passages(&self) -> PathBuf {
        self.root.join("passages.bin")
    }
    fn profiles(&self) -> PathBuf {
        self.root.join("profiles.json")
    }
    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
}

fn write_bincode<T: Serialize>(path: PathBuf, value: &T) -> Result<()> {
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bincode<T: for<'de> Deserialize<'de>>(path: PathBuf) -> Result<T> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

/// Persist the full index state so a restart is a pure load.
pub fn save_snapshot(paths: &SnapshotPaths, index: &HybridIndex, created_at: String) -> Result<()> {
    create_dir_all(&paths.root)?;
    let snapshot = index.snapshot();
    write_bincode(paths.vocabulary(), &snapshot.vocabulary)?;
    write_bincode(paths.passages(), &snapshot.passages)?;
    save_profiles(paths, &snapshot.profile)?;
    let meta = MetaFile {
        num_passages: snapshot.passages.len() as u32,
        dimension: snapshot.dimension,
        created_at,
        version: SNAPSHOT_VERSION,
    };
    let mut f = File::create(paths.meta())?;
    f.write_all(serde_json::to_string_pretty(&meta)?.as_bytes())?;
    Ok(())
}

/// Rebuild an in-memory index from a snapshot directory.
pub fn load_snapshot(paths: &SnapshotPaths, config: EngineConfig) -> Result<HybridIndex> {
    let vocabulary: Vocabulary = read_bincode(paths.vocabulary())?;
    let passages: HashMap<String, PassageRecord> = read_bincode(paths.passages())?;
    let profile = load_profiles(paths)?;
    let meta = load_meta(paths)?;
    let snapshot = IndexSnapshot {
        dimension: meta.dimension,
        vocabulary,
        passages,
        profile,
    };
    Ok(HybridIndex::from_snapshot(snapshot, config))
}

/// Tuned fusion weights are kept human-readable next to the binary files.
pub fn save_profiles(paths: &SnapshotPaths, profile: &AlphaProfile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.profiles())?;
    f.write_all(serde_json::to_string_pretty(profile)?.as_bytes())?;
    Ok(())
}

pub fn load_profiles(paths: &SnapshotPaths) -> Result<AlphaProfile> {
    let mut f = File::open(paths.profiles())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

pub fn load_meta(paths: &SnapshotPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}
