//! Garden service context: active profile, active document and persistence.
//!
//! # Responsibility
//! - Own the injected [`KeyValueStore`] and the single live document.
//! - Load (migrating) and save full document snapshots.
//! - Apply the unknown-id policy for every mutating use-case.
//!
//! # Invariants
//! - After construction the profile index holds at least one profile and
//!   `current_id` resolves to it.
//! - Every successful mutation has been persisted before it returns.
//! - Corrupt or absent stored state is replaced, never reported as an error.
//! - Stored text that cannot be read is copied to its [`unreadable_key`]
//!   before anything replaces it.
//!
//! # See also
//! - `profile_service`, `parcel_service`, `plant_service` for use-cases.

use crate::config::{GardenConfig, UnknownIdPolicy, DEFAULT_ROTATION_YEARS};
use crate::model::garden::{CellOutOfRange, GardenDocument, Parcel};
use crate::model::profile::{ProfileIndex, DEFAULT_PROFILE_NAME};
use crate::report::{rotation_history, RotationReport};
use crate::repo::kv_repo::{KeyValueStore, RepoError, SqliteKeyValueStore};
use crate::schema::{migrate, try_migrate_text};
use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key of the profile index.
pub const PROFILE_INDEX_KEY: &str = "garden-profiles-index-v1";

/// Storage key of one profile's document.
pub fn document_key(profile_id: &str) -> String {
    format!("garden-db-v4-{profile_id}")
}

/// Storage key holding the last unreadable text found under `key`.
pub fn unreadable_key(key: &str) -> String {
    format!("{key}.unreadable")
}

pub type GardenResult<T> = Result<T, GardenError>;

/// Service error for garden use-cases.
#[derive(Debug)]
pub enum GardenError {
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Snapshot could not be serialized.
    Encode(serde_json::Error),
    /// Unknown id under [`UnknownIdPolicy::Reject`].
    NotFound { kind: &'static str, id: String },
    /// Grid coordinates outside the current parcel.
    CellOutOfRange(CellOutOfRange),
}

impl Display for GardenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode snapshot: {err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::CellOutOfRange(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GardenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::CellOutOfRange(err) => Some(err),
            Self::NotFound { .. } => None,
        }
    }
}

impl From<RepoError> for GardenError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for GardenError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

impl From<CellOutOfRange> for GardenError {
    fn from(value: CellOutOfRange) -> Self {
        Self::CellOutOfRange(value)
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Garden use-case facade over one key-value store.
pub struct GardenService<S: KeyValueStore> {
    pub(super) store: S,
    pub(super) policy: UnknownIdPolicy,
    pub(super) rotation_years: usize,
    pub(super) index: ProfileIndex,
    pub(super) document: GardenDocument,
    pub(super) clock: fn() -> NaiveDate,
}

impl GardenService<SqliteKeyValueStore> {
    /// Opens the SQLite store named by `config` (in memory when `db_path` is
    /// unset) and loads the current profile.
    pub fn open(config: &GardenConfig) -> GardenResult<Self> {
        let store = match &config.db_path {
            Some(path) => SqliteKeyValueStore::open(path)?,
            None => SqliteKeyValueStore::open_in_memory()?,
        };
        let mut service = Self::with_policy(store, config.unknown_id_policy)?;
        service.rotation_years = config.rotation_years.max(1);
        Ok(service)
    }
}

impl<S: KeyValueStore> GardenService<S> {
    /// Creates a service with the default (ignore) unknown-id policy.
    pub fn new(store: S) -> GardenResult<Self> {
        Self::with_policy(store, UnknownIdPolicy::default())
    }

    /// Creates a service, loading or bootstrapping the profile index and the
    /// current profile's document.
    pub fn with_policy(mut store: S, policy: UnknownIdPolicy) -> GardenResult<Self> {
        let index = load_index(&mut store)?;
        let document = load_document(&mut store, &index.current_id)?;
        info!(
            "event=service_open module=service status=ok profiles={} policy={:?}",
            index.list.len(),
            policy
        );
        Ok(Self {
            store,
            policy,
            rotation_years: DEFAULT_ROTATION_YEARS,
            index,
            document,
            clock: local_today,
        })
    }

    /// Replaces the date source used for default timestamps.
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn document(&self) -> &GardenDocument {
        &self.document
    }

    pub fn current_parcel(&self) -> &Parcel {
        self.document.current_parcel()
    }

    pub fn current_profile_id(&self) -> &str {
        &self.index.current_id
    }

    pub fn policy(&self) -> UnknownIdPolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Writes the current document snapshot.
    pub fn save(&mut self) -> GardenResult<()> {
        persist_document(&mut self.store, &self.index.current_id, &self.document)
    }

    /// Rotation timeline of one parcel of the current document.
    pub fn rotation_history(&self, parcel_id: &str, years_back: usize) -> RotationReport {
        rotation_history(&self.document, parcel_id, years_back)
    }

    /// Rotation timeline of the current parcel over the configured window.
    pub fn current_rotation_history(&self) -> RotationReport {
        rotation_history(
            &self.document,
            self.document.current_parcel_id(),
            self.rotation_years,
        )
    }

    /// Current document as JSON, ready for an export collaborator.
    pub fn export_snapshot(&self) -> GardenResult<Value> {
        Ok(serde_json::to_value(&self.document)?)
    }

    /// Replaces the current profile's document with `raw`, migrated.
    ///
    /// Unreadable input yields a fresh document, as on load.
    pub fn import_snapshot(&mut self, raw: &Value) -> GardenResult<()> {
        self.document = migrate(raw);
        self.save()?;
        info!(
            "event=snapshot_import module=service status=ok profile_id={} plants={} parcels={}",
            self.index.current_id,
            self.document.plants().len(),
            self.document.parcels().len()
        );
        Ok(())
    }

    pub(super) fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub(super) fn persist_index(&mut self) -> GardenResult<()> {
        persist_index(&mut self.store, &self.index)
    }

    /// Applies the unknown-id policy to a miss.
    pub(super) fn unknown(&self, event: &'static str, kind: &'static str, id: &str) -> GardenResult<()> {
        debug!(
            "event={} module=service status=noop reason=unknown_{} id={}",
            event, kind, id
        );
        match self.policy {
            UnknownIdPolicy::Ignore => Ok(()),
            UnknownIdPolicy::Reject => Err(GardenError::NotFound {
                kind,
                id: id.to_string(),
            }),
        }
    }

    /// Persists the document after a successful mutation.
    pub(super) fn commit(&mut self, event: &'static str) -> GardenResult<()> {
        self.save()?;
        debug!(
            "event={} module=service status=ok profile_id={}",
            event, self.index.current_id
        );
        Ok(())
    }
}

pub(super) fn load_index<S: KeyValueStore>(store: &mut S) -> GardenResult<ProfileIndex> {
    let stored = store.retrieve(PROFILE_INDEX_KEY)?;
    let decoded = stored
        .as_deref()
        .and_then(|text| serde_json::from_str::<ProfileIndex>(text).ok());

    match decoded {
        Some(mut index) => {
            let before = index.clone();
            if index.repair() {
                if index != before {
                    warn!(
                        "event=profile_index_load module=service status=repaired profiles={}",
                        index.list.len()
                    );
                    persist_index(store, &index)?;
                }
                return Ok(index);
            }
            warn!("event=profile_index_load module=service status=reset reason=empty");
        }
        None => {
            info!("event=profile_index_load module=service status=reset reason=absent_or_corrupt");
        }
    }

    if let Some(text) = stored.as_deref().filter(|text| !text.trim().is_empty()) {
        preserve_unreadable(store, PROFILE_INDEX_KEY, text)?;
    }
    let index = ProfileIndex::with_single(DEFAULT_PROFILE_NAME);
    persist_index(store, &index)?;
    Ok(index)
}

/// Reads and migrates one profile's document; absent or non-canonical
/// snapshots are written back in current form.
///
/// Unreadable text is never overwritten here: it is copied aside and the
/// profile starts from a fresh document in memory.
pub(super) fn load_document<S: KeyValueStore>(
    store: &mut S,
    profile_id: &str,
) -> GardenResult<GardenDocument> {
    let key = document_key(profile_id);
    let stored = store.retrieve(&key)?;
    let text = stored.as_deref().filter(|text| !text.trim().is_empty());
    let document = match text {
        Some(text) => match try_migrate_text(text) {
            Some(document) => document,
            None => {
                preserve_unreadable(store, &key, text)?;
                warn!(
                    "event=document_load module=service status=fallback reason=unreadable profile_id={}",
                    profile_id
                );
                return Ok(GardenDocument::fresh());
            }
        },
        None => GardenDocument::fresh(),
    };
    let canonical = serde_json::to_string(&document)?;
    if stored.as_deref() != Some(canonical.as_str()) {
        store.persist(&key, &canonical)?;
        debug!(
            "event=document_load module=service status=rewritten profile_id={} existed={}",
            profile_id,
            stored.is_some()
        );
    }
    Ok(document)
}

pub(super) fn persist_document<S: KeyValueStore>(
    store: &mut S,
    profile_id: &str,
    document: &GardenDocument,
) -> GardenResult<()> {
    let text = serde_json::to_string(document)?;
    store.persist(&document_key(profile_id), &text)?;
    Ok(())
}

fn preserve_unreadable<S: KeyValueStore>(store: &mut S, key: &str, text: &str) -> GardenResult<()> {
    let backup = unreadable_key(key);
    store.persist(&backup, text)?;
    warn!(
        "event=store_backup module=service status=ok key={} backup_key={} bytes={}",
        key,
        backup,
        text.len()
    );
    Ok(())
}

fn persist_index<S: KeyValueStore>(store: &mut S, index: &ProfileIndex) -> GardenResult<()> {
    let text = serde_json::to_string(index)?;
    store.persist(PROFILE_INDEX_KEY, &text)?;
    Ok(())
}
