// In-memory collaborators for workflow and router tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::db::MemberDirectory;
use crate::error::{AppError, AppResult};
use crate::face::{CollectionNaming, FaceMatch, FaceService, ImageRef, IndexedFace};
use crate::models::{
    AttendanceEntry, AttendanceRecord, Event, ImageUpload, Member, NewMember, Organization,
};
use crate::storage::StorageBackend;

use super::Backends;

pub const PREFIX: &str = "test-members";

pub fn jpeg() -> ImageUpload {
    ImageUpload {
        data: Bytes::from_static(b"\xff\xd8\xff\xe0fake-jpeg"),
        content_type: "image/jpeg".to_string(),
    }
}

/// Lets spawned best-effort tasks run to completion on the test runtime.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
struct DirectoryState {
    next_id: i64,
    orgs: Vec<Organization>,
    events: Vec<Event>,
    members: Vec<Member>,
    attendance: Vec<AttendanceRecord>,
}

impl DirectoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<DirectoryState>,
    pub fail_member_insert: AtomicBool,
}

impl FakeDirectory {
    pub fn seed_org(&self, name: &str, email: &str) -> Organization {
        let mut state = self.state.lock().unwrap();
        let org = Organization {
            id: state.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "unused".to_string(),
        };
        state.orgs.push(org.clone());
        org
    }

    pub fn seed_member(&self, org_id: i64, face_id: &str, email: &str) -> Member {
        let mut state = self.state.lock().unwrap();
        let member = Member {
            id: state.next_id(),
            face_id: face_id.to_string(),
            org_id,
            email: email.to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
        };
        state.members.push(member.clone());
        member
    }

    pub fn seed_event(&self, org_id: i64, name: &str) -> Event {
        let mut state = self.state.lock().unwrap();
        let event = Event {
            id: state.next_id(),
            name: name.to_string(),
            org_id,
            start_date: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        state.events.push(event.clone());
        event
    }

    pub fn orgs(&self) -> Vec<Organization> {
        self.state.lock().unwrap().orgs.clone()
    }

    pub fn members(&self) -> Vec<Member> {
        self.state.lock().unwrap().members.clone()
    }

    pub fn attendance(&self) -> Vec<AttendanceRecord> {
        self.state.lock().unwrap().attendance.clone()
    }
}

#[async_trait]
impl MemberDirectory for FakeDirectory {
    async fn create_org(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<Organization> {
        let mut state = self.state.lock().unwrap();
        if state.orgs.iter().any(|o| o.email == email) {
            return Err(AppError::Validation(
                "An organization with that email already exists".to_string(),
            ));
        }
        let org = Organization {
            id: state.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        state.orgs.push(org.clone());
        Ok(org)
    }

    async fn delete_org(&self, org_id: i64) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.orgs.retain(|o| o.id != org_id);
        state.members.retain(|m| m.org_id != org_id);
        state.events.retain(|e| e.org_id != org_id);
        Ok(())
    }

    async fn find_org(&self, org_id: i64) -> AppResult<Option<Organization>> {
        let state = self.state.lock().unwrap();
        Ok(state.orgs.iter().find(|o| o.id == org_id).cloned())
    }

    async fn find_org_by_email(&self, email: &str) -> AppResult<Option<Organization>> {
        let state = self.state.lock().unwrap();
        Ok(state.orgs.iter().find(|o| o.email == email).cloned())
    }

    async fn list_org_ids(&self) -> AppResult<Vec<i64>> {
        let state = self.state.lock().unwrap();
        Ok(state.orgs.iter().map(|o| o.id).collect())
    }

    async fn create_event(
        &self,
        name: &str,
        org_id: i64,
        start_date: DateTime<Utc>,
    ) -> AppResult<Event> {
        let mut state = self.state.lock().unwrap();
        if !state.orgs.iter().any(|o| o.id == org_id) {
            return Err(AppError::Validation(
                "No organization found with that id".to_string(),
            ));
        }
        let event = Event {
            id: state.next_id(),
            name: name.to_string(),
            org_id,
            start_date,
        };
        state.events.push(event.clone());
        Ok(event)
    }

    async fn find_event(&self, event_id: i64) -> AppResult<Option<Event>> {
        let state = self.state.lock().unwrap();
        Ok(state.events.iter().find(|e| e.id == event_id).cloned())
    }

    async fn list_events(&self, org_id: i64) -> AppResult<Vec<Event>> {
        let state = self.state.lock().unwrap();
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|e| e.org_id == org_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_date, e.id));
        Ok(events)
    }

    async fn create_member(&self, member: NewMember) -> AppResult<Member> {
        if self.fail_member_insert.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let member = member.into_member(id);
        state.members.push(member.clone());
        Ok(member)
    }

    async fn find_member(&self, member_id: i64) -> AppResult<Option<Member>> {
        let state = self.state.lock().unwrap();
        Ok(state.members.iter().find(|m| m.id == member_id).cloned())
    }

    async fn find_members_by_face_ids(
        &self,
        face_ids: &[String],
        org_id: i64,
    ) -> AppResult<Vec<Member>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .members
            .iter()
            .filter(|m| m.org_id == org_id && face_ids.contains(&m.face_id))
            .cloned()
            .collect())
    }

    async fn find_member_by_email(
        &self,
        email: &str,
        org_id: Option<i64>,
    ) -> AppResult<Option<Member>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .members
            .iter()
            .find(|m| m.email == email && org_id.map_or(true, |id| m.org_id == id))
            .cloned())
    }

    async fn insert_attendance(&self, member_id: i64, event_id: i64) -> AppResult<AttendanceRecord> {
        let mut state = self.state.lock().unwrap();
        let record = AttendanceRecord {
            id: state.next_id(),
            member_id,
            event_id,
        };
        state.attendance.push(record.clone());
        Ok(record)
    }

    async fn list_attendance_for_event(
        &self,
        event_id: i64,
        org_id: i64,
    ) -> AppResult<Vec<AttendanceEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attendance
            .iter()
            .filter(|a| a.event_id == event_id)
            .filter_map(|a| {
                state
                    .members
                    .iter()
                    .find(|m| m.id == a.member_id && m.org_id == org_id)
            })
            .map(|m| AttendanceEntry {
                email: m.email.clone(),
                first_name: m.first_name.clone(),
                last_name: m.last_name.clone(),
                member_id: m.id,
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub objects: Mutex<HashMap<String, usize>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_upload: AtomicBool,
}

impl FakeStorage {
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageBackend for FakeStorage {
    async fn upload(&self, key: &str, data: &[u8], _content_type: &str) -> AppResult<String> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(AppError::Storage("upload rejected".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.len());
        Ok(format!("s3://test-bucket/{}", key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn bucket(&self) -> &str {
        "test-bucket"
    }
}

/// Face service whose next detection/search outcomes are scripted by the test.
#[derive(Default)]
pub struct FakeFaces {
    pub collections: Mutex<HashMap<String, Vec<String>>>,
    pub next_detection: Mutex<Vec<String>>,
    pub next_lookalikes: Mutex<Vec<FaceMatch>>,
    pub index_error: Mutex<Option<(bool, String)>>,
    pub search_error: Mutex<Option<(bool, String)>>,
    pub create_error: Mutex<Option<(bool, String)>>,
    pub deletions: Mutex<Vec<(String, Vec<String>)>>,
    pub fail_delete: AtomicBool,
}

impl FakeFaces {
    pub fn will_detect(&self, face_ids: &[&str]) {
        *self.next_detection.lock().unwrap() = face_ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn will_resemble(&self, matches: &[(&str, f32)]) {
        *self.next_lookalikes.lock().unwrap() = matches
            .iter()
            .map(|(id, similarity)| FaceMatch {
                face_id: id.to_string(),
                similarity: *similarity,
            })
            .collect();
    }

    pub fn add_collection(&self, collection: &str, face_ids: &[&str]) {
        self.collections.lock().unwrap().insert(
            collection.to_string(),
            face_ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn faces_in(&self, collection: &str) -> Vec<String> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn deletions(&self) -> Vec<(String, Vec<String>)> {
        self.deletions.lock().unwrap().clone()
    }
}

fn scripted_error(slot: &Mutex<Option<(bool, String)>>) -> AppResult<()> {
    match slot.lock().unwrap().clone() {
        Some((retryable, message)) => Err(AppError::face(retryable, message)),
        None => Ok(()),
    }
}

fn missing_collection() -> AppError {
    AppError::face(false, "Face collection not found for this organization")
}

#[async_trait]
impl FaceService for FakeFaces {
    async fn create_collection(&self, collection: &str) -> AppResult<bool> {
        scripted_error(&self.create_error)?;
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(collection) {
            return Ok(false);
        }
        collections.insert(collection.to_string(), Vec::new());
        Ok(true)
    }

    async fn index_faces(&self, collection: &str, _image: &ImageRef) -> AppResult<Vec<IndexedFace>> {
        scripted_error(&self.index_error)?;
        let detected = self.next_detection.lock().unwrap().clone();
        let mut collections = self.collections.lock().unwrap();
        let faces = collections.get_mut(collection).ok_or_else(missing_collection)?;
        faces.extend(detected.iter().cloned());
        Ok(detected
            .into_iter()
            .map(|face_id| IndexedFace {
                face_id,
                confidence: Some(99.9),
            })
            .collect())
    }

    async fn search_faces(
        &self,
        collection: &str,
        _image: &ImageRef,
        threshold: f32,
        max_results: i32,
    ) -> AppResult<Vec<FaceMatch>> {
        scripted_error(&self.search_error)?;
        let collections = self.collections.lock().unwrap();
        let faces = collections.get(collection).ok_or_else(missing_collection)?;
        // Scripted order is kept; ranking belongs to the caller.
        let mut matches: Vec<FaceMatch> = self
            .next_lookalikes
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.similarity >= threshold && faces.contains(&m.face_id))
            .cloned()
            .collect();
        matches.truncate(max_results.max(0) as usize);
        Ok(matches)
    }

    async fn delete_faces(&self, collection: &str, face_ids: &[String]) -> AppResult<Vec<String>> {
        self.deletions
            .lock()
            .unwrap()
            .push((collection.to_string(), face_ids.to_vec()));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::face(true, "delete failed"));
        }
        let mut collections = self.collections.lock().unwrap();
        let faces = collections.get_mut(collection).ok_or_else(missing_collection)?;
        let before = faces.clone();
        faces.retain(|f| !face_ids.contains(f));
        Ok(before.into_iter().filter(|f| face_ids.contains(f)).collect())
    }
}

pub struct Harness {
    pub directory: Arc<FakeDirectory>,
    pub storage: Arc<FakeStorage>,
    pub faces: Arc<FakeFaces>,
    pub backends: Backends,
}

impl Harness {
    pub fn new() -> Self {
        let directory = Arc::new(FakeDirectory::default());
        let storage = Arc::new(FakeStorage::default());
        let faces = Arc::new(FakeFaces::default());
        let backends = Backends {
            directory: directory.clone(),
            storage: storage.clone(),
            faces: faces.clone(),
            collections: CollectionNaming::new(PREFIX),
        };
        Self {
            directory,
            storage,
            faces,
            backends,
        }
    }

    /// Registers an organization together with its face collection.
    pub fn org_with_collection(&self, name: &str, email: &str) -> Organization {
        let org = self.directory.seed_org(name, email);
        self.faces
            .add_collection(&self.backends.collections.for_org(org.id), &[]);
        org
    }

    /// Seeds a member whose face is already indexed in the org's collection.
    pub fn enrolled_member(&self, org_id: i64, face_id: &str, email: &str) -> Member {
        let collection = self.backends.collections.for_org(org_id);
        self.faces
            .collections
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(face_id.to_string());
        self.directory.seed_member(org_id, face_id, email)
    }
}
