//! A small notes service, served by the `resource-gate` binary.
//!
//! | Route          | Methods                 | Policy                      |
//! |----------------|-------------------------|-----------------------------|
//! | `/health`      | GET                     | public                      |
//! | `/whoami`      | GET                     | authenticated               |
//! | `/notes`       | GET, POST               | POST authenticated          |
//! | `/notes/{id}`  | GET, PUT, DELETE        | PUT, DELETE authenticated   |
//!
//! The store is an `Arc` field on each prototype, so every materialized
//! resource shares it.

use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::capabilities;
use crate::resource::{
    Bindable, Cookie, Create, Ctx, Delete, HandlerResult, Read, Replace, Reply, ResourceError,
};
use crate::routing::{Router, SetupError};
use crate::security::{Access, PermissionTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub author: String,
}

#[derive(Debug, Default)]
struct Notes {
    next_id: u64,
    items: BTreeMap<u64, Note>,
}

/// Shared in-memory note store.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    inner: Arc<RwLock<Notes>>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, title: &str, body: &str, author: &str) -> Result<Note, ResourceError> {
        let mut notes = self.write()?;
        notes.next_id += 1;
        let note = Note {
            id: notes.next_id,
            title: title.to_string(),
            body: body.to_string(),
            author: author.to_string(),
        };
        notes.items.insert(note.id, note.clone());
        Ok(note)
    }

    pub fn get(&self, id: u64) -> Result<Option<Note>, ResourceError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    pub fn list(&self) -> Result<Vec<Note>, ResourceError> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Notes>, ResourceError> {
        self.inner
            .read()
            .map_err(|_| ResourceError::Internal("note store poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Notes>, ResourceError> {
        self.inner
            .write()
            .map_err(|_| ResourceError::Internal("note store poisoned".into()))
    }
}

/// Build the route table for the notes service.
pub fn routes(store: NoteStore) -> Result<Router, SetupError> {
    Router::builder()
        .route("/health", Health)
        .route("/whoami", WhoAmI::default())
        .route("/notes", NoteCollection::new(store.clone()))
        .route("/notes/{id}", NoteItem::new(store))
        .build()
}

/// Liveness check.
#[derive(Debug, Clone)]
pub struct Health;

impl Read for Health {
    fn get(&self) -> HandlerResult {
        Ok(Reply::Json(json!({ "status": "ok" })))
    }
}

capabilities!(Health: Read);
impl Bindable for Health {}

/// Echoes the resolved identity and remembers it in a cookie.
#[derive(Debug, Clone)]
pub struct WhoAmI {
    ctx: Ctx,
    perms: PermissionTable,
}

impl Default for WhoAmI {
    fn default() -> Self {
        Self {
            ctx: Ctx::default(),
            perms: PermissionTable::authenticated(),
        }
    }
}

impl Read for WhoAmI {
    fn get(&self) -> HandlerResult {
        self.ctx
            .set_cookie(&Cookie::new("last_user", self.ctx.user()).path("/").http_only(true))?;
        Ok(Reply::text(self.ctx.user()))
    }
}

capabilities!(WhoAmI: Read);

impl Bindable for WhoAmI {
    fn permissions(&self) -> Option<&PermissionTable> {
        Some(&self.perms)
    }

    fn bind_context(&mut self, ctx: Ctx) {
        self.ctx = ctx;
    }
}

/// `/notes`: list and create.
#[derive(Debug, Clone)]
pub struct NoteCollection {
    ctx: Ctx,
    perms: PermissionTable,
    store: NoteStore,
}

impl NoteCollection {
    pub fn new(store: NoteStore) -> Self {
        Self {
            ctx: Ctx::default(),
            perms: PermissionTable::new().with("POST", Access::Authenticated),
            store,
        }
    }
}

impl Read for NoteCollection {
    fn get(&self) -> HandlerResult {
        let author = self.ctx.param("author");
        let notes: Vec<Note> = self
            .store
            .list()?
            .into_iter()
            .filter(|n| author.is_empty() || n.author == author)
            .collect();
        Reply::json(&notes)
    }
}

impl Create for NoteCollection {
    fn post(&self) -> HandlerResult {
        let title = self.ctx.param("title");
        if title.is_empty() {
            return Err(ResourceError::BadRequest("title is required".into()));
        }
        let note = self.store.insert(title, self.ctx.param("body"), self.ctx.user())?;
        tracing::debug!(id = note.id, author = %note.author, "Note created");
        Ok(Reply::Created(format!("/notes/{}", note.id)))
    }
}

capabilities!(NoteCollection: Read, Create);

impl Bindable for NoteCollection {
    fn permissions(&self) -> Option<&PermissionTable> {
        Some(&self.perms)
    }

    fn bind_context(&mut self, ctx: Ctx) {
        self.ctx = ctx;
    }
}

/// `/notes/{id}`: read, replace, delete.
#[derive(Debug, Clone)]
pub struct NoteItem {
    ctx: Ctx,
    perms: PermissionTable,
    store: NoteStore,
}

impl NoteItem {
    pub fn new(store: NoteStore) -> Self {
        Self {
            ctx: Ctx::default(),
            perms: [("PUT", Access::Authenticated), ("DELETE", Access::Authenticated)]
                .into_iter()
                .collect(),
            store,
        }
    }

    fn id(&self) -> Result<u64, ResourceError> {
        let raw = self.ctx.path_param("id");
        raw.parse()
            .map_err(|_| ResourceError::BadRequest(format!("invalid note id {:?}", raw)))
    }

    /// The note, if the caller wrote it.
    fn owned(&self) -> Result<Note, ResourceError> {
        let note = self.store.get(self.id()?)?.ok_or(ResourceError::NotFound)?;
        if note.author != self.ctx.user() {
            return Err(ResourceError::Forbidden("not your note".into()));
        }
        Ok(note)
    }
}

impl Read for NoteItem {
    fn get(&self) -> HandlerResult {
        let note = self.store.get(self.id()?)?.ok_or(ResourceError::NotFound)?;
        Reply::json(&note)
    }
}

impl Replace for NoteItem {
    fn put(&self) -> HandlerResult {
        let mut note = self.owned()?;
        let title = self.ctx.param("title");
        if !title.is_empty() {
            note.title = title.to_string();
        }
        note.body = self.ctx.param("body").to_string();

        self.store.write()?.items.insert(note.id, note.clone());
        Reply::json(&note)
    }
}

impl Delete for NoteItem {
    fn delete(&self) -> HandlerResult {
        let note = self.owned()?;
        self.store.write()?.items.remove(&note.id);
        Ok(Reply::NoContent)
    }
}

capabilities!(NoteItem: Read, Replace, Delete);

impl Bindable for NoteItem {
    fn permissions(&self) -> Option<&PermissionTable> {
        Some(&self.perms)
    }

    fn bind_context(&mut self, ctx: Ctx) {
        self.ctx = ctx;
    }
}
