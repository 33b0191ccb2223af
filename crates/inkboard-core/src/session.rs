//! An open board: the live store wired to storage, identity, assets and the
//! change feed.
//!
//! All failures at this level become [`Notice`]s for the host UI. In-memory
//! state is never rolled back and the session never shuts itself down.

use crate::actor::{ActorId, IdentityResolver};
use crate::assets::{AssetError, AssetStore};
use crate::board::{Board, BoardFields, BoardRef};
use crate::config::EngineConfig;
use crate::drawing::DrawingController;
use crate::error::{EngineError, EngineResult, Notice};
use crate::feed::{FeedEvent, FeedRegistry, LiveFeed, board_channel};
use crate::items::{Item, ItemId, ItemPatch};
use crate::storage::{BoardStorage, PendingWrite, StorageError};
use crate::store::ItemStore;
use kurbo::{Point, Size};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// A collaborator's editing session on one board.
pub struct Session {
    storage: Arc<dyn BoardStorage>,
    store: ItemStore,
    drawing: DrawingController,
    assets: Option<Arc<dyn AssetStore>>,
    feed: Option<FeedRegistry>,
    notices: Vec<Notice>,
}

impl Session {
    /// Resolve the actor, then load the board `reference` names, creating it
    /// if storage has none.
    pub async fn open(
        storage: Arc<dyn BoardStorage>,
        resolver: &mut IdentityResolver,
        reference: BoardRef,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        let actor = resolver.actor_id().await;

        let board = match storage.find(&reference, &actor).await? {
            Some(board) => {
                log::info!("Loaded board {} ({} items)", board.id, board.len());
                board
            }
            None => {
                let fresh = Board::for_ref(&reference, actor.clone())
                    .with_name(config.default_board_name.clone());
                let board = storage.create(&fresh).await?;
                log::info!("Created board {} for {}", board.id, reference);
                board
            }
        };

        Ok(Self {
            storage,
            store: ItemStore::new(board, actor, &config),
            drawing: DrawingController::new(),
            assets: None,
            feed: None,
            notices: Vec::new(),
        })
    }

    /// Use `assets` for image uploads.
    pub fn with_assets(mut self, assets: Arc<dyn AssetStore>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Subscribe to remote changes of this board through `feed`.
    pub fn with_feed(mut self, feed: Box<dyn LiveFeed>) -> Self {
        let mut registry = FeedRegistry::new(feed);
        if let Err(e) = registry.subscribe(self.store.board().id) {
            log::warn!("Failed to subscribe to board changes: {}", e);
            self.notices.push(Notice::error(format!("Live updates unavailable: {}", e)));
        }
        self.feed = Some(registry);
        self
    }

    pub fn board(&self) -> &Board {
        self.store.board()
    }

    pub fn items(&self) -> &[Item] {
        self.store.items()
    }

    pub fn actor(&self) -> &ActorId {
        self.store.actor()
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// Direct access for z-order and other store operations.
    pub fn store_mut(&mut self) -> &mut ItemStore {
        &mut self.store
    }

    pub fn feed(&self) -> Option<&FeedRegistry> {
        self.feed.as_ref()
    }

    pub fn switch_actor(&mut self, actor: ActorId) {
        self.store.switch_actor(actor);
    }

    pub fn add_item(&mut self, item: Item) -> ItemId {
        self.store.add(item)
    }

    pub fn update_item(&mut self, id: ItemId, patch: &ItemPatch) -> bool {
        self.store.update(id, patch)
    }

    /// Like [`update_item`](Self::update_item) but reports an unknown id.
    pub fn update_item_checked(&mut self, id: ItemId, patch: &ItemPatch) -> EngineResult<()> {
        if self.store.update(id, patch) {
            Ok(())
        } else {
            Err(EngineError::ItemNotFound(id))
        }
    }

    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        self.store.remove(id)
    }

    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.store.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    pub fn drawing(&self) -> &DrawingController {
        &self.drawing
    }

    pub fn drawing_mut(&mut self) -> &mut DrawingController {
        &mut self.drawing
    }

    /// Finish the arrow gesture in progress.
    pub fn commit_arrow(&mut self) -> Option<ItemId> {
        self.drawing.commit(&mut self.store)
    }

    /// Flip the favorite flag and write it through immediately.
    ///
    /// On failure the flag is kept locally; the next items write carries it.
    pub async fn toggle_favorite(&mut self) -> bool {
        let favorite = self.store.toggle_favorite();
        let id = self.store.board().id;

        match self.storage.write(id, &BoardFields::favorite(favorite)).await {
            Ok(()) => {
                let message = if favorite {
                    "Added to favorites"
                } else {
                    "Removed from favorites"
                };
                self.notices.push(Notice::success(message));
            }
            Err(e) => {
                log::warn!("Failed to update favorite on board {}: {}", id, e);
                self.notices
                    .push(Notice::from(&EngineError::PersistenceWriteFailed(e)));
            }
        }
        favorite
    }

    /// When the autosave timer may fire next.
    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.store.persistence().deadline()
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Run the automatic write if its delay has elapsed at `now`.
    ///
    /// Returns true if a write reached storage.
    pub async fn flush_due(&mut self, now: Instant) -> bool {
        let Some(write) = self.store.poll_autosave(now) else {
            return false;
        };
        match self.persist(write).await {
            Ok(()) => true,
            Err(e) => {
                self.notices.push(Notice::from(&e));
                false
            }
        }
    }

    /// Write the board now, cancelling any pending autosave.
    pub async fn save(&mut self) -> EngineResult<()> {
        let write = self.store.begin_save();
        match self.persist(write).await {
            Ok(()) => {
                self.notices.push(Notice::success("Whiteboard saved"));
                Ok(())
            }
            Err(e) => {
                self.notices.push(Notice::from(&e));
                Err(e)
            }
        }
    }

    async fn persist(&mut self, write: PendingWrite) -> EngineResult<()> {
        match self.storage.write(write.board_id, &write.fields).await {
            Ok(()) => {
                self.store.confirm_write(&write);
                log::info!("Saved board {}", write.board_id);
                Ok(())
            }
            Err(e) => {
                self.store.fail_write(&write);
                log::warn!("Failed to save board {}: {}", write.board_id, e);
                Err(EngineError::PersistenceWriteFailed(e))
            }
        }
    }

    /// Upload an image and place it on the board.
    ///
    /// No item is created unless the upload succeeds.
    pub async fn add_image(
        &mut self,
        data: &[u8],
        name_hint: &str,
        position: Point,
        size: Size,
    ) -> EngineResult<ItemId> {
        let uploaded = match &self.assets {
            Some(assets) => assets.upload(data, name_hint).await,
            None => Err(AssetError::Other("no asset store configured".to_string())),
        };

        match uploaded {
            Ok(asset) => Ok(self.store.add(Item::image(position, asset.url, size))),
            Err(e) => {
                log::warn!("Image upload failed: {}", e);
                let err = EngineError::UploadFailed(e);
                self.notices.push(Notice::from(&err));
                Err(err)
            }
        }
    }

    /// Drain feed events. Returns true if this board changed remotely.
    pub fn poll_feed(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        let channel = board_channel(self.store.board().id);

        let mut changed = false;
        for event in feed.poll() {
            match event {
                FeedEvent::Changed { channel: c } if c == channel => changed = true,
                FeedEvent::Error { message } => {
                    log::warn!("Live feed error: {}", message);
                    self.notices.push(Notice::error(message));
                }
                other => log::debug!("Feed event: {:?}", other),
            }
        }
        changed
    }

    /// Replace the live board with the stored copy.
    ///
    /// History is kept, so undo may bring back items removed remotely.
    pub async fn reload(&mut self) -> EngineResult<()> {
        let id = self.store.board().id;
        let found = self
            .storage
            .find(&BoardRef::Id(id), self.store.actor())
            .await;

        match found {
            Ok(Some(board)) => {
                if self.store.is_dirty() {
                    log::debug!("Reloading board {} over unsaved local edits", id);
                }
                self.store.replace_board(board);
                Ok(())
            }
            Ok(None) => {
                log::warn!("Board {} no longer in storage", id);
                let err = EngineError::Storage(StorageError::NotFound(id.to_string()));
                self.notices.push(Notice::from(&err));
                Err(err)
            }
            Err(e) => {
                log::warn!("Failed to reload board {}: {}", id, e);
                let err = EngineError::Storage(e);
                self.notices.push(Notice::from(&err));
                Err(err)
            }
        }
    }

    /// Notices queued since the last drain.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// End the session: the pending autosave is dropped and every feed
    /// subscription is released.
    pub fn close(mut self) {
        self.store.cancel_autosave();
        if let Some(feed) = self.feed.as_mut() {
            feed.unsubscribe_all();
        }
        log::debug!("Closed session on board {}", self.store.board().id);
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::actor::{MemoryIdStore, OfflineAuthority, StaticAuthority};
    use crate::assets::MemoryAssets;
    use crate::error::NoticeLevel;
    use crate::feed::MemoryFeed;
    use crate::items::ArrowStyle;
    use crate::storage::MemoryStorage;
    use pollster::block_on;
    use std::time::Duration;

    fn resolver(actor: &str) -> IdentityResolver {
        IdentityResolver::new(
            Arc::new(StaticAuthority::signed_in(actor)),
            Arc::new(MemoryIdStore::new()),
        )
    }

    fn open(storage: &Arc<MemoryStorage>, reference: BoardRef) -> Session {
        let _ = env_logger::builder().is_test(true).try_init();
        block_on(Session::open(
            storage.clone(),
            &mut resolver("alice"),
            reference,
            EngineConfig::default(),
        ))
        .unwrap()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_open_creates_then_finds() {
        let storage = Arc::new(MemoryStorage::new());
        let first = open(&storage, BoardRef::Project("launch".into()));
        assert_eq!(first.board().name, "Untitled");
        assert_eq!(first.board().project_id.as_deref(), Some("launch"));

        let second = open(&storage, BoardRef::Project("launch".into()));
        assert_eq!(second.board().id, first.board().id);
    }

    #[test]
    fn test_open_offline_uses_stable_local_actor() {
        let storage: Arc<dyn BoardStorage> = Arc::new(MemoryStorage::new());
        let ids = Arc::new(MemoryIdStore::new());

        let mut a = IdentityResolver::new(Arc::new(OfflineAuthority), ids.clone());
        let mut b = IdentityResolver::new(Arc::new(OfflineAuthority), ids);
        let config = EngineConfig::default();

        let s1 = block_on(Session::open(storage.clone(), &mut a, BoardRef::Personal, config.clone())).unwrap();
        let s2 = block_on(Session::open(storage, &mut b, BoardRef::Personal, config)).unwrap();

        assert!(s1.actor().is_local());
        assert_eq!(s1.actor(), s2.actor());
        assert_eq!(s1.board().id, s2.board().id);
    }

    #[test]
    fn test_one_write_per_idle_window() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);
        let t0 = Instant::now();

        session.add_item(Item::note(Point::ZERO, "a"));
        session.add_item(Item::note(Point::ZERO, "b"));
        let c = session.add_item(Item::note(Point::ZERO, "c"));
        session.update_item(c, &ItemPatch::new().text("c2"));

        assert!(!block_on(session.flush_due(t0 + secs(5))));
        assert_eq!(storage.write_count(), 0);

        assert!(block_on(session.flush_due(t0 + secs(11))));
        assert!(!block_on(session.flush_due(t0 + secs(30))));
        assert_eq!(storage.write_count(), 1);
        assert!(!session.is_dirty());

        let stored = storage.get(session.board().id).unwrap();
        assert_eq!(stored.items, session.items());
    }

    #[test]
    fn test_save_cancels_timer_and_writes_once() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);
        let t0 = Instant::now();

        session.add_item(Item::note(Point::ZERO, "a"));
        block_on(session.save()).unwrap();

        assert!(session.autosave_deadline().is_none());
        assert!(!block_on(session.flush_due(t0 + secs(60))));
        assert_eq!(storage.write_count(), 1);

        let notices = session.drain_notices();
        assert_eq!(notices, vec![Notice::success("Whiteboard saved")]);
    }

    #[test]
    fn test_write_failure_keeps_state_dirty() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);

        session.add_item(Item::note(Point::ZERO, "precious"));
        storage.set_fail_writes(true);

        let result = block_on(session.save());
        assert!(matches!(result, Err(EngineError::PersistenceWriteFailed(_))));
        assert!(session.is_dirty());
        assert_eq!(session.items().len(), 1);
        assert!(session.drain_notices()[0].is_error());

        storage.set_fail_writes(false);
        block_on(session.save()).unwrap();
        assert!(!session.is_dirty());
        assert_eq!(storage.get(session.board().id).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_autosave_retried_after_next_edit() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);
        let t0 = Instant::now();

        session.add_item(Item::note(Point::ZERO, "a"));
        storage.set_fail_writes(true);

        assert!(!block_on(session.flush_due(t0 + secs(11))));
        let notices = session.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_error());
        assert!(session.is_dirty());
        assert!(session.autosave_deadline().is_none());
        assert!(!block_on(session.flush_due(t0 + secs(60))));

        storage.set_fail_writes(false);
        let t1 = Instant::now();
        session.add_item(Item::note(Point::ZERO, "b"));

        assert!(block_on(session.flush_due(t1 + secs(11))));
        assert!(!block_on(session.flush_due(t1 + secs(30))));
        assert_eq!(storage.write_count(), 1);
        assert!(!session.is_dirty());
        assert_eq!(storage.get(session.board().id).unwrap().len(), 2);
        assert!(session.drain_notices().is_empty());
    }

    #[test]
    fn test_toggle_favorite_writes_immediately() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);

        assert!(block_on(session.toggle_favorite()));
        assert!(storage.get(session.board().id).unwrap().is_favorite);
        assert!(!session.is_dirty());
        assert!(!session.can_undo());
        assert_eq!(session.drain_notices()[0].level, NoticeLevel::Success);
    }

    #[test]
    fn test_toggle_favorite_failure_keeps_flag() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);
        storage.set_fail_writes(true);

        assert!(block_on(session.toggle_favorite()));
        assert!(session.board().is_favorite);
        assert!(!storage.get(session.board().id).unwrap().is_favorite);
        assert!(session.drain_notices()[0].is_error());

        storage.set_fail_writes(false);
        session.add_item(Item::note(Point::ZERO, "carry"));
        block_on(session.save()).unwrap();
        assert!(storage.get(session.board().id).unwrap().is_favorite);
    }

    #[test]
    fn test_update_item_checked() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);
        let id = session.add_item(Item::checkbox(Point::ZERO, "ship it"));

        assert!(session.update_item_checked(id, &ItemPatch::new().checked(true)).is_ok());
        let ghost = ItemId::new_v4();
        assert!(matches!(
            session.update_item_checked(ghost, &ItemPatch::new().checked(true)),
            Err(EngineError::ItemNotFound(found)) if found == ghost
        ));
    }

    #[test]
    fn test_add_image() {
        let storage = Arc::new(MemoryStorage::new());
        let assets = Arc::new(MemoryAssets::new());
        let mut session = open(&storage, BoardRef::Personal).with_assets(assets.clone());

        let id = block_on(session.add_image(b"\x89PNG....", "shot.png", Point::ZERO, Size::new(320.0, 200.0))).unwrap();
        let item = session.store().get(id).unwrap();
        match &item.body {
            crate::items::ItemBody::Image { url, size } => {
                assert!(assets.get(url).is_some());
                assert_eq!(*size, Size::new(320.0, 200.0));
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_upload_creates_no_item() {
        let storage = Arc::new(MemoryStorage::new());
        let assets = Arc::new(MemoryAssets::new());
        assets.set_fail_uploads(true);
        let mut session = open(&storage, BoardRef::Personal).with_assets(assets);

        let result = block_on(session.add_image(b"\x89PNG....", "shot.png", Point::ZERO, Size::new(10.0, 10.0)));
        assert!(matches!(result, Err(EngineError::UploadFailed(_))));
        assert!(session.items().is_empty());
        assert!(!session.can_undo());
        assert!(session.drain_notices()[0].is_error());

        let mut bare = open(&storage, BoardRef::Personal);
        assert!(block_on(bare.add_image(b"x", "x.png", Point::ZERO, Size::ZERO)).is_err());
    }

    #[test]
    fn test_arrow_gesture_through_session() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);

        session.drawing_mut().start(ArrowStyle::Straight);
        session.drawing_mut().set_start(Point::new(0.0, 0.0));
        session.drawing_mut().update_current(Point::new(100.0, 0.0));
        assert!(session.commit_arrow().is_some());
        assert!(session.drawing().is_idle());
        assert_eq!(session.items().len(), 1);

        session.drawing_mut().start(ArrowStyle::Curved);
        session.drawing_mut().set_start(Point::new(5.0, 5.0));
        session.drawing_mut().cancel();
        assert!(session.commit_arrow().is_none());
        assert_eq!(session.items().len(), 1);
    }

    #[test]
    fn test_remote_change_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let feed = MemoryFeed::new();
        let mut session = open(&storage, BoardRef::Personal).with_feed(Box::new(feed.clone()));
        let id = session.board().id;
        assert_eq!(feed.join_count(), 1);

        let mut remote = storage.get(id).unwrap();
        remote.items.push(Item::note(Point::ZERO, "from bob"));
        storage.insert(remote);
        feed.push_change(id);

        assert!(session.poll_feed());
        assert!(!session.poll_feed());
        block_on(session.reload()).unwrap();
        assert_eq!(session.items().len(), 1);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_reload_of_missing_board_queues_notice() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);
        session.add_item(Item::note(Point::ZERO, "kept"));
        storage.remove(session.board().id).unwrap();

        let result = block_on(session.reload());
        assert!(matches!(result, Err(EngineError::Storage(StorageError::NotFound(_)))));
        assert_eq!(session.items().len(), 1);

        let notices = session.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_error());
    }

    #[test]
    fn test_close_releases_subscriptions() {
        let storage = Arc::new(MemoryStorage::new());
        let feed = MemoryFeed::new();
        let mut session = open(&storage, BoardRef::Personal).with_feed(Box::new(feed.clone()));
        let channel = board_channel(session.board().id);

        session.add_item(Item::note(Point::ZERO, "unsaved"));
        assert!(feed.is_joined(&channel));
        session.close();

        assert!(!feed.is_joined(&channel));
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn test_collaborators_undo_independently() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = open(&storage, BoardRef::Personal);

        session.add_item(Item::note(Point::ZERO, "alice 1"));
        session.add_item(Item::note(Point::ZERO, "alice 2"));

        session.switch_actor(ActorId::from("bob"));
        session.add_item(Item::note(Point::ZERO, "bob 1"));
        assert!(session.undo());
        assert_eq!(session.items().len(), 2);
        assert!(!session.undo());

        session.switch_actor(ActorId::from("alice"));
        assert!(session.can_undo());
        assert!(session.undo());
        assert_eq!(session.items().len(), 1);
    }
}
