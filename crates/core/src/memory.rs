//! In-memory store implementations.
//!
//! Behave like the Postgres stores in `polychat-db` (same ordering, same
//! conflict rules) and back the unit and HTTP-level tests, which therefore
//! need no database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::history::{page_offset, ChatMessage, HistoryPage, HistoryStore, NewChatMessage};
use crate::relation::{Relation, RelationStore, RelationType};
use crate::store::StoreError;
use crate::types::DbId;
use crate::user::{NewUser, UserAccount, UserStore};

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// Relation records keyed by `(owner_id, target_id)`.
#[derive(Default)]
pub struct MemoryRelationStore {
    records: RwLock<BTreeMap<(DbId, DbId), Relation>>,
}

impl MemoryRelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records, in every state and direction.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RelationStore for MemoryRelationStore {
    async fn create(&self, relation: &Relation) -> Result<(), StoreError> {
        let key = (relation.owner_id, relation.target_id);
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "relation ({}, {}) already exists",
                key.0, key.1
            )));
        }
        records.insert(key, relation.clone());
        Ok(())
    }

    async fn delete_by_pair(&self, owner_id: DbId, target_id: DbId) -> Result<bool, StoreError> {
        Ok(self
            .records
            .write()
            .await
            .remove(&(owner_id, target_id))
            .is_some())
    }

    async fn find_by_owner(&self, owner_id: DbId) -> Result<Vec<Relation>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .range((owner_id, DbId::MIN)..=(owner_id, DbId::MAX))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn find_by_pair(
        &self,
        owner_id: DbId,
        target_id: DbId,
    ) -> Result<Option<Relation>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(&(owner_id, target_id))
            .cloned())
    }

    async fn find_pending_by_target(&self, target_id: DbId) -> Result<Vec<Relation>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.target_id == target_id && r.is_pending())
            .cloned()
            .collect())
    }

    async fn update_type(
        &self,
        owner_id: DbId,
        target_id: DbId,
        relation_type: RelationType,
    ) -> Result<bool, StoreError> {
        match self.records.write().await.get_mut(&(owner_id, target_id)) {
            Some(record) => {
                record.relation_type = relation_type;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_note(
        &self,
        owner_id: DbId,
        target_id: DbId,
        note: &str,
    ) -> Result<bool, StoreError> {
        match self.records.write().await.get_mut(&(owner_id, target_id)) {
            Some(record) => {
                record.note = note.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn accept_request(
        &self,
        requester_id: DbId,
        accepter_id: DbId,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let pending = records
            .get(&(requester_id, accepter_id))
            .is_some_and(Relation::is_pending);
        if !pending {
            return Ok(false);
        }
        let reverse = (accepter_id, requester_id);
        if records.contains_key(&reverse) {
            return Err(StoreError::Conflict(format!(
                "relation ({}, {}) already exists",
                reverse.0, reverse.1
            )));
        }
        if let Some(request) = records.get_mut(&(requester_id, accepter_id)) {
            request.relation_type = RelationType::Accepted;
        }
        records.insert(reverse, Relation::accepted(accepter_id, requester_id));
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Append-only vector of chat messages with sequential ids starting at 1.
#[derive(Default)]
pub struct MemoryHistoryStore {
    next_id: AtomicI64,
    messages: RwLock<Vec<ChatMessage>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn save(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let stored = ChatMessage {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            kind: message.kind,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            timestamp: message.timestamp,
        };
        self.messages.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_between(
        &self,
        user_a: DbId,
        user_b: DbId,
        page: i64,
        page_size: i64,
    ) -> Result<HistoryPage, StoreError> {
        let messages = self.messages.read().await;
        let mut conversation: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .collect();
        conversation.sort_by(|x, y| y.timestamp.cmp(&x.timestamp).then(y.id.cmp(&x.id)));

        let total = conversation.len() as i64;
        let skip = usize::try_from(page_offset(page, page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(0);

        Ok(HistoryPage {
            messages: conversation
                .into_iter()
                .skip(skip)
                .take(take)
                .cloned()
                .collect(),
            total,
            page,
            page_size,
        })
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// User accounts with sequential ids starting at 1.
#[derive(Default)]
pub struct MemoryUserStore {
    next_id: AtomicI64,
    users: RwLock<BTreeMap<DbId, UserAccount>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<UserAccount, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )));
        }

        let account = UserAccount {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            avatar: None,
        };
        users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::validate_pagination;
    use crate::message::MessageType;

    fn chat(sender_id: DbId, receiver_id: DbId, timestamp: i64) -> NewChatMessage {
        NewChatMessage {
            kind: MessageType::Chat,
            sender_id,
            receiver_id,
            content: format!("msg at {timestamp}"),
            timestamp,
        }
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let store = MemoryHistoryStore::new();
        for i in 0..120 {
            let (from, to) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
            store.save(chat(from, to, 1_000 + i)).await.unwrap();
        }
        // Noise from another conversation.
        store.save(chat(1, 3, 5_000)).await.unwrap();

        let (page, size) = validate_pagination(None, None).unwrap();
        let first = store.find_between(1, 2, page, size).await.unwrap();
        assert_eq!(first.total, 120);
        assert_eq!(first.messages.len(), 50);
        assert_eq!(first.messages[0].timestamp, 1_119);
        assert_eq!(first.messages[49].timestamp, 1_070);

        let third = store.find_between(2, 1, 3, 50).await.unwrap();
        assert_eq!(third.total, 120);
        assert_eq!(third.messages.len(), 20);
        assert_eq!(third.messages[0].timestamp, 1_019);
        assert_eq!(third.messages[19].timestamp, 1_000);

        let beyond = store.find_between(1, 2, 4, 50).await.unwrap();
        assert!(beyond.messages.is_empty());
        assert_eq!(beyond.total, 120);
    }

    #[tokio::test]
    async fn history_ties_break_by_id() {
        let store = MemoryHistoryStore::new();
        let first = store.save(chat(1, 2, 10)).await.unwrap();
        let second = store.save(chat(2, 1, 10)).await.unwrap();
        assert!(second.id > first.id);

        let page = store.find_between(1, 2, 1, 50).await.unwrap();
        assert_eq!(page.messages[0].id, second.id);
        assert_eq!(page.messages[1].id, first.id);
    }

    #[tokio::test]
    async fn relation_create_rejects_duplicates() {
        let store = MemoryRelationStore::new();
        store.create(&Relation::pending(1, 2, "a")).await.unwrap();
        assert!(matches!(
            store.create(&Relation::pending(1, 2, "b")).await,
            Err(StoreError::Conflict(_))
        ));
        // The reverse direction is a different key.
        store.create(&Relation::accepted(2, 1)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn find_by_owner_scopes_to_owner() {
        let store = MemoryRelationStore::new();
        store.create(&Relation::accepted(1, 2)).await.unwrap();
        store.create(&Relation::accepted(1, 3)).await.unwrap();
        store.create(&Relation::accepted(2, 1)).await.unwrap();

        let owned = store.find_by_owner(1).await.unwrap();
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|r| r.owner_id == 1));
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryUserStore::new();
        let alice = store
            .create(NewUser {
                username: "alice".into(),
                password_hash: "h".into(),
                email: None,
            })
            .await
            .unwrap();
        assert_eq!(alice.id, 1);

        let dup = store
            .create(NewUser {
                username: "alice".into(),
                password_hash: "h".into(),
                email: None,
            })
            .await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        assert_eq!(
            store.find_by_username("alice").await.unwrap().map(|u| u.id),
            Some(1)
        );
        assert!(store.find_by_id(2).await.unwrap().is_none());
    }
}
