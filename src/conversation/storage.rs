//! Conversation store interface and its `SQLite` implementation.
//!
//! The store owns the two rules that must hold under concurrent writers:
//!
//! - at most one active request per unordered pair (partial unique index)
//! - the pending message cap (checked inside the insert transaction)

// SQLite operations need to hold the lock for the duration of the operation.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};

use super::types::{
    pair_key, ConversationRequest, ConversationStatus, Message, MessageKind,
};
use crate::ids::{ConversationId, IdentityId, MessageId};
use crate::store::{lock, StoreError, StoreResult};

/// Result of [`ConversationStore::create_conversation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The request and its first message were stored.
    Created,
    /// An active request between the pair already exists. Nothing was stored.
    AlreadyExists(ConversationRequest),
}

/// Result of [`ConversationStore::append_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The message was stored.
    Appended,
    /// The cap applied and was already reached. Nothing was stored.
    LimitReached,
    /// The conversation was declined. Nothing was stored.
    NotActive,
}

/// Persistence for conversation requests and messages.
pub trait ConversationStore: Send + Sync {
    /// Stores a new request together with its first message, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails for any reason other than an
    /// existing active request between the pair.
    fn create_conversation(
        &self,
        request: &ConversationRequest,
        first_message: &Message,
    ) -> StoreResult<CreateOutcome>;

    /// Returns a request by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get_conversation(&self, id: &ConversationId) -> StoreResult<Option<ConversationRequest>>;

    /// Returns the active (pending or accepted) request between two identities.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_active_between(
        &self,
        a: &IdentityId,
        b: &IdentityId,
    ) -> StoreResult<Option<ConversationRequest>>;

    /// Returns every request involving `id`, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_conversations_for(&self, id: &IdentityId) -> StoreResult<Vec<ConversationRequest>>;

    /// Moves a request from `from` to `to`, appending `notice` in the same
    /// transaction when given.
    ///
    /// Returns `false` without writing when the stored status is not `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. Nothing is written in that case.
    fn update_status(
        &self,
        id: &ConversationId,
        from: ConversationStatus,
        to: ConversationStatus,
        notice: Option<&Message>,
    ) -> StoreResult<bool>;

    /// Appends a message.
    ///
    /// Messages into a declined conversation are refused. With `cap` set,
    /// the message is also refused when the conversation is still pending, the sender is its initiator, and the sender already has `cap`
    /// user messages in it. The count is taken inside the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation does not exist or the write fails.
    fn append_message(&self, message: &Message, cap: Option<usize>) -> StoreResult<AppendOutcome>;

    /// Returns the messages of a conversation in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_messages(&self, conversation: &ConversationId) -> StoreResult<Vec<Message>>;

    /// Marks every message not sent by `reader` as read. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn mark_read(&self, conversation: &ConversationId, reader: &IdentityId) -> StoreResult<usize>;

    /// Counts unread messages not sent by `reader`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn unread_count(&self, conversation: &ConversationId, reader: &IdentityId)
        -> StoreResult<usize>;
}

/// `SQLite`-based conversation storage.
pub struct ConversationStorage {
    conn: Mutex<Connection>,
}

impl ConversationStorage {
    /// Opens (or creates) the conversation database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Creates an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&self) -> StoreResult<()> {
        let conn = lock(&self.conn)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                conversation_id TEXT PRIMARY KEY,
                initiator_id TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                pair_key TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- One active request per unordered pair
            CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_active_pair
                ON conversations (pair_key)
                WHERE status IN ('pending', 'accepted');

            CREATE INDEX IF NOT EXISTS idx_conversations_initiator
                ON conversations (initiator_id);
            CREATE INDEX IF NOT EXISTS idx_conversations_receiver
                ON conversations (receiver_id);

            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL UNIQUE,
                conversation_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                content TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'user',
                created_at INTEGER NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (conversation_id) REFERENCES conversations(conversation_id)
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages (conversation_id, seq);
            ",
        )?;

        Ok(())
    }
}

const REQUEST_COLUMNS: &str =
    "conversation_id, initiator_id, receiver_id, status, created_at, updated_at";

fn request_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRequest> {
    let conversation_id: String = row.get(0)?;
    let initiator_id: String = row.get(1)?;
    let receiver_id: String = row.get(2)?;
    let status_str: String = row.get(3)?;

    let status = ConversationStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("invalid conversation status: {status_str}").into(),
        )
    })?;

    Ok(ConversationRequest {
        conversation_id: ConversationId::new(conversation_id),
        initiator_id: IdentityId::new(initiator_id),
        receiver_id: IdentityId::new(receiver_id),
        status,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let message_id: String = row.get(0)?;
    let conversation_id: String = row.get(1)?;
    let sender_id: String = row.get(2)?;
    let kind_str: String = row.get(4)?;
    let read: i32 = row.get(6)?;

    let kind = MessageKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("invalid message kind: {kind_str}").into(),
        )
    })?;

    Ok(Message {
        message_id: MessageId::new(message_id),
        conversation_id: ConversationId::new(conversation_id),
        sender_id: IdentityId::new(sender_id),
        content: row.get(3)?,
        kind,
        created_at: row.get(5)?,
        read: read != 0,
    })
}

fn find_active_by_pair(conn: &Connection, pair: &str) -> StoreResult<Option<ConversationRequest>> {
    let request = conn
        .query_row(
            &format!(
                "SELECT {REQUEST_COLUMNS} FROM conversations
                 WHERE pair_key = ?1 AND status IN ('pending', 'accepted')"
            ),
            params![pair],
            request_from_row,
        )
        .optional()?;
    Ok(request)
}

fn insert_message(tx: &Transaction<'_>, message: &Message) -> StoreResult<()> {
    tx.execute(
        r"
        INSERT INTO messages (message_id, conversation_id, sender_id, content, kind, created_at, is_read)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            message.message_id.as_str(),
            message.conversation_id.as_str(),
            message.sender_id.as_str(),
            &message.content,
            message.kind.as_str(),
            message.created_at,
            i32::from(message.read),
        ],
    )?;
    Ok(())
}

fn count_to_usize(count: i64) -> StoreResult<usize> {
    usize::try_from(count).map_err(|_| StoreError::InvalidData(format!("invalid count: {count}")))
}

impl ConversationStore for ConversationStorage {
    fn create_conversation(
        &self,
        request: &ConversationRequest,
        first_message: &Message,
    ) -> StoreResult<CreateOutcome> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let pair = request.pair_key();

        let inserted = tx.execute(
            r"
            INSERT INTO conversations (conversation_id, initiator_id, receiver_id, pair_key, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                request.conversation_id.as_str(),
                request.initiator_id.as_str(),
                request.receiver_id.as_str(),
                &pair,
                request.status.as_str(),
                request.created_at,
                request.updated_at,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, detail))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                // Dropping the transaction rolls it back.
                return match find_active_by_pair(&tx, &pair)? {
                    Some(existing) => Ok(CreateOutcome::AlreadyExists(existing)),
                    None => Err(rusqlite::Error::SqliteFailure(err, detail).into()),
                };
            }
            Err(e) => return Err(e.into()),
        }

        insert_message(&tx, first_message)?;
        tx.commit()?;

        Ok(CreateOutcome::Created)
    }

    fn get_conversation(&self, id: &ConversationId) -> StoreResult<Option<ConversationRequest>> {
        let conn = lock(&self.conn)?;

        let request = conn
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM conversations WHERE conversation_id = ?1"),
                params![id.as_str()],
                request_from_row,
            )
            .optional()?;

        Ok(request)
    }

    fn find_active_between(
        &self,
        a: &IdentityId,
        b: &IdentityId,
    ) -> StoreResult<Option<ConversationRequest>> {
        let conn = lock(&self.conn)?;
        find_active_by_pair(&conn, &pair_key(a, b))
    }

    fn list_conversations_for(&self, id: &IdentityId) -> StoreResult<Vec<ConversationRequest>> {
        let conn = lock(&self.conn)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {REQUEST_COLUMNS} FROM conversations
             WHERE initiator_id = ?1 OR receiver_id = ?1
             ORDER BY updated_at DESC, created_at DESC"
        ))?;

        let requests = stmt
            .query_map(params![id.as_str()], request_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    fn update_status(
        &self,
        id: &ConversationId,
        from: ConversationStatus,
        to: ConversationStatus,
        notice: Option<&Message>,
    ) -> StoreResult<bool> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp();

        let changed = tx.execute(
            r"
            UPDATE conversations
            SET status = ?1, updated_at = ?2
            WHERE conversation_id = ?3 AND status = ?4
            ",
            params![to.as_str(), now, id.as_str(), from.as_str()],
        )?;
        if changed == 0 {
            return Ok(false);
        }

        if let Some(notice) = notice {
            insert_message(&tx, notice)?;
        }
        tx.commit()?;

        Ok(true)
    }

    fn append_message(&self, message: &Message, cap: Option<usize>) -> StoreResult<AppendOutcome> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let request = tx
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM conversations WHERE conversation_id = ?1"),
                params![message.conversation_id.as_str()],
                request_from_row,
            )
            .optional()?
            .ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "unknown conversation: {}",
                    message.conversation_id
                ))
            })?;

        if !request.status.is_active() {
            return Ok(AppendOutcome::NotActive);
        }

        let capped = request.status == ConversationStatus::Pending
            && request.initiator_id == message.sender_id
            && message.kind == MessageKind::User;

        if let (Some(cap), true) = (cap, capped) {
            let sent: i64 = tx.query_row(
                r"
                SELECT COUNT(*) FROM messages
                WHERE conversation_id = ?1 AND sender_id = ?2 AND kind = 'user'
                ",
                params![message.conversation_id.as_str(), message.sender_id.as_str()],
                |row| row.get(0),
            )?;
            if count_to_usize(sent)? >= cap {
                return Ok(AppendOutcome::LimitReached);
            }
        }

        insert_message(&tx, message)?;
        tx.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE conversation_id = ?2",
            params![message.created_at, message.conversation_id.as_str()],
        )?;
        tx.commit()?;

        Ok(AppendOutcome::Appended)
    }

    fn list_messages(&self, conversation: &ConversationId) -> StoreResult<Vec<Message>> {
        let conn = lock(&self.conn)?;

        let mut stmt = conn.prepare(
            r"
            SELECT message_id, conversation_id, sender_id, content, kind, created_at, is_read
            FROM messages
            WHERE conversation_id = ?1
            ORDER BY seq
            ",
        )?;

        let messages = stmt
            .query_map(params![conversation.as_str()], message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    fn mark_read(&self, conversation: &ConversationId, reader: &IdentityId) -> StoreResult<usize> {
        let conn = lock(&self.conn)?;

        let changed = conn.execute(
            r"
            UPDATE messages SET is_read = 1
            WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0
            ",
            params![conversation.as_str(), reader.as_str()],
        )?;

        Ok(changed)
    }

    fn unread_count(
        &self,
        conversation: &ConversationId,
        reader: &IdentityId,
    ) -> StoreResult<usize> {
        let conn = lock(&self.conn)?;

        let count: i64 = conn.query_row(
            r"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0
            ",
            params![conversation.as_str(), reader.as_str()],
            |row| row.get(0),
        )?;

        count_to_usize(count)
    }
}
