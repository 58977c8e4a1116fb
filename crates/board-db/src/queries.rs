use board_types::models::{Message, NewMessage};
use rusqlite::{Connection, Row};

use crate::{Database, Result, StoreError};

impl Database {
    // -- Messages --

    pub fn list_messages(&self) -> Result<Vec<Message>> {
        self.with_conn(query_messages)
    }

    pub fn get_message(&self, id: i64) -> Result<Message> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, body, username FROM message WHERE id = ?1",
                [id],
                message_from_row,
            )
            .map_err(|e| not_found_or(e, id))
        })
    }

    pub fn insert_message(&self, msg: &NewMessage) -> Result<Message> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message (body, username) VALUES (?1, ?2)",
                (&msg.body, &msg.username),
            )?;
            Ok(msg.clone().with_id(conn.last_insert_rowid()))
        })
    }

    /// Overwrite the body, and the username when one is given. Last write wins.
    pub fn update_message(&self, id: i64, body: &str, username: Option<&str>) -> Result<Message> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE message SET body = ?1, username = COALESCE(?2, username)
                 WHERE id = ?3
                 RETURNING id, body, username",
                rusqlite::params![body, username, id],
                message_from_row,
            )
            .map_err(|e| not_found_or(e, id))
        })
    }

    pub fn delete_message(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM message WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }
}

fn query_messages(conn: &Connection) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare("SELECT id, body, username FROM message ORDER BY id")?;

    let rows = stmt
        .query_map([], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        body: row.get(1)?,
        username: row.get(2)?,
    })
}

fn not_found_or(err: rusqlite::Error, id: i64) -> StoreError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(id),
        e => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn insert_then_get() {
        let db = db();
        let inserted = db
            .insert_message(&NewMessage::new("hello", "taro"))
            .unwrap();
        assert!(inserted.id > 0);

        let fetched = db.get_message(inserted.id).unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.body, "hello");
        assert_eq!(fetched.username, "taro");
    }

    #[test]
    fn ids_are_fresh_and_not_reused() {
        let db = db();
        let a = db.insert_message(&NewMessage::new("a", "u")).unwrap();
        let b = db.insert_message(&NewMessage::new("b", "u")).unwrap();
        assert_ne!(a.id, b.id);

        db.delete_message(b.id).unwrap();
        let c = db.insert_message(&NewMessage::new("c", "u")).unwrap();
        assert!(c.id > b.id);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let db = db();
        let m = db.insert_message(&NewMessage::new("bye", "hanako")).unwrap();
        db.delete_message(m.id).unwrap();

        let err = db.get_message(m.id).unwrap_err();
        assert!(err.is_not_found());
        assert!(db.delete_message(m.id).unwrap_err().is_not_found());
    }

    #[test]
    fn list_empty_table() {
        let db = db();
        assert!(db.list_messages().unwrap().is_empty());
    }

    #[test]
    fn list_in_id_order() {
        let db = db();
        for body in ["one", "two", "three"] {
            db.insert_message(&NewMessage::new(body, "u")).unwrap();
        }
        let bodies: Vec<String> = db.list_messages().unwrap().into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, vec!["one", "two", "three"]);
    }

    #[test]
    fn update_touches_only_target_row() {
        let db = db();
        let a = db.insert_message(&NewMessage::new("a", "alice")).unwrap();
        let b = db.insert_message(&NewMessage::new("b", "bob")).unwrap();

        let updated = db.update_message(a.id, "a2", Some("alice2")).unwrap();
        assert_eq!(updated, Message { id: a.id, body: "a2".into(), username: "alice2".into() });

        assert_eq!(db.get_message(a.id).unwrap(), updated);
        assert_eq!(db.get_message(b.id).unwrap(), b);
    }

    #[test]
    fn update_without_username_keeps_it() {
        let db = db();
        let a = db.insert_message(&NewMessage::new("draft", "alice")).unwrap();
        let updated = db.update_message(a.id, "final", None).unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.body, "final");
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let db = db();
        let err = db.update_message(42, "x", None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }
}
