//! SQLite 持久化：操作日志与一阶/二阶 Markov 转移计数
//!
//! 计数递增用单条 `INSERT ... ON CONFLICT ... DO UPDATE SET count = count + 1`，
//! 不做读改写，连接外再套 Mutex，并发下计数不丢。进程重启后模型完整保留。

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::AgentError;
use crate::model::{Action, Signature};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action_signature TEXT NOT NULL,
    action_json TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    url TEXT,
    success INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS transitions_first_order (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_action TEXT NOT NULL,
    to_action TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 1,
    UNIQUE(from_action, to_action)
);

CREATE TABLE IF NOT EXISTS transitions_second_order (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_action_1 TEXT NOT NULL,
    from_action_2 TEXT NOT NULL,
    to_action TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 1,
    UNIQUE(from_action_1, from_action_2, to_action)
);

CREATE INDEX IF NOT EXISTS idx_first_order_from ON transitions_first_order(from_action);
CREATE INDEX IF NOT EXISTS idx_second_order_from ON transitions_second_order(from_action_1, from_action_2);
";

/// 操作日志一行
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub id: i64,
    pub signature: Signature,
    pub action_json: String,
    pub timestamp: DateTime<Utc>,
    pub url: Option<String>,
    pub success: bool,
}

/// 转移表一行（上报端点用）
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRow {
    pub from_action: Signature,
    pub to_action: Signature,
    pub count: i64,
}

/// 转移计数存储，Send + Sync，可跨任务共享
pub struct TransitionStore {
    conn: Mutex<Connection>,
    db_path: String,
}

impl TransitionStore {
    /// 打开（或创建）落盘数据库
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.display().to_string(),
        })
    }

    /// 内存数据库，测试与演练模式用
    pub fn open_in_memory() -> Result<Self, AgentError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: ":memory:".to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 锁中毒时直接取回 guard：SQLite 连接本身仍然可用
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 追加一条操作日志，返回行 id
    pub fn record_action(
        &self,
        action: &Action,
        url: Option<&str>,
        success: bool,
    ) -> Result<i64, AgentError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO actions (action_signature, action_json, timestamp, url, success)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![action.signature(), action.canonical_json(), Utc::now(), url, success],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 一阶转移计数 +1（不存在则插入 count=1），单条语句原子完成
    pub fn record_transition_first_order(
        &self,
        from: &Action,
        to: &Action,
    ) -> Result<(), AgentError> {
        self.conn().execute(
            "INSERT INTO transitions_first_order (from_action, to_action, count)
             VALUES (?1, ?2, 1)
             ON CONFLICT(from_action, to_action) DO UPDATE SET count = count + 1",
            params![from.signature(), to.signature()],
        )?;
        Ok(())
    }

    /// 二阶转移计数 +1，上下文为 (前前步, 前一步)
    pub fn record_transition_second_order(
        &self,
        from_1: &Action,
        from_2: &Action,
        to: &Action,
    ) -> Result<(), AgentError> {
        self.conn().execute(
            "INSERT INTO transitions_second_order (from_action_1, from_action_2, to_action, count)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(from_action_1, from_action_2, to_action) DO UPDATE SET count = count + 1",
            params![from_1.signature(), from_2.signature(), to.signature()],
        )?;
        Ok(())
    }

    /// 某上下文出发的全部一阶转移，按 count 降序、目标签名升序（同分时结果确定）
    pub fn first_order_transitions(
        &self,
        from_sig: &str,
    ) -> Result<Vec<(Signature, i64)>, AgentError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT to_action, count FROM transitions_first_order
             WHERE from_action = ?1
             ORDER BY count DESC, to_action ASC",
        )?;
        let rows = stmt
            .query_map(params![from_sig], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 某二阶上下文出发的全部转移，排序规则同一阶
    pub fn second_order_transitions(
        &self,
        from_1_sig: &str,
        from_2_sig: &str,
    ) -> Result<Vec<(Signature, i64)>, AgentError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT to_action, count FROM transitions_second_order
             WHERE from_action_1 = ?1 AND from_action_2 = ?2
             ORDER BY count DESC, to_action ASC",
        )?;
        let rows = stmt
            .query_map(params![from_1_sig, from_2_sig], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 一阶表计数总和，作为「模型是否学到过东西」的判据
    pub fn total_transition_count(&self) -> Result<i64, AgentError> {
        let count = self.conn().query_row(
            "SELECT COALESCE(SUM(count), 0) FROM transitions_first_order",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 最近的操作日志，新的在前；同一时间戳按 id 降序保证顺序确定
    pub fn recent_actions(&self, limit: usize) -> Result<Vec<ActionRecord>, AgentError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, action_signature, action_json, timestamp, url, success
             FROM actions
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(ActionRecord {
                    id: row.get(0)?,
                    signature: row.get(1)?,
                    action_json: row.get(2)?,
                    timestamp: row.get(3)?,
                    url: row.get(4)?,
                    success: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 计数最高的一阶转移（上报端点用），排序全列指定保证确定性
    pub fn top_transitions(&self, k: usize) -> Result<Vec<TransitionRow>, AgentError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT from_action, to_action, count FROM transitions_first_order
             ORDER BY count DESC, from_action ASC, to_action ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![k as i64], |row| {
                Ok(TransitionRow {
                    from_action: row.get(0)?,
                    to_action: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 清空全部日志与计数
    pub fn clear_all(&self) -> Result<(), AgentError> {
        let conn = self.conn();
        conn.execute("DELETE FROM actions", [])?;
        conn.execute("DELETE FROM transitions_first_order", [])?;
        conn.execute("DELETE FROM transitions_second_order", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{click, navigate, press, type_text};

    #[test]
    fn test_upsert_increments_exactly() {
        let store = TransitionStore::open_in_memory().unwrap();
        let a = navigate("https://example.com");
        let b = click("#button");
        for _ in 0..5 {
            store.record_transition_first_order(&a, &b).unwrap();
        }
        let rows = store.first_order_transitions(&a.signature()).unwrap();
        assert_eq!(rows, vec![(b.signature(), 5)]);
        assert_eq!(store.total_transition_count().unwrap(), 5);
    }

    #[test]
    fn test_first_order_ordering_deterministic() {
        let store = TransitionStore::open_in_memory().unwrap();
        let a = navigate("https://example.com");
        let b = click("#button");
        let c = press("Enter");
        store.record_transition_first_order(&a, &b).unwrap();
        store.record_transition_first_order(&a, &b).unwrap();
        store.record_transition_first_order(&a, &c).unwrap();
        let rows = store.first_order_transitions(&a.signature()).unwrap();
        assert_eq!(rows[0], (b.signature(), 2));
        assert_eq!(rows[1], (c.signature(), 1));

        // 同分时按目标签名升序：{"key":... 排在 {"selector":... 前面
        store.record_transition_first_order(&a, &c).unwrap();
        let rows = store.first_order_transitions(&a.signature()).unwrap();
        assert_eq!(rows, vec![(c.signature(), 2), (b.signature(), 2)]);
    }

    #[test]
    fn test_second_order_keyed_by_pair() {
        let store = TransitionStore::open_in_memory().unwrap();
        let a = navigate("https://example.com");
        let b = type_text("#input", "hello");
        let c = press("Enter");
        store.record_transition_second_order(&a, &b, &c).unwrap();
        store.record_transition_second_order(&a, &b, &c).unwrap();

        let rows = store
            .second_order_transitions(&a.signature(), &b.signature())
            .unwrap();
        assert_eq!(rows, vec![(c.signature(), 2)]);

        // 换一个上下文对，互不影响
        let rows = store
            .second_order_transitions(&b.signature(), &a.signature())
            .unwrap();
        assert!(rows.is_empty());
        // 二阶计数不计入一阶总和
        assert_eq!(store.total_transition_count().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_increments_not_lost() {
        use std::sync::Arc;

        let store = Arc::new(TransitionStore::open_in_memory().unwrap());
        let a = navigate("https://example.com");
        let b = click("#button");
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let a = a.clone();
            let b = b.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    store.record_transition_first_order(&a, &b).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.total_transition_count().unwrap(), 200);
    }

    #[test]
    fn test_record_and_recent_actions() {
        let store = TransitionStore::open_in_memory().unwrap();
        let a = navigate("https://example.com");
        let b = click("#button");
        store.record_action(&a, Some("about:blank"), true).unwrap();
        store.record_action(&b, Some("https://example.com"), false).unwrap();

        let recent = store.recent_actions(10).unwrap();
        assert_eq!(recent.len(), 2);
        // 新的在前
        assert_eq!(recent[0].signature, b.signature());
        assert!(!recent[0].success);
        assert_eq!(recent[1].signature, a.signature());
        assert!(recent[1].success);
        assert_eq!(recent[0].url.as_deref(), Some("https://example.com"));

        let one = store.recent_actions(1).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].signature, b.signature());

        // 日志行可序列化（上报端点用），时间戳为 RFC 3339 字符串
        let value = serde_json::to_value(&one[0]).unwrap();
        assert_eq!(value["signature"], b.signature());
        assert!(value["timestamp"].is_string());
        assert_eq!(value["success"], false);
    }

    #[test]
    fn test_top_transitions() {
        let store = TransitionStore::open_in_memory().unwrap();
        let a = navigate("https://example.com");
        let b = click("#button");
        let c = press("Enter");
        for _ in 0..3 {
            store.record_transition_first_order(&a, &b).unwrap();
        }
        store.record_transition_first_order(&b, &c).unwrap();
        let top = store.top_transitions(1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].from_action, a.signature());
        assert_eq!(top[0].count, 3);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.db");
        let a = navigate("https://example.com");
        let b = click("#button");
        {
            let store = TransitionStore::open(&path).unwrap();
            store.record_transition_first_order(&a, &b).unwrap();
            store.record_action(&a, None, true).unwrap();
        }
        let store = TransitionStore::open(&path).unwrap();
        assert_eq!(store.total_transition_count().unwrap(), 1);
        assert_eq!(store.recent_actions(10).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_all() {
        let store = TransitionStore::open_in_memory().unwrap();
        let a = navigate("https://example.com");
        let b = click("#button");
        store.record_transition_first_order(&a, &b).unwrap();
        store.record_transition_second_order(&a, &b, &a).unwrap();
        store.record_action(&a, None, true).unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.total_transition_count().unwrap(), 0);
        assert!(store.recent_actions(10).unwrap().is_empty());
        assert!(store
            .second_order_transitions(&a.signature(), &b.signature())
            .unwrap()
            .is_empty());
    }
}
