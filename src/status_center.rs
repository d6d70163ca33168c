use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_STATUS_ENTRIES: usize = 8;
const INFO_TTL: Duration = Duration::from_secs(5);
const SUCCESS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Progress,
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub id: u64,
    pub key: String,
    pub kind: StatusKind,
    pub message: String,
    pub expires_at: Option<Instant>,
}

/// User-facing notifications, one entry per key. Successes and infos expire;
/// progress and errors stay until replaced or dismissed.
#[derive(Debug, Clone, Default)]
pub struct StatusCenter {
    entries: Vec<StatusEntry>,
    next_id: u64,
}

/// Status center shared between the panels and the front-end.
pub type SharedStatus = Arc<Mutex<StatusCenter>>;

pub fn shared() -> SharedStatus {
    Arc::new(Mutex::new(StatusCenter::default()))
}

/// Publish through a shared handle; a poisoned lock drops the message.
pub fn publish(status: &SharedStatus, update: impl FnOnce(&mut StatusCenter)) {
    match status.lock() {
        Ok(mut center) => update(&mut center),
        Err(_) => log::warn!("[Status] status center lock poisoned"),
    }
}

impl StatusCenter {
    pub fn publish_progress(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.upsert(key.into(), StatusKind::Progress, message.into(), None);
    }

    pub fn publish_info(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.upsert(key.into(), StatusKind::Info, message.into(), Some(INFO_TTL));
    }

    pub fn publish_success(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.upsert(
            key.into(),
            StatusKind::Success,
            message.into(),
            Some(SUCCESS_TTL),
        );
    }

    pub fn publish_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.upsert(key.into(), StatusKind::Error, message.into(), None);
    }

    pub fn dismiss_key(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key != key);
        before != self.entries.len()
    }

    pub fn sweep_expired(&mut self) -> bool {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|entry| match entry.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        });
        before != self.entries.len()
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn latest(&self, key: &str) -> Option<&StatusEntry> {
        self.entries.iter().rev().find(|entry| entry.key == key)
    }

    fn upsert(&mut self, key: String, kind: StatusKind, message: String, ttl: Option<Duration>) {
        match kind {
            StatusKind::Error => log::error!("[Status] {}: {}", key, message),
            _ => log::info!("[Status] {}: {}", key, message),
        }
        let expires_at = ttl.map(|dur| Instant::now() + dur);
        let mut entry = if let Some(index) = self.entries.iter().position(|entry| entry.key == key)
        {
            self.entries.remove(index)
        } else {
            self.next_id = self.next_id.saturating_add(1);
            StatusEntry {
                id: self.next_id,
                key,
                kind,
                message: String::new(),
                expires_at: None,
            }
        };

        entry.kind = kind;
        entry.message = message;
        entry.expires_at = expires_at;
        self.entries.push(entry);

        if self.entries.len() > MAX_STATUS_ENTRIES {
            let overflow = self.entries.len() - MAX_STATUS_ENTRIES;
            self.entries.drain(0..overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_replaces_previous_entry() {
        let mut status = StatusCenter::default();
        status.publish_progress("send", "Sending...");
        status.publish_success("send", "Sent");
        assert_eq!(status.entries().len(), 1);
        let entry = status.latest("send").unwrap();
        assert_eq!(entry.kind, StatusKind::Success);
        assert!(entry.expires_at.is_some());
    }

    #[test]
    fn errors_are_sticky_and_overflow_is_trimmed() {
        let mut status = StatusCenter::default();
        for i in 0..(MAX_STATUS_ENTRIES + 3) {
            status.publish_error(format!("k{i}"), "boom");
        }
        assert_eq!(status.entries().len(), MAX_STATUS_ENTRIES);
        assert!(!status.sweep_expired());
        assert!(status.latest("k0").is_none());
        assert!(status.dismiss_key("k5"));
    }
}
