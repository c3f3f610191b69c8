//! Desktop notification for the newest song.
//!
//! Policy by permission state:
//!   - no notifier on this platform → nothing (logged)
//!   - granted      → show now
//!   - undetermined → ask in a detached task, show if the answer is "granted"
//!   - denied       → nothing, never ask again

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use caa_proto::platform::{self, NotifierKind};
use caa_proto::state::{Permission, PersistentState};
use tracing::{debug, info, warn};

const APP_NAME: &str = "CAA Radio";

/// A notification that was handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationHandle {
    pub title: String,
    pub body: Option<String>,
}

#[async_trait]
pub trait NotificationBackend: Send + Sync {
    fn is_supported(&self) -> bool;
    fn permission(&self) -> Permission;
    async fn request_permission(&self) -> Permission;
    fn show(&self, title: &str, body: Option<&str>) -> anyhow::Result<NotificationHandle>;
}

pub struct Notifier {
    backend: Option<Arc<dyn NotificationBackend>>,
}

impl Notifier {
    pub fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        Self { backend: Some(backend) }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Title is the headline, the artist (if known) the body.
    /// Must be called from within a tokio runtime.
    pub fn notify(&self, artist: Option<&str>, title: &str) -> Option<NotificationHandle> {
        let Some(backend) = self.backend.as_ref().filter(|b| b.is_supported()) else {
            debug!("[notify] desktop notifications unavailable, skipping {:?}", title);
            return None;
        };

        match backend.permission() {
            Permission::Granted => show(backend.as_ref(), title, artist),
            Permission::Denied => None,
            Permission::Undetermined => {
                let backend = Arc::clone(backend);
                let title = title.to_string();
                let artist = artist.map(str::to_string);
                tokio::spawn(async move {
                    if backend.request_permission().await == Permission::Granted {
                        show(backend.as_ref(), &title, artist.as_deref());
                    }
                });
                None
            }
        }
    }
}

fn show(
    backend: &dyn NotificationBackend,
    title: &str,
    body: Option<&str>,
) -> Option<NotificationHandle> {
    match backend.show(title, body) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("[notify] failed to show notification: {}", e);
            None
        }
    }
}

// ── Desktop backend ───────────────────────────────────────────────────────────

/// Spawns `notify-send` (freedesktop) or `osascript` (macOS).
pub struct DesktopBackend {
    binary: Option<(PathBuf, NotifierKind)>,
    permission: Mutex<Permission>,
    state_path: PathBuf,
}

impl DesktopBackend {
    /// `configured` wins unless it is `Undetermined`, in which case the answer
    /// remembered in `state_path` is used.
    pub fn detect(configured: Permission, state_path: PathBuf) -> Self {
        let binary = platform::find_notifier_binary();
        match &binary {
            Some((path, kind)) => info!("[notify] using {:?} at {}", kind, path.display()),
            None => info!("[notify] no desktop notifier found"),
        }
        let permission = match configured {
            Permission::Undetermined => PersistentState::load(&state_path).notification_permission,
            other => other,
        };
        Self {
            binary,
            permission: Mutex::new(permission),
            state_path,
        }
    }

    async fn set_permission(&self, permission: Permission) {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner()) = permission;
        let path = self.state_path.clone();
        let saved = tokio::task::spawn_blocking(move || {
            let mut state = PersistentState::load(&path);
            state.notification_permission = permission;
            state.save(&path)
        })
        .await;
        match saved {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[notify] could not remember permission: {}", e),
            Err(e) => warn!("[notify] permission save task failed: {}", e),
        }
    }
}

#[async_trait]
impl NotificationBackend for DesktopBackend {
    fn is_supported(&self) -> bool {
        self.binary.is_some()
    }

    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Granted when the notifier binary answers a trivial probe.
    async fn request_permission(&self) -> Permission {
        let Some((path, kind)) = &self.binary else {
            return Permission::Denied;
        };
        let probe: &[&str] = match kind {
            NotifierKind::NotifySend => &["--version"],
            NotifierKind::Osascript => &["-e", "return 1"],
        };
        let answer = match tokio::process::Command::new(path)
            .args(probe)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) if status.success() => Permission::Granted,
            Ok(status) => {
                warn!("[notify] notifier probe exited {}", status);
                Permission::Denied
            }
            Err(e) => {
                warn!("[notify] notifier probe failed: {}", e);
                Permission::Denied
            }
        };
        info!("[notify] permission resolved to {:?}", answer);
        self.set_permission(answer).await;
        answer
    }

    fn show(&self, title: &str, body: Option<&str>) -> anyhow::Result<NotificationHandle> {
        let Some((path, kind)) = &self.binary else {
            anyhow::bail!("no desktop notifier available");
        };
        tokio::process::Command::new(path)
            .args(command_args(*kind, title, body))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!("[notify] shown {:?} / {:?}", title, body);
        Ok(NotificationHandle {
            title: title.to_string(),
            body: body.map(str::to_string),
        })
    }
}

fn command_args(kind: NotifierKind, title: &str, body: Option<&str>) -> Vec<String> {
    match kind {
        NotifierKind::NotifySend => {
            let mut args = vec![format!("--app-name={}", APP_NAME), "--".to_string(), title.to_string()];
            if let Some(b) = body {
                args.push(b.to_string());
            }
            args
        }
        NotifierKind::Osascript => {
            let script = format!(
                "display notification {} with title {}",
                applescript_string(body.unwrap_or("")),
                applescript_string(title)
            );
            vec!["-e".to_string(), script]
        }
    }
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
